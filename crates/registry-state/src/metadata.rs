//! Registry metadata records.
//!
//! Records are built once from backend data and never mutated afterwards:
//! fields are private and the only way to change a record is to build a new
//! one with the consuming `with_*` builders.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Attribute key holding an object's business identifier (XDS `uniqueId`).
pub const UNIQUE_ID_ATTRIBUTE: &str = "uniqueId";

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

/// The closed set of registry object kinds the query core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    SubmissionSet,
    Folder,
    DocumentEntry,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::SubmissionSet => "SubmissionSet",
            ObjectKind::Folder => "Folder",
            ObjectKind::DocumentEntry => "DocumentEntry",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SubmissionSet" => Ok(ObjectKind::SubmissionSet),
            "Folder" => Ok(ObjectKind::Folder),
            "DocumentEntry" => Ok(ObjectKind::DocumentEntry),
            other => Err(StorageError::UnknownVocabulary {
                vocabulary: "object kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Association types defined by ebRIM and the XDS profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssociationType {
    HasMember,
    #[serde(rename = "RPLC")]
    Replace,
    #[serde(rename = "XFRM")]
    Transform,
    #[serde(rename = "APND")]
    Append,
    #[serde(rename = "XFRM_RPLC")]
    TransformAndReplace,
    #[serde(rename = "signs")]
    Signs,
    IsSnapshotOf,
}

impl AssociationType {
    pub const ALL: [AssociationType; 7] = [
        AssociationType::HasMember,
        AssociationType::Replace,
        AssociationType::Transform,
        AssociationType::Append,
        AssociationType::TransformAndReplace,
        AssociationType::Signs,
        AssociationType::IsSnapshotOf,
    ];

    /// Short name, as used in fixtures and database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationType::HasMember => "HasMember",
            AssociationType::Replace => "RPLC",
            AssociationType::Transform => "XFRM",
            AssociationType::Append => "APND",
            AssociationType::TransformAndReplace => "XFRM_RPLC",
            AssociationType::Signs => "signs",
            AssociationType::IsSnapshotOf => "IsSnapshotOf",
        }
    }

    /// Full ebRIM / IHE association type URN.
    pub fn urn(&self) -> &'static str {
        match self {
            AssociationType::HasMember => {
                "urn:oasis:names:tc:ebxml-regrep:AssociationType:HasMember"
            }
            AssociationType::Replace => "urn:ihe:iti:2007:AssociationType:RPLC",
            AssociationType::Transform => "urn:ihe:iti:2007:AssociationType:XFRM",
            AssociationType::Append => "urn:ihe:iti:2007:AssociationType:APND",
            AssociationType::TransformAndReplace => "urn:ihe:iti:2007:AssociationType:XFRM_RPLC",
            AssociationType::Signs => "urn:ihe:iti:2007:AssociationType:signs",
            AssociationType::IsSnapshotOf => "urn:ihe:iti:2010:AssociationType:IsSnapshotOf",
        }
    }
}

impl fmt::Display for AssociationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssociationType {
    type Err = StorageError;

    /// Accepts either the short name or the full URN.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssociationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.urn() == s)
            .ok_or_else(|| StorageError::UnknownVocabulary {
                vocabulary: "association type",
                value: s.to_string(),
            })
    }
}

/// Classification schemes a coded value can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    ClassCode,
    TypeCode,
    FormatCode,
    ConfidentialityCode,
    PracticeSettingCode,
    HealthcareFacilityTypeCode,
    EventCode,
    ContentTypeCode,
    FolderCode,
}

impl Facet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::ClassCode => "classCode",
            Facet::TypeCode => "typeCode",
            Facet::FormatCode => "formatCode",
            Facet::ConfidentialityCode => "confidentialityCode",
            Facet::PracticeSettingCode => "practiceSettingCode",
            Facet::HealthcareFacilityTypeCode => "healthcareFacilityTypeCode",
            Facet::EventCode => "eventCode",
            Facet::ContentTypeCode => "contentTypeCode",
            Facet::FolderCode => "folderCode",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded value attached to a registry object, e.g. a confidentiality code.
///
/// Codes are opaque (`code^^^codingScheme` in XDS parameter syntax) and are
/// compared for exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Classification {
    pub facet: Facet,
    pub code: String,
}

impl Classification {
    pub fn new(facet: Facet, code: impl Into<String>) -> Self {
        Self {
            facet,
            code: code.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A submission set, folder or document entry held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryObject {
    id: String,
    kind: ObjectKind,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    classifications: BTreeSet<Classification>,
}

impl RegistryObject {
    pub fn new(id: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: BTreeMap::new(),
            classifications: BTreeSet::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_unique_id(self, unique_id: impl Into<String>) -> Self {
        self.with_attribute(UNIQUE_ID_ATTRIBUTE, unique_id)
    }

    pub fn with_classification(mut self, facet: Facet, code: impl Into<String>) -> Self {
        self.classifications
            .insert(Classification::new(facet, code));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Business identifier, if the object carries one.
    pub fn unique_id(&self) -> Option<&str> {
        self.attribute(UNIQUE_ID_ATTRIBUTE)
    }

    pub fn classifications(&self) -> &BTreeSet<Classification> {
        &self.classifications
    }

    /// Codes this object carries under `facet`.
    pub fn codes(&self, facet: Facet) -> impl Iterator<Item = &str> {
        self.classifications
            .iter()
            .filter(move |c| c.facet == facet)
            .map(|c| c.code.as_str())
    }
}

/// A directed, typed edge between two registry objects or associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    id: String,
    association_type: AssociationType,
    source_id: String,
    target_id: String,
}

impl Association {
    pub fn new(
        id: impl Into<String>,
        association_type: AssociationType,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            association_type,
            source_id: source_id.into(),
            target_id: target_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn association_type(&self) -> AssociationType {
        self.association_type
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// True when either endpoint is `id`.
    pub fn touches(&self, id: &str) -> bool {
        self.source_id == id || self.target_id == id
    }
}

/// A serializable dump of registry contents, used to seed backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub objects: Vec<RegistryObject>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl RegistrySnapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check that no id names both an object and an association and that
    /// no id is used twice.
    pub fn validate(&self) -> Result<(), StorageError> {
        let mut seen = BTreeSet::new();
        let ids = self
            .objects
            .iter()
            .map(RegistryObject::id)
            .chain(self.associations.iter().map(Association::id));
        for id in ids {
            if id.is_empty() {
                return Err(StorageError::InvalidRecord {
                    record_id: String::new(),
                    reason: "empty id".to_string(),
                });
            }
            if !seen.insert(id) {
                return Err(StorageError::InvalidRecord {
                    record_id: id.to_string(),
                    reason: "id is used more than once".to_string(),
                });
            }
        }
        Ok(())
    }
}
