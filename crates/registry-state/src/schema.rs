//! Row definitions for the registry's SurrealDB tables
//!
//! Tables:
//! - registry_objects: submission sets, folders and document entries
//! - associations: typed edges between objects and/or associations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::metadata::{Association, AssociationType, Classification, ObjectKind, RegistryObject};

/// Registry object row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    /// Registry system identifier (unique)
    pub object_id: String,
    /// Object kind
    pub kind: ObjectKind,
    /// Business identifier, denormalized from `attributes` for indexing
    pub unique_id: Option<String>,
    /// Free-form attributes
    pub attributes: BTreeMap<String, String>,
    /// Coded values used for member filtering
    pub classifications: Vec<Classification>,
}

impl From<&RegistryObject> for ObjectRow {
    fn from(object: &RegistryObject) -> Self {
        ObjectRow {
            id: None,
            object_id: object.id().to_string(),
            kind: object.kind(),
            unique_id: object.unique_id().map(str::to_string),
            attributes: object.attributes().clone(),
            classifications: object.classifications().iter().cloned().collect(),
        }
    }
}

impl TryFrom<ObjectRow> for RegistryObject {
    type Error = StorageError;

    fn try_from(row: ObjectRow) -> Result<Self, Self::Error> {
        if row.object_id.is_empty() {
            return Err(StorageError::InvalidRecord {
                record_id: format!("{:?}", row.id),
                reason: "registry object row has no object_id".to_string(),
            });
        }
        let object = row
            .attributes
            .into_iter()
            .fold(RegistryObject::new(row.object_id, row.kind), |o, (k, v)| {
                o.with_attribute(k, v)
            });
        Ok(row
            .classifications
            .into_iter()
            .fold(object, |o, c| o.with_classification(c.facet, c.code)))
    }
}

/// Association row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    /// Registry system identifier (unique)
    pub association_id: String,
    /// Association type, short name
    pub association_type: AssociationType,
    pub source_id: String,
    pub target_id: String,
}

impl From<&Association> for AssociationRow {
    fn from(association: &Association) -> Self {
        AssociationRow {
            id: None,
            association_id: association.id().to_string(),
            association_type: association.association_type(),
            source_id: association.source_id().to_string(),
            target_id: association.target_id().to_string(),
        }
    }
}

impl TryFrom<AssociationRow> for Association {
    type Error = StorageError;

    fn try_from(row: AssociationRow) -> Result<Self, Self::Error> {
        if row.source_id.is_empty() || row.target_id.is_empty() {
            return Err(StorageError::InvalidRecord {
                record_id: row.association_id,
                reason: "association endpoint is empty".to_string(),
            });
        }
        Ok(Association::new(
            row.association_id,
            row.association_type,
            row.source_id,
            row.target_id,
        ))
    }
}
