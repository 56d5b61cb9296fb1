//! In-memory result graph for one query execution.

use std::collections::{BTreeMap, BTreeSet};

use registry_state::{Association, ObjectKind, RegistryObject};
use serde::Serialize;
use tracing::warn;

/// An association endpoint with no matching object or association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    pub association_id: String,
    pub missing_id: String,
}

/// The ordered output of a finished query: objects by id, then associations by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub objects: Vec<RegistryObject>,
    pub associations: Vec<Association>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.objects.len() + self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.associations.is_empty()
    }

    /// Every id in result order.
    pub fn ids(&self) -> Vec<&str> {
        self.objects
            .iter()
            .map(RegistryObject::id)
            .chain(self.associations.iter().map(Association::id))
            .collect()
    }
}

/// Objects and associations keyed by id.
///
/// Ids are unique across both maps. Inserts never overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBundle {
    objects: BTreeMap<String, RegistryObject>,
    associations: BTreeMap<String, Association>,
}

impl MetadataBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if no record with this id exists. Returns whether it was stored.
    pub fn add_object(&mut self, object: RegistryObject) -> bool {
        if self.associations.contains_key(object.id()) {
            warn!(id = %object.id(), "object id already names an association; ignored");
            return false;
        }
        if self.objects.contains_key(object.id()) {
            return false;
        }
        self.objects.insert(object.id().to_string(), object);
        true
    }

    /// Insert if no record with this id exists. Returns whether it was stored.
    pub fn add_association(&mut self, association: Association) -> bool {
        if self.objects.contains_key(association.id()) {
            warn!(id = %association.id(), "association id already names an object; ignored");
            return false;
        }
        if self.associations.contains_key(association.id()) {
            return false;
        }
        self.associations
            .insert(association.id().to_string(), association);
        true
    }

    /// Returns how many were newly stored.
    pub fn extend_objects(&mut self, objects: impl IntoIterator<Item = RegistryObject>) -> usize {
        let mut stored = 0;
        for object in objects {
            if self.add_object(object) {
                stored += 1;
            }
        }
        stored
    }

    /// Returns how many were newly stored.
    pub fn extend_associations(
        &mut self,
        associations: impl IntoIterator<Item = Association>,
    ) -> usize {
        let mut stored = 0;
        for association in associations {
            if self.add_association(association) {
                stored += 1;
            }
        }
        stored
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id) || self.associations.contains_key(id)
    }

    pub fn object(&self, id: &str) -> Option<&RegistryObject> {
        self.objects.get(id)
    }

    pub fn association(&self, id: &str) -> Option<&Association> {
        self.associations.get(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &RegistryObject> {
        self.objects.values()
    }

    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.associations.values()
    }

    pub fn object_ids_of_kind(&self, kind: ObjectKind) -> Vec<&str> {
        self.objects
            .values()
            .filter(|object| object.kind() == kind)
            .map(RegistryObject::id)
            .collect()
    }

    pub fn object_ids(&self) -> BTreeSet<String> {
        self.objects.keys().cloned().collect()
    }

    pub fn all_ids(&self) -> BTreeSet<String> {
        self.objects
            .keys()
            .chain(self.associations.keys())
            .cloned()
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn association_count(&self) -> usize {
        self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.associations.is_empty()
    }

    /// Drop every record whose id is not in `keep`.
    pub fn filter(&mut self, keep: &BTreeSet<String>) {
        self.objects.retain(|id, _| keep.contains(id));
        self.associations.retain(|id, _| keep.contains(id));
    }

    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for association in self.associations.values() {
            for endpoint in [association.source_id(), association.target_id()] {
                if !self.contains(endpoint) {
                    dangling.push(DanglingReference {
                        association_id: association.id().to_string(),
                        missing_id: endpoint.to_string(),
                    });
                }
            }
        }
        dangling
    }

    pub fn into_result(self) -> QueryResult {
        QueryResult {
            objects: self.objects.into_values().collect(),
            associations: self.associations.into_values().collect(),
        }
    }
}
