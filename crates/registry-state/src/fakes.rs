//! In-memory registry backend
//!
//! `MemoryRegistryBackend` satisfies the `RegistryBackend` contract without
//! any external dependencies. It backs the test suites and the CLI's fixture
//! mode. Contents are fixed once the backend is shared, so reads need no lock.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::metadata::{
    Association, AssociationType, ObjectKind, RegistryObject, RegistrySnapshot,
};
use crate::storage_traits::*;

/// In-memory registry keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistryBackend {
    objects: BTreeMap<String, RegistryObject>,
    associations: BTreeMap<String, Association>,
}

impl MemoryRegistryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backend holding every record of `snapshot`.
    ///
    /// Fails if the snapshot reuses an id.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> StorageResult<Self> {
        snapshot.validate()?;
        let mut backend = Self::new();
        for object in snapshot.objects {
            backend.insert_object(object)?;
        }
        for association in snapshot.associations {
            backend.insert_association(association)?;
        }
        Ok(backend)
    }

    pub fn insert_object(&mut self, object: RegistryObject) -> StorageResult<()> {
        self.ensure_unused(object.id())?;
        self.objects.insert(object.id().to_string(), object);
        Ok(())
    }

    pub fn insert_association(&mut self, association: Association) -> StorageResult<()> {
        self.ensure_unused(association.id())?;
        self.associations
            .insert(association.id().to_string(), association);
        Ok(())
    }

    /// Builder form of [`insert_object`](Self::insert_object).
    pub fn with_object(mut self, object: RegistryObject) -> StorageResult<Self> {
        self.insert_object(object)?;
        Ok(self)
    }

    /// Builder form of [`insert_association`](Self::insert_association).
    pub fn with_association(mut self, association: Association) -> StorageResult<Self> {
        self.insert_association(association)?;
        Ok(self)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn association_count(&self) -> usize {
        self.associations.len()
    }

    /// Dump the current contents.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            objects: self.objects.values().cloned().collect(),
            associations: self.associations.values().cloned().collect(),
        }
    }

    fn ensure_unused(&self, id: &str) -> StorageResult<()> {
        if self.objects.contains_key(id) || self.associations.contains_key(id) {
            return Err(StorageError::InvalidRecord {
                record_id: id.to_string(),
                reason: "id already present in registry".to_string(),
            });
        }
        Ok(())
    }

    /// Targets of `association_type` edges leaving `parent_id`, deduplicated
    /// by id. Dangling targets are skipped.
    fn targets_of(
        &self,
        parent_id: &str,
        association_type: AssociationType,
    ) -> BTreeMap<&str, &RegistryObject> {
        self.associations
            .values()
            .filter(|a| a.association_type() == association_type && a.source_id() == parent_id)
            .filter_map(|a| self.objects.get(a.target_id()))
            .map(|o| (o.id(), o))
            .collect()
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistryBackend {
    async fn fetch_by_id(&self, id: &str) -> StorageResult<Option<RegistryObject>> {
        Ok(self.objects.get(id).cloned())
    }

    async fn fetch_by_business_key(&self, key: &str) -> StorageResult<Option<RegistryObject>> {
        Ok(self
            .objects
            .values()
            .find(|o| o.unique_id() == Some(key))
            .cloned())
    }

    async fn fetch_members(
        &self,
        parent_id: &str,
        filters: &MemberFilters,
    ) -> StorageResult<Vec<RegistryObject>> {
        let members: Vec<RegistryObject> = self
            .targets_of(parent_id, AssociationType::HasMember)
            .into_values()
            .filter(|o| o.kind() == ObjectKind::DocumentEntry && filters.matches(o))
            .cloned()
            .collect();
        debug!(parent_id, count = members.len(), "memory backend: members");
        Ok(members)
    }

    async fn fetch_structural_relation(
        &self,
        parent_id: &str,
        association_type: AssociationType,
    ) -> StorageResult<Vec<RegistryObject>> {
        Ok(self
            .targets_of(parent_id, association_type)
            .into_values()
            .cloned()
            .collect())
    }

    async fn fetch_associations_inclusive(
        &self,
        ids: &BTreeSet<String>,
    ) -> StorageResult<Vec<Association>> {
        Ok(self
            .associations
            .values()
            .filter(|a| ids.contains(a.source_id()) || ids.contains(a.target_id()))
            .cloned()
            .collect())
    }
}
