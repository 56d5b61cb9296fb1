//! Backend adapter contract for the stored query engine.
//!
//! `RegistryBackend` is the only way the query core reaches registry data.
//! All methods are async and backend-agnostic; an in-memory implementation
//! lives in the `fakes` module and a SurrealDB one in `surreal_backend`.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::metadata::{Association, AssociationType, Facet, RegistryObject};

/// Result type for backend operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Classification filters applied when fetching member documents.
///
/// Facets combine with AND; the codes listed for one facet combine with OR.
/// A facet with no codes places no restriction and is not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilters {
    facets: BTreeMap<Facet, Vec<String>>,
}

impl MemberFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `facet` to any of `codes`. An empty `codes` is a no-op.
    pub fn with_codes<I, S>(mut self, facet: Facet, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        if !codes.is_empty() {
            self.facets.entry(facet).or_default().extend(codes);
        }
        self
    }

    pub fn codes(&self, facet: Facet) -> Option<&[String]> {
        self.facets.get(&facet).map(Vec::as_slice)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Facet, &[String])> {
        self.facets.iter().map(|(f, c)| (*f, c.as_slice()))
    }

    /// True when `object` carries, for every restricted facet, at least one
    /// of the requested codes.
    pub fn matches(&self, object: &RegistryObject) -> bool {
        self.facets.iter().all(|(facet, wanted)| {
            object
                .codes(*facet)
                .any(|code| wanted.iter().any(|w| w == code))
        })
    }
}

/// Registry backend adapter.
///
/// Guarantees:
/// - Lookups that find nothing return `Ok(None)` or an empty list, never an error.
/// - Returned lists contain each id at most once.
/// - Failures are reported once, as `StorageError`; the caller does not retry.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Fetch any registry object by its system identifier.
    async fn fetch_by_id(&self, id: &str) -> StorageResult<Option<RegistryObject>>;

    /// Fetch a registry object by its business identifier (`uniqueId`).
    async fn fetch_by_business_key(&self, key: &str) -> StorageResult<Option<RegistryObject>>;

    /// Document entries that are `HasMember` targets of `parent_id` and pass
    /// `filters`.
    async fn fetch_members(
        &self,
        parent_id: &str,
        filters: &MemberFilters,
    ) -> StorageResult<Vec<RegistryObject>>;

    /// Every object that is the target of an `association_type` association
    /// whose source is `parent_id`.
    async fn fetch_structural_relation(
        &self,
        parent_id: &str,
        association_type: AssociationType,
    ) -> StorageResult<Vec<RegistryObject>>;

    /// Every association whose source or target is in `ids`.
    async fn fetch_associations_inclusive(
        &self,
        ids: &BTreeSet<String>,
    ) -> StorageResult<Vec<Association>>;
}
