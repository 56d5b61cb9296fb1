//! Relation gathering strategies.
//!
//! Each stored query names one [`GatherFn`]. It receives the resolved root
//! and returns the directly related objects; the engine merges them into the
//! bundle afterwards.

use std::collections::BTreeSet;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use registry_state::{
    AssociationType, Facet, MemberFilters, ObjectKind, RegistryBackend, RegistryObject,
    StorageResult,
};
use tracing::debug;

use crate::domain::ParameterSet;

pub const FORMAT_CODE_PARAM: &str = "$XDSDocumentEntryFormatCode";
pub const CONFIDENTIALITY_CODE_PARAM: &str = "$XDSDocumentEntryConfidentialityCode";

/// A relation gathering strategy.
pub type GatherFn = for<'a> fn(
    &'a dyn RegistryBackend,
    &'a RegistryObject,
    &'a ParameterSet,
) -> BoxFuture<'a, StorageResult<Vec<RegistryObject>>>;

/// Member document filters taken from the request.
pub fn document_filters(params: &ParameterSet) -> MemberFilters {
    MemberFilters::new()
        .with_codes(Facet::FormatCode, params.get_list(FORMAT_CODE_PARAM))
        .with_codes(
            Facet::ConfidentialityCode,
            params.get_list(CONFIDENTIALITY_CODE_PARAM),
        )
}

/// Filtered member documents plus HasMember folders.
///
/// The two lookups are independent and run concurrently.
pub fn submission_set_contents<'a>(
    backend: &'a dyn RegistryBackend,
    root: &'a RegistryObject,
    params: &'a ParameterSet,
) -> BoxFuture<'a, StorageResult<Vec<RegistryObject>>> {
    async move {
        let filters = document_filters(params);
        let (documents, members) = tokio::try_join!(
            backend.fetch_members(root.id(), &filters),
            backend.fetch_structural_relation(root.id(), AssociationType::HasMember),
        )?;
        let folders: Vec<RegistryObject> = members
            .into_iter()
            .filter(|object| object.kind() == ObjectKind::Folder)
            .collect();
        debug!(
            root = %root.id(),
            documents = documents.len(),
            folders = folders.len(),
            "gathered submission set contents"
        );
        Ok(documents.into_iter().chain(folders).collect())
    }
    .boxed()
}

/// Filtered member documents.
pub fn folder_contents<'a>(
    backend: &'a dyn RegistryBackend,
    root: &'a RegistryObject,
    params: &'a ParameterSet,
) -> BoxFuture<'a, StorageResult<Vec<RegistryObject>>> {
    async move {
        let filters = document_filters(params);
        let documents = backend.fetch_members(root.id(), &filters).await?;
        debug!(root = %root.id(), documents = documents.len(), "gathered folder contents");
        Ok(documents)
    }
    .boxed()
}

/// Objects at the far end of the root's associations.
///
/// Endpoints that name associations rather than objects are skipped; the
/// closure stage decides which linking associations survive.
pub fn document_neighbours<'a>(
    backend: &'a dyn RegistryBackend,
    root: &'a RegistryObject,
    _params: &'a ParameterSet,
) -> BoxFuture<'a, StorageResult<Vec<RegistryObject>>> {
    async move {
        let seed = BTreeSet::from([root.id().to_string()]);
        let links = backend.fetch_associations_inclusive(&seed).await?;
        let far_ends: BTreeSet<&str> = links
            .iter()
            .flat_map(|a| [a.source_id(), a.target_id()])
            .filter(|id| *id != root.id())
            .collect();
        let fetched = try_join_all(far_ends.iter().map(|id| backend.fetch_by_id(id))).await?;
        let neighbours: Vec<RegistryObject> = fetched.into_iter().flatten().collect();
        debug!(
            root = %root.id(),
            associations = links.len(),
            neighbours = neighbours.len(),
            "gathered document neighbours"
        );
        Ok(neighbours)
    }
    .boxed()
}
