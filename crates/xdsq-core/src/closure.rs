//! Fixed-point association closure.
//!
//! Starting from the seed ids (root plus gathered objects), each round asks
//! the backend for associations touching the ids accepted in the previous
//! round. Fetched associations land in the bundle as candidates; a candidate
//! is accepted once both of its endpoints are accepted. The loop stops when
//! a round accepts nothing new. Objects are never added here.

use std::collections::BTreeSet;

use registry_state::{RegistryBackend, StorageError};
use tracing::{debug, error};

use crate::bundle::MetadataBundle;

/// Round bound used when none is configured.
pub const DEFAULT_MAX_CLOSURE_ROUNDS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ClosureError {
    #[error(transparent)]
    Backend(#[from] StorageError),

    #[error("no fixed point within {max_rounds} rounds")]
    DidNotConverge { max_rounds: usize },
}

/// Expand `seeds` to the accepted id set for `bundle`.
///
/// `max_rounds` bounds the rounds that accept new ids. One further backend
/// query confirms the fixed point, so a bound of 1 closes any bundle whose
/// associations all link seeds directly.
///
/// The bundle gains every fetched association, accepted or not; callers
/// follow up with [`MetadataBundle::filter`] on the returned set.
pub async fn close(
    backend: &dyn RegistryBackend,
    bundle: &mut MetadataBundle,
    seeds: BTreeSet<String>,
    max_rounds: usize,
) -> Result<BTreeSet<String>, ClosureError> {
    let mut accepted = seeds;
    let mut frontier = accepted.clone();
    let mut round = 0;

    loop {
        let fetched = backend.fetch_associations_inclusive(&frontier).await?;
        let fetched_count = fetched.len();
        bundle.extend_associations(fetched);

        let newly_accepted: BTreeSet<String> = bundle
            .associations()
            .filter(|a| {
                !accepted.contains(a.id())
                    && accepted.contains(a.source_id())
                    && accepted.contains(a.target_id())
            })
            .map(|a| a.id().to_string())
            .collect();

        debug!(
            round = round + 1,
            frontier = frontier.len(),
            fetched = fetched_count,
            accepted = newly_accepted.len(),
            "closure round"
        );

        if newly_accepted.is_empty() {
            return Ok(accepted);
        }
        if round == max_rounds {
            error!(max_rounds, "association closure did not reach a fixed point");
            return Err(ClosureError::DidNotConverge { max_rounds });
        }
        round += 1;
        accepted.extend(newly_accepted.iter().cloned());
        frontier = newly_accepted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_state::{
        Association, AssociationType, MemoryRegistryBackend, ObjectKind, RegistryObject,
    };

    fn doc(id: &str) -> RegistryObject {
        RegistryObject::new(id, ObjectKind::DocumentEntry)
    }

    fn assoc(id: &str, kind: AssociationType, source: &str, target: &str) -> Association {
        Association::new(id, kind, source, target)
    }

    fn ids(set: &[&str]) -> BTreeSet<String> {
        set.iter().map(|s| s.to_string()).collect()
    }

    fn backend() -> MemoryRegistryBackend {
        MemoryRegistryBackend::new()
            .with_object(RegistryObject::new("ss1", ObjectKind::SubmissionSet))
            .and_then(|b| b.with_object(doc("d1")))
            .and_then(|b| b.with_object(doc("d2")))
            .and_then(|b| b.with_association(assoc("a1", AssociationType::HasMember, "ss1", "d1")))
            .and_then(|b| b.with_association(assoc("a2", AssociationType::HasMember, "ss1", "d2")))
            .and_then(|b| b.with_association(assoc("a3", AssociationType::Replace, "d2", "d1")))
            // depends on a1, which depends on d1
            .and_then(|b| b.with_association(assoc("a4", AssociationType::Signs, "a3", "a1")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_closure_accepts_only_both_endpoint_links() {
        let backend = backend();
        let mut bundle = MetadataBundle::new();
        bundle.extend_objects([RegistryObject::new("ss1", ObjectKind::SubmissionSet), doc("d2")]);

        let seeds = bundle.all_ids();
        let accepted = close(&backend, &mut bundle, seeds, 10).await.unwrap();
        assert_eq!(accepted, ids(&["ss1", "d2", "a2"]));

        bundle.filter(&accepted);
        assert!(bundle.dangling_references().is_empty());
        assert!(bundle.object("d1").is_none());
    }

    #[tokio::test]
    async fn test_closure_follows_association_chains() {
        let backend = backend();
        let mut bundle = MetadataBundle::new();
        bundle.extend_objects([
            RegistryObject::new("ss1", ObjectKind::SubmissionSet),
            doc("d1"),
            doc("d2"),
        ]);

        let seeds = bundle.all_ids();
        let accepted = close(&backend, &mut bundle, seeds, 10).await.unwrap();
        assert_eq!(
            accepted,
            ids(&["ss1", "d1", "d2", "a1", "a2", "a3", "a4"])
        );
    }

    #[tokio::test]
    async fn test_closure_bound_is_enforced() {
        let backend = backend();
        let mut bundle = MetadataBundle::new();
        bundle.extend_objects([
            RegistryObject::new("ss1", ObjectKind::SubmissionSet),
            doc("d1"),
            doc("d2"),
        ]);

        // a4 needs a second round
        let seeds = bundle.all_ids();
        let err = close(&backend, &mut bundle, seeds, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ClosureError::DidNotConverge { max_rounds: 1 }));
    }

    #[tokio::test]
    async fn test_single_round_bound_closes_direct_links() {
        let backend = backend();
        let mut bundle = MetadataBundle::new();
        bundle.extend_objects([RegistryObject::new("ss1", ObjectKind::SubmissionSet), doc("d2")]);

        let seeds = bundle.all_ids();
        let accepted = close(&backend, &mut bundle, seeds, 1).await.unwrap();
        assert_eq!(accepted, ids(&["ss1", "d2", "a2"]));
    }

    #[tokio::test]
    async fn test_closure_with_no_associations() {
        let backend = MemoryRegistryBackend::new();
        let mut bundle = MetadataBundle::new();
        bundle.add_object(doc("lonely"));

        let seeds = bundle.all_ids();
        let accepted = close(&backend, &mut bundle, seeds, 3).await.unwrap();
        assert_eq!(accepted, ids(&["lonely"]));
        assert_eq!(bundle.association_count(), 0);
    }
}
