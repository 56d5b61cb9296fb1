//! Root object resolution by entry UUID or business unique id.

use registry_state::{ObjectKind, RegistryBackend, RegistryObject, StorageResult};
use tracing::{debug, warn};

use crate::domain::ParameterSet;

/// Which object kind a query is anchored on and the alternative parameter
/// pair that names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootSpec {
    pub kind: ObjectKind,
    pub entry_uuid_param: &'static str,
    pub unique_id_param: &'static str,
}

/// The identifier a request used for its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKey<'a> {
    EntryUuid(&'a str),
    UniqueId(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(RegistryObject),
    NotFound,
}

impl RootSpec {
    pub fn key<'a>(&self, params: &'a ParameterSet) -> Option<RootKey<'a>> {
        params
            .get_str(self.entry_uuid_param)
            .map(RootKey::EntryUuid)
            .or_else(|| params.get_str(self.unique_id_param).map(RootKey::UniqueId))
    }
}

/// Fetch the root named in `params`.
///
/// Both key forms return the stored object itself, so they agree for the
/// same entry. An object of the wrong kind resolves to `NotFound`.
pub async fn resolve_root(
    backend: &dyn RegistryBackend,
    root: &RootSpec,
    params: &ParameterSet,
) -> StorageResult<Resolution> {
    let fetched = match root.key(params) {
        Some(RootKey::EntryUuid(id)) => backend.fetch_by_id(id).await?,
        Some(RootKey::UniqueId(unique_id)) => {
            match backend.fetch_by_business_key(unique_id).await? {
                Some(object) => {
                    debug!(unique_id = %unique_id, id = %object.id(), "resolved business key");
                    Some(object)
                }
                None => None,
            }
        }
        None => {
            warn!(kind = %root.kind, "no root identifier in validated parameters");
            None
        }
    };

    Ok(match fetched {
        Some(object) if object.kind() == root.kind => Resolution::Found(object),
        Some(object) => {
            debug!(
                id = %object.id(),
                expected = %root.kind,
                actual = %object.kind(),
                "root has the wrong kind"
            );
            Resolution::NotFound
        }
        None => Resolution::NotFound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{validate_params, ParamRule, RawParams};
    use registry_state::MemoryRegistryBackend;

    const SPEC: RootSpec = RootSpec {
        kind: ObjectKind::Folder,
        entry_uuid_param: "$XDSFolderEntryUUID",
        unique_id_param: "$XDSFolderUniqueId",
    };

    const RULES: &[ParamRule] = &[
        ParamRule::required("$XDSFolderEntryUUID").alternative("$XDSFolderUniqueId"),
        ParamRule::required("$XDSFolderUniqueId").alternative("$XDSFolderEntryUUID"),
    ];

    fn params(name: &str, value: &str) -> ParameterSet {
        validate_params(RULES, &RawParams::new().with_text(name, value)).unwrap()
    }

    fn backend() -> MemoryRegistryBackend {
        MemoryRegistryBackend::new()
            .with_object(RegistryObject::new("f1", ObjectKind::Folder).with_unique_id("2.1"))
            .and_then(|b| {
                b.with_object(
                    RegistryObject::new("d1", ObjectKind::DocumentEntry).with_unique_id("2.2"),
                )
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_both_keys_resolve_same_object() {
        let backend = backend();
        let by_id = resolve_root(&backend, &SPEC, &params("$XDSFolderEntryUUID", "f1"))
            .await
            .unwrap();
        let by_key = resolve_root(&backend, &SPEC, &params("$XDSFolderUniqueId", "2.1"))
            .await
            .unwrap();

        assert!(matches!(&by_id, Resolution::Found(o) if o.id() == "f1"));
        assert_eq!(by_id, by_key);
    }

    #[tokio::test]
    async fn test_missing_root_is_not_found() {
        let backend = backend();
        let res = resolve_root(&backend, &SPEC, &params("$XDSFolderEntryUUID", "nope"))
            .await
            .unwrap();
        assert_eq!(res, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_wrong_kind_is_not_found() {
        let backend = backend();
        let res = resolve_root(&backend, &SPEC, &params("$XDSFolderUniqueId", "2.2"))
            .await
            .unwrap();
        assert_eq!(res, Resolution::NotFound);
    }
}
