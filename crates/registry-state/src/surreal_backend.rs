//! SurrealDB-backed RegistryBackend implementation
//!
//! Uses `schema::ObjectRow` and `schema::AssociationRow` for persistence,
//! converting to/from `metadata` types at the boundary. Classification
//! filtering reuses `MemberFilters::matches` so both adapters agree on facet
//! semantics.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::handle;
use crate::metadata::{Association, AssociationType, ObjectKind, RegistryObject, RegistrySnapshot};
use crate::schema::{AssociationRow, ObjectRow};
use crate::storage_traits::{MemberFilters, RegistryBackend, StorageResult};

const WRITE_RECORDS: &str = r#"
    BEGIN TRANSACTION;
    FOR $row IN $objects {
        LET $clash = (SELECT VALUE association_id FROM associations WHERE association_id = $row.object_id);
        IF array::len($clash) > 0 {
            THROW string::concat("id already names an association: ", $row.object_id);
        };
        CREATE registry_objects CONTENT $row;
    };
    FOR $row IN $associations {
        LET $clash = (SELECT VALUE object_id FROM registry_objects WHERE object_id = $row.association_id);
        IF array::len($clash) > 0 {
            THROW string::concat("id already names a registry object: ", $row.association_id);
        };
        CREATE associations CONTENT $row;
    };
    COMMIT TRANSACTION;
"#;

/// Counts of records written by [`SurrealRegistryBackend::import_snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub objects: usize,
    pub associations: usize,
}

/// SurrealDB-backed implementation of [`RegistryBackend`].
pub struct SurrealRegistryBackend {
    db: Surreal<Any>,
}

impl SurrealRegistryBackend {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Ok(Self {
            db: handle::connect_in_memory().await?,
        })
    }

    /// Create from environment variables.
    ///
    /// Uses the connection chain of [`handle::connect_from_env`].
    pub async fn from_env() -> crate::Result<Self> {
        Ok(Self {
            db: handle::connect_from_env().await?,
        })
    }

    /// Wrap an existing connection. The schema must already be initialized.
    pub fn from_connection(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Write every record of `snapshot` in one transaction.
    ///
    /// Fails without writing anything if any id is already stored as an
    /// object or an association.
    pub async fn import_snapshot(&self, snapshot: &RegistrySnapshot) -> StorageResult<ImportSummary> {
        snapshot.validate()?;
        self.write_records(
            snapshot.objects.iter().map(ObjectRow::from).collect(),
            snapshot.associations.iter().map(AssociationRow::from).collect(),
        )
        .await?;
        let summary = ImportSummary {
            objects: snapshot.objects.len(),
            associations: snapshot.associations.len(),
        };
        info!(
            objects = summary.objects,
            associations = summary.associations,
            "registry snapshot imported"
        );
        Ok(summary)
    }

    pub async fn insert_object(&self, object: &RegistryObject) -> StorageResult<()> {
        debug!(object_id = %object.id(), kind = %object.kind(), "inserting registry object");
        self.write_records(vec![ObjectRow::from(object)], Vec::new())
            .await
    }

    pub async fn insert_association(&self, association: &Association) -> StorageResult<()> {
        debug!(association_id = %association.id(), "inserting association");
        self.write_records(Vec::new(), vec![AssociationRow::from(association)])
            .await
    }

    // -- private helpers -----------------------------------------------------

    /// Objects and associations share one id namespace. The UNIQUE indexes
    /// cover each table alone, so the other table is checked per row.
    async fn write_records(
        &self,
        objects: Vec<ObjectRow>,
        associations: Vec<AssociationRow>,
    ) -> StorageResult<()> {
        self.db
            .query(WRITE_RECORDS)
            .bind(("objects", objects))
            .bind(("associations", associations))
            .await?
            .check()?;
        Ok(())
    }

    /// Ids of objects targeted by `association_type` edges from `parent_id`.
    async fn target_ids(
        &self,
        parent_id: &str,
        association_type: AssociationType,
    ) -> StorageResult<Vec<String>> {
        let mut res = self
            .db
            .query(
                "SELECT VALUE target_id FROM associations \
                 WHERE source_id = $parent AND association_type = $atype",
            )
            .bind(("parent", parent_id.to_string()))
            .bind(("atype", association_type.as_str().to_string()))
            .await?;
        Ok(res.take(0)?)
    }

    async fn objects_by_ids(
        &self,
        ids: Vec<String>,
        kind: Option<ObjectKind>,
    ) -> StorageResult<Vec<RegistryObject>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut res = match kind {
            Some(kind) => {
                self.db
                    .query(
                        "SELECT * FROM registry_objects \
                         WHERE object_id INSIDE $ids AND kind = $kind ORDER BY object_id",
                    )
                    .bind(("ids", ids))
                    .bind(("kind", kind.as_str().to_string()))
                    .await?
            }
            None => {
                self.db
                    .query("SELECT * FROM registry_objects WHERE object_id INSIDE $ids ORDER BY object_id")
                    .bind(("ids", ids))
                    .await?
            }
        };
        let rows: Vec<ObjectRow> = res.take(0)?;
        rows.into_iter().map(RegistryObject::try_from).collect()
    }

    async fn first_object(
        &self,
        sql: &'static str,
        name: &'static str,
        value: &str,
    ) -> StorageResult<Option<RegistryObject>> {
        let mut res = self.db.query(sql).bind((name, value.to_string())).await?;
        let rows: Vec<ObjectRow> = res.take(0)?;
        rows.into_iter()
            .next()
            .map(RegistryObject::try_from)
            .transpose()
    }
}

#[async_trait]
impl RegistryBackend for SurrealRegistryBackend {
    async fn fetch_by_id(&self, id: &str) -> StorageResult<Option<RegistryObject>> {
        self.first_object(
            "SELECT * FROM registry_objects WHERE object_id = $id LIMIT 1",
            "id",
            id,
        )
        .await
    }

    async fn fetch_by_business_key(&self, key: &str) -> StorageResult<Option<RegistryObject>> {
        self.first_object(
            "SELECT * FROM registry_objects WHERE unique_id = $key ORDER BY object_id LIMIT 1",
            "key",
            key,
        )
        .await
    }

    async fn fetch_members(
        &self,
        parent_id: &str,
        filters: &MemberFilters,
    ) -> StorageResult<Vec<RegistryObject>> {
        let ids = self.target_ids(parent_id, AssociationType::HasMember).await?;
        let candidates = self
            .objects_by_ids(ids, Some(ObjectKind::DocumentEntry))
            .await?;
        let members: Vec<RegistryObject> = candidates
            .into_iter()
            .filter(|o| filters.matches(o))
            .collect();
        debug!(parent_id, count = members.len(), "surreal backend: members");
        Ok(members)
    }

    async fn fetch_structural_relation(
        &self,
        parent_id: &str,
        association_type: AssociationType,
    ) -> StorageResult<Vec<RegistryObject>> {
        let ids = self.target_ids(parent_id, association_type).await?;
        self.objects_by_ids(ids, None).await
    }

    async fn fetch_associations_inclusive(
        &self,
        ids: &BTreeSet<String>,
    ) -> StorageResult<Vec<Association>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().cloned().collect();
        let mut res = self
            .db
            .query(
                "SELECT * FROM associations \
                 WHERE source_id INSIDE $ids OR target_id INSIDE $ids ORDER BY association_id",
            )
            .bind(("ids", ids))
            .await?;
        let rows: Vec<AssociationRow> = res.take(0)?;
        rows.into_iter().map(Association::try_from).collect()
    }
}
