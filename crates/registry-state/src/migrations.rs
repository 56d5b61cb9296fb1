//! SurrealDB schema migrations and initialization
//!
//! Defines the two registry tables with their uniqueness constraints and the
//! indexes the backend's lookups rely on.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all registry tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing registry SurrealDB schema");

    init_registry_objects_table(db).await?;
    init_associations_table(db).await?;

    info!("Registry schema initialization complete");
    Ok(())
}

/// Initialize `registry_objects` table
///
/// Schema:
/// ```text
/// TABLE registry_objects {
///   object_id:        STRING (unique)
///   kind:             STRING (SubmissionSet | Folder | DocumentEntry)
///   unique_id:        STRING? (indexed)
///   attributes:       OBJECT
///   classifications:  ARRAY<{ facet, code }>
/// }
/// ```
async fn init_registry_objects_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing registry_objects table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS registry_objects SCHEMALESS;

        -- System identifiers are unique across the registry
        DEFINE INDEX IF NOT EXISTS idx_object_id ON TABLE registry_objects COLUMNS object_id UNIQUE;

        -- Business identifier lookups
        DEFINE INDEX IF NOT EXISTS idx_unique_id ON TABLE registry_objects COLUMNS unique_id;

        DEFINE INDEX IF NOT EXISTS idx_kind ON TABLE registry_objects COLUMNS kind;
    "#;

    db.query(sql)
        .await
        .and_then(|res| res.check())
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    info!("✓ registry_objects table initialized");
    Ok(())
}

/// Initialize `associations` table
///
/// Schema:
/// ```text
/// TABLE associations {
///   association_id:    STRING (unique)
///   association_type:  STRING (HasMember | RPLC | XFRM | APND | XFRM_RPLC | signs | IsSnapshotOf)
///   source_id:         STRING (indexed)
///   target_id:         STRING (indexed)
/// }
/// ```
async fn init_associations_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing associations table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS associations SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_association_id ON TABLE associations COLUMNS association_id UNIQUE;

        -- Endpoint lookups for closure queries
        DEFINE INDEX IF NOT EXISTS idx_source_id ON TABLE associations COLUMNS source_id;
        DEFINE INDEX IF NOT EXISTS idx_target_id ON TABLE associations COLUMNS target_id;

        -- Membership lookups (source + type)
        DEFINE INDEX IF NOT EXISTS idx_source_type ON TABLE associations COLUMNS source_id, association_type;
    "#;

    db.query(sql)
        .await
        .and_then(|res| res.check())
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    info!("✓ associations table initialized");
    Ok(())
}
