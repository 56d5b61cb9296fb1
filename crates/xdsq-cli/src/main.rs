//! XDSQ - XDS Stored Query CLI
//!
//! The `xdsq` command runs registry stored queries and prints the response.
//!
//! ## Commands
//!
//! - `query`: Run a stored query against a JSON fixture or SurrealDB
//! - `import`: Load a JSON fixture into SurrealDB
//! - `queries`: List the supported stored queries

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use registry_state::{
    MemoryRegistryBackend, RegistryBackend, RegistrySnapshot, SurrealRegistryBackend,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

use xdsq_core::{
    AdhocQueryResponse, EngineConfig, QueryRequest, RawParams, ReturnType, StoredQueryEngine,
    STORED_QUERIES,
};

#[derive(Parser)]
#[command(name = "xdsq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run XDS stored queries against a document registry", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a stored query and print the registry response as JSON
    Query {
        /// Query id: URN or short name (e.g. GetSubmissionSetAndContents)
        #[arg(short, long)]
        query: String,

        /// Parameter as NAME=VALUE, VALUE in slot syntax: 'text', ('a','b') or 42
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Registry fixture (JSON snapshot) to query instead of SurrealDB
        #[arg(short, long, env = "XDSQ_FIXTURE")]
        fixture: Option<PathBuf>,

        /// LeafClass or ObjectRef (overrides XDSQ_RETURN_TYPE)
        #[arg(long)]
        return_type: Option<ReturnType>,

        /// Fail with XDSRegistryOutOfResources above this many entries
        #[arg(long)]
        max_results: Option<usize>,

        /// Closure round bound (overrides XDSQ_MAX_CLOSURE_ROUNDS)
        #[arg(long)]
        max_closure_rounds: Option<usize>,
    },

    /// Import a registry fixture (JSON snapshot) into SurrealDB
    Import {
        /// Path to the fixture file
        fixture: PathBuf,
    },

    /// List supported stored queries and their parameters
    Queries,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    xdsq_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Query {
            query,
            params,
            fixture,
            return_type,
            max_results,
            max_closure_rounds,
        } => {
            let config = build_config(return_type, max_results, max_closure_rounds)?;
            let backend = open_backend(fixture.as_deref()).await?;
            let response = cmd_query(backend, config, &query, &params).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Import { fixture } => {
            cmd_import(&fixture).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Queries => {
            println!("{}", serde_json::to_string_pretty(&query_listing())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run one stored query against `backend`.
async fn cmd_query(
    backend: Arc<dyn RegistryBackend>,
    config: EngineConfig,
    query: &str,
    params: &[String],
) -> Result<AdhocQueryResponse> {
    let request = QueryRequest::new(query, collect_params(params)?);
    let engine = StoredQueryEngine::new(backend, config);
    Ok(engine.respond(&request).await)
}

/// Load a fixture into the configured SurrealDB registry
async fn cmd_import(fixture: &Path) -> Result<()> {
    let snapshot = load_fixture(fixture)?;
    let backend = SurrealRegistryBackend::from_env()
        .await
        .context("Failed to connect to registry database")?;
    let summary = backend
        .import_snapshot(&snapshot)
        .await
        .with_context(|| format!("Failed to import {:?}", fixture))?;

    info!(objects = summary.objects, associations = summary.associations, "import finished");
    println!(
        "Imported {} objects and {} associations",
        summary.objects, summary.associations
    );
    Ok(())
}

fn build_config(
    return_type: Option<ReturnType>,
    max_results: Option<usize>,
    max_closure_rounds: Option<usize>,
) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env().context("Invalid XDSQ_* environment")?;
    if let Some(return_type) = return_type {
        config = config.with_return_type(return_type);
    }
    if max_results.is_some() {
        config = config.with_max_results(max_results);
    }
    if let Some(rounds) = max_closure_rounds {
        config = config.with_max_closure_rounds(rounds)?;
    }
    Ok(config)
}

async fn open_backend(fixture: Option<&Path>) -> Result<Arc<dyn RegistryBackend>> {
    match fixture {
        Some(path) => {
            let snapshot = load_fixture(path)?;
            let backend = MemoryRegistryBackend::from_snapshot(snapshot)
                .with_context(|| format!("Inconsistent fixture {:?}", path))?;
            Ok(Arc::new(backend))
        }
        None => {
            let backend = SurrealRegistryBackend::from_env()
                .await
                .context("Failed to connect to registry database")?;
            Ok(Arc::new(backend))
        }
    }
}

fn load_fixture(path: &Path) -> Result<RegistrySnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture: {:?}", path))?;
    RegistrySnapshot::from_json(&content).with_context(|| format!("Invalid fixture JSON in {:?}", path))
}

/// Split `NAME=VALUE`.
fn parse_param_arg(arg: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = arg.split_once('=') else {
        bail!("parameter {:?} is not NAME=VALUE", arg);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("parameter {:?} has an empty name", arg);
    }
    Ok((name, value))
}

/// Group `--param` values by name; a repeated name becomes a multi-value slot.
fn collect_params(args: &[String]) -> Result<RawParams> {
    let mut slots: Vec<(&str, Vec<&str>)> = Vec::new();
    for arg in args {
        let (name, value) = parse_param_arg(arg)?;
        match slots.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => slots.push((name, vec![value])),
        }
    }
    Ok(RawParams::from_slots(slots)?)
}

#[derive(Debug, Serialize)]
struct QueryListing {
    name: &'static str,
    id: &'static str,
    parameters: Vec<ParameterListing>,
}

#[derive(Debug, Serialize)]
struct ParameterListing {
    name: &'static str,
    required: bool,
    repeatable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    alternative: Option<&'static str>,
}

fn query_listing() -> Vec<QueryListing> {
    STORED_QUERIES
        .iter()
        .map(|def| QueryListing {
            name: def.name,
            id: def.id,
            parameters: def
                .rules
                .iter()
                .map(|rule| ParameterListing {
                    name: rule.name,
                    required: rule.required,
                    repeatable: rule.repeatable,
                    alternative: rule.alternative,
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdsq_core::{RawParamValue, RawScalar, ResponseStatus};

    const FIXTURE: &str = r#"{
  "objects": [
    {"id": "SS1", "kind": "SubmissionSet", "attributes": {"uniqueId": "1.2.3"}},
    {"id": "D1", "kind": "DocumentEntry",
     "classifications": [{"facet": "confidentialityCode", "code": "N"}]},
    {"id": "D2", "kind": "DocumentEntry",
     "classifications": [{"facet": "confidentialityCode", "code": "C2"}]}
  ],
  "associations": [
    {"id": "A1", "associationType": "HasMember", "sourceId": "SS1", "targetId": "D1"},
    {"id": "A2", "associationType": "HasMember", "sourceId": "SS1", "targetId": "D2"}
  ]
}"#;

    fn write_fixture(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("registry.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_param_arg() {
        assert_eq!(
            parse_param_arg("$XDSSubmissionSetEntryUUID='a=b'").unwrap(),
            ("$XDSSubmissionSetEntryUUID", "'a=b'")
        );
        assert!(parse_param_arg("no-equals").is_err());
        assert!(parse_param_arg(" ='x'").is_err());
    }

    #[test]
    fn test_repeated_param_becomes_list() {
        let params = collect_params(&args(&[
            "$XDSDocumentEntryFormatCode='pdf'",
            "$XDSDocumentEntryFormatCode=('cda')",
        ]))
        .unwrap();
        assert_eq!(
            params.get("$XDSDocumentEntryFormatCode"),
            Some(&RawParamValue::List(vec![
                RawScalar::text("pdf"),
                RawScalar::text("cda"),
            ]))
        );
    }

    #[test]
    fn test_bad_slot_text_is_rejected() {
        let err = collect_params(&args(&["$XDSSubmissionSetEntryUUID='open"])).unwrap_err();
        assert!(format!("{err:#}").contains("unterminated"));
    }

    #[test]
    fn test_load_fixture_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "{ not json");
        let err = load_fixture(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid fixture JSON"));

        let missing = dir.path().join("missing.json");
        let err = load_fixture(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read fixture"));
    }

    #[tokio::test]
    async fn test_query_against_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, FIXTURE);
        let backend = open_backend(Some(path.as_path())).await.unwrap();

        let response = cmd_query(
            backend,
            EngineConfig::default(),
            "GetSubmissionSetAndContents",
            &args(&[
                "$XDSSubmissionSetUniqueId='1.2.3'",
                "$XDSDocumentEntryConfidentialityCode=('C2')",
            ]),
        )
        .await
        .unwrap();

        assert_eq!(response.status, ResponseStatus::Success);
        let ids: Vec<&str> = response.objects.iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec!["D2", "SS1"]);
        assert_eq!(response.associations.len(), 1);
    }

    #[tokio::test]
    async fn test_object_ref_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, FIXTURE);
        let backend = open_backend(Some(path.as_path())).await.unwrap();
        let config = EngineConfig::default().with_return_type(ReturnType::ObjectRef);

        let response = cmd_query(
            backend,
            config,
            "urn:uuid:e8e3cb2c-e39c-46b9-99e4-c12f57260b83",
            &args(&["$XDSSubmissionSetEntryUUID='SS1'"]),
        )
        .await
        .unwrap();

        assert_eq!(response.object_refs, vec!["D1", "D2", "SS1", "A1", "A2"]);
    }

    #[test]
    fn test_query_listing_covers_table() {
        let listing = query_listing();
        assert_eq!(listing.len(), STORED_QUERIES.len());
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json[0]["name"], "GetSubmissionSetAndContents");
        assert_eq!(json[0]["parameters"][0]["required"], true);
    }

    #[test]
    fn test_cli_parses_query_command() {
        let cli = Cli::try_parse_from([
            "xdsq",
            "--verbose",
            "query",
            "--query",
            "GetFolderAndContents",
            "-p",
            "$XDSFolderEntryUUID='F1'",
            "--return-type",
            "ObjectRef",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Query {
                query,
                params,
                return_type,
                ..
            } => {
                assert_eq!(query, "GetFolderAndContents");
                assert_eq!(params, vec!["$XDSFolderEntryUUID='F1'"]);
                assert_eq!(return_type, Some(ReturnType::ObjectRef));
            }
            _ => panic!("expected query command"),
        }
    }
}
