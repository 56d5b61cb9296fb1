//! The stored query pipeline.
//!
//! `Validating → Resolving → Gathering → Closing → Filtering → Done`, with
//! `EmptyResult` reached from `Resolving` when the root does not exist and
//! `Failed` reachable from any phase. Each request runs the pipeline once.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use registry_state::{RegistryBackend, StorageError};
use serde::Serialize;
use tracing::{debug, error, Instrument};
use uuid::Uuid;

use crate::bundle::{MetadataBundle, QueryResult};
use crate::closure::{self, ClosureError};
use crate::config::EngineConfig;
use crate::domain::{validate_params, QueryError, RawParams, Result};
use crate::obs;
use crate::queries;
use crate::resolve::{resolve_root, Resolution};
use crate::response::AdhocQueryResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryPhase {
    Validating,
    Resolving,
    Gathering,
    Closing,
    Filtering,
    Done,
    EmptyResult,
    Failed,
}

impl QueryPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryPhase::Done | QueryPhase::EmptyResult | QueryPhase::Failed
        )
    }
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Receives every phase transition of every query the engine runs.
pub trait QueryObserver: Send + Sync {
    fn on_phase(&self, query_id: &str, phase: QueryPhase);
}

/// A stored query invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query_id: String,
    pub params: RawParams,
}

impl QueryRequest {
    pub fn new(query_id: impl Into<String>, params: RawParams) -> Self {
        Self {
            query_id: query_id.into(),
            params,
        }
    }
}

/// A successful execution: either `Done` with a closed result or
/// `EmptyResult` because the root does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Canonical URN of the query that ran.
    pub query_id: String,
    pub request_id: Uuid,
    pub phase: QueryPhase,
    pub result: QueryResult,
}

impl QueryOutcome {
    pub fn is_empty_result(&self) -> bool {
        self.phase == QueryPhase::EmptyResult
    }
}

pub struct StoredQueryEngine {
    backend: Arc<dyn RegistryBackend>,
    config: EngineConfig,
    observer: Option<Arc<dyn QueryObserver>>,
}

impl StoredQueryEngine {
    pub fn new(backend: Arc<dyn RegistryBackend>, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one stored query.
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let request_id = Uuid::new_v4();
        let span = obs::query_span(
            &request_id.to_string(),
            queries::canonical_id(&request.query_id),
        );
        self.execute_inner(request_id, request).instrument(span).await
    }

    /// Run one stored query and shape the result as a registry response.
    pub async fn respond(&self, request: &QueryRequest) -> AdhocQueryResponse {
        let result = self.execute(request).await;
        AdhocQueryResponse::from_result(&result, &self.config)
    }

    async fn execute_inner(&self, request_id: Uuid, request: &QueryRequest) -> Result<QueryOutcome> {
        let started = Instant::now();
        obs::emit_query_started(
            &request_id.to_string(),
            queries::canonical_id(&request.query_id),
        );

        let result = self.run(request_id, request).await;
        match &result {
            Ok(outcome) => obs::emit_query_finished(
                &outcome.query_id,
                started.elapsed().as_millis() as u64,
                outcome.result.objects.len(),
                outcome.result.associations.len(),
                outcome.is_empty_result(),
            ),
            Err(err) => {
                self.transition(err.query_id(), QueryPhase::Failed);
                obs::emit_query_failed(err.query_id(), err.category(), err);
            }
        }
        result
    }

    async fn run(&self, request_id: Uuid, request: &QueryRequest) -> Result<QueryOutcome> {
        let def = queries::lookup(&request.query_id).ok_or_else(|| QueryError::UnknownQuery {
            query_id: request.query_id.clone(),
        })?;
        let query_id = def.id;
        let backend = self.backend.as_ref();
        let backend_error = |cause: StorageError| QueryError::Backend {
            query_id: query_id.to_string(),
            cause,
        };

        self.transition(query_id, QueryPhase::Validating);
        let params =
            validate_params(def.rules, &request.params).map_err(|source| QueryError::Validation {
                query_id: query_id.to_string(),
                source,
            })?;

        self.transition(query_id, QueryPhase::Resolving);
        let root = match resolve_root(backend, &def.root, &params)
            .await
            .map_err(backend_error)?
        {
            Resolution::Found(root) => root,
            Resolution::NotFound => {
                debug!(query_id = %query_id, "root not found");
                self.transition(query_id, QueryPhase::EmptyResult);
                return Ok(QueryOutcome {
                    query_id: query_id.to_string(),
                    request_id,
                    phase: QueryPhase::EmptyResult,
                    result: QueryResult::default(),
                });
            }
        };

        self.transition(query_id, QueryPhase::Gathering);
        let gathered = (def.gather)(backend, &root, &params)
            .await
            .map_err(backend_error)?;
        let mut bundle = MetadataBundle::new();
        bundle.add_object(root);
        bundle.extend_objects(gathered);

        self.transition(query_id, QueryPhase::Closing);
        let seeds = bundle.object_ids();
        let accepted = closure::close(
            backend,
            &mut bundle,
            seeds,
            self.config.max_closure_rounds(),
        )
        .await
        .map_err(|err| match err {
            ClosureError::Backend(cause) => backend_error(cause),
            ClosureError::DidNotConverge { max_rounds } => QueryError::ClosureDidNotConverge {
                query_id: query_id.to_string(),
                max_rounds,
            },
        })?;

        self.transition(query_id, QueryPhase::Filtering);
        bundle.filter(&accepted);
        let dangling = bundle.dangling_references();
        if let Some(first) = dangling.first() {
            error!(
                query_id = %query_id,
                association_id = %first.association_id,
                missing_id = %first.missing_id,
                count = dangling.len(),
                "closed bundle holds dangling references"
            );
            debug_assert!(dangling.is_empty(), "dangling references after closure");
            return Err(QueryError::Inconsistency {
                query_id: query_id.to_string(),
                association_id: first.association_id.clone(),
                missing_id: first.missing_id.clone(),
            });
        }

        self.transition(query_id, QueryPhase::Done);
        Ok(QueryOutcome {
            query_id: query_id.to_string(),
            request_id,
            phase: QueryPhase::Done,
            result: bundle.into_result(),
        })
    }

    fn transition(&self, query_id: &str, phase: QueryPhase) {
        obs::emit_phase(query_id, phase);
        if let Some(observer) = &self.observer {
            observer.on_phase(query_id, phase);
        }
    }
}
