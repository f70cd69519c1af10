//! Retrieval Router.
//!
//! Per query: generate and execute SQL first. Any returned rows become the
//! grounding and vector search is skipped. Zero rows or a [`QueryError`]
//! fall back to vector top-k. Both empty gives
//! [`GroundingContext::NoInformation`]. The two paths are never merged.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::grounding::GroundingContext;
use crate::core::errors::{with_timeout, QueryError};
use crate::embedding::EmbeddingService;
use crate::index::{QueryMatch, VectorIndexManager};
use crate::sql::{schema_description, QueryExecutor, QueryRow, StructuredQueryGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    Start,
    SqlAttempted,
    SqlGrounded,
    VectorGrounded,
    Done,
}

/// Whether the vector search may be issued before the SQL result is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    #[default]
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub grounding: GroundingContext,
    /// States visited, `Start` through `Done`.
    pub states: Vec<RouteState>,
    pub generated_query: Option<String>,
    /// Structured-path failure that triggered the fallback, if any.
    #[serde(skip)]
    pub query_error: Option<QueryError>,
}

impl RouteOutcome {
    pub fn final_grounding_state(&self) -> Option<RouteState> {
        self.states
            .iter()
            .rev()
            .find(|s| matches!(s, RouteState::SqlGrounded | RouteState::VectorGrounded))
            .copied()
    }
}

struct SqlAttempt {
    query: Option<String>,
    result: Result<Vec<QueryRow>, QueryError>,
}

#[derive(Clone)]
pub struct RetrievalRouter {
    generator: StructuredQueryGenerator,
    executor: QueryExecutor,
    embedder: Arc<dyn EmbeddingService>,
    index: VectorIndexManager,
    index_name: String,
    schema: String,
    top_k: usize,
    embed_timeout: Duration,
    mode: RoutingMode,
}

impl RetrievalRouter {
    pub fn new(
        generator: StructuredQueryGenerator,
        executor: QueryExecutor,
        embedder: Arc<dyn EmbeddingService>,
        index: VectorIndexManager,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            executor,
            embedder,
            index,
            index_name: index_name.into(),
            schema: schema_description(),
            top_k: 3,
            embed_timeout: Duration::from_secs(60),
            mode: RoutingMode::Sequential,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_mode(mut self, mode: RoutingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub async fn route(&self, query: &str) -> RouteOutcome {
        let mut states = vec![RouteState::Start];

        let (attempt, early_matches) = match self.mode {
            RoutingMode::Sequential => (self.sql_path(query).await, None),
            RoutingMode::Concurrent => {
                let (attempt, matches) = tokio::join!(self.sql_path(query), self.vector_path(query));
                (attempt, Some(matches))
            }
        };
        states.push(RouteState::SqlAttempted);

        let SqlAttempt { query: generated_query, result } = attempt;
        let query_error = match result {
            Ok(rows) if !rows.is_empty() => {
                tracing::info!("Structured query returned {} rows", rows.len());
                states.push(RouteState::SqlGrounded);
                states.push(RouteState::Done);
                return RouteOutcome {
                    grounding: GroundingContext::Rows(rows),
                    states,
                    generated_query,
                    query_error: None,
                };
            }
            Ok(_) => {
                tracing::info!("Structured query returned no rows; using vector search");
                None
            }
            Err(err) => {
                tracing::warn!("Structured query failed, falling back to vector search: {}", err);
                Some(err)
            }
        };

        let matches = match early_matches {
            Some(matches) => matches,
            None => self.vector_path(query).await,
        };
        states.push(RouteState::VectorGrounded);
        states.push(RouteState::Done);

        let grounding = if matches.is_empty() {
            GroundingContext::NoInformation
        } else {
            GroundingContext::Matches(matches)
        };

        RouteOutcome {
            grounding,
            states,
            generated_query,
            query_error,
        }
    }

    async fn sql_path(&self, question: &str) -> SqlAttempt {
        let query = match self.generator.generate(question, &self.schema).await {
            Ok(query) => query,
            Err(err) => {
                return SqlAttempt {
                    query: None,
                    result: Err(err),
                }
            }
        };
        let result = self.executor.execute(&query).await;
        SqlAttempt {
            query: Some(query),
            result,
        }
    }

    /// Vector top-k. Failures are logged and read as "nothing found".
    async fn vector_path(&self, question: &str) -> Vec<QueryMatch> {
        let input = [question.to_string()];
        let vector = match with_timeout(self.embed_timeout, self.embedder.embed(&input)).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
            Ok(_) => {
                tracing::warn!("Embedding service returned no vector for the query");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!("Query embedding failed: {}", err);
                return Vec::new();
            }
        };

        match self.index.search(&self.index_name, &vector, self.top_k).await {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!("Vector search failed: {}", err);
                Vec::new()
            }
        }
    }
}
