use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::assistant::{load_system_prompt, AnswerSynthesizer, ProductAssistant};
use crate::context::WindowConfig;
use crate::core::config::{EmbeddingBackend, Settings, VectorBackend};
use crate::core::errors::ConfigError;
use crate::embedding::{
    BatcherConfig, EmbeddingBatcher, EmbeddingService, HashingEmbedder, OpenAiEmbedder,
};
use crate::index::{
    IndexSettings, PineconeConfig, PineconeIndex, SqliteVectorIndex, VectorIndexManager,
    VectorIndexService,
};
use crate::ingest::IngestionPipeline;
use crate::llm::{CompletionService, OpenAiChat};
use crate::router::{RetrievalRouter, RoutingMode};
use crate::sql::{ProductStore, QueryExecutor, StructuredQueryGenerator};

pub mod error;
pub mod sessions;

use error::InitializationError;
pub use sessions::{SessionHandle, SessionRegistry};

/// Every outbound client and local store, built once from [`Settings`].
///
/// Nothing below this point reads configuration on its own; tests build
/// a `Services` by hand with fakes in any slot.
#[derive(Clone)]
pub struct Services {
    pub settings: Arc<Settings>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub completion: Arc<dyn CompletionService>,
    pub index: VectorIndexManager,
    pub store: ProductStore,
}

impl Services {
    pub async fn build(settings: Settings) -> Result<Self, InitializationError> {
        settings
            .paths
            .ensure_dirs()
            .map_err(|e| InitializationError::DataDir {
                path: settings.paths.data_dir.display().to_string(),
                message: e.to_string(),
            })?;

        let tuning = &settings.tuning;
        let api_key = settings
            .openai_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let embedder: Arc<dyn EmbeddingService> = match settings.embedding_backend {
            EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedder::new(
                api_key,
                &settings.openai_base_url,
                settings.embedding_model.clone(),
                tuning.embedding.request_timeout(),
            )?),
            EmbeddingBackend::Hashing { dimension } => Arc::new(HashingEmbedder::new(dimension)),
        };

        let completion: Arc<dyn CompletionService> = Arc::new(OpenAiChat::new(
            api_key,
            &settings.openai_base_url,
            settings.chat_model.clone(),
            tuning.query.generation_timeout(),
        )?);

        let backend: Arc<dyn VectorIndexService> = match &settings.vector_backend {
            VectorBackend::Sqlite => Arc::new(
                SqliteVectorIndex::open(&settings.paths.vectors_db)
                    .await
                    .map_err(InitializationError::Index)?,
            ),
            VectorBackend::Pinecone {
                api_key,
                control_url,
                cloud,
                region,
            } => Arc::new(PineconeIndex::new(PineconeConfig {
                api_key: api_key.clone(),
                control_url: control_url.clone(),
                cloud: cloud.clone(),
                region: region.clone(),
                timeout: tuning.index.request_timeout(),
            })?),
        };
        let index = VectorIndexManager::new(backend, IndexSettings::from(&tuning.index));

        let store = ProductStore::open(&settings.paths.products_db)
            .await
            .map_err(InitializationError::Store)?;

        tracing::info!(
            "Services ready (embedding: {}, chat: {}, index: {} on {})",
            embedder.name(),
            completion.name(),
            settings.index_name,
            index.backend()
        );

        Ok(Self {
            settings: Arc::new(settings),
            embedder,
            completion,
            index,
            store,
        })
    }

    pub fn ingestion_pipeline(&self) -> IngestionPipeline {
        let batcher = EmbeddingBatcher::new(
            self.embedder.clone(),
            BatcherConfig::from(&self.settings.tuning.embedding),
        );
        IngestionPipeline::new(
            batcher,
            self.index.clone(),
            self.store.clone(),
            self.settings.index_name.clone(),
        )
    }

    pub fn router(&self) -> RetrievalRouter {
        let query = &self.settings.tuning.query;
        let generator =
            StructuredQueryGenerator::new(self.completion.clone(), query.generation_timeout());
        let executor = QueryExecutor::new(self.store.reader(), query.execution_timeout())
            .with_statement_guard(query.statement_guard);
        let mode = if query.concurrent_paths {
            RoutingMode::Concurrent
        } else {
            RoutingMode::Sequential
        };

        RetrievalRouter::new(
            generator,
            executor,
            self.embedder.clone(),
            self.index.clone(),
            self.settings.index_name.clone(),
        )
        .with_top_k(query.top_k)
        .with_mode(mode)
        .with_embed_timeout(self.settings.tuning.embedding.request_timeout())
    }

    /// Loads the system prompt document and wires router plus synthesizer.
    pub async fn assistant(&self) -> Result<ProductAssistant, InitializationError> {
        let system_prompt = load_system_prompt(&self.settings.prompt_path).await?;
        let synthesizer = AnswerSynthesizer::new(
            self.completion.clone(),
            system_prompt,
            self.settings.tuning.query.generation_timeout(),
        );
        Ok(ProductAssistant::new(self.router(), synthesizer))
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig::from(&self.settings.tuning.conversation)
    }

    pub fn session_registry(&self) -> SessionRegistry {
        SessionRegistry::new(
            self.window_config(),
            self.settings.tuning.conversation.max_sessions,
        )
    }
}

/// Shared state behind the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub assistant: ProductAssistant,
    pub sessions: SessionRegistry,
    pub index_name: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize(services: &Services) -> Result<Arc<Self>, InitializationError> {
        let assistant = services.assistant().await?;
        Ok(Self::from_parts(
            assistant,
            services.session_registry(),
            services.settings.index_name.clone(),
        ))
    }

    pub fn from_parts(
        assistant: ProductAssistant,
        sessions: SessionRegistry,
        index_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(AppState {
            assistant,
            sessions,
            index_name: index_name.into(),
            started_at: Utc::now(),
        })
    }
}
