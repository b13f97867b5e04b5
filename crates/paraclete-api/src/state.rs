//! Application state wiring all services together.
//!
//! The session manager and plan service are generic over the port traits;
//! AppState pins them to the concrete infra implementations.

use std::sync::Arc;
use std::time::Duration;

use paraclete_core::plan::PlanService;
use paraclete_core::session::manager::SessionManager;
use paraclete_infra::config::{load_api_key, load_config, resolve_data_dir};
use paraclete_infra::llm::openai::OpenAiGateway;
use paraclete_infra::pdf::WkhtmltopdfRenderer;
use paraclete_infra::sqlite::pool::DatabasePool;
use paraclete_infra::sqlite::transcript::SqliteTranscriptStore;
use paraclete_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteSessionManager = SessionManager<SqliteTranscriptStore, OpenAiGateway>;

pub type ConcretePlanService = PlanService<OpenAiGateway, WkhtmltopdfRenderer>;

/// Shared application state holding the services and loaded config.
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<ConcreteSessionManager>,
    pub plan_service: Arc<ConcretePlanService>,
    pub config: AppConfig,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    ///
    /// Fails if `OPENAI_API_KEY` is unset or the database cannot be opened.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let api_key = load_api_key()?;

        // Initialize database
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("paraclete.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let store = SqliteTranscriptStore::new(db_pool.clone());

        let gateway_timeout = Duration::from_secs(config.gateway_timeout_secs);

        // Each service gets its own gateway instance (they are not shared;
        // the client inside is already connection-pooled).
        let ask_gateway = OpenAiGateway::new(
            &api_key,
            &config.model,
            config.temperature,
            config.gateway_max_retries,
            gateway_timeout,
        );
        let plan_gateway = OpenAiGateway::new(
            &api_key,
            &config.model,
            config.temperature,
            config.gateway_max_retries,
            gateway_timeout,
        );

        let session_manager =
            SessionManager::new(store, ask_gateway, &config.persona, config.ask_max_tokens);

        let plan_service = PlanService::new(
            plan_gateway,
            WkhtmltopdfRenderer::new(&config.wkhtmltopdf_bin),
            config.plan_max_tokens,
        );

        Ok(Self {
            session_manager: Arc::new(session_manager),
            plan_service: Arc::new(plan_service),
            config,
            db_pool,
        })
    }
}
