//! # Slotbook API
//!
//! The API crate provides the web server for the school vision-screening
//! booking service: availability snapshots per school and day, and the
//! booking, cancellation, completion and rescheduling of appointments.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate HTTP requests into allocator and store calls
//! - **Middleware**: Caller identity and error-to-response mapping
//! - **Config**: Environment and application configuration
//!
//! Booking logic lives in `slotbook-core`; persistence in `slotbook-db`.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Identity extraction and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    error_handling::HandleErrorLayer,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
};
use eyre::{Result, WrapErr};
use serde_json::{Value, json};
use slotbook_core::{
    allocator::{AllocatorPolicy, BookingAllocator},
    availability::AvailabilityCalculator,
    models::template::WorkingHoursTemplate,
    store::{BookingStore, SchoolDirectory},
    templates::TemplateResolver,
};
use slotbook_db::{
    create_pool,
    memory::{MemoryStore, Seed},
    schema::initialize_database,
    store::PgStore,
};
use tokio::net::TcpListener;
use tower::{BoxError, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::middleware::auth::USER_ID_HEADER;

/// Which storage implementation backs the running server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Shared application state that is accessible to all request handlers
///
/// # Example
///
/// ```no_run
/// # async fn example() -> eyre::Result<()> {
/// use slotbook_api::{app, build_state, config::ApiConfig};
///
/// let config = ApiConfig::from_env()?;
/// let state = build_state(&config).await?;
/// let router = app(state);
/// # Ok(())
/// # }
/// ```
pub struct ApiState {
    /// The only write path for appointments
    pub allocator: BookingAllocator,
    pub availability: AvailabilityCalculator,
    /// Direct read access for lookups and listings
    pub store: Arc<dyn BookingStore>,
    pub directory: Arc<dyn SchoolDirectory>,
    pub backend: StoreBackend,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn BookingStore>,
        directory: Arc<dyn SchoolDirectory>,
        backend: StoreBackend,
        default_template: WorkingHoursTemplate,
        policy: AllocatorPolicy,
    ) -> Self {
        let templates = TemplateResolver::new(directory.clone(), default_template);
        let allocator = BookingAllocator::new(store.clone(), directory.clone(), templates.clone(), policy);
        let availability = AvailabilityCalculator::new(store.clone(), directory.clone(), templates);

        Self {
            allocator,
            availability,
            store,
            directory,
            backend,
        }
    }
}

/// Connects the configured store and wires the booking services around it
///
/// With `DATABASE_URL` set, the PostgreSQL schema is initialized and the
/// PostgreSQL store is used. Otherwise an in-memory store is created, seeded
/// from `SEED_FILE` when one is given.
pub async fn build_state(config: &config::ApiConfig) -> Result<Arc<ApiState>> {
    let default_template = config.default_template();
    let policy = config.allocator_policy();

    let state = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url)
                .await
                .wrap_err("Failed to connect to the database")?;
            initialize_database(&pool).await?;

            let store = Arc::new(PgStore::new(pool));
            info!("Using PostgreSQL booking store");
            ApiState::new(store.clone(), store, StoreBackend::Postgres, default_template, policy)
        }
        None => {
            let seed = match &config.seed_file {
                Some(path) => Seed::from_file(path)?,
                None => {
                    warn!("No DATABASE_URL or SEED_FILE set, starting with an empty in-memory directory");
                    Seed::default()
                }
            };

            let store = Arc::new(MemoryStore::from_seed(seed).await?);
            info!("Using in-memory booking store");
            ApiState::new(store.clone(), store, StoreBackend::Memory, default_template, policy)
        }
    };

    Ok(Arc::new(state))
}

/// Builds the application router with all routes and request tracing
pub fn app(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Availability snapshots
        .merge(routes::availability::routes())
        // Booking and appointment lifecycle
        .merge(routes::appointment::routes())
        // Attach shared state to all routes
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Installs the global `tracing` subscriber at the given level
pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn handle_timeout_error(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": "Request timed out", "kind": "timeout" })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Unhandled internal error: {}", err), "kind": "internal" })),
        )
    }
}

/// Starts the API server with the provided configuration
///
/// Initializes logging, connects the store, configures routes and
/// middleware, then serves until the process is stopped.
pub async fn start_server(config: config::ApiConfig) -> Result<()> {
    init_tracing(config.log_level)?;

    let state = build_state(&config).await?;
    let app = app(state);

    // Apply CORS configuration if origins are specified
    let app = if let Some(origins) = &config.cors_origins {
        let origins = origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .wrap_err_with(|| format!("Invalid CORS origin: {}", origin))
            })
            .collect::<Result<Vec<_>>>()?;

        let cors = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
                HeaderName::from_static(USER_ID_HEADER),
            ])
            .allow_origin(origins)
            .allow_credentials(true);

        app.layer(cors)
    } else {
        app
    };

    // Add request timeout middleware
    let app = app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .timeout(Duration::from_secs(config.request_timeout)),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
