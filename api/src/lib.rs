// ./api/src/lib.rs
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::info;

use application::{
    ApplicationError, BlobStore, Clock, RecordStore, RegistryService, StatsService,
    SystemClock, seed_sample_data,
};
use infrastructure::{FileBlobStore, InMemoryBlobStore};

pub mod config;
pub mod handlers;

pub use config::{AppConfig, StorageKind};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub registry: Arc<RegistryService>,
    pub stats: Arc<StatsService>,
}

impl AppState {
    /// Wires the services over an already constructed blob store.
    pub fn new(blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>, page_size: usize) -> Self {
        let store = Arc::new(RecordStore::new(blobs));
        let registry = Arc::new(RegistryService::new(
            store.clone(),
            clock.clone(),
            page_size,
        ));
        let stats = Arc::new(StatsService::new(store.clone(), clock));
        Self {
            store,
            registry,
            stats,
        }
    }
}

/// Opens storage as configured, creates missing collections and optionally loads the
/// sample data set.
pub async fn build_state(config: &AppConfig) -> Result<AppState, ApplicationError> {
    // 1. Storage backend
    let blobs: Arc<dyn BlobStore> = match config.storage {
        StorageKind::File => Arc::new(FileBlobStore::open(config.data_dir.clone()).await?),
        StorageKind::Memory => Arc::new(InMemoryBlobStore::new()),
    };
    info!(storage = ?config.storage, "Blob store initialized.");

    // 2. Services
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(blobs, clock.clone(), config.page_size);
    state.store.initialize().await?;
    info!("Application services initialized.");

    // 3. Demonstration records
    if config.seed_sample_data {
        let report = seed_sample_data(&state.store, clock.now()).await?;
        info!(?report, "Sample data checked.");
    }
    Ok(state)
}

/// All HTTP routes. Static segments take priority over `:collection`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats_handler))
        // Raw record store
        .route(
            "/store/:collection",
            get(handlers::store_get_all_handler)
                .put(handlers::store_save_handler)
                .post(handlers::store_add_handler),
        )
        .route(
            "/store/:collection/search",
            post(handlers::store_search_handler),
        )
        .route(
            "/store/:collection/:id",
            get(handlers::store_get_by_id_handler)
                .patch(handlers::store_update_handler)
                .delete(handlers::store_delete_handler),
        )
        // Registry
        .route(
            "/:collection",
            get(handlers::list_records_handler).post(handlers::create_record_handler),
        )
        .route("/:collection/next-id", get(handlers::next_id_handler))
        .route(
            "/:collection/:id",
            get(handlers::get_record_handler)
                .patch(handlers::update_record_handler)
                .delete(handlers::delete_record_handler),
        )
        .with_state(state)
}
