// ./api/src/handlers.rs
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
};
use tracing::{error, info, warn};

use application::{
    ApplicationError, ListQuery, NextIdResponse, StoreSearchRequest, StoreSearchResponse,
};
use domain::{Collection, DomainError, Record};

use crate::AppState;

fn parse_collection(name: &str) -> Result<Collection, Response> {
    name.parse::<Collection>().map_err(|e| {
        warn!(collection = %name, "Request for unknown collection");
        map_application_error_to_response(e.into())
    })
}

pub async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

pub async fn get_stats_handler(State(state): State<AppState>) -> Response {
    info!("Received request to get statistics");
    match state.stats.get_stats().await {
        Ok(stats) => (StatusCode::OK, JsonResponse(stats)).into_response(),
        Err(e) => {
            error!("Failed to get statistics via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

// --- Raw Store Handlers ---

/// Handler for reading a whole collection (GET /store/:collection).
pub async fn store_get_all_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.store.get_all(collection).await {
        Ok(records) => (StatusCode::OK, JsonResponse(records)).into_response(),
        Err(e) => {
            error!(collection = %collection, "Failed to read collection via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for replacing a whole collection (PUT /store/:collection).
pub async fn store_save_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(records): Json<Vec<Record>>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    info!(collection = %collection, count = records.len(), "Received request to save collection");
    match state.store.save(collection, &records).await {
        Ok(()) => (StatusCode::NO_CONTENT, "").into_response(),
        Err(e) => {
            error!(collection = %collection, "Failed to save collection via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for appending a record as-is (POST /store/:collection).
pub async fn store_add_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(record): Json<Record>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.store.add(collection, record).await {
        Ok(record) => (StatusCode::CREATED, JsonResponse(record)).into_response(),
        Err(e) => {
            error!(collection = %collection, "Failed to add record via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for GET /store/:collection/:id.
pub async fn store_get_by_id_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.store.get_by_id(collection, &id).await {
        Ok(Some(record)) => (StatusCode::OK, JsonResponse(record)).into_response(),
        Ok(None) => map_application_error_to_response(ApplicationError::not_found(collection, id)),
        Err(e) => {
            error!(collection = %collection, record_id = %id, "Failed to read record via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for a shallow merge without validation (PATCH /store/:collection/:id).
pub async fn store_update_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(partial): Json<Record>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.store.update(collection, &id, partial).await {
        Ok(Some(record)) => (StatusCode::OK, JsonResponse(record)).into_response(),
        Ok(None) => map_application_error_to_response(ApplicationError::not_found(collection, id)),
        Err(e) => {
            error!(collection = %collection, record_id = %id, "Failed to update record via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for DELETE /store/:collection/:id.
pub async fn store_delete_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.store.delete(collection, &id).await {
        Ok(true) => (StatusCode::NO_CONTENT, "").into_response(),
        Ok(false) => map_application_error_to_response(ApplicationError::not_found(collection, id)),
        Err(e) => {
            error!(collection = %collection, record_id = %id, "Failed to delete record via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for substring search over named fields (POST /store/:collection/search).
pub async fn store_search_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<StoreSearchRequest>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    info!(
        collection = %collection,
        term = %request.term,
        fields = ?request.fields,
        "Received store search request"
    );
    match state
        .store
        .search(collection, &request.term, &request.fields)
        .await
    {
        Ok(records) => {
            let response = StoreSearchResponse {
                nb_hits: records.len(),
                records,
                term: request.term,
            };
            info!(collection = %collection, "Search completed, {} total hits", response.nb_hits);
            (StatusCode::OK, JsonResponse(response)).into_response()
        }
        Err(e) => {
            error!(collection = %collection, "Failed to search records via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

// --- Registry Handlers ---

/// Handler for filtered, paginated listings (GET /:collection?query=...).
pub async fn list_records_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.registry.list(collection, query).await {
        Ok(listing) => (StatusCode::OK, JsonResponse(listing)).into_response(),
        Err(e) => {
            error!(collection = %collection, "Failed to list records via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for POST /:collection.
pub async fn create_record_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Record>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.registry.create(collection, payload).await {
        Ok(record) => {
            info!(collection = %collection, "Record created successfully via handler");
            (StatusCode::CREATED, JsonResponse(record)).into_response()
        }
        Err(e) => {
            error!(collection = %collection, "Failed to create record via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

pub async fn next_id_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.registry.next_id(collection).await {
        Ok(id) => (StatusCode::OK, JsonResponse(NextIdResponse { collection, id })).into_response(),
        Err(e) => {
            error!(collection = %collection, "Failed to compute next id via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for GET /:collection/:id.
pub async fn get_record_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.registry.get(collection, &id).await {
        Ok(record) => (StatusCode::OK, JsonResponse(record)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for a validated partial update (PATCH /:collection/:id).
pub async fn update_record_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(patch): Json<Record>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.registry.update(collection, &id, patch).await {
        Ok(record) => (StatusCode::OK, JsonResponse(record)).into_response(),
        Err(e) => {
            error!(collection = %collection, record_id = %id, "Failed to update record via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for DELETE /:collection/:id.
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Response {
    let collection = match parse_collection(&name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    match state.registry.delete(collection, &id).await {
        Ok(()) => (StatusCode::NO_CONTENT, "").into_response(),
        Err(e) => {
            error!(collection = %collection, record_id = %id, "Failed to delete record via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Maps ApplicationError to an HTTP status code and a plain-text body.
pub fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, body) = match err {
        ApplicationError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        e @ ApplicationError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        e @ ApplicationError::AlreadyExists { .. } => (StatusCode::CONFLICT, e.to_string()),
        e @ ApplicationError::MissingReference { .. } => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ApplicationError::Storage { key, source } => {
            error!(blob = %key, "Storage error: {}", source);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".to_string(),
            )
        }
        ApplicationError::Serialization { collection, source } => {
            error!(collection = %collection, "Stored collection is unreadable: {}", source);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("The {} collection could not be read", collection),
            )
        }
        ApplicationError::DomainError(DomainError::UnknownCollection(name)) => (
            StatusCode::NOT_FOUND,
            format!("Collection '{}' not found", name),
        ),
        ApplicationError::DomainError(domain_err) => {
            warn!("Domain validation failed: {}", domain_err);
            (StatusCode::BAD_REQUEST, domain_err.to_string())
        }
    };
    (status, body).into_response()
}
