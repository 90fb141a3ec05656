//! HTTP request handlers for the profile pool.
//!
//! Every handler hands its store work to the blocking pool, since the store
//! API is synchronous.

use crate::query::{is_truthy, param, render, Detail, ListQuery};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router as AxumRouter,
};
use profilepool_domain::{Meta, ProfileEntry};
use profilepool_lease::{parse_entry_id, LeaseManager, PoolError, ProfileCatalog};
use profilepool_store::SqliteStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Lease lifecycle: claim and release
    pub leases: LeaseManager<SqliteStore>,
    /// Listing, insert, update and delete
    pub catalog: ProfileCatalog<SqliteStore>,
}

impl AppState {
    /// Build handler state over one shared store
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            leases: LeaseManager::new(Arc::clone(&store)),
            catalog: ProfileCatalog::new(store),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Entries across all profiles
    pub entries: usize,
    /// Entries currently checked out
    pub locked: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Body of client errors (400 and 404)
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human readable reason
    pub message: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Pool operation error
    Pool(PoolError),
    /// Request body is not the expected shape
    BadBody(String),
    /// Internal server error
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Pool(PoolError::Validation(message)) | AppError::BadBody(message) => {
                (StatusCode::BAD_REQUEST, Json(MessageResponse { message })).into_response()
            }
            AppError::Pool(e @ PoolError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(MessageResponse {
                    message: e.to_string(),
                }),
            )
                .into_response(),
            AppError::Pool(PoolError::Store(error)) | AppError::InternalError(error) => {
                tracing::warn!("Request failed: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { error }),
                )
                    .into_response()
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::InternalError(e.to_string())
    }
}

impl From<PoolError> for AppError {
    fn from(e: PoolError) -> Self {
        AppError::Pool(e)
    }
}

/// Run a synchronous pool call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, PoolError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .map_err(AppError::from)
}

/// Unwrap a JSON body, reporting any rejection as a 400
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadBody(rejection.body_text()))
}

fn into_meta(value: Value) -> Result<Meta, AppError> {
    match value {
        Value::Object(meta) => Ok(meta),
        other => Err(AppError::BadBody(format!(
            "Expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// GET /profile/ - List entries matching the query
async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, AppError> {
    let ListQuery { filter, detail } = ListQuery::parse(&params)?;

    let catalog = state.catalog;
    let entries = blocking(move || catalog.list(&filter)).await?;

    Ok(Json(render(entries, detail)?))
}

/// GET /profile/key/:key/value/:value - First entry with `meta.<key> == value`
async fn find_by_meta(
    State(state): State<AppState>,
    Path((key, value)): Path<(String, String)>,
) -> Result<Json<ProfileEntry>, AppError> {
    let catalog = state.catalog;
    let entry = blocking(move || catalog.find_by_meta(&key, &value)).await?;
    Ok(Json(entry))
}

/// GET /profile/:id - Entry by id
async fn get_entry(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Json<ProfileEntry>, AppError> {
    let id = parse_entry_id(&target)?;

    let catalog = state.catalog;
    let entry = blocking(move || catalog.get(id)).await?;
    Ok(Json(entry))
}

/// GET /profile/:name/next - Claim the next free entry of a profile
///
/// Responds with the entry's `meta` plus its `id`.
async fn claim_next(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Json<Meta>, AppError> {
    let leases = state.leases;
    let entry = blocking(move || leases.claim_next(&target)).await?;
    Ok(Json(entry.flatten()))
}

/// GET /profile/:name/all - Every entry of one profile
async fn list_profile(
    State(state): State<AppState>,
    Path(target): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, AppError> {
    let detail = Detail::from_flag(param(&params, "detail"));

    let catalog = state.catalog;
    let entries = blocking(move || catalog.list_profile(&target)).await?;

    Ok(Json(render(entries, detail)?))
}

/// POST /profile/:id/release - Return an entry to its pool
///
/// A truthy `error` query parameter counts the use as failed.
async fn release_entry(
    State(state): State<AppState>,
    Path(target): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ProfileEntry>, AppError> {
    let id = parse_entry_id(&target)?;
    let mark_error = is_truthy(param(&params, "error"));

    let leases = state.leases;
    let entry = blocking(move || leases.release(id, mark_error)).await?;
    Ok(Json(entry))
}

/// POST /profile/:name/releaseAll - Unlock every entry of a profile
async fn release_all(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Json<Value>, AppError> {
    let leases = state.leases;
    let released = blocking(move || leases.release_all(&target)).await?;
    Ok(Json(json!({ "released": released })))
}

/// PATCH /profile/:id - Replace an entry's `meta`
async fn update_entry(
    State(state): State<AppState>,
    Path(target): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ProfileEntry>), AppError> {
    let id = parse_entry_id(&target)?;
    let meta = into_meta(json_body(body)?)?;

    let catalog = state.catalog;
    let entry = blocking(move || catalog.replace_meta(id, meta)).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /profile/:name - Add one entry (object body) or many (array body)
async fn add_entries(
    State(state): State<AppState>,
    Path(target): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let (metas, single) = match json_body(body)? {
        Value::Array(items) => (
            items
                .into_iter()
                .map(into_meta)
                .collect::<Result<Vec<_>, _>>()?,
            false,
        ),
        other => (vec![into_meta(other)?], true),
    };

    let catalog = state.catalog;
    let added = blocking(move || catalog.add(&target, metas)).await?;

    let body = match added.as_slice() {
        [entry] if single => serde_json::to_value(entry)?,
        _ => serde_json::to_value(&added)?,
    };

    Ok(Json(body))
}

/// DELETE /profile/:id - Remove one entry
async fn delete_entry(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Json<ProfileEntry>, AppError> {
    let id = parse_entry_id(&target)?;

    let catalog = state.catalog;
    let entry = blocking(move || catalog.delete(id)).await?;
    Ok(Json(entry))
}

/// DELETE /profile/:name/deleteAll - Remove every entry of a profile
async fn delete_profile(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Json<Value>, AppError> {
    let catalog = state.catalog;
    let deleted = blocking(move || catalog.delete_profile(&target)).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// GET /health - Store reachability and pool occupancy
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthCheckResponse>, AppError> {
    let catalog = state.catalog;
    let stats = blocking(move || catalog.stats()).await?;

    Ok(Json(HealthCheckResponse {
        status: "healthy".to_string(),
        entries: stats.entries,
        locked: stats.locked,
    }))
}

/// Create the axum router with all routes
///
/// Routes under `/profile/` share the `:target` parameter, read as an entry
/// id or a profile name depending on the route.
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/profile", get(list_entries))
        .route("/profile/", get(list_entries))
        .route("/profile/key/:key/value/:value", get(find_by_meta))
        .route(
            "/profile/:target",
            get(get_entry)
                .post(add_entries)
                .patch(update_entry)
                .delete(delete_entry),
        )
        .route("/profile/:target/next", get(claim_next))
        .route("/profile/:target/all", get(list_profile))
        .route("/profile/:target/release", post(release_entry))
        .route("/profile/:target/releaseAll", post(release_all))
        .route("/profile/:target/deleteAll", delete(delete_profile))
        .route("/health", get(health_check))
        .with_state(state)
}
