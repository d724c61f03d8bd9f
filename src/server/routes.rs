use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::query::{Announcements, LookupResult, LookupService, StatsService};
use crate::server::views::{
    CheckParams, FilterOptions, HealthResponse, ListParams, StudentIndex, StudentPayload,
};
use crate::server::AppState;
use crate::storage::{GroupField, SqliteStore, StudentStore};
use crate::student::{Field, StudentRecord};
use crate::Error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Field-level messages for rejected writes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ErrorResponse {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            errors: None,
        }
    }
}

/// A library error translated to an HTTP response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::ConstraintViolation { field, message } => {
                let mut errors = BTreeMap::new();
                errors.insert(field.to_string(), message);
                Self {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    body: ErrorResponse {
                        error: "validation failed".to_string(),
                        errors: Some(errors),
                    },
                }
            }
            Error::RecordNotFound(id) => Self {
                status: StatusCode::NOT_FOUND,
                body: ErrorResponse::message(format!("student record {} not found", id)),
            },
            other => {
                tracing::error!("Request failed: {}", other);
                Self::internal()
            }
        }
    }
}

/// Body rejections keep axum's status code but answer in the same JSON
/// shape as validation errors. A type mismatch on a known field is
/// reported against that field.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        tracing::debug!("Rejected request body: {}", detail);

        let body = match rejected_field(&detail) {
            Some(field) => {
                let mut errors = BTreeMap::new();
                errors.insert(field.to_string(), format!("{} has the wrong type", field));
                ErrorResponse {
                    error: "validation failed".to_string(),
                    errors: Some(errors),
                }
            }
            None => ErrorResponse::message(detail),
        };
        Self {
            status: rejection.status(),
            body,
        }
    }
}

/// Find the payload field named in a deserialization message such as
/// `...target type: name: invalid type: integer`
fn rejected_field(detail: &str) -> Option<Field> {
    Field::all()
        .iter()
        .copied()
        .find(|field| detail.contains(&format!(": {}: ", field)))
}

impl ApiError {
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse::message("internal server error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a store operation on the blocking pool with a fresh connection
async fn with_store<T, F>(state: Arc<AppState>, op: F) -> ApiResult<T>
where
    F: FnOnce(&SqliteStore) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || {
        let store = state.open_store()?;
        op(&store)
    })
    .await
    .map_err(|e| {
        tracing::error!("Store task failed: {}", e);
        ApiError::internal()
    })?;

    outcome.map_err(ApiError::from)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub async fn check(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckParams>,
) -> ApiResult<Json<LookupResult>> {
    let result = with_store(state, move |store| {
        LookupService::new(store).check(params.nisn.as_deref())
    })
    .await?;
    Ok(Json(result))
}

pub async fn announcements(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Announcements>> {
    let result = with_store(state, |store| StatsService::new(store).announcements()).await?;
    Ok(Json(result))
}

pub async fn list_students(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<StudentIndex>> {
    let query = params.to_query()?;
    let filters = params.echo();

    let index = with_store(state, move |store| {
        Ok(StudentIndex {
            students: store.list(&query)?,
            filters,
            filter_options: FilterOptions {
                classes: store.distinct_values(GroupField::Class)?,
                majors: store.distinct_values(GroupField::Major)?,
            },
        })
    })
    .await?;
    Ok(Json(index))
}

pub async fn create_student(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StudentPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StudentRecord>)> {
    let Json(payload) = payload?;
    let input = payload.into_input()?;
    let record = with_store(state, move |store| store.insert(&input)).await?;
    tracing::info!("Created student record {} ({})", record.id, record.nisn);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn show_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StudentRecord>> {
    let record = with_store(state, move |store| {
        store.get(id)?.ok_or(Error::RecordNotFound(id))
    })
    .await?;
    Ok(Json(record))
}

pub async fn update_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<StudentPayload>, JsonRejection>,
) -> ApiResult<Json<StudentRecord>> {
    let Json(payload) = payload?;
    let input = payload.into_input()?;
    let record = with_store(state, move |store| store.update(id, &input)).await?;
    tracing::info!("Updated student record {}", id);
    Ok(Json(record))
}

pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    with_store(state, move |store| store.delete(id)).await?;
    tracing::info!("Deleted student record {}", id);
    Ok(StatusCode::NO_CONTENT)
}
