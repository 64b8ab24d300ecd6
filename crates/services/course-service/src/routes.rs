//! Route configuration.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use common::{AppResult, JsonMap};
use crud::{authenticate, crud_routes, CrudOperations};

use crate::model::{CourseDto, DepartmentDto};
use crate::state::{AppState, DepartmentRepository};

/// Stored function reporting live courses per department.
pub const COURSE_COUNTS_PROCEDURE: &str = "department_course_counts";

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let departments: Arc<dyn CrudOperations<DepartmentDto>> = state.departments.clone();
    let courses: Arc<dyn CrudOperations<CourseDto>> = state.courses.clone();

    let department_reports = Router::new()
        .route("/course-counts", get(course_counts))
        .with_state(state.department_repository.clone());

    let api = Router::new()
        .nest("/departments", crud_routes(departments).merge(department_reports))
        .nest("/courses", crud_routes(courses))
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            authenticate,
        ));

    let health = Router::new()
        .route("/health", get(health_check))
        .with_state(state);

    Router::new().nest("/api", api).merge(health)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseCountParams {
    #[serde(default)]
    min_credits: i64,
}

async fn course_counts(
    State(departments): State<DepartmentRepository>,
    Query(params): Query<CourseCountParams>,
) -> AppResult<Json<Vec<Value>>> {
    let mut args = JsonMap::new();
    args.insert("min_credits".to_string(), params.min_credits.into());
    Ok(Json(departments.call_procedure(COURSE_COUNTS_PROCEDURE, &args).await?))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check endpoint - verifies database connectivity when there is one.
async fn health_check(State(state): State<AppState>) -> Response {
    let ping = match &state.database {
        Some(database) => database.ping().await.map_err(|e| e.to_string()),
        None => Ok(()),
    };

    match ping {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                error: None,
            }),
        )
            .into_response(),
        Err(error) => {
            tracing::warn!("Health check failed: {}", error);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    error: Some(error),
                }),
            )
                .into_response()
        }
    }
}
