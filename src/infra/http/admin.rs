//! Operator JSON surface, bound to its own listener.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::application::{
    error::ErrorReport,
    feed::FeedService,
    groups::{CreateGroupCommand, GroupError, GroupService},
    repos::{HealthRepo, RepoError},
    users::{UserError, UserService},
};
use crate::domain::entities::GroupRecord;

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub groups: Arc<GroupService>,
    pub users: Arc<UserService>,
    pub feed: Arc<FeedService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{slug}", delete(delete_group))
        .route("/users/{username}", delete(delete_user))
        .route("/cache/clear", post(clear_cache))
        .route("/_health/db", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

mod codes {
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
struct AdminErrorBody {
    error: AdminErrorMessage,
}

#[derive(Debug, Serialize)]
struct AdminErrorMessage {
    code: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

#[derive(Debug)]
struct AdminError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl AdminError {
    fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let detail = format!(
            "{}: {}",
            self.code,
            self.hint.as_deref().unwrap_or(self.message)
        );
        let body = AdminErrorBody {
            error: AdminErrorMessage {
                code: self.code,
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http::admin", self.status, detail).attach(&mut response);
        response
    }
}

impl From<RepoError> for AdminError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<GroupError> for AdminError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::Domain(err) => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid group",
                Some(err.to_string()),
            ),
            GroupError::SlugTaken(slug) => Self::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Group slug already exists",
                Some(slug),
            ),
            GroupError::NotFound => Self::not_found("Group not found"),
            GroupError::Repo(err) => err.into(),
        }
    }
}

impl From<UserError> for AdminError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::not_found("User not found"),
            UserError::Repo(err) => err.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateGroupRequest {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    description: String,
}

async fn list_groups(State(state): State<AdminState>) -> Result<Json<Vec<GroupRecord>>, AdminError> {
    Ok(Json(state.groups.list().await?))
}

async fn create_group(
    State(state): State<AdminState>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupRecord>), AdminError> {
    let group = state
        .groups
        .create(CreateGroupCommand {
            title: request.title,
            slug: request.slug,
            description: request.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn delete_group(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.groups.delete(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_user(
    State(state): State<AdminState>,
    Path(username): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.users.delete_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_cache(State(state): State<AdminState>) -> Json<serde_json::Value> {
    state.feed.clear_home_cache();
    info!(target = "inkwell::cache", "home feed cache cleared");
    Json(json!({ "cleared": true }))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.health_check().await)
}
