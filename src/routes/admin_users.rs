use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Caller,
    db::entities::profile,
    error::AppError,
    response::{ApiResult, MutationResponse},
    services::{AdminUserRow, ListView, role_gate::parse_role},
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/admin/users", get(list))
        .route("/admin/users/promote", post(promote))
        .route("/admin/users/demote", post(demote))
        .route("/admin/users/search", post(search))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromoteRequest {
    user_id: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoteRequest {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminUsersResponse {
    admin_users: Vec<AdminUserRow>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    users: Vec<profile::Model>,
}

fn parse_user_id(raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::bad_request("userId is required"))?;
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("Invalid userId: {raw}")))
}

async fn promote(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<PromoteRequest>,
) -> ApiResult<MutationResponse> {
    let target = parse_user_id(body.user_id.as_deref())?;
    let role = body
        .role
        .as_deref()
        .ok_or_else(|| AppError::bad_request("role is required"))?;
    let role = parse_role(role)?;

    state.gate.promote(&caller, target, role).await?;
    MutationResponse::ok(format!("User role updated to {role}"))
}

async fn demote(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<DemoteRequest>,
) -> ApiResult<MutationResponse> {
    let target = parse_user_id(body.user_id.as_deref())?;

    state.gate.demote(&caller, target).await?;
    MutationResponse::ok("User demoted to user")
}

async fn list(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(view): Query<ListView>,
) -> ApiResult<AdminUsersResponse> {
    let rows = state.gate.list_all_with_roles(&caller).await?;
    Ok(Json(AdminUsersResponse {
        admin_users: view.apply(rows),
    }))
}

// Search never fails the request: errors degrade to an empty result.
async fn search(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Json(body): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let users = match state.gate.search_directory(&body.email).await {
        Ok(users) => users,
        Err(err) => {
            tracing::warn!(error = %err, "directory search failed");
            Vec::new()
        }
    };
    Json(SearchResponse { users })
}
