use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    auth::{Caller, Role},
    db::entities::profile,
    response::ApiResult,
    services::ProfileInput,
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/directory/sync", post(sync))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct MeResponse {
    profile: profile::Model,
    effective_role: Role,
    is_admin: bool,
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    profile: profile::Model,
}

async fn me(State(state): State<Arc<AppState>>, caller: Caller) -> ApiResult<MeResponse> {
    let (profile, role) = state.directory.me(&caller).await?;
    Ok(Json(MeResponse {
        profile,
        effective_role: role,
        is_admin: role.is_admin(),
    }))
}

async fn sync(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(input): Json<ProfileInput>,
) -> ApiResult<SyncResponse> {
    let profile = state.directory.sync_identity(&caller, input).await?;
    Ok(Json(SyncResponse { profile }))
}
