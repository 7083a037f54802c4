//! HTTP API endpoints.
//!
//! Player routes authenticate with a bearer token issued at register/login.
//! Admin routes sit behind HTTP Basic Auth (see [`auth::admin_auth_middleware`]).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{self, AuthConfig, CurrentPrincipal, SignedIn};
use crate::error::ApiError;
use crate::session::Response;
use crate::state::events::{EventView, NewEvent};
use crate::state::export::StoreSnapshot;
use crate::state::leaderboard::{LeaderboardEntry, RankBy};
use crate::state::session::SessionView;
use crate::state::users::AdminStats;
use crate::state::AppState;
use crate::types::{EventRecord, GameId, GameTile, Principal, ProgressSummary, UserRecord};
use crate::ws;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub principal: Principal,
    pub progress: ProgressSummary,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub by: RankBy,
}

/// Build the API router (without static file serving)
pub fn router(state: Arc<AppState>, auth_config: Arc<AuthConfig>) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/events", get(list_events).post(create_event))
        .route("/api/admin/events/{id}", delete(delete_event))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}", get(get_user).delete(delete_user))
        .route("/api/admin/stats", get(admin_stats))
        .route("/api/admin/export", get(export_state))
        .route("/api/admin/import", post(import_state))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::admin_auth_middleware,
        ));

    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/me", get(me))
        .route("/api/me/progress", get(my_progress))
        .route("/api/games", get(list_games))
        .route("/api/games/{game}/sessions", post(start_session))
        .route("/api/sessions/{id}", get(get_session).delete(abandon_session))
        .route("/api/sessions/{id}/respond", post(respond))
        .route("/api/sessions/{id}/complete", post(complete_session))
        .route("/api/events", get(list_events))
        .route("/api/leaderboard", get(leaderboard))
        .route("/ws", get(ws::ws_handler))
        .merge(admin_routes)
        .with_state(state)
}

async fn signed_in_response(state: &AppState, signed: SignedIn) -> ApiResult<Json<AuthResponse>> {
    let record = state.ensure_user_record(&signed.principal).await?;
    Ok(Json(AuthResponse {
        token: signed.token,
        principal: signed.principal,
        progress: ProgressSummary::from_record(&record),
    }))
}

/// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let signed = state
        .identity
        .register(&req.name, &req.email, &req.password)
        .await?;
    let body = signed_in_response(&state, signed).await?;
    Ok((StatusCode::CREATED, body))
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let signed = state.identity.sign_in(&req.email, &req.password).await?;
    signed_in_response(&state, signed).await
}

/// POST /api/logout
pub async fn logout(State(state): State<Arc<AppState>>, current: CurrentPrincipal) -> StatusCode {
    state.identity.sign_out(&current.token).await;
    StatusCode::NO_CONTENT
}

/// GET /api/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
) -> ApiResult<Json<UserRecord>> {
    Ok(Json(state.profile(&current.principal.id).await?))
}

/// GET /api/me/progress
pub async fn my_progress(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
) -> ApiResult<Json<ProgressSummary>> {
    Ok(Json(state.get_progress(&current.principal.id).await?))
}

/// GET /api/games
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
) -> ApiResult<Json<Vec<GameTile>>> {
    Ok(Json(state.game_tiles(&current.principal.id).await?))
}

/// POST /api/games/{game}/sessions
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
    Path(game): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let game: GameId = game.parse()?;
    let view = state.start_session(&current.principal, game).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.get_session(&current.principal.id, &id).await?))
}

/// POST /api/sessions/{id}/respond
pub async fn respond(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
    Path(id): Path<String>,
    Json(response): Json<Response>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(
        state.respond(&current.principal.id, &id, response).await?,
    ))
}

/// POST /api/sessions/{id}/complete
///
/// Retries recording a finished session after a failed submission.
pub async fn complete_session(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(
        state.retry_completion(&current.principal.id, &id).await?,
    ))
}

/// DELETE /api/sessions/{id}
pub async fn abandon_session(
    State(state): State<Arc<AppState>>,
    current: CurrentPrincipal,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.abandon_session(&current.principal.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/events and GET /api/admin/events
pub async fn list_events(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<EventView>>> {
    Ok(Json(state.list_events().await?))
}

/// GET /api/leaderboard?by=score|level|games
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(state.leaderboard(query.by).await?))
}

/// POST /api/admin/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewEvent>,
) -> ApiResult<(StatusCode, Json<EventRecord>)> {
    new.validate().map_err(ApiError::BadRequest)?;
    let event = state.create_event(new).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// DELETE /api/admin/events/{id}
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.delete_event(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No event {id}")))
    }
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<UserRecord>>> {
    Ok(Json(state.list_users().await?))
}

/// GET /api/admin/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserRecord>> {
    Ok(Json(state.profile(&id).await?))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.delete_user(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No user {id}")))
    }
}

/// GET /api/admin/stats
pub async fn admin_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<AdminStats>> {
    Ok(Json(state.admin_stats().await?))
}

/// GET /api/admin/export
pub async fn export_state(State(state): State<Arc<AppState>>) -> ApiResult<Json<StoreSnapshot>> {
    Ok(Json(state.export_snapshot().await?))
}

/// POST /api/admin/import
///
/// Replaces every stored record with the snapshot's.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<StoreSnapshot>,
) -> ApiResult<&'static str> {
    state.import_snapshot(snapshot).await.map_err(|e| {
        tracing::error!("State import failed: {}", e);
        ApiError::from(e)
    })?;
    Ok("State imported successfully")
}
