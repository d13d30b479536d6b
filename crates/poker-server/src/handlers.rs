//! HTTP handlers, one per session operation.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use poker_core::{Round, Session, SessionId};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::AppState;
use crate::ws::{self, ConnectionTiming};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub player_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub player_name: String,
    pub vote: i64,
}

#[derive(Debug, Deserialize)]
pub struct StoryRequest {
    pub story: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStartedResponse {
    pub round_started: bool,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
}

fn story_index(raw: &str) -> Result<usize, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::invalid_input(format!("invalid story index: {raw}")))
}

pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let req = body(payload)?;
    let session = state.service.create(&req.name)?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Session> {
    Ok(Json(state.service.get(&SessionId::from_raw(id))?))
}

pub async fn join(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<Session> {
    let req = body(payload)?;
    let session = state.service.join(&SessionId::from_raw(id), &req.player_name).await?;
    Ok(Json(session))
}

pub async fn remove_player(
    State(state): State<AppState>,
    Path((id, player)): Path<(String, String)>,
) -> ApiResult<Session> {
    let session = state.service.remove_player(&SessionId::from_raw(id), &player).await?;
    Ok(Json(session))
}

pub async fn start_round(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Round> {
    Ok(Json(state.service.start_round(&SessionId::from_raw(id)).await?))
}

pub async fn archive_round(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Session> {
    Ok(Json(state.service.archive_round(&SessionId::from_raw(id)).await?))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Round> {
    let req = body(payload)?;
    let round = state
        .service
        .vote(&SessionId::from_raw(id), &req.player_name, req.vote)
        .await?;
    Ok(Json(round))
}

pub async fn rollback_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<Round> {
    let req = body(payload)?;
    let round = state
        .service
        .rollback_vote(&SessionId::from_raw(id), &req.player_name)
        .await?;
    Ok(Json(round))
}

pub async fn reveal(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Round> {
    Ok(Json(state.service.reveal(&SessionId::from_raw(id)).await?))
}

pub async fn results(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Round> {
    Ok(Json(state.service.results(&SessionId::from_raw(id))?))
}

pub async fn round_started(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RoundStartedResponse> {
    let round_started = state.service.round_started(&SessionId::from_raw(id))?;
    Ok(Json(RoundStartedResponse { round_started }))
}

pub async fn get_round(
    State(state): State<AppState>,
    Path((id, round_id)): Path<(String, String)>,
) -> ApiResult<Round> {
    Ok(Json(state.service.round(&SessionId::from_raw(id), &round_id)?))
}

pub async fn add_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> ApiResult<Session> {
    let req = body(payload)?;
    let session = state.service.add_story(&SessionId::from_raw(id), &req.story).await?;
    Ok(Json(session))
}

pub async fn remove_story(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
) -> ApiResult<Session> {
    let index = story_index(&index)?;
    let session = state.service.remove_story(&SessionId::from_raw(id), index).await?;
    Ok(Json(session))
}

pub async fn add_task(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> ApiResult<BTreeMap<usize, String>> {
    let index = story_index(&index)?;
    let req = body(payload)?;
    let tasks = state
        .service
        .add_task(&SessionId::from_raw(id), index, &req.task)
        .await?;
    Ok(Json(tasks))
}

/// Upgrade to a subscriber connection for an existing session.
///
/// The subscription is registered before the upgrade response goes out, so a
/// client that sees the handshake complete will not miss later events.
pub async fn subscribe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let id = SessionId::from_raw(id);
    state.service.get(&id)?;

    let subscription = state.service.hub().subscribe(&id);
    let timing = ConnectionTiming {
        heartbeat_interval: state.config.heartbeat_interval,
        send_timeout: state.config.send_timeout,
    };
    Ok(upgrade
        .on_upgrade(move |socket| ws::run_subscriber(socket, subscription, timing))
        .into_response())
}
