//! HTTP Handlers
//!
//! REST surface of the Web Thing API. Every handler resolves the thing first,
//! so an unknown thing id is always a 404.

use axum::body::Bytes;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use thing_runtime::{ThingContext, ThingError};

use super::error::ApiError;
use super::handler::handle_websocket;
use super::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// WebSocket URL of a thing, derived from the request's Host header
fn ws_href(headers: &HeaderMap, thing: &ThingContext) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .map(|host| format!("ws://{}{}", host, thing.href()))
}

fn parse_body(body: &Bytes) -> ApiResult<Value> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

fn parse_action_id(name: &str, action_id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(action_id)
        .map_err(|_| ThingError::not_found("action", format!("{}/{}", name, action_id)).into())
}

// ─────────────────────────────────────────────────────────────────────────────
// Things
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    things: usize,
    sessions: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        things: state.registry().len(),
        sessions: state.session_count(),
    })
}

/// `GET /` - descriptions of every hosted thing
pub async fn list_things(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let descriptions: Vec<Value> = state
        .registry()
        .list()
        .iter()
        .map(|thing| thing.description(ws_href(&headers, thing).as_deref()))
        .collect();
    Json(Value::Array(descriptions))
}

/// `GET /things/:id` - thing description, or a WebSocket upgrade
pub async fn get_thing(
    ws: Option<WebSocketUpgrade>,
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let thing = state.thing(&id)?;
    if let Some(ws) = ws {
        return Ok(ws.on_upgrade(move |socket| handle_websocket(socket, thing, state)));
    }
    Ok(Json(thing.description(ws_href(&headers, &thing).as_deref())).into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /things/:id/properties`
pub async fn get_properties(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    Ok(Json(Value::Object(thing.properties())))
}

/// `GET /things/:id/properties/:name`
pub async fn get_property(
    Path((id, name)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    let value = thing.get_property(&name)?;
    Ok(Json(json!({ name: value })))
}

/// `PUT /things/:id/properties/:name` with body `{"<name>": <value>}`
pub async fn put_property(
    Path((id, name)): Path<(String, String)>,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    let body = parse_body(&body)?;
    let value = body
        .get(&name)
        .ok_or_else(|| ApiError::BadRequest(format!("Body must contain {:?}", name)))?;
    let stored = thing.set_property(&name, value)?;
    Ok(Json(json!({ name: stored })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

fn descriptions(thing: &ThingContext, name: Option<&str>) -> Json<Value> {
    Json(Value::Array(
        thing
            .actions(name)
            .iter()
            .map(|info| info.description())
            .collect(),
    ))
}

/// Create an action from a request body and start it in the background
fn start_action(thing: &ThingContext, body: &Value) -> ApiResult<(StatusCode, Json<Value>)> {
    let info = thing.create_action_from_envelope(body)?;
    // Rendered before spawning so the response reflects the request as created
    let description = info.description();
    thing.spawn_action(info);
    Ok((StatusCode::CREATED, Json(description)))
}

/// `GET /things/:id/actions`
pub async fn list_actions(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    Ok(descriptions(&thing, None))
}

/// `POST /things/:id/actions` with body `{"<name>": {"input": {...}}}`
pub async fn request_action(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let thing = state.thing(&id)?;
    start_action(&thing, &parse_body(&body)?)
}

/// `GET /things/:id/actions/:name`
pub async fn list_named_actions(
    Path((id, name)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    if thing.compiled().action(&name).is_none() {
        return Err(ThingError::not_found("action", name).into());
    }
    Ok(descriptions(&thing, Some(&name)))
}

/// `POST /things/:id/actions/:name`; the body must name the same action
pub async fn request_named_action(
    Path((id, name)): Path<(String, String)>,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let thing = state.thing(&id)?;
    if thing.compiled().action(&name).is_none() {
        return Err(ThingError::not_found("action", name).into());
    }
    let body = parse_body(&body)?;
    let names_match = body
        .as_object()
        .map_or(false, |map| map.len() == 1 && map.contains_key(&name));
    if !names_match {
        return Err(ApiError::BadRequest(format!(
            "Body must contain exactly one key, {:?}",
            name
        )));
    }
    start_action(&thing, &body)
}

/// `GET /things/:id/actions/:name/:action_id`
pub async fn get_action(
    Path((id, name, action_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    let info = thing.action(&name, parse_action_id(&name, &action_id)?)?;
    Ok(Json(info.description()))
}

/// `DELETE /things/:id/actions/:name/:action_id` - cancel and forget
pub async fn delete_action(
    Path((id, name, action_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    let thing = state.thing(&id)?;
    thing.remove_action(&name, parse_action_id(&name, &action_id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

fn event_list(thing: &ThingContext, name: Option<&str>) -> ApiResult<Json<Value>> {
    let records = thing.events(name)?;
    Ok(Json(Value::Array(
        records.iter().map(|record| record.to_json()).collect(),
    )))
}

/// `GET /things/:id/events`
pub async fn list_events(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    event_list(&thing, None)
}

/// `GET /things/:id/events/:name`
pub async fn list_named_events(
    Path((id, name)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let thing = state.thing(&id)?;
    event_list(&thing, Some(&name))
}
