//! Chat and session endpoints under `/api`.

use axum::{
    Router,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use dsatutor_core::error::Error;
use dsatutor_core::message::{ChatTurn, Role, SessionId};

use crate::SharedState;

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/ask", post(ask_handler))
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// An error crossing the HTTP boundary: a status plus a user-safe body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: message.into(),
                kind: "validation".into(),
            },
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse {
                error: message.into(),
                kind: "not_found".into(),
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, kind = err.kind(), "Request failed");
        }
        Self {
            status,
            body: ErrorResponse {
                error: err.user_message(),
                kind: err.kind().into(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ── POST /api/ask ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,

    #[serde(default)]
    conversation_history: Vec<HistoryItem>,
}

/// One prior turn as the browser client sends it.
#[derive(Debug, Deserialize)]
struct HistoryItem {
    #[serde(rename = "type")]
    kind: String,
    content: String,
}

impl HistoryItem {
    /// `user` is the user; anything else (`ai`, `assistant`) is the tutor.
    fn into_turn(self) -> Option<ChatTurn> {
        if self.content.trim().is_empty() {
            return None;
        }
        let role = if self.kind.eq_ignore_ascii_case("user") {
            Role::User
        } else {
            Role::Assistant
        };
        Some(ChatTurn::new(role, self.content))
    }
}

#[derive(Debug, Serialize)]
struct AskResponse {
    response: String,
}

/// `POST /api/ask`: answer a question against client-held history.
async fn ask_handler(
    State(state): State<SharedState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(payload) = payload?;

    let question = payload
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Question is required"))?;

    let history: Vec<ChatTurn> = payload
        .conversation_history
        .into_iter()
        .filter_map(HistoryItem::into_turn)
        .collect();

    info!(history = history.len(), "api/ask request");

    let reply = state.pipeline.ask_with_history(&history, &question).await?;
    Ok(Json(AskResponse {
        response: reply.text,
    }))
}

// ── POST /api/chat ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    response: String,
    session_id: String,
    redirected: bool,
}

/// `POST /api/chat`: answer within a server-held session.
async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload?;

    let message = payload
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Message is required"))?;

    let session = match payload.session_id {
        Some(id) => parse_session_id(&id)?,
        None => SessionId::new(),
    };

    info!(session = %session, "api/chat request");

    let reply = state.pipeline.ask(&session, &message).await?;
    Ok(Json(ChatResponse {
        response: reply.text,
        session_id: session.to_string(),
        redirected: reply.redirected,
    }))
}

// ── /api/sessions/{id} ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
    turns: Vec<ChatTurn>,
    created_at: String,
    updated_at: String,
}

/// `GET /api/sessions/{id}`: the stored turns of a session.
async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    let session = state
        .pipeline
        .session(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Session '{id}' not found")))?;

    Ok(Json(SessionResponse {
        session_id: session.id.to_string(),
        turns: session.turns().to_vec(),
        created_at: session.created_at.to_rfc3339(),
        updated_at: session.updated_at.to_rfc3339(),
    }))
}

/// `DELETE /api/sessions/{id}`: reset a session.
async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_session_id(&id)?;
    state.pipeline.clear(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    Ok(SessionId::parse(raw)?)
}
