//! Route handlers.
//!
//! Failures share one shape: `{error, message?}`. Caller mistakes are 400;
//! anything a collaborator did wrong is 500 and never carries a partial
//! result.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use mailpilot_agent::TurnOutcome;
use mailpilot_core::error::Error;
use mailpilot_core::mail::{OutgoingMail, RawMail};
use mailpilot_core::message::HistoryEntry;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::SharedState;

/// Default page size for `GET /api/inbox`.
const DEFAULT_INBOX_LIMIT: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            message: None,
        }),
    )
}

fn internal(context: &str, err: &Error) -> ApiError {
    error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: context.to_string(),
            message: Some(err.to_string()),
        }),
    )
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

// --- Health ---

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// --- Chat ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,

    /// Anything but an array is treated as no history.
    #[serde(default)]
    history: Option<serde_json::Value>,
}

impl ChatRequest {
    fn history_entries(&self) -> Vec<HistoryEntry> {
        match &self.history {
            Some(serde_json::Value::Array(items)) => {
                items.iter().cloned().map(HistoryEntry::from).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// `POST /api/agent/chat`
pub async fn chat(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    if is_blank(&payload.message) {
        return Err(bad_request("Message is required"));
    }
    let message = payload.message.as_deref().unwrap_or_default();
    let history = payload.history_entries();

    match state.orchestrator.chat(message, &history).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) if e.is_input() => Err(bad_request(&e.to_string())),
        Err(e) => Err(internal("Failed to process chat message", &e)),
    }
}

// --- Inbox ---

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    /// Kept as text so that junk falls back to the default instead of 400.
    limit: Option<String>,
}

impl InboxQuery {
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|&l| l > 0)
            .unwrap_or(DEFAULT_INBOX_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InboxResponse {
    pub emails: Vec<RawMail>,
    pub count: usize,
}

/// `GET /api/inbox?limit=N`
pub async fn inbox(
    State(state): State<SharedState>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<InboxResponse>, ApiError> {
    let emails = state
        .retrieval
        .fetch_inbox(query.limit())
        .await
        .map_err(|e| internal("Failed to fetch inbox", &Error::from(e)))?;
    Ok(Json(InboxResponse {
        count: emails.len(),
        emails,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadResponse {
    pub unread_count: usize,
}

/// `GET /api/inbox/unread`
pub async fn unread(State(state): State<SharedState>) -> Result<Json<UnreadResponse>, ApiError> {
    let unread_count = state
        .retrieval
        .unread_count()
        .await
        .map_err(|e| internal("Failed to get unread count", &Error::from(e)))?;
    Ok(Json(UnreadResponse { unread_count }))
}

// --- Send ---

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
}

/// `POST /api/email/send`
pub async fn send_email(
    State(state): State<SharedState>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let (Some(to), Some(subject), Some(body)) = (payload.to, payload.subject, payload.body) else {
        return Err(bad_request("Missing required fields: to, subject, body"));
    };
    if [&to, &subject, &body].iter().any(|f| f.trim().is_empty()) {
        return Err(bad_request("Missing required fields: to, subject, body"));
    }

    let mut mail = OutgoingMail::new(to, subject, body);
    mail.html = payload.html.filter(|h| !h.trim().is_empty());
    let to = mail.to.clone();

    state
        .transmission
        .send(mail)
        .await
        .map_err(|e| internal("Failed to send email", &Error::from(e)))?;
    info!(to = %to, "Email sent via API");

    Ok(Json(SendResponse {
        success: true,
        message: "Email sent successfully".into(),
    }))
}
