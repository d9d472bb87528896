//! HTTP API gateway for mailpilot.
//!
//! Exposes the conversation orchestrator plus thin inbox and send
//! endpoints over JSON. Conversation history lives with the client and
//! travels in every chat request; the gateway keeps none.
//!
//! Built on Axum.

pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use mailpilot_agent::ConversationOrchestrator;
use mailpilot_config::AppConfig;
use mailpilot_core::error::{Error, ProviderError};
use mailpilot_core::mail::{MailRetrieval, MailTransmission};
use mailpilot_mail::{ImapMailbox, SmtpMailer};
use mailpilot_tools::ToolExecutor;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Request bodies above this are rejected.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub retrieval: Arc<dyn MailRetrieval>,
    pub transmission: Arc<dyn MailTransmission>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire up the live collaborators described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let provider = mailpilot_providers::build_from_config(config)
            .default()
            .ok_or_else(|| {
                Error::Provider(ProviderError::NotConfigured(config.default_provider.clone()))
            })?;

        let retrieval: Arc<dyn MailRetrieval> = Arc::new(ImapMailbox::new(&config.imap));
        let transmission: Arc<dyn MailTransmission> = Arc::new(SmtpMailer::new(&config.smtp)?);

        let executor = ToolExecutor::new(mailpilot_tools::default_registry(
            retrieval.clone(),
            transmission.clone(),
        ))
        .with_result_limit(config.agent.tool_result_max_chars);
        let orchestrator =
            ConversationOrchestrator::from_config(config, provider, Arc::new(executor));

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            retrieval,
            transmission,
        })
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers: permissive CORS (the UI is served from another origin), a 1 MB
/// body limit, and HTTP trace logging.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/agent/chat", post(routes::chat))
        .route("/api/inbox", get(routes::inbox))
        .route("/api/inbox/unread", get(routes::unread))
        .route("/api/email/send", post(routes::send_email))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
}

/// Start the gateway HTTP server on `host:port`.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(&config)?);
    let app = build_router(state);

    info!(addr = %addr, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
