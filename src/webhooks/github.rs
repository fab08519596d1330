use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::webhooks::events::WebhookEvent;
use crate::webhooks::orchestrator::EventService;
use crate::webhooks::signature::{WebhookSignature, SIGNATURE_HEADER};

pub const EVENT_HEADER: &str = "X-GitHub-Event";

#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub signature: Option<Arc<WebhookSignature>>,
    pub timeout: Duration,
}

impl AppState {
    pub fn new(events: EventService, webhook_secret: Option<String>, timeout: Duration) -> Self {
        let signature = webhook_secret
            .filter(|s| !s.is_empty())
            .map(|s| Arc::new(WebhookSignature::new(s)));
        if signature.is_none() {
            warn!("No webhook secret configured; deliveries will not be authenticated");
        }
        Self {
            events,
            signature,
            timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhooks/github", post(handle_webhook))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "backport-bot",
        "timestamp": chrono::Utc::now()
    }))
}

/// Maps an orchestrator outcome onto the response GitHub records for the delivery.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    if let Some(signature) = &state.signature {
        let header = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if let Err(e) = signature.verify(header, &body) {
            warn!("Rejected webhook delivery: {}", e);
            return (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
        }
    }

    let event_name = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let event = match WebhookEvent::parse(event_name, &body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Malformed '{}' delivery: {}", event_name, e);
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match event {
        WebhookEvent::Ping => return (StatusCode::OK, "SUCCESS".to_string()),
        WebhookEvent::Unsupported(ref name) => {
            info!("Ignoring unsupported '{}' event", name);
            return (StatusCode::OK, "ignored".to_string());
        }
        _ => {}
    }

    info!("Received '{}' event", event.name());
    match tokio::time::timeout(state.timeout, state.events.handle(&event)).await {
        Ok(Ok(true)) => (StatusCode::CREATED, "Created".to_string()),
        Ok(Ok(false)) => (StatusCode::OK, "OK".to_string()),
        Ok(Err(e)) => {
            error!("Failed to process '{}' event: {}", event.name(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(_) => {
            error!(
                "Processing '{}' event exceeded {:?}; abandoning in-flight GitHub calls",
                event.name(),
                state.timeout
            );
            (StatusCode::GATEWAY_TIMEOUT, "Timed out".to_string())
        }
    }
}
