use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Router,
};
use futures::{channel::mpsc::Sender, SinkExt};
use secrecy::SecretString;
use tower_http::trace::TraceLayer;

use crate::event::InboundEvent;
use crate::webhook::{GitHubWebhook, WebhookSecret};

#[derive(Debug, Clone)]
struct AppState {
    sender: Sender<InboundEvent>,
    secret: WebhookSecret,
}

impl FromRef<AppState> for WebhookSecret {
    fn from_ref(state: &AppState) -> WebhookSecret {
        state.secret.clone()
    }
}

async fn handle(
    State(mut state): State<AppState>,
    GitHubWebhook(event): GitHubWebhook,
) -> Result<String, (StatusCode, String)> {
    let Some(event) = event else {
        return Ok("skipped".to_owned());
    };
    tracing::debug!("Enqueueing event for {}#{}", event.repo(), event.number());
    state
        .sender
        .send(event)
        .await
        .map(|()| "enqueued".to_owned())
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error: Failed to send event".to_owned(),
            )
        })
}

pub(crate) fn listen(sender: Sender<InboundEvent>, secret: SecretString) -> axum::Router {
    let state = AppState {
        sender,
        secret: WebhookSecret(Arc::new(secret)),
    };

    Router::new()
        .route("/", post(handle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
