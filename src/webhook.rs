use std::{fmt::Display, sync::Arc};

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::event::InboundEvent;

pub(crate) const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub(crate) const EVENT_HEADER: &str = "X-GitHub-Event";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum AuthenticationError {
    #[error("{SIGNATURE_HEADER} missing")]
    Missing,
    #[error("{SIGNATURE_HEADER} malformed")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
}

/// Check a `sha256=<hex>` signature of `body`, in constant time.
pub(crate) fn verify_signature(
    secret: &[u8],
    header: Option<&str>,
    body: &[u8],
) -> Result<(), AuthenticationError> {
    let signature = header
        .ok_or(AuthenticationError::Missing)?
        .strip_prefix("sha256=")
        .ok_or(AuthenticationError::Malformed)?;
    let signature = hex::decode(signature).map_err(|_| AuthenticationError::Malformed)?;
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret).map_err(|_| AuthenticationError::Mismatch)?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| AuthenticationError::Mismatch)
}

/// Shared secret configured for the webhook on GitHub.
#[derive(Debug, Clone)]
pub(crate) struct WebhookSecret(pub Arc<SecretString>);

/// Verified webhook payload. `None` for event kinds that are not handled.
#[derive(Debug)]
pub(crate) struct GitHubWebhook(pub Option<InboundEvent>);

#[async_trait]
impl<S> FromRequest<S> for GitHubWebhook
where
    WebhookSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        fn err(m: impl Display) -> Response {
            tracing::warn!("Rejected webhook: {m}");
            (StatusCode::BAD_REQUEST, m.to_string()).into_response()
        }
        let kind = req
            .headers()
            .get(EVENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| err(format!("{EVENT_HEADER} header missing")))?
            .to_owned();
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| err("error reading body"))?;

        let WebhookSecret(secret) = WebhookSecret::from_ref(state);
        verify_signature(
            secret.expose_secret().as_bytes(),
            signature.as_deref(),
            &body,
        )
        .map_err(err)?;

        let event = InboundEvent::from_kind_and_body(&kind, &body).map_err(err)?;
        Ok(GitHubWebhook(event))
    }
}
