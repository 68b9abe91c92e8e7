use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{MethodRouter, post},
};
use futures_util::FutureExt;
use thiserror::Error;
use tracing::{debug, warn};

use diffcord_types::Vote;

use crate::handler::{BoxError, VoteHandler};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookOptions {
    /// Reject deliveries that carry no `Authorization` header.
    ///
    /// Off by default: without it a request that omits the header is
    /// accepted even when a secret is configured.
    pub require_auth: bool,
}

/// Result of running one delivery through the pipeline.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Handler finished without error.
    Accepted,
    /// `Authorization` did not match the configured secret.
    Unauthorized,
    /// Body is not a JSON vote. The handler was not called.
    InvalidPayload(serde_json::Error),
    /// The handler returned an error or panicked.
    HandlerFailed(BoxError),
}

impl WebhookOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookOutcome::Accepted => StatusCode::OK,
            WebhookOutcome::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookOutcome::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookOutcome::HandlerFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> &'static str {
        match self {
            WebhookOutcome::Accepted => "OK",
            WebhookOutcome::Unauthorized => "Unauthorized",
            WebhookOutcome::InvalidPayload(_) => "Invalid vote payload",
            WebhookOutcome::HandlerFailed(_) => "Error processing vote",
        }
    }
}

impl IntoResponse for WebhookOutcome {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}

struct WebhookConfig {
    secret: Option<String>,
    require_auth: bool,
}

/// Vote webhook receiver. Holds only immutable configuration, so clones
/// can serve concurrent deliveries.
#[derive(Clone)]
pub struct Webhook {
    config: Arc<WebhookConfig>,
}

impl fmt::Debug for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Webhook")
            .field("secret", &self.config.secret.as_ref().map(|_| "<redacted>"))
            .field("require_auth", &self.config.require_auth)
            .finish()
    }
}

impl Webhook {
    /// Permissive webhook: deliveries without an `Authorization` header are
    /// accepted. An empty secret counts as no secret.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            config: Arc::new(WebhookConfig {
                secret: secret.filter(|s| !s.is_empty()),
                require_auth: false,
            }),
        }
    }

    pub fn with_options(
        secret: Option<String>,
        options: WebhookOptions,
    ) -> Result<Self, WebhookError> {
        let secret = secret.filter(|s| !s.is_empty());
        if options.require_auth && secret.is_none() {
            return Err(WebhookError::Configuration(
                "require_auth is set but no webhook secret was provided".into(),
            ));
        }

        Ok(Self {
            config: Arc::new(WebhookConfig {
                secret,
                require_auth: options.require_auth,
            }),
        })
    }

    /// POST route running every delivery through [`Webhook::process`].
    ///
    /// ```ignore
    /// let app = Router::new().route("/diffcordwebhook", webhook.listener(on_vote));
    /// ```
    pub fn listener<H, S>(&self, handler: H) -> MethodRouter<S>
    where
        H: VoteHandler,
        S: Clone + Send + Sync + 'static,
    {
        let webhook = self.clone();
        let handler = Arc::new(handler);

        post(move |headers: HeaderMap, body: Bytes| {
            let webhook = webhook.clone();
            let handler = handler.clone();
            async move { webhook.process(handler.as_ref(), &headers, &body).await }
        })
    }

    /// Authenticate, decode and dispatch a single delivery.
    ///
    /// Never fails: every path maps to a [`WebhookOutcome`], and handler
    /// errors are kept in the outcome without being logged.
    pub async fn process<H>(&self, handler: &H, headers: &HeaderMap, body: &[u8]) -> WebhookOutcome
    where
        H: VoteHandler + ?Sized,
    {
        if !self.authenticate(headers) {
            warn!("Rejected vote webhook: authorization does not match");
            return WebhookOutcome::Unauthorized;
        }

        let vote: Vote = match serde_json::from_slice(body) {
            Ok(vote) => vote,
            Err(e) => {
                debug!("Rejected vote webhook: invalid payload: {}", e);
                return WebhookOutcome::InvalidPayload(e);
            }
        };
        debug!(vote_id = %vote.vote_id, "Dispatching vote");

        // handle() itself may panic before a future exists
        let dispatch = async move { handler.handle(vote).await };
        match AssertUnwindSafe(dispatch).catch_unwind().await {
            Ok(Ok(())) => WebhookOutcome::Accepted,
            Ok(Err(e)) => WebhookOutcome::HandlerFailed(e),
            Err(_) => WebhookOutcome::HandlerFailed("vote handler panicked".into()),
        }
    }

    /// An empty header counts as absent. A present header must equal the
    /// secret byte for byte.
    fn authenticate(&self, headers: &HeaderMap) -> bool {
        let sent = headers
            .get(header::AUTHORIZATION)
            .filter(|v| !v.as_bytes().is_empty());

        match (sent, &self.config.secret) {
            (None, _) => !self.config.require_auth,
            (Some(_), None) => true,
            (Some(sent), Some(secret)) => sent.as_bytes() == secret.as_bytes(),
        }
    }
}
