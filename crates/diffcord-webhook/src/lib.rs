//! Receiver for Diffcord vote webhooks.
//!
//! Mount [`Webhook::listener`] on an axum router. Each delivery is
//! authenticated against the shared secret, decoded into a [`Vote`] and
//! passed to the caller's [`VoteHandler`].

pub mod handler;
pub mod middleware;

pub use handler::{BoxError, VoteHandler};
pub use middleware::{Webhook, WebhookError, WebhookOptions, WebhookOutcome};

pub use diffcord_types::Vote;
