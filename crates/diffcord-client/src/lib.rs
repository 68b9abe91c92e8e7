//! Client for the Diffcord vote API.
//!
//! [`DiffcordClient`] wraps the vote and stats endpoints. [`AutoPoster`]
//! pushes guild and shard counts on a timer.

pub mod autopost;
pub mod client;
pub mod error;

pub use autopost::{AutoPoster, AutoPosterOptions, BoxError, StatsSource};
pub use client::{ClientOptions, DiffcordClient};
pub use error::ClientError;

pub use diffcord_types::{ApiError, BotVoteStats, Vote, VoterStatus};
