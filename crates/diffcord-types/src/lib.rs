pub mod api;
pub mod models;

pub use api::{ApiError, Envelope};
pub use models::{BotVoteStats, Vote, VoterStatus};
