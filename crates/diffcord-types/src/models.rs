use serde::{Deserialize, Serialize};

/// A single vote for a bot, as delivered to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: String,
    pub user_id: String,
    pub bot_id: String,
    /// Seconds elapsed since the vote was cast.
    pub since_vote: Option<u64>,
    /// Whether the vote has been rewarded or acknowledged. Only changes through an API request.
    pub rewarded: bool,
    /// Test votes are sent from the bot dashboard.
    pub test: bool,
    /// Votes this month, excluding this one.
    pub monthly_votes: u64,
}

/// Vote status of one user for the authenticated bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    pub user_id: String,
    pub bot_id: String,
    pub monthly_votes: u64,
    pub since_last_vote: Option<u64>,
    /// Seconds until the user can vote again.
    pub next_vote: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotVoteStats {
    /// Total votes this month.
    pub month_votes: u64,
}
