use std::time::Duration;

use anyhow::{Context, Result, bail};

const DEFAULT_POST_INTERVAL_SECS: u64 = 30 * 60;

/// Listener settings, read from `DIFFCORD_*` environment variables.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub webhook_path: String,
    pub webhook_secret: Option<String>,
    pub require_auth: bool,
    /// Present when an API key and a guild count are configured.
    pub poster: Option<PosterConfig>,
}

#[derive(Clone)]
pub struct PosterConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub api_version: Option<String>,
    pub guild_count: u64,
    pub shard_count: u64,
    pub interval: Duration,
}

impl std::fmt::Debug for PosterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosterConfig")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("guild_count", &self.guild_count)
            .field("shard_count", &self.shard_count)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values behave like unset ones.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("DIFFCORD_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("DIFFCORD_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("DIFFCORD_PORT must be a port number")?;

        let webhook_path =
            get("DIFFCORD_WEBHOOK_PATH").unwrap_or_else(|| "/diffcordwebhook".into());
        if !webhook_path.starts_with('/') {
            bail!("DIFFCORD_WEBHOOK_PATH must start with '/', got '{}'", webhook_path);
        }

        let webhook_secret = get("DIFFCORD_WEBHOOK_SECRET");
        let require_auth = match get("DIFFCORD_REQUIRE_AUTH") {
            Some(v) => v
                .parse()
                .context("DIFFCORD_REQUIRE_AUTH must be 'true' or 'false'")?,
            None => false,
        };

        let poster = match (get("DIFFCORD_API_KEY"), get("DIFFCORD_GUILD_COUNT")) {
            (Some(api_key), Some(guilds)) => {
                let guild_count = guilds
                    .parse()
                    .context("DIFFCORD_GUILD_COUNT must be a non-negative integer")?;
                let shard_count = match get("DIFFCORD_SHARD_COUNT") {
                    Some(v) => v
                        .parse()
                        .context("DIFFCORD_SHARD_COUNT must be a non-negative integer")?,
                    None => 1,
                };
                let interval_secs = match get("DIFFCORD_POST_INTERVAL_SECS") {
                    Some(v) => v
                        .parse()
                        .context("DIFFCORD_POST_INTERVAL_SECS must be a number of seconds")?,
                    None => DEFAULT_POST_INTERVAL_SECS,
                };

                Some(PosterConfig {
                    api_key,
                    api_base: get("DIFFCORD_API_BASE"),
                    api_version: get("DIFFCORD_API_VERSION"),
                    guild_count,
                    shard_count,
                    interval: Duration::from_secs(interval_secs),
                })
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            webhook_path,
            webhook_secret,
            require_auth,
            poster,
        })
    }
}
