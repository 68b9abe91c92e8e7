use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use diffcord_types::{ApiError, BotVoteStats, Envelope, VoterStatus};

use crate::error::ClientError;

pub const DEFAULT_BASE_PATH: &str = "https://api.diffcord.com/";
pub const DEFAULT_API_VERSION: &str = "v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("Diffcord-Rust-SDK/", env!("CARGO_PKG_VERSION"));
static API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Optional settings for [`DiffcordClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Defaults to `"v1"`.
    pub api_version: Option<String>,
    /// Defaults to `"https://api.diffcord.com/"`. The version is appended verbatim.
    pub base_path: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct StatsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    guilds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shards: Option<u64>,
}

/// Authenticated client for the Diffcord API.
///
/// Cloning is cheap: clones share the connection pool and credentials.
#[derive(Debug, Clone)]
pub struct DiffcordClient {
    http: Client,
    base_url: Url,
}

impl DiffcordClient {
    /// Create a client with the default API version and base path.
    pub fn new(api_key: &str) -> Result<Self, ClientError> {
        Self::with_options(api_key, ClientOptions::default())
    }

    pub fn with_options(api_key: &str, options: ClientOptions) -> Result<Self, ClientError> {
        if api_key.trim().is_empty() {
            return Err(ClientError::Configuration("api key is required".into()));
        }

        let api_version = options
            .api_version
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let base_path = options
            .base_path
            .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());

        let raw_base = format!("{}{}", base_path, api_version);
        let base_url = Url::parse(&raw_base).map_err(|e| {
            ClientError::Configuration(format!("invalid base url '{}': {}", raw_base, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "base url '{}' cannot carry a path",
                raw_base
            )));
        }

        let http = Client::builder()
            .timeout(options.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(USER_AGENT)
            .default_headers(default_headers(api_key)?)
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build http client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// `{basePath}{apiVersion}` as configured at construction.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the vote status of a user for this bot.
    pub async fn get_user_vote_info(&self, user_id: &str) -> Result<VoterStatus, ClientError> {
        let url = self.endpoint(&["users", user_id, "votes"]);
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        read_data(resp).await
    }

    /// Fetch this month's vote totals for the bot.
    pub async fn get_vote_info(&self) -> Result<BotVoteStats, ClientError> {
        let url = self.endpoint(&["votes"]);
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        read_data(resp).await
    }

    /// Push guild and shard counts. Zero counts are left out of the query.
    pub async fn update_stats(&self, guilds: u64, shards: Option<u64>) -> Result<(), ClientError> {
        let query = StatsQuery {
            guilds: (guilds > 0).then_some(guilds),
            shards: shards.filter(|s| *s > 0),
        };
        let url = self.endpoint(&["stats"]);
        debug!(?query, "POST {}", url);

        let resp = self.http.post(url).query(&query).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = failure_body(resp).await;
        Err(request_error(status, &body))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn default_headers(api_key: &str) -> Result<HeaderMap, ClientError> {
    let mut key = HeaderValue::from_str(api_key).map_err(|_| {
        ClientError::Configuration("api key contains characters not allowed in a header".into())
    })?;
    key.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER.clone(), key.clone());
    headers.insert(AUTHORIZATION, key);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Unwrap the `data` field of a response, or turn a failure status into
/// [`ClientError::Request`].
async fn read_data<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = failure_body(resp).await;
        return Err(request_error(status, &body));
    }
    let body = resp.bytes().await?;

    let envelope: Envelope<T> =
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
    envelope
        .into_data()
        .ok_or_else(|| ClientError::Decode("response envelope has no data".into()))
}

/// Body of a failure response. A body that cannot be read is treated as
/// empty so the status still reaches the caller.
async fn failure_body(resp: Response) -> Vec<u8> {
    match resp.bytes().await {
        Ok(body) => body.to_vec(),
        Err(e) => {
            debug!("Failed to read error response body: {}", e);
            Vec::new()
        }
    }
}

fn request_error(status: StatusCode, body: &[u8]) -> ClientError {
    // The error body is best effort: missing or malformed fields become empty strings.
    let error = serde_json::from_slice::<Envelope<IgnoredAny>>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .unwrap_or_else(ApiError::default);

    ClientError::Request {
        code: error.code,
        message: error.message,
        status: status.as_u16(),
    }
}
