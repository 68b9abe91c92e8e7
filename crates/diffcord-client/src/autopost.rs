use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::DiffcordClient;
use crate::error::ClientError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type CountFn = Arc<dyn Fn() -> BoxFuture<'static, Result<u64, BoxError>> + Send + Sync>;
type PostHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Guild and shard counts of the host bot.
///
/// Implement this for the bot framework's client so the poster can read
/// its counts on every tick.
pub trait StatsSource: Send + Sync + 'static {
    fn guild_count(&self) -> BoxFuture<'_, Result<u64, BoxError>>;
    fn shard_count(&self) -> BoxFuture<'_, Result<u64, BoxError>>;
}

/// Settings for [`AutoPoster`]. Explicit count functions take precedence
/// over the [`StatsSource`].
#[derive(Clone)]
pub struct AutoPosterOptions {
    pub interval: Duration,
    guild_count: Option<CountFn>,
    shard_count: Option<CountFn>,
    on_post: Option<PostHook>,
}

impl Default for AutoPosterOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            guild_count: None,
            shard_count: None,
            on_post: None,
        }
    }
}

impl fmt::Debug for AutoPosterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoPosterOptions")
            .field("interval", &self.interval)
            .field("guild_count", &self.guild_count.is_some())
            .field("shard_count", &self.shard_count.is_some())
            .field("on_post", &self.on_post.is_some())
            .finish()
    }
}

impl AutoPosterOptions {
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn guild_count<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<u64, BoxError>> + Send + 'static,
    {
        self.guild_count = Some(Arc::new(move || f().boxed()));
        self
    }

    pub fn shard_count<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<u64, BoxError>> + Send + 'static,
    {
        self.shard_count = Some(Arc::new(move || f().boxed()));
        self
    }

    /// Run after every successful stats push.
    pub fn on_post<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_post = Some(Arc::new(move || f().boxed()));
        self
    }
}

/// One resolved tick: everything needed to push stats once.
#[derive(Clone)]
struct Poster {
    client: DiffcordClient,
    guild_count: CountFn,
    shard_count: CountFn,
    on_post: Option<PostHook>,
}

impl Poster {
    async fn post(&self) -> Result<(), ClientError> {
        let guilds = (self.guild_count)().await.map_err(|e| {
            ClientError::Configuration(format!(
                "could not get guild count ({}), please provide a custom guild count function",
                e
            ))
        })?;
        let shards = (self.shard_count)().await.map_err(|e| {
            ClientError::Configuration(format!(
                "could not get shard count ({}), please provide a custom shard count function",
                e
            ))
        })?;

        self.client.update_stats(guilds, Some(shards)).await?;
        debug!(guilds, shards, "Posted bot stats");

        if let Some(hook) = &self.on_post {
            hook().await;
        }
        Ok(())
    }
}

/// Background task pushing bot stats on a fixed period.
///
/// Ticks run in their own tasks, so a slow push never delays the next one
/// and pushes may overlap. Call [`AutoPoster::stop`] to shut it down; dropping
/// the poster cancels it as well.
pub struct AutoPoster {
    poster: Poster,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutoPoster {
    /// Resolve the count functions and start the timer. The first push
    /// happens one full interval after this call.
    pub fn start(
        client: DiffcordClient,
        source: Option<Arc<dyn StatsSource>>,
        options: AutoPosterOptions,
    ) -> Result<Self, ClientError> {
        if options.interval.is_zero() {
            return Err(ClientError::Configuration(
                "auto-poster interval must be greater than zero".into(),
            ));
        }
        let first_tick = Instant::now().checked_add(options.interval).ok_or_else(|| {
            ClientError::Configuration(format!(
                "auto-poster interval {:?} is too large",
                options.interval
            ))
        })?;

        let guild_count = match (options.guild_count, &source) {
            (Some(f), _) => f,
            (None, Some(source)) => source_guild_count(source.clone()),
            (None, None) => {
                return Err(ClientError::Configuration(
                    "could not get guild count, please provide a custom guild count function"
                        .into(),
                ));
            }
        };
        let shard_count = match (options.shard_count, &source) {
            (Some(f), _) => f,
            (None, Some(source)) => source_shard_count(source.clone()),
            (None, None) => {
                return Err(ClientError::Configuration(
                    "could not get shard count, please provide a custom shard count function"
                        .into(),
                ));
            }
        };

        let poster = Poster {
            client,
            guild_count,
            shard_count,
            on_post: options.on_post,
        };
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_post_loop(
            poster.clone(),
            first_tick,
            options.interval,
            cancel.clone(),
        ));
        info!("Stats auto-poster started, interval {:?}", options.interval);

        Ok(Self {
            poster,
            cancel,
            task: Some(task),
        })
    }

    /// Push stats once, outside the timer, and report the outcome.
    pub async fn post_now(&self) -> Result<(), ClientError> {
        self.poster.post().await
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the timer and any in-flight push, then wait for the task to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Auto-poster task ended abnormally: {}", e);
            }
        }
        info!("Stats auto-poster stopped");
    }
}

impl Drop for AutoPoster {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn source_guild_count(source: Arc<dyn StatsSource>) -> CountFn {
    Arc::new(move || {
        let source = source.clone();
        async move { source.guild_count().await }.boxed()
    })
}

fn source_shard_count(source: Arc<dyn StatsSource>) -> CountFn {
    Arc::new(move || {
        let source = source.clone();
        async move { source.shard_count().await }.boxed()
    })
}

async fn run_post_loop(
    poster: Poster,
    first_tick: Instant,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let poster = poster.clone();
                in_flight.spawn(async move {
                    if let Err(e) = poster.post().await {
                        warn!("Stats auto-post failed: {}", e);
                    }
                });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    in_flight.shutdown().await;
}
