mod config;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use diffcord_client::{AutoPoster, AutoPosterOptions, ClientOptions, DiffcordClient};
use diffcord_types::Vote;
use diffcord_webhook::{BoxError, Webhook, WebhookOptions};

use crate::config::{Config, PosterConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diffcord=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    if config.webhook_secret.is_none() {
        warn!("DIFFCORD_WEBHOOK_SECRET is unset, every vote delivery will be accepted");
    }
    let webhook = Webhook::with_options(
        config.webhook_secret.clone(),
        WebhookOptions {
            require_auth: config.require_auth,
        },
    )?;

    let poster = match &config.poster {
        Some(poster_config) => Some(start_poster(poster_config)?),
        None => {
            info!("Stats auto-poster disabled (set DIFFCORD_API_KEY and DIFFCORD_GUILD_COUNT)");
            None
        }
    };

    let app = Router::new()
        .route(&config.webhook_path, webhook.listener(handle_vote))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening for Diffcord votes on {}{}", addr, config.webhook_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(poster) = poster {
        poster.stop().await;
    }

    Ok(())
}

async fn handle_vote(vote: Vote) -> Result<(), BoxError> {
    info!(
        vote_id = %vote.vote_id,
        user_id = %vote.user_id,
        bot_id = %vote.bot_id,
        test = vote.test,
        monthly_votes = vote.monthly_votes,
        "Received vote"
    );
    Ok(())
}

fn start_poster(config: &PosterConfig) -> anyhow::Result<AutoPoster> {
    let client = DiffcordClient::with_options(
        &config.api_key,
        ClientOptions {
            api_version: config.api_version.clone(),
            base_path: config.api_base.clone(),
            timeout: None,
        },
    )?;

    let guilds = config.guild_count;
    let shards = config.shard_count;
    let options = AutoPosterOptions::default()
        .interval(config.interval)
        .guild_count(move || async move { Ok::<_, BoxError>(guilds) })
        .shard_count(move || async move { Ok::<_, BoxError>(shards) })
        .on_post(move || async move {
            info!(guilds, shards, "Posted bot stats to Diffcord");
        });

    Ok(AutoPoster::start(client, None, options)?)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
