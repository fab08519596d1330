use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backport_bot::backport::BackportService;
use backport_bot::config::AppConfig;
use backport_bot::github::{GitHubApi, GitHubClient, RepositoryRef, SaveHook};
use backport_bot::webhooks::github::{router, AppState};
use backport_bot::webhooks::{register_hook, EventService, WebhookEvent};

#[derive(Parser)]
#[command(name = "backport-bot")]
#[command(about = "Backports fixed GitHub issues to maintenance branch milestones")]
struct Cli {
    /// Configuration file (defaults to ./backport-bot.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the webhook endpoint
    Serve,
    /// Process a single webhook payload
    Handle {
        /// GitHub event name (push, issues, pull_request)
        #[arg(short, long)]
        event_name: String,

        /// JSON payload, or @path to read it from a file
        #[arg(short, long)]
        payload: String,
    },
    /// Create or update the repository webhook pointing at this bot
    RegisterHook {
        /// Repository as owner/repo
        #[arg(short, long)]
        repository: String,

        /// Public URL of the webhook endpoint
        #[arg(short, long)]
        url: String,

        /// Events to subscribe to
        #[arg(short, long = "event", default_values = ["push", "issues", "pull_request"])]
        events: Vec<String>,

        /// Token used to look up the bot's permission (defaults to the configured token)
        #[arg(long)]
        access_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backport_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    info!("Configuration loaded");

    let github: Arc<dyn GitHubApi> = Arc::new(GitHubClient::new(
        &config.github_api_url,
        &config.github_token,
        config.request_timeout(),
    )?);
    let events = EventService::new(BackportService::new(github.clone()));

    match cli.command {
        Commands::Serve => serve(config, events).await,
        Commands::Handle {
            event_name,
            payload,
        } => handle(&events, &event_name, &payload).await,
        Commands::RegisterHook {
            repository,
            url,
            events: hook_events,
            access_token,
        } => {
            register(github.as_ref(), &config, repository, url, hook_events, access_token).await
        }
    }
}

async fn serve(config: AppConfig, events: EventService) -> anyhow::Result<()> {
    let state = AppState::new(events, config.webhook_secret.clone(), config.request_timeout());
    let app = router(state);

    let addr = config.bind_address();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle(events: &EventService, event_name: &str, payload: &str) -> anyhow::Result<()> {
    let body = match payload.strip_prefix('@') {
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read payload from {}", path))?,
        None => payload.as_bytes().to_vec(),
    };

    let event = WebhookEvent::parse(event_name, &body)?;
    if let WebhookEvent::Unsupported(name) = &event {
        bail!("Unsupported event '{}'. Expected push, issues or pull_request", name);
    }

    let created = events.handle(&event).await?;
    println!("{}", if created { "Created" } else { "OK" });
    Ok(())
}

async fn register(
    github: &dyn GitHubApi,
    config: &AppConfig,
    repository: String,
    url: String,
    events: Vec<String>,
    access_token: Option<String>,
) -> anyhow::Result<()> {
    let Some(secret) = config.webhook_secret.clone().filter(|s| !s.is_empty()) else {
        bail!("webhook_secret must be configured to register a hook");
    };
    let access_token = access_token.unwrap_or_else(|| config.github_token.clone());

    let hook = SaveHook::new(RepositoryRef::new(repository), url, secret, events);
    register_hook(github, &hook, &access_token).await?;
    Ok(())
}
