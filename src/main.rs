use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use repo_editor::App;
use repo_editor::Config;
use repo_editor::clients::github::GithubClient;
use repo_editor::config;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Parser)]
#[command(name = "repo-editor")]
#[command(about = "Edit files in a GitHub repository via direct commits or pull requests", long_about = None)]
pub struct Cli {
    /// Repository to edit, as owner/repo or a GitHub URL
    #[arg(short, long, env = "EDITOR_REPOSITORY")]
    repository: String,

    /// Address to listen on
    #[arg(short, long, env = "EDITOR_LISTEN", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "EDITOR_API_URL", default_value = config::DEFAULT_API_URL)]
    api_url: String,

    /// Branch that commits land on and proposals target
    #[arg(long, env = "EDITOR_BASE_BRANCH", default_value = config::DEFAULT_BASE_BRANCH)]
    base_branch: String,

    /// Prefix for proposal branch names
    #[arg(long, env = "EDITOR_BRANCH_PREFIX", default_value = config::DEFAULT_BRANCH_PREFIX)]
    branch_prefix: String,

    /// File edited when a request names none
    #[arg(long, env = "EDITOR_DEFAULT_PATH", default_value = config::DEFAULT_PATH)]
    default_path: String,

    /// Authenticate at start-up instead of waiting for POST /auth
    #[arg(long, env = "EDITOR_GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;
    let cli = Cli::parse();

    let config = Config::from_repository(&cli.repository)?
        .with_api_url(&cli.api_url)
        .with_base_branch(cli.base_branch)
        .with_branch_prefix(cli.branch_prefix)
        .with_default_path(cli.default_path);
    let gh = GithubClient::new(&config)?;
    let app = App::new(config, Arc::new(gh));

    if let Some(token) = &cli.token {
        app.authenticate(token)
            .context("Invalid token given on the command line")?;
    }

    repo_editor::server::serve(Arc::new(app), cli.listen).await
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}
