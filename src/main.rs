use clap::Parser;
use gitboard::api::{self, AppState};
use gitboard::audit::AuditLogger;
use gitboard::config::Config;
use gitboard::error::{AppError, AppResult};
use gitboard::error_translation::ErrorTranslator;
use gitboard::git::GitExecutor;
use gitboard::{GitVersion, Repository};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gitboard", version, about = "Serve a git working tree as a JSON API")]
struct Cli {
    /// Config file (default: ~/.config/gitboard/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Working tree to serve (overrides GIT_REPO_PATH)
    #[arg(short, long)]
    repo: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.config.is_none() && std::env::var_os("HOME").is_none() {
        tracing::warn!("HOME is not set, running with default configuration");
    }

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "gitboard failed");
        exit_with(&e);
    }
}

fn exit_with(error: &AppError) -> ! {
    let friendly = ErrorTranslator::translate_app_error(error);

    eprintln!("Error: {}", friendly.simple_message);
    if !friendly.raw_error.is_empty() && friendly.raw_error != friendly.simple_message {
        eprintln!("  {}", friendly.raw_error);
    }
    if let Some(suggestion) = &friendly.suggestion {
        eprintln!("  {}", suggestion);
    }

    std::process::exit(1);
}

fn load_config(cli: &Cli) -> AppResult<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(repo) = &cli.repo {
        config.repository.path = Some(repo.clone());
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    config.validate()?;
    Ok(config)
}

async fn run(config: Config) -> AppResult<()> {
    let root = Repository::find_root(config.repo_path()?)?;

    let executor = GitExecutor::with_limits(
        &root,
        config.git_timeout(),
        config.git.max_output_bytes,
    );
    let version = GitVersion::validate(&executor).await?;
    tracing::info!(%version, repo = %root.display(), "using git");

    let mut repo = Repository::with_runner(Arc::new(executor));
    let home = std::env::var_os("HOME").map(PathBuf::from);
    if let Some(logger) = AuditLogger::from_config(&config.logging, home.as_deref())? {
        tracing::info!(path = %logger.log_path().display(), "audit log enabled");
        repo = repo.with_audit_log(logger);
    }

    let host: IpAddr = config.server.host.parse().map_err(|_| {
        gitboard::config::ConfigError::InvalidValue(format!(
            "server.host is not an IP address: {}",
            config.server.host
        ))
    })?;
    let addr = SocketAddr::new(host, config.server.port);

    api::serve(addr, AppState::new(repo)).await?;
    Ok(())
}
