//! sessionkit - operator CLI for the ERP client's session layer.
//!
//! Performs the same one-time startup wiring as the client and exposes the
//! forced-logout path for scripts and support staff.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use sessionkit_core::{Config, CredentialStore, SessionContext};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the configured API endpoint
const API_URL_ENV: &str = "SESSIONKIT_API_URL";

#[derive(Parser)]
#[command(name = "sessionkit", version, about = "Session lifecycle tools for the ERP client")]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Force the stored session to end
    Logout {
        /// Reason broadcast to listeners
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show what is stored for the current session
    Status,
    /// Print the effective configuration
    Config,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config.with_api_url_override(std::env::var(API_URL_ENV).ok()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    info!("sessionkit starting");

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Status => {
            let ctx: SessionContext = SessionContext::build(config, None)?;
            print_status(&ctx)?;
        }
        Command::Logout { reason } => {
            let ctx: SessionContext = SessionContext::build(config, None)?;
            let report = ctx.logout(reason.as_deref()).await;
            println!("Session terminated ({})", report.reason);
            for outcome in &report.outcomes {
                println!("  {}", outcome);
            }
        }
    }

    Ok(())
}

fn print_status(ctx: &SessionContext) -> Result<()> {
    let credentials: &dyn CredentialStore = ctx.credentials.as_ref();
    println!("API endpoint:     {}", ctx.api.base_url());
    println!("Credential store: {:?}", ctx.config.credential_backend);
    println!("Cache dir:        {}", ctx.config.cache_dir()?.display());
    println!("Cache TTL:        {}ms", ctx.cache.default_ttl().as_millis());
    println!(
        "Token:            {}",
        if credentials.has_token() { "present" } else { "none" }
    );
    match credentials.user() {
        Some(user) => println!("User:             {} ({})", user.email, user.id),
        None => println!("User:             none"),
    }
    Ok(())
}
