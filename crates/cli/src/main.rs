//! Xyno CLI - manage templates, events and integrations from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (tokens are kept in ~/.config/xyno/storage.json)
//! xyno login -u ada
//!
//! # Work against production instead of sandbox
//! xyno env set production
//!
//! # Create a template from an HTML file
//! xyno templates upload welcome.html --name Welcome --subject "Hi {{name}}"
//!
//! # Promote a sandbox event, then queue a test send
//! xyno events promote 12
//! xyno events test 12 --to ada@example.com --set name=Ada
//! ```
//!
//! # Environment Variables
//!
//! - `XYNO_API_URL` - API root (default `http://localhost:8000/api`)
//! - `XYNO_STORAGE` - token and environment file
//! - `XYNO_PASSWORD` - password for `login` and `register`, skips the prompt

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use xyno_client::config::DEFAULT_API_URL;

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "xyno")]
#[command(author, version, about = "Xyno email API command-line client")]
struct Cli {
    /// API root
    #[arg(long, global = true, env = "XYNO_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// File holding tokens and the selected environment
    #[arg(long, global = true, env = "XYNO_STORAGE")]
    storage: Option<PathBuf>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the tokens
    Login(commands::auth::LoginArgs),
    /// Create an account and organization, then sign in
    Register(commands::auth::RegisterArgs),
    /// Forget the stored tokens
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show or change the sandbox/production environment
    Env {
        #[command(subcommand)]
        action: commands::env::EnvAction,
    },
    /// Manage email templates
    Templates {
        #[command(subcommand)]
        action: commands::templates::TemplatesAction,
    },
    /// Manage events
    Events {
        #[command(subcommand)]
        action: commands::events::EventsAction,
    },
    /// Manage SES integrations
    Integrations {
        #[command(subcommand)]
        action: commands::integrations::IntegrationsAction,
    },
    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: commands::keys::KeysAction,
    },
    /// Manage brand components
    Brand {
        #[command(subcommand)]
        action: commands::brand::BrandAction,
    },
    /// Manage team members (admins only)
    Users {
        #[command(subcommand)]
        action: commands::users::UsersAction,
    },
    /// Inspect send logs
    Logs {
        #[command(subcommand)]
        action: commands::logs::LogsAction,
    },
    /// Upload images
    Media {
        #[command(subcommand)]
        action: commands::media::MediaAction,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "xyno_cli=info,xyno_client=warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_session_expired() => {
            eprintln!("Your session has expired. Run `xyno login` to sign in again.");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let storage = match cli.storage {
        Some(path) => path,
        None => commands::default_storage_path()?,
    };
    let ctx = Context::open(&cli.api_url, storage, cli.json)?;

    match cli.command {
        Commands::Login(args) => commands::auth::login(&ctx, args).await,
        Commands::Register(args) => commands::auth::register(&ctx, args).await,
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Whoami => commands::auth::whoami(&ctx).await,
        Commands::Env { action } => commands::env::run(&ctx, action),
        Commands::Templates { action } => commands::templates::run(&ctx, action).await,
        Commands::Events { action } => commands::events::run(&ctx, action).await,
        Commands::Integrations { action } => commands::integrations::run(&ctx, action).await,
        Commands::Keys { action } => commands::keys::run(&ctx, action).await,
        Commands::Brand { action } => commands::brand::run(&ctx, action).await,
        Commands::Users { action } => commands::users::run(&ctx, action).await,
        Commands::Logs { action } => commands::logs::run(&ctx, action).await,
        Commands::Media { action } => commands::media::run(&ctx, action).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "xyno",
            "templates",
            "list",
            "--json",
            "--api-url",
            "http://api.test/api",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.api_url, "http://api.test/api");
    }
}
