//! Teledesk management console.
//!
//! Thin presentation layer over [`teledesk_client::UserStore`]: the `users`
//! commands are the form/table front-end, the store owns all caching and
//! pagination state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use teledesk_client::{ApiClient, UserStore};
use teledesk_config::{Config, ConfigLoader, Overrides};

mod cli;

use cli::{addresses, users};

#[derive(Parser)]
#[command(
    name = "teledeskctl",
    version,
    about = "Management console for the Teledesk user registry"
)]
struct Cli {
    /// Base URL of the registry backend (overrides config file and env)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Path to a teledesk.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse and create users
    Users {
        #[command(subcommand)]
        command: users::UsersCommand,
    },
    /// Browse and create addresses
    Addresses {
        #[command(subcommand)]
        command: addresses::AddressesCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Cli::parse();
    let config = load_config(&args)?;
    log::debug!("resolved config: {config:?}");

    let api = ApiClient::with_timeout(
        &config.server.base_url,
        Duration::from_secs(config.http.timeout_secs),
    )
    .context("failed to build API client")?;
    let store = UserStore::with_page_size(Arc::new(api), config.store.page_size);

    match args.command {
        Command::Users { command } => users::run(command, &store).await,
        Command::Addresses { command } => addresses::run(command, &store).await,
    }
}

fn load_config(args: &Cli) -> Result<Config> {
    let mut loader =
        ConfigLoader::new().with_overrides(Overrides::from_env().context("bad TELEDESK_* value")?);
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    if let Some(server) = &args.server {
        loader = loader.with_overrides(Overrides {
            base_url: Some(server.clone()),
            ..Overrides::default()
        });
    }
    loader.load().context("failed to load configuration")
}
