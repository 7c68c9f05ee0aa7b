//! `addresses` subcommands: grouped read-only listings.

use anyhow::{Context, Result};
use clap::Subcommand;

use teledesk_client::UserStore;
use teledesk_model::UserId;

use super::table;

#[derive(Debug, Subcommand)]
pub enum AddressesCommand {
    /// List non-deleted addresses, grouped by owning user
    List {
        /// Only addresses of this user id
        #[arg(long)]
        user: Option<i64>,
    },
}

pub async fn run(command: AddressesCommand, store: &UserStore) -> Result<()> {
    match command {
        AddressesCommand::List { user } => list(store, user.map(UserId)).await,
    }
}

async fn list(store: &UserStore, only_user: Option<UserId>) -> Result<()> {
    store
        .fetch_all_addresses()
        .await
        .context("failed to load addresses")?;

    let grouped = store.addresses_for_user();
    let mut user_ids: Vec<UserId> = grouped
        .keys()
        .copied()
        .filter(|user_id| only_user.is_none_or(|only| only == *user_id))
        .collect();
    user_ids.sort();

    if user_ids.is_empty() {
        println!("No addresses found.");
        return Ok(());
    }

    for user_id in user_ids {
        println!("user {user_id}:");
        for address in &grouped[&user_id] {
            println!("  - {}", table::format_address(address));
        }
    }
    Ok(())
}
