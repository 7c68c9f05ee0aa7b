//! `users` subcommands: the table (list) and the form (add).

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};

use teledesk_client::UserStore;
use teledesk_model::{NewUser, UserRole};

use super::form::{self, AddressInput};
use super::table;

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users as a table
    List {
        /// Keep fetching pages until the registry is exhausted
        #[arg(long)]
        all: bool,
    },
    /// Create a user with one or more addresses
    Add(AddArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub telegram_uid: Option<i64>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub tg_username: Option<String>,

    /// Absolute http(s) URL of the profile photo
    #[arg(long)]
    pub photo_url: Option<String>,

    /// Role id: 1 admin, 2 moderator, 3 user (default)
    #[arg(long)]
    pub role: Option<u8>,

    /// Extra attribute, repeatable
    #[arg(long = "extra", value_name = "KEY=VALUE")]
    pub extra: Vec<String>,

    /// Address as "country,city,street,building[,appartment],postal_code",
    /// repeatable; at least one is required unless prompting
    #[arg(long = "address", value_name = "FIELDS")]
    pub address: Vec<String>,

    /// Prompt interactively for everything not given by flags
    #[arg(long, short)]
    pub interactive: bool,
}

pub async fn run(command: UsersCommand, store: &UserStore) -> Result<()> {
    match command {
        UsersCommand::List { all } => list(store, all).await,
        UsersCommand::Add(args) => add(store, args).await,
    }
}

async fn list(store: &UserStore, all: bool) -> Result<()> {
    store
        .fetch_all_addresses()
        .await
        .context("failed to load addresses")?;
    store.fetch_users().await.context("failed to load users")?;
    if all {
        while store.has_more_users() {
            let page = store.fetch_users().await.context("failed to load users")?;
            if page.is_empty() {
                break;
            }
        }
    }

    let users = store.users();
    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    print!(
        "{}",
        table::render_users(
            &users,
            &store.dynamic_field_keys(),
            &store.addresses_for_user(),
        )
    );
    if store.has_more_users() {
        println!("({} shown; rerun with --all for the rest)", users.len());
    } else {
        println!("({} total)", users.len());
    }
    Ok(())
}

async fn add(store: &UserStore, args: AddArgs) -> Result<()> {
    let (new_user, address_inputs) = if args.interactive {
        form::prompt_missing(args)?
    } else {
        from_flags(args)?
    };

    new_user.validate().context("refusing to submit user")?;
    if address_inputs.is_empty() {
        bail!("at least one --address is required (or use --interactive)");
    }

    let created = store
        .add_user(new_user)
        .await
        .context("failed to create user")?;
    for input in address_inputs {
        store
            .add_address(input.into_new_address(created.id))
            .await
            .context("failed to create address")?;
    }

    // Reload so the cache reflects canonical server ordering, not just the
    // local prepend.
    store.reset_users().await.context("failed to reload users")?;

    println!(
        "Created user #{}: {} {} ({})",
        created.id, created.first_name, created.last_name, created.role_id
    );
    Ok(())
}

fn from_flags(args: AddArgs) -> Result<(NewUser, Vec<AddressInput>)> {
    let telegram_uid = args
        .telegram_uid
        .context("--telegram-uid is required (or use --interactive)")?;
    let first_name = args
        .first_name
        .context("--first-name is required (or use --interactive)")?;
    let last_name = args
        .last_name
        .context("--last-name is required (or use --interactive)")?;

    let role_id = args
        .role
        .map(UserRole::try_from)
        .transpose()
        .context("unknown --role")?;
    let extra_fields = args
        .extra
        .iter()
        .map(|raw| form::parse_extra(raw))
        .collect::<Result<_>>()?;
    let address_inputs = args
        .address
        .iter()
        .map(|raw| form::parse_address(raw))
        .collect::<Result<Vec<_>>>()?;

    let new_user = NewUser {
        telegram_uid,
        first_name,
        last_name,
        tg_username: args.tg_username,
        photo_url: args.photo_url,
        role_id,
        created_at: None,
        extra_fields,
    };
    Ok((new_user, address_inputs))
}
