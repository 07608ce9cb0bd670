//! FabEntry: door-entry access-control terminal.
//!
//! A kiosk that authenticates people by name + RUT + PIN against a hosted
//! record store, drives the door lock cycle, appends an audit trail, and
//! offers a teacher-gated admin dashboard. See `cli` for the front-end and
//! `terminal`/`auth`/`audit`/`directory` for the core.

mod audit;
mod auth;
mod cli;
mod config;
mod directory;
mod error;
mod signal;
mod store;
mod terminal;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::store::{FirebaseStore, MemoryStore, RecordStore};

#[derive(Parser)]
#[command(name = "fabentry", version, about = "Door-entry access-control terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the kiosk terminal.
    Run {
        /// Use an in-memory store seeded with demo records instead of the
        /// hosted database.
        #[arg(long)]
        offline: bool,
    },
    /// Write a starter config file and print its location.
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    match args.command {
        Command::Setup => setup(),
        Command::Run { offline } => run(offline).await,
    }
}

fn setup() -> Result<()> {
    let path = Config::default_path()?;
    if path.exists() {
        bail!("config already exists at {}", path.display());
    }
    Config::default().save_to(&path)?;
    println!("Wrote starter config to {}", path.display());
    println!("Set [store] url (or FABENTRY_STORE_URL) before running the kiosk.");
    Ok(())
}

async fn run(offline: bool) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let store: Arc<dyn RecordStore> = if offline {
        tracing::info!("running offline with an in-memory store and demo records");
        Arc::new(demo_store().await)
    } else {
        if config.store.url.is_empty() {
            bail!(
                "no store URL configured; run `fabentry setup` and edit the config, \
                 set FABENTRY_STORE_URL, or pass --offline for a demo"
            );
        }
        Arc::new(FirebaseStore::new(&config.store)?)
    };

    cli::run(store, &config).await
}

/// Seed the offline demo with one student and one teacher so every flow
/// can be exercised without a database.
async fn demo_store() -> MemoryStore {
    use crate::store::{child_path, CredentialRecord, Role, USERS_COLLECTION};

    let store = MemoryStore::new();
    let records = [
        ("111111111", CredentialRecord::new("Juan Soto", "9999", Role::Student)),
        ("123456789", CredentialRecord::new("Ana Pérez", "1234", Role::Teacher)),
    ];
    for (id, record) in records {
        let _ = store
            .put(&child_path(USERS_COLLECTION, id), &record.to_value())
            .await;
        tracing::info!(identifier = id, pin = %record.pin, "demo record: {}", record.display_name);
    }
    store
}
