//! erp - a command-line client for the ERP API.
//!
//! Every subcommand goes through the authenticated request pipeline in
//! `erp-client-core`, so an expired access token is refreshed
//! transparently and a failed refresh ends the stored session.

mod cli;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use erp_client_core::{
    ApiClient, Config, CredentialStore, Environment, FileStore, KeyringStore, NewUser, SessionEvent, UserId,
    UserUpdate,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};

/// Environment variable holding a non-interactive password
const PASSWORD_VAR: &str = "ERP_PASSWORD";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });
    let environment = args.environment.unwrap_or_else(|| config.environment());
    let client_config = config.resolve_for(environment);
    info!(environment = %environment, base_url = %client_config.base_url, "ERP client starting");

    let credentials = open_credentials(args.keyring)?;
    let client = ApiClient::with_reqwest(client_config, credentials)?;
    let mut events = client.subscribe();

    let result = run(&client, &mut config, environment, args.command).await;
    report_session_events(&mut events);
    result
}

fn open_credentials(use_keyring: bool) -> Result<CredentialStore> {
    if use_keyring {
        return Ok(CredentialStore::new(Arc::new(KeyringStore::default())));
    }
    let store = FileStore::in_cache_dir().context("Failed to locate credentials file")?;
    info!(path = %store.path().display(), "Using file credential store");
    Ok(CredentialStore::new(Arc::new(store)))
}

fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::SessionTerminated {
            eprintln!("Session expired. Please log in again with `erp login`.");
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_VAR) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

async fn run(
    client: &ApiClient,
    config: &mut Config,
    environment: Environment,
    command: Command,
) -> Result<()> {
    match command {
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = read_password()?;
            let login = client.login(&email, &password).await?;

            config.last_email = Some(email);
            config.environment = Some(environment);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }

            eprintln!(
                "Logged in as {} ({})",
                login.user.display_name(),
                login.user.role.as_deref().unwrap_or("no role")
            );
        }
        Command::Logout => {
            client.logout();
            eprintln!("Logged out.");
        }
        Command::Whoami => {
            if !client.is_authenticated() {
                eprintln!("Not logged in.");
                return Ok(());
            }
            match client.current_user() {
                Some(user) => print_json(&user)?,
                None => eprintln!("Logged in, but no user record is cached. Run `erp profile`."),
            }
        }
        Command::Profile => {
            let user = client.get_user_profile().await?;
            print_json(&user)?;
        }
        Command::Register {
            email,
            name,
            role,
            tenant_id,
        } => {
            let password = read_password()?;
            let user = client
                .register_user(&NewUser {
                    tenant_id,
                    email,
                    password,
                    name,
                    role,
                })
                .await?;
            print_json(&user)?;
        }
        Command::Update {
            id,
            name,
            role,
            active,
        } => {
            let update = UserUpdate {
                name,
                role,
                is_active: active,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update: pass --name, --role or --active");
            }
            let user = client.update_user(&UserId::from(id), &update).await?;
            print_json(&user)?;
        }
        Command::Delete { id } => {
            client.delete_user(&UserId::from(id.as_str())).await?;
            eprintln!("User {} deleted.", id);
        }
        Command::List { limit, offset } => {
            let page = client.list_users(limit, offset).await?;
            print_json(&page)?;
            if limit > 0 {
                let limit = u64::from(limit);
                let total_pages = page.total.div_ceil(limit).max(1);
                let current = u64::from(offset) / limit + 1;
                eprintln!("Page {} of {} ({} users)", current, total_pages, page.total);
            }
        }
        Command::Count => {
            let count = client.get_user_count().await?;
            println!("{}", count);
        }
    }
    Ok(())
}
