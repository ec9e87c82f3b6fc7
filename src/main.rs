//! # courier
//!
//! Command-line push notification dispatcher. Wires settings, logging, the
//! HTTP transport and the messaging dispatcher together.

#![deny(unsafe_code)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use courier_core::logging::init_subscriber;
use courier_messaging::Messaging;
use courier_settings::{CourierSettings, load_settings, load_settings_from_path};
use courier_transport::StaticToken;
use serde::Serialize;
use serde_json::{Value, json};

/// Push notification dispatcher.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about = "Send push notifications from the command line")]
struct Cli {
    /// Validate on the backend without delivering.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Project id (overrides settings and environment).
    #[arg(long, global = true)]
    project_id: Option<String>,

    /// OAuth2 access token sent as a bearer token.
    #[arg(long, global = true, env = "COURIER_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Settings file (defaults to `~/.courier/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level when `RUST_LOG` is unset.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message.
    Send {
        /// Message JSON file, or `-` for stdin.
        input: PathBuf,
    },
    /// Send a JSON array of messages, one request each.
    SendEach {
        /// Message array JSON file, or `-` for stdin.
        input: PathBuf,
    },
    /// Send a JSON array of messages in one batch call.
    SendAll {
        /// Message array JSON file, or `-` for stdin.
        input: PathBuf,
    },
    /// Send one message to every token in its `tokens` list.
    Multicast {
        /// Multicast message JSON file, or `-` for stdin.
        input: PathBuf,
        /// Use a single batch call instead of one request per token.
        #[arg(long)]
        batch: bool,
    },
    /// Subscribe registration tokens to a topic.
    Subscribe {
        /// Topic name, with or without the `/topics/` prefix.
        #[arg(long)]
        topic: String,
        /// Registration tokens.
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// Unsubscribe registration tokens from a topic.
    Unsubscribe {
        /// Topic name, with or without the `/topics/` prefix.
        #[arg(long)]
        topic: String,
        /// Registration tokens.
        #[arg(required = true)]
        tokens: Vec<String>,
    },
}

fn settings_for(cli: &Cli) -> Result<CourierSettings> {
    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => load_settings().context("Failed to load settings")?,
    };
    if let Some(id) = &cli.project_id {
        settings.messaging.project_id = Some(id.clone());
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    Ok(settings)
}

/// Read JSON from `path`, or from stdin when `path` is `-`.
fn read_json(path: &Path) -> Result<Value> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        let _ = std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn read_json_array(path: &Path) -> Result<Vec<Value>> {
    match read_json(path)? {
        Value::Array(items) => Ok(items),
        _ => bail!("{} must contain a JSON array of messages", path.display()),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to render result")?;
    println!("{out}");
    Ok(())
}

async fn run(cli: Cli, messaging: &Messaging) -> Result<()> {
    let dry_run = cli.dry_run;
    match cli.command {
        Command::Send { input } => {
            let id = messaging.send(&read_json(&input)?, dry_run).await?;
            print_json(&json!({ "messageId": id }))
        }
        Command::SendEach { input } => {
            print_json(&messaging.send_each(&read_json_array(&input)?, dry_run).await?)
        }
        Command::SendAll { input } => {
            print_json(&messaging.send_all(&read_json_array(&input)?, dry_run).await?)
        }
        Command::Multicast { input, batch } => {
            let message = read_json(&input)?;
            let response = if batch {
                messaging.send_multicast(&message, dry_run).await?
            } else {
                messaging.send_each_for_multicast(&message, dry_run).await?
            };
            print_json(&response)
        }
        Command::Subscribe { topic, tokens } => {
            print_json(&messaging.subscribe_to_topic(tokens, &topic).await?)
        }
        Command::Unsubscribe { topic, tokens } => {
            print_json(&messaging.unsubscribe_from_topic(tokens, &topic).await?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = settings_for(&cli)?;
    init_subscriber(&settings.logging.level, settings.logging.format);
    tracing::debug!(send_base_url = %settings.messaging.send_base_url, "settings loaded");

    let Some(token) = cli.access_token.clone() else {
        bail!("No access token: pass --access-token or set COURIER_ACCESS_TOKEN");
    };
    let messaging = Messaging::from_settings(&settings.messaging, Arc::new(StaticToken::new(token)))
        .context("Failed to build the HTTP client")?;
    run(cli, &messaging).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
