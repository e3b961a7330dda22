//! # devsync
//!
//! CLI tool for exercising devsync read tracking and key sync against a
//! local state file.
//!
//! ## Commands
//!
//! - `init`: Register a local account, its self-thread and root keys
//! - `receive`: Simulate an incoming message or call
//! - `read`: Mark an interaction (or a thread prefix) as read
//! - `keys`: Show, rotate or resync root keys
//! - `status`: Show account, thread and key status
//!
//! ## Example
//!
//! ```bash
//! # Initialize
//! devsync init
//!
//! # Receive a disappearing message
//! devsync receive "Hello!" --expires-in 3600
//!
//! # Read it on this device
//! devsync read <id>
//!
//! # A linked device asked for the keys
//! devsync keys --resync "Laptop"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use devsync_core::CallKind;
use devsync_types::{InteractionId, ReadCircumstance, SortId};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod effects;

use commands::read::{ReadArgs, Target};
use commands::receive::Incoming;
use commands::{init, keys, read, receive, status};
use config::CliConfig;

/// CLI tool for exercising devsync read tracking and key sync.
#[derive(Parser, Debug)]
#[command(name = "devsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the state file and devsync.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a local account with its self-thread and root keys
    Init,

    /// Simulate an incoming message or call on the peer thread
    Receive {
        /// Message text (or use --call)
        body: Option<String>,

        /// Receive a call notification instead of a message
        #[arg(long, value_enum, conflicts_with = "body")]
        call: Option<CallArg>,

        /// Disappearing-message duration in seconds
        #[arg(long, conflicts_with = "call")]
        expires_in: Option<u64>,
    },

    /// Mark an interaction as read
    Read {
        /// Interaction to mark (or use --through)
        id: Option<InteractionId>,

        /// Mark every peer-thread interaction up to this sort id
        #[arg(long, conflicts_with = "id")]
        through: Option<u64>,

        /// Read timestamp in milliseconds since the epoch (default: now)
        #[arg(long)]
        at: Option<u64>,

        /// Where the read happened, e.g. on-linked-device
        #[arg(long)]
        circumstance: Option<ReadCircumstance>,

        /// Do not clear notifications
        #[arg(long)]
        no_clear: bool,
    },

    /// Show root keys, optionally rotating or syncing them
    Keys {
        /// Generate new root keys and sync them to linked devices
        #[arg(long, conflicts_with = "resync")]
        rotate: bool,

        /// Answer a resync request from the named linked device
        #[arg(long)]
        resync: Option<String>,
    },

    /// Show account, thread and key status
    Status,
}

/// Call outcome accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CallArg {
    Missed,
    Incoming,
    Declined,
}

impl From<CallArg> for CallKind {
    fn from(arg: CallArg) -> Self {
        match arg {
            CallArg::Missed => CallKind::Missed,
            CallArg::Incoming => CallKind::Incoming,
            CallArg::Declined => CallKind::Declined,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let config = CliConfig::load_or_default(&data_dir)?;
    init_tracing(&config);

    match cli.command {
        Commands::Init => {
            init::run(&data_dir, &config).await?;
        }
        Commands::Receive {
            body,
            call,
            expires_in,
        } => {
            let incoming = if let Some(kind) = call {
                Incoming::Call(kind.into())
            } else if let Some(body) = body {
                Incoming::Message {
                    body,
                    expires_in: expires_in.map(Duration::from_secs),
                }
            } else {
                anyhow::bail!("Must specify a message body or --call");
            };
            receive::run(&data_dir, incoming).await?;
        }
        Commands::Read {
            id,
            through,
            at,
            circumstance,
            no_clear,
        } => {
            let target = if let Some(id) = id {
                Target::Interaction(id)
            } else if let Some(through) = through {
                Target::Through(SortId::new(through))
            } else {
                anyhow::bail!("Must specify an interaction id or --through");
            };
            let args = ReadArgs {
                target,
                at,
                circumstance,
                no_clear,
            };
            read::run(&data_dir, &config, args).await?;
        }
        Commands::Keys { rotate, resync } => {
            keys::run(&data_dir, rotate, resync).await?;
        }
        Commands::Status => {
            status::run(&data_dir).await?;
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` overrides the config file.
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Get the default data directory for devsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "devsync", "devsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
