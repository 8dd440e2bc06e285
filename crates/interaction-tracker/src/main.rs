//! interaction-tracker CLI
//!
//! Inspect and drive a file-backed tracker: log events, export, flush.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use interaction_tracker::config::default_config_path;
use interaction_tracker::{
    EventData, EventTracker, ExportFormat, FileStore, KeyValueStore, TrackerConfig,
};

#[derive(Parser)]
#[command(name = "interaction-tracker", version, about = "Buffered interaction event logger")]
struct Cli {
    /// TOML config file (defaults to the platform config dir when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the event snapshot
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append an event
    Log {
        /// Event category, e.g. "tap"
        event_type: String,
        /// JSON object of attributes
        #[arg(long)]
        data: Option<String>,
    },
    /// Print the buffered events
    Export {
        /// json or csv
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Send buffered events to the configured endpoint
    Flush,
    /// Show buffer size and remote settings
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let store = match cli.storage_dir {
        Some(dir) => FileStore::open(dir)?,
        None => FileStore::open_default()?,
    };
    tracing::debug!("Using storage directory {:?}", store.dir());
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    let tracker = EventTracker::start(config, store).await?;

    match cli.command {
        Command::Log { event_type, data } => {
            let data = data
                .map(|raw| serde_json::from_str::<EventData>(&raw))
                .transpose()?;
            tracker.log_event(event_type, data);
            tracker.sync().await;
            println!("{} events buffered", tracker.len());
        }
        Command::Export { format } => {
            let format: ExportFormat = format.parse()?;
            println!("{}", tracker.export_logs(format)?);
        }
        Command::Flush => {
            let outcome = tracker.flush().await;
            println!("{}", outcome);
        }
        Command::Status => {
            let config = tracker.config();
            println!("buffered: {}", tracker.len());
            println!(
                "remote endpoint: {}",
                config.endpoint().unwrap_or("(disabled)")
            );
            println!("flush interval: {}s", config.flush_interval_secs);
        }
    }

    tracker.shutdown();
    tracker.sync().await;
    Ok(())
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<TrackerConfig, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        return Ok(TrackerConfig::load(path)?);
    }
    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Loading config from {:?}", path);
            Ok(TrackerConfig::load(&path)?)
        }
        _ => Ok(TrackerConfig::default()),
    }
}
