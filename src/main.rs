//! footctl host runner
//!
//! Runs the device core off-hardware: the configuration store persists
//! to a file, and the remote protocol is served either on a TCP socket
//! (for the host editor) or through a local REPL.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use footctl::remote::{RemoteHandler, ResponseSink};
use footctl::settings::Settings;
use footctl::store::{ConfigStore, FileStorage};

/// footctl - configuration core for a foot-operated MIDI switcher
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the settings file
    #[arg(short, long, default_value = "footctl.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Override the protocol listen address
    #[arg(long)]
    listen: Option<String>,

    /// Override the configuration image path
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Run a local protocol REPL instead of the TCP server
    #[arg(long)]
    repl: bool,
}

/// Store plus protocol handler behind one gate: every mutation path
/// goes through this lock, so adding concurrent input tasks later
/// cannot break the single-writer model.
struct Core {
    store: ConfigStore<FileStorage>,
    remote: RemoteHandler,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting footctl...");

    let settings = load_settings(&args.config)?;

    let storage_path = args
        .storage
        .clone()
        .unwrap_or_else(|| settings.resolve_storage_path());
    info!("Configuration image: {}", storage_path.display());

    let mut store = ConfigStore::new(FileStorage::new(storage_path));
    store
        .begin()
        .context("failed to initialize the configuration store")?;
    info!(active_banks = store.active_banks(), "store ready");

    let core = Arc::new(Mutex::new(Core {
        store,
        remote: RemoteHandler::new(settings.device_id.clone()),
    }));

    if args.repl {
        run_repl(core).await
    } else {
        let listen = args.listen.unwrap_or_else(|| settings.listen.clone());
        run_server(core, &listen).await
    }
}

fn load_settings(path: &str) -> Result<Settings> {
    let path = std::path::Path::new(path);
    if path.exists() {
        let settings = Settings::load(path)?;
        info!("Settings loaded from {}", path.display());
        Ok(settings)
    } else {
        info!("No settings file at {}, using defaults", path.display());
        Ok(Settings::default())
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

/// Response queue for the TCP path: lines and pacing pauses are
/// collected while the core lock is held, then written out with real
/// sleeps once the lock is released.
#[derive(Default)]
struct PacedOutput {
    items: Vec<OutItem>,
}

enum OutItem {
    Line(String),
    Pause(Duration),
}

impl ResponseSink for PacedOutput {
    fn send_line(&mut self, line: &str) {
        self.items.push(OutItem::Line(line.to_string()));
    }

    fn pace(&mut self, delay: Duration) {
        self.items.push(OutItem::Pause(delay));
    }
}

async fn run_server(core: Arc<Mutex<Core>>, listen: &str) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!("Remote protocol listening on {listen}");

    // One client at a time: concurrent multi-client access is out of
    // contract, so a second editor simply waits its turn.
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Editor connected: {peer}");
        if let Err(e) = serve_client(&core, stream).await {
            warn!("client session ended with error: {e}");
        }
        info!("Editor disconnected: {peer}");
    }
}

async fn serve_client(core: &Arc<Mutex<Core>>, mut stream: TcpStream) -> Result<()> {
    let mut buf = [0u8; 256];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        let mut out = PacedOutput::default();
        {
            let mut core = core.lock().await;
            let Core { store, remote } = &mut *core;
            remote.update(store, &buf[..n], &mut out);
        }

        for item in out.items {
            match item {
                OutItem::Line(line) => {
                    stream.write_all(line.as_bytes()).await?;
                    stream.write_all(b"\r\n").await?;
                }
                OutItem::Pause(delay) => tokio::time::sleep(delay).await,
            }
        }
        stream.flush().await?;
    }
}

/// Local line-at-a-time protocol console.
async fn run_repl(core: Arc<Mutex<Core>>) -> Result<()> {
    let mut rl = rustyline::DefaultEditor::new()?;
    info!("Protocol REPL ready; 'exit' to quit");

    loop {
        let readline = rl.readline("footctl> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "exit" || trimmed == "quit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed).ok();

                let mut bytes = trimmed.as_bytes().to_vec();
                bytes.push(b'\n');

                let mut out = PacedOutput::default();
                {
                    let mut core = core.lock().await;
                    let Core { store, remote } = &mut *core;
                    remote.update(store, &bytes, &mut out);
                }
                for item in out.items {
                    if let OutItem::Line(line) = item {
                        println!("{line}");
                    }
                }
            }
            Err(_) => break,
        }
    }

    Ok(())
}
