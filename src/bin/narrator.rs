//! vt-narrator
//!
//! Connects to a terminal streaming host, follows one session and prints
//! each narration chunk to stdout as it is flushed. Logs go to stderr.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vt_narrator::accumulator::{ChannelSink, NarrationChunk};
use vt_narrator::streaming::{ConnectionState, StaticToken};
use vt_narrator::{NarrationSession, NarratorConfig, TransportClient};

#[derive(Parser, Debug)]
#[command(
    name = "vt-narrator",
    version,
    about = "Narrate new output from a remote terminal session"
)]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Streaming host WebSocket URL
    #[arg(long, env = "VT_NARRATOR_URL")]
    url: Option<String>,

    /// Bearer token for the host
    #[arg(long, env = "VT_NARRATOR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Session to follow
    #[arg(short, long, env = "VT_NARRATOR_SESSION")]
    session: Option<String>,

    /// Flush after this many new characters
    #[arg(long)]
    size_threshold: Option<usize>,

    /// Flush after pending content is this old (milliseconds)
    #[arg(long)]
    time_threshold_ms: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command line values win over the file
    fn apply(&self, config: &mut NarratorConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(session) = &self.session {
            config.session = Some(session.clone());
        }
        if let Some(size) = self.size_threshold {
            config.size_threshold = size;
        }
        if let Some(ms) = self.time_threshold_ms {
            config.time_threshold_ms = ms;
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn print_chunk(chunk: &NarrationChunk) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(chunk.text.as_bytes())?;
    out.flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => NarratorConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => NarratorConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid settings")?;
    let session_id = config
        .session
        .clone()
        .context("No session given (use --session or VT_NARRATOR_SESSION)")?;

    let client = TransportClient::with_token_provider(
        config.transport_config(),
        StaticToken::from(config.token.clone()),
    );
    client
        .connect()
        .with_context(|| format!("Cannot connect to {}", config.url))?;

    let (tx, mut chunks) = mpsc::unbounded_channel();
    let session = NarrationSession::attach(
        &client,
        session_id.clone(),
        config.accumulator_config(),
        ChannelSink(tx),
    );
    tracing::info!(session = %session_id, url = %config.url, "Narrating");

    let mut state = client.watch_state();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            chunk = chunks.recv() => match chunk {
                Some(chunk) => print_chunk(&chunk).context("Failed to write narration")?,
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                if *state.borrow() == ConnectionState::Disconnected {
                    tracing::warn!("Lost connection to {}, retrying", config.url);
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, flushing");
                break;
            }
        }
    }

    session.detach(&client).await;
    while let Some(chunk) = chunks.recv().await {
        print_chunk(&chunk).context("Failed to write narration")?;
    }
    client.disconnect().await;
    Ok(())
}
