//! Live telemetry from one device.
//!
//! Demonstrates:
//! - Building a client from an origin and a JWT
//! - Watching time-series keys through a reactive subscription
//! - Reading connection status and buffered samples
//!
//! Usage:
//!   TB_ORIGIN=https://iot.example.com TB_TOKEN=eyJ... \
//!     cargo run --example live_telemetry -- <device-id> temperature humidity
//!   cargo run --example live_telemetry -- <device-id> temperature --debug

// ============================================================================
// Imports
// ============================================================================

use anyhow::{Context, bail};
use thingsboard_telemetry::{EntityRef, TelemetryClient, TokenStore};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    device: String,
    keys: Vec<String>,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut debug = false;
        let mut positional = Vec::new();
        for arg in std::env::args().skip(1) {
            if arg == "--debug" {
                debug = true;
            } else {
                positional.push(arg);
            }
        }

        let mut positional = positional.into_iter();
        let Some(device) = positional.next() else {
            bail!("usage: live_telemetry <device-id> <key>... [--debug]");
        };
        let keys: Vec<String> = positional.collect();
        if keys.is_empty() {
            bail!("at least one telemetry key is required");
        }

        Ok(Self {
            debug,
            device,
            keys,
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse()?;
    init_logging(args.debug);

    let origin = std::env::var("TB_ORIGIN").context("TB_ORIGIN is not set")?;
    let token = std::env::var("TB_TOKEN").context("TB_TOKEN is not set")?;

    println!("=== Live Telemetry ===\n");
    println!("    Origin: {origin}");
    println!("    Device: {}", args.device);
    println!("    Keys:   {}\n", args.keys.join(", "));

    let client = TelemetryClient::builder()
        .origin(origin)
        .token_provider(TokenStore::with_token(token))
        .build()?;

    let params = client.timeseries(EntityRef::device(args.device), args.keys.clone());
    let mut sub = client.watch(params);

    println!("Press Ctrl+C to exit...\n");

    loop {
        tokio::select! {
            changed = sub.changed() => changed?,
            _ = tokio::signal::ctrl_c() => break,
        }

        if sub.reconnect_exhausted() {
            println!("[!] Gave up reconnecting");
            break;
        }

        let data = sub.data();
        for key in &args.keys {
            match data.latest(key) {
                Some(point) => println!("    {key:<16} {:<12} @ {}", point.value, point.ts),
                None => println!("    {key:<16} -"),
            }
        }
        println!("    connected: {}\n", sub.connected());
    }

    drop(sub);
    client.disconnect();
    println!("✓ Done");
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "thingsboard_telemetry=debug"
    } else {
        "thingsboard_telemetry=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
