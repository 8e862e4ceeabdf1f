//! Line-oriented status console for the trackwatch core.
//!
//! Wires settings into the channel manager, monitors, and query bridge,
//! then prints a status line per tick. This is the minimal presentation
//! collaborator: it only reads snapshots and issues "send query" and
//! "request immediate refresh" commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trackwatch::channel::{ChannelManager, ConnectionPhase, ConnectionState, QueryContext};
use trackwatch::config::Settings;
use trackwatch::query::{QueryBridge, QueryEvent};
use trackwatch::telemetry::TelemetryMonitor;
use trackwatch::tracking::TrackingMonitor;

#[derive(Parser, Debug)]
#[command(name = "trackwatch")]
#[command(about = "Status console for a remote tracking sensor")]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend address (host:port), overriding the settings file
    #[arg(short, long)]
    address: Option<String>,

    /// Send one query once connected and print the reply
    #[arg(short, long)]
    query: Option<String>,

    /// Ask the backend for an immediate telemetry publish once connected
    #[arg(long)]
    refresh: bool,

    /// Status line interval in milliseconds
    #[arg(long, default_value = "1000")]
    interval: u64,

    /// CPU warning threshold (percent)
    #[arg(long)]
    cpu_warn: Option<f64>,

    /// CPU critical threshold (percent)
    #[arg(long)]
    cpu_crit: Option<f64>,

    /// Memory warning threshold (percent)
    #[arg(long)]
    memory_warn: Option<f64>,

    /// Memory critical threshold (percent)
    #[arg(long)]
    memory_crit: Option<f64>,

    /// Temperature warning threshold (celsius)
    #[arg(long)]
    temp_warn: Option<f64>,

    /// Temperature critical threshold (celsius)
    #[arg(long)]
    temp_crit: Option<f64>,
}

fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(address) = &args.address {
        settings.base_address = address.clone();
    }
    if let Some(v) = args.cpu_warn {
        settings.thresholds.cpu_warning = v;
    }
    if let Some(v) = args.cpu_crit {
        settings.thresholds.cpu_critical = v;
    }
    if let Some(v) = args.memory_warn {
        settings.thresholds.memory_warning = v;
    }
    if let Some(v) = args.memory_crit {
        settings.thresholds.memory_critical = v;
    }
    if let Some(v) = args.temp_warn {
        settings.thresholds.temperature_warning = v;
    }
    if let Some(v) = args.temp_crit {
        settings.thresholds.temperature_critical = v;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.interval > 0, "interval must be non-zero");

    let mut settings = Settings::load(args.config.as_deref())?;
    apply_overrides(&mut settings, &args);
    settings.validate()?;

    run(settings, args).await
}

async fn run(settings: Settings, args: Args) -> Result<()> {
    let manager = Arc::new(ChannelManager::new(settings.channel_config()));
    let mut tracking = TrackingMonitor::new(&manager, settings.geometry());
    let mut telemetry =
        TelemetryMonitor::spawn(settings.telemetry_config(), settings.health_thresholds());
    let mut bridge = QueryBridge::new(manager.clone(), settings.query_grace());

    info!(url = %settings.channel_url(), "connecting");
    manager.connect();

    let mut query_to_send = args.query;
    let mut refresh_requested = args.refresh;

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tracking.poll();
                telemetry.poll();
                for event in bridge.poll() {
                    match event {
                        QueryEvent::Reply(reply) => println!("reply: {}", reply.text),
                        QueryEvent::Alert(alert) => {
                            println!("alert [{}]: {}", alert.severity, alert.message)
                        }
                        QueryEvent::Failed { reason } => println!("query failed: {}", reason),
                    }
                }

                let state = manager.current_state();
                if state.connected {
                    if refresh_requested {
                        refresh_requested = false;
                        telemetry.refresh_now();
                        if let Err(e) = manager.request_telemetry() {
                            warn!(error = %e, "refresh request not sent");
                        }
                    }
                    if let Some(text) = query_to_send.take() {
                        let context = tracking
                            .snapshot()
                            .map(|s| QueryContext {
                                active_entity_count: s.active_count,
                                fps: s.fps,
                            })
                            .unwrap_or_default();
                        match bridge.submit(&text, context) {
                            Ok(()) => info!(query = %text, "query submitted"),
                            Err(e) => {
                                warn!(error = %e, "query not submitted, will retry");
                                query_to_send = Some(text);
                            }
                        }
                    }
                }

                print_status(&state, &tracking, &telemetry);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    manager.disconnect();
    Ok(())
}

fn print_status(state: &ConnectionState, tracking: &TrackingMonitor, telemetry: &TelemetryMonitor) {
    let stream = match tracking.snapshot() {
        Some(s) => format!("fps {:.1} active {}", s.fps, s.active_count),
        None => "no tracking data".to_string(),
    };

    let device = match telemetry.device() {
        Some(d) => format!(
            "cpu {:.0}% mem {:.0}% temp {:.0}C up {}",
            d.cpu_percent,
            d.memory_percent,
            d.temperature_c,
            telemetry.uptime_label().unwrap_or_default()
        ),
        None => "no telemetry".to_string(),
    };

    let containers = match telemetry.data() {
        Some(d) => format!(" containers {}/{}", d.running_containers(), d.containers.len()),
        None => String::new(),
    };

    let poll_note = telemetry
        .last_error()
        .map(|e| format!(" (poll: {})", e))
        .unwrap_or_default();

    println!(
        "[{}] {} | {} {}{}{}",
        state.phase.symbol(),
        stream,
        telemetry.health().symbol(),
        device,
        containers,
        poll_note
    );

    // Exhausted retries read differently from a transient drop: nothing will
    // happen until the operator restarts or reconnects.
    if state.phase == ConnectionPhase::GaveUp {
        eprintln!(
            "channel gave up after {} failed attempts: {}",
            state.reconnect_attempts,
            state.last_error.as_deref().unwrap_or("unknown error")
        );
    }
}
