//! Digimix surface - drive a mixer engine from an Akai MIDImix

use anyhow::Result;
use clap::Parser;
use digimix_surface::device::{self, MidiDevice};
use digimix_surface::event::Event;
use digimix_surface::{bind_mixer, AppConfig, FaderLaw, LoggingMixer, MidiMix};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Digimix control surface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting digimix surface v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if args.list_ports {
        // Port patterns are optional here: list even without a valid config
        let config = AppConfig::load(&args.config).await.ok();
        device::list_ports_formatted(config.as_ref().map(|c| &c.midi));
        return Ok(());
    }

    let config = AppConfig::load(&args.config).await?;
    info!("Configuration loaded successfully");

    run_app(config, shutdown_signal()).await?;

    info!("Digimix surface shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    let mut device = MidiDevice::new(&config.midi);
    let surface = MidiMix::new(&config.surface, device.output())?;

    let mixer = Arc::new(LoggingMixer::new("console"));
    bind_mixer(&surface, mixer.clone(), Arc::new(FaderLaw::default()));

    device.connect()?;
    if let Err(e) = surface.refresh_leds() {
        warn!("Failed to reset LEDs: {:#}", e);
    }

    let mut events = device
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("Event receiver already taken"))?;

    info!("Starting main event loop...");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(device_event) = maybe_event else {
                    error!("MIDI input closed");
                    break;
                };
                let event = Event::from(device_event.message);
                let handled = surface.dispatch(&event);
                debug!("{} -> {} handler(s)", event, handled);
            }
            _ = &mut shutdown => break,
        }
    }

    info!("Mixer received {} updates", mixer.execution_count());
    device.disconnect();
    Ok(())
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

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // Without a handler, keep running until the input closes
            error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
