//! # Proximity Alarm Application Entry Point
//!
//! This binary crate provisions the hardware (or the simulated rig), starts
//! the sampling scheduler and waits for a shutdown signal. It supports both
//! production mode (GPIO, I2C ADC and LCD on a Raspberry Pi) and development
//! mode (`--stdout`, simulated sensors with console output).

// Test modules
#[cfg(test)]
mod tests;

#[cfg(all(target_os = "linux", feature = "hardware"))]
mod gpio_rppal;
mod hardware;
#[cfg(all(target_os = "linux", feature = "hardware"))]
mod i2c_rppal;

use anyhow::Context;
use proximity_alarm_lib::config::{Config, CONFIG_FILE};
use proximity_alarm_lib::scheduler::SamplingScheduler;
use proximity_alarm_lib::sim;
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line options. Kept to plain flags, like the rest of the tooling
/// on the Pi image.
#[derive(Debug, Default, PartialEq)]
struct Options {
    /// Simulated rig with console output instead of real hardware
    development_mode: bool,
    /// Write the default configuration file and exit
    init_config: bool,
    config_path: Option<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdout" => options.development_mode = true,
            "--init-config" => options.init_config = true,
            "--config" => {
                let path = args.next().context("--config needs a file path")?;
                options.config_path = Some(path);
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }
    Ok(options)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve on Ctrl-C, SIGTERM (systemd stop) or an internal cancellation.
async fn wait_for_shutdown(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("interrupt received"),
                    _ = sigterm.recv() => info!("terminate received"),
                    _ = cancel.cancelled() => {}
                }
                return;
            }
            Err(e) => tracing::warn!("cannot listen for SIGTERM: {}", e),
        }
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = cancel.cancelled() => {}
    }
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    init_logging();

    let options = parse_args(env::args().skip(1))?;
    let config_path = options.config_path.as_deref().unwrap_or(CONFIG_FILE);

    if options.init_config {
        Config::default().save(config_path)?;
        return Ok(());
    }

    let config = Config::load_from_path(config_path);
    config.validate().context("invalid configuration")?;

    // Provision before any activity starts: a missing ADC or LCD is fatal
    let rig = if options.development_mode {
        info!("development mode: simulated sensors, console display");
        sim::rig(&config)
    } else {
        hardware::hardware::provision(&config).context("hardware provisioning failed")?
    };

    // Multi-threaded runtime: ranging and display block worker threads
    let rt = tokio::runtime::Runtime::new()?;
    let stats = rt.block_on(async {
        let scheduler = SamplingScheduler::start(&config, rig);
        wait_for_shutdown(scheduler.cancel_token()).await;
        scheduler.shutdown().await
    });

    info!(
        cycles = stats.cycles,
        display_ticks = stats.display_ticks,
        "exited cleanly"
    );
    Ok(())
}
