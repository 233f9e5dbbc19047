//! device-control - executes cloud commands on an edge device

use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use device_common::Topics;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use device_control::app::{self, AppContext};
use device_control::application::services::{startup, worker};
use device_control::cli::{Cli, Command, SettingsArgs};
use device_control::infra::device_config::JsonDeviceStore;
use device_control::infra::mqtt::{self, BrokerEndpoint};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.command() == Command::Version {
        println!("device-control {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli.settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "device-control stopped");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, or append to `log_file` without colours. `RUST_LOG` sets the filter.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn run(args: &SettingsArgs) -> Result<()> {
    // 1. Load the device configuration. Without it there is no identity.
    let device = JsonDeviceStore::load_sync(&app::device_config_path(args))?;
    let settings = app::build_settings(args, &device);
    let topics = Topics::new(&device.servicecode, &device.projectcode, &device.assetcode);
    tracing::info!(
        asset = %device.assetcode,
        broker = %device.mqtturl,
        platform = ?settings.platform,
        "device-control starting"
    );

    // 2. Connect to the broker.
    let endpoint = BrokerEndpoint::parse(&device.mqtturl)?;
    let opts = mqtt::options(
        &endpoint,
        &format!("device-control-{}", device.assetcode),
        &app::broker_auth(args),
        &settings.paths.cert_dir,
    )?;
    let (publisher, mut pump) = mqtt::connect(opts, topics.request());
    pump.wait_connected().await?;

    // 3. Forward requests into the worker queue from here on; they wait
    //    there until startup is done.
    let (tx, rx) = mpsc::unbounded_channel();
    let mut pump_task = tokio::spawn(pump.run(tx));

    let host = AppContext::new(
        settings,
        topics,
        Duration::from_secs(args.command_timeout_secs),
        publisher,
    )?;

    // 4. Reboot reply, runtime info, base venv.
    startup::prepare(&host).await?;

    // 5. Serve commands until the broker connection fails.
    tokio::select! {
        joined = &mut pump_task => {
            joined.context("broker task panicked")??;
            anyhow::bail!("broker event loop ended")
        }
        () = worker::run(&host, rx) => anyhow::bail!("command worker stopped"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::info!("received shutdown signal");
            Ok(())
        }
    }
}
