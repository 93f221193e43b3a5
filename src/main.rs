use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emucd::config::{self, LedsConfig};
use emucd::console::{self, Console};
use emucd::controller::{Command, ModeController};
use emucd::exec::{CommandRunner, SystemCommandRunner};
use emucd::gadget::GadgetDriver;
use emucd::indicator::{BlinkLed, GpioLed, Indicator, NullLed};
use emucd::input::ButtonMonitor;
use emucd::store::MountManager;
use emucd::update::UpdateService;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// emucd command line arguments
#[derive(Parser, Debug)]
#[command(name = "emucd")]
#[command(version, about = "Switchable USB CD-ROM / image store gadget", long_about = None)]
struct CliArgs {
    /// Path to the configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backing store block device (overrides config)
    #[arg(long, value_name = "DEVICE")]
    store_device: Option<String>,

    /// Image store mount point (overrides config)
    #[arg(long, value_name = "DIR")]
    mount_point: Option<String>,

    /// Disable installing updates from the image store
    #[arg(long)]
    no_update: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    console::print_version();
    tracing::info!("Starting emucd v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load(args.config.as_deref())?;
    if let Some(device) = args.store_device {
        config.store.device = device;
    }
    if let Some(mount_point) = args.mount_point {
        config.store.mount_point = mount_point;
    }
    if args.no_update {
        config.update.enabled = false;
    }
    tracing::info!(
        "Image store: {} at {}",
        config.store.device,
        config.store.mount_point
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());

    let indicator = build_indicator(&config.leds);
    let driver = GadgetDriver::new(runner.clone());
    let mount = MountManager::new(
        runner.clone(),
        &config.store.device,
        config.store.mount_point_path(),
    );
    let exe_path = std::env::current_exe()?;
    let update = UpdateService::new(config.update.clone(), exe_path, runner.clone());

    let (controller, mode_rx) = ModeController::new(
        config.store.clone(),
        driver,
        mount,
        update,
        indicator,
        runner.clone(),
    );

    // Every input source funnels into this one queue; the controller
    // consumes it a command at a time.
    let (command_tx, command_rx) = mpsc::channel::<Command>(16);

    if config.button.enabled {
        match ButtonMonitor::spawn(config.button.clone(), command_tx.clone()) {
            Ok(_) => {}
            Err(e) => tracing::warn!("running without the hardware button: {}", e),
        }
    } else {
        tracing::info!("hardware button disabled in configuration");
    }

    tokio::spawn(Console::new(command_tx.clone(), mode_rx).run());

    {
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                let _ = command_tx.send(Command::Exit).await;
            }
        });
    }
    drop(command_tx);

    controller.run(command_rx).await?;

    tracing::info!("emucd exited");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "emucd=error",
        LogLevel::Warn => "emucd=warn",
        LogLevel::Info => "emucd=info",
        LogLevel::Debug => "emucd=debug",
        LogLevel::Trace => "emucd=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

/// Open the indicator LEDs, degrading to no-ops when the GPIO is unavailable.
fn build_indicator(config: &LedsConfig) -> Indicator {
    if !config.enabled {
        tracing::info!("indicator LEDs disabled in configuration");
        return Indicator::new(Arc::new(NullLed), Arc::new(NullLed));
    }
    let mode = open_led(config, config.mode_pin, "emucd-led-mode");
    let activity = open_led(config, config.activity_pin, "emucd-led-act");
    Indicator::new(mode, activity)
}

fn open_led(config: &LedsConfig, pin: u32, consumer: &'static str) -> Arc<dyn BlinkLed> {
    match GpioLed::open(&config.gpio_chip, pin, consumer) {
        Ok(led) => Arc::new(led),
        Err(e) => {
            tracing::warn!(
                "LED on {} pin {} unavailable: {}",
                config.gpio_chip,
                pin,
                e
            );
            Arc::new(NullLed)
        }
    }
}
