//! Frontend Input - input pump
//!
//! Enumerates controllers, keeps them bound to player slots and logs the
//! logical events they produce.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frontend_input::config::AppConfig;
use frontend_input::input::diagnostics::print_device_table;
use frontend_input::input::{
    CompactEvent, ControllerDb, DeviceWatcher, GilrsSource, InputListener, InputManager, MappingLibrary,
};
use frontend_input::paths::AppPaths;
use frontend_input::storage::SledStore;

/// Frontend Input - gamepad normalization and player-slot mapping
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: detected app directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Print player slots and detected devices, then exit
    #[arg(long)]
    list_devices: bool,

    /// Exchange two player slots (0-based) and exit
    #[arg(long, num_args = 2, value_names = ["A", "B"])]
    swap: Option<Vec<usize>>,
}

/// Logs every compact event on the pump
struct LogListener;

impl InputListener for LogListener {
    fn on_compact_event(&mut self, event: &CompactEvent) {
        info!("🎮 {}", event);
    }

    fn on_device_set_changed(&mut self, removed: bool) {
        if removed {
            info!("🔌 Device removed");
        } else {
            info!("🔌 Device set changed");
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let paths = match args.config.clone() {
        Some(config) => AppPaths::detect().with_config(config),
        None => AppPaths::detect(),
    };

    init_logging(&args.log_level)?;

    info!("Starting Frontend Input...");
    info!("Configuration file: {}", paths.config.display());

    let config = if paths.config.exists() {
        AppConfig::load(&paths.config).await?
    } else {
        warn!("⚠️  Config file not found, using defaults");
        AppConfig::default()
    };

    paths.ensure_directories()?;
    let store = SledStore::open(&paths.sled_db_path(&config))?;

    let library = MappingLibrary::load(paths.mappings_dir(&config))?;

    let controller_db = match &config.input.controller_db {
        Some(path) => ControllerDb::load(path).unwrap_or_else(|e| {
            warn!("⚠️  {:#}", e);
            ControllerDb::default()
        }),
        None => ControllerDb::default(),
    };

    let source = GilrsSource::new()?;
    let mut manager = InputManager::new(config.input_settings(), Box::new(source), Box::new(store))
        .with_library(library)
        .with_controller_db(controller_db);
    manager.add_listener(Box::new(LogListener));

    let report = manager.rebuild();
    debug!("Initial reconcile: {:?}", report);

    if args.list_devices {
        print_device_table(&manager);
        return Ok(());
    }

    if let Some(slots) = args.swap.as_deref() {
        if let [a, b] = slots {
            manager.swap_slots(*a, *b);
            info!("🔀 Swapped player slots {} and {}", a, b);
            print_device_table(&manager);
        }
        return Ok(());
    }

    let _watcher = match DeviceWatcher::new(&config.input.device_dir, manager.hotplug_flag()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("⚠️  Device watcher disabled: {:#}", e);
            None
        }
    };

    info!("✅ Input pump running ({} slots)", config.input.max_players);

    let mut interval = tokio::time::interval(Duration::from_millis(config.input.poll_interval_ms));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                manager.update();
            }
            _ = &mut shutdown => break,
        }
    }

    info!("Frontend Input stopped");
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
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
