//! The coordination daemon: loads settings, wires the engine components
//! together, and polls the dispatch backend until shut down.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;

use haul_api::{DispatchApi, HttpDispatchApi};
use haul_engine::{
    LiveSessionRegistry, NotificationDispatcher, RefreshCadences, RefreshScheduler,
    ScheduleCoordinator, SchedulerDeps, TaskStore,
};
use haul_settings::HaulSettings;
use haul_telemetry::TelemetryConfig;

#[derive(Parser)]
#[command(name = "haul", about = "Fleet coordination daemon for waste-collection operations")]
struct Cli {
    /// Settings file (defaults to ~/.haul/settings.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Driver id override.
    #[arg(long)]
    driver: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings: HaulSettings = match &cli.config {
        Some(path) => haul_settings::load_settings_from_path(path)?,
        None => haul_settings::load_settings()?,
    };
    if let Some(driver) = cli.driver {
        settings.api.driver_id = driver;
    }

    haul_telemetry::init_telemetry(&TelemetryConfig {
        log_level: settings.telemetry.log_level.clone(),
        module_levels: Vec::new(),
        json_output: settings.telemetry.json_logs || cli.json_logs,
    });

    tracing::info!("starting haul coordination daemon");

    let token = settings
        .api
        .token
        .clone()
        .context("no API token configured; set HAUL_API_TOKEN or api.token in the settings file")?;
    if settings.api.driver_id.is_empty() {
        anyhow::bail!("no driver id configured; set HAUL_DRIVER_ID or pass --driver");
    }

    let api: Arc<dyn DispatchApi> = Arc::new(HttpDispatchApi::new(
        settings.api.base_url.clone(),
        SecretString::from(token),
    ));
    tracing::info!(base_url = %settings.api.base_url, driver = %settings.api.driver_id, "dispatch client ready");

    let notifications = Arc::new(NotificationDispatcher::new(api.clone()));
    let tasks = Arc::new(TaskStore::new(api.clone(), notifications.clone()));
    let live = Arc::new(LiveSessionRegistry::new());
    let schedules = Arc::new(ScheduleCoordinator::new(tasks.clone()));

    let scheduler = RefreshScheduler::start(
        SchedulerDeps {
            api,
            tasks,
            live,
            schedules,
            notifications,
            driver_id: settings.api.driver_id.clone(),
        },
        RefreshCadences {
            location: Duration::from_secs(settings.refresh.location_secs),
            live: Duration::from_secs(settings.refresh.live_secs),
            schedule: Duration::from_secs(settings.refresh.schedule_secs),
            dashboard: Duration::from_secs(settings.refresh.dashboard_secs),
        },
    );

    let cancel = scheduler.cancel_token();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl+c")?;
            tracing::info!("shutdown signal received");
        }
        () = cancel.cancelled() => {}
    }

    let auth_failed = scheduler.auth_failed();
    scheduler.shutdown().await;
    if auth_failed {
        anyhow::bail!("session expired; re-authenticate and restart");
    }
    Ok(())
}
