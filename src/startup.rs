use crate::components::calendar::exporter_from_config;
use crate::components::generator::{CompletionModel, GeminiModel, ScheduleGenerator, UnavailableModel};
use crate::components::store::{FileBackend, ScheduleStore};
use crate::components::PlannerHandle;
use crate::config::Config;
use crate::error::{AppResult, Error};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rig=warn,reqwest=warn")),
        )
        // Keep stdout for command output
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config and apply the locale
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => {
            crate::utils::i18n::set_locale(&config.locale);
            info!("Setting locale to {}", config.locale);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Build the completion model, falling back to one that explains why
/// generation is unavailable
pub fn build_model(config: &Config) -> Arc<dyn CompletionModel> {
    match GeminiModel::from_config(config) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            warn!("Schedule generation disabled: {}", e);
            Arc::new(UnavailableModel::new(e.to_string()))
        }
    }
}

/// Wire store, generator and exporter into a running planner
pub fn start_planner(config: &Config) -> AppResult<PlannerHandle> {
    let backend = FileBackend::new(config.data_dir.clone());
    let store = ScheduleStore::open(Box::new(backend), &config.profile)?;

    let generator = ScheduleGenerator::new(build_model(config), config.tz()?);
    let exporter = exporter_from_config(config)?;

    info!("Starting planner");
    Ok(PlannerHandle::new(
        store,
        generator,
        exporter,
        Duration::from_secs(config.request_timeout_secs),
    ))
}
