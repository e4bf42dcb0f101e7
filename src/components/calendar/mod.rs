mod exporter;
pub mod google;
pub mod models;
pub mod token;

pub use exporter::{
    export_events, CalendarExporter, EventExport, ExportOutcome, ExportReport, ExportStatus,
    LoggingExporter,
};
pub use google::GoogleCalendarExporter;
pub use models::CalendarEvent;
pub use token::{StoredToken, TokenManager};

use crate::config::{Config, ExportBackend};
use crate::error::{config_error, export_error, AppResult};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Upper bound for one Google API call
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client shared by the Google token and calendar calls
pub fn http_client() -> AppResult<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| export_error(&format!("Failed to build HTTP client: {}", e)))
}

/// Build the exporter selected in the config
pub fn exporter_from_config(config: &Config) -> AppResult<Arc<dyn CalendarExporter>> {
    match config.export_backend {
        ExportBackend::Log => {
            info!("Calendar export only logs events");
            Ok(Arc::new(LoggingExporter))
        }
        ExportBackend::Google => {
            if config.google_client_id.is_empty() || config.google_client_secret.is_empty() {
                return Err(config_error(
                    "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET are required for the google export backend",
                ));
            }

            let token_manager = TokenManager::new(
                config.google_token_path.clone(),
                config.google_client_id.clone(),
                config.google_client_secret.clone(),
            )?;

            info!(
                "Calendar export goes to Google Calendar {}",
                config.google_calendar_id
            );
            Ok(Arc::new(GoogleCalendarExporter::new(
                config.google_calendar_id.clone(),
                config.timezone.clone(),
                token_manager,
            )?))
        }
    }
}
