use crate::error::{config_error, AppResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Default Gemini model used for schedule generation
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default location of the optional TOML config file
pub const DEFAULT_CONFIG_FILE: &str = "config/scheduleai.toml";

/// Which backend receives exported events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportBackend {
    /// Log the event and report success without contacting any service
    #[default]
    Log,
    /// Insert the event into Google Calendar
    Google,
}

impl FromStr for ExportBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "stub" => Ok(ExportBackend::Log),
            "google" => Ok(ExportBackend::Google),
            other => Err(format!("Unknown export backend: {}", other)),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key
    pub gemini_api_key: String,
    /// Gemini model name
    pub gemini_model: String,
    /// Sampling temperature for the model
    pub temperature: f64,
    /// Upper bound for a single model request
    pub request_timeout_secs: u64,
    /// IANA timezone used to resolve relative dates and offset-less times
    pub timezone: String,
    /// Directory holding the schedule store and the calendar token
    pub data_dir: PathBuf,
    /// Storage profile, scopes the saved schedules
    pub profile: String,
    /// Locale for user-facing messages
    pub locale: String,
    /// Export backend
    pub export_backend: ExportBackend,
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Google Calendar ID that receives exported events
    pub google_calendar_id: String,
    /// Where the Google OAuth token is kept
    pub google_token_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 0.2,
            request_timeout_secs: 60,
            timezone: "UTC".to_string(),
            google_token_path: data_dir.join("google_token.json"),
            data_dir,
            profile: "default".to_string(),
            locale: "en".to_string(),
            export_backend: ExportBackend::Log,
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_calendar_id: "primary".to_string(),
        }
    }
}

/// Values accepted from the TOML config file; anything left out keeps its
/// environment or default value
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    gemini_model: Option<String>,
    temperature: Option<f64>,
    request_timeout_secs: Option<u64>,
    timezone: Option<String>,
    data_dir: Option<PathBuf>,
    profile: Option<String>,
    locale: Option<String>,
    export_backend: Option<ExportBackend>,
    google_calendar_id: Option<String>,
    google_token_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Config::default();

        if let Ok(key) = env::var("GEMINI_API_KEY") {
            config.gemini_api_key = key;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout
                .parse::<u64>()
                .map_err(|_| config_error("Invalid REQUEST_TIMEOUT_SECS format"))?;
        }
        if let Ok(tz) = env::var("TIMEZONE") {
            config.timezone = tz;
        }
        let data_dir_from_env = env::var("SCHEDULEAI_DATA_DIR").ok().map(PathBuf::from);
        if let Some(dir) = &data_dir_from_env {
            config.data_dir = dir.clone();
        }
        if let Ok(profile) = env::var("SCHEDULEAI_PROFILE") {
            config.profile = profile;
        }
        if let Ok(locale) = env::var("SCHEDULEAI_LOCALE") {
            config.locale = locale;
        }
        if let Ok(backend) = env::var("EXPORT_BACKEND") {
            config.export_backend = backend.parse().map_err(|e: String| config_error(&e))?;
        }
        if let Ok(id) = env::var("GOOGLE_CLIENT_ID") {
            config.google_client_id = id;
        }
        if let Ok(secret) = env::var("GOOGLE_CLIENT_SECRET") {
            config.google_client_secret = secret;
        }
        if let Ok(calendar_id) = env::var("GOOGLE_CALENDAR_ID") {
            config.google_calendar_id = calendar_id;
        }
        let token_path_from_env = env::var("GOOGLE_TOKEN_PATH").ok().map(PathBuf::from);

        // Merge values from the config file
        let config_path =
            env::var("SCHEDULEAI_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut token_path_from_file = None;
        if let Ok(content) = fs::read_to_string(&config_path) {
            let file_config: FileConfig = toml::from_str(&content)?;
            token_path_from_file = file_config.google_token_path.clone();
            config.merge_file(file_config);
        }

        // The token lives next to the store unless placed explicitly
        config.google_token_path = token_path_from_env
            .or(token_path_from_file)
            .unwrap_or_else(|| config.data_dir.join("google_token.json"));

        config.validate()?;
        Ok(config)
    }

    fn merge_file(&mut self, file: FileConfig) {
        if let Some(model) = file.gemini_model {
            self.gemini_model = model;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(timeout) = file.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(tz) = file.timezone {
            self.timezone = tz;
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(profile) = file.profile {
            self.profile = profile;
        }
        if let Some(locale) = file.locale {
            self.locale = locale;
        }
        if let Some(backend) = file.export_backend {
            self.export_backend = backend;
        }
        if let Some(calendar_id) = file.google_calendar_id {
            self.google_calendar_id = calendar_id;
        }
    }

    /// Check values that would otherwise fail much later
    pub fn validate(&self) -> AppResult<()> {
        self.tz()?;
        if self.request_timeout_secs == 0 {
            return Err(config_error("request_timeout_secs must be greater than zero"));
        }
        if self.profile.trim().is_empty() {
            return Err(config_error("profile must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(config_error("temperature must be between 0.0 and 2.0"));
        }
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> AppResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", self.timezone)))
    }
}
