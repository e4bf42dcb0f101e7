use super::http_client;
use crate::error::{export_error, AppResult};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Google OAuth token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth token as kept on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp after which the access token is no longer valid
    pub expires_at: i64,
}

impl StoredToken {
    /// Build a token from a Google token endpoint response.
    ///
    /// Refresh responses usually omit `refresh_token`; the previous one is kept then.
    pub fn from_oauth_response(response: &Value, previous_refresh: Option<String>) -> AppResult<Self> {
        let access_token = response
            .get("access_token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| export_error("Token response missing 'access_token' field"))?
            .to_string();

        let refresh_token = response
            .get("refresh_token")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .or(previous_refresh);

        let expires_in = response
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(3600);

        Ok(Self {
            access_token,
            refresh_token,
            expires_at: Utc::now().timestamp() + expires_in,
        })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now + EXPIRY_MARGIN_SECS
    }
}

/// Loads, caches and refreshes the Google Calendar token
#[derive(Clone)]
pub struct TokenManager {
    path: PathBuf,
    client_id: String,
    client_secret: String,
    client: Client,
    cached: Arc<Mutex<Option<StoredToken>>>,
}

impl TokenManager {
    pub fn new(
        path: impl Into<PathBuf>,
        client_id: String,
        client_secret: String,
    ) -> AppResult<Self> {
        Ok(Self {
            path: path.into(),
            client_id,
            client_secret,
            client: http_client()?,
            cached: Arc::new(Mutex::new(None)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a valid access token, refreshing it when expired
    pub async fn get_access_token(&self) -> AppResult<String> {
        // Held across the refresh so concurrent exports refresh only once
        let mut cached = self.cached.lock().await;

        let token = match cached.take() {
            Some(token) => token,
            None => self.read_token()?,
        };

        let token = if token.is_expired(Utc::now().timestamp()) {
            debug!("Google Calendar token expired, refreshing");
            self.refresh_token(&token).await?
        } else {
            token
        };

        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Store a token, replacing whatever was saved before
    pub async fn set_token(&self, token: StoredToken) -> AppResult<()> {
        self.write_token(&token)?;
        *self.cached.lock().await = Some(token);
        Ok(())
    }

    fn read_token(&self) -> AppResult<StoredToken> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            export_error(&format!(
                "No Google Calendar token at {} ({}). Run get_calendar_token first.",
                self.path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| export_error(&format!("Failed to parse token JSON: {}", e)))
    }

    fn write_token(&self, token: &StoredToken) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(token)?)?;
        Ok(())
    }

    /// Refresh an expired token
    async fn refresh_token(&self, token: &StoredToken) -> AppResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| export_error("Token expired and no refresh token is stored"))?;

        let params = [
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
            ("refresh_token", refresh_token.clone()),
            ("grant_type", "refresh_token".to_string()),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| export_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(export_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| export_error(&format!("Failed to parse token response: {}", e)))?;

        let new_token = StoredToken::from_oauth_response(&body, Some(refresh_token))?;
        self.write_token(&new_token)?;
        info!("Refreshed Google Calendar token");

        Ok(new_token)
    }
}
