use super::exporter::{CalendarExporter, ExportStatus};
use super::models::CalendarEvent;
use super::http_client;
use super::token::TokenManager;
use crate::error::{export_error, AppResult};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

/// Google Calendar REST API root
pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Exporter that inserts events into a Google Calendar
#[derive(Clone)]
pub struct GoogleCalendarExporter {
    calendar_id: String,
    timezone: String,
    token_manager: TokenManager,
    client: Client,
    api_base: String,
}

impl GoogleCalendarExporter {
    pub fn new(
        calendar_id: String,
        timezone: String,
        token_manager: TokenManager,
    ) -> AppResult<Self> {
        Ok(Self {
            calendar_id,
            timezone,
            token_manager,
            client: http_client()?,
            api_base: GOOGLE_CALENDAR_API.to_string(),
        })
    }

    /// Point the exporter at another API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// `POST` target for inserting events
    pub fn events_url(&self) -> AppResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| export_error(&format!("Failed to parse URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| export_error("Calendar API URL cannot have a path"))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);

        Ok(url)
    }

    /// URL of a single event
    pub fn event_url(&self, event_id: &str) -> AppResult<Url> {
        let mut url = self.events_url()?;
        url.path_segments_mut()
            .map_err(|_| export_error("Calendar API URL cannot have a path"))?
            .push(event_id);
        Ok(url)
    }

    /// Request body for one event
    pub fn event_body(&self, event: &CalendarEvent) -> Value {
        json!({
            "id": event.export_id(),
            "summary": event.summary,
            "start": { "dateTime": event.start_time, "timeZone": self.timezone },
            "end": { "dateTime": event.end_time, "timeZone": self.timezone },
        })
    }

    /// Handle a 409 on insert.
    ///
    /// Google keeps deleted events as `cancelled` and their ids stay taken, so
    /// a conflicting event is fetched and brought back if it was deleted.
    async fn resolve_conflict(
        &self,
        event: &CalendarEvent,
        access_token: &str,
    ) -> AppResult<ExportStatus> {
        let url = self.event_url(&event.export_id())?;

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| export_error(&format!("Failed to fetch existing event: {}", e)))?;
        let existing: Value = checked(response, "Failed to fetch existing event")
            .await?
            .json()
            .await
            .map_err(|e| export_error(&format!("Failed to parse existing event: {}", e)))?;

        if existing["status"] != "cancelled" {
            info!("Event '{}' already exists in the calendar", event.summary);
            return Ok(ExportStatus::AlreadyExists);
        }

        let mut body = self.event_body(event);
        body["status"] = json!("confirmed");

        let response = self
            .client
            .put(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| export_error(&format!("Failed to restore event: {}", e)))?;
        checked(response, "Failed to restore event").await?;

        info!("Restored deleted calendar event '{}'", event.summary);
        Ok(ExportStatus::Created)
    }
}

/// Turn a non-success response into an error carrying its body
async fn checked(response: Response, context: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response".to_string());
    Err(export_error(&format!(
        "{}: HTTP {} - {}",
        context, status, error_body
    )))
}

#[async_trait]
impl CalendarExporter for GoogleCalendarExporter {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn create_event(&self, event: &CalendarEvent) -> AppResult<ExportStatus> {
        let access_token = self.token_manager.get_access_token().await?;
        let url = self.events_url()?;

        debug!("Inserting event '{}' into {}", event.summary, self.calendar_id);

        let response = self
            .client
            .post(url)
            .bearer_auth(&access_token)
            .json(&self.event_body(event))
            .send()
            .await
            .map_err(|e| export_error(&format!("Failed to create event: {}", e)))?;

        // The id is derived from the event contents, so a conflict means it was exported before
        if response.status() == StatusCode::CONFLICT {
            return self.resolve_conflict(event, &access_token).await;
        }

        checked(response, "Failed to create event").await?;

        info!("Created calendar event '{}'", event.summary);
        Ok(ExportStatus::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::calendar::StoredToken;
    use std::io::Read;
    use std::thread::{self, JoinHandle};

    fn exporter(calendar_id: &str) -> GoogleCalendarExporter {
        let token_manager =
            TokenManager::new("unused.json", String::new(), String::new()).unwrap();
        GoogleCalendarExporter::new(
            calendar_id.to_string(),
            "Europe/Helsinki".to_string(),
            token_manager,
        )
        .unwrap()
    }

    fn gym() -> CalendarEvent {
        CalendarEvent::new(
            "Gym",
            "2024-03-18T18:00:00+02:00",
            "2024-03-18T19:00:00+02:00",
        )
    }

    /// A request seen by the fake calendar API
    struct Seen {
        method: String,
        url: String,
        body: String,
    }

    /// Serve the given `(status, body)` replies in order, one per request
    fn fake_api(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Seen>>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, reply) in replies {
                let mut request = server.recv().unwrap();
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).unwrap();
                seen.push(Seen {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body,
                });
                let response = tiny_http::Response::from_string(reply).with_status_code(status);
                request.respond(response).unwrap();
            }
            seen
        });

        (format!("http://{}/", addr), handle)
    }

    async fn exporter_for(api_base: &str) -> (tempfile::TempDir, GoogleCalendarExporter) {
        let dir = tempfile::tempdir().unwrap();
        let token_manager =
            TokenManager::new(dir.path().join("token.json"), String::new(), String::new())
                .unwrap();
        token_manager
            .set_token(StoredToken {
                access_token: "test-token".to_string(),
                refresh_token: None,
                expires_at: chrono::Utc::now().timestamp() + 3600,
            })
            .await
            .unwrap();

        let exporter = GoogleCalendarExporter::new(
            "primary".to_string(),
            "Europe/Helsinki".to_string(),
            token_manager,
        )
        .unwrap()
        .with_api_base(api_base);
        (dir, exporter)
    }

    #[test]
    fn test_events_url_encodes_calendar_id() {
        let url = exporter("team calendar@group.calendar.google.com")
            .events_url()
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team%20calendar@group.calendar.google.com/events"
        );

        let url = exporter("primary")
            .with_api_base("http://localhost:8080/api/")
            .events_url()
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/calendars/primary/events");

        let url = exporter("primary").event_url("abc123").unwrap();
        assert!(url.as_str().ends_with("/calendars/primary/events/abc123"));
    }

    #[test]
    fn test_event_body() {
        let event = gym();
        let body = exporter("primary").event_body(&event);

        assert_eq!(body["id"], event.export_id());
        assert_eq!(body["summary"], "Gym");
        assert_eq!(body["start"]["dateTime"], "2024-03-18T18:00:00+02:00");
        assert_eq!(body["end"]["timeZone"], "Europe/Helsinki");
    }

    #[tokio::test]
    async fn test_insert_creates_event() {
        let (base, server) = fake_api(vec![(200, "{}")]);
        let (_dir, exporter) = exporter_for(&base).await;

        let status = exporter.create_event(&gym()).await.unwrap();
        assert_eq!(status, ExportStatus::Created);

        let seen = server.join().unwrap();
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].url, "/calendars/primary/events");
    }

    #[tokio::test]
    async fn test_conflict_with_live_event_is_already_exported() {
        let (base, server) = fake_api(vec![(409, "{}"), (200, r#"{"status":"confirmed"}"#)]);
        let (_dir, exporter) = exporter_for(&base).await;

        let status = exporter.create_event(&gym()).await.unwrap();
        assert_eq!(status, ExportStatus::AlreadyExists);

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].method, "GET");
    }

    #[tokio::test]
    async fn test_conflict_with_deleted_event_restores_it() {
        let event = gym();
        let (base, server) = fake_api(vec![
            (409, "{}"),
            (200, r#"{"status":"cancelled"}"#),
            (200, "{}"),
        ]);
        let (_dir, exporter) = exporter_for(&base).await;

        let status = exporter.create_event(&event).await.unwrap();
        assert_eq!(status, ExportStatus::Created);

        let seen = server.join().unwrap();
        assert_eq!(seen[2].method, "PUT");
        assert_eq!(
            seen[2].url,
            format!("/calendars/primary/events/{}", event.export_id())
        );
        let body: Value = serde_json::from_str(&seen[2].body).unwrap();
        assert_eq!(body["status"], "confirmed");
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let (base, server) = fake_api(vec![(500, "backend error")]);
        let (_dir, exporter) = exporter_for(&base).await;

        let err = exporter.create_event(&gym()).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
        server.join().unwrap();
    }
}
