use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single calendar entry, serialized with the camelCase keys the model
/// is asked to produce
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// The title or summary of the event.
    pub summary: String,
    /// The start time of the event in ISO 8601 format (e.g., '2024-03-15T09:00:00-07:00').
    pub start_time: String,
    /// The end time of the event in ISO 8601 format (e.g., '2024-03-15T10:00:00-07:00').
    pub end_time: String,
}

impl CalendarEvent {
    pub fn new(
        summary: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Stable identifier derived from the event contents.
    ///
    /// 32 lowercase hex characters, which is a valid client-supplied Google
    /// Calendar event id, so exporting the same event twice hits the same id.
    pub fn export_id(&self) -> String {
        let key = format!(
            "scheduleai\u{1f}{}\u{1f}{}\u{1f}{}",
            self.summary, self.start_time, self.end_time
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
            .simple()
            .to_string()
    }
}
