use crate::components::calendar::CalendarEvent;
use serde::{Deserialize, Serialize};

/// A named, ordered collection of events saved by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Opaque random token
    pub id: String,
    pub name: String,
    pub events: Vec<CalendarEvent>,
    /// RFC 3339 timestamp of the save
    #[serde(default)]
    pub created_at: String,
}

impl Schedule {
    /// One-line description for lists
    pub fn describe(&self) -> String {
        let noun = if self.events.len() == 1 { "event" } else { "events" };
        format!("{} ({} {})", self.name, self.events.len(), noun)
    }
}
