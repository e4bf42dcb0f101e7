use crate::components::calendar::CalendarEvent;
use crate::error::ValidationErrors;
use crate::utils::time::{parse_iso8601, to_iso8601};
use chrono_tz::Tz;

/// Shortest accepted summary for a manually edited event
pub const MIN_SUMMARY_LEN: usize = 3;

/// Editable copy of an event's fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventForm {
    pub summary: String,
    pub start_time: String,
    pub end_time: String,
}

impl EventForm {
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

    pub fn from_event(event: &CalendarEvent) -> Self {
        Self::new(&event.summary, &event.start_time, &event.end_time)
    }

    /// Check every field and build the event.
    ///
    /// All failing fields are reported together. Times are normalized to
    /// RFC 3339; offset-less input is read in `tz`.
    pub fn validate(&self, tz: Tz) -> Result<CalendarEvent, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let summary = self.summary.trim();
        if summary.chars().count() < MIN_SUMMARY_LEN {
            errors.push(
                "summary",
                format!("must be at least {} characters", MIN_SUMMARY_LEN),
            );
        }

        let start = parse_iso8601(&self.start_time, tz);
        if start.is_none() {
            errors.push("startTime", "must be a valid ISO-8601 datetime");
        }

        let end = parse_iso8601(&self.end_time, tz);
        if end.is_none() {
            errors.push("endTime", "must be a valid ISO-8601 datetime");
        }

        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                errors.push("endTime", "must be after the start time");
            } else if errors.is_empty() {
                return Ok(CalendarEvent::new(summary, to_iso8601(&start), to_iso8601(&end)));
            }
        }

        Err(errors)
    }
}
