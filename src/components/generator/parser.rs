use super::prompts::GeneratedSchedule;
use crate::components::calendar::CalendarEvent;
use crate::error::{generation_error, AppResult};
use crate::utils::time::{parse_iso8601, to_iso8601};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde_json::from_str;
use tracing::{debug, error};

/// JSON layout the model was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// `{ "events": [...] }`
    EventsObject,
    /// `[...]`
    EventArray,
}

/// Parse and validate a model reply into events.
///
/// Fails when no JSON of the requested shape can be found, when the list is
/// empty, or when any event has a blank summary, an unparseable time, or ends
/// before it starts. Accepted times come back as RFC 3339 with an offset.
pub fn parse_events(response: &str, shape: OutputShape, tz: Tz) -> AppResult<Vec<CalendarEvent>> {
    let events = match shape {
        OutputShape::EventsObject => {
            extract_json::<GeneratedSchedule>(response, '{', '}')?.events
        }
        OutputShape::EventArray => extract_json::<Vec<CalendarEvent>>(response, '[', ']')?,
    };

    if events.is_empty() {
        return Err(generation_error("The model returned no events"));
    }

    events
        .into_iter()
        .enumerate()
        .map(|(index, event)| validate_event(index, event, tz))
        .collect()
}

/// Find the outermost `open..close` span and deserialize it, then fall back
/// to the whole reply
fn extract_json<T: DeserializeOwned>(response: &str, open: char, close: char) -> AppResult<T> {
    if let (Some(start), Some(end)) = (response.find(open), response.rfind(close)) {
        if start < end {
            let json_str = &response[start..=end];
            match from_str::<T>(json_str) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("Failed to parse JSON span from response: {}", e);
                }
            }
        }
    }

    match from_str::<T>(response.trim()) {
        Ok(value) => Ok(value),
        Err(e) => {
            error!("Could not extract valid JSON from response: {}", response);
            Err(generation_error(&format!(
                "Could not extract valid JSON from the model response: {}",
                e
            )))
        }
    }
}

fn validate_event(index: usize, event: CalendarEvent, tz: Tz) -> AppResult<CalendarEvent> {
    let position = index + 1;

    let summary = event.summary.trim();
    if summary.is_empty() {
        return Err(generation_error(&format!("Event {} has an empty summary", position)));
    }

    let start = parse_iso8601(&event.start_time, tz).ok_or_else(|| {
        generation_error(&format!(
            "Event {} has an invalid startTime: {}",
            position, event.start_time
        ))
    })?;
    let end = parse_iso8601(&event.end_time, tz).ok_or_else(|| {
        generation_error(&format!(
            "Event {} has an invalid endTime: {}",
            position, event.end_time
        ))
    })?;

    if end < start {
        return Err(generation_error(&format!(
            "Event {} ends before it starts ({} > {})",
            position, event.start_time, event.end_time
        )));
    }

    Ok(CalendarEvent::new(summary, to_iso8601(&start), to_iso8601(&end)))
}
