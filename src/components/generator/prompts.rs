use crate::components::calendar::CalendarEvent;
use crate::error::AppResult;
use chrono::DateTime;
use chrono_tz::Tz;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

/// Reply shape expected from free-text generation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedSchedule {
    /// The generated schedule as an array of calendar events.
    pub events: Vec<CalendarEvent>,
}

const GENERATE_PREAMBLE: &str = "You are a personal assistant that can create a schedule based on user prompts.";

const INTERPRET_PREAMBLE: &str = "You are a scheduling assistant that converts human readable text into a structured JSON format that can be used to create calendar events.";

const CONTEXT_TEMPLATE: &str = "Current date and time: {now}
User timezone: {timezone}
Resolve relative dates and times (\"tomorrow\", \"next Friday\", \"at 6 PM\") against the current date and time in the user's timezone.
If no duration is given, make the event last one hour.
Write every startTime and endTime in ISO 8601 format with the UTC offset of the user's timezone (e.g., '2024-03-15T09:00:00-07:00').
Output ONLY raw JSON, no prose, markdown, or code fences. The JSON must validate against this JSON Schema:
{schema}";

const GENERATE_TEMPLATE: &str = "Create a detailed schedule based on the prompt below.
The output should be a JSON object with an \"events\" array of calendar events with the keys summary, startTime, and endTime.
The startTime and endTime should be in ISO 8601 format.
Prompt: {prompt}";

const INTERPRET_TEMPLATE: &str = "The schedule text is: {schedule_text}

Convert the schedule text into a JSON array of calendar events. Each element of the array should have a summary, startTime, and endTime field. The startTime and endTime fields should be in ISO 8601 format.
For recurring entries such as \"Mondays: Gym at 6 PM\", create one event on the next occurrence of that day.";

/// Preamble and user message for one model request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub preamble: String,
    pub prompt: String,
}

/// Prompt for turning a free-text request into `{ "events": [...] }`
pub fn generate_prompt(prompt: &str, now: DateTime<Tz>) -> AppResult<PromptPair> {
    let schema = serde_json::to_string_pretty(&schema_for!(GeneratedSchedule))?;
    Ok(PromptPair {
        preamble: preamble(GENERATE_PREAMBLE, now, &schema),
        prompt: GENERATE_TEMPLATE.replace("{prompt}", prompt),
    })
}

/// Prompt for turning shorthand schedule notation into a bare event array
pub fn interpret_prompt(schedule_text: &str, now: DateTime<Tz>) -> AppResult<PromptPair> {
    let schema = serde_json::to_string_pretty(&schema_for!(Vec<CalendarEvent>))?;
    Ok(PromptPair {
        preamble: preamble(INTERPRET_PREAMBLE, now, &schema),
        prompt: INTERPRET_TEMPLATE.replace("{schedule_text}", schedule_text),
    })
}

fn preamble(role: &str, now: DateTime<Tz>, schema: &str) -> String {
    let context = CONTEXT_TEMPLATE
        .replace("{now}", &now.format("%A %Y-%m-%dT%H:%M:%S%:z").to_string())
        .replace("{timezone}", now.timezone().name())
        .replace("{schema}", schema);
    format!("{}\n\n{}", role, context)
}
