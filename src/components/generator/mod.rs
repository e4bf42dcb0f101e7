mod model;
mod parser;
pub mod prompts;

pub use model::{CompletionModel, GeminiModel, UnavailableModel};
pub use parser::{parse_events, OutputShape};

use crate::components::calendar::CalendarEvent;
use crate::error::{generation_error, AppResult};
use crate::utils::time::now_in;
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The two ways of turning text into events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Free-text request ("plan a study week with two gym sessions")
    Generate,
    /// Shorthand schedule notation ("Mondays: Gym at 6 PM")
    Interpret,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Generate => write!(f, "generation"),
            RequestKind::Interpret => write!(f, "interpretation"),
        }
    }
}

/// Builds prompts, calls the completion model and validates its reply
#[derive(Clone)]
pub struct ScheduleGenerator {
    model: Arc<dyn CompletionModel>,
    tz: Tz,
}

impl ScheduleGenerator {
    pub fn new(model: Arc<dyn CompletionModel>, tz: Tz) -> Self {
        Self { model, tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Turn a free-text description into events
    pub async fn generate_from_prompt(&self, prompt: &str) -> AppResult<Vec<CalendarEvent>> {
        self.run(RequestKind::Generate, prompt).await
    }

    /// Turn shorthand schedule notation into events
    pub async fn interpret_text(&self, schedule_text: &str) -> AppResult<Vec<CalendarEvent>> {
        self.run(RequestKind::Interpret, schedule_text).await
    }

    /// One request of the given kind
    pub async fn run(&self, kind: RequestKind, input: &str) -> AppResult<Vec<CalendarEvent>> {
        let input = input.trim();
        if input.is_empty() {
            return Err(generation_error("Nothing to schedule: the input is empty"));
        }

        let now = now_in(self.tz);
        let (pair, shape) = match kind {
            RequestKind::Generate => (prompts::generate_prompt(input, now)?, OutputShape::EventsObject),
            RequestKind::Interpret => (prompts::interpret_prompt(input, now)?, OutputShape::EventArray),
        };

        info!("Requesting schedule {} from {}", kind, self.model.name());
        let response = self.model.complete(&pair.preamble, &pair.prompt).await?;

        let events = parse_events(&response, shape, self.tz)?;
        info!("Schedule {} produced {} events", kind, events.len());
        Ok(events)
    }
}
