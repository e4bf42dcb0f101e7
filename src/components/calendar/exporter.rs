use super::models::CalendarEvent;
use crate::error::AppResult;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{info, warn};

/// What the calendar service did with one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Created,
    /// The service already holds an event with the same export id
    AlreadyExists,
}

/// Backend that receives exported events
#[async_trait]
pub trait CalendarExporter: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Create one event in the external calendar
    async fn create_event(&self, event: &CalendarEvent) -> AppResult<ExportStatus>;
}

/// Exporter that only logs the event and reports success
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExporter;

#[async_trait]
impl CalendarExporter for LoggingExporter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn create_event(&self, event: &CalendarEvent) -> AppResult<ExportStatus> {
        info!(
            "Creating calendar event: {} ({} - {})",
            event.summary, event.start_time, event.end_time
        );
        Ok(ExportStatus::Created)
    }
}

/// Result of exporting a single event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Created,
    AlreadyExported,
    Failed(String),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExportOutcome::Failed(_))
    }
}

/// Export result for one position of the working list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventExport {
    pub index: usize,
    pub event: CalendarEvent,
    pub outcome: ExportOutcome,
}

/// Per-event results of one export action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub results: Vec<EventExport>,
}

impl ExportReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ExportOutcome::Created))
    }

    pub fn already_exported(&self) -> usize {
        self.count(|o| matches!(o, ExportOutcome::AlreadyExported))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ExportOutcome::Failed(_)))
    }

    /// True when every event ended up in the calendar
    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&ExportOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Export every event, one call each.
///
/// Events whose export id is in `already_exported` are not sent again. A
/// failing event never stops the others; its error ends up in the report.
pub async fn export_events(
    exporter: &dyn CalendarExporter,
    events: &[CalendarEvent],
    already_exported: &HashSet<String>,
) -> ExportReport {
    info!(
        "Exporting {} events with the {} exporter",
        events.len(),
        exporter.name()
    );

    let attempts = events.iter().enumerate().map(|(index, event)| async move {
        let outcome = if already_exported.contains(&event.export_id()) {
            ExportOutcome::AlreadyExported
        } else {
            match exporter.create_event(event).await {
                Ok(ExportStatus::Created) => ExportOutcome::Created,
                Ok(ExportStatus::AlreadyExists) => ExportOutcome::AlreadyExported,
                Err(e) => {
                    warn!("Failed to export event '{}': {}", event.summary, e);
                    ExportOutcome::Failed(e.to_string())
                }
            }
        };

        EventExport {
            index,
            event: event.clone(),
            outcome,
        }
    });

    ExportReport {
        results: join_all(attempts).await,
    }
}
