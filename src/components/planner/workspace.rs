use super::editor::EventForm;
use crate::components::calendar::{CalendarEvent, ExportReport};
use crate::components::generator::RequestKind;
use crate::error::{planner_error, AppResult, Error};
use chrono_tz::Tz;
use std::collections::HashSet;

/// Lifecycle of the generation/interpretation request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading {
        kind: RequestKind,
    },
    Succeeded {
        kind: RequestKind,
        events: usize,
    },
    Failed {
        kind: RequestKind,
        message: String,
    },
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading { .. })
    }
}

/// Point-in-time copy of the workspace, handed out to callers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkspaceView {
    pub events: Vec<CalendarEvent>,
    /// Id of the saved schedule the working list came from or was saved as
    pub active_schedule: Option<String>,
    /// Index of the event being edited
    pub editing: Option<usize>,
    pub pending_delete: Option<String>,
    pub request: RequestState,
    /// Working list differs from the last generated/loaded snapshot
    pub modified: bool,
    /// Events of the working list already exported
    pub exported: usize,
}

/// The working schedule and everything the user is doing with it
#[derive(Debug, Default)]
pub struct Workspace {
    events: Vec<CalendarEvent>,
    snapshot: Vec<CalendarEvent>,
    active_schedule: Option<String>,
    editing: Option<usize>,
    pending_delete: Option<String>,
    request: RequestState,
    exported: HashSet<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn request(&self) -> &RequestState {
        &self.request
    }

    pub fn active_schedule(&self) -> Option<&str> {
        self.active_schedule.as_deref()
    }

    pub fn exported(&self) -> &HashSet<String> {
        &self.exported
    }

    pub fn view(&self) -> WorkspaceView {
        WorkspaceView {
            events: self.events.clone(),
            active_schedule: self.active_schedule.clone(),
            editing: self.editing,
            pending_delete: self.pending_delete.clone(),
            request: self.request.clone(),
            modified: self.events != self.snapshot,
            exported: self
                .events
                .iter()
                .filter(|e| self.exported.contains(&e.export_id()))
                .count(),
        }
    }

    /// Mark a request as in flight; only one may run at a time
    pub fn begin_request(&mut self, kind: RequestKind) -> AppResult<()> {
        if self.request.is_loading() {
            return Err(Error::Busy);
        }
        self.request = RequestState::Loading { kind };
        Ok(())
    }

    /// Working-list changes are refused while a request is in flight, so its
    /// result never lands on top of them
    pub fn ensure_idle(&self) -> AppResult<()> {
        if self.request.is_loading() {
            return Err(Error::Busy);
        }
        Ok(())
    }

    /// Record the end of the in-flight request.
    ///
    /// Success replaces the working list; failure leaves it untouched.
    pub fn finish_request(
        &mut self,
        kind: RequestKind,
        result: AppResult<Vec<CalendarEvent>>,
    ) -> AppResult<Vec<CalendarEvent>> {
        match result {
            Ok(events) => {
                self.request = RequestState::Succeeded {
                    kind,
                    events: events.len(),
                };
                self.replace(events.clone(), None);
                Ok(events)
            }
            Err(e) => {
                self.request = RequestState::Failed {
                    kind,
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Working list now mirrors a saved schedule
    pub fn load(&mut self, id: &str, events: Vec<CalendarEvent>) -> AppResult<()> {
        self.ensure_idle()?;
        self.replace(events, Some(id.to_string()));
        Ok(())
    }

    /// The working list was saved under `id`
    pub fn mark_saved(&mut self, id: &str) {
        self.active_schedule = Some(id.to_string());
    }

    fn replace(&mut self, events: Vec<CalendarEvent>, active: Option<String>) {
        self.snapshot = events.clone();
        self.events = events;
        self.active_schedule = active;
        self.editing = None;
        self.exported.clear();
    }

    /// Open an event for editing
    pub fn begin_edit(&mut self, index: usize) -> AppResult<EventForm> {
        self.ensure_idle()?;
        let event = self
            .events
            .get(index)
            .ok_or_else(|| planner_error(&format!("No event at position {}", index + 1)))?;
        self.editing = Some(index);
        Ok(EventForm::from_event(event))
    }

    /// Validate the form and replace the edited event.
    ///
    /// On a validation failure the edit stays open and the event is unchanged.
    pub fn submit_edit(&mut self, form: &EventForm, tz: Tz) -> AppResult<CalendarEvent> {
        self.ensure_idle()?;
        let index = self
            .editing
            .ok_or_else(|| planner_error("No event is being edited"))?;

        if index >= self.events.len() {
            self.editing = None;
            return Err(planner_error(&format!("No event at position {}", index + 1)));
        }

        let event = form.validate(tz)?;
        self.events[index] = event.clone();
        self.editing = None;
        Ok(event)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Throw away edits, going back to the last generated or loaded list
    pub fn discard(&mut self) -> AppResult<Vec<CalendarEvent>> {
        self.ensure_idle()?;
        self.events = self.snapshot.clone();
        self.editing = None;
        Ok(self.events.clone())
    }

    /// First step of deleting a saved schedule
    pub fn request_delete(&mut self, id: &str) {
        self.pending_delete = Some(id.to_string());
    }

    /// Take the pending delete request, if any
    pub fn take_pending_delete(&mut self) -> Option<String> {
        self.pending_delete.take()
    }

    /// Drop the pending delete request; true if there was one
    pub fn cancel_delete(&mut self) -> bool {
        self.pending_delete.take().is_some()
    }

    /// A saved schedule is gone; clear the working list if it was showing it
    pub fn schedule_deleted(&mut self, id: &str) {
        if self.active_schedule.as_deref() == Some(id) {
            self.replace(Vec::new(), None);
        }
    }

    /// Remember which events made it into the calendar
    pub fn record_exports(&mut self, report: &ExportReport) {
        for result in &report.results {
            if result.outcome.is_success() {
                self.exported.insert(result.event.export_id());
            }
        }
    }
}
