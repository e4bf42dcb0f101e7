use super::actor::{PlannerActor, PlannerActorHandle};
use super::editor::EventForm;
use super::workspace::WorkspaceView;
use crate::components::calendar::{CalendarEvent, CalendarExporter, ExportReport};
use crate::components::generator::{RequestKind, ScheduleGenerator};
use crate::components::store::{Schedule, ScheduleStore};
use crate::error::AppResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle for interacting with the planner actor
#[derive(Clone)]
pub struct PlannerHandle {
    actor_handle: PlannerActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl PlannerHandle {
    /// Create a new PlannerHandle and spawn the actor
    pub fn new(
        store: ScheduleStore,
        generator: ScheduleGenerator,
        exporter: Arc<dyn CalendarExporter>,
        request_timeout: Duration,
    ) -> Self {
        // Create the actor and get its handle
        let (mut actor, handle) = PlannerActor::new(store, generator, exporter, request_timeout);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Generate events from a free-text prompt
    pub async fn generate(&self, prompt: impl Into<String>) -> AppResult<Vec<CalendarEvent>> {
        self.actor_handle.request(RequestKind::Generate, prompt).await
    }

    /// Interpret shorthand schedule notation into events
    pub async fn interpret(&self, schedule_text: impl Into<String>) -> AppResult<Vec<CalendarEvent>> {
        self.actor_handle.request(RequestKind::Interpret, schedule_text).await
    }

    /// Abort the in-flight request; false when nothing was running
    pub async fn cancel(&self) -> AppResult<bool> {
        self.actor_handle.cancel().await
    }

    /// Copy of the current working state
    pub async fn state(&self) -> AppResult<WorkspaceView> {
        self.actor_handle.state().await
    }

    /// Open the event at `index` for editing
    pub async fn begin_edit(&self, index: usize) -> AppResult<EventForm> {
        self.actor_handle.begin_edit(index).await
    }

    /// Validate and apply the open edit
    pub async fn submit_edit(&self, form: EventForm) -> AppResult<CalendarEvent> {
        self.actor_handle.submit_edit(form).await
    }

    pub async fn cancel_edit(&self) -> AppResult<()> {
        self.actor_handle.cancel_edit().await
    }

    /// Restore the last generated or loaded events
    pub async fn discard(&self) -> AppResult<Vec<CalendarEvent>> {
        self.actor_handle.discard().await
    }

    /// Save the working events under a name
    pub async fn save(&self, name: impl Into<String>) -> AppResult<String> {
        self.actor_handle.save(name).await
    }

    /// Load a saved schedule into the working list
    pub async fn load(&self, id: impl Into<String>) -> AppResult<Vec<CalendarEvent>> {
        self.actor_handle.load(id).await
    }

    /// All saved schedules
    pub async fn list(&self) -> AppResult<Vec<Schedule>> {
        self.actor_handle.list().await
    }

    pub async fn get_schedule(&self, id: impl Into<String>) -> AppResult<Schedule> {
        self.actor_handle.get_schedule(id).await
    }

    /// Ask to delete a saved schedule; nothing is removed until confirmed
    pub async fn request_delete(&self, id: impl Into<String>) -> AppResult<Schedule> {
        self.actor_handle.request_delete(id).await
    }

    pub async fn confirm_delete(&self) -> AppResult<Schedule> {
        self.actor_handle.confirm_delete().await
    }

    pub async fn cancel_delete(&self) -> AppResult<bool> {
        self.actor_handle.cancel_delete().await
    }

    /// Export the working events to the calendar
    pub async fn export(&self) -> AppResult<ExportReport> {
        self.actor_handle.export().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        self.actor_handle.shutdown().await
    }
}
