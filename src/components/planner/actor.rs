use super::editor::EventForm;
use super::workspace::{Workspace, WorkspaceView};
use crate::components::calendar::{export_events, CalendarEvent, CalendarExporter, ExportReport};
use crate::components::generator::{RequestKind, ScheduleGenerator};
use crate::components::store::{Schedule, ScheduleStore};
use crate::error::{planner_error, AppResult, Error};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The planner actor that owns the working schedule and the store
pub struct PlannerActor {
    workspace: Workspace,
    store: ScheduleStore,
    generator: ScheduleGenerator,
    exporter: Arc<dyn CalendarExporter>,
    request_timeout: Duration,
    inflight: Option<CancellationToken>,
    exporting: bool,
    command_rx: mpsc::Receiver<PlannerCommand>,
    // Weak so the mailbox closes once every handle is gone
    completion_tx: mpsc::WeakSender<PlannerCommand>,
}

/// Commands that can be sent to the planner actor
pub enum PlannerCommand {
    Request(RequestKind, String, mpsc::Sender<AppResult<Vec<CalendarEvent>>>),
    RequestFinished {
        kind: RequestKind,
        result: AppResult<Vec<CalendarEvent>>,
        response_tx: mpsc::Sender<AppResult<Vec<CalendarEvent>>>,
    },
    Cancel(mpsc::Sender<bool>),
    State(mpsc::Sender<WorkspaceView>),
    BeginEdit(usize, mpsc::Sender<AppResult<EventForm>>),
    SubmitEdit(EventForm, mpsc::Sender<AppResult<CalendarEvent>>),
    CancelEdit(mpsc::Sender<()>),
    Discard(mpsc::Sender<AppResult<Vec<CalendarEvent>>>),
    Save(String, mpsc::Sender<AppResult<String>>),
    Load(String, mpsc::Sender<AppResult<Vec<CalendarEvent>>>),
    List(mpsc::Sender<Vec<Schedule>>),
    GetSchedule(String, mpsc::Sender<AppResult<Schedule>>),
    RequestDelete(String, mpsc::Sender<AppResult<Schedule>>),
    ConfirmDelete(mpsc::Sender<AppResult<Schedule>>),
    CancelDelete(mpsc::Sender<bool>),
    Export(mpsc::Sender<AppResult<ExportReport>>),
    ExportFinished {
        report: ExportReport,
        response_tx: mpsc::Sender<AppResult<ExportReport>>,
    },
    Shutdown,
}

/// Handle for communicating with the planner actor
#[derive(Clone)]
pub struct PlannerActorHandle {
    command_tx: mpsc::Sender<PlannerCommand>,
}

impl PlannerActorHandle {
    /// Send a command and wait for its reply
    async fn ask<T>(
        &self,
        make_command: impl FnOnce(mpsc::Sender<T>) -> PlannerCommand,
    ) -> AppResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(make_command(response_tx))
            .await
            .map_err(|e| planner_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| planner_error("Response channel closed"))
    }

    /// Run a generation or interpretation request and wait for its result
    pub async fn request(
        &self,
        kind: RequestKind,
        input: impl Into<String>,
    ) -> AppResult<Vec<CalendarEvent>> {
        let input = input.into();
        self.ask(|tx| PlannerCommand::Request(kind, input, tx)).await?
    }

    pub async fn cancel(&self) -> AppResult<bool> {
        self.ask(PlannerCommand::Cancel).await
    }

    pub async fn state(&self) -> AppResult<WorkspaceView> {
        self.ask(PlannerCommand::State).await
    }

    pub async fn begin_edit(&self, index: usize) -> AppResult<EventForm> {
        self.ask(|tx| PlannerCommand::BeginEdit(index, tx)).await?
    }

    pub async fn submit_edit(&self, form: EventForm) -> AppResult<CalendarEvent> {
        self.ask(|tx| PlannerCommand::SubmitEdit(form, tx)).await?
    }

    pub async fn cancel_edit(&self) -> AppResult<()> {
        self.ask(PlannerCommand::CancelEdit).await
    }

    pub async fn discard(&self) -> AppResult<Vec<CalendarEvent>> {
        self.ask(PlannerCommand::Discard).await?
    }

    pub async fn save(&self, name: impl Into<String>) -> AppResult<String> {
        let name = name.into();
        self.ask(|tx| PlannerCommand::Save(name, tx)).await?
    }

    pub async fn load(&self, id: impl Into<String>) -> AppResult<Vec<CalendarEvent>> {
        let id = id.into();
        self.ask(|tx| PlannerCommand::Load(id, tx)).await?
    }

    pub async fn list(&self) -> AppResult<Vec<Schedule>> {
        self.ask(PlannerCommand::List).await
    }

    pub async fn get_schedule(&self, id: impl Into<String>) -> AppResult<Schedule> {
        let id = id.into();
        self.ask(|tx| PlannerCommand::GetSchedule(id, tx)).await?
    }

    pub async fn request_delete(&self, id: impl Into<String>) -> AppResult<Schedule> {
        let id = id.into();
        self.ask(|tx| PlannerCommand::RequestDelete(id, tx)).await?
    }

    pub async fn confirm_delete(&self) -> AppResult<Schedule> {
        self.ask(PlannerCommand::ConfirmDelete).await?
    }

    pub async fn cancel_delete(&self) -> AppResult<bool> {
        self.ask(PlannerCommand::CancelDelete).await
    }

    pub async fn export(&self) -> AppResult<ExportReport> {
        self.ask(PlannerCommand::Export).await?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(PlannerCommand::Shutdown).await;
        Ok(())
    }
}

impl PlannerActor {
    /// Create a new actor and return its handle
    pub fn new(
        store: ScheduleStore,
        generator: ScheduleGenerator,
        exporter: Arc<dyn CalendarExporter>,
        request_timeout: Duration,
    ) -> (Self, PlannerActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            workspace: Workspace::new(),
            store,
            generator,
            exporter,
            request_timeout,
            inflight: None,
            exporting: false,
            command_rx,
            completion_tx: command_tx.downgrade(),
        };

        let handle = PlannerActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Planner actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                PlannerCommand::Request(kind, input, response_tx) => {
                    self.start_request(kind, input, response_tx).await;
                }
                PlannerCommand::RequestFinished {
                    kind,
                    result,
                    response_tx,
                } => {
                    self.inflight = None;
                    let result = self.workspace.finish_request(kind, result);
                    if let Err(e) = &result {
                        warn!("Schedule {} failed: {}", kind, e);
                    }
                    let _ = response_tx.send(result).await;
                }
                PlannerCommand::Cancel(response_tx) => {
                    let cancelled = match self.inflight.take() {
                        Some(token) => {
                            info!("Cancelling in-flight request");
                            token.cancel();
                            true
                        }
                        None => false,
                    };
                    let _ = response_tx.send(cancelled).await;
                }
                PlannerCommand::State(response_tx) => {
                    let _ = response_tx.send(self.workspace.view()).await;
                }
                PlannerCommand::BeginEdit(index, response_tx) => {
                    let _ = response_tx.send(self.workspace.begin_edit(index)).await;
                }
                PlannerCommand::SubmitEdit(form, response_tx) => {
                    let result = self
                        .workspace
                        .submit_edit(&form, self.generator.timezone());
                    let _ = response_tx.send(result).await;
                }
                PlannerCommand::CancelEdit(response_tx) => {
                    self.workspace.cancel_edit();
                    let _ = response_tx.send(()).await;
                }
                PlannerCommand::Discard(response_tx) => {
                    let _ = response_tx.send(self.workspace.discard()).await;
                }
                PlannerCommand::Save(name, response_tx) => {
                    let _ = response_tx.send(self.save(&name)).await;
                }
                PlannerCommand::Load(id, response_tx) => {
                    let _ = response_tx.send(self.load(&id)).await;
                }
                PlannerCommand::List(response_tx) => {
                    let _ = response_tx.send(self.store.list().to_vec()).await;
                }
                PlannerCommand::GetSchedule(id, response_tx) => {
                    let result = self.store.get(&id).cloned();
                    let _ = response_tx.send(result).await;
                }
                PlannerCommand::RequestDelete(id, response_tx) => {
                    let _ = response_tx.send(self.request_delete(&id)).await;
                }
                PlannerCommand::ConfirmDelete(response_tx) => {
                    let _ = response_tx.send(self.confirm_delete()).await;
                }
                PlannerCommand::CancelDelete(response_tx) => {
                    let _ = response_tx.send(self.workspace.cancel_delete()).await;
                }
                PlannerCommand::Export(response_tx) => {
                    if let Err(e) = self.start_export(response_tx.clone()) {
                        let _ = response_tx.send(Err(e)).await;
                    }
                }
                PlannerCommand::ExportFinished {
                    report,
                    response_tx,
                } => {
                    self.exporting = false;
                    self.workspace.record_exports(&report);
                    info!(
                        "Export finished: {} created, {} already exported, {} failed",
                        report.created(),
                        report.already_exported(),
                        report.failed()
                    );
                    let _ = response_tx.send(Ok(report)).await;
                }
                PlannerCommand::Shutdown => {
                    info!("Planner actor shutting down");
                    if let Some(token) = self.inflight.take() {
                        token.cancel();
                    }
                    break;
                }
            }
        }

        info!("Planner actor shut down");
    }

    /// Spawn the model request so the mailbox stays responsive while it runs
    async fn start_request(
        &mut self,
        kind: RequestKind,
        input: String,
        response_tx: mpsc::Sender<AppResult<Vec<CalendarEvent>>>,
    ) {
        if let Err(e) = self.workspace.begin_request(kind) {
            info!("Ignoring schedule {} request: {}", kind, e);
            let _ = response_tx.send(Err(e)).await;
            return;
        }

        let Some(completion_tx) = self.completion_tx.upgrade() else {
            let result = self
                .workspace
                .finish_request(kind, Err(planner_error("Planner is shutting down")));
            let _ = response_tx.send(result).await;
            return;
        };

        let token = CancellationToken::new();
        self.inflight = Some(token.clone());

        let generator = self.generator.clone();
        let timeout = self.request_timeout;

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(Error::Cancelled),
                outcome = tokio::time::timeout(timeout, generator.run(kind, &input)) => {
                    match outcome {
                        Ok(result) => result,
                        Err(_) => Err(Error::Timeout(timeout.as_secs())),
                    }
                }
            };

            let _ = completion_tx
                .send(PlannerCommand::RequestFinished {
                    kind,
                    result,
                    response_tx,
                })
                .await;
        });
    }

    fn save(&mut self, name: &str) -> AppResult<String> {
        let events = self.workspace.events().to_vec();
        if events.is_empty() {
            return Err(planner_error("There are no events to save"));
        }

        let id = self.store.save(name, events)?;
        self.workspace.mark_saved(&id);
        Ok(id)
    }

    fn load(&mut self, id: &str) -> AppResult<Vec<CalendarEvent>> {
        self.workspace.ensure_idle()?;
        let events = self.store.load(id)?;
        self.workspace.load(id, events.clone())?;
        Ok(events)
    }

    fn request_delete(&mut self, id: &str) -> AppResult<Schedule> {
        let schedule = self.store.get(id)?.clone();
        self.workspace.request_delete(id);
        Ok(schedule)
    }

    fn confirm_delete(&mut self) -> AppResult<Schedule> {
        // Deleting may clear the working list
        self.workspace.ensure_idle()?;

        let id = self
            .workspace
            .take_pending_delete()
            .ok_or_else(|| planner_error("No delete is waiting for confirmation"))?;

        let removed = self.store.delete(&id)?;
        self.workspace.schedule_deleted(&id);
        Ok(removed)
    }

    /// Spawn the export so slow calendar calls never block the mailbox
    fn start_export(
        &mut self,
        response_tx: mpsc::Sender<AppResult<ExportReport>>,
    ) -> AppResult<()> {
        if self.exporting {
            return Err(Error::Busy);
        }

        let events = self.workspace.events().to_vec();
        if events.is_empty() {
            return Err(planner_error("There are no events to export"));
        }

        let completion_tx = self
            .completion_tx
            .upgrade()
            .ok_or_else(|| planner_error("Planner is shutting down"))?;

        let exporter = self.exporter.clone();
        let exported = self.workspace.exported().clone();
        self.exporting = true;

        tokio::spawn(async move {
            let report = export_events(exporter.as_ref(), &events, &exported).await;
            let _ = completion_tx
                .send(PlannerCommand::ExportFinished {
                    report,
                    response_tx,
                })
                .await;
        });

        Ok(())
    }
}
