use async_trait::async_trait;
use scheduleai::components::calendar::{CalendarEvent, CalendarExporter, ExportStatus};
use scheduleai::components::generator::{CompletionModel, ScheduleGenerator};
use scheduleai::components::planner::{EventForm, RequestState};
use scheduleai::components::store::{MemoryBackend, ScheduleStore};
use scheduleai::components::PlannerHandle;
use scheduleai::error::{export_error, generation_error, AppResult, Error};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const GYM_REPLY: &str = r#"[{"summary":"Gym","startTime":"2024-03-18T18:00:00Z","endTime":"2024-03-18T19:00:00Z"}]"#;

const WEEK_REPLY: &str = r#"```json
{"events": [
  {"summary": "Gym", "startTime": "2024-03-18T18:00:00+00:00", "endTime": "2024-03-18T19:00:00+00:00"},
  {"summary": "Yoga", "startTime": "2024-03-19T19:00:00+00:00", "endTime": "2024-03-19T20:00:00+00:00"}
]}
```"#;

/// Completion model replaying canned replies, optionally after a delay
struct ScriptedModel {
    replies: Mutex<VecDeque<AppResult<String>>>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(replies: Vec<AppResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn replying(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    fn slow(reply: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::replying(reply)
        }
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _preamble: &str, prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(generation_error("no scripted reply left")))
    }
}

/// Exporter failing every event whose summary is in `failing`
struct FlakyExporter {
    failing: Vec<&'static str>,
    calls: AtomicUsize,
}

impl FlakyExporter {
    fn new(failing: Vec<&'static str>) -> Self {
        Self {
            failing,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CalendarExporter for FlakyExporter {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn create_event(&self, event: &CalendarEvent) -> AppResult<ExportStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&event.summary.as_str()) {
            Err(export_error("calendar rejected the event"))
        } else {
            Ok(ExportStatus::Created)
        }
    }
}

fn planner_with(
    model: Arc<ScriptedModel>,
    exporter: Arc<FlakyExporter>,
    timeout: Duration,
) -> PlannerHandle {
    let store = ScheduleStore::open(Box::new(MemoryBackend::new()), "test").unwrap();
    let generator = ScheduleGenerator::new(model, chrono_tz::UTC);
    PlannerHandle::new(store, generator, exporter, timeout)
}

fn planner(model: ScriptedModel) -> PlannerHandle {
    planner_with(
        Arc::new(model),
        Arc::new(FlakyExporter::new(Vec::new())),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_interpret_gym_at_six_pm() {
    let model = Arc::new(ScriptedModel::replying(GYM_REPLY));
    let planner = planner_with(
        model.clone(),
        Arc::new(FlakyExporter::new(Vec::new())),
        Duration::from_secs(5),
    );

    let events = planner.interpret("Mondays: Gym at 6 PM").await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].summary, "Gym");
    assert_eq!(events[0].start_time, "2024-03-18T18:00:00+00:00");
    assert_eq!(events[0].end_time, "2024-03-18T19:00:00+00:00");

    let prompts = model.prompts.lock().unwrap().clone();
    assert!(prompts[0].contains("Mondays: Gym at 6 PM"));

    let view = planner.state().await.unwrap();
    assert_eq!(view.events, events);
    assert_eq!(
        view.request,
        RequestState::Succeeded {
            kind: scheduleai::components::generator::RequestKind::Interpret,
            events: 1
        }
    );
}

#[tokio::test]
async fn test_generate_accepts_fenced_reply() {
    let planner = planner(ScriptedModel::replying(WEEK_REPLY));

    let events = planner.generate("A week with gym and yoga").await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].summary, "Yoga");
}

#[tokio::test]
async fn test_failed_generation_keeps_working_list() {
    let planner = planner(ScriptedModel::new(vec![
        Ok(GYM_REPLY.to_string()),
        Ok("Sorry, I cannot help with that.".to_string()),
    ]));

    let events = planner.interpret("Mondays: Gym at 6 PM").await.unwrap();

    let err = planner.generate("something else").await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));

    let view = planner.state().await.unwrap();
    assert_eq!(view.events, events);
    assert!(matches!(view.request, RequestState::Failed { .. }));
}

#[tokio::test]
async fn test_second_request_is_rejected_while_busy() {
    let planner = planner(ScriptedModel::slow(GYM_REPLY, Duration::from_millis(300)));

    let first = {
        let planner = planner.clone();
        tokio::spawn(async move { planner.interpret("Mondays: Gym at 6 PM").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = planner.generate("another request").await;
    assert!(matches!(second, Err(Error::Busy)));

    let events = first.await.unwrap().unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let planner = planner(ScriptedModel::slow(GYM_REPLY, Duration::from_secs(10)));

    let request = {
        let planner = planner.clone();
        tokio::spawn(async move { planner.interpret("Mondays: Gym at 6 PM").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(planner.cancel().await.unwrap());

    let result = request.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));

    let view = planner.state().await.unwrap();
    assert!(view.events.is_empty());
    assert!(matches!(view.request, RequestState::Failed { .. }));

    // Nothing left to cancel
    assert!(!planner.cancel().await.unwrap());
}

#[tokio::test]
async fn test_request_times_out() {
    let planner = planner_with(
        Arc::new(ScriptedModel::slow(GYM_REPLY, Duration::from_secs(10))),
        Arc::new(FlakyExporter::new(Vec::new())),
        Duration::from_millis(100),
    );

    let result = planner.interpret("Mondays: Gym at 6 PM").await;
    assert!(matches!(result, Err(Error::Timeout(_))));

    // A new request may start once the old one timed out
    let view = planner.state().await.unwrap();
    assert!(!view.request.is_loading());
}

#[tokio::test]
async fn test_edit_then_discard() {
    let planner = planner(ScriptedModel::replying(WEEK_REPLY));
    let original = planner.generate("A week with gym and yoga").await.unwrap();

    let form = planner.begin_edit(0).await.unwrap();
    assert_eq!(form.summary, "Gym");

    let edited = planner
        .submit_edit(EventForm::new(
            "Gym and sauna",
            "2024-03-18T18:00:00+00:00",
            "2024-03-18T20:00:00+00:00",
        ))
        .await
        .unwrap();
    assert_eq!(edited.summary, "Gym and sauna");

    let view = planner.state().await.unwrap();
    assert!(view.modified);
    assert_eq!(view.events[0], edited);

    let events = planner.discard().await.unwrap();
    assert_eq!(events, original);
    assert!(!planner.state().await.unwrap().modified);
}

#[tokio::test]
async fn test_invalid_edit_reports_fields() {
    let planner = planner(ScriptedModel::replying(WEEK_REPLY));
    let original = planner.generate("A week with gym and yoga").await.unwrap();

    planner.begin_edit(1).await.unwrap();
    let err = planner
        .submit_edit(EventForm::new(
            "Yo",
            "2024-03-19T19:00:00+00:00",
            "2024-03-19T18:00:00+00:00",
        ))
        .await
        .unwrap_err();

    match err {
        Error::Validation(errors) => {
            assert!(errors.field("summary").is_some());
            assert!(errors.field("endTime").is_some());
            assert!(errors.field("startTime").is_none());
        }
        other => panic!("expected validation errors, got {:?}", other),
    }

    // Edit stays open and the event is unchanged
    let view = planner.state().await.unwrap();
    assert_eq!(view.editing, Some(1));
    assert_eq!(view.events, original);
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let planner = planner(ScriptedModel::replying(WEEK_REPLY));
    let events = planner.generate("A week with gym and yoga").await.unwrap();

    let err = planner.save("   ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let id = planner.save("  Week 12 ").await.unwrap();
    let schedules = planner.list().await.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].name, "Week 12");
    assert_eq!(schedules[0].id, id);

    planner.discard().await.unwrap();
    let loaded = planner.load(id.clone()).await.unwrap();
    assert_eq!(loaded, events);
    assert_eq!(
        planner.state().await.unwrap().active_schedule.as_deref(),
        Some(id.as_str())
    );

    let err = planner.load("no-such-id").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_delete_needs_confirmation() {
    let planner = planner(ScriptedModel::replying(WEEK_REPLY));
    planner.generate("A week with gym and yoga").await.unwrap();
    let id = planner.save("Week 12").await.unwrap();

    // Cancelled delete keeps everything
    let pending = planner.request_delete(id.clone()).await.unwrap();
    assert_eq!(pending.name, "Week 12");
    assert!(planner.cancel_delete().await.unwrap());
    assert_eq!(planner.list().await.unwrap().len(), 1);

    // Confirming without a pending request fails
    assert!(planner.confirm_delete().await.is_err());

    planner.request_delete(id.clone()).await.unwrap();
    let removed = planner.confirm_delete().await.unwrap();
    assert_eq!(removed.id, id);
    assert!(planner.list().await.unwrap().is_empty());

    // The working list showed the deleted schedule, so it is cleared
    let view = planner.state().await.unwrap();
    assert!(view.events.is_empty());
    assert!(view.active_schedule.is_none());
}

#[tokio::test]
async fn test_export_reports_partial_failure_and_skips_done_events() {
    let exporter = Arc::new(FlakyExporter::new(vec!["Yoga"]));
    let planner = planner_with(
        Arc::new(ScriptedModel::replying(WEEK_REPLY)),
        exporter.clone(),
        Duration::from_secs(5),
    );
    planner.generate("A week with gym and yoga").await.unwrap();

    let report = planner.export().await.unwrap();
    assert_eq!(report.created(), 1);
    assert_eq!(report.failed(), 1);
    assert!(!report.is_complete());
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 2);
    assert_eq!(planner.state().await.unwrap().exported, 1);

    // Retrying only sends the event that failed
    let report = planner.export().await.unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(report.already_exported(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_export_with_empty_list_fails() {
    let planner = planner(ScriptedModel::new(Vec::new()));
    assert!(planner.export().await.is_err());
}

/// Exporter that takes `delay` per event
struct SlowExporter {
    delay: Duration,
}

#[async_trait]
impl CalendarExporter for SlowExporter {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn create_event(&self, _event: &CalendarEvent) -> AppResult<ExportStatus> {
        tokio::time::sleep(self.delay).await;
        Ok(ExportStatus::Created)
    }
}

#[tokio::test]
async fn test_slow_export_keeps_planner_responsive() {
    let store = ScheduleStore::open(Box::new(MemoryBackend::new()), "test").unwrap();
    let generator = ScheduleGenerator::new(
        Arc::new(ScriptedModel::replying(WEEK_REPLY)),
        chrono_tz::UTC,
    );
    let exporter = Arc::new(SlowExporter {
        delay: Duration::from_secs(3600),
    });
    let planner = PlannerHandle::new(store, generator, exporter, Duration::from_secs(5));
    planner.generate("A week with gym and yoga").await.unwrap();

    let export = {
        let planner = planner.clone();
        tokio::spawn(async move { planner.export().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = tokio::time::timeout(Duration::from_secs(2), planner.state()).await;
    assert_eq!(state.unwrap().unwrap().events.len(), 2);

    let cancel = tokio::time::timeout(Duration::from_secs(2), planner.cancel()).await;
    assert!(!cancel.unwrap().unwrap());

    // Only one export runs at a time
    let second = tokio::time::timeout(Duration::from_secs(2), planner.export()).await;
    assert!(matches!(second.unwrap(), Err(Error::Busy)));

    let shutdown = tokio::time::timeout(Duration::from_secs(2), planner.shutdown()).await;
    assert!(shutdown.is_ok());
    export.abort();
}

#[tokio::test]
async fn test_working_list_is_locked_during_request() {
    let model = ScriptedModel {
        delay: Duration::from_millis(300),
        ..ScriptedModel::new(vec![Ok(WEEK_REPLY.to_string()), Ok(GYM_REPLY.to_string())])
    };
    let planner = planner(model);
    planner.generate("A week with gym and yoga").await.unwrap();
    let id = planner.save("Week 12").await.unwrap();

    let request = {
        let planner = planner.clone();
        tokio::spawn(async move { planner.interpret("Mondays: Gym at 6 PM").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(planner.load(id.clone()).await, Err(Error::Busy)));
    assert!(matches!(planner.discard().await, Err(Error::Busy)));
    assert!(matches!(planner.begin_edit(0).await, Err(Error::Busy)));

    // The finished request lands on the list it started from
    let events = request.await.unwrap().unwrap();
    let view = planner.state().await.unwrap();
    assert_eq!(view.events, events);
    assert!(view.active_schedule.is_none());

    let loaded = planner.load(id).await.unwrap();
    assert_eq!(loaded.len(), 2);
}
