use crate::components::calendar::{CalendarEvent, ExportOutcome, ExportReport};
use crate::components::planner::{EventForm, WorkspaceView};
use crate::components::store::Schedule;
use crate::components::PlannerHandle;
use crate::config::Config;
use crate::error::{export_error, other_error, AppResult, Error};
use crate::utils::time::format_for_display;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use inquire::{Confirm, InquireError, Select, Text};
use rust_i18n::t;
use std::fmt;

#[derive(Parser)]
#[command(
    name = "scheduleai",
    version,
    about = "Describe a schedule in plain language and get calendar events back"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a schedule from a free-text description
    Generate {
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Save the result under this name
        #[arg(long)]
        save: Option<String>,
        /// Export the result to the calendar
        #[arg(long)]
        export: bool,
    },
    /// Interpret shorthand schedule text such as "Mondays: Gym at 6 PM"
    Interpret {
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(long)]
        save: Option<String>,
        #[arg(long)]
        export: bool,
    },
    /// List saved schedules
    List,
    /// Show the events of a saved schedule
    Show { id: String },
    /// Delete a saved schedule
    Delete {
        id: String,
        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },
    /// Export a saved schedule to the calendar.
    ///
    /// Events already in the calendar are skipped; ones deleted there since are restored.
    Export { id: String },
    /// Menu-driven session
    Interactive,
}

/// Run one CLI command against the planner
pub async fn run(cli: Cli, planner: &PlannerHandle, config: &Config) -> AppResult<()> {
    let tz = config.tz()?;

    match cli.command {
        Commands::Generate {
            prompt,
            save,
            export,
        } => {
            let events = planner.generate(prompt.join(" ")).await?;
            println!("{}", t!("generate_success", count = events.len()));
            finish_request(planner, &events, save, export, tz).await
        }
        Commands::Interpret { text, save, export } => {
            let events = planner.interpret(text.join(" ")).await?;
            println!("{}", t!("interpret_success", count = events.len()));
            finish_request(planner, &events, save, export, tz).await
        }
        Commands::List => {
            print_schedules(&planner.list().await?);
            Ok(())
        }
        Commands::Show { id } => {
            let schedule = planner.get_schedule(id).await?;
            println!("{}", schedule.describe());
            print_events(&schedule.events, tz);
            Ok(())
        }
        Commands::Delete { id, yes } => {
            let schedule = planner.request_delete(id).await?;
            let confirmed = yes || confirm_delete(&schedule).await?;
            if confirmed {
                let removed = planner.confirm_delete().await?;
                println!("{}", t!("deleted", name = removed.name));
            } else {
                planner.cancel_delete().await?;
                println!("{}", t!("delete_cancelled"));
            }
            Ok(())
        }
        Commands::Export { id } => {
            planner.load(id).await?;
            let report = planner.export().await?;
            print_report(&report);
            ensure_complete(&report)
        }
        Commands::Interactive => interactive(planner, tz).await,
    }
}

async fn finish_request(
    planner: &PlannerHandle,
    events: &[CalendarEvent],
    save: Option<String>,
    export: bool,
    tz: Tz,
) -> AppResult<()> {
    print_events(events, tz);

    if let Some(name) = save {
        let id = planner.save(name.clone()).await?;
        println!("{}", t!("saved", name = name.trim(), id = id));
    }

    if export {
        let report = planner.export().await?;
        print_report(&report);
        ensure_complete(&report)?;
    }

    Ok(())
}

/// Partial export is reported event by event, then turned into a failure exit
fn ensure_complete(report: &ExportReport) -> AppResult<()> {
    if report.is_complete() {
        Ok(())
    } else {
        Err(export_error(&format!(
            "{} of {} events could not be exported",
            report.failed(),
            report.results.len()
        )))
    }
}

fn print_events(events: &[CalendarEvent], tz: Tz) {
    if events.is_empty() {
        println!("{}", t!("no_events"));
        return;
    }

    for (i, event) in events.iter().enumerate() {
        println!("{:>3}. {}", i + 1, event.summary);
        println!(
            "     {} -> {}",
            format_for_display(&event.start_time, tz),
            format_for_display(&event.end_time, tz)
        );
    }
}

fn print_schedules(schedules: &[Schedule]) {
    if schedules.is_empty() {
        println!("{}", t!("no_schedules"));
        return;
    }

    for schedule in schedules {
        println!(
            "{}  {}  {}",
            schedule.id,
            schedule.created_at,
            schedule.describe()
        );
    }
}

fn print_report(report: &ExportReport) {
    for result in &report.results {
        if let ExportOutcome::Failed(reason) = &result.outcome {
            println!(
                "{}",
                t!("export_failed_event", summary = result.event.summary, error = reason)
            );
        }
    }

    println!(
        "{}",
        t!(
            "export_summary",
            created = report.created(),
            skipped = report.already_exported(),
            failed = report.failed()
        )
    );
}

/// Run a blocking inquire prompt off the async runtime.
///
/// Esc gives `None`; Ctrl+C inside a prompt ends the session with `Cancelled`.
async fn ask<T, F>(prompt: F) -> AppResult<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    match tokio::task::spawn_blocking(prompt).await {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(InquireError::OperationCanceled)) => Ok(None),
        Ok(Err(InquireError::OperationInterrupted)) => Err(Error::Cancelled),
        Ok(Err(e)) => Err(other_error(&format!("Prompt failed: {}", e))),
        Err(e) => Err(other_error(&format!("Prompt task failed: {}", e))),
    }
}

async fn confirm_delete(schedule: &Schedule) -> AppResult<bool> {
    let message = t!("delete_confirm", name = schedule.name).to_string();
    let answer = ask(move || Confirm::new(&message).with_default(false).prompt()).await?;
    Ok(answer.unwrap_or(false))
}

/// Entries of the interactive main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Generate,
    Interpret,
    Saved,
    Edit,
    Save,
    Discard,
    Export,
    Quit,
}

impl Action {
    const ALL: [Action; 8] = [
        Action::Generate,
        Action::Interpret,
        Action::Saved,
        Action::Edit,
        Action::Save,
        Action::Discard,
        Action::Export,
        Action::Quit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Generate => t!("menu.generate"),
            Action::Interpret => t!("menu.interpret"),
            Action::Saved => t!("menu.saved"),
            Action::Edit => t!("menu.edit"),
            Action::Save => t!("menu.save"),
            Action::Discard => t!("menu.discard"),
            Action::Export => t!("menu.export"),
            Action::Quit => t!("menu.quit"),
        };
        write!(f, "{}", label)
    }
}

/// What to do with a selected saved schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScheduleAction {
    Load,
    Delete,
    Back,
}

impl fmt::Display for ScheduleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScheduleAction::Load => t!("schedule_action.load"),
            ScheduleAction::Delete => t!("schedule_action.delete"),
            ScheduleAction::Back => t!("schedule_action.back"),
        };
        write!(f, "{}", label)
    }
}

/// Select entry wrapping a value with its label
#[derive(Clone)]
struct Choice<T> {
    label: String,
    value: T,
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

async fn interactive(planner: &PlannerHandle, tz: Tz) -> AppResult<()> {
    loop {
        print_status(&planner.state().await?);

        let message = t!("prompt.choose_action").to_string();
        let action = match ask(move || Select::new(&message, Action::ALL.to_vec()).prompt()).await {
            Ok(Some(action)) => action,
            Ok(None) | Err(Error::Cancelled) => Action::Quit,
            Err(e) => return Err(e),
        };

        let result = match action {
            Action::Generate => request_schedule(planner, tz, false).await,
            Action::Interpret => request_schedule(planner, tz, true).await,
            Action::Saved => saved_schedules(planner, tz).await,
            Action::Edit => edit_event(planner, tz).await,
            Action::Save => save_schedule(planner).await,
            Action::Discard => {
                let events = planner.discard().await?;
                println!("{}", t!("discarded"));
                print_events(&events, tz);
                Ok(())
            }
            Action::Export => export_working(planner).await,
            Action::Quit => return Ok(()),
        };

        // Every failure is recoverable: report it and show the menu again
        match result {
            Ok(()) => {}
            Err(Error::Cancelled) => return Ok(()),
            Err(e) => println!("{}", t!("error", error = e)),
        }
    }
}

fn print_status(view: &WorkspaceView) {
    let mut status = t!("status_line", count = view.events.len()).to_string();
    if view.modified {
        status.push_str(&t!("status_modified"));
    }
    if view.exported > 0 {
        status.push_str(&t!("status_exported", count = view.exported));
    }
    println!();
    println!("{}", status);
}

async fn request_schedule(planner: &PlannerHandle, tz: Tz, interpret: bool) -> AppResult<()> {
    let message = t!("prompt.input").to_string();
    let Some(input) = ask(move || Text::new(&message).prompt()).await? else {
        return Ok(());
    };

    if interpret {
        println!("{}", t!("interpreting"));
        match planner.interpret(input).await {
            Ok(events) => {
                println!("{}", t!("interpret_success", count = events.len()));
                print_events(&events, tz);
            }
            Err(e) => println!("{}", t!("interpret_failed", error = e)),
        }
    } else {
        println!("{}", t!("generating"));
        match planner.generate(input).await {
            Ok(events) => {
                println!("{}", t!("generate_success", count = events.len()));
                print_events(&events, tz);
            }
            Err(e) => println!("{}", t!("generate_failed", error = e)),
        }
    }

    Ok(())
}

async fn saved_schedules(planner: &PlannerHandle, tz: Tz) -> AppResult<()> {
    let schedules = planner.list().await?;
    if schedules.is_empty() {
        println!("{}", t!("no_schedules"));
        return Ok(());
    }

    let choices: Vec<Choice<String>> = schedules
        .iter()
        .map(|s| Choice {
            label: format!("{}  [{}]", s.describe(), s.created_at),
            value: s.id.clone(),
        })
        .collect();
    let message = t!("prompt.choose_schedule").to_string();
    let Some(choice) = ask(move || Select::new(&message, choices).prompt()).await? else {
        return Ok(());
    };

    let message = t!("prompt.choose_action").to_string();
    let options = vec![ScheduleAction::Load, ScheduleAction::Delete, ScheduleAction::Back];
    let Some(action) = ask(move || Select::new(&message, options).prompt()).await? else {
        return Ok(());
    };

    match action {
        ScheduleAction::Load => {
            let events = planner.load(choice.value.clone()).await?;
            let name = schedules
                .iter()
                .find(|s| s.id == choice.value)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            println!("{}", t!("loaded", name = name, count = events.len()));
            print_events(&events, tz);
        }
        ScheduleAction::Delete => {
            let schedule = planner.request_delete(choice.value).await?;
            if confirm_delete(&schedule).await? {
                let removed = planner.confirm_delete().await?;
                println!("{}", t!("deleted", name = removed.name));
            } else {
                planner.cancel_delete().await?;
                println!("{}", t!("delete_cancelled"));
            }
        }
        ScheduleAction::Back => {}
    }

    Ok(())
}

async fn edit_event(planner: &PlannerHandle, tz: Tz) -> AppResult<()> {
    let view = planner.state().await?;
    if view.events.is_empty() {
        println!("{}", t!("no_events"));
        return Ok(());
    }

    let choices: Vec<Choice<usize>> = view
        .events
        .iter()
        .enumerate()
        .map(|(i, e)| Choice {
            label: format!(
                "{}. {} ({})",
                i + 1,
                e.summary,
                format_for_display(&e.start_time, tz)
            ),
            value: i,
        })
        .collect();
    let message = t!("prompt.choose_event").to_string();
    let Some(choice) = ask(move || Select::new(&message, choices).prompt()).await? else {
        return Ok(());
    };

    let mut form = planner.begin_edit(choice.value).await?;

    loop {
        let Some(values) = ask_form(form.clone()).await? else {
            planner.cancel_edit().await?;
            return Ok(());
        };

        match planner.submit_edit(values.clone()).await {
            Ok(_) => {
                println!("{}", t!("event_updated"));
                return Ok(());
            }
            Err(Error::Validation(errors)) => {
                println!("{}", t!("edit_invalid"));
                for error in errors.errors() {
                    println!("  {}: {}", error.field, error.message);
                }
                // Ask again, starting from what the user typed
                form = values;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Ask for every field of the form, prefilled with its current values
async fn ask_form(form: EventForm) -> AppResult<Option<EventForm>> {
    let summary_label = t!("prompt.summary").to_string();
    let start_label = t!("prompt.start_time").to_string();
    let end_label = t!("prompt.end_time").to_string();

    ask(move || {
        let summary = Text::new(&summary_label)
            .with_initial_value(&form.summary)
            .prompt()?;
        let start_time = Text::new(&start_label)
            .with_initial_value(&form.start_time)
            .prompt()?;
        let end_time = Text::new(&end_label)
            .with_initial_value(&form.end_time)
            .prompt()?;
        Ok(EventForm::new(summary, start_time, end_time))
    })
    .await
}

async fn save_schedule(planner: &PlannerHandle) -> AppResult<()> {
    let message = t!("prompt.schedule_name").to_string();
    let Some(name) = ask(move || Text::new(&message).prompt()).await? else {
        return Ok(());
    };

    match planner.save(name.clone()).await {
        Ok(id) => println!("{}", t!("saved", name = name.trim(), id = id)),
        Err(e) => println!("{}", t!("save_failed", error = e)),
    }
    Ok(())
}

async fn export_working(planner: &PlannerHandle) -> AppResult<()> {
    match planner.export().await {
        Ok(report) => print_report(&report),
        Err(e) => println!("{}", t!("export_failed", error = e)),
    }
    Ok(())
}
