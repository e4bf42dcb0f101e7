use clap::Parser;
use scheduleai::cli::{self, Cli};
use scheduleai::{shutdown, startup};
use tokio::sync::oneshot;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Parse arguments first so --help works without any setup
    let cli = Cli::parse();

    // Initialize logging
    startup::init_logging()?;

    info!("Starting ScheduleAI");

    // Load configuration
    let config = startup::load_config()?;

    // Start the planner
    let planner = startup::start_planner(&config)?;

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    let signal_planner = planner.clone();
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, signal_planner).await;
    });

    // Run the command or stop on a shutdown signal
    tokio::select! {
        result = cli::run(cli, &planner, &config) => {
            let _ = planner.shutdown().await;
            result.map_err(Into::into)
        }
        _ = shutdown_recv => {
            info!("Received shutdown signal, exiting");
            Ok(())
        }
    }
}
