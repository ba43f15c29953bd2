use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use genjob_tracker::{
    app_state::AppState,
    config::TrackerConfig,
    models::{
        generation::GenerateRequest,
        job::{DownloadFormat, JobKind},
    },
};

/// Start and track server-side generation jobs
#[derive(Parser, Debug)]
#[command(name = "genjob", version, about, long_about = None)]
struct Cli {
    /// Project the jobs belong to
    #[arg(short = 'p', long = "project")]
    project: String,

    /// Generation kind (presentation, business_report)
    #[arg(short = 'k', long = "kind", default_value = "presentation")]
    kind: JobKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a generation job and wait for it to finish
    Start {
        /// Source document to generate from
        #[arg(short = 's', long = "source")]
        source: Option<String>,

        /// Extra kind-specific parameters as a JSON object
        #[arg(long = "params")]
        params: Option<String>,
    },
    /// Reattach to a job left running by an earlier session
    Resume,
    /// Print finished jobs
    List,
    /// Print the authenticated download URL for a job
    DownloadUrl {
        #[arg(short = 'j', long = "job")]
        job: String,

        #[arg(short = 'f', long = "format")]
        format: Option<DownloadFormat>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration from environment");
            return ExitCode::FAILURE;
        }
    };

    describe_metrics();

    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize job API client");
            return ExitCode::FAILURE;
        }
    };

    let tracker = state.tracker.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling active polls");
            tracker.shutdown();
        }
    });

    match run(&state, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let session = state.tracker.session(&cli.project, cli.kind);

    match cli.command {
        Command::Start { source, params } => {
            let mut request = GenerateRequest {
                source_id: source,
                ..GenerateRequest::default()
            };
            if let Some(raw) = params {
                request.params = serde_json::from_str(&raw)?;
            }

            let mut updates = session.store().subscribe();
            let printer = tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let current = updates.borrow_and_update().current_job.clone();
                    if let Some(job) = current {
                        tracing::info!(
                            job_id = %job.id,
                            status = ?job.status,
                            export_status = ?job.export_status,
                            completed = ?job.progress.completed,
                            total = ?job.progress.total,
                            message = ?job.progress.status_message,
                            "Progress"
                        );
                    }
                }
            });

            let result = session.start(&request).await;
            printer.abort();
            let job = result?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Resume => {
            session.resume().await;
            println!("{}", serde_json::to_string_pretty(&session.store().snapshot())?);
        }
        Command::List => {
            session.refresh().await?;
            println!("{}", serde_json::to_string_pretty(&session.store().finished_jobs())?);
        }
        Command::DownloadUrl { job, format } => {
            println!("{}", session.download_url(&job, format));
        }
    }

    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!(
        "generation_jobs_started_total",
        "Generation jobs accepted by the backend"
    );
    metrics::describe_counter!(
        "generation_jobs_completed_total",
        "Generation jobs that finished and are downloadable"
    );
    metrics::describe_counter!(
        "generation_jobs_failed_total",
        "Generation jobs that failed, lost contact or failed to export"
    );
    metrics::describe_counter!(
        "generation_jobs_resumed_total",
        "In-flight jobs reattached from an earlier session"
    );
    metrics::describe_histogram!(
        "generation_job_duration_seconds",
        "Time from start to completion of a generation job"
    );
}
