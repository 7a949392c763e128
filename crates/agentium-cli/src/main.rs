//! The `agentium` binary: loads the session config, seeds tasks from
//! GitHub, and drives the pipeline to a terminal state.

mod config;

use agentium_agent::AdapterRegistry;
use agentium_controller::{PhaseDriver, Session, SessionConfig};
use agentium_github::{GitHubClient, RestGitHubClient};
use agentium_handoff::HandoffStore;
use agentium_memory::MemoryStore;
use agentium_skills::{load_project_prompt, load_system_prompt, SkillLibrary};
use agentium_trace::{ExporterConfig, HttpTracer, NoopTracer, Tracer};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentium", about = "Agentium — autonomous agent orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured session to completion
    Run,
    /// Validate the session configuration and exit
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate => {
            let config = config::load_session_config()?;
            println!(
                "ok: repository={} tasks={} adapters={}",
                config.repository,
                config.issues.len(),
                config.routing.adapters().join(",")
            );
            Ok(())
        }
        Commands::Run => {
            let config = config::load_session_config()?;
            let exit_code = run_session(config).await?;
            std::process::exit(exit_code);
        }
    }
}

async fn run_session(config: SessionConfig) -> anyhow::Result<i32> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    // Prompts and skills.
    let system_prompt =
        load_system_prompt(config.system_prompt_url.as_deref(), Duration::from_secs(10)).await;
    let project_prompt = load_project_prompt(&config.work_dir).await?;
    let skills = Arc::new(SkillLibrary::load(
        &config.work_dir.join(".agentium").join("skills"),
    )?);

    // Stores, read-tolerant.
    let handoff = Arc::new(HandoffStore::new(&config.work_dir));
    handoff.load().await?;
    let memory = Arc::new(MemoryStore::new(&config.work_dir));
    memory.load().await?;

    // Tracing backend, when configured.
    let tracer: Arc<dyn Tracer> = match &config.trace {
        Some(trace) => HttpTracer::new(ExporterConfig::new(
            trace.base_url.clone(),
            trace.public_key.clone(),
            trace.secret_key.clone(),
        )),
        None => Arc::new(NoopTracer),
    };

    // Seed each task's issue context from GitHub.
    if let Some(token) = &config.github_token {
        let github = RestGitHubClient::new(config.repository.clone(), token.clone());
        for issue_number in &config.issues {
            match github.fetch_issue(*issue_number).await {
                Ok(issue) => {
                    handoff
                        .set_issue_context(&SessionConfig::task_id(*issue_number), issue)
                        .await;
                }
                Err(e) => {
                    // The task will block on its missing prerequisite;
                    // the rest of the session still runs.
                    warn!(issue = issue_number, error = %e, "Issue fetch failed");
                }
            }
        }
    } else {
        warn!("No GitHub token configured, tasks must be pre-seeded");
    }

    let registry = Arc::new(AdapterRegistry::with_defaults());
    let session = Session::new(config, system_prompt, project_prompt);
    info!(
        session_id = %session.id,
        repository = %session.config.repository,
        tasks = session.config.issues.len(),
        "Session starting"
    );

    let driver = PhaseDriver::new(
        session,
        registry,
        handoff,
        memory,
        skills,
        tracer.clone(),
        cancel,
    );

    let report = driver.run().await;
    tracer.stop().await;

    match report {
        Ok(report) => {
            for (task_id, outcome) in &report.outcomes {
                info!(task_id = %task_id, outcome = ?outcome, "Task outcome");
            }
            Ok(if report.all_complete() { 0 } else { 1 })
        }
        Err(e) => {
            error!(error = %e, "Session failed");
            Ok(1)
        }
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable");
                    let _ = tokio::signal::ctrl_c().await;
                    cancel.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("Shutdown signal received, cancelling session");
        cancel.cancel();
    });
}
