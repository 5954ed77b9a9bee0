//! `funcgroups-demo` -- runs two demo job batches through a job group.
//!
//! The first batch sleeps 1/2/3/4/15 seconds and never fails; the second
//! runs health checks, two of which fail. Ctrl-C cancels the run in
//! flight.
//!
//! # Environment variables
//!
//! | Variable                           | Required | Default | Description                        |
//! |------------------------------------|----------|---------|------------------------------------|
//! | `DEMO_DEADLINE_SECS`               | no       | `3`     | Deadline for each run (0 = default)|
//! | `FUNCGROUPS_DIAGNOSTIC`            | no       | `false` | Log per-job timings                |
//! | `FUNCGROUPS_DEFAULT_DEADLINE_SECS` | no       | `10`    | Deadline used when 0 is requested  |

use std::time::Duration;

use funcgroups::{CancellationToken, GroupConfig, JobGroup, RunReport, TryJobGroup};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod jobs;

/// Default deadline for each demo run.
const DEFAULT_DEADLINE_SECS: u64 = 3;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funcgroups=info,funcgroups_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GroupConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid job group configuration");
        std::process::exit(1);
    });

    let deadline_secs: u64 = std::env::var("DEMO_DEADLINE_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_DEADLINE_SECS);
    let deadline = Duration::from_secs(deadline_secs);

    tracing::info!(
        deadline_secs,
        diagnostic = config.diagnostic,
        "Starting funcgroups-demo",
    );

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling");
            ctrl_c.cancel();
        }
    });

    let sleepers = JobGroup::new(jobs::sleepers(), Some(config.clone()));
    match sleepers.run(Some(&shutdown), deadline).await {
        Ok(report) => log_report("sleepers", &report),
        Err(e) => tracing::error!(error = %e, "Sleepers run failed to start"),
    }

    let checks = TryJobGroup::new(jobs::health_checks(), Some(config));
    match checks.run(Some(&shutdown), deadline).await {
        Ok(outcome) => {
            log_report("health_checks", &outcome.report);
            match outcome.failure {
                Some(failure) => tracing::warn!(
                    failures = failure.len(),
                    "Health checks failed:\n{failure}",
                ),
                None => tracing::info!("All health checks passed"),
            }
        }
        Err(e) => tracing::error!(error = %e, "Health check run failed to start"),
    }
}

fn log_report(batch: &str, report: &RunReport) {
    match serde_json::to_string(report) {
        Ok(json) => tracing::info!(
            batch,
            complete = report.is_complete(),
            remaining = report.remaining(),
            report = %json,
            "Run finished",
        ),
        Err(e) => tracing::error!(batch, error = %e, "Failed to serialise run report"),
    }
}
