//! Demo job batches.

use std::time::Duration;

use funcgroups::{Job, TryJob};

async fn nap(label: &str, secs: u64) {
    tracing::info!(job = label, secs, "Job started");
    tokio::time::sleep(Duration::from_secs(secs)).await;
    tracing::info!(job = label, "Job done");
}

async fn one() {
    nap("one", 1).await;
}

async fn two() {
    nap("two", 2).await;
}

async fn three() {
    nap("three", 3).await;
}

async fn four() {
    nap("four", 4).await;
}

async fn fifteen() {
    nap("fifteen", 15).await;
}

/// Five sleepers of 1, 2, 3, 4 and 15 seconds; with a short deadline the
/// last ones are left running in the background.
pub fn sleepers() -> Vec<Job> {
    vec![
        Job::new(one),
        Job::new(two),
        Job::new(three),
        Job::new(four),
        Job::new(fifteen),
    ]
}

async fn check_disk() -> Result<(), String> {
    nap("check_disk", 1).await;
    Ok(())
}

async fn check_network() -> Result<(), String> {
    nap("check_network", 1).await;
    Err("upstream unreachable".to_string())
}

async fn check_database() -> Result<(), String> {
    nap("check_database", 2).await;
    Err("connection refused".to_string())
}

/// Four checks, two of which fail.
pub fn health_checks() -> Vec<TryJob<String>> {
    vec![
        Job::new(check_disk),
        Job::new(check_network),
        Job::new(check_database),
        Job::blocking(|| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .with_name("check_clock"),
    ]
}
