//! `kestrel simulate`: one launch against scripted collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use kestrel_session::{LaunchOutcome, SessionConfig, SessionOrchestrator};
use kestrel_testkit::{wait_until_timeout, Scenario, TestHarness};
use serde::Deserialize;

/// On-disk layout of a scenario file.
#[derive(Debug, Default, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub scenario: Scenario,

    /// Overrides for the loaded session config.
    #[serde(default)]
    pub session: Option<SessionConfig>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse scenario file {}", path.display()))
    }
}

pub async fn run(path: &Path, config: SessionConfig, show_journal: bool) -> Result<()> {
    let file = ScenarioFile::load(path)?;
    let config = file.session.unwrap_or(config);

    let harness = TestHarness::new();
    file.scenario.apply(&harness);
    let mut ports = harness.ports();
    ports.capabilities = Arc::new(config.capabilities());
    let orchestrator =
        SessionOrchestrator::new(ports, config, Arc::clone(&harness.bus), harness.cache.clone());

    tracing::info!(scenario = %path.display(), "starting simulated launch");
    let outcome = orchestrator.start().await;
    println!("Outcome: {}", describe(&outcome));

    if file.scenario.notifications > 0 {
        let target = harness.pulls() + file.scenario.notifications;
        for _ in 0..file.scenario.notifications {
            harness.notify();
        }
        wait_until_timeout(Duration::from_secs(2), || harness.pulls() >= target).await;
    }
    // Let best-effort background work (prompts, trades) report in.
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("State: {:?}", orchestrator.state());
    println!(
        "Market: fees {:?}, {} ticker updates",
        orchestrator.market().fee_options(),
        orchestrator.market().versions().1
    );
    println!("UI calls:");
    for call in harness.ui.calls() {
        println!("  {call:?}");
    }
    if show_journal {
        println!("Collaborator calls:");
        for entry in harness.journal.entries() {
            println!("  {entry}");
        }
    }

    orchestrator.teardown();
    Ok(())
}

fn describe(outcome: &LaunchOutcome) -> String {
    match outcome {
        LaunchOutcome::LoginRequired => "login required".to_string(),
        LaunchOutcome::Ready {
            session,
            failure: None,
            deferred,
        } => format!("{session} ready (deferred: {deferred:?})"),
        LaunchOutcome::Ready {
            session,
            failure: Some(failure),
            ..
        } => format!("{session} ready with {} ({failure})", failure.class()),
        LaunchOutcome::Cancelled { session } => format!("{session} cancelled"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Write;

    #[test]
    fn scenario_file_parses_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[scenario]\nnodes_exist = false\nnotifications = 2").unwrap();
        writeln!(file, "[session]\nbuy_sell_permitted = false").unwrap();

        let parsed = ScenarioFile::load(&path).unwrap();

        assert!(!parsed.scenario.nodes_exist);
        assert_eq!(parsed.scenario.notifications, 2);
        assert!(!parsed.session.unwrap().buy_sell_permitted);
    }

    #[tokio::test]
    async fn simulate_runs_a_launch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        std::fs::write(&path, "[scenario]\ncontacts = [\"peer1\"]\nnotifications = 1\n").unwrap();

        run(&path, SessionConfig::for_testing(), true).await.unwrap();
    }
}
