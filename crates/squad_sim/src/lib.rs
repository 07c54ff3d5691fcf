//! Scenario runner
//!
//! 시나리오 파일 실행, 스냅샷 저장/조회 도구

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use squad_core::scenario::{run_scenario_with_leader, ScenarioReport, ScenarioSpec};
use squad_core::SquadSnapshot;

/// One line of `run` output.
#[derive(Debug, Serialize)]
struct SignalLine<'a> {
    frame: u32,
    to: u32,
    signal: &'a str,
    data: &'a squad_core::SignalData,
}

/// Last line of `run` output.
#[derive(Debug, Serialize)]
struct StatusLine<'a> {
    scenario: &'a str,
    frames_run: u32,
    status: &'a Option<squad_core::ActionStatus>,
    skipped_events: usize,
    assertion_failures: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub scenario: String,
    pub frames_run: u32,
    pub units: usize,
    pub live_actions: usize,
    pub size_bytes: usize,
}

pub fn load_scenario(path: &Path) -> Result<ScenarioSpec> {
    ScenarioSpec::load_from_path(path)
        .with_context(|| format!("failed to load scenario {}", path.display()))
}

pub fn run_file(path: &Path) -> Result<ScenarioReport> {
    let spec = load_scenario(path)?;
    let result = run_scenario_with_leader(&spec)?;
    Ok(result.report)
}

/// Writes every outbound signal as a JSON line, then the final status line.
pub fn write_report(report: &ScenarioReport, out: &mut dyn Write) -> Result<()> {
    for entry in &report.signals {
        let line = SignalLine {
            frame: entry.frame,
            to: entry.signal.to.0,
            signal: entry.signal.name(),
            data: &entry.signal.data,
        };
        writeln!(out, "{}", serde_json::to_string(&line)?)?;
    }
    let status = StatusLine {
        scenario: &report.id,
        frames_run: report.frames_run,
        status: &report.status,
        skipped_events: report.skipped_events,
        assertion_failures: &report.assertion_failures,
    };
    writeln!(out, "{}", serde_json::to_string(&status)?)?;
    Ok(())
}

/// Runs a scenario and saves the final squad state.
pub fn snapshot_file(scenario: &Path, out: &Path) -> Result<SnapshotSummary> {
    let spec = load_scenario(scenario)?;
    let result = run_scenario_with_leader(&spec)?;
    let snapshot = SquadSnapshot::new(result.leader);
    let size_bytes = snapshot.to_bytes()?.len();
    snapshot
        .save(out)
        .with_context(|| format!("failed to write snapshot {}", out.display()))?;

    Ok(SnapshotSummary {
        scenario: spec.id,
        frames_run: result.report.frames_run,
        units: snapshot.leader.roster().len(),
        live_actions: snapshot.leader.roster().actions().len(),
        size_bytes,
    })
}

pub fn inspect_file(path: &Path) -> Result<String> {
    let snapshot = SquadSnapshot::load(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    Ok(snapshot.to_json()?)
}
