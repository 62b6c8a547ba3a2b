use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::domain::activity::{ActivityKind, ActivitySchedule};
use crate::services::cpm_scheduler::{ScheduleSummary, ScheduledProject};
use crate::services::progress::ProgressReport;
use crate::services::simulation_types::{PercentileRow, SimulationResult};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to serialize yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write output file: {0}")]
    Write(#[from] io::Error),
}

#[derive(Serialize, Debug, Clone)]
pub struct ScheduleReport {
    pub project: String,
    pub summary: ScheduleSummary,
    pub activities: Vec<ScheduledActivityRow>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ScheduledActivityRow {
    pub id: String,
    pub name: String,
    pub kind: ActivityKind,
    #[serde(flatten)]
    pub schedule: ActivitySchedule,
}

impl ScheduleReport {
    pub fn from_scheduled(scheduled: &ScheduledProject) -> Self {
        Self {
            project: scheduled.project.name.clone(),
            summary: scheduled.summary.clone(),
            activities: scheduled
                .project
                .activities
                .iter()
                .filter_map(|activity| {
                    Some(ScheduledActivityRow {
                        id: activity.id.clone(),
                        name: activity.name.clone(),
                        kind: activity.kind,
                        schedule: activity.schedule.clone()?,
                    })
                })
                .collect(),
        }
    }
}

/// Writes `value` as JSON when `path` ends in `.json`, YAML otherwise.
pub fn write_serialized<T: Serialize>(path: &str, value: &T) -> Result<(), OutputError> {
    let is_json = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let contents = if is_json {
        serde_json::to_string_pretty(value)?
    } else {
        serde_yaml::to_string(value)?
    };
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn format_schedule_report(report: &ScheduleReport) -> String {
    let summary = &report.summary;
    let mut lines = Vec::new();
    lines.push("Schedule Report".to_string());
    lines.push(format!("Project: {}", report.project));
    lines.push(format!("Start: {}", summary.project_start));
    lines.push(format!("Finish: {}", summary.project_finish));
    lines.push(format!("Duration: {} workdays", summary.duration_days));
    lines.push(format!("Critical path: {}", summary.critical_path.join(" -> ")));
    lines.push(String::new());
    lines.push("Activity | ES | EF | LS | LF | TF | Flags".to_string());
    lines.push("---------|----|----|----|----|----|------".to_string());
    for row in &report.activities {
        let dates = &row.schedule;
        let mut flags = Vec::new();
        if dates.critical {
            flags.push("critical");
        }
        if dates.constraint_violated {
            flags.push("violated");
        }
        lines.push(format!(
            "{} | {} | {} | {} | {} | {} | {}",
            row.id,
            dates.early_start,
            dates.early_finish,
            dates.late_start,
            dates.late_finish,
            dates.total_float,
            flags.join(",")
        ));
    }
    lines.join("\n")
}

pub fn format_simulation_report(result: &SimulationResult) -> String {
    let mut lines = Vec::new();
    lines.push("Simulation Report".to_string());
    lines.push(format!("Project: {}", result.inputs.project_name));
    lines.push(format!("Start date: {}", result.inputs.project_start));
    lines.push(format!("Seed: {}", result.seed));
    lines.push(format!(
        "Iterations: {} of {}",
        result.completed_iterations, result.requested_iterations
    ));
    if result.skipped_iterations > 0 {
        lines.push(format!("Skipped iterations: {}", result.skipped_iterations));
    }
    if result.cancelled {
        lines.push("Cancelled: partial result".to_string());
    }
    lines.push(format!(
        "Deterministic: {} days ({})",
        result.deterministic.duration_days, result.deterministic.finish_date
    ));
    lines.push(format!(
        "Mean: {:.2} days, std dev: {:.2}",
        result.mean_duration, result.std_dev_duration
    ));
    lines.push(String::new());
    lines.push("Percentiles:".to_string());
    lines.push("Percentile | Days | Date".to_string());
    lines.push("-----------|------|-----".to_string());
    for row in &result.percentiles {
        lines.push(format_percentile_row(row));
    }

    let mut drivers: Vec<_> = result.activities.iter().collect();
    drivers.sort_by(|a, b| b.sensitivity.total_cmp(&a.sensitivity).then(a.id.cmp(&b.id)));
    lines.push(String::new());
    lines.push("Activity | Criticality % | Sensitivity".to_string());
    lines.push("---------|---------------|------------".to_string());
    for activity in drivers {
        lines.push(format!(
            "{} | {:.1} | {:.3}",
            activity.id, activity.criticality_percent, activity.sensitivity
        ));
    }

    if let Some(cost) = &result.risk_cost {
        lines.push(String::new());
        lines.push(format!(
            "Risk cost: mean {:.2}, P50 {:.2}, P80 {:.2}, P90 {:.2}",
            cost.mean, cost.p50, cost.p80, cost.p90
        ));
    }
    if let Some(baseline) = &result.baseline {
        lines.push(format!(
            "Baseline {} finish {}: {:.1}% of iterations on or before",
            baseline.slot, baseline.baseline_finish, baseline.on_or_before_percent
        ));
    }

    lines.join("\n")
}

fn format_percentile_row(row: &PercentileRow) -> String {
    format!(
        "P{} | {} | {}",
        row.percentile, row.duration_days, row.finish_date
    )
}

pub fn format_progress_report(report: &ProgressReport) -> String {
    let mut lines = Vec::new();
    lines.push("Progress Report".to_string());
    lines.push(format!("As of: {}", report.as_of));
    lines.push(format!("Baseline slot: {}", report.baseline_slot));
    lines.push(format!(
        "Planned: {:.1}%  Actual: {:.1}%",
        report.planned_percent, report.actual_percent
    ));
    lines.push(String::new());
    lines.push("Activity | Planned % | Actual % | Variance".to_string());
    lines.push("---------|-----------|----------|---------".to_string());
    for activity in &report.activities {
        lines.push(format!(
            "{} | {:.1} | {:.1} | {:+.1}",
            activity.id, activity.planned_percent, activity.actual_percent, activity.variance
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::RiskConfig;
    use crate::services::cpm_scheduler::{SchedulingOptions, schedule_project};
    use crate::services::monte_carlo::run_simulation;
    use crate::services::progress::ActivityProgress;
    use crate::services::simulation_types::SimulationParams;
    use crate::test_support::{build_chain_project, on_date};

    #[test]
    fn schedule_report_lists_every_scheduled_activity() {
        let scheduled = schedule_project(&build_chain_project(), SchedulingOptions::default()).unwrap();
        let report = ScheduleReport::from_scheduled(&scheduled);
        let output = format_schedule_report(&report);

        assert!(output.contains("Schedule Report"));
        assert!(output.contains("Project: Test"));
        assert!(output.contains("Finish: 2026-03-16"));
        assert!(output.contains("Duration: 10 workdays"));
        assert!(output.contains("Critical path: A -> B -> C"));
        assert!(output.contains("A | 2026-03-02 | 2026-03-09 | 2026-03-02 | 2026-03-09 | 0 | critical"));
    }

    #[test]
    fn simulation_report_includes_header_and_table() {
        let params = SimulationParams {
            iterations: 1,
            seed: Some(4),
            percentiles: vec![0.0, 50.0, 100.0],
            ..SimulationParams::default()
        };
        let result = run_simulation(
            &build_chain_project(),
            &RiskConfig::default(),
            &params,
            SchedulingOptions::default(),
        )
        .unwrap();
        let output = format_simulation_report(&result);

        assert!(output.contains("Simulation Report"));
        assert!(output.contains("Seed: 4"));
        assert!(output.contains("Iterations: 1 of 1"));
        assert!(output.contains("Deterministic: 10 days (2026-03-16)"));
        assert!(output.contains("Percentile | Days | Date"));
        assert!(output.contains("P50 | 10 | 2026-03-16"));
        assert!(output.contains("A | 100.0 | 0.000"));
        assert!(!output.contains("Cancelled"));
    }

    #[test]
    fn progress_report_shows_signed_variance() {
        let report = ProgressReport {
            as_of: on_date(2026, 3, 4),
            baseline_slot: 0,
            planned_percent: 40.0,
            actual_percent: 25.0,
            activities: vec![ActivityProgress {
                id: "A".to_string(),
                name: "Excavation".to_string(),
                planned_percent: 40.0,
                actual_percent: 25.0,
                variance: -15.0,
            }],
        };
        let output = format_progress_report(&report);
        assert!(output.contains("As of: 2026-03-04"));
        assert!(output.contains("A | 40.0 | 25.0 | -15.0"));
    }

    #[test]
    fn write_serialized_picks_format_from_extension() {
        let temp = assert_fs::TempDir::new().unwrap();
        let scheduled = schedule_project(&build_chain_project(), SchedulingOptions::default()).unwrap();
        let report = ScheduleReport::from_scheduled(&scheduled);

        let json_path = temp.path().join("schedule.json");
        write_serialized(json_path.to_str().unwrap(), &report).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["activities"][0]["early_finish"], "2026-03-09");

        let yaml_path = temp.path().join("schedule.yaml");
        write_serialized(yaml_path.to_str().unwrap(), &report).unwrap();
        let yaml = std::fs::read_to_string(&yaml_path).unwrap();
        assert!(yaml.contains("critical_path:"));
        assert!(yaml.contains("early_finish: 2026-03-09"));
    }
}
