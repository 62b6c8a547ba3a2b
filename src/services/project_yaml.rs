use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::activity::{
    Activity, ActivityKind, ActivitySchedule, BaselineSnapshot, Constraint, ConstraintType,
    LinkType, Predecessor, ResourceAssignment,
};
use crate::domain::calendar::{CalendarError, CalendarSet};
use crate::domain::distribution::DurationDistribution;
use crate::domain::project::Project;
use crate::domain::risk::{RiskConfig, RiskEvent};
use crate::services::calendar_yaml::{
    CalendarRecord, CalendarRecordError, calendar_from_record, calendar_to_record,
};
use crate::services::cpm_scheduler::SchedulingOptions;
use crate::services::simulation_types::SimulationParams;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum ProjectYamlError {
    #[error("failed to read project yaml: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse project yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing activity id")]
    MissingActivityId,
    #[error("invalid date format: {0}")]
    InvalidDate(String),
    #[error("invalid calendar {id}: {source}")]
    Calendar {
        id: String,
        #[source]
        source: CalendarRecordError,
    },
    #[error("invalid default calendar: {0}")]
    DefaultCalendar(#[from] CalendarError),
}

/// A project file: the network plus everything needed to analyse it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFile {
    pub project: Project,
    pub risk: RiskConfig,
    pub simulation: SimulationParams,
    pub scheduling: SchedulingOptions,
}

impl ProjectFile {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            risk: RiskConfig::default(),
            simulation: SimulationParams::default(),
            scheduling: SchedulingOptions::default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ProjectRecord {
    name: String,
    start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_calendar: Option<String>,
    #[serde(default)]
    active_baseline: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    calendars: Vec<CalendarRecord>,
    #[serde(default)]
    scheduling: SchedulingRecord,
    #[serde(default)]
    simulation: SimulationRecord,
    #[serde(default)]
    risk: RiskRecord,
    activities: Vec<ActivityRecord>,
}

#[derive(Serialize, Deserialize, Default)]
struct SchedulingRecord {
    #[serde(default)]
    honor_status_date: bool,
}

#[derive(Serialize, Deserialize, Default)]
struct SimulationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(default)]
    use_mitigated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    histogram_bins: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    percentiles: Option<Vec<f64>>,
    /// Defaults to the project's active baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    baseline_index: Option<usize>,
}

#[derive(Serialize, Deserialize, Default)]
struct RiskRecord {
    #[serde(default)]
    events: Vec<RiskEvent>,
}

#[derive(Serialize, Deserialize)]
struct ActivityRecord {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default = "default_kind")]
    kind: ActivityKind,
    #[serde(default = "default_wbs_level")]
    wbs_level: u32,
    #[serde(default)]
    duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remaining_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calendar: Option<String>,
    #[serde(default)]
    percent_complete: f64,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    predecessors: Vec<PredecessorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constraint: Option<ConstraintRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distribution: Option<DurationDistribution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    resources: Vec<ResourceRecord>,
    /// Written for reference only; recomputed on every schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule: Option<ScheduleRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    baselines: Vec<Option<BaselineRecord>>,
}

/// `- A` is shorthand for a finish-to-start link without lag.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PredecessorRecord {
    Id(String),
    Link {
        id: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        link_type: Option<LinkType>,
        #[serde(default)]
        lag: i64,
    },
}

#[derive(Serialize, Deserialize)]
struct ConstraintRecord {
    #[serde(rename = "type")]
    constraint_type: ConstraintType,
    date: String,
}

#[derive(Serialize, Deserialize)]
struct ResourceRecord {
    id: String,
    #[serde(default = "default_weight")]
    units: f64,
}

#[derive(Serialize, Deserialize)]
struct ScheduleRecord {
    early_start: String,
    early_finish: String,
    late_start: String,
    late_finish: String,
    total_float: i64,
    critical: bool,
    #[serde(default)]
    constraint_violated: bool,
}

#[derive(Serialize, Deserialize)]
struct BaselineRecord {
    duration: u32,
    start: String,
    finish: String,
    calendar: String,
    #[serde(default)]
    percent_complete: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_date: Option<String>,
}

fn default_kind() -> ActivityKind {
    ActivityKind::Task
}

fn default_wbs_level() -> u32 {
    1
}

fn default_weight() -> f64 {
    1.0
}

pub fn load_project_file<P: AsRef<Path>>(path: P) -> Result<ProjectFile, ProjectYamlError> {
    let contents = std::fs::read_to_string(path)?;
    deserialize_project_file_from_yaml_str(&contents)
}

pub fn deserialize_project_file_from_yaml_str(input: &str) -> Result<ProjectFile, ProjectYamlError> {
    let record: ProjectRecord = serde_yaml::from_str(input)?;

    let mut calendars = CalendarSet::standard();
    for calendar in record.calendars {
        let fallback = calendar.id.clone().unwrap_or_default();
        let calendar = calendar_from_record(calendar, &fallback).map_err(|source| {
            ProjectYamlError::Calendar {
                id: fallback.clone(),
                source,
            }
        })?;
        calendars.insert(calendar);
    }
    if let Some(default_id) = record.default_calendar.as_deref() {
        calendars.set_default(default_id)?;
    }

    let mut project = Project::new(&record.name, parse_date(&record.start_date)?);
    project.status_date = parse_date_opt(record.status_date.as_deref())?;
    project.calendars = calendars;
    project.active_baseline = record.active_baseline;

    let mut risk = RiskConfig {
        distributions: Default::default(),
        events: record.risk.events,
    };
    for activity_record in record.activities {
        if activity_record.id.trim().is_empty() {
            return Err(ProjectYamlError::MissingActivityId);
        }
        if let Some(distribution) = activity_record.distribution {
            risk.distributions.insert(activity_record.id.clone(), distribution);
        }
        project.activities.push(activity_from_record(activity_record)?);
    }

    let defaults = SimulationParams::default();
    let simulation = SimulationParams {
        iterations: record.simulation.iterations.unwrap_or(defaults.iterations),
        seed: record.simulation.seed,
        use_mitigated: record.simulation.use_mitigated,
        histogram_bins: record.simulation.histogram_bins.unwrap_or(defaults.histogram_bins),
        percentiles: record.simulation.percentiles.unwrap_or(defaults.percentiles),
        baseline_index: record
            .simulation
            .baseline_index
            .unwrap_or(record.active_baseline),
    };

    Ok(ProjectFile {
        project,
        risk,
        simulation,
        scheduling: SchedulingOptions {
            honor_status_date: record.scheduling.honor_status_date,
        },
    })
}

pub fn serialize_project_file_to_yaml<W: Write>(writer: &mut W, file: &ProjectFile) -> io::Result<()> {
    let yaml = serde_yaml::to_string(&project_to_record(file)).map_err(io::Error::other)?;
    writer.write_all(yaml.as_bytes())
}

pub fn save_project_file<P: AsRef<Path>>(path: P, file: &ProjectFile) -> io::Result<()> {
    let mut buffer = Vec::new();
    serialize_project_file_to_yaml(&mut buffer, file)?;
    std::fs::write(path, buffer)
}

fn activity_from_record(record: ActivityRecord) -> Result<Activity, ProjectYamlError> {
    let name = record.name.unwrap_or_else(|| record.id.clone());
    let mut activity = Activity::new(&record.id, &name, record.kind, record.duration);
    activity.wbs_level = record.wbs_level;
    activity.remaining_duration = record.remaining_duration;
    activity.calendar_id = record.calendar;
    activity.percent_complete = record.percent_complete;
    activity.weight = record.weight;
    activity.predecessors = record
        .predecessors
        .into_iter()
        .map(|predecessor| match predecessor {
            PredecessorRecord::Id(id) => Predecessor::finish_to_start(&id),
            PredecessorRecord::Link { id, link_type, lag } => Predecessor {
                activity_id: id,
                link_type: link_type.unwrap_or(LinkType::FinishToStart),
                lag_days: lag,
            },
        })
        .collect();
    activity.constraint = record
        .constraint
        .map(|constraint| {
            Ok::<_, ProjectYamlError>(Constraint {
                constraint_type: constraint.constraint_type,
                date: parse_date(&constraint.date)?,
            })
        })
        .transpose()?;
    activity.resources = record
        .resources
        .into_iter()
        .map(|resource| ResourceAssignment {
            resource_id: resource.id,
            units: resource.units,
        })
        .collect();
    activity.baselines = record
        .baselines
        .into_iter()
        .map(|slot| slot.map(baseline_from_record).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(activity)
}

fn baseline_from_record(record: BaselineRecord) -> Result<BaselineSnapshot, ProjectYamlError> {
    Ok(BaselineSnapshot {
        duration: record.duration,
        start: parse_date(&record.start)?,
        finish: parse_date(&record.finish)?,
        calendar_id: record.calendar,
        percent_complete: record.percent_complete,
        status_date: parse_date_opt(record.status_date.as_deref())?,
    })
}

fn project_to_record(file: &ProjectFile) -> ProjectRecord {
    let project = &file.project;
    let presets = CalendarSet::standard();
    let calendars = project
        .calendars
        .iter()
        .filter(|calendar| presets.resolve(Some(&calendar.id)).ok() != Some(*calendar))
        .map(calendar_to_record)
        .collect();

    ProjectRecord {
        name: project.name.clone(),
        start_date: format_date(project.start_date),
        status_date: project.status_date.map(format_date),
        default_calendar: Some(project.calendars.default_id().to_string()),
        active_baseline: project.active_baseline,
        calendars,
        scheduling: SchedulingRecord {
            honor_status_date: file.scheduling.honor_status_date,
        },
        simulation: SimulationRecord {
            iterations: Some(file.simulation.iterations),
            seed: file.simulation.seed,
            use_mitigated: file.simulation.use_mitigated,
            histogram_bins: Some(file.simulation.histogram_bins),
            percentiles: Some(file.simulation.percentiles.clone()),
            baseline_index: Some(file.simulation.baseline_index)
                .filter(|slot| *slot != project.active_baseline),
        },
        risk: RiskRecord {
            events: file.risk.events.clone(),
        },
        activities: project
            .activities
            .iter()
            .map(|activity| activity_to_record(activity, file.risk.distributions.get(&activity.id)))
            .collect(),
    }
}

fn activity_to_record(activity: &Activity, distribution: Option<&DurationDistribution>) -> ActivityRecord {
    ActivityRecord {
        id: activity.id.clone(),
        name: (activity.name != activity.id).then(|| activity.name.clone()),
        kind: activity.kind,
        wbs_level: activity.wbs_level,
        duration: activity.duration,
        remaining_duration: activity.remaining_duration,
        calendar: activity.calendar_id.clone(),
        percent_complete: activity.percent_complete,
        weight: activity.weight,
        predecessors: activity
            .predecessors
            .iter()
            .map(|link| match (link.link_type, link.lag_days) {
                (LinkType::FinishToStart, 0) => PredecessorRecord::Id(link.activity_id.clone()),
                (link_type, lag) => PredecessorRecord::Link {
                    id: link.activity_id.clone(),
                    link_type: Some(link_type),
                    lag,
                },
            })
            .collect(),
        constraint: activity.constraint.map(|constraint| ConstraintRecord {
            constraint_type: constraint.constraint_type,
            date: format_date(constraint.date),
        }),
        distribution: distribution.copied(),
        resources: activity
            .resources
            .iter()
            .map(|resource| ResourceRecord {
                id: resource.resource_id.clone(),
                units: resource.units,
            })
            .collect(),
        schedule: activity.schedule.as_ref().map(schedule_to_record),
        baselines: activity
            .baselines
            .iter()
            .map(|slot| {
                slot.as_ref().map(|snapshot| BaselineRecord {
                    duration: snapshot.duration,
                    start: format_date(snapshot.start),
                    finish: format_date(snapshot.finish),
                    calendar: snapshot.calendar_id.clone(),
                    percent_complete: snapshot.percent_complete,
                    status_date: snapshot.status_date.map(format_date),
                })
            })
            .collect(),
    }
}

fn schedule_to_record(schedule: &ActivitySchedule) -> ScheduleRecord {
    ScheduleRecord {
        early_start: format_date(schedule.early_start),
        early_finish: format_date(schedule.early_finish),
        late_start: format_date(schedule.late_start),
        late_finish: format_date(schedule.late_finish),
        total_float: schedule.total_float,
        critical: schedule.critical,
        constraint_violated: schedule.constraint_violated,
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, ProjectYamlError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ProjectYamlError::InvalidDate(value.to_string()))
}

fn parse_date_opt(value: Option<&str>) -> Result<Option<NaiveDate>, ProjectYamlError> {
    value.map(parse_date).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::distribution::DistributionKind;
    use crate::domain::risk::LegacyImpact;
    use crate::services::cpm_scheduler::schedule_project;
    use crate::test_support::on_date;

    const PROJECT_YAML: &str = r#"
name: Warehouse
start_date: 2026-03-02
status_date: 2026-03-11
default_calendar: site
calendars:
  - id: site
    working_weekdays: [Mon, Tue, Wed, Thu, Fri, Sat]
    holidays:
      - start_date: 2026-04-03
scheduling:
  honor_status_date: true
simulation:
  iterations: 500
  seed: 42
activities:
  - id: ROOT
    kind: summary
    wbs_level: 0
  - id: A
    name: Excavation
    duration: 5
    percent_complete: 40
    distribution: { type: beta_pert, min: 4, most_likely: 5, max: 9 }
  - id: B
    duration: 3
    calendar: 5day
    predecessors:
      - A
      - { id: A, type: SS, lag: 2 }
    constraint: { type: FNLT, date: 2026-03-20 }
    resources:
      - id: crew
        units: 2
  - id: M
    kind: milestone
    predecessors: [B]
risk:
  events:
    - id: R1
      name: Rock
      probability: 30
      impacts:
        - task_id: A
          schedule: { type: triangular, min: 1, most_likely: 2, max: 4 }
      legacy_impact: { type: add_days, days: 2, activities: [B] }
"#;

    #[test]
    fn deserialize_full_project_file() {
        let file = deserialize_project_file_from_yaml_str(PROJECT_YAML).unwrap();
        let project = &file.project;

        assert_eq!(project.name, "Warehouse");
        assert_eq!(project.start_date, on_date(2026, 3, 2));
        assert_eq!(project.status_date, Some(on_date(2026, 3, 11)));
        assert_eq!(project.calendars.default_id(), "site");
        assert!(!project.calendars.default_calendar().is_workday(on_date(2026, 4, 3)));
        assert_eq!(project.activities.len(), 4);
        assert_eq!(project.root_summary().unwrap().id, "ROOT");

        let a = project.activity("A").unwrap();
        assert_eq!(a.name, "Excavation");
        assert_eq!(a.kind, ActivityKind::Task);
        assert_eq!(a.wbs_level, 1);
        assert_eq!(a.weight, 1.0);

        let b = project.activity("B").unwrap();
        assert_eq!(b.predecessors[0], Predecessor::finish_to_start("A"));
        assert_eq!(b.predecessors[1].link_type, LinkType::StartToStart);
        assert_eq!(b.predecessors[1].lag_days, 2);
        assert_eq!(
            b.constraint.unwrap().constraint_type,
            ConstraintType::FinishNoLaterThan
        );
        assert_eq!(b.resources[0].units, 2.0);

        assert_eq!(project.activity("M").unwrap().kind, ActivityKind::Milestone);

        assert_eq!(file.risk.distributions["A"].kind, DistributionKind::BetaPert);
        assert_eq!(file.risk.events[0].impacts[0].task_id, "A");
        assert!(file.risk.events[0].quantified);
        assert!(matches!(
            file.risk.events[0].legacy_impact,
            Some(LegacyImpact::AddDays { .. })
        ));
        assert_eq!(file.simulation.iterations, 500);
        assert_eq!(file.simulation.seed, Some(42));
        assert_eq!(file.simulation.histogram_bins, SimulationParams::default().histogram_bins);
        assert!(file.scheduling.honor_status_date);
    }

    #[test]
    fn saved_file_loads_back_to_the_same_project() {
        let mut file = deserialize_project_file_from_yaml_str(PROJECT_YAML).unwrap();
        file.project = schedule_project(&file.project, file.scheduling).unwrap().project;
        crate::services::progress::save_baseline(&mut file.project, 1).unwrap();

        let mut buffer = Vec::new();
        serialize_project_file_to_yaml(&mut buffer, &file).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("early_start: 2026-03-02"));
        assert!(!output.contains("id: 7day"));

        let mut reloaded = deserialize_project_file_from_yaml_str(&output).unwrap();
        assert!(reloaded.project.activities.iter().all(|activity| activity.schedule.is_none()));
        reloaded.project = schedule_project(&reloaded.project, reloaded.scheduling)
            .unwrap()
            .project;
        assert_eq!(reloaded, file);
    }

    #[test]
    fn deserialize_rejects_invalid_date() {
        let yaml = "name: Demo\nstart_date: 2026-99-01\nactivities: []\n";
        let error = deserialize_project_file_from_yaml_str(yaml).unwrap_err();
        assert!(matches!(error, ProjectYamlError::InvalidDate(_)));
    }

    #[test]
    fn deserialize_rejects_missing_id() {
        let yaml = "name: Demo\nstart_date: 2026-03-02\nactivities:\n  - id: \"\"\n";
        let error = deserialize_project_file_from_yaml_str(yaml).unwrap_err();
        assert!(matches!(error, ProjectYamlError::MissingActivityId));
    }

    #[test]
    fn deserialize_rejects_unknown_default_calendar() {
        let yaml = "name: Demo\nstart_date: 2026-03-02\ndefault_calendar: lunar\nactivities: []\n";
        let error = deserialize_project_file_from_yaml_str(yaml).unwrap_err();
        assert!(matches!(
            error,
            ProjectYamlError::DefaultCalendar(CalendarError::UnknownCalendar(_))
        ));
    }

    #[test]
    fn deserialize_rejects_unknown_link_type() {
        let yaml = r#"
name: Demo
start_date: 2026-03-02
activities:
  - id: A
    predecessors:
      - { id: B, type: XX }
"#;
        let error = deserialize_project_file_from_yaml_str(yaml).unwrap_err();
        assert!(matches!(error, ProjectYamlError::Parse(_)));
    }

    #[test]
    fn simulation_baseline_follows_the_active_baseline() {
        let yaml = "name: Demo\nstart_date: 2026-03-02\nactive_baseline: 2\nactivities: []\n";
        let file = deserialize_project_file_from_yaml_str(yaml).unwrap();
        assert_eq!(file.project.active_baseline, 2);
        assert_eq!(file.simulation.baseline_index, 2);

        let yaml = "name: Demo\nstart_date: 2026-03-02\nactive_baseline: 2\nsimulation:\n  baseline_index: 1\nactivities: []\n";
        let mut file = deserialize_project_file_from_yaml_str(yaml).unwrap();
        assert_eq!(file.simulation.baseline_index, 1);

        let mut buffer = Vec::new();
        serialize_project_file_to_yaml(&mut buffer, &file).unwrap();
        let reloaded = deserialize_project_file_from_yaml_str(std::str::from_utf8(&buffer).unwrap()).unwrap();
        assert_eq!(reloaded.simulation.baseline_index, 1);

        file.simulation.baseline_index = 2;
        let mut buffer = Vec::new();
        serialize_project_file_to_yaml(&mut buffer, &file).unwrap();
        let yaml = String::from_utf8(buffer).unwrap();
        assert!(!yaml.contains("baseline_index"));
    }

    #[test]
    fn defaults_fill_an_unconfigured_file() {
        let yaml = "name: Demo\nstart_date: 2026-03-02\nactivities:\n  - id: A\n    duration: 2\n";
        let file = deserialize_project_file_from_yaml_str(yaml).unwrap();
        assert_eq!(file.simulation, SimulationParams::default());
        assert_eq!(file.scheduling, SchedulingOptions::default());
        assert!(file.risk.events.is_empty());
        assert_eq!(file.project.calendars.default_id(), "5day");
    }
}
