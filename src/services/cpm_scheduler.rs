use std::collections::HashMap;

use chrono::NaiveDate;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use thiserror::Error;

use crate::domain::activity::{
    ActivitySchedule, Constraint, ConstraintType, LinkType, whole_workdays,
};
use crate::domain::calendar::{CalendarError, WorkCalendar};
use crate::domain::project::Project;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("project has no activities to schedule")]
    EmptyProject,
    #[error("duplicate activity id {0}")]
    DuplicateActivity(String),
    #[error("predecessor {predecessor} not found for activity {activity}")]
    UnknownPredecessor {
        activity: String,
        predecessor: String,
    },
    #[error("activity {0} lists itself as a predecessor")]
    SelfLink(String),
    #[error("link between {activity} and summary {summary} is not allowed")]
    SummaryLink { activity: String, summary: String },
    #[error("calendar error for activity {activity}: {source}")]
    Calendar {
        activity: String,
        #[source]
        source: CalendarError,
    },
    #[error("dependency graph has a cycle through {}", .0.join(", "))]
    GraphCycle(Vec<String>),
    #[error("expected {expected} durations, got {actual}")]
    DurationCount { expected: usize, actual: usize },
    #[error("activity {activity} spans {days} workdays, more than the supported {MAX_SCHEDULE_WORKDAYS}")]
    DurationOutOfRange { activity: String, days: i64 },
    #[error("schedule of activity {0} runs past the supported date range")]
    DateOutOfRange(String),
}

/// Largest duration, remaining duration or lag accepted for one activity.
pub const MAX_SCHEDULE_WORKDAYS: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulingOptions {
    /// Reflow in-progress work from the status date instead of scheduling
    /// by position only.
    pub honor_status_date: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub project_start: NaiveDate,
    pub project_finish: NaiveDate,
    pub duration_days: i64,
    /// Critical activity ids in topological order.
    pub critical_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledProject {
    pub project: Project,
    pub summary: ScheduleSummary,
}

/// Result of one pass over a [`ScheduleNetwork`], indexed by network node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSchedule {
    pub activities: Vec<ActivitySchedule>,
    pub project_start: NaiveDate,
    pub project_finish: NaiveDate,
    pub duration_days: i64,
}

#[derive(Debug, Clone)]
struct Edge {
    node: usize,
    link_type: LinkType,
    lag: i64,
}

#[derive(Debug, Clone)]
struct NetworkNode {
    id: String,
    activity_index: usize,
    calendar: WorkCalendar,
    duration: u32,
    percent_complete: f64,
    complete: bool,
    remaining_duration: Option<u32>,
    constraint: Option<Constraint>,
    predecessors: Vec<Edge>,
    successors: Vec<Edge>,
}

impl NetworkNode {
    fn reflows(&self, status_date: Option<NaiveDate>) -> Option<NaiveDate> {
        let in_progress = self.percent_complete > 0.0 && self.percent_complete < 100.0;
        if in_progress { status_date } else { None }
    }

    fn remaining_for(&self, duration: u32) -> i64 {
        match self.remaining_duration {
            Some(remaining) if self.duration > 0 => {
                whole_workdays(remaining as f64 * duration as f64 / self.duration as f64) as i64
            }
            Some(remaining) => remaining as i64,
            None => {
                let left = 1.0 - self.percent_complete.clamp(0.0, 100.0) / 100.0;
                whole_workdays(duration as f64 * left) as i64
            }
        }
    }
}

/// A validated activity network ready to be scheduled repeatedly.
///
/// Building the network resolves calendars, rejects bad links and orders
/// the graph once; [`ScheduleNetwork::run_with_durations`] then schedules
/// substitute durations without touching the source project.
#[derive(Debug, Clone)]
pub struct ScheduleNetwork {
    nodes: Vec<NetworkNode>,
    order: Vec<usize>,
    project_start: NaiveDate,
    default_calendar: WorkCalendar,
    status_date: Option<NaiveDate>,
}

impl ScheduleNetwork {
    pub fn build(project: &Project, options: SchedulingOptions) -> Result<Self, SchedulingError> {
        let mut index_by_id: HashMap<&str, usize> = HashMap::new();
        for (idx, activity) in project.activities.iter().enumerate() {
            if index_by_id.insert(activity.id.as_str(), idx).is_some() {
                return Err(SchedulingError::DuplicateActivity(activity.id.clone()));
            }
        }

        let mut nodes = Vec::new();
        let mut node_by_activity: HashMap<usize, usize> = HashMap::new();
        for (idx, activity) in project.activities.iter().enumerate() {
            if activity.is_summary() {
                if let Some(link) = activity.predecessors.first() {
                    return Err(SchedulingError::SummaryLink {
                        activity: link.activity_id.clone(),
                        summary: activity.id.clone(),
                    });
                }
                continue;
            }
            let calendar = project
                .calendars
                .resolve(activity.calendar_id.as_deref())
                .map_err(|source| SchedulingError::Calendar {
                    activity: activity.id.clone(),
                    source,
                })?;
            check_span(&activity.id, activity.duration as i64)?;
            if let Some(remaining) = activity.remaining_duration {
                check_span(&activity.id, remaining as i64)?;
            }
            node_by_activity.insert(idx, nodes.len());
            nodes.push(NetworkNode {
                id: activity.id.clone(),
                activity_index: idx,
                calendar: calendar.clone(),
                duration: activity.duration,
                percent_complete: activity.percent_complete,
                complete: activity.is_complete(),
                remaining_duration: activity.remaining_duration,
                constraint: activity.constraint,
                predecessors: Vec::new(),
                successors: Vec::new(),
            });
        }

        if nodes.is_empty() {
            return Err(SchedulingError::EmptyProject);
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let graph_nodes: Vec<NodeIndex> = (0..nodes.len()).map(|idx| graph.add_node(idx)).collect();

        for node_idx in 0..nodes.len() {
            let activity = &project.activities[nodes[node_idx].activity_index];
            for link in &activity.predecessors {
                if link.activity_id == activity.id {
                    return Err(SchedulingError::SelfLink(activity.id.clone()));
                }
                let pred_activity = index_by_id.get(link.activity_id.as_str()).ok_or_else(|| {
                    SchedulingError::UnknownPredecessor {
                        activity: activity.id.clone(),
                        predecessor: link.activity_id.clone(),
                    }
                })?;
                let pred_node = node_by_activity.get(pred_activity).copied().ok_or_else(|| {
                    SchedulingError::SummaryLink {
                        activity: activity.id.clone(),
                        summary: link.activity_id.clone(),
                    }
                })?;
                check_span(&activity.id, link.lag_days)?;

                nodes[node_idx].predecessors.push(Edge {
                    node: pred_node,
                    link_type: link.link_type,
                    lag: link.lag_days,
                });
                nodes[pred_node].successors.push(Edge {
                    node: node_idx,
                    link_type: link.link_type,
                    lag: link.lag_days,
                });
                graph.add_edge(graph_nodes[pred_node], graph_nodes[node_idx], ());
            }
        }

        let order = match toposort(&graph, None) {
            Ok(sorted) => sorted.into_iter().map(|idx| graph[idx]).collect(),
            Err(cycle) => {
                let members = cycle_members(&graph, cycle.node_id(), &nodes);
                tracing::warn!(activities = ?members, "dependency cycle blocks scheduling");
                return Err(SchedulingError::GraphCycle(members));
            }
        };

        let status_date = if options.honor_status_date {
            project.status_date
        } else {
            None
        };

        Ok(Self {
            nodes,
            order,
            project_start: project.start_date,
            default_calendar: project.calendars.default_calendar().clone(),
            status_date,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn activity_id(&self, node: usize) -> &str {
        &self.nodes[node].id
    }

    pub fn node_index(&self, activity_id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == activity_id)
    }

    /// Deterministic durations in node order.
    pub fn durations(&self) -> Vec<u32> {
        self.nodes.iter().map(|node| node.duration).collect()
    }

    pub fn is_complete(&self, node: usize) -> bool {
        self.nodes[node].complete
    }

    pub fn run(&self) -> Result<NetworkSchedule, SchedulingError> {
        self.schedule_with(&self.durations())
    }

    pub fn run_with_durations(&self, durations: &[u32]) -> Result<NetworkSchedule, SchedulingError> {
        if durations.len() != self.nodes.len() {
            return Err(SchedulingError::DurationCount {
                expected: self.nodes.len(),
                actual: durations.len(),
            });
        }
        for (node, duration) in self.nodes.iter().zip(durations) {
            check_span(&node.id, *duration as i64)?;
        }
        self.schedule_with(durations)
    }

    /// Critical activity ids in topological order.
    pub fn critical_path(&self, schedule: &NetworkSchedule) -> Vec<String> {
        self.order
            .iter()
            .filter(|node| schedule.activities[**node].critical)
            .map(|node| self.nodes[*node].id.clone())
            .collect()
    }

    /// Copies the project and writes the schedule into the copy, rolling
    /// summaries up from their children.
    pub fn apply(&self, project: &Project, schedule: &NetworkSchedule) -> Project {
        let mut scheduled = project.clone();
        for activity in &mut scheduled.activities {
            activity.schedule = None;
        }
        for (node, dates) in self.nodes.iter().zip(&schedule.activities) {
            scheduled.activities[node.activity_index].schedule = Some(dates.clone());
        }

        for idx in 0..scheduled.activities.len() {
            if !scheduled.activities[idx].is_summary() {
                continue;
            }
            let children: Vec<ActivitySchedule> = scheduled
                .descendants_of(idx)
                .into_iter()
                .filter(|child| !scheduled.activities[*child].is_summary())
                .filter_map(|child| scheduled.activities[child].schedule.clone())
                .collect();
            scheduled.activities[idx].schedule = roll_up(&children);
        }
        scheduled
    }

    fn schedule_with(&self, durations: &[u32]) -> Result<NetworkSchedule, SchedulingError> {
        let count = self.nodes.len();
        let project_start = self.default_calendar.next_workday(self.project_start);
        let mut early: Vec<(NaiveDate, NaiveDate)> = vec![(project_start, project_start); count];
        let mut spans = vec![0_i64; count];
        let mut violated = vec![false; count];

        for &idx in &self.order {
            let node = &self.nodes[idx];
            let calendar = &node.calendar;
            let duration = durations[idx] as i64;

            let mut start = calendar.next_workday(project_start);
            for edge in &node.predecessors {
                let (pred_start, pred_finish) = early[edge.node];
                // the predecessor's trailing days off may be workdays here
                let released = self.nodes[edge.node]
                    .calendar
                    .day_after_work(pred_start, pred_finish);
                let candidate = match edge.link_type {
                    LinkType::FinishToStart => {
                        calendar.add_workdays(calendar.next_workday(released), edge.lag)
                    }
                    LinkType::StartToStart => {
                        calendar.add_workdays(calendar.next_workday(pred_start), edge.lag)
                    }
                    LinkType::FinishToFinish => {
                        let finish = calendar.add_workdays(calendar.next_workday(released), edge.lag);
                        calendar.add_workdays(finish, -duration)
                    }
                    LinkType::StartToFinish => {
                        let finish =
                            calendar.add_workdays(calendar.next_workday(pred_start), edge.lag);
                        calendar.add_workdays(finish, -duration)
                    }
                };
                start = start.max(candidate);
            }
            start = calendar.next_workday(start);

            if let Some(constraint) = node.constraint {
                let pinned = calendar.next_workday(constraint.date);
                match constraint.constraint_type {
                    ConstraintType::StartNoEarlierThan => start = start.max(pinned),
                    ConstraintType::FinishNoEarlierThan => {
                        start = start.max(calendar.add_workdays(pinned, -duration))
                    }
                    ConstraintType::MustStartOn => {
                        violated[idx] = start > pinned;
                        start = pinned;
                    }
                    ConstraintType::MustFinishOn => {
                        let pinned_start = calendar.add_workdays(pinned, -duration);
                        violated[idx] = start > pinned_start;
                        start = pinned_start;
                    }
                    ConstraintType::StartNoLaterThan | ConstraintType::FinishNoLaterThan => {}
                }
            }

            let finish = match node.reflows(self.status_date) {
                Some(status_date) => {
                    let resume = start.max(calendar.next_workday(status_date));
                    calendar.add_workdays(resume, node.remaining_for(durations[idx]))
                }
                None => calendar.add_workdays(start, duration),
            };

            if let Some(constraint) = node.constraint {
                match constraint.constraint_type {
                    ConstraintType::StartNoLaterThan => violated[idx] = start > constraint.date,
                    ConstraintType::FinishNoLaterThan => {
                        violated[idx] = finish > calendar.next_workday(constraint.date)
                    }
                    _ => {}
                }
            }

            early[idx] = (start, finish);
            spans[idx] = calendar.workdays_between(start, finish);
        }

        self.check_range(&early)?;
        let project_finish = early
            .iter()
            .map(|(_, finish)| *finish)
            .max()
            .unwrap_or(project_start);

        let mut late: Vec<(NaiveDate, NaiveDate)> = vec![(project_finish, project_finish); count];
        for &idx in self.order.iter().rev() {
            let node = &self.nodes[idx];
            let calendar = &node.calendar;
            let span = spans[idx];

            let mut finish = calendar.next_workday(project_finish);
            for edge in &node.successors {
                let (succ_start, succ_finish) = late[edge.node];
                let succ_calendar = &self.nodes[edge.node].calendar;
                // finishes roll forward and starts roll back onto this calendar
                let candidate = match edge.link_type {
                    LinkType::FinishToStart => {
                        calendar.next_workday(succ_calendar.add_workdays(succ_start, -edge.lag))
                    }
                    LinkType::StartToStart => {
                        let start = succ_calendar.add_workdays(succ_start, -edge.lag);
                        calendar.add_workdays(calendar.previous_workday(start), span)
                    }
                    LinkType::FinishToFinish => {
                        calendar.next_workday(succ_calendar.add_workdays(succ_finish, -edge.lag))
                    }
                    LinkType::StartToFinish => {
                        let start = succ_calendar.add_workdays(succ_finish, -edge.lag);
                        calendar.add_workdays(calendar.previous_workday(start), span)
                    }
                };
                finish = finish.min(candidate);
            }

            if let Some(constraint) = node.constraint {
                let pinned = calendar.next_workday(constraint.date);
                match constraint.constraint_type {
                    ConstraintType::MustStartOn => finish = calendar.add_workdays(pinned, span),
                    ConstraintType::MustFinishOn => finish = pinned,
                    ConstraintType::StartNoLaterThan => {
                        let latest_start = calendar.previous_workday(constraint.date);
                        finish = finish.min(calendar.add_workdays(latest_start, span));
                    }
                    ConstraintType::FinishNoLaterThan => finish = finish.min(pinned),
                    ConstraintType::StartNoEarlierThan | ConstraintType::FinishNoEarlierThan => {}
                }
            }

            late[idx] = (calendar.add_workdays(finish, -span), finish);
        }
        self.check_range(&late)?;

        let activities = (0..count)
            .map(|idx| {
                let (early_start, early_finish) = early[idx];
                let (late_start, late_finish) = late[idx];
                let total_float = self.nodes[idx]
                    .calendar
                    .workdays_between(early_finish, late_finish);
                ActivitySchedule {
                    early_start,
                    early_finish,
                    late_start,
                    late_finish,
                    total_float,
                    critical: total_float <= 0,
                    constraint_violated: violated[idx],
                }
            })
            .collect();

        Ok(NetworkSchedule {
            activities,
            project_start,
            project_finish,
            duration_days: self
                .default_calendar
                .workdays_between(project_start, project_finish),
        })
    }

    fn check_range(&self, dates: &[(NaiveDate, NaiveDate)]) -> Result<(), SchedulingError> {
        let out_of_range = |date: NaiveDate| date == NaiveDate::MAX || date == NaiveDate::MIN;
        match dates
            .iter()
            .position(|(start, finish)| out_of_range(*start) || out_of_range(*finish))
        {
            Some(idx) => Err(SchedulingError::DateOutOfRange(self.nodes[idx].id.clone())),
            None => Ok(()),
        }
    }
}

fn check_span(activity: &str, days: i64) -> Result<(), SchedulingError> {
    if days.abs() > MAX_SCHEDULE_WORKDAYS {
        return Err(SchedulingError::DurationOutOfRange {
            activity: activity.to_string(),
            days,
        });
    }
    Ok(())
}

/// Schedules a project and returns a scheduled copy; the input is left
/// untouched, so on error no derived fields are applied anywhere.
pub fn schedule_project(
    project: &Project,
    options: SchedulingOptions,
) -> Result<ScheduledProject, SchedulingError> {
    let network = ScheduleNetwork::build(project, options)?;
    let schedule = network.run()?;
    let summary = ScheduleSummary {
        project_start: schedule.project_start,
        project_finish: schedule.project_finish,
        duration_days: schedule.duration_days,
        critical_path: network.critical_path(&schedule),
    };
    tracing::debug!(
        activities = network.len(),
        finish = %summary.project_finish,
        duration_days = summary.duration_days,
        "scheduled project"
    );
    Ok(ScheduledProject {
        project: network.apply(project, &schedule),
        summary,
    })
}

fn roll_up(children: &[ActivitySchedule]) -> Option<ActivitySchedule> {
    let first = children.first()?;
    let mut rolled = first.clone();
    for child in &children[1..] {
        rolled.early_start = rolled.early_start.min(child.early_start);
        rolled.early_finish = rolled.early_finish.max(child.early_finish);
        rolled.late_start = rolled.late_start.min(child.late_start);
        rolled.late_finish = rolled.late_finish.max(child.late_finish);
        rolled.total_float = rolled.total_float.min(child.total_float);
        rolled.critical |= child.critical;
        rolled.constraint_violated |= child.constraint_violated;
    }
    Some(rolled)
}

fn cycle_members(graph: &DiGraph<usize, ()>, start: NodeIndex, nodes: &[NetworkNode]) -> Vec<String> {
    let component = tarjan_scc(graph)
        .into_iter()
        .find(|component| component.contains(&start))
        .unwrap_or_else(|| vec![start]);
    let mut members: Vec<usize> = component.into_iter().map(|idx| graph[idx]).collect();
    members.sort_unstable();
    members.into_iter().map(|idx| nodes[idx].id.clone()).collect()
}
