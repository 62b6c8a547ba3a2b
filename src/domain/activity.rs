use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Task,
    Milestone,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predecessor {
    pub activity_id: String,
    pub link_type: LinkType,
    /// Signed lag in working days of the successor's calendar.
    pub lag_days: i64,
}

impl Predecessor {
    pub fn finish_to_start(activity_id: &str) -> Self {
        Self {
            activity_id: activity_id.to_string(),
            link_type: LinkType::FinishToStart,
            lag_days: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintType {
    /// Start no earlier than
    #[serde(rename = "SNET")]
    StartNoEarlierThan,
    /// Start no later than
    #[serde(rename = "SNLT")]
    StartNoLaterThan,
    /// Must start on
    #[serde(rename = "MSO")]
    MustStartOn,
    /// Must finish on
    #[serde(rename = "MFO")]
    MustFinishOn,
    /// Finish no earlier than
    #[serde(rename = "FNET")]
    FinishNoEarlierThan,
    /// Finish no later than
    #[serde(rename = "FNLT")]
    FinishNoLaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    pub date: NaiveDate,
}

/// Frozen copy of an activity's schedule taken by an explicit save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineSnapshot {
    pub duration: u32,
    pub start: NaiveDate,
    pub finish: NaiveDate,
    pub calendar_id: String,
    pub percent_complete: f64,
    pub status_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAssignment {
    pub resource_id: String,
    pub units: f64,
}

/// Derived by the scheduler; never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySchedule {
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub total_float: i64,
    pub critical: bool,
    pub constraint_violated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub kind: ActivityKind,
    pub wbs_level: u32,
    pub duration: u32,
    /// `None` means derived from duration and percent complete.
    pub remaining_duration: Option<u32>,
    /// `None` means the project's default calendar.
    pub calendar_id: Option<String>,
    pub percent_complete: f64,
    pub predecessors: Vec<Predecessor>,
    pub constraint: Option<Constraint>,
    pub schedule: Option<ActivitySchedule>,
    pub baselines: Vec<Option<BaselineSnapshot>>,
    pub resources: Vec<ResourceAssignment>,
    pub weight: f64,
}

impl Activity {
    pub fn new(id: &str, name: &str, kind: ActivityKind, duration: u32) -> Self {
        let duration = if kind == ActivityKind::Task { duration } else { 0 };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            wbs_level: 1,
            duration,
            remaining_duration: None,
            calendar_id: None,
            percent_complete: 0.0,
            predecessors: Vec::new(),
            constraint: None,
            schedule: None,
            baselines: Vec::new(),
            resources: Vec::new(),
            weight: 1.0,
        }
    }

    pub fn task(id: &str, duration: u32) -> Self {
        Self::new(id, id, ActivityKind::Task, duration)
    }

    pub fn milestone(id: &str) -> Self {
        Self::new(id, id, ActivityKind::Milestone, 0)
    }

    pub fn summary(id: &str) -> Self {
        Self::new(id, id, ActivityKind::Summary, 0)
    }

    pub fn is_summary(&self) -> bool {
        self.kind == ActivityKind::Summary
    }

    pub fn is_complete(&self) -> bool {
        self.percent_complete >= 100.0
    }

    pub fn baseline(&self, slot: usize) -> Option<&BaselineSnapshot> {
        self.baselines.get(slot).and_then(|snapshot| snapshot.as_ref())
    }
}

/// Rounds a fractional duration up to whole workdays; a started day is a
/// consumed day. Tolerates float noise just above an integer.
pub fn whole_workdays(days: f64) -> u32 {
    if !days.is_finite() || days <= 0.0 {
        return 0;
    }
    (days - 1e-9).ceil().max(0.0) as u32
}
