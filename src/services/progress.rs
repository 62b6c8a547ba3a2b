use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::activity::{Activity, BaselineSnapshot};
use crate::domain::calendar::{CalendarError, CalendarSet};
use crate::domain::project::Project;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BaselineError {
    #[error("activity {0} is not scheduled; schedule the project before saving a baseline")]
    Unscheduled(String),
    #[error("no baseline saved in slot {0}")]
    EmptySlot(usize),
    #[error("calendar error for activity {activity}: {source}")]
    Calendar {
        activity: String,
        #[source]
        source: CalendarError,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActivityProgress {
    pub id: String,
    pub name: String,
    pub planned_percent: f64,
    pub actual_percent: f64,
    /// Actual minus planned; negative means behind.
    pub variance: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub as_of: NaiveDate,
    pub baseline_slot: usize,
    pub planned_percent: f64,
    pub actual_percent: f64,
    pub activities: Vec<ActivityProgress>,
}

/// Freezes the current schedule of every scheduled activity into `slot`.
///
/// Fails without touching the project when a non-summary activity has no
/// schedule. Returns the number of snapshots written.
pub fn save_baseline(project: &mut Project, slot: usize) -> Result<usize, BaselineError> {
    let mut snapshots = Vec::with_capacity(project.activities.len());
    for activity in &project.activities {
        let Some(schedule) = &activity.schedule else {
            if activity.is_summary() {
                snapshots.push(None);
                continue;
            }
            return Err(BaselineError::Unscheduled(activity.id.clone()));
        };
        let calendar = project
            .calendars
            .resolve(activity.calendar_id.as_deref())
            .map_err(|source| BaselineError::Calendar {
                activity: activity.id.clone(),
                source,
            })?;
        snapshots.push(Some(BaselineSnapshot {
            duration: activity.duration,
            start: schedule.early_start,
            finish: schedule.early_finish,
            calendar_id: calendar.id.clone(),
            percent_complete: activity.percent_complete,
            status_date: project.status_date,
        }));
    }

    let mut saved = 0;
    for (activity, snapshot) in project.activities.iter_mut().zip(snapshots) {
        if snapshot.is_some() {
            saved += 1;
        }
        if activity.baselines.len() <= slot {
            activity.baselines.resize(slot + 1, None);
        }
        activity.baselines[slot] = snapshot;
    }
    tracing::info!(slot, activities = saved, "saved baseline");
    Ok(saved)
}

/// Empties `slot` on every activity; returns how many snapshots were removed.
pub fn clear_baseline(project: &mut Project, slot: usize) -> usize {
    let mut cleared = 0;
    for activity in &mut project.activities {
        if let Some(snapshot) = activity.baselines.get_mut(slot) {
            if snapshot.take().is_some() {
                cleared += 1;
            }
        }
    }
    tracing::info!(slot, activities = cleared, "cleared baseline");
    cleared
}

/// Percent of the activity the baseline in `slot` planned done by `target`.
///
/// `None` when the slot is empty for this activity. Progress recorded at
/// save time splits the line at the status date so the curve passes
/// through the recorded percent.
pub fn planned_percent_at(
    activity: &Activity,
    target: NaiveDate,
    calendars: &CalendarSet,
    slot: usize,
) -> Result<Option<f64>, BaselineError> {
    let Some(snapshot) = activity.baseline(slot) else {
        return Ok(None);
    };
    let calendar = calendars
        .resolve(Some(&snapshot.calendar_id))
        .map_err(|source| BaselineError::Calendar {
            activity: activity.id.clone(),
            source,
        })?;
    let (start, finish) = (snapshot.start, snapshot.finish);

    if target >= finish {
        return Ok(Some(100.0));
    }
    if target <= start {
        return Ok(Some(0.0));
    }

    let recorded = snapshot.percent_complete.clamp(0.0, 100.0);
    let planned = match snapshot.status_date {
        Some(status) if recorded > 0.0 && start < status && status < finish => {
            if target <= status {
                recorded * calendar.elapsed_working_ratio(start, status, target)
            } else {
                recorded + (100.0 - recorded) * calendar.elapsed_working_ratio(status, finish, target)
            }
        }
        _ => 100.0 * calendar.elapsed_working_ratio(start, finish, target),
    };
    Ok(Some(planned))
}

/// Planned against actual progress as of `target` for every non-summary
/// activity with a baseline in `slot`, with weight-averaged totals.
pub fn progress_report(
    project: &Project,
    target: NaiveDate,
    slot: usize,
) -> Result<ProgressReport, BaselineError> {
    let mut activities = Vec::new();
    let (mut planned_sum, mut actual_sum, mut weight_sum) = (0.0, 0.0, 0.0);

    for activity in project.activities.iter().filter(|activity| !activity.is_summary()) {
        let Some(planned) = planned_percent_at(activity, target, &project.calendars, slot)? else {
            continue;
        };
        let actual = activity.percent_complete.clamp(0.0, 100.0);
        let weight = activity.weight.max(0.0);
        planned_sum += planned * weight;
        actual_sum += actual * weight;
        weight_sum += weight;
        activities.push(ActivityProgress {
            id: activity.id.clone(),
            name: activity.name.clone(),
            planned_percent: planned,
            actual_percent: actual,
            variance: actual - planned,
        });
    }

    if activities.is_empty() {
        return Err(BaselineError::EmptySlot(slot));
    }
    let average = |sum: f64| if weight_sum > 0.0 { sum / weight_sum } else { 0.0 };
    Ok(ProgressReport {
        as_of: target,
        baseline_slot: slot,
        planned_percent: average(planned_sum),
        actual_percent: average(actual_sum),
        activities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cpm_scheduler::{SchedulingOptions, schedule_project};
    use crate::test_support::{build_chain_project, on_date};

    fn baselined_chain() -> Project {
        let mut project = schedule_project(&build_chain_project(), SchedulingOptions::default())
            .unwrap()
            .project;
        save_baseline(&mut project, 0).unwrap();
        project
    }

    #[test]
    fn save_baseline_snapshots_every_scheduled_activity() {
        let project = baselined_chain();
        let a = project.activity("A").unwrap().baseline(0).unwrap();
        assert_eq!(a.start, on_date(2026, 3, 2));
        assert_eq!(a.finish, on_date(2026, 3, 9));
        assert_eq!(a.duration, 5);
        assert_eq!(a.calendar_id, "5day");
    }

    #[test]
    fn save_baseline_requires_a_schedule() {
        let mut project = build_chain_project();
        assert_eq!(
            save_baseline(&mut project, 0).unwrap_err(),
            BaselineError::Unscheduled("A".to_string())
        );
        assert!(project.activities.iter().all(|activity| activity.baselines.is_empty()));
    }

    #[test]
    fn baselines_survive_rescheduling_until_cleared() {
        let mut project = baselined_chain();
        project.activity_mut("A").unwrap().duration = 8;
        let mut rescheduled = schedule_project(&project, SchedulingOptions::default())
            .unwrap()
            .project;
        assert_eq!(
            rescheduled.activity("A").unwrap().baseline(0).unwrap().finish,
            on_date(2026, 3, 9)
        );

        assert_eq!(clear_baseline(&mut rescheduled, 0), 3);
        assert!(rescheduled.activity("A").unwrap().baseline(0).is_none());
        assert_eq!(clear_baseline(&mut rescheduled, 4), 0);
    }

    #[test]
    fn baseline_slots_are_independent() {
        let mut project = baselined_chain();
        save_baseline(&mut project, 2).unwrap();
        let a = project.activity("A").unwrap();
        assert_eq!(a.baselines.len(), 3);
        assert!(a.baseline(1).is_none());
        assert!(a.baseline(2).is_some());
    }

    #[test]
    fn planned_percent_runs_from_zero_to_hundred() {
        let project = baselined_chain();
        let a = project.activity("A").unwrap();
        let planned = |date| planned_percent_at(a, date, &project.calendars, 0).unwrap().unwrap();

        assert_eq!(planned(on_date(2026, 2, 27)), 0.0);
        assert_eq!(planned(on_date(2026, 3, 2)), 0.0);
        assert_eq!(planned(on_date(2026, 3, 4)), 40.0);
        assert_eq!(planned(on_date(2026, 3, 7)), 100.0); // Saturday after the last workday
        assert_eq!(planned(on_date(2026, 3, 9)), 100.0);
        assert_eq!(planned(on_date(2026, 4, 1)), 100.0);
    }

    #[test]
    fn recorded_progress_splits_the_planned_curve() {
        let mut project = schedule_project(&build_chain_project(), SchedulingOptions::default())
            .unwrap()
            .project;
        project.status_date = Some(on_date(2026, 3, 3));
        project.activity_mut("A").unwrap().percent_complete = 60.0;
        save_baseline(&mut project, 0).unwrap();

        let a = project.activity("A").unwrap();
        let planned = |date| planned_percent_at(a, date, &project.calendars, 0).unwrap().unwrap();
        assert_eq!(planned(on_date(2026, 3, 3)), 60.0);
        assert_eq!(planned(on_date(2026, 3, 2)), 0.0);
        // one of the four workdays between status and finish
        assert_eq!(planned(on_date(2026, 3, 4)), 70.0);
        assert_eq!(planned(on_date(2026, 3, 9)), 100.0);
    }

    #[test]
    fn empty_slot_has_no_planned_percent() {
        let project = baselined_chain();
        let a = project.activity("A").unwrap();
        assert_eq!(
            planned_percent_at(a, on_date(2026, 3, 4), &project.calendars, 3).unwrap(),
            None
        );
    }

    #[test]
    fn progress_report_weights_activities() {
        let mut project = baselined_chain();
        project.activity_mut("A").unwrap().percent_complete = 100.0;
        project.activity_mut("A").unwrap().weight = 3.0;

        let report = progress_report(&project, on_date(2026, 3, 9), 0).unwrap();
        assert_eq!(report.activities.len(), 3);
        let a = &report.activities[0];
        assert_eq!(a.planned_percent, 100.0);
        assert_eq!(a.variance, 0.0);
        // weights 3, 1, 1: planned 100/0/0, actual 100/0/0
        assert_eq!(report.planned_percent, 60.0);
        assert_eq!(report.actual_percent, 60.0);
    }

    #[test]
    fn progress_report_without_baseline_is_an_error() {
        let project = build_chain_project();
        assert_eq!(
            progress_report(&project, on_date(2026, 3, 9), 0).unwrap_err(),
            BaselineError::EmptySlot(0)
        );
    }
}
