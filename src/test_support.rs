use chrono::NaiveDate;

use crate::domain::activity::{Activity, Predecessor};
use crate::domain::distribution::DurationDistribution;
use crate::domain::project::Project;
use crate::services::duration_sampler::ThreePointSampler;

// A mock ThreePointSampler that always returns the most likely value
pub struct MockSampler {
    pub uniform: f64,
}

impl MockSampler {
    pub fn new() -> Self {
        Self { uniform: 0.0 }
    }
}

impl ThreePointSampler for MockSampler {
    fn uniform(&mut self) -> f64 {
        self.uniform
    }

    fn sample(&mut self, distribution: &DurationDistribution) -> f64 {
        distribution.normalized().most_likely.max(0.0)
    }
}

pub fn on_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn build_task(id: &str, duration: u32, predecessors: &[&str]) -> Activity {
    let mut activity = Activity::task(id, duration);
    activity.predecessors = predecessors
        .iter()
        .map(|pred| Predecessor::finish_to_start(pred))
        .collect();
    activity
}

/// A project starting on Monday 2026-03-02 on the standard calendars.
pub fn project_with(activities: Vec<Activity>) -> Project {
    let mut project = Project::new("Test", on_date(2026, 3, 2));
    project.activities = activities;
    project
}

/// A(5) -> B(3) -> C(2), all finish-to-start.
pub fn build_chain_project() -> Project {
    project_with(vec![
        build_task("A", 5, &[]),
        build_task("B", 3, &["A"]),
        build_task("C", 2, &["B"]),
    ])
}
