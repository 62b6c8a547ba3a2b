use chrono::NaiveDate;

use crate::domain::activity::Activity;
use crate::domain::calendar::CalendarSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub start_date: NaiveDate,
    /// As-of date of the recorded progress.
    pub status_date: Option<NaiveDate>,
    pub calendars: CalendarSet,
    /// Activities in outline (WBS) order.
    pub activities: Vec<Activity>,
    /// Baseline slot used for planned-vs-actual comparisons.
    pub active_baseline: usize,
}

impl Project {
    pub fn new(name: &str, start_date: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            start_date,
            status_date: None,
            calendars: CalendarSet::standard(),
            activities: Vec::new(),
            active_baseline: 0,
        }
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|activity| activity.id == id)
    }

    pub fn activity_mut(&mut self, id: &str) -> Option<&mut Activity> {
        self.activities.iter_mut().find(|activity| activity.id == id)
    }

    /// The outermost summary row, if the outline has one.
    pub fn root_summary(&self) -> Option<&Activity> {
        self.activities
            .iter()
            .filter(|activity| activity.is_summary())
            .min_by_key(|activity| activity.wbs_level)
    }

    /// Indices of the rows nested under the row at `index`: the following
    /// rows with a deeper WBS level, up to the next row at the same or a
    /// shallower level.
    pub fn descendants_of(&self, index: usize) -> Vec<usize> {
        let Some(parent) = self.activities.get(index) else {
            return Vec::new();
        };
        self.activities
            .iter()
            .enumerate()
            .skip(index + 1)
            .take_while(|(_, activity)| activity.wbs_level > parent.wbs_level)
            .map(|(idx, _)| idx)
            .collect()
    }
}
