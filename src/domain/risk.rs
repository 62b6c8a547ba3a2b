use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::distribution::DurationDistribution;

/// Impact of a risk event on a single activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskImpact {
    pub task_id: String,
    pub schedule: DurationDistribution,
    #[serde(default)]
    pub mitigated_schedule: Option<DurationDistribution>,
    #[serde(default)]
    pub cost: DurationDistribution,
    /// Schedule and cost share one uniform draw.
    #[serde(default)]
    pub correlate: bool,
    /// Sample the ranges; otherwise use the most-likely values.
    #[serde(default = "default_true")]
    pub impact_ranges: bool,
    /// Gate the impact on the event occurring; otherwise always applied.
    #[serde(default = "default_true")]
    pub event_existence: bool,
}

impl TaskImpact {
    pub fn schedule_for(&self, use_mitigated: bool) -> &DurationDistribution {
        match (&self.mitigated_schedule, use_mitigated) {
            (Some(mitigated), true) => mitigated,
            _ => &self.schedule,
        }
    }
}

/// Whole-event impact used by events without itemized task impacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegacyImpact {
    AddDays { days: f64, activities: Vec<String> },
    Multiply { factor: f64, activities: Vec<String> },
}

impl LegacyImpact {
    pub fn activities(&self) -> &[String] {
        match self {
            LegacyImpact::AddDays { activities, .. } => activities,
            LegacyImpact::Multiply { activities, .. } => activities,
        }
    }

    pub fn apply(&self, duration: f64) -> f64 {
        match self {
            LegacyImpact::AddDays { days, .. } => duration + days,
            LegacyImpact::Multiply { factor, .. } => duration * factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Percent chance of occurrence (0–100).
    pub probability: f64,
    #[serde(default)]
    pub mitigated_probability: Option<f64>,
    /// Only quantified events take part in simulation.
    #[serde(default = "default_true")]
    pub quantified: bool,
    #[serde(default)]
    pub impacts: Vec<TaskImpact>,
    #[serde(default)]
    pub legacy_impact: Option<LegacyImpact>,
}

impl RiskEvent {
    pub fn probability_for(&self, use_mitigated: bool) -> f64 {
        let probability = match (self.mitigated_probability, use_mitigated) {
            (Some(mitigated), true) => mitigated,
            _ => self.probability,
        };
        if probability.is_finite() {
            probability.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Everything the risk engine needs besides the network itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RiskConfig {
    /// Inherent duration uncertainty per activity id.
    pub distributions: BTreeMap<String, DurationDistribution>,
    pub events: Vec<RiskEvent>,
}

fn default_true() -> bool {
    true
}
