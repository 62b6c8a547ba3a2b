use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::risk::RiskConfig;

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;
pub const DEFAULT_PERCENTILES: [f64; 6] = [0.0, 10.0, 50.0, 80.0, 90.0, 100.0];

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub iterations: usize,
    /// `None` draws a seed from system entropy; the seed used is reported.
    pub seed: Option<u64>,
    pub use_mitigated: bool,
    pub histogram_bins: usize,
    pub percentiles: Vec<f64>,
    pub baseline_index: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            use_mitigated: false,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            baseline_index: 0,
        }
    }
}

/// Everything one iteration contributes to the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub index: usize,
    pub finish: NaiveDate,
    pub duration_days: i64,
    /// Indexed by network node.
    pub critical: Vec<bool>,
    /// Sampled durations after risk, indexed by network node.
    pub durations: Vec<f64>,
    pub risk_cost: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PercentileRow {
    pub percentile: f64,
    pub duration_days: i64,
    pub finish_date: NaiveDate,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub cumulative_percent: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActivityStatistics {
    pub id: String,
    pub criticality_percent: f64,
    /// Spearman rank correlation with project duration.
    pub sensitivity: f64,
    pub mean_duration: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CostSummary {
    pub mean: f64,
    pub p50: f64,
    pub p80: f64,
    pub p90: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BaselineComparison {
    pub slot: usize,
    pub baseline_finish: NaiveDate,
    /// Percent of iterations finishing on or before the baseline finish.
    pub on_or_before_percent: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeterministicReference {
    pub finish_date: NaiveDate,
    pub duration_days: i64,
    pub critical_path: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    pub project_name: String,
    pub project_start: NaiveDate,
    pub status_date: Option<NaiveDate>,
    pub activity_count: usize,
    pub risk: RiskConfig,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub params: SimulationParams,
    pub seed: u64,
    pub requested_iterations: usize,
    pub completed_iterations: usize,
    pub skipped_iterations: usize,
    pub cancelled: bool,
    pub deterministic: DeterministicReference,
    pub mean_duration: f64,
    pub std_dev_duration: f64,
    pub percentiles: Vec<PercentileRow>,
    pub histogram: Vec<HistogramBin>,
    pub activities: Vec<ActivityStatistics>,
    pub risk_cost: Option<CostSummary>,
    pub baseline: Option<BaselineComparison>,
    pub inputs: InputSnapshot,
}

impl SimulationResult {
    pub fn percentile(&self, percentile: f64) -> Option<&PercentileRow> {
        self.percentiles
            .iter()
            .find(|row| (row.percentile - percentile).abs() < f64::EPSILON)
    }

    pub fn activity(&self, id: &str) -> Option<&ActivityStatistics> {
        self.activities.iter().find(|activity| activity.id == id)
    }
}
