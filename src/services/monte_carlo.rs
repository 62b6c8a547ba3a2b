use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use thiserror::Error;

use crate::domain::activity::whole_workdays;
use crate::domain::distribution::DurationDistribution;
use crate::domain::project::Project;
use crate::domain::risk::RiskConfig;
use crate::services::cpm_scheduler::{
    ScheduleNetwork, SchedulingError, SchedulingOptions,
};
use crate::services::duration_sampler::{RngSampler, ThreePointSampler};
use crate::services::risk_applier::RiskRegister;
use crate::services::simulation_types::{
    BaselineComparison, DeterministicReference, InputSnapshot, IterationRecord, SimulationParams,
    SimulationResult,
};
use crate::services::statistics::{
    activity_statistics, cost_summary, histogram, mean_and_std_dev, percentile_table,
};

/// Iterations between progress reports and cancellation checkpoints.
pub const BATCH_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("iterations must be greater than zero")]
    InvalidIterations,
    #[error("failed to prepare the schedule network: {0}")]
    Scheduling(#[from] SchedulingError),
    #[error("simulation worker panicked")]
    WorkerPanicked,
}

/// Shared cancel flag and progress counter for one run.
#[derive(Debug, Clone, Default)]
pub struct SimulationControl {
    cancelled: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
}

impl SimulationControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Iterations finished so far, published once per batch.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn publish(&self, completed: usize) {
        self.completed.store(completed, Ordering::SeqCst);
    }
}

enum IterationOutcome {
    Done(IterationRecord),
    Skipped,
    Cancelled,
}

/// Read-only state shared by every iteration.
struct SimulationContext<'a> {
    network: &'a ScheduleNetwork,
    register: &'a RiskRegister,
    distributions: Vec<Option<DurationDistribution>>,
    base_durations: Vec<f64>,
    completed: Vec<bool>,
    seed: u64,
    control: &'a SimulationControl,
}

impl SimulationContext<'_> {
    fn run_iteration(&self, index: usize) -> IterationOutcome {
        if self.control.is_cancelled() {
            return IterationOutcome::Cancelled;
        }

        let rng = StdRng::seed_from_u64(substream_seed(self.seed, index));
        let mut sampler = RngSampler::new(rng);

        let mut durations = self.base_durations.clone();
        for (node, distribution) in self.distributions.iter().enumerate() {
            if let (Some(distribution), false) = (distribution, self.completed[node]) {
                durations[node] = sampler.sample(distribution);
            }
        }
        let risk_cost = self.register.apply(&mut sampler, &mut durations, &self.completed);

        if !risk_cost.is_finite() || durations.iter().any(|value| !value.is_finite()) {
            tracing::warn!(iteration = index, "non-finite sample, skipping iteration");
            return IterationOutcome::Skipped;
        }

        let whole: Vec<u32> = durations.iter().map(|value| whole_workdays(*value)).collect();
        match self.network.run_with_durations(&whole) {
            Ok(schedule) => IterationOutcome::Done(IterationRecord {
                index,
                finish: schedule.project_finish,
                duration_days: schedule.duration_days,
                critical: schedule.activities.iter().map(|dates| dates.critical).collect(),
                durations,
                risk_cost,
            }),
            Err(err) => {
                tracing::warn!(iteration = index, error = %err, "scheduling failed, skipping iteration");
                IterationOutcome::Skipped
            }
        }
    }

    fn run_batch(&self, batch: Range<usize>) -> Vec<IterationOutcome> {
        #[cfg(feature = "parallel")]
        let outcomes = batch.into_par_iter().map(|index| self.run_iteration(index)).collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes = batch.map(|index| self.run_iteration(index)).collect();
        outcomes
    }
}

/// Runs a simulation to completion with no outside control.
pub fn run_simulation(
    project: &Project,
    risk: &RiskConfig,
    params: &SimulationParams,
    options: SchedulingOptions,
) -> Result<SimulationResult, SimulationError> {
    run_simulation_with_control(project, risk, params, options, &SimulationControl::new(), &|_, _| {})
}

/// Runs `params.iterations` iterations of sample, apply risk, reschedule.
///
/// `on_progress(completed, requested)` is called after every batch. A run
/// cancelled through `control` still returns a result over the iterations
/// that finished.
pub fn run_simulation_with_control(
    project: &Project,
    risk: &RiskConfig,
    params: &SimulationParams,
    options: SchedulingOptions,
    control: &SimulationControl,
    on_progress: &dyn Fn(usize, usize),
) -> Result<SimulationResult, SimulationError> {
    if params.iterations == 0 {
        return Err(SimulationError::InvalidIterations);
    }

    let network = ScheduleNetwork::build(project, options)?;
    let reference = network.run()?;
    let seed = params.seed.unwrap_or_else(|| rand::thread_rng().r#gen());

    for id in risk.distributions.keys() {
        if network.node_index(id).is_none() {
            tracing::warn!(activity = %id, "distribution for unknown activity, ignoring");
        }
    }

    let ids: Vec<String> = (0..network.len())
        .map(|node| network.activity_id(node).to_string())
        .collect();
    let register = RiskRegister::new(&risk.events, &network, params.use_mitigated);
    let context = SimulationContext {
        network: &network,
        register: &register,
        distributions: ids
            .iter()
            .map(|id| risk.distributions.get(id).filter(|dist| !dist.is_none()).copied())
            .collect(),
        base_durations: network.durations().into_iter().map(f64::from).collect(),
        completed: (0..network.len()).map(|node| network.is_complete(node)).collect(),
        seed,
        control,
    };

    tracing::info!(iterations = params.iterations, seed, activities = network.len(), "starting simulation");

    let mut records: Vec<IterationRecord> = Vec::with_capacity(params.iterations);
    let mut skipped = 0;
    let mut cancelled = false;
    let mut batch_start = 0;
    while batch_start < params.iterations {
        if control.is_cancelled() {
            cancelled = true;
            break;
        }
        let batch_end = (batch_start + BATCH_SIZE).min(params.iterations);
        for outcome in context.run_batch(batch_start..batch_end) {
            match outcome {
                IterationOutcome::Done(record) => records.push(record),
                IterationOutcome::Skipped => skipped += 1,
                IterationOutcome::Cancelled => cancelled = true,
            }
        }
        let done = records.len() + skipped;
        control.publish(done);
        on_progress(done, params.iterations);
        tracing::debug!(completed = done, requested = params.iterations, "simulation batch finished");
        if cancelled {
            break;
        }
        batch_start = batch_end;
    }
    records.sort_by_key(|record| record.index);

    if cancelled {
        tracing::info!(completed = records.len(), "simulation cancelled");
    }

    let durations: Vec<i64> = records.iter().map(|record| record.duration_days).collect();
    let (mean_duration, std_dev_duration) =
        mean_and_std_dev(&durations.iter().map(|value| *value as f64).collect::<Vec<_>>());
    let risk_cost = if register.has_cost() {
        let costs: Vec<f64> = records.iter().map(|record| record.risk_cost).collect();
        Some(cost_summary(&costs))
    } else {
        None
    };

    let result = SimulationResult {
        params: params.clone(),
        seed,
        requested_iterations: params.iterations,
        completed_iterations: records.len(),
        skipped_iterations: skipped,
        cancelled,
        deterministic: DeterministicReference {
            finish_date: reference.project_finish,
            duration_days: reference.duration_days,
            critical_path: network.critical_path(&reference),
        },
        mean_duration,
        std_dev_duration,
        percentiles: percentile_table(&records, &params.percentiles),
        histogram: histogram(&durations, params.histogram_bins.max(1)),
        activities: activity_statistics(&records, &ids),
        risk_cost,
        baseline: compare_with_baseline(project, params.baseline_index, &records),
        inputs: InputSnapshot {
            project_name: project.name.clone(),
            project_start: project.start_date,
            status_date: project.status_date,
            activity_count: network.len(),
            risk: risk.clone(),
        },
    };

    tracing::info!(
        completed = result.completed_iterations,
        skipped = result.skipped_iterations,
        mean = result.mean_duration,
        "simulation finished"
    );
    Ok(result)
}

fn compare_with_baseline(
    project: &Project,
    slot: usize,
    records: &[IterationRecord],
) -> Option<BaselineComparison> {
    let baseline_finish = project
        .activities
        .iter()
        .filter(|activity| !activity.is_summary())
        .filter_map(|activity| activity.baseline(slot))
        .map(|snapshot| snapshot.finish)
        .max()?;
    let on_time = records
        .iter()
        .filter(|record| record.finish <= baseline_finish)
        .count();
    let on_or_before_percent = if records.is_empty() {
        0.0
    } else {
        on_time as f64 / records.len() as f64 * 100.0
    };
    Some(BaselineComparison {
        slot,
        baseline_finish,
        on_or_before_percent,
    })
}

/// Seed of iteration `index`'s private generator (splitmix64 finaliser).
fn substream_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed.wrapping_add((index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
