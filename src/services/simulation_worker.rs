use std::thread::JoinHandle;

use crate::domain::project::Project;
use crate::domain::risk::RiskConfig;
use crate::services::cpm_scheduler::SchedulingOptions;
use crate::services::monte_carlo::{SimulationControl, SimulationError, run_simulation_with_control};
use crate::services::simulation_types::{SimulationParams, SimulationResult};

/// A simulation running on its own thread.
pub struct SimulationWorker {
    control: SimulationControl,
    requested: usize,
    handle: JoinHandle<Result<SimulationResult, SimulationError>>,
}

impl SimulationWorker {
    /// Starts the run; inputs are moved into the worker so the caller can
    /// keep editing its own copy.
    pub fn spawn(
        project: Project,
        risk: RiskConfig,
        params: SimulationParams,
        options: SchedulingOptions,
    ) -> Self {
        let control = SimulationControl::new();
        let requested = params.iterations;
        let worker_control = control.clone();
        let handle = std::thread::spawn(move || {
            run_simulation_with_control(&project, &risk, &params, options, &worker_control, &|_, _| {})
        });
        Self {
            control,
            requested,
            handle,
        }
    }

    pub fn completed_iterations(&self) -> usize {
        self.control.completed()
    }

    /// Fraction of requested iterations finished, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        (self.completed_iterations() as f64 / self.requested as f64).min(1.0)
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<SimulationResult, SimulationError> {
        self.handle
            .join()
            .map_err(|_| SimulationError::WorkerPanicked)?
    }
}
