use std::process::ExitCode;
use std::time::Duration;

use crate::commands::base_commands::Commands;
use crate::commands::project_input::load_project_input;
use crate::commands::report_format::{format_simulation_report, write_serialized};
use crate::services::histogram::write_histogram_png;
use crate::services::simulation_worker::SimulationWorker;

const PROGRESS_POLL: Duration = Duration::from_millis(200);

pub fn simulate_command(cmd: Commands) -> ExitCode {
    if let Commands::Simulate {
        input,
        output,
        iterations,
        seed,
        mitigated,
        bins,
        calendar_dir,
    } = cmd
    {
        let file = match load_project_input(&input, calendar_dir.as_deref()) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to load project: {e}");
                return ExitCode::FAILURE;
            }
        };

        let mut params = file.simulation;
        if let Some(iterations) = iterations {
            params.iterations = iterations;
        }
        if seed.is_some() {
            params.seed = seed;
        }
        if let Some(bins) = bins {
            params.histogram_bins = bins;
        }
        params.use_mitigated |= mitigated;

        let worker = SimulationWorker::spawn(file.project, file.risk, params, file.scheduling);
        while !worker.is_finished() {
            std::thread::sleep(PROGRESS_POLL);
            tracing::debug!(progress = worker.progress(), "simulation running");
        }
        let simulation = match worker.join() {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Failed to simulate project: {e}");
                return ExitCode::FAILURE;
            }
        };

        println!("{}", format_simulation_report(&simulation));

        let histogram_path = format!("{output}.png");
        if let Err(e) = write_histogram_png(&histogram_path, &simulation.histogram, &simulation.percentiles) {
            eprintln!("Failed to write simulation histogram: {e}");
        }

        if let Err(e) = write_serialized(&output, &simulation) {
            eprintln!("Failed to write simulation output: {e}");
            return ExitCode::FAILURE;
        }
        println!("Simulation result written to {output}");
        println!("Simulation histogram written to {histogram_path}");
    }
    ExitCode::SUCCESS
}
