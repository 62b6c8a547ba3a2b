use std::process::ExitCode;

use crate::commands::base_commands::Commands;
use crate::commands::project_input::load_project_input;
use crate::services::cpm_scheduler::schedule_project;
use crate::services::progress::{clear_baseline, save_baseline};
use crate::services::project_yaml::save_project_file;

pub fn baseline_command(cmd: Commands) -> ExitCode {
    if let Commands::Baseline {
        input,
        output,
        slot,
        clear,
        calendar_dir,
    } = cmd
    {
        let mut file = match load_project_input(&input, calendar_dir.as_deref()) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to load project: {e}");
                return ExitCode::FAILURE;
            }
        };
        let slot = slot.unwrap_or(file.project.active_baseline);

        let message = if clear {
            let cleared = clear_baseline(&mut file.project, slot);
            format!("Cleared baseline {slot} on {cleared} activities")
        } else {
            file.project = match schedule_project(&file.project, file.scheduling) {
                Ok(scheduled) => scheduled.project,
                Err(e) => {
                    eprintln!("Failed to schedule project: {e}");
                    return ExitCode::FAILURE;
                }
            };
            match save_baseline(&mut file.project, slot) {
                Ok(saved) => format!("Saved baseline {slot} for {saved} activities"),
                Err(e) => {
                    eprintln!("Failed to save baseline: {e}");
                    return ExitCode::FAILURE;
                }
            }
        };

        let output = output.unwrap_or(input);
        if let Err(e) = save_project_file(&output, &file) {
            eprintln!("Failed to write project file: {e}");
            return ExitCode::FAILURE;
        }
        println!("{message}");
        println!("Project written to {output}");
    }
    ExitCode::SUCCESS
}
