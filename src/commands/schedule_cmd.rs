use std::process::ExitCode;

use crate::commands::base_commands::Commands;
use crate::commands::project_input::load_project_input;
use crate::commands::report_format::{ScheduleReport, format_schedule_report, write_serialized};
use crate::services::cpm_scheduler::schedule_project;

pub fn schedule_command(cmd: Commands) -> ExitCode {
    if let Commands::Schedule {
        input,
        output,
        calendar_dir,
        status_date_reflow,
    } = cmd
    {
        let file = match load_project_input(&input, calendar_dir.as_deref()) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to load project: {e}");
                return ExitCode::FAILURE;
            }
        };

        let mut options = file.scheduling;
        options.honor_status_date |= status_date_reflow;
        let scheduled = match schedule_project(&file.project, options) {
            Ok(scheduled) => scheduled,
            Err(e) => {
                eprintln!("Failed to schedule project: {e}");
                return ExitCode::FAILURE;
            }
        };

        let report = ScheduleReport::from_scheduled(&scheduled);
        println!("{}", format_schedule_report(&report));
        if let Err(e) = write_serialized(&output, &report) {
            eprintln!("Failed to write schedule output: {e}");
            return ExitCode::FAILURE;
        }
        println!("Schedule written to {output}");
    }
    ExitCode::SUCCESS
}
