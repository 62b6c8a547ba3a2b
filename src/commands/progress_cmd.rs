use std::process::ExitCode;

use chrono::NaiveDate;

use crate::commands::base_commands::Commands;
use crate::commands::project_input::load_project_input;
use crate::commands::report_format::format_progress_report;
use crate::services::progress::progress_report;

pub fn progress_command(cmd: Commands) -> ExitCode {
    if let Commands::Progress {
        input,
        date,
        slot,
        calendar_dir,
    } = cmd
    {
        let as_of = match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                eprintln!("Failed to parse date {date}: {e}");
                return ExitCode::FAILURE;
            }
        };
        let file = match load_project_input(&input, calendar_dir.as_deref()) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to load project: {e}");
                return ExitCode::FAILURE;
            }
        };
        let slot = slot.unwrap_or(file.project.active_baseline);

        match progress_report(&file.project, as_of, slot) {
            Ok(report) => println!("{}", format_progress_report(&report)),
            Err(e) => {
                eprintln!("Failed to compute progress: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
