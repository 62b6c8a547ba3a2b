pub mod base_commands;
pub mod baseline_cmd;
pub mod progress_cmd;
pub mod project_input;
pub mod report_format;
pub mod schedule_cmd;
pub mod simulate_cmd;
