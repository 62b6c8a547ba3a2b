use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use cpm_risk::commands::base_commands::{CliArgs, Commands};
use cpm_risk::commands::baseline_cmd::baseline_command;
use cpm_risk::commands::progress_cmd::progress_command;
use cpm_risk::commands::schedule_cmd::schedule_command;
use cpm_risk::commands::simulate_cmd::simulate_command;

fn main() -> ExitCode {
    cpm_risk::logging::init();
    let args = CliArgs::parse();
    match args.command {
        cmd @ Commands::Schedule { .. } => schedule_command(cmd),
        cmd @ Commands::Simulate { .. } => simulate_command(cmd),
        cmd @ Commands::Baseline { .. } => baseline_command(cmd),
        cmd @ Commands::Progress { .. } => progress_command(cmd),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut CliArgs::command(), "cpm-risk", &mut io::stdout());
            ExitCode::SUCCESS
        }
    }
}
