use clap::{Parser, Subcommand};
use clap_complete::Shell;
use chrono::Local;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the critical path schedule of a project
    Schedule {
        /// Project YAML file
        #[arg(short, long)]
        input: String,
        /// Output YAML or JSON file
        #[arg(short, long)]
        output: String,
        /// Optional path to a calendar directory
        #[arg(short, long)]
        calendar_dir: Option<String>,
        /// Move unfinished work to start no earlier than the status date
        #[arg(long)]
        status_date_reflow: bool,
    },
    /// Run a Monte Carlo schedule risk simulation
    Simulate {
        /// Project YAML file
        #[arg(short, long)]
        input: String,
        /// Output YAML or JSON file
        #[arg(short, long)]
        output: String,
        /// Number of simulation iterations (overrides the project file)
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        /// Random seed (overrides the project file)
        #[arg(long)]
        seed: Option<u64>,
        /// Use post-mitigation risk values
        #[arg(long)]
        mitigated: bool,
        /// Number of histogram bins (overrides the project file)
        #[arg(long)]
        bins: Option<usize>,
        /// Optional path to a calendar directory
        #[arg(short, long)]
        calendar_dir: Option<String>,
    },
    /// Save or clear a baseline snapshot in the project file
    Baseline {
        /// Project YAML file
        #[arg(short, long)]
        input: String,
        /// Output project YAML file (defaults to the input file)
        #[arg(short, long)]
        output: Option<String>,
        /// Baseline slot (defaults to the project's active baseline)
        #[arg(long)]
        slot: Option<usize>,
        /// Clear the slot instead of saving it
        #[arg(long)]
        clear: bool,
        /// Optional path to a calendar directory
        #[arg(short, long)]
        calendar_dir: Option<String>,
    },
    /// Compare planned against actual progress as of a date
    Progress {
        /// Project YAML file
        #[arg(short, long)]
        input: String,
        /// As-of date (YYYY-MM-DD)
        #[arg(short, long, default_value_t = default_as_of_date())]
        date: String,
        /// Baseline slot (defaults to the project's active baseline)
        #[arg(long)]
        slot: Option<usize>,
        /// Optional path to a calendar directory
        #[arg(short, long)]
        calendar_dir: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn default_as_of_date() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_defaults_date_to_today() {
        let args = CliArgs::parse_from(["cpm-risk", "progress", "-i", "project.yaml"]);

        if let Commands::Progress {
            date,
            slot,
            calendar_dir,
            ..
        } = args.command
        {
            assert_eq!(date, default_as_of_date());
            assert_eq!(slot, None);
            assert_eq!(calendar_dir, None);
        } else {
            panic!("expected progress command");
        }
    }

    #[test]
    fn simulate_overrides_are_optional() {
        let args = CliArgs::parse_from([
            "cpm-risk",
            "simulate",
            "-i",
            "project.yaml",
            "-o",
            "result.yaml",
            "--seed",
            "42",
            "--mitigated",
        ]);

        if let Commands::Simulate {
            iterations,
            seed,
            mitigated,
            bins,
            ..
        } = args.command
        {
            assert_eq!(iterations, None);
            assert_eq!(seed, Some(42));
            assert!(mitigated);
            assert_eq!(bins, None);
        } else {
            panic!("expected simulate command");
        }
    }

    #[test]
    fn baseline_output_defaults_to_none() {
        let args = CliArgs::parse_from(["cpm-risk", "baseline", "-i", "p.yaml", "--slot", "2", "--clear"]);

        if let Commands::Baseline {
            output, slot, clear, ..
        } = args.command
        {
            assert_eq!(output, None);
            assert_eq!(slot, Some(2));
            assert!(clear);
        } else {
            panic!("expected baseline command");
        }
    }

    #[test]
    fn baseline_accepts_a_calendar_directory() {
        let args = CliArgs::parse_from(["cpm-risk", "baseline", "-i", "p.yaml", "-c", "calendars"]);

        if let Commands::Baseline { calendar_dir, .. } = args.command {
            assert_eq!(calendar_dir.as_deref(), Some("calendars"));
        } else {
            panic!("expected baseline command");
        }
    }
}
