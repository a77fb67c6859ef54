use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "jobsched", version, about = "Submit and inspect HPC batch jobs")]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, env = "JOBSCHED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds a single scheduler command may take, overrides the config
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit every job of a batch file, dependencies first
    Submit {
        /// YAML list of jobs
        batch: PathBuf,

        /// Submit all jobs held
        #[arg(long)]
        hold: bool,
    },
    /// Print the submission order of a batch file without submitting
    Plan { batch: PathBuf },
    /// Print the scheduler's view of a job as JSON
    Info {
        job_id: String,

        /// Only report these attributes (repeatable)
        #[arg(short, long = "attr")]
        attrs: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parse_info() {
        let cli = Cli::parse_from(["jobsched", "--timeout", "5", "info", "42", "-a", "State"]);
        assert_eq!(cli.timeout, Some(5));
        match cli.command {
            Command::Info { job_id, attrs } => {
                assert_eq!(job_id, "42");
                assert_eq!(attrs, ["State"]);
            }
            c => panic!("unexpected command: {c:?}"),
        }
    }

    #[test]
    fn parse_submit() {
        let cli = Cli::parse_from(["jobsched", "submit", "--hold", "jobs.yaml"]);
        assert!(matches!(cli.command, Command::Submit { hold: true, .. }));
    }
}
