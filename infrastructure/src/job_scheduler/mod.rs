mod pbs;
mod script;
mod slurm;

use domain::SchedulerError;

use crate::command::{CommandError, CommandOutput};
use crate::config::{SchedulerConfig, SchedulerKind};

#[rustfmt::skip]
pub use self::{
    pbs::PbsClient,
    script::render_script,
    slurm::SlurmClient,
};

/// Builds the client for the configured scheduler.
pub fn build_scheduler(config: &SchedulerConfig) -> Box<dyn domain::service::JobScheduler> {
    match config.r#type {
        SchedulerKind::Slurm => Box::new(SlurmClient::new(config)),
        SchedulerKind::Pbs => Box::new(PbsClient::new(config)),
    }
}

/// Last whitespace-delimited token of the last non-empty line.
fn last_token(stdout: &str) -> Option<&str> {
    stdout.lines().rev().find(|l| !l.trim().is_empty())?.split_whitespace().last()
}

fn submission_error(reason: impl Into<String>, out: &CommandOutput, with_hold: bool) -> SchedulerError {
    SchedulerError::Submission {
        reason: reason.into(),
        output: out.combined(),
        exit_code: out.code(),
        with_hold,
    }
}

fn submit_command_error(e: CommandError, with_hold: bool) -> SchedulerError {
    match e {
        CommandError::Timeout { command, timeout } => SchedulerError::Timeout { command, timeout },
        CommandError::Spawn { .. } => SchedulerError::Submission {
            reason: e.to_string(),
            output: String::new(),
            exit_code: None,
            with_hold,
        },
    }
}

fn query_command_error(e: CommandError) -> SchedulerError {
    match e {
        CommandError::Timeout { command, timeout } => SchedulerError::Timeout { command, timeout },
        CommandError::Spawn { ref command, .. } => SchedulerError::QueryFailed {
            command: command.clone(),
            output: e.to_string(),
            exit_code: None,
        },
    }
}


#[cfg(test)]
pub(crate) mod fake {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Writes an executable shell script standing in for a scheduler command.
    pub fn command(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
