use std::time::Duration;

use crate::model::vo::job_id::JobId;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A job was mutated after it had been handed to the scheduler.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The submit command failed, exited non-zero or printed no usable job id.
    #[error("submission failed (hold: {with_hold}, exit code: {exit_code:?}): {reason}\n{output}")]
    Submission {
        reason: String,
        output: String,
        exit_code: Option<i32>,
        with_hold: bool,
    },

    #[error("job {0} is unknown to the scheduler")]
    NotFound(JobId),

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Rejected before any scheduler command was run.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("status query `{command}` failed (exit code: {exit_code:?}): {output}")]
    QueryFailed {
        command: String,
        output: String,
        exit_code: Option<i32>,
    },
}

impl SchedulerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
