use std::time::Duration;

use crate::error::SchedulerResult;
use crate::model::entity::Job;
use crate::model::vo::{JobId, JobInfo};

/// Submit and status capability of one batch system.
///
/// Implementations are stateless translators: they turn a [`Job`] into the
/// native submit command, run it, and read the native status output back
/// into a [`JobInfo`]. They never order or track jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait JobScheduler: Send + Sync {
    /// Largest walltime, in hours, accepted by this scheduler.
    fn max_walltime_hours(&self) -> u32;

    /// Process timeout used when the caller does not pass one.
    fn default_timeout(&self) -> Duration;

    async fn submit(&self, job: &Job, with_hold: bool, timeout: Duration)
        -> SchedulerResult<JobId>;

    /// `types` restricts the returned attributes, `None` returns the
    /// scheduler's default set.
    async fn query(
        &self,
        id: &JobId,
        types: Option<Vec<String>>,
        timeout: Duration,
    ) -> SchedulerResult<JobInfo>;
}
