use std::time::Duration;

use domain::model::entity::Job;
use domain::model::vo::{JobId, JobInfo, MailEvent};
use domain::service::JobScheduler;
use domain::{SchedulerError, SchedulerResult};

use super::{map_state, parse_sacct, SACCT_FIELDS};
use crate::command::{self, MaybeSsh, SshProxy};
use crate::config::SchedulerConfig;
use crate::job_scheduler::{
    last_token, query_command_error, render_script, submission_error, submit_command_error,
};

pub struct SlurmClient {
    sbatch: String,
    sacct: String,
    max_walltime_hours: u32,
    timeout: Duration,
    ssh: Option<SshProxy>,
}

impl SlurmClient {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            sbatch: config.submit_command.clone().unwrap_or_else(|| "sbatch".to_owned()),
            sacct: config.status_command.clone().unwrap_or_else(|| "sacct".to_owned()),
            max_walltime_hours: config.max_walltime_hours,
            timeout: config.timeout(),
            ssh: config.ssh_proxy.clone(),
        }
    }

    /// `sbatch` flags for `job`. Unset resources produce no flag at all.
    pub fn submit_args(job: &Job, with_hold: bool) -> Vec<String> {
        let resources = job.resources();
        let mut args = Vec::new();

        if !job.name().trim().is_empty() {
            args.push(format!("--job-name={}", job.name()));
        }
        if let Some(walltime) = resources.walltime() {
            args.push(format!("--time={walltime}"));
        }
        if let Some(cores) = resources.cores() {
            args.push(format!("--ntasks-per-node={cores}"));
        }
        if let Some(partition) = resources.partition() {
            args.push(format!("--partition={partition}"));
        }
        if let Some(mib) = resources.mem_per_cpu_mib() {
            args.push(format!("--mem-per-cpu={mib}M"));
        }
        if let Some(architecture) = resources.architecture() {
            args.push(format!("--constraint={architecture}"));
        }
        if let Some(workdir) = resources.workdir() {
            args.push(format!("--chdir={}", workdir.display()));
        }
        if let Some(mail_user) = resources.mail_user() {
            args.push(format!("--mail-user={mail_user}"));
        }
        if !resources.mail_events().is_empty() {
            let events: Vec<&str> = resources.mail_events().iter().map(MailEvent::as_ref).collect();
            args.push(format!("--mail-type={}", events.join(",")));
        }
        if !job.dependencies().is_empty() {
            let deps: Vec<String> =
                job.dependencies().iter().map(|id| format!("afterok:{id}")).collect();
            args.push(format!("--dependency={}", deps.join(",")));
        }
        if with_hold {
            args.push("--hold".to_owned());
        }
        args
    }

    /// `sbatch` prints `Submitted batch job <id>`.
    pub fn parse_job_id(stdout: &str) -> Option<JobId> {
        last_token(stdout).and_then(JobId::from_numeric)
    }
}

impl AsRef<Option<SshProxy>> for SlurmClient {
    fn as_ref(&self) -> &Option<SshProxy> {
        &self.ssh
    }
}

#[async_trait::async_trait]
impl JobScheduler for SlurmClient {
    fn max_walltime_hours(&self) -> u32 {
        self.max_walltime_hours
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    async fn submit(&self, job: &Job, with_hold: bool, timeout: Duration) -> SchedulerResult<JobId> {
        let args = Self::submit_args(job, with_hold);
        tracing::debug!(name = job.name(), ssh = self.is_ssh(), ?args, "Submitting slurm job");
        let script = render_script(job);

        let out = command::run(self.command(&self.sbatch, &args), Some(&script), timeout)
            .await
            .map_err(|e| submit_command_error(e, with_hold))?;
        if !out.success() {
            return Err(submission_error("sbatch exited with failure", &out, with_hold));
        }

        match Self::parse_job_id(&out.stdout) {
            Some(id) => Ok(id),
            None => {
                tracing::error!("Failed to parse sbatch output: {}", out.stdout);
                Err(submission_error("no job id in sbatch output", &out, with_hold))
            }
        }
    }

    async fn query(
        &self,
        id: &JobId,
        types: Option<Vec<String>>,
        timeout: Duration,
    ) -> SchedulerResult<JobInfo> {
        tracing::debug!("getting job id: {id}");
        let args: Vec<String> = ["-P", "-X", "-j", id.as_str(), "--format", SACCT_FIELDS]
            .into_iter()
            .map(str::to_owned)
            .collect();
        let out = command::run(self.command(&self.sacct, &args), None, timeout)
            .await
            .map_err(query_command_error)?;

        if !out.success() {
            if out.stderr.contains("Invalid job id") {
                return Err(SchedulerError::NotFound(id.clone()));
            }
            return Err(SchedulerError::QueryFailed {
                command: self.sacct.clone(),
                output: out.combined(),
                exit_code: out.code(),
            });
        }

        let rows = parse_sacct(out.stdout.as_bytes()).map_err(|e| SchedulerError::QueryFailed {
            command: self.sacct.clone(),
            output: format!("{e}\n{}", out.stdout),
            exit_code: out.code(),
        })?;
        let position = rows
            .iter()
            .position(|row| row.get("JobID").map(String::as_str) == Some(id.as_str()))
            .unwrap_or(0);
        let Some(row) = rows.into_iter().nth(position) else {
            return Err(SchedulerError::NotFound(id.clone()));
        };

        let state = map_state(row.get("State").map(String::as_str).unwrap_or_default());
        Ok(JobInfo::new(id, state, row, types.as_deref()))
    }
}
