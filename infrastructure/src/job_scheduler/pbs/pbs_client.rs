use std::time::Duration;

use domain::model::entity::Job;
use domain::model::vo::{JobId, JobInfo, MailEvent};
use domain::service::JobScheduler;
use domain::{SchedulerError, SchedulerResult};

use super::{map_state, parse_job_id, parse_qstat};
use crate::command::{self, MaybeSsh, SshProxy};
use crate::config::SchedulerConfig;
use crate::job_scheduler::{
    last_token, query_command_error, render_script, submission_error, submit_command_error,
};

/// `qstat` errors for jobs it no longer (or never) knew about.
const UNKNOWN_JOB_MARKERS: &[&str] = &["Unknown Job Id", "Job has finished"];

pub struct PbsClient {
    qsub: String,
    qstat: String,
    max_walltime_hours: u32,
    timeout: Duration,
    ssh: Option<SshProxy>,
}

impl PbsClient {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            qsub: config.submit_command.clone().unwrap_or_else(|| "qsub".to_owned()),
            qstat: config.status_command.clone().unwrap_or_else(|| "qstat".to_owned()),
            max_walltime_hours: config.max_walltime_hours,
            timeout: config.timeout(),
            ssh: config.ssh_proxy.clone(),
        }
    }

    /// `qsub` options for `job`, Torque flavoured.
    pub fn submit_args(job: &Job, with_hold: bool) -> Vec<String> {
        let resources = job.resources();
        let mut args = Vec::new();

        if !job.name().trim().is_empty() {
            args.extend(["-N".to_owned(), job.name().to_owned()]);
        }
        if let Some(walltime) = resources.walltime() {
            args.extend(["-l".to_owned(), format!("walltime={walltime}")]);
        }
        let nodes = match (resources.cores(), resources.architecture()) {
            (Some(cores), Some(arch)) => Some(format!("nodes=1:ppn={cores}:{arch}")),
            (Some(cores), None) => Some(format!("nodes=1:ppn={cores}")),
            (None, Some(arch)) => Some(format!("nodes=1:{arch}")),
            (None, None) => None,
        };
        if let Some(nodes) = nodes {
            args.extend(["-l".to_owned(), nodes]);
        }
        if let Some(queue) = resources.partition() {
            args.extend(["-q".to_owned(), queue.to_owned()]);
        }
        if let Some(mib) = resources.mem_per_cpu_mib() {
            args.extend(["-l".to_owned(), format!("pmem={mib}mb")]);
        }
        if let Some(workdir) = resources.workdir() {
            args.extend(["-d".to_owned(), workdir.display().to_string()]);
        }
        if let Some(mail_user) = resources.mail_user() {
            args.extend(["-M".to_owned(), mail_user.to_owned()]);
        }
        if !resources.mail_events().is_empty() {
            let events: String = resources
                .mail_events()
                .iter()
                .map(|e| match e {
                    MailEvent::Begin => 'b',
                    MailEvent::End => 'e',
                    MailEvent::Fail => 'a',
                })
                .collect();
            args.extend(["-m".to_owned(), events]);
        }
        if !job.dependencies().is_empty() {
            let deps: Vec<&str> = job.dependencies().iter().map(JobId::as_str).collect();
            args.extend(["-W".to_owned(), format!("depend=afterok:{}", deps.join(":"))]);
        }
        if with_hold {
            args.push("-h".to_owned());
        }
        args
    }
}

impl AsRef<Option<SshProxy>> for PbsClient {
    fn as_ref(&self) -> &Option<SshProxy> {
        &self.ssh
    }
}

#[async_trait::async_trait]
impl JobScheduler for PbsClient {
    fn max_walltime_hours(&self) -> u32 {
        self.max_walltime_hours
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    async fn submit(&self, job: &Job, with_hold: bool, timeout: Duration) -> SchedulerResult<JobId> {
        let args = Self::submit_args(job, with_hold);
        tracing::debug!(name = job.name(), ssh = self.is_ssh(), ?args, "Submitting pbs job");
        let script = render_script(job);

        let out = command::run(self.command(&self.qsub, &args), Some(&script), timeout)
            .await
            .map_err(|e| submit_command_error(e, with_hold))?;
        if !out.success() {
            return Err(submission_error("qsub exited with failure", &out, with_hold));
        }

        last_token(&out.stdout).and_then(parse_job_id).ok_or_else(|| {
            tracing::error!("Failed to parse qsub output: {}", out.stdout);
            submission_error("no job id in qsub output", &out, with_hold)
        })
    }

    async fn query(
        &self,
        id: &JobId,
        types: Option<Vec<String>>,
        timeout: Duration,
    ) -> SchedulerResult<JobInfo> {
        tracing::debug!("getting job id: {id}");
        let args = vec!["-f".to_owned(), id.to_string()];
        let out = command::run(self.command(&self.qstat, &args), None, timeout)
            .await
            .map_err(query_command_error)?;

        if !out.success() {
            if UNKNOWN_JOB_MARKERS.iter().any(|m| out.stderr.contains(m)) {
                return Err(SchedulerError::NotFound(id.clone()));
            }
            return Err(SchedulerError::QueryFailed {
                command: self.qstat.clone(),
                output: out.combined(),
                exit_code: out.code(),
            });
        }

        let attributes = parse_qstat(&out.stdout);
        if attributes.is_empty() {
            return Err(SchedulerError::NotFound(id.clone()));
        }
        let exit_status = attributes.get("exit_status").and_then(|s| s.parse().ok());
        let state = map_state(
            attributes.get("job_state").map(String::as_str).unwrap_or_default(),
            exit_status,
        );
        Ok(JobInfo::new(id, state, attributes, types.as_deref()))
    }
}
