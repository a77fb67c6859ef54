use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::error::{SchedulerError, SchedulerResult};
use crate::model::vo::{HoldType, JobId, JobInfo, ResourceSpec};
use crate::service::JobScheduler;

/// One value or a sequence of values, e.g. job ids or attribute names.
pub trait OneOrMany {
    fn into_vec(self) -> Vec<String>;
}

impl OneOrMany for &str {
    fn into_vec(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl OneOrMany for String {
    fn into_vec(self) -> Vec<String> {
        vec![self]
    }
}

impl OneOrMany for &String {
    fn into_vec(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl OneOrMany for &JobId {
    fn into_vec(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl<S: AsRef<str>> OneOrMany for Vec<S> {
    fn into_vec(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_owned()).collect()
    }
}

impl<S: AsRef<str>> OneOrMany for &[S] {
    fn into_vec(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_owned()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> OneOrMany for [S; N] {
    fn into_vec(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_owned()).collect()
    }
}

/// A unit of work for the batch scheduler.
///
/// The job only learns its id through [`Job::submit`]. Dependencies are
/// plain ids; the jobs behind them are never looked at.
#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    script: String,
    env_vars: BTreeMap<String, String>,
    resources: ResourceSpec,
    dependencies: Vec<JobId>,
    holds: BTreeSet<HoldType>,
    id: Option<JobId>,
}

impl Job {
    pub fn new(script: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            env_vars: BTreeMap::new(),
            resources: ResourceSpec::default(),
            dependencies: Vec::new(),
            holds: BTreeSet::new(),
            id: None,
        }
    }

    /// Copies the given variables into the job.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars.extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_resources(mut self, resources: ResourceSpec) -> Self {
        self.resources = resources;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env_vars
    }

    pub fn resources(&self) -> &ResourceSpec {
        &self.resources
    }

    pub fn dependencies(&self) -> &[JobId] {
        &self.dependencies
    }

    pub fn holds(&self) -> &BTreeSet<HoldType> {
        &self.holds
    }

    /// Scheduler id, set once a submission succeeded.
    pub fn id(&self) -> Option<&JobId> {
        self.id.as_ref()
    }

    /// Appends job ids this job must wait for. Duplicates are kept.
    pub fn add_dependencies(&mut self, job_ids: impl OneOrMany) -> SchedulerResult<()> {
        self.ensure_unsubmitted("add dependencies to")?;
        let ids = job_ids
            .into_vec()
            .into_iter()
            .map(|raw| {
                JobId::from_numeric(&raw).ok_or_else(|| {
                    SchedulerError::validation(format!("`{raw}` is not a job id"))
                })
            })
            .collect::<SchedulerResult<Vec<_>>>()?;
        tracing::debug!(name = %self.name, ?ids, "Adding job dependencies");
        self.dependencies.extend(ids);
        Ok(())
    }

    /// Depends on an already submitted job.
    pub fn add_dependency_on(&mut self, other: &Job) -> SchedulerResult<()> {
        let id = other.id().ok_or_else(|| {
            SchedulerError::invalid_state(format!(
                "job `{}` has no id yet, submit it before depending on it",
                other.name
            ))
        })?;
        self.add_dependencies(id)
    }

    pub fn add_hold(&mut self, token: &str) -> SchedulerResult<()> {
        let hold = HoldType::parse(token)?;
        self.add_hold_type(hold)
    }

    pub fn add_hold_type(&mut self, hold: HoldType) -> SchedulerResult<()> {
        self.ensure_unsubmitted("place a hold on")?;
        self.holds.insert(hold);
        Ok(())
    }

    pub async fn submit<S>(&mut self, scheduler: &S, with_hold: bool) -> SchedulerResult<&JobId>
    where
        S: JobScheduler + ?Sized,
    {
        let timeout = scheduler.default_timeout();
        self.submit_with_timeout(scheduler, with_hold, timeout).await
    }

    /// Hands the job to `scheduler` and records the returned id.
    ///
    /// Jobs carrying a hold marker are always submitted held. Submitting
    /// twice is not prevented.
    pub async fn submit_with_timeout<S>(
        &mut self,
        scheduler: &S,
        with_hold: bool,
        timeout: Duration,
    ) -> SchedulerResult<&JobId>
    where
        S: JobScheduler + ?Sized,
    {
        self.validate(scheduler.max_walltime_hours())?;
        if let Some(id) = &self.id {
            tracing::warn!(job_id = %id, name = %self.name, "Job is submitted again");
        }

        let with_hold = with_hold || !self.holds.is_empty();
        let submitted = scheduler.submit(self, with_hold, timeout).await;
        match submitted {
            Ok(id) => {
                tracing::debug!(job_id = %id, name = %self.name, with_hold, "Job submitted");
                let id: &JobId = self.id.insert(id);
                Ok(id)
            }
            Err(e) => {
                tracing::error!(name = %self.name, with_hold, "Failed to submit job: {e}");
                Err(e)
            }
        }
    }

    /// All attributes the scheduler reports, `None` if never submitted.
    pub async fn info<S>(&self, scheduler: &S) -> SchedulerResult<Option<JobInfo>>
    where
        S: JobScheduler + ?Sized,
    {
        self.info_with_timeout(scheduler, None, scheduler.default_timeout()).await
    }

    /// Only the named attributes, plus `id`. No names means all of them.
    pub async fn info_of<S>(
        &self,
        scheduler: &S,
        types: impl OneOrMany,
    ) -> SchedulerResult<Option<JobInfo>>
    where
        S: JobScheduler + ?Sized,
    {
        let types = types.into_vec();
        self.info_with_timeout(scheduler, Some(types), scheduler.default_timeout()).await
    }

    pub async fn info_with_timeout<S>(
        &self,
        scheduler: &S,
        types: Option<Vec<String>>,
        timeout: Duration,
    ) -> SchedulerResult<Option<JobInfo>>
    where
        S: JobScheduler + ?Sized,
    {
        let Some(id) = &self.id else {
            tracing::debug!(name = %self.name, "No job id, job is not submitted yet?");
            return Ok(None);
        };
        let types = types.filter(|t| !t.is_empty());
        tracing::debug!(job_id = %id, ?types, "Querying job info");
        scheduler.query(id, types, timeout).await.map(Some)
    }

    /// Checks everything that can be rejected without asking the scheduler.
    pub fn validate(&self, max_walltime_hours: u32) -> SchedulerResult<()> {
        self.resources.validate(max_walltime_hours)?;
        if let Some(key) = self.env_vars.keys().find(|k| !is_env_name(k)) {
            return Err(SchedulerError::validation(format!(
                "`{key}` is not a valid environment variable name"
            )));
        }
        Ok(())
    }

    fn ensure_unsubmitted(&self, action: &str) -> SchedulerResult<()> {
        match &self.id {
            Some(id) => Err(SchedulerError::invalid_state(format!(
                "cannot {action} job `{}`, already submitted as {id}",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

fn is_env_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
