use std::collections::{BTreeMap, HashMap};

use domain::model::entity::Job;
use domain::model::vo::{JobId, ResourceSpec};
use domain::service::JobScheduler;
use domain::SchedulerError;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Deserialize;

/// A job to run, naming the jobs it waits for instead of their ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub name: String,

    pub script: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub resources: ResourceSpec,

    /// Names of jobs that must complete successfully first.
    #[serde(default)]
    pub after: Vec<String>,

    /// Hold tokens, e.g. `user-hold`.
    #[serde(default)]
    pub holds: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("duplicate job name `{0}`")]
    DuplicateName(String),

    #[error("job `{job}` waits for unknown job `{after}`")]
    UnknownDependency { job: String, after: String },

    #[error("dependency cycle involving job `{0}`")]
    Cycle(String),

    #[error("job `{name}` failed after {} submitted: {source}", submitted.len())]
    Job {
        name: String,
        #[source]
        source: SchedulerError,
        /// Jobs that reached the scheduler before the failure.
        submitted: Vec<(String, JobId)>,
    },
}

/// Submits a set of jobs so that every job is submitted after the jobs it
/// depends on, passing their ids along as dependencies.
pub struct BatchSubmitter<'a, S: ?Sized> {
    scheduler: &'a S,
    with_hold: bool,
}

impl<'a, S> BatchSubmitter<'a, S>
where
    S: JobScheduler + ?Sized,
{
    pub fn new(scheduler: &'a S) -> Self {
        Self {
            scheduler,
            with_hold: false,
        }
    }

    pub fn with_hold(mut self, with_hold: bool) -> Self {
        self.with_hold = with_hold;
        self
    }

    /// Submission order as indices into `specs`.
    pub fn plan(specs: &[JobSpec]) -> Result<Vec<usize>, BatchError> {
        let mut graph = DiGraph::<usize, ()>::with_capacity(specs.len(), specs.len());
        let mut nodes = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if nodes.insert(spec.name.as_str(), graph.add_node(i)).is_some() {
                return Err(BatchError::DuplicateName(spec.name.clone()));
            }
        }
        for spec in specs {
            let to = nodes[spec.name.as_str()];
            for after in &spec.after {
                let from = nodes.get(after.as_str()).ok_or_else(|| BatchError::UnknownDependency {
                    job: spec.name.clone(),
                    after: after.clone(),
                })?;
                graph.add_edge(*from, to, ());
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(|n| graph[n]).collect())
            .map_err(|cycle| BatchError::Cycle(specs[graph[cycle.node_id()]].name.clone()))
    }

    pub async fn submit_all(&self, specs: Vec<JobSpec>) -> Result<Vec<Job>, BatchError> {
        let order = Self::plan(&specs)?;
        tracing::info!(jobs = specs.len(), with_hold = self.with_hold, "Submitting batch");

        let mut ids: HashMap<String, JobId> = HashMap::with_capacity(specs.len());
        let mut submitted = Vec::with_capacity(specs.len());
        let mut slots: Vec<Option<JobSpec>> = specs.into_iter().map(Some).collect();

        for i in order {
            let Some(spec) = slots[i].take() else {
                continue;
            };
            let name = spec.name.clone();
            match self.submit_one(spec, &ids).await {
                Ok(job) => {
                    if let Some(id) = job.id() {
                        tracing::info!(job_id = %id, name = %name, "Job submitted");
                        ids.insert(name, id.clone());
                    }
                    submitted.push(job);
                }
                Err(source) => {
                    let submitted = submitted
                        .iter()
                        .filter_map(|job: &Job| Some((job.name().to_owned(), job.id()?.clone())))
                        .collect();
                    return Err(BatchError::Job {
                        name,
                        source,
                        submitted,
                    });
                }
            }
        }

        Ok(submitted)
    }

    async fn submit_one(
        &self,
        spec: JobSpec,
        ids: &HashMap<String, JobId>,
    ) -> Result<Job, SchedulerError> {
        let JobSpec {
            name,
            script,
            env,
            resources,
            after,
            holds,
        } = spec;

        let mut job = Job::new(script, name).with_env_vars(env).with_resources(resources);
        // `plan` guarantees every name in `after` was submitted before.
        let deps: Vec<&JobId> = after.iter().filter_map(|a| ids.get(a)).collect();
        job.add_dependencies(deps.iter().map(|id| id.as_str()).collect::<Vec<_>>())?;
        for hold in &holds {
            job.add_hold(hold)?;
        }
        job.submit(self.scheduler, self.with_hold).await?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use domain::model::entity::Job;
    use domain::model::vo::{JobId, JobInfo};
    use domain::service::JobScheduler;
    use domain::{SchedulerError, SchedulerResult};
    use indoc::indoc;

    use super::{BatchError, BatchSubmitter, JobSpec};

    /// Hands out ids 100, 101, ... and remembers what it was asked.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Vec<String>, bool)>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl JobScheduler for Recorder {
        fn max_walltime_hours(&self) -> u32 {
            72
        }

        fn default_timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn submit(&self, job: &Job, with_hold: bool, _: Duration) -> SchedulerResult<JobId> {
            if self.fail_on == Some(job.name()) {
                return Err(SchedulerError::Submission {
                    reason: "rejected".to_owned(),
                    output: String::new(),
                    exit_code: Some(1),
                    with_hold,
                });
            }
            let mut calls = self.calls.lock().unwrap();
            let deps = job.dependencies().iter().map(|d| d.to_string()).collect();
            calls.push((job.name().to_owned(), deps, with_hold));
            Ok(JobId::from_numeric(&(100 + calls.len() - 1).to_string()).unwrap())
        }

        async fn query(
            &self,
            id: &JobId,
            types: Option<Vec<String>>,
            _: Duration,
        ) -> SchedulerResult<JobInfo> {
            Ok(JobInfo::new(id, Default::default(), BTreeMap::new(), types.as_deref()))
        }
    }

    fn specs(yaml: &str) -> Vec<JobSpec> {
        serde_yaml::from_str(yaml).unwrap()
    }

    const CHAIN: &str = indoc! {"
        - name: test
          script: eb --test foo.eb
          after: [build]
        - name: toolchain
          script: eb GCC-12.eb
          resources: {cores: 4, hours: 2}
        - name: build
          script: eb foo.eb
          after: [toolchain]
          holds: [user-hold]
    "};

    #[test]
    fn plan_orders_dependencies_first() {
        let specs = specs(CHAIN);
        let order = BatchSubmitter::<Recorder>::plan(&specs).unwrap();
        let names: Vec<&str> = order.iter().map(|&i| specs[i].name.as_str()).collect();
        assert_eq!(names, ["toolchain", "build", "test"]);
    }

    #[test]
    fn plan_rejects_bad_graphs() {
        let dup = specs("[{name: a, script: x}, {name: a, script: y}]");
        assert!(matches!(
            BatchSubmitter::<Recorder>::plan(&dup),
            Err(BatchError::DuplicateName(_))
        ));

        let unknown = specs("[{name: a, script: x, after: [b]}]");
        assert!(matches!(
            BatchSubmitter::<Recorder>::plan(&unknown),
            Err(BatchError::UnknownDependency { .. })
        ));

        let cycle = specs("[{name: a, script: x, after: [b]}, {name: b, script: y, after: [a]}]");
        assert!(matches!(BatchSubmitter::<Recorder>::plan(&cycle), Err(BatchError::Cycle(_))));
    }

    #[tokio::test]
    async fn submit_wires_ids() {
        let scheduler = Recorder::default();
        let jobs = BatchSubmitter::new(&scheduler).submit_all(specs(CHAIN)).await.unwrap();
        assert_eq!(jobs.len(), 3);

        let calls = scheduler.calls.lock().unwrap();
        assert_eq!(calls[0], ("toolchain".to_owned(), vec![], false));
        assert_eq!(calls[1], ("build".to_owned(), vec!["100".to_owned()], true));
        assert_eq!(calls[2], ("test".to_owned(), vec!["101".to_owned()], false));
    }

    #[tokio::test]
    async fn failure_reports_submitted_jobs() {
        let scheduler = Recorder {
            fail_on: Some("build"),
            ..Default::default()
        };
        let err = BatchSubmitter::new(&scheduler)
            .with_hold(true)
            .submit_all(specs(CHAIN))
            .await
            .unwrap_err();
        match err {
            BatchError::Job {
                name,
                source,
                submitted,
            } => {
                assert_eq!(name, "build");
                assert!(matches!(source, SchedulerError::Submission { with_hold: true, .. }));
                assert_eq!(submitted.len(), 1);
                assert_eq!(submitted[0].0, "toolchain");
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn bad_hold_token_is_not_submitted() {
        let scheduler = Recorder::default();
        let specs = specs("[{name: a, script: x, holds: [forever]}]");
        let err = BatchSubmitter::new(&scheduler).submit_all(specs).await.unwrap_err();
        assert!(matches!(err, BatchError::Job { source: SchedulerError::Validation(_), .. }));
        assert!(scheduler.calls.lock().unwrap().is_empty());
    }
}
