use std::time::Duration;

use serde::Deserialize;

use crate::command::SshProxy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    Slurm,
    Pbs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "SchedulerConfig::default_type")]
    pub r#type: SchedulerKind,

    #[serde(default = "SchedulerConfig::default_max_walltime_hours")]
    pub max_walltime_hours: u32,

    /// Seconds a single scheduler command may take.
    #[serde(default = "SchedulerConfig::default_timeout")]
    pub timeout: u64,

    /// Overrides `sbatch` / `qsub`.
    #[serde(default = "Default::default")]
    pub submit_command: Option<String>,

    /// Overrides `sacct` / `qstat`.
    #[serde(default = "Default::default")]
    pub status_command: Option<String>,

    #[serde(default = "Default::default")]
    pub ssh_proxy: Option<SshProxy>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            r#type: Self::default_type(),
            max_walltime_hours: Self::default_max_walltime_hours(),
            timeout: Self::default_timeout(),
            submit_command: None,
            status_command: None,
            ssh_proxy: None,
        }
    }
}

impl SchedulerConfig {
    pub fn default_type() -> SchedulerKind {
        SchedulerKind::Slurm
    }

    pub fn default_max_walltime_hours() -> u32 {
        72
    }

    pub fn default_timeout() -> u64 {
        60
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}
