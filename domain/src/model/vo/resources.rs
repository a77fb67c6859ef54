use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use typed_builder::TypedBuilder;

use crate::error::{SchedulerError, SchedulerResult};

/// Events the scheduler may send a mail for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MailEvent {
    Begin,
    End,
    Fail,
}

/// Resource request of a job.
///
/// Every field is optional. Unset fields, and text fields holding only
/// whitespace, are left out of the scheduler request.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceSpec {
    /// Walltime in whole hours
    #[builder(default, setter(strip_option))]
    hours: Option<u32>,
    /// Tasks per node
    #[builder(default, setter(strip_option))]
    cores: Option<u32>,
    #[builder(default, setter(strip_option, into))]
    partition: Option<String>,
    #[builder(default, setter(strip_option))]
    mem_per_cpu: Option<ByteSize>,
    /// Node feature constraint, e.g. `haswell`
    #[builder(default, setter(strip_option, into))]
    architecture: Option<String>,
    #[builder(default, setter(strip_option, into))]
    workdir: Option<PathBuf>,
    #[builder(default, setter(strip_option, into))]
    mail_user: Option<String>,
    #[builder(default, setter(into))]
    mail_events: BTreeSet<MailEvent>,
}

impl ResourceSpec {
    pub fn hours(&self) -> Option<u32> {
        self.hours
    }

    pub fn cores(&self) -> Option<u32> {
        self.cores
    }

    pub fn partition(&self) -> Option<&str> {
        non_blank(&self.partition)
    }

    pub fn mem_per_cpu(&self) -> Option<ByteSize> {
        self.mem_per_cpu
    }

    /// Memory per cpu in MiB, rounded up.
    pub fn mem_per_cpu_mib(&self) -> Option<u64> {
        const MIB: u64 = 1024 * 1024;
        self.mem_per_cpu.map(|m| m.as_u64().div_ceil(MIB))
    }

    pub fn architecture(&self) -> Option<&str> {
        non_blank(&self.architecture)
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref().filter(|p| !p.as_os_str().is_empty())
    }

    pub fn mail_user(&self) -> Option<&str> {
        non_blank(&self.mail_user)
    }

    pub fn mail_events(&self) -> &BTreeSet<MailEvent> {
        &self.mail_events
    }

    /// `HH:00:00` form of the walltime.
    pub fn walltime(&self) -> Option<String> {
        self.hours.map(|h| format!("{h:02}:00:00"))
    }

    pub fn validate(&self, max_walltime_hours: u32) -> SchedulerResult<()> {
        if let Some(hours) = self.hours {
            if hours == 0 {
                return Err(SchedulerError::validation("walltime must be at least 1 hour"));
            }
            if hours > max_walltime_hours {
                return Err(SchedulerError::validation(format!(
                    "walltime of {hours} hours exceeds the maximum of {max_walltime_hours}"
                )));
            }
        }
        if self.cores == Some(0) {
            return Err(SchedulerError::validation("core count must be positive"));
        }
        if self.mem_per_cpu.is_some_and(|m| m.as_u64() == 0) {
            return Err(SchedulerError::validation("memory per cpu must be positive"));
        }
        Ok(())
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use bytesize::ByteSize;
    use indoc::indoc;

    use super::{MailEvent, ResourceSpec};
    use crate::error::SchedulerError;

    #[test]
    fn deserialize_partial() {
        let s = indoc! {"
            cores: 4
            hours: 2
            mail_events: [end, fail]
        "};
        let spec: ResourceSpec = serde_yaml::from_str(s).unwrap();
        assert_eq!(spec.cores(), Some(4));
        assert_eq!(spec.walltime().as_deref(), Some("02:00:00"));
        assert_eq!(spec.partition(), None);
        assert!(spec.mail_events().contains(&MailEvent::Fail));
        assert!(!spec.mail_events().contains(&MailEvent::Begin));
    }

    #[test]
    fn blank_fields_are_unset() {
        let spec = ResourceSpec::builder().partition("  ").architecture("").build();
        assert_eq!(spec.partition(), None);
        assert_eq!(spec.architecture(), None);
    }

    #[test]
    fn memory_in_mib() {
        let spec = ResourceSpec::builder().mem_per_cpu(ByteSize::gib(2)).build();
        assert_eq!(spec.mem_per_cpu_mib(), Some(2048));
        let spec = ResourceSpec::builder().mem_per_cpu(ByteSize::kib(1)).build();
        assert_eq!(spec.mem_per_cpu_mib(), Some(1));
    }

    #[test]
    fn validate() {
        assert!(ResourceSpec::default().validate(72).is_ok());
        assert!(ResourceSpec::builder().hours(72).cores(1).build().validate(72).is_ok());

        for spec in [
            ResourceSpec::builder().hours(0).build(),
            ResourceSpec::builder().hours(73).build(),
            ResourceSpec::builder().cores(0).build(),
            ResourceSpec::builder().mem_per_cpu(ByteSize::b(0)).build(),
        ] {
            assert!(matches!(spec.validate(72), Err(SchedulerError::Validation(_))));
        }
    }

    #[test]
    fn mail_event_names() {
        assert_eq!(MailEvent::Begin.to_string(), "BEGIN");
        assert_eq!("fail".parse::<MailEvent>().unwrap(), MailEvent::Fail);
    }
}
