use std::collections::BTreeMap;

use super::job_id::JobId;

/// Attribute name always present in a [`JobInfo`].
pub const ID_ATTRIBUTE: &str = "id";

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum JobState {
    Queuing,
    Running,
    Suspended,
    Completing,
    Completed,
    Failed,
    #[default]
    Unknown,
}

/// Snapshot of a job as reported by the scheduler's status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    state: JobState,
    attributes: BTreeMap<String, String>,
}

impl JobInfo {
    /// Builds the snapshot for `id`.
    ///
    /// With `types` set, only the named attributes are kept. Names the
    /// scheduler did not report are skipped.
    pub fn new(
        id: &JobId,
        state: JobState,
        mut attributes: BTreeMap<String, String>,
        types: Option<&[String]>,
    ) -> Self {
        if let Some(types) = types {
            attributes.retain(|k, _| types.iter().any(|t| t == k));
        }
        attributes.insert(ID_ATTRIBUTE.to_owned(), id.to_string());
        Self { state, attributes }
    }

    pub fn id(&self) -> &str {
        &self.attributes[ID_ATTRIBUTE]
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{JobInfo, JobState};
    use crate::model::vo::job_id::JobId;

    fn raw() -> BTreeMap<String, String> {
        [("State", "RUNNING"), ("JobName", "t1"), ("Partition", "batch")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn keeps_everything_by_default() {
        let id = JobId::from_numeric("42").unwrap();
        let info = JobInfo::new(&id, JobState::Running, raw(), None);
        assert_eq!(info.id(), "42");
        assert_eq!(info.attributes().len(), 4);
        assert_eq!(info.state(), JobState::Running);
    }

    #[test]
    fn filters_and_ignores_unknown_names() {
        let id = JobId::from_numeric("42").unwrap();
        let types = vec!["JobName".to_owned(), "NoSuchField".to_owned()];
        let info = JobInfo::new(&id, JobState::Running, raw(), Some(&types));
        assert_eq!(info.get("JobName"), Some("t1"));
        assert_eq!(info.get("Partition"), None);
        assert_eq!(info.get("NoSuchField"), None);
        assert_eq!(info.attributes().len(), 2);
    }
}
