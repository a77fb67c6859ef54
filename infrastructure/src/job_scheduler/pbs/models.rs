use std::collections::BTreeMap;
use std::sync::OnceLock;

use domain::model::vo::{JobId, JobState};
use regex::Regex;

/// Attributes of the first job in `qstat -f` output.
///
/// Long values are wrapped onto tab-indented continuation lines.
pub fn parse_qstat(stdout: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let mut last: Option<String> = None;

    for line in stdout.lines() {
        if let Some(id) = line.strip_prefix("Job Id: ") {
            if !attributes.is_empty() {
                break;
            }
            attributes.insert("Job_Id".to_owned(), id.trim().to_owned());
            continue;
        }
        if line.starts_with('\t') {
            if let Some(value) = last.as_ref().and_then(|k| attributes.get_mut(k)) {
                value.push_str(line.trim());
            }
            continue;
        }
        let Some((key, value)) = line.split_once(" = ") else {
            continue;
        };
        let key = key.trim().to_owned();
        attributes.insert(key.clone(), value.trim().to_owned());
        last = Some(key);
    }

    attributes
}

pub fn map_state(state: &str, exit_status: Option<i32>) -> JobState {
    match state {
        "Q" | "W" | "T" => JobState::Queuing,
        "R" | "B" => JobState::Running,
        "H" | "S" | "U" => JobState::Suspended,
        "E" => JobState::Completing,
        "C" | "F" | "X" => match exit_status {
            None | Some(0) => JobState::Completed,
            Some(_) => JobState::Failed,
        },
        _ => JobState::Unknown,
    }
}

/// `qsub` prints `<sequence>.<server>`; the sequence number is the id.
pub fn parse_job_id(token: &str) -> Option<JobId> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(\d+)(?:\.[\w.-]+)?$").expect("valid regex"));
    let captures = re.captures(token.trim())?;
    JobId::from_numeric(captures.get(1)?.as_str())
}
