use std::collections::BTreeMap;

use domain::model::vo::JobState;

/// Fields requested from `sacct`.
pub const SACCT_FIELDS: &str = "JobID,JobName,User,Account,Partition,State,ExitCode,WorkDir,\
Timelimit,ElapsedRaw,CPUTimeRAW,NCPUS,NNodes,Submit,Start,End";

/// Rows of `sacct -P` output keyed by column header.
pub fn parse_sacct(stdout: &[u8]) -> Result<Vec<BTreeMap<String, String>>, csv::Error> {
    let stdout = stdout.iter().copied().filter(|c| *c != b'\'').collect::<Vec<_>>();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .quoting(false)
        .flexible(true)
        .from_reader(stdout.as_slice());
    let headers = reader.headers()?.clone();

    reader
        .records()
        .map(|record| {
            let record = record?;
            Ok(headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect())
        })
        .collect()
}

/// `CANCELLED by 1000` and the like only count by their first word.
pub fn map_state(state: &str) -> JobState {
    match state.split_whitespace().next().unwrap_or_default() {
        "PENDING" | "CONFIGURING" | "REQUEUED" | "REQUEUE_HOLD" | "REQUEUE_FED" => {
            JobState::Queuing
        }
        "RUNNING" | "RESIZING" | "SIGNALING" => JobState::Running,
        "SUSPENDED" | "STOPPED" => JobState::Suspended,
        "COMPLETING" | "STAGE_OUT" => JobState::Completing,
        "COMPLETED" => JobState::Completed,
        "BOOT_FAIL" | "CANCELLED" | "DEADLINE" | "FAILED" | "NODE_FAIL" | "OUT_OF_MEMORY"
        | "PREEMPTED" | "REVOKED" | "TIMEOUT" => JobState::Failed,
        _ => JobState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use domain::model::vo::JobState;
    use indoc::indoc;

    use super::{map_state, parse_sacct};

    #[test]
    fn deserialize() {
        let x = indoc! {r#"
            JobID|JobName|User|State|ExitCode|WorkDir|NCPUS|Start|End
            01|job_name|user|COMPLETED|0:0|pathto|10|1999-01-01T00:00:01|2000-01-01T00:00:01
            "#
        };
        let rows = parse_sacct(x.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["JobName"], "job_name");
        assert_eq!(rows[0]["ExitCode"], "0:0");
    }

    #[test]
    fn header_only() {
        let rows = parse_sacct(b"JobID|JobName|State\n").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn states() {
        assert_eq!(map_state("PENDING"), JobState::Queuing);
        assert_eq!(map_state("CANCELLED by 1000"), JobState::Failed);
        assert_eq!(map_state("COMPLETED"), JobState::Completed);
        assert_eq!(map_state(""), JobState::Unknown);
    }
}
