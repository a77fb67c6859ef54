use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[inline]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    #[inline]
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// stdout followed by stderr, for error reports.
    pub fn combined(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            (out, "") => out.to_owned(),
            ("", err) => err.to_owned(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Runs `command` to completion, feeding `stdin` and capturing its output.
///
/// The child is killed if it is still running when `timeout` expires.
pub async fn run(
    mut command: Command,
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let cmdline = describe(&command);
    command
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::trace!(command = %cmdline, "Running command");
    let mut child = command.spawn().map_err(|source| CommandError::Spawn {
        command: cmdline.clone(),
        source,
    })?;

    let pipe = child.stdin.take();
    let input = stdin.unwrap_or_default().as_bytes();
    let write = async move {
        if let Some(mut pipe) = pipe {
            pipe.write_all(input).await?;
            pipe.shutdown().await?;
        }
        io::Result::Ok(())
    };
    let wait = async {
        let (written, output) = tokio::join!(write, child.wait_with_output());
        if let Err(e) = written {
            // The command may exit before reading its input, e.g. on a bad flag.
            tracing::debug!(command = %cmdline, "Unable to write stdin: {e}");
        }
        output
    };

    let finished = tokio::time::timeout(timeout, wait).await;
    match finished {
        Ok(Ok(output)) => Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(source)) => Err(CommandError::Spawn {
            command: cmdline,
            source,
        }),
        Err(_) => {
            tracing::warn!(command = %cmdline, ?timeout, "Command timed out");
            Err(CommandError::Timeout {
                command: cmdline,
                timeout,
            })
        }
    }
}

fn describe(command: &Command) -> String {
    let std = command.as_std();
    std::iter::once(std.get_program())
        .chain(std.get_args())
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::process::Command;

    use super::{run, CommandError};

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        command
    }

    #[tokio::test]
    async fn captures_output_and_stdin() {
        let out = run(sh("cat; echo oops >&2; exit 3"), Some("hello\n"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.code(), Some(3));
        assert!(!out.success());
        assert_eq!(out.combined(), "hello\noops");
    }

    #[tokio::test]
    async fn times_out() {
        let err = run(sh("sleep 5"), None, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program() {
        let err = run(Command::new("/nonexistent/sbatch"), None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn command_ignoring_stdin() {
        let out = run(sh("exit 1"), Some(&"x".repeat(1 << 20)), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.code(), Some(1));
    }
}
