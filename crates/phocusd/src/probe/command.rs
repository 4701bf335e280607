//! Command runner - executes external commands for probes.
//!
//! Captures exit status and output without interpreting them; each probe
//! decides what a non-zero exit means. Only a failure to spawn or an
//! expired timeout is an error here.
//!
//! On unix every command runs in its own process group so a timeout can
//! take down whatever `sh -c` started along with the shell itself.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::ProbeError;

/// Captured result of one command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs commands with an optional per-command timeout
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    /// `None` waits for the command however long it takes
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run a program with arguments
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ProbeError> {
        let command_line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        self.execute(cmd, command_line).await
    }

    /// Run a command line through `sh -c`
    pub async fn shell(&self, command_line: &str) -> Result<CommandOutput, ProbeError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        self.execute(cmd, command_line.to_string()).await
    }

    async fn execute(
        &self,
        mut cmd: Command,
        command_line: String,
    ) -> Result<CommandOutput, ProbeError> {
        debug!("Executing: {}", command_line);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| ProbeError::Spawn {
            command: command_line.clone(),
            source,
        })?;
        let pid = child.id();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    kill_group(pid);
                    return Err(ProbeError::Timeout {
                        command: command_line,
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|source| ProbeError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// SIGKILL the process group led by `pid`
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!("Process group {} already gone: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

impl CommandOutput {
    /// Turn a non-zero exit into an error
    pub fn require_success(self, command: &str) -> Result<Self, ProbeError> {
        if self.success {
            Ok(self)
        } else {
            Err(ProbeError::Exit {
                command: command.to_string(),
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_echo() {
        let runner = CommandRunner::new(None);
        let output = runner.run("echo", &["hello"]).await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let runner = CommandRunner::new(None);
        let output = runner.shell("exit 3").await.unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert!(output.require_success("exit 3").is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let runner = CommandRunner::new(None);
        let err = runner
            .run("/nonexistent/phocus-missing-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_expires() {
        let runner = CommandRunner::new(Some(Duration::from_millis(100)));
        let err = runner.run("sleep", &["5"]).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
    }

    /// Alive and not a zombie waiting to be reaped
    #[cfg(target_os = "linux")]
    fn running(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .map(|rest| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleeper.pid");
        let runner = CommandRunner::new(Some(Duration::from_millis(500)));

        let err = runner
            .shell(&format!("sleep 37 & echo $! > {}; wait", pid_file.display()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        let mut survived = true;
        for _ in 0..40 {
            if !running(pid) {
                survived = false;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!survived, "sleep {} outlived the timeout", pid);
    }
}
