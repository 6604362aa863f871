//! Run-directive executor collaborator.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use approval_gate::CommandRunner;
use wait_timeout::ChildExt;

const DEFAULT_RUN_TIMEOUT_SEC: u64 = 30;
const DEFAULT_MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// Executes approved run directives through `bash -lc` in the workspace
/// root, with a hard timeout and byte-capped captured output.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    workspace_root: PathBuf,
    timeout_sec: u64,
    max_output_bytes: usize,
}

impl ShellCommandRunner {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            timeout_sec: DEFAULT_RUN_TIMEOUT_SEC,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    #[must_use]
    pub fn with_timeout_sec(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = timeout_sec.max(1);
        self
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run(&mut self, directive: &str) -> Result<String, String> {
        let mut child = Command::new("bash")
            .arg("-lc")
            .arg(directive)
            .current_dir(&self.workspace_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| format!("Failed to launch run directive: {error}"))?;

        let wait_result = child.wait_timeout(Duration::from_secs(self.timeout_sec));
        let (timed_out, status) = match wait_result {
            Ok(Some(status)) => (false, status),
            Ok(None) => {
                let _ = child.kill();
                let status = child
                    .wait()
                    .map_err(|error| format!("Directive timed out and wait failed: {error}"))?;
                (true, status)
            }
            Err(error) => {
                let _ = child.kill();
                return Err(format!("Failed waiting for run directive: {error}"));
            }
        };

        let stdout = read_pipe_bytes(child.stdout.take());
        let stderr = read_pipe_bytes(child.stderr.take());

        let status_label = if timed_out {
            format!("timeout after {}s", self.timeout_sec)
        } else {
            format_exit_status(status)
        };

        let content = truncate_to_byte_limit(
            format!(
                "status: {status_label}\n[STDOUT]\n{}\n[STDERR]\n{}",
                String::from_utf8_lossy(&stdout),
                String::from_utf8_lossy(&stderr)
            ),
            self.max_output_bytes,
        );

        if !timed_out && status.success() {
            Ok(content)
        } else {
            Err(content)
        }
    }
}

fn read_pipe_bytes(pipe: Option<impl Read>) -> Vec<u8> {
    let Some(mut pipe) = pipe else {
        return Vec::new();
    };

    let mut bytes = Vec::new();
    let _ = pipe.read_to_end(&mut bytes);
    bytes
}

fn truncate_to_byte_limit(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }

    let mut cutoff = max_bytes.min(content.len());
    while cutoff > 0 && !content.is_char_boundary(cutoff) {
        cutoff -= 1;
    }

    let mut truncated = content[..cutoff].to_string();
    truncated.push_str("\n[truncated]");
    truncated
}

fn format_exit_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit_code={code}"),
        None => "exit_code=terminated_by_signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use approval_gate::CommandRunner;

    use super::ShellCommandRunner;

    #[test]
    fn successful_directive_captures_stdout() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let mut runner = ShellCommandRunner::new(dir.path());

        let output = runner.run("printf hello").expect("directive should succeed");
        assert!(output.contains("exit_code=0"));
        assert!(output.contains("hello"));
    }

    #[test]
    fn failing_directive_reports_stderr_as_error() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let mut runner = ShellCommandRunner::new(dir.path());

        let error = runner
            .run("echo boom >&2; exit 3")
            .expect_err("directive should fail");
        assert!(error.contains("exit_code=3"));
        assert!(error.contains("boom"));
    }

    #[test]
    fn directives_run_in_the_workspace_root() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let mut runner = ShellCommandRunner::new(dir.path());

        runner
            .run("touch created_here")
            .expect("directive should succeed");
        assert!(dir.path().join("created_here").exists());
    }
}
