//! Bounded invocation of the external package resolver.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ResolverError;

/// Boxed future returned by [`ResolverRunner::run`].
pub type ResolverFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProcessOutput, ResolverError>> + Send + 'a>>;

/// Captured result of one resolver process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Diagnostic text for a failed run: stderr, else the last stdout line,
    /// else the exit status.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        if let Some(line) = self.stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
            return line.to_string();
        }
        match self.exit_code {
            Some(code) => format!("resolver exited with status {code}"),
            None => "resolver terminated by signal".to_string(),
        }
    }
}

/// Runs the resolver with a wall-clock bound.
///
/// Implementations must terminate the process when `timeout` elapses and
/// report [`ResolverError::Timeout`].
pub trait ResolverRunner: Send + Sync {
    fn run(&self, args: &[String], timeout: Duration) -> ResolverFuture<'_>;
}

/// Resolver backed by a real child process.
///
/// `prefix` is placed before the per-call arguments, e.g. the script path
/// when `program` is an interpreter.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    prefix: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, prefix: Vec<String>) -> Self {
        Self {
            program: program.into(),
            prefix,
        }
    }

    async fn execute(
        &self,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<ProcessOutput, ResolverError> {
        let slug = args.first().cloned().unwrap_or_default();

        let mut child = Command::new(&self.program)
            .args(&self.prefix)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ResolverError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes are drained while waiting so a chatty child cannot block.
        let run = async {
            tokio::join!(
                child.wait(),
                forward_lines(stdout, &slug),
                read_to_string(stderr)
            )
        };

        let outcome = tokio::time::timeout(timeout, run).await;
        match outcome {
            Ok((status, stdout, stderr)) => {
                let status = status?;
                Ok(ProcessOutput {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                })
            }
            Err(_) => {
                warn!(
                    slug = %slug,
                    timeout_secs = timeout.as_secs(),
                    "resolver timed out, killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(slug = %slug, error = %e, "failed to kill resolver");
                }
                Err(ResolverError::Timeout(timeout))
            }
        }
    }
}

impl ResolverRunner for ProcessRunner {
    fn run(&self, args: &[String], timeout: Duration) -> ResolverFuture<'_> {
        let args = args.to_vec();
        Box::pin(async move { self.execute(args, timeout).await })
    }
}

/// Collects stdout, logging each line as it arrives.
async fn forward_lines<R: AsyncRead + Unpin>(pipe: Option<R>, slug: &str) -> String {
    let Some(pipe) = pipe else {
        return String::new();
    };
    let mut collected = String::new();
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(slug = %slug, "resolver: {line}");
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}

async fn read_to_string<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_prefers_stderr() {
        let out = ProcessOutput {
            exit_code: Some(1),
            stdout: "downloading\n".into(),
            stderr: "  project not found \n".into(),
        };
        assert_eq!(out.failure_message(), "project not found");
    }

    #[test]
    fn failure_message_falls_back_to_last_stdout_line() {
        let out = ProcessOutput {
            exit_code: Some(2),
            stdout: "resolving sodium\nno compatible version\n\n".into(),
            stderr: String::new(),
        };
        assert_eq!(out.failure_message(), "no compatible version");
    }

    #[test]
    fn failure_message_falls_back_to_status() {
        let out = ProcessOutput {
            exit_code: Some(3),
            ..Default::default()
        };
        assert_eq!(out.failure_message(), "resolver exited with status 3");
    }

    #[cfg(unix)]
    fn sh(script: &str) -> ProcessRunner {
        ProcessRunner::new("sh", vec!["-c".into(), script.into()])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let runner = sh("echo hello; echo oops >&2; exit 4");
        let out = runner
            .run(&["sodium".into()], Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(4));
        assert!(!out.success());
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_arguments_after_prefix() {
        // With `sh -c`, the first trailing argument becomes $0.
        let dir = tempfile::tempdir().unwrap();
        let runner = sh(r#"printf '%s' "$0" > "$1/slug.txt""#);
        let out = runner
            .run(
                &["lithium".into(), dir.path().display().to_string()],
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        assert!(out.success());
        let written = std::fs::read_to_string(dir.path().join("slug.txt")).unwrap();
        assert_eq!(written, "lithium");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn kills_on_timeout() {
        let runner = sh("exec sleep 30");
        let started = std::time::Instant::now();
        let err = runner
            .run(&["slow".into()], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let runner = ProcessRunner::new("craftdeploy-no-such-resolver", Vec::new());
        let err = runner
            .run(&["x".into()], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::Spawn { .. }));
    }
}
