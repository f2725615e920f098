//! E2E test harness for anyr
//!
//! Runs the anyr binary as an opaque subprocess, captures its output and
//! turns `--json` output into typed results.

use crate::env::{BIN_ENV, BIN_NAME, EnvMap, HarnessConfig, SPACE_ID_ENV};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Flag that switches the CLI to machine-readable output
pub const JSON_FLAG: &str = "--json";

/// Flag that prints usage for any command path
pub const HELP_FLAG: &str = "--help";

/// How often a blocking invocation checks its child against the timeout
const BLOCKING_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result type for E2E operations
pub type E2eResult<T> = Result<T, E2eError>;

/// Errors that can occur during E2E testing
#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Test environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("command failed: {command} (exit code {exit_code})\nstdout: {stdout}\nstderr: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("invalid json for {command}: {source}\nstdout: {stdout}\nstderr: {stderr}")]
    InvalidOutput {
        command: String,
        #[source]
        source: serde_json::Error,
        stdout: String,
        stderr: String,
    },
}

/// Output from a CLI command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Assert the command succeeded
    pub fn assert_success(&self) {
        assert!(
            self.success(),
            "Command failed with exit code {}.\nstdout: {}\nstderr: {}",
            self.exit_code, self.stdout, self.stderr
        );
    }

    /// Check if stdout contains a string
    pub fn stdout_contains(&self, s: &str) -> bool {
        self.stdout.contains(s)
    }

    /// Enforce the JSON contract: exit code zero and stdout holding one
    /// value of shape `T`. `command` is only used in error messages.
    pub fn parse_json<T: DeserializeOwned>(&self, command: &str) -> E2eResult<T> {
        if !self.success() {
            return Err(E2eError::CommandFailed {
                command: command.to_string(),
                exit_code: self.exit_code,
                stdout: self.stdout.clone(),
                stderr: self.stderr.clone(),
            });
        }
        serde_json::from_str(&self.stdout).map_err(|source| E2eError::InvalidOutput {
            command: command.to_string(),
            source,
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        })
    }
}

impl CommandOutput {
    fn from_parts(stdout: &[u8], stderr: &[u8], status: ExitStatus) -> Self {
        Self {
            stdout: String::from_utf8_lossy(stdout).to_string(),
            stderr: String::from_utf8_lossy(stderr).to_string(),
            exit_code: status.code().unwrap_or(-1),
        }
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self::from_parts(&output.stdout, &output.stderr, output.status)
    }
}

/// Install a test-friendly tracing subscriber. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// E2E test harness bound to one resolved anyr binary and environment
#[derive(Debug, Clone)]
pub struct E2eHarness {
    /// Path to the anyr binary
    anyr_bin: PathBuf,
    /// Space the backend tests run against
    space_id: Option<String>,
    /// Per-invocation limit; `None` waits for the child to exit
    timeout: Option<Duration>,
    /// Environment for every invocation, overrides already applied
    env: EnvMap,
}

impl E2eHarness {
    /// Create a harness from an explicit config
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        let env = config.child_env();
        let anyr_bin = config.bin.ok_or_else(|| {
            E2eError::EnvironmentUnavailable(format!(
                "{} binary not found; set {} or add it to PATH",
                BIN_NAME, BIN_ENV
            ))
        })?;

        Ok(Self {
            anyr_bin,
            space_id: config.space_id,
            timeout: config.timeout,
            env,
        })
    }

    /// Create a harness from the process environment
    pub fn from_env() -> E2eResult<Self> {
        Self::new(HarnessConfig::from_env())
    }

    /// Like [`E2eHarness::from_env`], but an unavailable environment is
    /// logged as a skip for `test_name` and yields `None`.
    pub fn try_from_env(test_name: &str) -> E2eResult<Option<Self>> {
        init_tracing();
        match Self::from_env() {
            Ok(harness) => {
                debug!("{} runs against {}", test_name, harness.anyr_bin().display());
                Ok(Some(harness))
            }
            Err(E2eError::EnvironmentUnavailable(reason)) => {
                info!("skipping {}: {}", test_name, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Path to the binary under test
    pub fn anyr_bin(&self) -> &Path {
        &self.anyr_bin
    }

    /// Configured target space, if any
    pub fn space_id(&self) -> Option<&str> {
        self.space_id.as_deref()
    }

    /// The target space, or `None` after logging a skip for `test_name`
    pub fn require_space_id(&self, test_name: &str) -> Option<&str> {
        if self.space_id.is_none() {
            info!("skipping {}: {} is not set", test_name, SPACE_ID_ENV);
        }
        self.space_id()
    }

    fn command(&self, args: &[&str]) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.anyr_bin);
        cmd.args(args)
            .env_clear()
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run the anyr CLI with the given arguments.
    ///
    /// A nonzero exit is returned as a normal [`CommandOutput`]; only spawn
    /// failures and timeouts are errors.
    pub async fn run_cli(&self, args: &[&str]) -> E2eResult<CommandOutput> {
        debug!("running {} {}", self.anyr_bin.display(), args.join(" "));

        let mut cmd = Command::from(self.command(args));
        cmd.kill_on_drop(true);
        let mut child = cmd.spawn()?;

        // Take stdout/stderr handles so we can read them in spawned tasks
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout_pipe {
                let _ = tokio::io::AsyncReadExt::read_to_end(&mut out, &mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut err) = stderr_pipe {
                let _ = tokio::io::AsyncReadExt::read_to_end(&mut err, &mut buf).await;
            }
            buf
        });

        let status = match self.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    // Timeout: kill the child process to prevent orphans
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    stdout_task.abort();
                    stderr_task.abort();
                    return Err(E2eError::Timeout(format!("CLI command: {:?}", args.join(" "))));
                }
            },
            None => child.wait().await?,
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let output = CommandOutput::from_parts(&stdout, &stderr, status);
        debug!("exit code {} for {}", output.exit_code, args.join(" "));
        Ok(output)
    }

    /// Blocking variant of [`E2eHarness::run_cli`] for use outside async
    /// context, e.g. from `Drop`. The configured timeout applies here too.
    pub fn run_cli_blocking(&self, args: &[&str]) -> E2eResult<CommandOutput> {
        debug!("running {} {}", self.anyr_bin.display(), args.join(" "));

        let Some(limit) = self.timeout else {
            return Ok(self.command(args).output()?.into());
        };

        let mut child = self.command(args).spawn()?;
        let stdout_reader = drain_blocking(child.stdout.take());
        let stderr_reader = drain_blocking(child.stderr.take());

        let deadline = Instant::now() + limit;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                // Readers are left detached: a grandchild may still hold the pipes open
                return Err(E2eError::Timeout(format!("CLI command: {:?}", args.join(" "))));
            }
            std::thread::sleep(BLOCKING_POLL_INTERVAL);
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        Ok(CommandOutput::from_parts(&stdout, &stderr, status))
    }

    /// Run a command path with `--help` appended
    pub async fn run_help(&self, path: &[&str]) -> E2eResult<CommandOutput> {
        let mut args = path.to_vec();
        args.push(HELP_FLAG);
        self.run_cli(&args).await
    }

    /// Run a command with `--json` appended and decode its output as `T`.
    ///
    /// Fails with [`E2eError::CommandFailed`] on a nonzero exit and with
    /// [`E2eError::InvalidOutput`] when stdout is not a `T`; both carry the
    /// captured streams.
    pub async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> E2eResult<T> {
        let mut full = args.to_vec();
        full.push(JSON_FLAG);
        let output = self.run_cli(&full).await?;
        output.parse_json(&args.join(" "))
    }
}

/// Read a pipe to the end on its own thread
fn drain_blocking<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

#[cfg(test)]
mod tests;
