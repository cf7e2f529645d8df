//! Process runner backed by `tokio::process`.
//!
//! Output is captured line by line. When streaming is enabled each line is
//! also forwarded to `tracing` as it arrives, so long-running terraform
//! steps show progress in the pipeline log.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{CommandConfig, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::heartbeat::Heartbeat;
use crate::runner::{CommandRunner, ExecutionResult};

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Runner that spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn build_command(config: &CommandConfig) -> Command {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &config.workdir {
            cmd.current_dir(dir);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Read a child stream to the end, optionally echoing each line to the log.
async fn collect_stream<R>(reader: R, stream: LogStream, echo: bool, label: String) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut output = String::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if echo {
                    info!("[{}] [{}] {}", label, stream, line);
                }
                output.push_str(&line);
                output.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!("[{}] failed to read {}: {}", label, stream, e);
                break;
            }
        }
    }

    output
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        config: &CommandConfig,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let label = config.log_label().to_string();
        debug!("Executing: {}", config.display());

        let started_at = Utc::now();
        let start = Instant::now();

        let mut child = Self::build_command(config)
            .spawn()
            .map_err(|e| RunnerError::SpawnFailed {
                program: config.program.clone(),
                message: e.to_string(),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".to_string()))?;

        let stdout_task = tokio::spawn(collect_stream(
            stdout,
            LogStream::Stdout,
            run_config.stream_logs,
            label.clone(),
        ));
        let stderr_task = tokio::spawn(collect_stream(
            stderr,
            LogStream::Stderr,
            run_config.stream_logs,
            label.clone(),
        ));

        let heartbeat = run_config
            .heartbeat
            .map(|interval| Heartbeat::start(label.clone(), interval));

        let status = if run_config.timeout_seconds > 0 {
            let limit = Duration::from_secs(run_config.timeout_seconds);
            match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        warn!("[{}] failed to kill timed out process: {}", label, e);
                    }
                    return Err(RunnerError::Timeout(run_config.timeout_seconds));
                }
            }
        } else {
            child.wait().await?
        };
        drop(heartbeat);

        let stdout_output = stdout_task.await.unwrap_or_default();
        let stderr_output = stderr_task.await.unwrap_or_default();

        let exit_code = status.code().map(i64::from).unwrap_or(-1);
        debug!("[{}] exited with code {}", label, exit_code);

        Ok(ExecutionResult {
            exit_code,
            stdout: stdout_output,
            stderr: stderr_output,
            started_at,
            finished_at: Utc::now(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
