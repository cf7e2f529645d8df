//! Mock command runner for testing.
//!
//! Provides a configurable mock implementation of the CommandRunner trait
//! for use in unit tests without spawning `git` or `terraform`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{CommandConfig, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Predefined mock response for a command execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub stream_logs: bool,
    pub heartbeat: bool,
}

impl CapturedCall {
    /// Whether any argument equals `arg`.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

type Matcher = Arc<dyn Fn(&CommandConfig) -> bool + Send + Sync>;

/// Mock command runner for testing.
///
/// Rules registered with [`MockRunner::respond_when`] are checked in
/// registration order; the first match wins. Unmatched calls fall back to the
/// sequential response list, then to an empty success.
#[derive(Clone)]
pub struct MockRunner {
    /// Predicate-matched responses.
    rules: Arc<RwLock<Vec<(Matcher, MockResponse)>>>,
    /// Sequential fallback responses.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next sequential response to return.
    response_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Simulated failure to return (as a string message for ExecutionFailed).
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRunner")
            .field("rules", &self.rules.read().len())
            .field("calls", &self.captured_calls.read().len())
            .finish()
    }
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Respond with `response` to any command matching `matcher`.
    pub fn respond_when<F>(self, matcher: F, response: MockResponse) -> Self
    where
        F: Fn(&CommandConfig) -> bool + Send + Sync + 'static,
    {
        self.rules.write().push((Arc::new(matcher), response));
        self
    }

    /// Respond with `response` to any command that has `arg` among its arguments.
    pub fn on_arg(self, arg: impl Into<String>, response: MockResponse) -> Self {
        let arg = arg.into();
        self.respond_when(move |config| config.args.iter().any(|a| *a == arg), response)
    }

    /// Add a mock response for the next unmatched call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple sequential responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Set a failure to simulate.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a command with the given argument was run.
    pub fn was_called_with(&self, arg: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.has_arg(arg))
    }

    /// Get calls whose arguments contain `arg`.
    pub fn calls_with(&self, arg: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.has_arg(arg))
            .cloned()
            .collect()
    }

    fn record_call(&self, config: &CommandConfig, run_config: &RunConfig) {
        self.captured_calls.write().push(CapturedCall {
            program: config.program.clone(),
            args: config.args.clone(),
            workdir: config.workdir.clone(),
            env: config.env.clone(),
            stream_logs: run_config.stream_logs,
            heartbeat: run_config.heartbeat.is_some(),
        });
    }

    fn next_response(&self, config: &CommandConfig) -> MockResponse {
        if let Some((_, response)) = self.rules.read().iter().find(|(m, _)| m(config)) {
            return response.clone();
        }

        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }

    fn check_failure(&self) -> RunnerResult<()> {
        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        config: &CommandConfig,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        self.record_call(config, run_config);
        self.check_failure()?;

        let response = self.next_response(config);
        let now = Utc::now();
        Ok(ExecutionResult {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at: now,
            finished_at: now,
            duration_ms: response.duration_ms,
        })
    }
}
