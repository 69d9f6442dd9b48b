/*!
Executor boundary and per-target fan-out.

`Executor` is the collaborator that actually runs an operation against one
target (or locally). `dispatch` calls it once per target of a `Route`,
concurrently, and always returns one `TargetOutcome` per execution: a
failing or panicking target never cancels the others.

Only local execution ships here (`LocalExecutor`). Remote transport is
someone else's job; `LocalExecutor` reports remote targets as
`ExecError::NoTransport`.
*/

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::target::{ResolvedTarget, Route};

/// One logical command: operation name plus its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub operation: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(operation: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            operation: operation.into(),
            args,
        }
    }
}

/// Captured result of a completed execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no transport available for remote target @{alias} ({connection})")]
    NoTransport { alias: String, connection: String },

    #[error("local command line is empty")]
    EmptyCommand,

    #[error("failed to parse local command line: {0}")]
    CommandLine(#[from] shell_words::ParseError),

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("execution task failed: {0}")]
    Task(String),
}

/// Runs one invocation against one target (`None` = local instance).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        target: Option<&ResolvedTarget>,
        invocation: &Invocation,
    ) -> Result<ExecOutput, ExecError>;
}

/// Result for one target of a dispatch.
#[derive(Debug)]
pub struct TargetOutcome {
    /// `None` for local execution.
    pub target: Option<ResolvedTarget>,
    pub elapsed_ms: u128,
    pub result: Result<ExecOutput, ExecError>,
}

impl TargetOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(out) if out.success())
    }

    /// `@alias` or `local`.
    pub fn label(&self) -> String {
        match &self.target {
            Some(t) => format!("@{}", t.alias),
            None => "local".to_string(),
        }
    }
}

/// Execute `invocation` once per target of `route`.
///
/// Targets run concurrently; outcomes come back in route order. An empty
/// group yields an empty list.
pub async fn dispatch(
    executor: Arc<dyn Executor>,
    route: &Route,
    invocation: &Invocation,
) -> Vec<TargetOutcome> {
    let targets: Vec<Option<ResolvedTarget>> = match route {
        Route::Local => vec![None],
        other => other.targets().iter().cloned().map(Some).collect(),
    };
    debug!(
        operation = %invocation.operation,
        executions = targets.len(),
        "dispatching"
    );

    let handles: Vec<_> = targets
        .into_iter()
        .map(|target| {
            let executor = Arc::clone(&executor);
            let invocation = invocation.clone();
            let handle = tokio::spawn({
                let target = target.clone();
                async move {
                    let started = Instant::now();
                    let result = executor.execute(target.as_ref(), &invocation).await;
                    (started.elapsed().as_millis(), result)
                }
            });
            (target, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (target, handle) in handles {
        let (elapsed_ms, result) = match handle.await {
            Ok(done) => done,
            Err(join_err) => {
                warn!(error = %join_err, "execution task did not complete");
                (0, Err(ExecError::Task(join_err.to_string())))
            }
        };
        outcomes.push(TargetOutcome {
            target,
            elapsed_ms,
            result,
        });
    }
    outcomes
}

/// Runs the configured local application as a child process:
/// `<program> <base args...> <operation> <args...>`.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    program: String,
    base_args: Vec<String>,
}

impl LocalExecutor {
    /// Build from a shell-style command line, e.g. `"php bin/console"`.
    pub fn from_command_line(command_line: &str) -> Result<Self, ExecError> {
        let mut parts = shell_words::split(command_line)?;
        if parts.is_empty() || parts[0].is_empty() {
            return Err(ExecError::EmptyCommand);
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            base_args: parts,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argv (excluding the program) for an invocation.
    pub fn argv(&self, invocation: &Invocation) -> Vec<String> {
        let mut argv = self.base_args.clone();
        argv.push(invocation.operation.clone());
        argv.extend(invocation.args.iter().cloned());
        argv
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(
        &self,
        target: Option<&ResolvedTarget>,
        invocation: &Invocation,
    ) -> Result<ExecOutput, ExecError> {
        if let Some(t) = target {
            return Err(ExecError::NoTransport {
                alias: t.alias.clone(),
                connection: t.connection.to_string(),
            });
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(self.argv(invocation));
        debug!(program = %self.program, operation = %invocation.operation, "spawning local command");

        let output = cmd.output().await.map_err(|source| ExecError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        Ok(ExecOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
