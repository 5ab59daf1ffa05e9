//! Child-process execution for operator invocations.
//!
//! The [`Invoker`] runs an assembled token list as a child process and
//! captures both output streams and the exit status. Standard input is
//! always redirected from the null device, so an operator that tries to
//! prompt (NCO asks before overwriting files when `--overwrite` is absent)
//! reads end-of-input and fails fast instead of hanging the caller. That
//! guarantee, not the optional timeout, is the load-bearing mitigation
//! against interactive tools.
//!
//! Two strategies exist: direct vector exec (the default) and
//! shell-mediated exec, used for operator-chain expressions the external
//! tool parses itself. Shell mode quotes every token defensively. Hitting
//! the operating system's argument-list limit in vector mode surfaces as
//! [`NcoError::ArgListTooLong`]; falling back to the shell is an explicit
//! [`RetryPolicy`], never silent.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::NcoError;

/// Tracing target for invocation events.
const INVOKE_TARGET: &str = "ncokit::invoke";

/// How often a timed invocation polls the child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of a completed child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Full standard output.
    pub stdout: Vec<u8>,
    /// Full standard error.
    pub stderr: Vec<u8>,
    /// Exit status, verbatim; `-1` when the child died to a signal.
    pub return_code: i32,
}

impl ProcessOutput {
    /// Whether the child exited successfully.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.return_code == 0
    }
}

/// What to do when direct vector exec exceeds the argument-list limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Surface [`NcoError::ArgListTooLong`] to the caller.
    #[default]
    Never,
    /// Retry the same invocation once through the shell.
    ShellOnArgListTooLong,
}

/// Executes assembled argument vectors as child processes.
#[derive(Debug, Clone, Default)]
pub struct Invoker {
    timeout: Option<Duration>,
    retry: RetryPolicy,
}

impl Invoker {
    /// Creates an invoker with no timeout and no retry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a wall-clock limit; on expiry the child is killed and
    /// [`NcoError::Timeout`] returned.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the argument-list-too-long retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs `tokens` (binary first), merging `env` over the inherited
    /// environment for this invocation only.
    ///
    /// # Errors
    ///
    /// Returns [`NcoError::Spawn`] when the child cannot be started,
    /// [`NcoError::ArgListTooLong`] per the retry policy, and
    /// [`NcoError::Timeout`] when a configured timeout expires. A nonzero
    /// child exit status is not an error here; classification happens at
    /// the dispatch layer.
    pub fn run(
        &self,
        operator: &str,
        tokens: &[String],
        env: &[(String, String)],
        use_shell: bool,
    ) -> Result<ProcessOutput, NcoError> {
        debug!(
            target: INVOKE_TARGET,
            operator,
            command = %tokens.join(" "),
            shell = use_shell,
            "invoking operator"
        );
        for (key, value) in env {
            debug!(target: INVOKE_TARGET, operator, "env override: {key}={value}");
        }

        let result = if use_shell {
            self.run_shell(operator, tokens, env)
        } else {
            match self.run_vector(operator, tokens, env) {
                Err(NcoError::ArgListTooLong { .. })
                    if self.retry == RetryPolicy::ShellOnArgListTooLong =>
                {
                    debug!(
                        target: INVOKE_TARGET,
                        operator, "argument list too long, retrying through shell"
                    );
                    self.run_shell(operator, tokens, env)
                }
                other => other,
            }
        };

        if let Ok(output) = &result {
            debug!(
                target: INVOKE_TARGET,
                operator,
                return_code = output.return_code,
                "operator finished"
            );
        }
        result
    }

    fn run_vector(
        &self,
        operator: &str,
        tokens: &[String],
        env: &[(String, String)],
    ) -> Result<ProcessOutput, NcoError> {
        let Some((binary, args)) = tokens.split_first() else {
            return Err(NcoError::spawn(
                operator,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument vector"),
            ));
        };
        let mut command = Command::new(binary);
        command.args(args);
        self.execute(operator, command, env)
    }

    fn run_shell(
        &self,
        operator: &str,
        tokens: &[String],
        env: &[(String, String)],
    ) -> Result<ProcessOutput, NcoError> {
        let line = shell_words::join(tokens.iter().map(String::as_str));
        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(line);
        self.execute(operator, command, env)
    }

    fn execute(
        &self,
        operator: &str,
        mut command: Command,
        env: &[(String, String)],
    ) -> Result<ProcessOutput, NcoError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(env.iter().map(|(k, v)| (k.clone(), v.clone())));

        match self.timeout {
            None => {
                let output = command
                    .output()
                    .map_err(|source| classify_spawn_error(operator, source))?;
                Ok(ProcessOutput {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    return_code: output.status.code().unwrap_or(-1),
                })
            }
            Some(timeout) => {
                let child = command
                    .spawn()
                    .map_err(|source| classify_spawn_error(operator, source))?;
                wait_with_deadline(operator, child, timeout)
            }
        }
    }
}

fn classify_spawn_error(operator: &str, source: std::io::Error) -> NcoError {
    if source.kind() == std::io::ErrorKind::ArgumentListTooLong || source.raw_os_error() == Some(7)
    {
        NcoError::ArgListTooLong {
            operator: String::from(operator),
        }
    } else {
        NcoError::spawn(operator, source)
    }
}

fn wait_with_deadline(
    operator: &str,
    mut child: Child,
    timeout: Duration,
) -> Result<ProcessOutput, NcoError> {
    let stdout = child.stdout.take().map(drain_pipe);
    let stderr = child.stderr.take().map(drain_pipe);
    let deadline = Instant::now() + timeout;

    let status = loop {
        match child
            .try_wait()
            .map_err(|source| NcoError::spawn(operator, source))?
        {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                child.kill().ok();
                child.wait().ok();
                collect(stdout);
                collect(stderr);
                return Err(NcoError::Timeout {
                    operator: String::from(operator),
                    timeout_secs: timeout.as_secs(),
                });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    Ok(ProcessOutput {
        stdout: collect(stdout),
        stderr: collect(stderr),
        return_code: status.code().unwrap_or(-1),
    })
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _unused = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
