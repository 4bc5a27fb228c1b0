// Process Runner Port
// Abstraction over spawning one external process and collecting its output

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::cancel::CancelToken;

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub capture_stderr: bool,
    pub timeout: Option<Duration>,
    /// `None` inherits the parent environment unchanged
    pub env_allowlist: Option<Vec<String>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            capture_stderr: false,
            timeout: None,
            env_allowlist: None,
        }
    }
}

/// Output of a process that ran to completion (successfully or not)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    /// Present only when the spec asked for stderr capture
    pub stderr: Option<Vec<u8>>,
}

/// Runner errors. These carry raw OS detail and are meant for logs only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process timeout after {0}ms")]
    Timeout(u64),

    #[error("Process cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(String),
}

/// Process Runner trait
///
/// Implementations:
/// - SubprocessRunner: tokio child process (infra-system)
/// - MockProcessRunner: scripted behavior for tests
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Spawn exactly one process and wait for it.
    ///
    /// A non-zero exit is not an error here: it comes back as a
    /// `ProcessOutput` with `success == false`.
    ///
    /// # Errors
    /// - RunError::SpawnFailed if the process cannot be started
    /// - RunError::Timeout if `spec.timeout` elapses first
    /// - RunError::Cancelled if `cancel` fires first
    ///
    /// On every error path after a successful spawn the child is terminated
    /// and reaped before returning.
    async fn run(&self, spec: &CommandSpec, cancel: CancelToken)
        -> Result<ProcessOutput, RunError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock runner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit with the given code after writing the given output
        Exit {
            code: i32,
            stdout: Vec<u8>,
            stderr: Vec<u8>,
        },
        /// Fail to spawn with message
        SpawnFail(String),
        /// Never finish on its own; only cancellation ends it
        Hang,
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Process Runner for testing
    #[derive(Clone)]
    pub struct MockProcessRunner {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
        last_spec: Arc<Mutex<Option<CommandSpec>>>,
    }

    impl MockProcessRunner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
                last_spec: Arc::new(Mutex::new(None)),
            }
        }

        pub fn new_stdout(stdout: impl Into<Vec<u8>>) -> Self {
            Self::new(MockBehavior::Exit {
                code: 0,
                stdout: stdout.into(),
                stderr: Vec::new(),
            })
        }

        pub fn new_exit(code: i32) -> Self {
            Self::new(MockBehavior::Exit {
                code,
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        }

        pub fn new_spawn_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::SpawnFail(message.into()))
        }

        pub fn new_hang() -> Self {
            Self::new(MockBehavior::Hang)
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        /// Number of spawn attempts seen
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        /// Spec of the most recent spawn attempt
        pub fn last_spec(&self) -> Option<CommandSpec> {
            self.last_spec.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn run(
            &self,
            spec: &CommandSpec,
            mut cancel: CancelToken,
        ) -> Result<ProcessOutput, RunError> {
            *self.call_count.lock().unwrap() += 1;
            *self.last_spec.lock().unwrap() = Some(spec.clone());

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Exit {
                    code,
                    stdout,
                    stderr,
                } => Ok(ProcessOutput {
                    success: code == 0,
                    exit_code: Some(code),
                    stdout,
                    stderr: spec.capture_stderr.then_some(stderr),
                }),
                MockBehavior::SpawnFail(msg) => Err(RunError::SpawnFailed(msg)),
                MockBehavior::Hang => {
                    cancel.cancelled().await;
                    Err(RunError::Cancelled)
                }
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }
    }
}
