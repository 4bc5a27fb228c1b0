//! Shared helpers for end-to-end tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

use pyeval_core::application::ScriptEvalFunction;
use pyeval_core::cancel::CancelToken;
use pyeval_core::domain::InvocationConfig;
use pyeval_core::port::{CommandSpec, ProcessOutput, ProcessRunner, RunError};
use pyeval_infra_system::SubprocessRunner;

/// `/bin/sh -c <script>`: always present on unix test hosts
pub fn shell_function() -> ScriptEvalFunction {
    shell_function_with(InvocationConfig::new("/bin/sh", "-c", "Shell"))
}

pub fn shell_function_with(config: InvocationConfig) -> ScriptEvalFunction {
    ScriptEvalFunction::new("sheval", config, Arc::new(SubprocessRunner::new()))
}

/// The default `pyeval` function backed by a real runner
pub fn python_function() -> ScriptEvalFunction {
    ScriptEvalFunction::python(Arc::new(SubprocessRunner::new()))
}

/// Real subprocess runner that counts spawn attempts
#[derive(Clone, Default)]
pub struct CountingRunner {
    inner: SubprocessRunner,
    spawns: Arc<AtomicUsize>,
}

impl CountingRunner {
    pub fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for CountingRunner {
    async fn run(&self, spec: &CommandSpec, cancel: CancelToken) -> Result<ProcessOutput, RunError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        self.inner.run(spec, cancel).await
    }
}

/// `/bin/sh -c <script>` on a counting runner
pub fn counted_shell_function() -> (ScriptEvalFunction, CountingRunner) {
    let runner = CountingRunner::default();
    let function = ScriptEvalFunction::new(
        "sheval",
        InvocationConfig::new("/bin/sh", "-c", "Shell"),
        Arc::new(runner.clone()),
    );
    (function, runner)
}

pub fn python3_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// In-memory log sink for asserting on emitted log lines
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Install as the thread-local default subscriber (current-thread runtimes only)
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
