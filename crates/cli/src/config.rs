//! Interpreter configuration from flags and environment

use clap::Args;
use std::time::Duration;

use pyeval_core::constants::{
    DEFAULT_FUNCTION_NAME, DEFAULT_INLINE_FLAG, DEFAULT_INTERPRETER, DEFAULT_LANGUAGE,
};
use pyeval_core::domain::InvocationConfig;
use pyeval_core::{AppError, Result};

#[derive(Args, Debug, Clone)]
pub struct InterpreterArgs {
    /// Name the function is registered under
    #[arg(long, env = "PYEVAL_FUNCTION_NAME", default_value = DEFAULT_FUNCTION_NAME, global = true)]
    pub function_name: String,

    /// Interpreter executable (name on PATH or path, `~` is expanded)
    #[arg(long, env = "PYEVAL_INTERPRETER", default_value = DEFAULT_INTERPRETER, global = true)]
    pub interpreter: String,

    /// Flag that passes the script inline
    #[arg(
        long,
        env = "PYEVAL_INLINE_FLAG",
        default_value = DEFAULT_INLINE_FLAG,
        allow_hyphen_values = true,
        global = true
    )]
    pub inline_flag: String,

    /// Language label used in descriptions and error messages
    #[arg(long, env = "PYEVAL_LANGUAGE", default_value = DEFAULT_LANGUAGE, global = true)]
    pub language: String,

    /// Kill the interpreter after this many milliseconds (default: no limit)
    #[arg(long, env = "PYEVAL_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Return stderr in an extra `stderr` attribute instead of discarding it
    #[arg(long, env = "PYEVAL_CAPTURE_STDERR", global = true)]
    pub capture_stderr: bool,

    /// Comma-separated environment variables passed to the interpreter
    /// (default: inherit everything)
    #[arg(long, env = "PYEVAL_ENV_ALLOWLIST", value_delimiter = ',', global = true)]
    pub env_allowlist: Option<Vec<String>>,
}

impl InterpreterArgs {
    /// Validate and turn into an invocation config
    pub fn to_config(&self) -> Result<InvocationConfig> {
        if self.function_name.trim().is_empty() {
            return Err(AppError::Config("function name must not be empty".to_string()));
        }
        if self.interpreter.trim().is_empty() {
            return Err(AppError::Config("interpreter must not be empty".to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(AppError::Config("timeout must be greater than zero".to_string()));
        }

        let interpreter = shellexpand::tilde(&self.interpreter).into_owned();
        let mut config = InvocationConfig::new(interpreter, &self.inline_flag, &self.language)
            .with_stderr_capture(self.capture_stderr);

        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if let Some(allowlist) = &self.env_allowlist {
            config = config.with_env_allowlist(
                allowlist
                    .iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            );
        }

        Ok(config)
    }
}
