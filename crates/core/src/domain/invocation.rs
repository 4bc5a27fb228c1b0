// Invocation Domain Model

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::definition::Definition;
use super::error::FuncError;
use super::value::ArgumentBundle;
use crate::constants::{
    DEFAULT_INLINE_FLAG, DEFAULT_INTERPRETER, DEFAULT_LANGUAGE, SCRIPT_ARGUMENT_POSITION,
    SCRIPT_PARAMETER,
};

/// A single script invocation, created per call and consumed once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub script: String,
}

impl InvocationRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Decode the request from a named argument bundle.
    ///
    /// A missing, null or non-string `script` and any undeclared argument are
    /// argument errors, all attributed to the script position.
    pub fn decode(args: &ArgumentBundle, definition: &Definition) -> Result<Self, FuncError> {
        let parameter = definition
            .parameters
            .get(SCRIPT_ARGUMENT_POSITION)
            .filter(|p| p.name == SCRIPT_PARAMETER)
            .ok_or_else(|| {
                FuncError::result_construction("definition does not declare a script parameter")
            })?;

        let script = args.get_string(SCRIPT_ARGUMENT_POSITION, parameter)?;
        args.check_names(SCRIPT_ARGUMENT_POSITION, &definition.parameters)?;
        Ok(Self { script })
    }
}

/// How to invoke the external interpreter. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationConfig {
    /// Interpreter executable name or path
    pub interpreter: String,
    /// Flag that passes the script inline (e.g. `-c`)
    pub inline_flag: String,
    /// Human label for the script language
    pub language: String,
    /// Kill the child after this long; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Capture standard error into an extra `stderr` result attribute
    pub capture_stderr: bool,
    /// Pass only these environment variables; `None` inherits everything
    pub env_allowlist: Option<Vec<String>>,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            inline_flag: DEFAULT_INLINE_FLAG.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: None,
            capture_stderr: false,
            env_allowlist: None,
        }
    }
}

impl InvocationConfig {
    pub fn new(
        interpreter: impl Into<String>,
        inline_flag: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            inline_flag: inline_flag.into(),
            language: language.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stderr_capture(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    pub fn with_env_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.env_allowlist = Some(allowlist);
        self
    }

    /// Interpreter arguments for one invocation: `<inline_flag> <script>`
    pub fn command_args(&self, request: &InvocationRequest) -> Vec<String> {
        vec![self.inline_flag.clone(), request.script.clone()]
    }
}
