// Script Execution Adapter
// Turns a `script` argument into one interpreter process and its stdout into a result object

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::cancel::CancelToken;
use crate::constants::{
    DEFAULT_FUNCTION_NAME, SCRIPT_ARGUMENT_POSITION, SCRIPT_PARAMETER, STDERR_ATTRIBUTE,
    STDOUT_ATTRIBUTE,
};
use crate::domain::{
    ArgumentBundle, Definition, FuncError, FunctionResult, InvocationConfig, InvocationRequest,
    Metadata, Parameter, ReturnType, ValueType,
};
use crate::port::{CommandSpec, Function, ProcessOutput, ProcessRunner, RunError};

/// Success payload before it is checked against the declared return type
#[derive(Debug, Serialize)]
struct ScriptOutput {
    stdout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
}

/// Runs a script through an external interpreter (`<interpreter> -c <script>`).
///
/// Holds only immutable configuration and a shared runner handle; every call
/// spawns its own process, with no retries and no caching.
pub struct ScriptEvalFunction {
    name: String,
    config: InvocationConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl ScriptEvalFunction {
    pub fn new(
        name: impl Into<String>,
        config: InvocationConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            runner,
        }
    }

    /// The default `pyeval` function: `python3 -c <script>`
    pub fn python(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(DEFAULT_FUNCTION_NAME, InvocationConfig::default(), runner)
    }

    /// Execute an already-decoded request
    pub async fn execute(&self, request: &InvocationRequest, cancel: CancelToken) -> FunctionResult {
        let spec = self.command_spec(request);

        debug!(
            function = %self.name,
            interpreter = %spec.program,
            script_len = request.script.len(),
            timeout_ms = ?spec.timeout.map(|t| t.as_millis()),
            "Running script"
        );

        match self.runner.run(&spec, cancel).await {
            Ok(output) if output.success => self.shape_output(output),
            Ok(output) => {
                error!(
                    function = %self.name,
                    exit_code = ?output.exit_code,
                    "failed to run {} script, underlying error: {}",
                    self.config.language,
                    exit_description(&output)
                );
                Err(self.execution_error(request))
            }
            Err(RunError::Cancelled) => {
                warn!(function = %self.name, "{} script cancelled", self.config.language);
                Err(FuncError::cancelled(
                    SCRIPT_ARGUMENT_POSITION,
                    format!(
                        "{} script was cancelled: {}",
                        self.config.language, request.script
                    ),
                ))
            }
            Err(e) => {
                error!(
                    function = %self.name,
                    "failed to run {} script, underlying error: {}",
                    self.config.language,
                    e
                );
                Err(self.execution_error(request))
            }
        }
    }

    fn command_spec(&self, request: &InvocationRequest) -> CommandSpec {
        CommandSpec {
            program: self.config.interpreter.clone(),
            args: self.config.command_args(request),
            capture_stderr: self.config.capture_stderr,
            timeout: self.config.timeout,
            env_allowlist: self.config.env_allowlist.clone(),
        }
    }

    /// Caller-visible failure: echoes the script unescaped, never the OS error
    fn execution_error(&self, request: &InvocationRequest) -> FuncError {
        FuncError::execution(
            SCRIPT_ARGUMENT_POSITION,
            format!(
                "Error running {} script: {}",
                self.config.language, request.script
            ),
        )
    }

    fn return_type(&self) -> ReturnType {
        let mut attribute_types = BTreeMap::from([(STDOUT_ATTRIBUTE.to_string(), ValueType::String)]);
        if self.config.capture_stderr {
            attribute_types.insert(STDERR_ATTRIBUTE.to_string(), ValueType::String);
        }
        ReturnType::Object { attribute_types }
    }

    /// Decode captured bytes verbatim (no trimming) and shape the result object
    fn shape_output(&self, output: ProcessOutput) -> FunctionResult {
        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            FuncError::result_construction(format!("stdout is not valid UTF-8: {}", e))
        })?;
        let stderr = output
            .stderr
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

        let value = serde_json::to_value(ScriptOutput { stdout, stderr })
            .map_err(|e| FuncError::result_construction(e.to_string()))?;

        self.return_type().build_object(value)
    }
}

#[async_trait]
impl Function for ScriptEvalFunction {
    fn metadata(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
        }
    }

    fn definition(&self) -> Definition {
        let language = &self.config.language;
        let mut description = format!(
            "Given a {} script, will run the script and return the stdout output.",
            language
        );
        if self.config.capture_stderr {
            description.push_str(" Standard error is returned in the stderr attribute.");
        }

        Definition {
            summary: format!("Run a {} script", language),
            description,
            parameters: vec![Parameter::string(
                SCRIPT_PARAMETER,
                format!("{} script to run", language),
            )],
            return_type: self.return_type(),
        }
    }

    async fn run(&self, args: &ArgumentBundle, cancel: CancelToken) -> FunctionResult {
        let request = InvocationRequest::decode(args, &self.definition())?;
        self.execute(&request, cancel).await
    }
}

fn exit_description(output: &ProcessOutput) -> String {
    match output.exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}
