//! PyEval CLI - local host for PyEval functions
//!
//! Plays the host dispatcher: builds the argument bundle, calls the function
//! through the registry and prints the result object as JSON.

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::warn;

use config::InterpreterArgs;
use pyeval_core::application::{FunctionRegistry, ScriptEvalFunction};
use pyeval_core::constants::SCRIPT_PARAMETER;
use pyeval_core::domain::{ArgumentBundle, Description, FuncError, ReturnType};
use pyeval_core::{cancel_channel, AppError};
use pyeval_infra_system::SubprocessRunner;

/// Exit code for malformed input (bad arguments, unknown function)
const EXIT_USAGE: u8 = 2;
/// Exit code for execution / result failures
const EXIT_FAILURE: u8 = 1;
/// Exit code after Ctrl+C cancelled the call (128 + SIGINT)
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "pyeval")]
#[command(about = "Run scripts through an external interpreter and capture stdout", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    interpreter: InterpreterArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe registered functions
    Describe {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Call a function
    Call {
        /// Function name (default: the configured function)
        function: Option<String>,

        /// Script text passed as the `script` argument
        #[arg(long, conflicts_with = "args")]
        script: Option<String>,

        /// Full argument bundle as a JSON object
        #[arg(long)]
        args: Option<String>,
    },
}

#[derive(Tabled)]
struct FunctionRow {
    name: String,
    summary: String,
    parameters: String,
    returns: String,
}

impl From<Description> for FunctionRow {
    fn from(description: Description) -> Self {
        let parameters = description
            .definition
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.value_type))
            .collect::<Vec<_>>()
            .join(", ");

        let ReturnType::Object { attribute_types } = &description.definition.return_type;
        let returns = format!(
            "object {{ {} }}",
            attribute_types
                .iter()
                .map(|(name, ty)| format!("{}: {}", name, ty))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self {
            name: description.name,
            summary: description.definition.summary,
            parameters,
            returns,
        }
    }
}

fn build_registry(interpreter: &InterpreterArgs) -> Result<FunctionRegistry> {
    let config = interpreter.to_config().context("Invalid interpreter configuration")?;

    let mut registry = FunctionRegistry::new();
    registry.register(Arc::new(ScriptEvalFunction::new(
        interpreter.function_name.clone(),
        config,
        Arc::new(SubprocessRunner::new()),
    )))?;

    Ok(registry)
}

fn build_bundle(script: Option<String>, args: Option<String>) -> Result<ArgumentBundle> {
    match (script, args) {
        (Some(script), _) => Ok(ArgumentBundle::with_string(SCRIPT_PARAMETER, script)),
        (None, Some(raw)) => {
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("Invalid JSON arguments")?;
            Ok(ArgumentBundle::from_value(value)?)
        }
        (None, None) => Ok(ArgumentBundle::default()),
    }
}

fn exit_code_for(err: &AppError) -> u8 {
    match err {
        AppError::Function(FuncError::Argument { .. }) | AppError::NotFound(_) => EXIT_USAGE,
        AppError::Function(FuncError::Cancelled { .. }) => EXIT_CANCELLED,
        _ => EXIT_FAILURE,
    }
}

fn describe(registry: &FunctionRegistry, json: bool) -> Result<()> {
    let descriptions = registry.describe_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptions)?);
    } else {
        let rows: Vec<FunctionRow> = descriptions.into_iter().map(FunctionRow::from).collect();
        println!("{}", Table::new(rows));
    }

    Ok(())
}

async fn call(
    registry: &FunctionRegistry,
    function: &str,
    args: ArgumentBundle,
) -> Result<ExitCode> {
    let (cancel_tx, cancel) = cancel_channel();

    let call = registry.call(function, args, cancel);
    tokio::pin!(call);

    let result = tokio::select! {
        res = &mut call => res,
        _ = tokio::signal::ctrl_c() => {
            warn!(function = %function, "Interrupt received, cancelling call");
            cancel_tx.cancel();
            call.await
        }
    };

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value.into_value())?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            match &e {
                AppError::Function(func_err) => {
                    eprintln!("{} {}", "✗".red().bold(), func_err);
                    if let Some(position) = func_err.argument_position() {
                        eprintln!("  {} argument {}", "at".dimmed(), position);
                    }
                }
                other => eprintln!("{} {}", "✗".red().bold(), other),
            }
            Ok(ExitCode::from(exit_code_for(&e)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init_logging()?;

    let registry = build_registry(&cli.interpreter)?;

    match cli.command {
        Commands::Describe { json } => {
            describe(&registry, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Call {
            function,
            script,
            args,
        } => {
            let bundle = match build_bundle(script, args) {
                Ok(bundle) => bundle,
                Err(e) => {
                    eprintln!("{} {:#}", "✗".red().bold(), e);
                    return Ok(ExitCode::from(EXIT_USAGE));
                }
            };
            let function = function.unwrap_or_else(|| cli.interpreter.function_name.clone());
            call(&registry, &function, bundle).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyeval_core::constants::DEFAULT_FUNCTION_NAME;

    #[test]
    fn test_build_bundle_from_script() {
        let bundle = build_bundle(Some("print(1)".to_string()), None).unwrap();
        assert_eq!(bundle, ArgumentBundle::with_string("script", "print(1)"));
    }

    #[test]
    fn test_build_bundle_from_json() {
        let bundle = build_bundle(None, Some(r#"{"script": "x"}"#.to_string())).unwrap();
        assert_eq!(bundle, ArgumentBundle::with_string("script", "x"));
    }

    #[test]
    fn test_build_bundle_rejects_bad_json() {
        assert!(build_bundle(None, Some("{not json".to_string())).is_err());
        assert!(build_bundle(None, Some("[1]".to_string())).is_err());
    }

    #[test]
    fn test_build_bundle_empty() {
        assert!(build_bundle(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for(&AppError::Function(FuncError::argument(0, "x"))),
            EXIT_USAGE
        );
        assert_eq!(
            exit_code_for(&AppError::Function(FuncError::cancelled(0, "x"))),
            EXIT_CANCELLED
        );
        assert_eq!(
            exit_code_for(&AppError::Function(FuncError::execution(0, "x"))),
            EXIT_FAILURE
        );
        assert_eq!(exit_code_for(&AppError::NotFound("f".into())), EXIT_USAGE);
    }

    #[test]
    fn test_cli_parses_call() {
        let cli = Cli::parse_from(["pyeval", "call", "--script", "print('hi')"]);
        match cli.command {
            Commands::Call {
                function, script, ..
            } => {
                assert_eq!(function, None);
                assert_eq!(script.as_deref(), Some("print('hi')"));
            }
            _ => panic!("expected call"),
        }
        assert_eq!(cli.interpreter.function_name, DEFAULT_FUNCTION_NAME);
    }

    #[test]
    fn test_function_row_formatting() {
        let registry = build_registry(&Cli::parse_from(["pyeval", "describe"]).interpreter).unwrap();
        let row = FunctionRow::from(registry.describe_all().remove(0));

        assert_eq!(row.name, "pyeval");
        assert_eq!(row.parameters, "script: string");
        assert_eq!(row.returns, "object { stdout: string }");
    }
}
