// Port Layer - Interfaces for external dependencies

pub mod function;
pub mod process_runner;

// Re-exports
pub use function::Function;
pub use process_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunError};
