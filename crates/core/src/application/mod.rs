// Application Layer - Functions and the registry that dispatches to them

pub mod registry;
pub mod script_eval;

// Re-exports
pub use registry::FunctionRegistry;
pub use script_eval::ScriptEvalFunction;
