// Domain Layer - Pure types for function calls

pub mod definition;
pub mod error;
pub mod invocation;
pub mod value;

// Re-exports
pub use definition::{Definition, Description, Metadata, Parameter, ReturnType, ValueType};
pub use error::FuncError;
pub use invocation::{InvocationConfig, InvocationRequest};
pub use value::{ArgumentBundle, ObjectValue};

/// Outcome of a function call as seen by the host dispatcher
pub type FunctionResult = std::result::Result<ObjectValue, FuncError>;
