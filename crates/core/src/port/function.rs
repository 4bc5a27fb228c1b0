// Function Port
// Contract between the host dispatcher and a callable function

use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::domain::{ArgumentBundle, Definition, Description, FunctionResult, Metadata};

/// A function the host can describe and call.
///
/// Implementations hold no per-call state, so one instance may serve any
/// number of concurrent calls.
#[async_trait]
pub trait Function: Send + Sync {
    /// Stable identifier
    fn metadata(&self) -> Metadata;

    /// Signature and documentation
    fn definition(&self) -> Definition;

    /// Metadata and definition in one value
    fn describe(&self) -> Description {
        Description {
            name: self.metadata().name,
            definition: self.definition(),
        }
    }

    /// Run the function once with the given arguments
    ///
    /// # Errors
    /// - FuncError::Argument if arguments fail to decode (nothing is executed)
    /// - FuncError::Execution if the underlying work fails
    /// - FuncError::ResultConstruction if the output cannot be shaped
    /// - FuncError::Cancelled if `cancel` fires before completion
    async fn run(&self, args: &ArgumentBundle, cancel: CancelToken) -> FunctionResult;
}
