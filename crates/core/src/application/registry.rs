// Function Registry - the set of functions a provider exposes to the host

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

use crate::cancel::CancelToken;
use crate::domain::{ArgumentBundle, Description, ObjectValue};
use crate::error::{AppError, Result};
use crate::port::Function;

/// Functions keyed by their metadata name
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its metadata name
    ///
    /// # Errors
    /// - AppError::Conflict if the name is already taken
    pub fn register(&mut self, function: Arc<dyn Function>) -> Result<()> {
        let name = function.metadata().name;
        if self.functions.contains_key(&name) {
            return Err(AppError::Conflict(format!(
                "function \"{}\" is already registered",
                name
            )));
        }
        self.functions.insert(name, function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Descriptions of every function, sorted by name
    pub fn describe_all(&self) -> Vec<Description> {
        self.functions.values().map(|f| f.describe()).collect()
    }

    /// Call a function by name.
    ///
    /// The call runs on its own task: a panicking function surfaces as
    /// `AppError::Internal` instead of unwinding into the caller. Dropping the
    /// returned future aborts the task.
    pub async fn call(
        &self,
        name: &str,
        args: ArgumentBundle,
        cancel: CancelToken,
    ) -> Result<ObjectValue> {
        let function = self
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("function \"{}\"", name)))?;

        let mut task = AbortOnDrop(tokio::spawn(async move {
            function.run(&args, cancel).await
        }));

        match (&mut task.0).await {
            Ok(result) => result.map_err(AppError::from),
            Err(e) if e.is_panic() => {
                let panic_msg = panic_message(e.into_panic());
                error!(function = %name, panic_msg = %panic_msg, "Function call panicked");
                Err(AppError::Internal(format!("function \"{}\" panicked", name)))
            }
            Err(e) => Err(AppError::Internal(e.to_string())),
        }
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
