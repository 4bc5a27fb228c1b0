// Shared constants (no magic values)
use std::time::Duration;

/// Name under which the default Python function is registered
pub const DEFAULT_FUNCTION_NAME: &str = "pyeval";

/// Interpreter used by the default function
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Flag that makes the interpreter execute the next argument as source code
pub const DEFAULT_INLINE_FLAG: &str = "-c";

/// Language label used in definition text and error messages
pub const DEFAULT_LANGUAGE: &str = "Python";

/// Name of the single script parameter (argument position 0)
pub const SCRIPT_PARAMETER: &str = "script";

/// Position of the script parameter in the function signature
pub const SCRIPT_ARGUMENT_POSITION: usize = 0;

/// Result attribute holding captured standard output
pub const STDOUT_ATTRIBUTE: &str = "stdout";

/// Result attribute holding captured standard error (only when capture is enabled)
pub const STDERR_ATTRIBUTE: &str = "stderr";

/// Time a cancelled child gets between SIGTERM and SIGKILL (2 seconds)
pub const GRACEFUL_KILL_TIMEOUT: Duration = Duration::from_secs(2);
