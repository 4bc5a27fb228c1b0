// PyEval Core - Domain Logic & Ports
// NO process spawning here: adapters implement the ports in their own crates

pub mod application;
pub mod cancel;
pub mod constants;
pub mod domain;
pub mod error;
pub mod port;

pub use cancel::{cancel_channel, CancelSender, CancelToken};
pub use error::{AppError, Result};
