//! Ready-made decorators.

pub mod logging;
pub mod retry;

pub use logging::{LogLevel, Logging};
pub use retry::{RescueFrom, Retry, RetryOptions};
