pub mod logging;
pub mod polling;

pub use polling::{PollPolicy, RetryPolicy};
