// crates/resilience/src/lib.rs
//! Resilience primitives for fault-tolerant transfers
//!
//! This crate provides:
//! - Retry policies with exponential backoff
//! - Async timeout wrapping
//! - Cooperative cancellation tokens
//!
//! # Example
//!
//! ```rust
//! use driftsync_resilience::RetryPolicy;
//!
//! let policy = RetryPolicy::default()
//!     .with_max_retries(5)
//!     .with_base_delay_ms(250);
//! assert_eq!(policy.delay_for_attempt(1).as_millis(), 250);
//! ```

mod cancel;
mod error;
mod retry;
mod timeout;

pub use cancel::CancellationToken;
pub use error::{ResilienceError, ResilienceResult};
pub use retry::RetryPolicy;
pub use timeout::with_timeout;
