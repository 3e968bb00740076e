//! Text-generation collaborator boundary
//!
//! The synthesis core never talks to a model backend directly. Everything
//! goes through the [`TextGenerator`] trait:
//! - Opaque `generate(prompt, options) -> text` contract
//! - Timeout/refusal failures retried with backoff up to a configured bound
//! - Cancellation observed at stage boundaries, never mid-call

pub mod cancel;
pub mod error;
pub mod generator;
pub mod retry;

pub use cancel::CancelToken;
pub use error::GenerationError;
pub use generator::{GenerationOptions, TextGenerator};
pub use retry::{generate_with_retry, RetryPolicy};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
