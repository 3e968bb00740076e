//! The generation contract
//!
//! A backend is anything that can turn a prompt into text. The core treats
//! it as an opaque capability; prompts carry all the context.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};

/// Sampling parameters passed to the backend on every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
}

impl GenerationOptions {
    /// Create options with default sampling parameters
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// With max tokens
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// With nucleus cutoff
    #[inline]
    #[must_use]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            top_p: 0.7,
        }
    }
}

/// Opaque text-generation capability
///
/// Implementations wrap a model backend. The trait is object-safe so
/// components can hold `Arc<dyn TextGenerator>`.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt
    ///
    /// # Errors
    /// - `GenerationError::Timeout` if the backend misses its deadline
    /// - `GenerationError::Refused` if the backend declines the request
    /// - `GenerationError::Unreachable` if the backend cannot be contacted
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}
