//! Capability-layer failures

/// Failures reported by a text-generation backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Call exceeded the caller-supplied timeout
    #[error("generation timed out after {elapsed_secs}s")]
    Timeout {
        /// Seconds elapsed before the timeout fired
        elapsed_secs: u64,
    },

    /// Backend refused the request (rate limit, content policy, overload)
    #[error("generation refused: {reason}")]
    Refused {
        /// Backend-provided reason
        reason: String,
    },

    /// Backend unreachable; fatal once retries are exhausted
    #[error("generation backend unreachable: {0}")]
    Unreachable(String),

    /// Run was cancelled between stages
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Whether the caller should retry this failure
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Refused { .. })
    }

    /// Whether this failure ends the whole run
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
