//! Timeouts handed to the transport.

use std::time::Duration;

use vault_transport::Timeout;

/// Initial wait applied to requests and populated replies.
pub const DEFAULT_INITIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Computes the transport timeout for a dispatch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    default_initial: Timeout,
}

impl TimeoutPolicy {
    /// Policy using `default_initial` for every finite wait.
    #[must_use]
    pub const fn new(default_initial: Duration) -> Self {
        Self {
            default_initial: Timeout::new(default_initial),
        }
    }

    /// Timeout for a freshly sent request.
    #[must_use]
    pub const fn initial(&self) -> Timeout {
        self.default_initial
    }

    /// Timeout for the reply to an inbound request.
    ///
    /// A populated response waits for acknowledgment; no response closes the
    /// exchange immediately.
    #[must_use]
    pub const fn for_reply(&self, has_response: bool) -> Timeout {
        if has_response {
            self.default_initial
        } else {
            Timeout::IMMEDIATE
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_TIMEOUT)
    }
}
