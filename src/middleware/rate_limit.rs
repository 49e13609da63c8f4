//! Rate limiting middleware
//!
//! Throttles token requests per username so credentials cannot be guessed
//! at full request speed.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};

use crate::utils::errors::{MenuError, Result};

/// Per-key request limiter backed by a keyed GCRA limiter
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    per_minute: NonZeroU32,
}

impl RateLimitMiddleware {
    /// Allow `per_minute` requests per key and minute; zero is treated as one
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            per_minute,
        }
    }

    /// Check if the key is rate limited
    pub fn check_rate_limit(&self, key: &str) -> Result<()> {
        let key = key.trim().to_lowercase();
        match self.limiter.check_key(&key) {
            Ok(()) => {
                debug!(key = %key, "Rate limit check passed");
                Ok(())
            }
            Err(_) => {
                warn!(key = %key, per_minute = self.per_minute.get(), "Rate limit exceeded");
                Err(MenuError::RateLimitExceeded)
            }
        }
    }

    /// Drop state for keys whose quota has fully replenished
    pub fn cleanup_old_entries(&self) {
        self.limiter.retain_recent();
        debug!(remaining_entries = self.limiter.len(), "Cleaned up old rate limit entries");
    }
}

impl std::fmt::Debug for RateLimitMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitMiddleware")
            .field("per_minute", &self.per_minute)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_rate_limit_basic() {
        let middleware = RateLimitMiddleware::new(3);

        assert_ok!(middleware.check_rate_limit("ana"));
        assert_ok!(middleware.check_rate_limit("ana"));
        assert_ok!(middleware.check_rate_limit("ana"));
        assert!(matches!(
            middleware.check_rate_limit("ana"),
            Err(MenuError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_keys_are_independent_and_case_insensitive() {
        let middleware = RateLimitMiddleware::new(1);

        assert_ok!(middleware.check_rate_limit("Ana"));
        assert_err!(middleware.check_rate_limit("ana "));
        assert_ok!(middleware.check_rate_limit("luis"));
    }

    #[test]
    fn test_zero_quota_still_allows_one_request() {
        let middleware = RateLimitMiddleware::new(0);
        assert_ok!(middleware.check_rate_limit("ana"));
        assert_err!(middleware.check_rate_limit("ana"));
    }

    #[test]
    fn test_cleanup_keeps_limited_keys() {
        let middleware = RateLimitMiddleware::new(1);
        middleware.check_rate_limit("ana").unwrap();
        middleware.cleanup_old_entries();
        assert_err!(middleware.check_rate_limit("ana"));
    }
}
