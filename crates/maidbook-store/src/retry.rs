// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy with exponential backoff + jitter for store writes.
//
// Classifies errors into Transient (auto-retry), UserAction (wait for user),
// and Permanent (give up). Only transient errors trigger automatic retries.
// The pure booking rules never retry; only the read-modify-write around them
// does.

use std::time::Duration;

use maidbook_core::error::MaidbookError;
use tracing::{debug, info, warn};

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Lost race or busy database — safe to retry automatically.
    Transient,
    /// User must correct their input.
    UserAction,
    /// Permanent failure — missing record, unreadable data.
    Permanent,
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry — error is permanent or user action needed.
    GiveUp(ErrorClass),
    /// Maximum retries exhausted.
    Exhausted,
}

/// Classify a `MaidbookError` into an `ErrorClass` for retry decisions.
pub fn classify_error(err: &MaidbookError) -> ErrorClass {
    match err {
        MaidbookError::Conflict(_) => ErrorClass::Transient,
        MaidbookError::Database(_) => ErrorClass::Transient,

        MaidbookError::InvalidScheduleInput(_) => ErrorClass::UserAction,
        MaidbookError::InvalidRatingInput(_) => ErrorClass::UserAction,

        MaidbookError::NotFound { .. } => ErrorClass::Permanent,
        MaidbookError::Serialization(_) => ErrorClass::Permanent,

        MaidbookError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock => ErrorClass::Transient,
            std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::StorageFull => {
                ErrorClass::UserAction
            }
            _ => ErrorClass::Permanent,
        },
    }
}

/// Decide whether to retry based on the error class and attempt count.
pub fn should_retry(err: &MaidbookError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!("permanent error — not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::UserAction => {
            info!("invalid input — not retrying");
            RetryDecision::GiveUp(ErrorClass::UserAction)
        }
        ErrorClass::Transient => {
            if attempt >= config.max_retries {
                warn!(attempt, max = config.max_retries, "retry limit exhausted");
                RetryDecision::Exhausted
            } else {
                let delay = compute_delay(attempt, config);
                debug!(attempt, delay_ms = delay.as_millis(), "scheduling retry");
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// delay = min(base * 2^attempt + jitter, max_delay), jitter in [0, base).
fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
    let total_ms = exp_ms.saturating_add(jitter(base_ms, attempt));
    let capped_ms = total_ms.min(config.max_delay.as_millis() as u64);

    Duration::from_millis(capped_ms)
}

/// Deterministic spread so two devices retrying the same review drift apart.
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = (attempt as u64).wrapping_mul(6364136223846793005);
    hash % base_ms.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_transient() {
        let err = MaidbookError::Conflict("review_count moved".into());
        assert_eq!(classify_error(&err), ErrorClass::Transient);
    }

    #[test]
    fn invalid_rating_is_user_action() {
        let err = MaidbookError::InvalidRatingInput("rating 0".into());
        assert_eq!(classify_error(&err), ErrorClass::UserAction);
    }

    #[test]
    fn missing_record_is_permanent() {
        let err = MaidbookError::not_found("schedule", "x");
        assert_eq!(classify_error(&err), ErrorClass::Permanent);
    }

    #[test]
    fn retry_respects_max() {
        let config = RetryConfig {
            max_retries: 3,
            ..Default::default()
        };
        let err = MaidbookError::Database("disk I/O error".into());
        assert!(matches!(should_retry(&err, 0, &config), RetryDecision::RetryAfter(_)));
        assert_eq!(should_retry(&err, 3, &config), RetryDecision::Exhausted);
    }

    #[test]
    fn validation_error_never_retries() {
        let config = RetryConfig::default();
        let err = MaidbookError::InvalidScheduleInput("preferred hour".into());
        assert_eq!(
            should_retry(&err, 0, &config),
            RetryDecision::GiveUp(ErrorClass::UserAction)
        );
    }

    #[test]
    fn delay_increases_with_attempts() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let d0 = compute_delay(0, &config);
        let d1 = compute_delay(1, &config);
        let d2 = compute_delay(2, &config);
        assert!(d1 > d0);
        assert!(d2 > d1);
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig {
            max_delay: Duration::from_millis(500),
            ..Default::default()
        };
        assert!(compute_delay(20, &config) <= Duration::from_millis(500));
    }
}
