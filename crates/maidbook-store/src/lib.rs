// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Maidbook Store — local SQLite persistence for recurring schedules, provider
// ratings and reviews, plus the retry policy for writes that lose a race.

pub mod retry;
pub mod store;

pub use retry::{RetryConfig, RetryDecision, should_retry};
pub use store::{BookingStore, DEFAULT_BUSY_TIMEOUT};
