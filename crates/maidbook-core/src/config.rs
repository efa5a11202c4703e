// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

use crate::{Cadence, PreferredHour};

/// Persistent application settings.
///
/// Fields missing from an older `config.json` take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cadence preselected when a customer starts a recurring booking.
    pub default_cadence: Cadence,
    /// Start time preselected for new recurring bookings.
    pub default_preferred_hour: PreferredHour,
    /// How far ahead (in days) the "upcoming cleanings" list looks.
    pub due_lookahead_days: u32,
    /// Retries for a review submission that lost a concurrent update.
    pub review_max_retries: u32,
    /// Base backoff between review submission retries, in milliseconds.
    pub review_retry_base_ms: u64,
    /// How long a write waits for another process holding the database lock.
    pub store_busy_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_cadence: Cadence::Weekly,
            default_preferred_hour: PreferredHour::from_hm(9, 0)
                .unwrap_or_else(|_| PreferredHour::midnight()),
            due_lookahead_days: 14,
            review_max_retries: 3,
            review_retry_base_ms: 50,
            store_busy_timeout_ms: 2000,
        }
    }
}
