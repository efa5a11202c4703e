// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Maidbook.

use thiserror::Error;

/// Top-level error type for all Maidbook operations.
#[derive(Debug, Error)]
pub enum MaidbookError {
    // -- Validation errors (pure core) --
    #[error("invalid schedule input: {0}")]
    InvalidScheduleInput(String),

    #[error("invalid rating input: {0}")]
    InvalidRatingInput(String),

    // -- Storage / persistence --
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("concurrent update lost: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MaidbookError {
    /// Shorthand for a missing-record error.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MaidbookError>;
