// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for customers and maids.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the screens present it (toast, inline, dialog).

use crate::error::MaidbookError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Connection blip or lost race — retrying is expected to work.
    Transient,
    /// The user must change what they entered.
    ActionRequired,
    /// Nothing the user can do on this screen.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the system should auto-retry.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `MaidbookError` into a `HumanError` for display.
pub fn humanize_error(err: &MaidbookError) -> HumanError {
    match err {
        MaidbookError::InvalidScheduleInput(detail) => {
            if detail.contains("cadence") {
                HumanError {
                    message: "Please choose how often the cleaning repeats.".into(),
                    suggestion: "Pick weekly, every two weeks, or monthly.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if detail.contains("weekday") {
                HumanError {
                    message: "Please choose a day of the week.".into(),
                    suggestion: "Tap one of the days to set when the cleaner should come.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "That start time doesn't look right.".into(),
                    suggestion: format!("Enter a time like 09:30 using the 24-hour clock. ({detail})"),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        MaidbookError::InvalidRatingInput(_) => HumanError {
            message: "Please choose between 1 and 5 stars.".into(),
            suggestion: "Tap a star to rate your cleaner, then submit again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MaidbookError::NotFound { kind, .. } => HumanError {
            message: format!("This {kind} no longer exists."),
            suggestion: "It may have been cancelled on another device. Pull down to refresh.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        MaidbookError::Conflict(_) => HumanError {
            message: "Someone else updated this at the same time.".into(),
            suggestion: "We'll try again for you automatically.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        MaidbookError::Database(_) => HumanError {
            message: "We couldn't save your changes.".into(),
            suggestion: "Please try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        MaidbookError::Io(_) => HumanError {
            message: "The app couldn't read or write its files.".into(),
            suggestion: "Check that your phone has free storage space, then restart the app.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        MaidbookError::Serialization(_) => HumanError {
            message: "Some saved data couldn't be read.".into(),
            suggestion: "Your settings were reset to their defaults.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_rating_is_action_required() {
        let err = MaidbookError::InvalidRatingInput("rating 0 outside 1..=5".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn bad_hour_mentions_format() {
        let err = MaidbookError::InvalidScheduleInput("preferred hour \"25:00\"".into());
        let human = humanize_error(&err);
        assert!(human.suggestion.contains("09:30"));
    }

    #[test]
    fn conflict_is_retriable() {
        let human = humanize_error(&MaidbookError::Conflict("review_count moved".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn missing_schedule_names_the_kind() {
        let human = humanize_error(&MaidbookError::not_found("schedule", "abc"));
        assert!(human.message.contains("schedule"));
        assert_eq!(human.severity, Severity::Permanent);
    }
}
