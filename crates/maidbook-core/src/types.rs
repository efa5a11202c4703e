// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for recurring bookings and provider ratings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MaidbookError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a recurring schedule.
    ScheduleId
);
uuid_id!(
    /// Identifier of the booking a schedule belongs to.
    BookingId
);
uuid_id!(
    /// Identifier of a rated service provider.
    SubjectId
);
uuid_id!(
    /// Unique identifier for a submitted review.
    ReviewId
);

/// How often a recurring booking repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cadence {
    Weekly,
    Biweekly,
    /// Fixed 30-day period, not a calendar month.
    Monthly,
}

impl Cadence {
    /// Length of one cadence period in days.
    pub fn period_days(&self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Biweekly => 14,
            Self::Monthly => 30,
        }
    }

    /// Lowercase keyword used by the apps and the store.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Cadence {
    type Err = MaidbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" | "bi-weekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(MaidbookError::InvalidScheduleInput(format!(
                "unrecognised cadence {other:?}"
            ))),
        }
    }
}

/// Parse an English weekday name or abbreviation ("monday", "Mon", ...).
pub fn parse_weekday(s: &str) -> Result<Weekday, MaidbookError> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| MaidbookError::InvalidScheduleInput(format!("unrecognised weekday {s:?}")))
}

/// Wall-clock start time of a cleaning, minute precision (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PreferredHour(NaiveTime);

impl PreferredHour {
    /// Build from an hour (0-23) and minute (0-59).
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, MaidbookError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| {
                MaidbookError::InvalidScheduleInput(format!("invalid time {hour}:{minute:02}"))
            })
    }

    pub fn midnight() -> Self {
        Self(NaiveTime::default())
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl FromStr for PreferredHour {
    type Err = MaidbookError;

    /// Accepts `HH:MM` or `H:MM` in 24-hour form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|e| MaidbookError::InvalidScheduleInput(format!("preferred hour {s:?}: {e}")))
    }
}

impl fmt::Display for PreferredHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for PreferredHour {
    type Error = MaidbookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PreferredHour> for String {
    fn from(value: PreferredHour) -> Self {
        value.to_string()
    }
}

/// A recurring cleaning slot attached to a booking.
///
/// `next_occurrence_at` always lands on `preferred_weekday` at
/// `preferred_hour`, and is strictly after `last_completed_at` when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub id: ScheduleId,
    pub booking_id: BookingId,
    pub cadence: Cadence,
    pub preferred_weekday: Weekday,
    pub preferred_hour: PreferredHour,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub next_occurrence_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single star rating, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = MaidbookError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(MaidbookError::InvalidRatingInput(format!(
                "rating {value} outside {}..={}",
                Self::MIN,
                Self::MAX
            )))
        }
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A service provider whose rating is aggregated from reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSubject {
    pub id: SubjectId,
    pub display_name: String,
    /// Mean of all `review_count` ratings; 0.0 when unrated.
    pub average_rating: f64,
    pub review_count: u32,
}

impl RatingSubject {
    /// A provider with no reviews yet.
    pub fn unrated(display_name: impl Into<String>) -> Self {
        Self {
            id: SubjectId::new(),
            display_name: display_name.into(),
            average_rating: 0.0,
            review_count: 0,
        }
    }
}

/// A customer's review of a provider. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub subject_id: SubjectId,
    pub rating: Rating,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}
