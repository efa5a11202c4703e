// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recurrence scheduling for repeat cleanings.
//
// A schedule repeats every cadence period and always lands on the customer's
// preferred weekday and start time.  Dates are only ever moved forward when
// snapping to that slot.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use tracing::debug;

use maidbook_core::error::{MaidbookError, Result};
use maidbook_core::types::{BookingId, Cadence, PreferredHour, RecurringSchedule, ScheduleId};

/// The user-editable part of a recurring schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub cadence: Cadence,
    pub weekday: Weekday,
    pub hour: PreferredHour,
}

impl Slot {
    /// Parse the raw values a booking form submits.
    pub fn parse(cadence: &str, weekday: &str, hour: &str) -> Result<Self> {
        Ok(Self {
            cadence: cadence.parse()?,
            weekday: maidbook_core::types::parse_weekday(weekday)?,
            hour: hour.parse()?,
        })
    }
}

/// Compute when the next occurrence of a recurring booking is due.
///
/// Without a completion, this is the soonest slot at or after `reference_now`;
/// if `reference_now` sits exactly on the slot, the booking moves one full
/// period out instead.  With a completion, one period is added to
/// `last_completed_at` and the result is snapped forward onto the slot.
///
/// "One period" therefore always means the period followed by that forward
/// snap: a monthly booking started exactly on its slot lands 35 days later,
/// not 30, because day 30 is not the preferred weekday.
pub fn compute_next_occurrence(
    cadence: Cadence,
    preferred_weekday: Weekday,
    preferred_hour: PreferredHour,
    last_completed_at: Option<DateTime<Utc>>,
    reference_now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let period = cadence.period_days();

    let next = match last_completed_at {
        Some(last) => snap_forward(add_days(last, period)?, preferred_weekday, preferred_hour)?,
        None => {
            let soonest = snap_forward(reference_now, preferred_weekday, preferred_hour)?;
            if soonest == reference_now {
                snap_forward(
                    add_days(reference_now, period)?,
                    preferred_weekday,
                    preferred_hour,
                )?
            } else {
                soonest
            }
        }
    };

    debug!(%cadence, weekday = %preferred_weekday, hour = %preferred_hour, %next, "next occurrence computed");
    Ok(next)
}

/// Build the schedule for a freshly made recurring booking.
pub fn new_schedule(booking_id: BookingId, slot: Slot, now: DateTime<Utc>) -> Result<RecurringSchedule> {
    let next_occurrence_at = compute_next_occurrence(slot.cadence, slot.weekday, slot.hour, None, now)?;
    Ok(RecurringSchedule {
        id: ScheduleId::new(),
        booking_id,
        cadence: slot.cadence,
        preferred_weekday: slot.weekday,
        preferred_hour: slot.hour,
        last_completed_at: None,
        next_occurrence_at,
        updated_at: now,
    })
}

/// Advance a schedule after a cleaning was completed at `completed_at`.
pub fn record_completion(
    schedule: &RecurringSchedule,
    completed_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<RecurringSchedule> {
    if let Some(previous) = schedule.last_completed_at
        && completed_at < previous
    {
        return Err(MaidbookError::InvalidScheduleInput(format!(
            "completion at {completed_at} precedes recorded completion at {previous}"
        )));
    }

    let next_occurrence_at = compute_next_occurrence(
        schedule.cadence,
        schedule.preferred_weekday,
        schedule.preferred_hour,
        Some(completed_at),
        now,
    )?;

    Ok(RecurringSchedule {
        last_completed_at: Some(completed_at),
        next_occurrence_at,
        updated_at: now,
        ..schedule.clone()
    })
}

/// Apply an edit of cadence, weekday or hour.
///
/// The previous `next_occurrence_at` is discarded and recomputed from the last
/// completion, or from `now` if the booking never ran.
pub fn reschedule(schedule: &RecurringSchedule, slot: Slot, now: DateTime<Utc>) -> Result<RecurringSchedule> {
    let next_occurrence_at = compute_next_occurrence(
        slot.cadence,
        slot.weekday,
        slot.hour,
        schedule.last_completed_at,
        now,
    )?;

    Ok(RecurringSchedule {
        cadence: slot.cadence,
        preferred_weekday: slot.weekday,
        preferred_hour: slot.hour,
        next_occurrence_at,
        updated_at: now,
        ..schedule.clone()
    })
}

/// Earliest instant at or after `instant` on `weekday` at `hour`.
fn snap_forward(instant: DateTime<Utc>, weekday: Weekday, hour: PreferredHour) -> Result<DateTime<Utc>> {
    let date = instant.date_naive();
    let days_ahead = (7 + i64::from(weekday.num_days_from_monday())
        - i64::from(date.weekday().num_days_from_monday()))
        % 7;

    let same_day_slot = Utc.from_utc_datetime(&date.and_time(hour.time()));
    let candidate = add_days(same_day_slot, days_ahead)?;
    if candidate >= instant {
        Ok(candidate)
    } else {
        add_days(candidate, 7)
    }
}

fn add_days(instant: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    instant
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| MaidbookError::InvalidScheduleInput(format!("{instant} + {days} days is out of range")))
}
