// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Screen state for the "my cleanings" list.
//
// The screen owns one cell holding a `ScheduleScreenState`.  Every service
// result produces a new state value that replaces the old one wholesale.

use maidbook_core::error::MaidbookError;
use maidbook_core::human_errors::{HumanError, humanize_error};
use maidbook_core::types::{RecurringSchedule, ScheduleId};

/// Snapshot shown by the recurring-cleanings screen.
#[derive(Debug, Clone, Default)]
pub struct ScheduleScreenState {
    /// Upcoming schedules, soonest first.
    pub schedules: Vec<RecurringSchedule>,
    /// Schedule whose detail sheet is open.
    pub selected: Option<ScheduleId>,
    /// Last error, already translated for display.
    pub error: Option<HumanError>,
}

impl ScheduleScreenState {
    /// Replace the list with a fresh load, clearing any error.
    pub fn with_schedules(self, mut schedules: Vec<RecurringSchedule>) -> Self {
        schedules.sort_by_key(|s| s.next_occurrence_at);
        let selected = self
            .selected
            .filter(|id| schedules.iter().any(|s| s.id == *id));
        Self {
            schedules,
            selected,
            error: None,
        }
    }

    /// Insert or replace one schedule after a create, completion or edit.
    pub fn with_schedule(self, schedule: RecurringSchedule) -> Self {
        let mut schedules: Vec<_> = self
            .schedules
            .into_iter()
            .filter(|s| s.id != schedule.id)
            .collect();
        schedules.push(schedule);
        Self {
            selected: self.selected,
            ..Self::default()
        }
        .with_schedules(schedules)
    }

    /// Drop a cancelled schedule.
    pub fn without(self, id: &ScheduleId) -> Self {
        let schedules = self.schedules.into_iter().filter(|s| s.id != *id).collect();
        Self {
            selected: self.selected.filter(|sel| sel != id),
            ..Self::default()
        }
        .with_schedules(schedules)
    }

    pub fn with_selection(self, selected: Option<ScheduleId>) -> Self {
        let selected = selected.filter(|id| self.schedules.iter().any(|s| s.id == *id));
        Self { selected, ..self }
    }

    /// Keep the current list and show `err`.
    pub fn with_error(self, err: &MaidbookError) -> Self {
        Self {
            error: Some(humanize_error(err)),
            ..self
        }
    }
}
