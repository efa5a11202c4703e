// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Maidbook — recurring cleaning bookings and provider ratings
//
// Entry point. Initialises logging and backend services, then reports the
// cleanings due within the configured lookahead.

use chrono::Utc;

use maidbook_app::{AppServices, ScheduleScreenState};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Maidbook starting");

    let svc = match AppServices::init() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "persistent storage failed — using in-memory fallback");
            match AppServices::in_memory() {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "in-memory fallback failed");
                    std::process::exit(1);
                }
            }
        }
    };

    let now = Utc::now();
    let state = match svc.due_schedules(now) {
        Ok(due) => ScheduleScreenState::default().with_schedules(due),
        Err(e) => ScheduleScreenState::default().with_error(&e),
    };

    if let Some(err) = &state.error {
        tracing::warn!(message = %err.message, suggestion = %err.suggestion, "could not load cleanings");
    }
    for schedule in &state.schedules {
        tracing::info!(
            schedule_id = %schedule.id,
            cadence = %schedule.cadence,
            next = %schedule.next_occurrence_at,
            "upcoming cleaning"
        );
    }
    tracing::info!(count = state.schedules.len(), data_dir = %svc.data_dir().display(), "Maidbook ready");
}
