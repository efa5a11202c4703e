// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Maidbook app shell — the service layer and per-screen state the customer
// and maid screens are built on.

pub mod services;
pub mod state;

pub use services::app_services::AppServices;
pub use state::ScheduleScreenState;
