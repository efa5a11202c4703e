// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the screens to the booking rules and the store.
//
// Each service call runs one rule against one stored record and writes the
// result back, returning data the screens can display directly.

pub mod app_services;
pub mod data_dir;
