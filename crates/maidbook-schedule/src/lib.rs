// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Maidbook Schedule — the pure booking rules shared by the customer and maid
// apps: when the next recurring cleaning happens, and how a new review moves
// a provider's average rating.  Nothing here reads a clock or touches storage;
// callers pass `now` in and persist what comes back.

pub mod rating;
pub mod recurrence;

pub use rating::{RatingUpdate, apply_new_rating};
pub use recurrence::{Slot, compute_next_occurrence};
