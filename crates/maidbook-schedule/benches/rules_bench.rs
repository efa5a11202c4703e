// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the recurrence and rating rules in the
// maidbook-schedule crate.

use chrono::{TimeZone, Utc, Weekday};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use maidbook_core::types::{Cadence, PreferredHour};
use maidbook_schedule::{apply_new_rating, compute_next_occurrence};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark next-occurrence computation for every cadence, with and without
/// a recorded completion.
fn bench_next_occurrence(c: &mut Criterion) {
    let hour: PreferredHour = "10:30".parse().expect("valid hour");
    let now = Utc.with_ymd_and_hms(2024, 6, 12, 8, 0, 0).unwrap();
    let last = Utc.with_ymd_and_hms(2024, 6, 3, 11, 15, 0).unwrap();

    let mut group = c.benchmark_group("compute_next_occurrence");
    for cadence in [Cadence::Weekly, Cadence::Biweekly, Cadence::Monthly] {
        group.bench_function(format!("{cadence} (never completed)"), |b| {
            b.iter(|| {
                let next = compute_next_occurrence(
                    black_box(cadence),
                    black_box(Weekday::Fri),
                    black_box(hour),
                    None,
                    black_box(now),
                )
                .expect("compute failed");
                black_box(next);
            });
        });
        group.bench_function(format!("{cadence} (after completion)"), |b| {
            b.iter(|| {
                let next = compute_next_occurrence(
                    black_box(cadence),
                    black_box(Weekday::Fri),
                    black_box(hour),
                    Some(black_box(last)),
                    black_box(now),
                )
                .expect("compute failed");
                black_box(next);
            });
        });
    }
    group.finish();
}

/// Benchmark folding a year's worth of reviews into a running average.
fn bench_rating_fold(c: &mut Criterion) {
    let ratings: Vec<i64> = (0..365).map(|i| (i % 5) + 1).collect();

    c.bench_function("apply_new_rating (365 reviews)", |b| {
        b.iter(|| {
            let mut average = 0.0;
            let mut count = 0_i64;
            for &r in &ratings {
                let update = apply_new_rating(average, count, black_box(r)).expect("apply failed");
                average = update.average;
                count = i64::from(update.count);
            }
            black_box(average);
        });
    });
}

criterion_group!(benches, bench_next_occurrence, bench_rating_fold);
criterion_main!(benches);
