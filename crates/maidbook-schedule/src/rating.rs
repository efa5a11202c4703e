// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Running-average rating aggregation.
//
// Each submitted review folds one rating into the provider's stored average
// with the incremental-mean update.  Rounding error accumulates over very many
// updates; review counts per provider stay small enough for that not to show.

use chrono::{DateTime, Utc};
use tracing::debug;

use maidbook_core::error::{MaidbookError, Result};
use maidbook_core::types::{Rating, RatingSubject, Review, ReviewId, SubjectId};

/// A provider's aggregate after one more rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingUpdate {
    pub average: f64,
    pub count: u32,
}

/// Fold `new_rating` into an average built from `current_count` ratings.
pub fn apply_new_rating(current_average: f64, current_count: i64, new_rating: i64) -> Result<RatingUpdate> {
    let rating = Rating::try_from(new_rating)?;

    if current_count < 0 {
        return Err(MaidbookError::InvalidRatingInput(format!(
            "review count {current_count} is negative"
        )));
    }
    let count = u32::try_from(current_count)
        .ok()
        .and_then(|c| c.checked_add(1))
        .ok_or_else(|| MaidbookError::InvalidRatingInput(format!("review count {current_count} too large")))?;

    if !current_average.is_finite() || !(0.0..=f64::from(Rating::MAX)).contains(&current_average) {
        return Err(MaidbookError::InvalidRatingInput(format!(
            "average {current_average} outside 0..=5"
        )));
    }
    if current_count > 0 && current_average < f64::from(Rating::MIN) {
        return Err(MaidbookError::InvalidRatingInput(format!(
            "average {current_average} impossible for {current_count} reviews"
        )));
    }

    let new_value = f64::from(rating.value());
    let average = if current_count == 0 {
        new_value
    } else {
        let raw = (current_average * current_count as f64 + new_value) / f64::from(count);
        // Keep the mean between its two inputs despite rounding.
        raw.clamp(current_average.min(new_value), current_average.max(new_value))
    };

    debug!(current_average, current_count, %rating, average, count, "rating applied");
    Ok(RatingUpdate { average, count })
}

/// Return `subject` with `rating` folded into its aggregate.
pub fn apply_to_subject(subject: &RatingSubject, rating: Rating) -> Result<RatingSubject> {
    let update = apply_new_rating(
        subject.average_rating,
        i64::from(subject.review_count),
        i64::from(rating.value()),
    )?;
    Ok(RatingSubject {
        average_rating: update.average,
        review_count: update.count,
        ..subject.clone()
    })
}

/// Build the review record that accompanies a rating update.
pub fn new_review(
    subject_id: SubjectId,
    rating: Rating,
    comment: impl Into<String>,
    submitted_at: DateTime<Utc>,
) -> Review {
    Review {
        id: ReviewId::new(),
        subject_id,
        rating,
        comment: comment.into().trim().to_owned(),
        submitted_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_reviews_plus_a_five() {
        let update = apply_new_rating(4.5, 10, 5).unwrap();
        assert_eq!(update.count, 11);
        assert!((update.average - 4.5455).abs() < 1e-4);
        assert!((update.average - 50.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn first_review_sets_average() {
        let update = apply_new_rating(0.0, 0, 3).unwrap();
        assert_eq!(update, RatingUpdate { average: 3.0, count: 1 });
    }

    #[test]
    fn zero_rating_is_rejected() {
        assert!(matches!(
            apply_new_rating(4.0, 3, 0),
            Err(MaidbookError::InvalidRatingInput(_))
        ));
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        for (avg, count, rating) in [
            (4.0, 3, 6),
            (4.0, -1, 3),
            (5.5, 3, 3),
            (-0.1, 0, 3),
            (f64::NAN, 2, 3),
            (0.0, 4, 3),
        ] {
            assert!(
                matches!(
                    apply_new_rating(avg, count, rating),
                    Err(MaidbookError::InvalidRatingInput(_))
                ),
                "({avg}, {count}, {rating}) should fail"
            );
        }
    }

    #[test]
    fn count_increments_and_average_stays_between_inputs() {
        for count in [0_i64, 1, 2, 7, 10, 99, 1000, 250_000] {
            for avg_tenths in 10..=50 {
                let avg = f64::from(avg_tenths) / 10.0;
                for rating in 1..=5 {
                    let update = apply_new_rating(avg, count, rating).unwrap();
                    assert_eq!(i64::from(update.count), count + 1);
                    if count > 0 {
                        let r = rating as f64;
                        assert!(update.average >= avg.min(r));
                        assert!(update.average <= avg.max(r));
                    }
                }
            }
        }
    }

    #[test]
    fn many_updates_track_true_mean() {
        let ratings = [5, 4, 4, 3, 5, 1, 2, 5, 5, 4, 3, 3, 5];
        let mut avg = 0.0;
        let mut count = 0_i64;
        for r in ratings {
            let update = apply_new_rating(avg, count, r).unwrap();
            avg = update.average;
            count = i64::from(update.count);
        }
        let expected = ratings.iter().sum::<i64>() as f64 / ratings.len() as f64;
        assert!((avg - expected).abs() < 1e-9);
    }

    #[test]
    fn subject_update_keeps_identity() {
        let subject = RatingSubject::unrated("Ana");
        let rated = apply_to_subject(&subject, Rating::try_from(4).unwrap()).unwrap();
        assert_eq!(rated.id, subject.id);
        assert_eq!(rated.review_count, 1);
        assert_eq!(rated.average_rating, 4.0);
        assert_eq!(subject.review_count, 0);
    }

    #[test]
    fn review_comment_is_trimmed() {
        let review = new_review(SubjectId::new(), Rating::try_from(5).unwrap(), "  spotless  ", Utc::now());
        assert_eq!(review.comment, "spotless");
    }
}
