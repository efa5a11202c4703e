// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Booking store backed by SQLite.
//
// Holds recurring schedules, rating subjects and their reviews.  Records are
// fetched by id and updated field-by-field by id.  Timestamps are stored as
// fixed-width RFC 3339 text so that string order equals time order.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info, instrument};

use maidbook_core::error::{MaidbookError, Result};
use maidbook_core::types::{
    BookingId, Cadence, PreferredHour, Rating, RatingSubject, RecurringSchedule, Review, ReviewId,
    ScheduleId, SubjectId, parse_weekday,
};
use maidbook_schedule::RatingUpdate;
use maidbook_schedule::rating::{apply_to_subject, new_review};

/// SQLite schema for all booking tables.
const CREATE_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS recurring_schedules (
        id TEXT PRIMARY KEY,
        booking_id TEXT NOT NULL,
        cadence TEXT NOT NULL,
        preferred_weekday TEXT NOT NULL,
        preferred_hour TEXT NOT NULL,
        last_completed_at TEXT,
        next_occurrence_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_schedules_next
        ON recurring_schedules (next_occurrence_at);

    CREATE TABLE IF NOT EXISTS rating_subjects (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        average_rating REAL NOT NULL DEFAULT 0,
        review_count INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS reviews (
        id TEXT PRIMARY KEY,
        subject_id TEXT NOT NULL,
        rating INTEGER NOT NULL,
        comment TEXT NOT NULL,
        submitted_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_reviews_subject
        ON reviews (subject_id, submitted_at);
"#;

const SCHEDULE_COLUMNS: &str = "id, booking_id, cadence, preferred_weekday, preferred_hour, \
     last_completed_at, next_occurrence_at, updated_at";

/// How long a writer waits on another connection's lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Map a `rusqlite::Error` into a `MaidbookError`.
///
/// Lock contention becomes `Conflict` so the retry policy treats it like a
/// lost compare-and-swap.
fn db_err(context: &str, e: rusqlite::Error) -> MaidbookError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            MaidbookError::Conflict(format!("{context}: {e}"))
        }
        _ => MaidbookError::Database(format!("{context}: {e}")),
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Persistent store for schedules, rating subjects and reviews.
///
/// All methods are synchronous because `rusqlite` does not support async
/// natively.  In an async context, wrap calls in `tokio::task::spawn_blocking`.
pub struct BookingStore {
    conn: Connection,
}

impl BookingStore {
    /// Open (or create) the booking database at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open the database, waiting at most `busy_timeout` for another
    /// connection's write lock before a write fails with `Conflict`.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), busy_ms = busy_timeout.as_millis()))]
    pub fn open_with_busy_timeout(path: impl AsRef<std::path::Path>, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| db_err("open", e))?;

        // WAL lets the UI read while a background sync writes.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| db_err("WAL pragma", e))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| db_err("busy timeout", e))?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| db_err("create tables", e))?;

        info!("booking database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| db_err("open in-memory", e))?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| db_err("create tables", e))?;

        debug!("in-memory booking database opened");
        Ok(Self { conn })
    }

    // -- Recurring schedules -------------------------------------------------

    /// Insert a newly created schedule.
    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id))]
    pub fn insert_schedule(&self, schedule: &RecurringSchedule) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO recurring_schedules (id, booking_id, cadence, preferred_weekday,
                 preferred_hour, last_completed_at, next_occurrence_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    schedule.id.to_string(),
                    schedule.booking_id.to_string(),
                    schedule.cadence.keyword(),
                    schedule.preferred_weekday.to_string(),
                    schedule.preferred_hour.to_string(),
                    schedule.last_completed_at.as_ref().map(timestamp),
                    timestamp(&schedule.next_occurrence_at),
                    timestamp(&schedule.updated_at),
                ],
            )
            .map_err(|e| db_err("insert schedule", e))?;

        info!(schedule_id = %schedule.id, next = %schedule.next_occurrence_at, "schedule inserted");
        Ok(())
    }

    /// Retrieve a schedule by id.  Returns `None` if it does not exist.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn get_schedule(&self, id: &ScheduleId) -> Result<Option<RecurringSchedule>> {
        self.conn
            .query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM recurring_schedules WHERE id = ?1"),
                params![id.to_string()],
                row_to_schedule,
            )
            .optional()
            .map_err(|e| db_err("get schedule", e))
    }

    /// Write the mutable fields of `schedule` to the row with the same id.
    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id))]
    pub fn update_schedule(&self, schedule: &RecurringSchedule) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE recurring_schedules
                 SET cadence = ?1, preferred_weekday = ?2, preferred_hour = ?3,
                     last_completed_at = ?4, next_occurrence_at = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    schedule.cadence.keyword(),
                    schedule.preferred_weekday.to_string(),
                    schedule.preferred_hour.to_string(),
                    schedule.last_completed_at.as_ref().map(timestamp),
                    timestamp(&schedule.next_occurrence_at),
                    timestamp(&schedule.updated_at),
                    schedule.id.to_string(),
                ],
            )
            .map_err(|e| db_err("update schedule", e))?;

        if rows == 0 {
            return Err(MaidbookError::not_found("schedule", schedule.id));
        }

        debug!(schedule_id = %schedule.id, next = %schedule.next_occurrence_at, "schedule updated");
        Ok(())
    }

    /// Delete a schedule (booking cancelled).  Idempotent.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn delete_schedule(&self, id: &ScheduleId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM recurring_schedules WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| db_err("delete schedule", e))?;

        info!(schedule_id = %id, "schedule deleted");
        Ok(())
    }

    /// Schedules whose next occurrence is at or before `instant`, soonest first.
    #[instrument(skip(self))]
    pub fn due_before(&self, instant: DateTime<Utc>) -> Result<Vec<RecurringSchedule>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM recurring_schedules
                 WHERE next_occurrence_at <= ?1 ORDER BY next_occurrence_at ASC"
            ))
            .map_err(|e| db_err("prepare due_before", e))?;

        let schedules = stmt
            .query_map(params![timestamp(&instant)], row_to_schedule)
            .map_err(|e| db_err("query due_before", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| db_err("collect rows", e))?;

        debug!(count = schedules.len(), "retrieved due schedules");
        Ok(schedules)
    }

    // -- Rating subjects and reviews -----------------------------------------

    /// Insert a provider that can receive reviews.
    #[instrument(skip(self, subject), fields(subject_id = %subject.id))]
    pub fn insert_subject(&self, subject: &RatingSubject) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO rating_subjects (id, display_name, average_rating, review_count)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    subject.id.to_string(),
                    subject.display_name,
                    subject.average_rating,
                    subject.review_count,
                ],
            )
            .map_err(|e| db_err("insert subject", e))?;

        info!(subject_id = %subject.id, "rating subject inserted");
        Ok(())
    }

    /// Retrieve a provider by id.  Returns `None` if it does not exist.
    #[instrument(skip(self), fields(subject_id = %id))]
    pub fn get_subject(&self, id: &SubjectId) -> Result<Option<RatingSubject>> {
        get_subject_on(&self.conn, id).map_err(|e| db_err("get subject", e))
    }

    /// Overwrite a provider's aggregate, but only if its review count is
    /// still `expected_count`.  Fails with `Conflict` otherwise.
    ///
    /// The update must add exactly one review and carry an average in 1..=5;
    /// anything else fails with `InvalidRatingInput`.
    #[instrument(skip(self, update), fields(subject_id = %id))]
    pub fn update_rating(&self, id: &SubjectId, expected_count: u32, update: RatingUpdate) -> Result<()> {
        swap_rating(&self.conn, id, expected_count, update)
    }

    /// Record a review and fold its rating into the provider's aggregate.
    ///
    /// Runs as one IMMEDIATE transaction: the aggregate is read, updated with
    /// a compare-and-swap on the review count, and the review row is inserted.
    /// Either everything is written or nothing is.
    #[instrument(skip(self, comment), fields(subject_id = %subject_id, %rating))]
    pub fn submit_review(
        &mut self,
        subject_id: &SubjectId,
        rating: Rating,
        comment: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<(RatingSubject, Review)> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| db_err("begin review transaction", e))?;

        let subject = get_subject_on(&tx, subject_id)
            .map_err(|e| db_err("read subject", e))?
            .ok_or_else(|| MaidbookError::not_found("rating subject", subject_id))?;

        let rated = apply_to_subject(&subject, rating)?;
        swap_rating(
            &tx,
            subject_id,
            subject.review_count,
            RatingUpdate {
                average: rated.average_rating,
                count: rated.review_count,
            },
        )?;

        let review = new_review(*subject_id, rating, comment, submitted_at);
        tx.execute(
            "INSERT INTO reviews (id, subject_id, rating, comment, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                review.id.to_string(),
                review.subject_id.to_string(),
                review.rating.value(),
                review.comment,
                timestamp(&review.submitted_at),
            ],
        )
        .map_err(|e| db_err("insert review", e))?;

        tx.commit().map_err(|e| db_err("commit review", e))?;

        info!(
            subject_id = %subject_id,
            average = rated.average_rating,
            count = rated.review_count,
            "review recorded"
        );
        Ok((rated, review))
    }

    /// All reviews for a provider, newest first.
    #[instrument(skip(self), fields(subject_id = %subject_id))]
    pub fn reviews_for_subject(&self, subject_id: &SubjectId) -> Result<Vec<Review>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, subject_id, rating, comment, submitted_at
                 FROM reviews WHERE subject_id = ?1 ORDER BY submitted_at DESC",
            )
            .map_err(|e| db_err("prepare reviews_for_subject", e))?;

        let reviews = stmt
            .query_map(params![subject_id.to_string()], row_to_review)
            .map_err(|e| db_err("query reviews_for_subject", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| db_err("collect rows", e))?;

        debug!(count = reviews.len(), "retrieved reviews");
        Ok(reviews)
    }
}

fn get_subject_on(conn: &Connection, id: &SubjectId) -> rusqlite::Result<Option<RatingSubject>> {
    conn.query_row(
        "SELECT id, display_name, average_rating, review_count
         FROM rating_subjects WHERE id = ?1",
        params![id.to_string()],
        row_to_subject,
    )
    .optional()
}

fn swap_rating(conn: &Connection, id: &SubjectId, expected_count: u32, update: RatingUpdate) -> Result<()> {
    if expected_count.checked_add(1) != Some(update.count) {
        return Err(MaidbookError::InvalidRatingInput(format!(
            "review count may only go from {expected_count} to {}, not {}",
            expected_count.saturating_add(1),
            update.count
        )));
    }
    if !update.average.is_finite()
        || !(f64::from(Rating::MIN)..=f64::from(Rating::MAX)).contains(&update.average)
    {
        return Err(MaidbookError::InvalidRatingInput(format!(
            "average {} outside {}..={}",
            update.average,
            Rating::MIN,
            Rating::MAX
        )));
    }

    let rows = conn
        .execute(
            "UPDATE rating_subjects SET average_rating = ?1, review_count = ?2
             WHERE id = ?3 AND review_count = ?4",
            params![update.average, update.count, id.to_string(), expected_count],
        )
        .map_err(|e| db_err("update rating", e))?;

    if rows == 0 {
        return Err(MaidbookError::Conflict(format!(
            "rating subject {id} no longer has {expected_count} reviews"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn conversion_err<E>(column: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_timestamp(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(column, e))
}

/// Column indices must match `SCHEDULE_COLUMNS`.
fn row_to_schedule(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecurringSchedule> {
    let id: ScheduleId = row
        .get::<_, String>(0)?
        .parse()
        .map_err(|e| conversion_err(0, e))?;
    let booking_id: BookingId = row
        .get::<_, String>(1)?
        .parse()
        .map_err(|e| conversion_err(1, e))?;
    let cadence: Cadence = row
        .get::<_, String>(2)?
        .parse()
        .map_err(|e| conversion_err(2, e))?;
    let preferred_weekday = parse_weekday(&row.get::<_, String>(3)?).map_err(|e| conversion_err(3, e))?;
    let preferred_hour: PreferredHour = row
        .get::<_, String>(4)?
        .parse()
        .map_err(|e| conversion_err(4, e))?;
    let last_completed_at = row
        .get::<_, Option<String>>(5)?
        .map(|s| parse_timestamp(5, &s))
        .transpose()?;
    let next_occurrence_at = parse_timestamp(6, &row.get::<_, String>(6)?)?;
    let updated_at = parse_timestamp(7, &row.get::<_, String>(7)?)?;

    Ok(RecurringSchedule {
        id,
        booking_id,
        cadence,
        preferred_weekday,
        preferred_hour,
        last_completed_at,
        next_occurrence_at,
        updated_at,
    })
}

fn row_to_subject(row: &rusqlite::Row<'_>) -> rusqlite::Result<RatingSubject> {
    let id: SubjectId = row
        .get::<_, String>(0)?
        .parse()
        .map_err(|e| conversion_err(0, e))?;

    Ok(RatingSubject {
        id,
        display_name: row.get(1)?,
        average_rating: row.get(2)?,
        review_count: row.get(3)?,
    })
}

fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    let id: ReviewId = row
        .get::<_, String>(0)?
        .parse()
        .map_err(|e| conversion_err(0, e))?;
    let subject_id: SubjectId = row
        .get::<_, String>(1)?
        .parse()
        .map_err(|e| conversion_err(1, e))?;
    let rating = Rating::try_from(row.get::<_, i64>(2)?).map_err(|e| conversion_err(2, e))?;

    Ok(Review {
        id,
        subject_id,
        rating,
        comment: row.get(3)?,
        submitted_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}
