// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — opens the booking store, loads config, and runs the
// booking rules against stored records on behalf of the screens.
//
// `BookingStore` is `Send` but not `Sync`, so it is wrapped in `Arc<Mutex<>>`
// for sharing across the tokio task pool.  Every operation is a few
// sub-millisecond SQLite statements, so contention stays low.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use maidbook_core::AppConfig;
use maidbook_core::error::{MaidbookError, Result};
use maidbook_core::types::{
    BookingId, Rating, RatingSubject, RecurringSchedule, Review, ScheduleId, SubjectId,
};
use maidbook_schedule::Slot;
use maidbook_schedule::recurrence::{new_schedule, record_completion, reschedule};
use maidbook_store::retry::{RetryConfig, RetryDecision, should_retry};
use maidbook_store::BookingStore;

use super::data_dir;

/// Shared application services, cheaply cloneable into async tasks.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<Mutex<BookingStore>>,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl AppServices {
    /// Initialise all services.  Call once at app startup.
    pub fn init() -> Result<Self> {
        let dir = data_dir::data_dir()?;
        Self::open_in(dir)
    }

    /// Initialise services rooted at an explicit data directory.
    pub fn open_in(dir: PathBuf) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");

        let config = load_config(&dir).unwrap_or_default();
        let store = BookingStore::open_with_busy_timeout(
            dir.join(STORE_FILE),
            Duration::from_millis(config.store_busy_timeout_ms),
        )?;

        info!("app services initialised");
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
        })
    }

    /// Services over an in-memory store, used when the data directory is
    /// unusable.  Config changes are still written to the temp directory.
    pub fn in_memory() -> Result<Self> {
        let store = BookingStore::open_in_memory()?;
        let dir = data_dir::data_dir_in(&std::env::temp_dir())?;
        warn!("using in-memory booking store");
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            data_dir: dir,
            config: Arc::new(Mutex::new(AppConfig::default())),
        })
    }

    fn store(&self) -> Result<MutexGuard<'_, BookingStore>> {
        self.store
            .lock()
            .map_err(|_| MaidbookError::Database("booking store lock poisoned".into()))
    }

    // -- Recurring bookings --------------------------------------------------

    /// Create the schedule for a new recurring booking.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub fn create_recurring_booking(
        &self,
        booking_id: BookingId,
        slot: Slot,
        now: DateTime<Utc>,
    ) -> Result<RecurringSchedule> {
        let schedule = new_schedule(booking_id, slot, now)?;
        self.store()?.insert_schedule(&schedule)?;
        info!(schedule_id = %schedule.id, next = %schedule.next_occurrence_at, "recurring booking created");
        Ok(schedule)
    }

    /// Record that the maid finished a cleaning and advance the schedule.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn complete_occurrence(
        &self,
        id: &ScheduleId,
        completed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<RecurringSchedule> {
        let store = self.store()?;
        let current = store
            .get_schedule(id)?
            .ok_or_else(|| MaidbookError::not_found("schedule", id))?;
        let advanced = record_completion(&current, completed_at, now)?;
        store.update_schedule(&advanced)?;
        Ok(advanced)
    }

    /// Change cadence, weekday or start time of a recurring booking.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn edit_schedule(&self, id: &ScheduleId, slot: Slot, now: DateTime<Utc>) -> Result<RecurringSchedule> {
        let store = self.store()?;
        let current = store
            .get_schedule(id)?
            .ok_or_else(|| MaidbookError::not_found("schedule", id))?;
        let edited = reschedule(&current, slot, now)?;
        store.update_schedule(&edited)?;
        Ok(edited)
    }

    /// Cancel a recurring booking, dropping its schedule.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn cancel_recurring_booking(&self, id: &ScheduleId) -> Result<()> {
        self.store()?.delete_schedule(id)
    }

    pub fn schedule(&self, id: &ScheduleId) -> Result<RecurringSchedule> {
        self.store()?
            .get_schedule(id)?
            .ok_or_else(|| MaidbookError::not_found("schedule", id))
    }

    /// Schedules due within the configured lookahead from `now`.
    pub fn due_schedules(&self, now: DateTime<Utc>) -> Result<Vec<RecurringSchedule>> {
        let lookahead = chrono::Duration::days(i64::from(self.config()?.due_lookahead_days));
        let horizon = now.checked_add_signed(lookahead).unwrap_or(now);
        self.store()?.due_before(horizon)
    }

    // -- Ratings -------------------------------------------------------------

    /// Register a provider that customers can review.
    pub fn add_subject(&self, display_name: &str) -> Result<RatingSubject> {
        let subject = RatingSubject::unrated(display_name.trim());
        self.store()?.insert_subject(&subject)?;
        Ok(subject)
    }

    pub fn subject(&self, id: &SubjectId) -> Result<RatingSubject> {
        self.store()?
            .get_subject(id)?
            .ok_or_else(|| MaidbookError::not_found("rating subject", id))
    }

    pub fn reviews(&self, id: &SubjectId) -> Result<Vec<Review>> {
        self.store()?.reviews_for_subject(id)
    }

    /// Submit a customer's review.
    ///
    /// Invalid ratings fail immediately.  Writes that lose a race with another
    /// submission are retried with backoff on the blocking pool.
    #[instrument(skip(self, comment), fields(subject_id = %subject_id))]
    pub async fn submit_review(
        &self,
        subject_id: SubjectId,
        rating: i64,
        comment: String,
        submitted_at: DateTime<Utc>,
    ) -> Result<(RatingSubject, Review)> {
        let rating = Rating::try_from(rating)?;
        let retry = self.retry_config()?;
        let mut attempt = 0;

        loop {
            let services = self.clone();
            let comment = comment.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let mut store = services.store()?;
                store.submit_review(&subject_id, rating, &comment, submitted_at)
            })
            .await
            .map_err(|e| MaidbookError::Database(format!("review task failed: {e}")))?;

            let err = match outcome {
                Ok(done) => return Ok(done),
                Err(err) => err,
            };
            match should_retry(&err, attempt, &retry) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(attempt, error = %err, "review submission retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp(_) | RetryDecision::Exhausted => return Err(err),
            }
        }
    }

    fn retry_config(&self) -> Result<RetryConfig> {
        let config = self.config()?;
        Ok(RetryConfig {
            max_retries: config.review_max_retries,
            base_delay: Duration::from_millis(config.review_retry_base_ms),
            ..RetryConfig::default()
        })
    }

    // -- Config Persistence --------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> Result<AppConfig> {
        self.config
            .lock()
            .map(|c| c.clone())
            .map_err(|_| MaidbookError::Database("config lock poisoned".into()))
    }

    /// Update and persist the config.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        persist_config(&self.data_dir, config)?;
        *self
            .config
            .lock()
            .map_err(|_| MaidbookError::Database("config lock poisoned".into()))? = config.clone();
        Ok(())
    }

    /// Path to the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// -- File persistence --------------------------------------------------------

const STORE_FILE: &str = "bookings.db";
const CONFIG_FILE: &str = "config.json";

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(error = %e, "config.json unreadable, using defaults");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use maidbook_core::types::Cadence;

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn services() -> (tempfile::TempDir, AppServices) {
        let dir = tempfile::tempdir().unwrap();
        let svc = AppServices::open_in(dir.path().to_path_buf()).unwrap();
        (dir, svc)
    }

    #[test]
    fn recurring_booking_lifecycle() {
        let (_dir, svc) = services();
        let slot = Slot::parse("weekly", "Mon", "10:00").unwrap();
        let created = svc.create_recurring_booking(BookingId::new(), slot, at(1, 2, 0)).unwrap();
        assert_eq!(created.next_occurrence_at, at(1, 8, 10));

        let done = svc.complete_occurrence(&created.id, at(1, 8, 12), at(1, 8, 12)).unwrap();
        assert_eq!(done.next_occurrence_at, at(1, 22, 10));

        let edit = Slot::parse("biweekly", "Mon", "10:00").unwrap();
        let edited = svc.edit_schedule(&created.id, edit, at(1, 9, 0)).unwrap();
        assert_eq!(edited.cadence, Cadence::Biweekly);
        assert_eq!(svc.schedule(&created.id).unwrap(), edited);

        svc.cancel_recurring_booking(&created.id).unwrap();
        assert!(matches!(
            svc.schedule(&created.id),
            Err(MaidbookError::NotFound { .. })
        ));
    }

    #[test]
    fn completing_a_cancelled_booking_is_not_found() {
        let (_dir, svc) = services();
        let result = svc.complete_occurrence(&ScheduleId::new(), at(1, 8, 12), at(1, 8, 12));
        assert!(matches!(result, Err(MaidbookError::NotFound { .. })));
    }

    #[test]
    fn due_schedules_respect_lookahead() {
        let (_dir, svc) = services();
        let config = AppConfig {
            due_lookahead_days: 3,
            ..AppConfig::default()
        };
        svc.save_config(&config).unwrap();

        // From Monday 2024-01-01: Tue is within 3 days, Sat is not.
        let now = at(1, 1, 0);
        let tue = svc
            .create_recurring_booking(BookingId::new(), Slot::parse("weekly", "Tue", "09:00").unwrap(), now)
            .unwrap();
        svc.create_recurring_booking(BookingId::new(), Slot::parse("weekly", "Sat", "09:00").unwrap(), now)
            .unwrap();

        let due = svc.due_schedules(now).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, tue.id);
    }

    #[test]
    fn config_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            default_cadence: Cadence::Monthly,
            ..AppConfig::default()
        };
        {
            let svc = AppServices::open_in(dir.path().to_path_buf()).unwrap();
            svc.save_config(&config).unwrap();
        }
        let svc = AppServices::open_in(dir.path().to_path_buf()).unwrap();
        assert_eq!(svc.config().unwrap(), config);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        let svc = AppServices::open_in(dir.path().to_path_buf()).unwrap();
        assert_eq!(svc.config().unwrap(), AppConfig::default());
    }

    #[tokio::test]
    async fn review_submission_updates_provider() {
        let (_dir, svc) = services();
        let maid = svc.add_subject("  Ana  ").unwrap();
        assert_eq!(maid.display_name, "Ana");

        let (rated, review) = svc
            .submit_review(maid.id, 4, "Thorough".into(), at(2, 1, 12))
            .await
            .unwrap();
        assert_eq!(rated.review_count, 1);
        assert_eq!(rated.average_rating, 4.0);
        assert_eq!(svc.subject(&maid.id).unwrap(), rated);
        assert_eq!(svc.reviews(&maid.id).unwrap(), vec![review]);
    }

    #[tokio::test]
    async fn invalid_rating_is_rejected_without_writing() {
        let (_dir, svc) = services();
        let maid = svc.add_subject("Bo").unwrap();

        let result = svc.submit_review(maid.id, 0, String::new(), at(2, 1, 12)).await;
        assert!(matches!(result, Err(MaidbookError::InvalidRatingInput(_))));
        assert_eq!(svc.subject(&maid.id).unwrap().review_count, 0);
        assert!(svc.reviews(&maid.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn parallel_submissions_are_all_counted() {
        let (_dir, svc) = services();
        let maid = svc.add_subject("Cy").unwrap();

        let mut handles = Vec::new();
        for rating in [5, 4, 3, 5, 2, 1, 4, 5] {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.submit_review(maid.id, rating, String::new(), Utc::now()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = svc.subject(&maid.id).unwrap();
        assert_eq!(stored.review_count, 8);
        assert!((stored.average_rating - 29.0 / 8.0).abs() < 1e-9);
        assert_eq!(svc.reviews(&maid.id).unwrap().len(), 8);
    }

    /// Services whose writes fail fast on a lock held by another connection.
    fn impatient_services(max_retries: u32) -> (tempfile::TempDir, AppServices) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            review_max_retries: max_retries,
            review_retry_base_ms: 20,
            store_busy_timeout_ms: 0,
            ..AppConfig::default()
        };
        persist_config(dir.path(), &config).unwrap();
        let svc = AppServices::open_in(dir.path().to_path_buf()).unwrap();
        (dir, svc)
    }

    fn lock_database(dir: &Path) -> rusqlite::Connection {
        let other = rusqlite::Connection::open(dir.join(STORE_FILE)).unwrap();
        other.execute_batch("BEGIN IMMEDIATE").unwrap();
        other
    }

    #[tokio::test]
    async fn review_blocked_by_another_writer_is_retried() {
        let (dir, svc) = impatient_services(8);
        let maid = svc.add_subject("Di").unwrap();

        let other = lock_database(dir.path());
        let started = std::time::Instant::now();
        let submit = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.submit_review(maid.id, 5, "Lovely".into(), Utc::now()).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!submit.is_finished(), "submission must wait for the lock");
        other.execute_batch("COMMIT").unwrap();

        let (rated, _) = submit.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(rated.review_count, 1);
        assert_eq!(svc.subject(&maid.id).unwrap().review_count, 1);
        assert_eq!(svc.reviews(&maid.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn review_gives_up_after_retry_limit() {
        let (dir, svc) = impatient_services(2);
        let maid = svc.add_subject("Ed").unwrap();

        let other = lock_database(dir.path());
        let result = svc.submit_review(maid.id, 4, String::new(), Utc::now()).await;
        assert!(matches!(result, Err(MaidbookError::Conflict(_))));
        other.execute_batch("ROLLBACK").unwrap();

        assert_eq!(svc.subject(&maid.id).unwrap().review_count, 0);
        assert!(svc.reviews(&maid.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn review_for_unknown_provider_is_not_retried() {
        let (_dir, svc) = services();
        let result = svc
            .submit_review(SubjectId::new(), 5, String::new(), at(2, 1, 12))
            .await;
        assert!(matches!(result, Err(MaidbookError::NotFound { .. })));
    }
}
