//! Availability resolver: schedule rules and load-balanced worker selection.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::directory::WorkerDirectory;
use crate::directory::model::{DayHours, Weekday, Worker};

/// Parse `HH:MM` (24 h) into minutes since midnight.
///
/// Returns `None` for anything malformed; callers treat that as unavailable
/// rather than an error.
pub(crate) fn parse_minute_of_day(time: &str) -> Option<u16> {
    let (hours, minutes) = time.trim().split_once(':')?;
    let hours: u16 = hours.parse().ok()?;
    let minutes: u16 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Determines an eligible worker for a date/time using schedule, day-off, and
/// open-hours rules, load-balanced by same-day booking count.
pub struct Resolver {
    directory: Arc<WorkerDirectory>,
}

impl Resolver {
    pub fn new(directory: Arc<WorkerDirectory>) -> Self {
        Self { directory }
    }

    /// All availability rules for one worker, short-circuiting at the first
    /// failing check: master switch, day-off date, weekday schedule, and the
    /// `[start, end)` open interval (start inclusive, end exclusive).
    pub fn is_available(worker: &Worker, date: &str, time: &str, weekday: Weekday) -> bool {
        if !worker.available {
            return false;
        }
        if worker.days_off.contains(date) {
            return false;
        }
        let Some(&DayHours::Open { start, end }) = worker.schedule.get(&weekday) else {
            return false;
        };
        let Some(minute) = parse_minute_of_day(time) else {
            // Malformed time is a rejection, not an error
            debug!(time = %time, "Unparseable time treated as unavailable");
            return false;
        };
        start <= minute && minute < end
    }

    /// Resolve a worker for `date`/`time`.
    ///
    /// With an explicit preference, only that worker is considered, no
    /// fallback search; the caller decides what to do with `None`. Without
    /// one, the available worker with the fewest same-day bookings wins,
    /// ties broken by directory order.
    pub async fn resolve(&self, date: &str, time: &str, preferred: Option<Uuid>) -> Option<Worker> {
        let weekday = self.directory.day_of_week(date);

        if let Some(preferred_id) = preferred {
            let worker = self.directory.find_by_id(preferred_id).await?;
            if Self::is_available(&worker, date, time, weekday) {
                return Some(worker);
            }
            debug!(worker_id = %preferred_id, %date, %time, "Preferred worker unavailable");
            return None;
        }

        self.pick_least_loaded(date, time, weekday, &HashSet::new())
            .await
    }

    /// Resolve a substitute for the reassignment cascade: same rules as an
    /// unpreferred `resolve`, minus the excluded workers.
    pub async fn resolve_substitute(
        &self,
        date: &str,
        time: &str,
        excluded: &HashSet<Uuid>,
    ) -> Option<Worker> {
        let weekday = self.directory.day_of_week(date);
        self.pick_least_loaded(date, time, weekday, excluded).await
    }

    async fn pick_least_loaded(
        &self,
        date: &str,
        time: &str,
        weekday: Weekday,
        excluded: &HashSet<Uuid>,
    ) -> Option<Worker> {
        self.directory
            .snapshot()
            .await
            .into_iter()
            .filter(|w| !excluded.contains(&w.id))
            .filter(|w| Self::is_available(w, date, time, weekday))
            // min_by_key keeps the first of equal minima, i.e. directory order
            .min_by_key(|w| w.bookings_today)
    }
}
