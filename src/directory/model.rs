//! Worker data model: weekly schedules, day-off sets, and load counters.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Day of the week, keyed the way schedules are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All seven days, Monday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monday => write!(f, "monday"),
            Self::Tuesday => write!(f, "tuesday"),
            Self::Wednesday => write!(f, "wednesday"),
            Self::Thursday => write!(f, "thursday"),
            Self::Friday => write!(f, "friday"),
            Self::Saturday => write!(f, "saturday"),
            Self::Sunday => write!(f, "sunday"),
        }
    }
}

/// Opening hours for a single weekday.
///
/// `start` and `end` are minutes since midnight; the end boundary is
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayHours {
    /// Explicitly closed this weekday.
    Closed,
    /// Open interval `[start, end)`.
    Open { start: u16, end: u16 },
}

/// Cumulative per-worker counters. Monotonically non-decreasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub total_bookings: u64,
    pub completed: u64,
    pub cancelled: u64,
}

/// A service provider with a recurring weekly schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    /// Unique worker ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Alias strings used by the upstream NLP layer; pass-through data here.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Chat identity confirmation requests are delivered to.
    pub contact_id: String,
    /// Master switch; when false the worker is never selectable.
    pub available: bool,
    /// Weekly schedule. A missing weekday counts as closed.
    pub schedule: HashMap<Weekday, DayHours>,
    /// Specific calendar dates (ISO `YYYY-MM-DD`) excluded even when the
    /// weekday is normally open.
    #[serde(default)]
    pub days_off: BTreeSet<String>,
    /// Same-day booking counter, reset at local business midnight.
    /// Used only for load balancing, not capacity enforcement.
    #[serde(default)]
    pub bookings_today: u32,
    #[serde(default)]
    pub stats: WorkerStats,
}

/// Input for an administrative worker-add operation.
#[derive(Debug, Clone, Default)]
pub struct WorkerSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub contact_id: String,
    /// Weekly schedule; `None` means the default full-week schedule.
    pub schedule: Option<HashMap<Weekday, DayHours>>,
}

impl Worker {
    /// Construct a new worker from an add-operation spec: generated id,
    /// zeroed stats, available by default.
    pub fn new(spec: WorkerSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: spec.name,
            aliases: spec.aliases,
            contact_id: spec.contact_id,
            available: true,
            schedule: spec.schedule.unwrap_or_else(default_week),
            days_off: BTreeSet::new(),
            bookings_today: 0,
            stats: WorkerStats::default(),
        }
    }

    /// Case-insensitive exact match against the display name or any alias.
    pub fn matches_name(&self, name_or_alias: &str) -> bool {
        let query = name_or_alias.trim();
        self.name.eq_ignore_ascii_case(query)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }
}

/// Default full-week schedule: open 09:00–20:00 every day.
pub fn default_week() -> HashMap<Weekday, DayHours> {
    Weekday::ALL
        .iter()
        .map(|&day| {
            (
                day,
                DayHours::Open {
                    start: 9 * 60,
                    end: 20 * 60,
                },
            )
        })
        .collect()
}
