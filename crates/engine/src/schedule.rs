// crates/engine/src/schedule.rs
//! Interval-based sync scheduling with time-window and day-of-week
//! filtering.
//!
//! Pure decision logic only: callers own the timer loop and invoke
//! [`SyncSchedule::is_due`] with the current time. Overnight windows
//! (start later than end, e.g. 22:00-06:00) wrap around midnight.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Day of week for schedule filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Mon,
            chrono::Weekday::Tue => Self::Tue,
            chrono::Weekday::Wed => Self::Wed,
            chrono::Weekday::Thu => Self::Thu,
            chrono::Weekday::Fri => Self::Fri,
            chrono::Weekday::Sat => Self::Sat,
            chrono::Weekday::Sun => Self::Sun,
        }
    }
}

/// Time window during which syncing is allowed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start hour (0-23)
    pub start_hour: u8,
    /// Start minute (0-59)
    pub start_minute: u8,
    /// End hour (0-23)
    pub end_hour: u8,
    /// End minute (0-59)
    pub end_minute: u8,
    /// Allowed days; empty means every day
    #[serde(default)]
    pub days: Vec<Weekday>,
}

impl TimeWindow {
    /// Validates hour/minute ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(format!(
                "hour out of range 0-23: {}..{}",
                self.start_hour, self.end_hour
            ));
        }
        if self.start_minute > 59 || self.end_minute > 59 {
            return Err(format!(
                "minute out of range 0-59: {}..{}",
                self.start_minute, self.end_minute
            ));
        }
        Ok(())
    }

    /// Whether `(hour, minute)` falls inside the window. When start is
    /// later than end the window wraps midnight.
    pub fn contains_time(&self, hour: u8, minute: u8) -> bool {
        let start = self.start_hour as u16 * 60 + self.start_minute as u16;
        let end = self.end_hour as u16 * 60 + self.end_minute as u16;
        let now = hour as u16 * 60 + minute as u16;

        if start <= end {
            now >= start && now < end
        } else {
            now >= start || now < end
        }
    }

    /// Whether the given day passes the day filter
    pub fn allows_day(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    /// Combined check for an instant
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.allows_day(Weekday::from_chrono(at.weekday()))
            && self.contains_time(at.hour() as u8, at.minute() as u8)
    }
}

/// An interval schedule for one sync pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSchedule {
    pub enabled: bool,
    /// Minimum minutes between runs
    pub interval_minutes: u32,
    /// Optional allowed window; `None` means always allowed
    pub window: Option<TimeWindow>,
    pub last_run: Option<DateTime<Utc>>,
}

impl SyncSchedule {
    pub fn every_minutes(interval_minutes: u32) -> Self {
        Self {
            enabled: true,
            interval_minutes,
            window: None,
            last_run: None,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Whether a run should start at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(window) = &self.window {
            if !window.contains(now) {
                return false;
            }
        }
        match self.last_run {
            None => true,
            Some(last) => {
                now.signed_duration_since(last)
                    >= Duration::minutes(self.interval_minutes as i64)
            }
        }
    }

    /// Earliest instant the interval permits another run (ignores the
    /// window filter)
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.last_run
            .map(|last| last + Duration::minutes(self.interval_minutes as i64))
    }

    /// Records a completed run
    pub fn mark_ran(&mut self, at: DateTime<Utc>) {
        self.last_run = Some(at);
    }
}
