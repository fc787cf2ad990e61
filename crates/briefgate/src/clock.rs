//! Business-time helpers.
//!
//! Access codes live for one ISO week in the configured timezone. The
//! [`Clock`] hands out "now" in that timezone and can be pinned to a fixed
//! instant for tests.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Source of the current time in the business timezone.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
    fixed: Option<DateTime<Utc>>,
}

impl Clock {
    /// A clock that reads the system time.
    #[must_use]
    pub fn system(tz: Tz) -> Self {
        Self { tz, fixed: None }
    }

    /// A clock pinned to `instant`.
    #[must_use]
    pub fn fixed(tz: Tz, instant: DateTime<Utc>) -> Self {
        Self {
            tz,
            fixed: Some(instant),
        }
    }

    /// The business timezone.
    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current time in the business timezone.
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        self.fixed
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.tz)
    }

    /// Current time as a fixed-offset timestamp, the form records store.
    #[must_use]
    pub fn stamp(&self) -> DateTime<FixedOffset> {
        self.now().fixed_offset()
    }

    /// Identifier of the current ISO week.
    #[must_use]
    pub fn week_id(&self) -> String {
        iso_week_id(&self.now())
    }
}

/// ISO week identifier, e.g. `2026W02`.
///
/// Uses the ISO week-numbering year, so 2027-01-01 (a Friday) is `2026W53`.
#[must_use]
pub fn iso_week_id<T: TimeZone>(dt: &DateTime<T>) -> String {
    let week = dt.iso_week();
    format!("{}W{:02}", week.year(), week.week())
}

/// The Sunday of `dt`'s ISO week at 23:59:59 local time.
///
/// # Errors
///
/// Returns an error if that local time does not exist in the timezone.
pub fn week_expiry(dt: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    let days_to_sunday = 7 - u64::from(dt.weekday().number_from_monday());
    let sunday = dt
        .date_naive()
        .checked_add_days(Days::new(days_to_sunday))
        .ok_or_else(|| Error::Internal(format!("no Sunday after {dt}")))?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
        .ok_or_else(|| Error::Internal("invalid end-of-day time".to_string()))?;

    dt.timezone()
        .from_local_datetime(&sunday.and_time(end_of_day))
        .earliest()
        .ok_or_else(|| Error::Internal(format!("{sunday} 23:59:59 does not exist locally")))
}
