//! Expiration policy.

use chrono::{DateTime, NaiveTime, TimeZone};
use std::time::Duration;

/// Seconds in a day, used when the next midnight cannot be resolved.
const DAY_SECS: u64 = 86_400;

/// Named default TTLs attached to accessor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTtl {
    /// 5 minutes.
    VeryShort,
    /// 15 minutes.
    Short,
    /// 30 minutes.
    Medium,
    /// 1 hour.
    Long,
    /// 24 hours.
    VeryLong,
    /// 24 hours, for user sessions.
    Session,
    /// 24 hours, for daily data.
    Daily,
}

impl CacheTtl {
    /// Returns the TTL in seconds.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        match self {
            Self::VeryShort => 300,
            Self::Short => 900,
            Self::Medium => 1800,
            Self::Long => 3600,
            Self::VeryLong | Self::Session | Self::Daily => DAY_SECS,
        }
    }

    /// Returns the TTL as a Duration.
    #[must_use]
    pub const fn duration(self) -> Duration {
        Duration::from_secs(self.as_secs())
    }
}

impl From<CacheTtl> for Duration {
    fn from(ttl: CacheTtl) -> Self {
        ttl.duration()
    }
}

/// Whole seconds from `now` until the next midnight in `now`'s time zone.
///
/// Fractions are truncated and the result is never below one second, so a
/// write in the last instant of the day still gets a valid expiry. If the
/// zone skips midnight (a DST jump at 00:00), the wall-clock difference is
/// used instead.
#[must_use]
pub fn until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let local = now.naive_local();
    let Some(tomorrow) = local.date().succ_opt() else {
        return Duration::from_secs(DAY_SECS);
    };
    let midnight = tomorrow.and_time(NaiveTime::MIN);

    let remaining = match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(next) => next.signed_duration_since(now.clone()),
        None => midnight - local,
    };

    let secs = u64::try_from(remaining.num_seconds()).unwrap_or(0);
    Duration::from_secs(secs.max(1))
}
