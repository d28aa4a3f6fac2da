//! GPS week numbers and resolution of truncated leap second weeks.
//!
//! GPS receivers broadcast the week of the most recent or next leap second
//! (`WNlsf`) as its 8 least significant bits only, so the value aliases every
//! 256 weeks (about 4.9 years). Since leap seconds only take effect on the
//! first day of a few specific months, the full week number can usually be
//! recovered by looking for the only 256-week cycle in which the announced
//! week and day fall on such a date.
//!
//! Week days are counted from Sunday (day 0) to Saturday (day 6). Some
//! receivers report the day *at the end of which* the leap second occurs,
//! using day 7 for the Saturday that precedes week `WNlsf + 1`; such
//! de-normalized values are accepted everywhere and normalized first.
//!
//! # Examples
//!
//! ```
//! use refclock_time::gps_week::{resolve, GpsWeekDay, WeekResolution};
//! use refclock_time::{CalendarDate, Config};
//!
//! let config = Config::default();
//!
//! let week = resolve(&config, 138, 0).unwrap().into_result().unwrap();
//! assert_eq!(week, 1930);
//!
//! let date = GpsWeekDay::new(week, 0).to_date().unwrap();
//! assert_eq!(date, CalendarDate::from_ymd(2017, 1, 1).unwrap());
//! ```

use tracing::{trace, warn};

use crate::calendar::{self, DAYS_TO_POSIX_EPOCH, SECS_PER_DAY};
use crate::epoch::{GPS_EPOCH_BIAS_FROM_POSIX, GPS_TAI_OFFSET};
use crate::leap::{LeapStep, PendingLeapSecond};
use crate::{CalendarDate, Config, DateError, Error, Gps, Instant, PosixTime};

/// Number of weeks after which a truncated 8-bit week number wraps around.
pub const WEEKS_PER_CYCLE: u32 = 256;

/// Number of days in a week.
pub const DAYS_PER_WEEK: u8 = 7;

/// Number of seconds in a week.
pub const SECS_PER_WEEK: i64 = 604_800;

/// The GPS epoch, 1980-01-06, as a number of days since 1970-01-01.
const GPS_EPOCH_POSIX_DAYS: i64 = GPS_EPOCH_BIAS_FROM_POSIX / SECS_PER_DAY;

/// The GPS epoch as a number of days since 0000-01-01.
const GPS_EPOCH_DAYS_FROM_YEAR_0: i64 = DAYS_TO_POSIX_EPOCH + GPS_EPOCH_POSIX_DAYS;

/// Normalizes a week and day pair so that the day lies in `0..=6`.
///
/// Day 7 of a week is day 0 of the next week. Other values are returned
/// unchanged. The week wraps around at `u32::MAX`, which lies far beyond any
/// realistic date.
///
/// # Examples
///
/// ```
/// use refclock_time::gps_week::normalize;
///
/// assert_eq!(normalize(1929, 7), (1930, 0));
/// assert_eq!(normalize(1930, 0), (1930, 0));
/// ```
pub const fn normalize(week: u32, day: u8) -> (u32, u8) {
    if day == DAYS_PER_WEEK {
        (week.wrapping_add(1), 0)
    } else {
        (week, day)
    }
}

/// De-normalizes a week and day pair so that day 0 is expressed as day 7 of
/// the previous week.
///
/// Other values are returned unchanged. Returns `None` for day 0 of week 0,
/// which has no de-normalized form.
///
/// # Examples
///
/// ```
/// use refclock_time::gps_week::de_normalize;
///
/// assert_eq!(de_normalize(1930, 0), Some((1929, 7)));
/// assert_eq!(de_normalize(1930, 3), Some((1930, 3)));
/// assert_eq!(de_normalize(0, 0), None);
/// ```
pub const fn de_normalize(week: u32, day: u8) -> Option<(u32, u8)> {
    if day == 0 {
        match week.checked_sub(1) {
            Some(week) => Some((week, DAYS_PER_WEEK)),
            None => None,
        }
    } else {
        Some((week, day))
    }
}

/// An extended GPS week number and a day of the week.
///
/// The day is counted from Sunday and may be 7 in de-normalized form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsWeekDay {
    /// The extended week number, counted from the GPS epoch.
    pub week: u32,
    /// The day of the week, 0 being Sunday.
    pub day: u8,
}

impl GpsWeekDay {
    /// Creates a week and day pair.
    pub const fn new(week: u32, day: u8) -> Self {
        Self { week, day }
    }

    /// Returns the normalized form of this pair, see [`normalize`].
    pub const fn normalize(self) -> Self {
        let (week, day) = normalize(self.week, self.day);

        Self { week, day }
    }

    /// Returns the de-normalized form of this pair, see [`de_normalize`].
    pub const fn de_normalize(self) -> Option<Self> {
        match de_normalize(self.week, self.day) {
            Some((week, day)) => Some(Self { week, day }),
            None => None,
        }
    }

    /// Returns the 8 least significant bits of the week number.
    pub const fn truncated_week(&self) -> u8 {
        (self.week % WEEKS_PER_CYCLE) as u8
    }

    /// Returns the number of calendar days between the GPS epoch and the
    /// start of this day.
    const fn days_since_gps_epoch(&self) -> i64 {
        self.week as i64 * DAYS_PER_WEEK as i64 + self.day as i64
    }

    /// Returns the UTC instant at which this calendar day starts.
    ///
    /// Week and day are interpreted as calendar days counted from 1980-01-06,
    /// which is the convention used for leap second dates.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::gps_week::GpsWeekDay;
    /// use refclock_time::PosixTime;
    ///
    /// assert_eq!(
    ///     GpsWeekDay::new(1930, 0).to_posix(),
    ///     PosixTime::from_secs(1_483_228_800)
    /// );
    /// ```
    pub const fn to_posix(&self) -> PosixTime {
        let secs = GPS_EPOCH_BIAS_FROM_POSIX + self.days_since_gps_epoch() * SECS_PER_DAY;

        PosixTime::from_secs(secs)
    }

    /// Returns the calendar date at which this day starts.
    pub fn to_date(&self) -> Result<CalendarDate, DateError> {
        let (year, month, day) = self.to_ymd()?;

        CalendarDate::from_ymd(year, month, day)
    }

    fn to_ymd(self) -> Result<(i32, u8, u8), DateError> {
        let days = GPS_EPOCH_DAYS_FROM_YEAR_0 + self.days_since_gps_epoch();

        calendar::date_from_days_since_year_0(days)
    }

    /// Returns the normalized week and day containing the UTC instant `t`.
    ///
    /// Returns an error if `t` precedes the GPS epoch or if the week number
    /// does not fit in a `u32`.
    pub fn from_posix(t: &PosixTime) -> Result<Self, Error> {
        let days = t.floor_secs().div_euclid(SECS_PER_DAY) - GPS_EPOCH_POSIX_DAYS;
        if days < 0 {
            return Err(Error::OutOfRange);
        }
        let week =
            u32::try_from(days / DAYS_PER_WEEK as i64).map_err(|_| Error::OutOfRange)?;
        let day = (days % DAYS_PER_WEEK as i64) as u8;

        Ok(Self { week, day })
    }
}

impl Instant<Gps> {
    /// Creates a GPS timestamp from a week number and a number of seconds
    /// into the week.
    ///
    /// Returns an error if `secs_of_week` is a week or more.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::GpsTime;
    ///
    /// let t = GpsTime::from_week_and_seconds(1930, 18).unwrap();
    /// assert_eq!(t.week_and_seconds(), Some((1930, 18)));
    /// ```
    pub fn from_week_and_seconds(week: u32, secs_of_week: u32) -> Result<Self, Error> {
        if secs_of_week as i64 >= SECS_PER_WEEK {
            return Err(Error::OutOfRange);
        }

        Ok(Self::from_secs(week as i64 * SECS_PER_WEEK + secs_of_week as i64))
    }

    /// Returns the week number and the whole number of seconds into the week.
    ///
    /// Returns `None` if the timestamp precedes the GPS epoch or if the week
    /// number does not fit in a `u32`.
    pub fn week_and_seconds(&self) -> Option<(u32, u32)> {
        if self.is_negative() {
            return None;
        }
        let secs = self.as_secs();
        let week = u32::try_from(secs / SECS_PER_WEEK).ok()?;

        Some((week, (secs % SECS_PER_WEEK) as u32))
    }
}

/// The outcome of a truncated week number resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WeekResolution {
    /// Exactly one extended week matches.
    Resolved(u32),
    /// Several extended weeks match; the two earliest are reported.
    Ambiguous {
        /// The earliest matching week.
        first: u32,
        /// The second matching week.
        second: u32,
    },
    /// No extended week matches.
    NotFound,
}

impl WeekResolution {
    /// Converts the outcome into a result, treating ambiguous and missing
    /// matches as errors.
    pub const fn into_result(self) -> Result<u32, Error> {
        match self {
            Self::Resolved(week) => Ok(week),
            Self::Ambiguous { first, second } => Err(Error::AmbiguousWeekNumber { first, second }),
            Self::NotFound => Err(Error::WeekNumberNotFound),
        }
    }
}

/// Normalizes a truncated week and day, validating the day.
fn normalize_truncated(truncated_week: u8, day: u8) -> Result<(u8, u8), Error> {
    match day {
        0..=6 => Ok((truncated_week, day)),
        // The following week is also the following truncated week.
        7 => Ok((truncated_week.wrapping_add(1), 0)),
        _ => Err(Error::InvalidDayOfWeek(day)),
    }
}

/// Searches the configured number of 256-week cycles for weeks strictly
/// after `after` whose day falls on an acceptable leap second date.
fn search_cycles(
    config: &Config<'_>,
    truncated_week: u8,
    day: u8,
    after: Option<u32>,
) -> Result<WeekResolution, Error> {
    let (truncated_week, day) = normalize_truncated(truncated_week, day)?;
    let policy = config.leap_date_policy();

    let mut first = None;
    for cycle in 0..config.cycle_limit() {
        let candidate = match cycle
            .checked_mul(WEEKS_PER_CYCLE)
            .and_then(|week| week.checked_add(truncated_week as u32))
        {
            Some(candidate) => candidate,
            None => break,
        };
        if after.map_or(false, |after| candidate <= after) {
            continue;
        }

        let (year, month, day_of_month) = GpsWeekDay::new(candidate, day).to_ymd()?;
        let accepted = policy.accepts(day_of_month, month);
        trace!(candidate, year, month, day_of_month, accepted, "GPS week candidate");

        if !accepted {
            continue;
        }
        match first {
            None => first = Some(candidate),
            Some(first) => {
                warn!(
                    truncated_week,
                    day,
                    first,
                    second = candidate,
                    "ambiguous GPS leap second week"
                );
                return Ok(WeekResolution::Ambiguous {
                    first,
                    second: candidate,
                });
            }
        }
    }

    Ok(match first {
        Some(week) => WeekResolution::Resolved(week),
        None => WeekResolution::NotFound,
    })
}

/// Recovers the extended week number of a leap second from its truncated
/// 8-bit week number and its day.
///
/// Candidate weeks `truncated_week + 256 * cycle` are generated for each
/// cycle below the configured limit and kept if their day falls on a date
/// accepted by the configured [`LeapDatePolicy`](crate::LeapDatePolicy). The
/// resolved week is in normalized form, so `(137, 7)` and `(138, 0)` resolve
/// to the same week.
///
/// With the default policy and cycle limit, the result is never ambiguous.
/// Larger cycle limits or the quarterly policy may produce ambiguous results.
///
/// Returns an error if `day` is greater than 7.
///
/// # Examples
///
/// ```
/// use refclock_time::gps_week::{resolve, WeekResolution};
/// use refclock_time::Config;
///
/// assert_eq!(resolve(&Config::default(), 59, 3), Ok(WeekResolution::Resolved(1851)));
///
/// let config = Config::default().with_cycle_limit(40);
/// assert_eq!(
///     resolve(&config, 181, 5),
///     Ok(WeekResolution::Ambiguous { first: 181, second: 8373 })
/// );
/// ```
pub fn resolve(config: &Config<'_>, truncated_week: u8, day: u8) -> Result<WeekResolution, Error> {
    search_cycles(config, truncated_week, day, None)
}

/// The result of a search through the leap second history.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PastSearch {
    /// The week of the most recent matching leap second, if any.
    pub week: Option<u32>,
    /// The week of the most recent leap second after the GPS epoch, if any.
    pub last_known_week: Option<u32>,
}

/// Returns an iterator over the normalized week and day of the leap seconds
/// after the GPS epoch, most recent first.
fn past_leap_weeks<'a>(config: &Config<'a>) -> impl Iterator<Item = GpsWeekDay> + 'a {
    config
        .leap_seconds()
        .entries()
        .iter()
        .rev()
        .filter_map(|entry| GpsWeekDay::from_posix(&entry.instant()).ok())
}

/// Looks up the leap second history for a leap second that took effect on
/// the given day of the week.
///
/// Only the most recent leap second is checked unless `search_all` is set,
/// in which case the most recent matching leap second is returned. The week
/// of the most recent leap second is returned as a hint for searches of
/// future dates.
///
/// Returns an error if `day` is greater than 7.
///
/// # Examples
///
/// ```
/// use refclock_time::gps_week::find_past_from_table;
/// use refclock_time::Config;
///
/// let config = Config::default();
///
/// let search = find_past_from_table(&config, 3, false).unwrap();
/// assert_eq!((search.week, search.last_known_week), (None, Some(1930)));
///
/// let search = find_past_from_table(&config, 3, true).unwrap();
/// assert_eq!((search.week, search.last_known_week), (Some(1851), Some(1930)));
/// ```
pub fn find_past_from_table(
    config: &Config<'_>,
    day: u8,
    search_all: bool,
) -> Result<PastSearch, Error> {
    let (_, day) = normalize_truncated(0, day)?;

    let mut weeks = past_leap_weeks(config);
    let last = weeks.next();
    let mut search = PastSearch {
        week: None,
        last_known_week: last.map(|last| last.week),
    };

    if last.map_or(false, |last| last.day == day) {
        search.week = search.last_known_week;
    } else if search_all {
        search.week = weeks.find(|past| past.day == day).map(|past| past.week);
    }

    Ok(search)
}

/// Returns the week of the most recent leap second in the history whose
/// truncated week and day match.
///
/// Returns an error if `day` is greater than 7.
pub fn find_past_matching(
    config: &Config<'_>,
    truncated_week: u8,
    day: u8,
) -> Result<Option<u32>, Error> {
    let (truncated_week, day) = normalize_truncated(truncated_week, day)?;

    Ok(past_leap_weeks(config)
        .find(|past| past.truncated_week() == truncated_week && past.day == day)
        .map(|past| past.week))
}

/// Recovers the extended week number of a leap second, using the leap second
/// history first.
///
/// If a leap second of the history matches the truncated week and day, its
/// week is returned. Otherwise the cycle search of [`resolve`] is restricted
/// to weeks after the most recent known leap second, since an announcement
/// that is not in the history must refer to a later date.
///
/// # Examples
///
/// ```
/// use refclock_time::gps_week::resolve_with_history;
/// use refclock_time::{Config, Error};
///
/// let config = Config::default().with_cycle_limit(40);
///
/// // Ambiguous for a plain search, but found in the history.
/// assert_eq!(resolve_with_history(&config, 59, 3), Ok(1851));
///
/// // 2027-01-01, which is after the last known leap second.
/// assert_eq!(resolve_with_history(&config, 147, 5), Ok(2451));
///
/// // 2009-07-01 had no leap second.
/// assert_eq!(resolve_with_history(&config, 2, 3), Err(Error::WeekNumberNotFound));
/// ```
pub fn resolve_with_history(
    config: &Config<'_>,
    truncated_week: u8,
    day: u8,
) -> Result<u32, Error> {
    if let Some(week) = find_past_matching(config, truncated_week, day)? {
        trace!(truncated_week, day, week, "GPS leap second week found in history");
        return Ok(week);
    }
    let last_known_week = find_past_from_table(config, day, false)?.last_known_week;

    search_cycles(config, truncated_week, day, last_known_week)?.into_result()
}

/// The UTC parameters broadcast by GPS satellites.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcParameters {
    /// The current GPS - UTC offset in seconds (`ΔtLS`).
    pub delta_tls: i32,
    /// The GPS - UTC offset in seconds after the leap second (`ΔtLSF`).
    pub delta_tlsf: i32,
    /// The truncated week of the leap second (`WNlsf`).
    pub wn_lsf: u8,
    /// The day of the leap second (`DN`), possibly de-normalized.
    pub dn: u8,
}

/// Converts a leap second announcement into a [`PendingLeapSecond`].
///
/// When the week of the announcement cannot be resolved, a record with
/// `valid == false` is returned that still carries the announced offsets and
/// step, so that the caller can rely on the difference between `delta_tls`
/// and `delta_tlsf`.
///
/// Returns an error if the offsets differ by more than one second, if they
/// lie outside the representable range or if the day is greater than 7.
///
/// # Examples
///
/// ```
/// use refclock_time::gps_week::{announce, UtcParameters};
/// use refclock_time::{Config, LeapStep, PosixTime};
///
/// let params = UtcParameters { delta_tls: 17, delta_tlsf: 18, wn_lsf: 137, dn: 7 };
/// let pending = announce(&Config::default(), &params).unwrap();
///
/// assert!(pending.valid);
/// assert_eq!(pending.instant_utc, PosixTime::from_secs(1_483_228_800));
/// assert_eq!(pending.step, LeapStep::Positive);
/// assert_eq!(pending.offset_tai_utc, 37);
/// ```
pub fn announce(config: &Config<'_>, params: &UtcParameters) -> Result<PendingLeapSecond, Error> {
    let delta = params.delta_tlsf.checked_sub(params.delta_tls).ok_or(Error::OutOfRange)?;
    let step = LeapStep::from_delta(delta)?;
    let offset_tai_utc = params
        .delta_tlsf
        .checked_add(GPS_TAI_OFFSET as i32)
        .ok_or(Error::OutOfRange)?;

    match resolve_with_history(config, params.wn_lsf, params.dn) {
        Ok(week) => {
            let (_, day) = normalize_truncated(params.wn_lsf, params.dn)?;
            let instant_utc = GpsWeekDay::new(week, day).to_posix();

            Ok(PendingLeapSecond::new(instant_utc, step, offset_tai_utc)?)
        }
        Err(err @ (Error::AmbiguousWeekNumber { .. } | Error::WeekNumberNotFound)) => {
            warn!(
                wn_lsf = params.wn_lsf,
                dn = params.dn,
                %err,
                "leap second announcement could not be dated"
            );

            Ok(PendingLeapSecond {
                step,
                offset_gps_utc: params.delta_tlsf,
                offset_tai_utc,
                valid: false,
                ..PendingLeapSecond::default()
            })
        }
        Err(err) => Err(err),
    }
}
