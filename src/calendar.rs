//! Proleptic Gregorian calendar arithmetic.
//!
//! Day counts are referenced to 0000-01-01, which is day 0. Year 0 is the
//! ISO 8601 year 1 BC and is a leap year. Negative years are not supported.
//!
//! Weekdays come in two numbering conventions: Monday-origin (0 = Monday, as
//! returned by [`day_of_week`]) and Sunday-origin (0 = Sunday, as returned by
//! [`day_of_week_sun06`]).

use core::fmt;
use core::str::FromStr;

use crate::{DateError, ParseDateError, PosixTime};

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const DAYS_IN_MONTH_LEAP: [u8; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const DOY_AT_MONTH: [u16; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const DOY_AT_MONTH_LEAP: [u16; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Number of days in a 400-year Gregorian cycle.
const DAYS_PER_400_YEARS: i64 = 146_097;

/// Number of days from 0000-01-01 to 1970-01-01.
pub(crate) const DAYS_TO_POSIX_EPOCH: i64 = days_from_year_0(1970);

pub(crate) const SECS_PER_DAY: i64 = 86_400;

/// 0000-01-01 was a Saturday, i.e. day 5 in Monday-origin numbering.
const WEEKDAY_OF_DAY_0: i64 = 5;

/// Returns whether the year is a leap year in the proleptic Gregorian
/// calendar.
///
/// Year 0 is a leap year.
///
/// # Examples
///
/// ```
/// use refclock_time::calendar::is_leap_year;
///
/// assert!(is_leap_year(2000));
/// assert!(!is_leap_year(1900));
/// assert!(is_leap_year(2024));
/// assert!(!is_leap_year(2023));
/// ```
pub const fn is_leap_year(year: i32) -> bool {
    (year & 0b11) == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Returns the number of days in a year.
pub const fn days_in_year(year: i32) -> u16 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Returns the number of days in a month.
///
/// Returns an error if the year is negative or the month is not between 1 and
/// 12.
pub fn days_in_month(year: i32, month: u8) -> Result<u8, DateError> {
    check_year(year)?;
    if !(1..=12).contains(&month) {
        return Err(DateError::InvalidMonth(month));
    }

    Ok(days_in_month_unchecked(year, month))
}

const fn days_in_month_unchecked(year: i32, month: u8) -> u8 {
    let month_idx = (month - 1) as usize;

    if is_leap_year(year) {
        DAYS_IN_MONTH_LEAP[month_idx]
    } else {
        DAYS_IN_MONTH[month_idx]
    }
}

fn check_year(year: i32) -> Result<(), DateError> {
    if year < 0 {
        return Err(DateError::InvalidYear(year as i64));
    }

    Ok(())
}

fn check_date(day: u8, month: u8, year: i32) -> Result<(), DateError> {
    let max_day = days_in_month(year, month)?;
    if day < 1 || day > max_day {
        return Err(DateError::InvalidDayOfMonth(day));
    }

    Ok(())
}

/// Returns the 1-based day of the year.
///
/// Returns an error if the date is invalid.
///
/// # Examples
///
/// ```
/// use refclock_time::calendar::day_of_year;
///
/// assert_eq!(day_of_year(1, 1, 2023), Ok(1));
/// assert_eq!(day_of_year(31, 12, 2024), Ok(366));
/// ```
pub fn day_of_year(day: u8, month: u8, year: i32) -> Result<u16, DateError> {
    check_date(day, month, year)?;

    Ok(day_of_year_unchecked(day, month, year))
}

const fn day_of_year_unchecked(day: u8, month: u8, year: i32) -> u16 {
    let month_idx = (month - 1) as usize;
    let table = if is_leap_year(year) {
        &DOY_AT_MONTH_LEAP
    } else {
        &DOY_AT_MONTH
    };

    day as u16 + table[month_idx]
}

/// Returns the number of elapsed days since the first day of year 0 to the
/// first day of the provided year.
///
/// The argument must not be negative.
pub(crate) const fn days_from_year_0(year: i32) -> i64 {
    let year = year as i64;
    let offset = (year > 0) as i64;
    let y = year - offset;
    let m4 = y / 4 + offset;
    let m100 = y / 100;
    let m400 = m100 / 4;

    year * 365 + m4 - m100 + m400
}

/// Day count of a date known to be valid.
pub(crate) const fn days_since_year_0_unchecked(day: u8, month: u8, year: i32) -> i64 {
    days_from_year_0(year) + day_of_year_unchecked(day, month, year) as i64 - 1
}

/// Returns the number of days from 0000-01-01 to the provided date, so that
/// 0000-01-01 is day 0.
///
/// Returns an error if the date is invalid.
///
/// # Examples
///
/// ```
/// use refclock_time::calendar::n_days_since_year_0;
///
/// assert_eq!(n_days_since_year_0(1, 1, 0), Ok(0));
/// assert_eq!(n_days_since_year_0(1, 1, 1), Ok(366));
/// assert_eq!(n_days_since_year_0(1, 1, 1970), Ok(719_528));
/// ```
pub fn n_days_since_year_0(day: u8, month: u8, year: i32) -> Result<i64, DateError> {
    check_date(day, month, year)?;

    Ok(days_since_year_0_unchecked(day, month, year))
}

/// Returns the day of the week with Monday as day 0.
///
/// # Examples
///
/// ```
/// use refclock_time::calendar::day_of_week;
///
/// // 1970-01-01 was a Thursday.
/// assert_eq!(day_of_week(1, 1, 1970), Ok(3));
/// ```
pub fn day_of_week(day: u8, month: u8, year: i32) -> Result<u8, DateError> {
    n_days_since_year_0(day, month, year).map(weekday_of_day_count)
}

/// Returns the day of the week with Sunday as day 0.
///
/// # Examples
///
/// ```
/// use refclock_time::calendar::day_of_week_sun06;
///
/// // 1970-01-01 was a Thursday.
/// assert_eq!(day_of_week_sun06(1, 1, 1970), Ok(4));
/// ```
pub fn day_of_week_sun06(day: u8, month: u8, year: i32) -> Result<u8, DateError> {
    day_of_week(day, month, year).map(monday_to_sunday_origin)
}

/// Converts a Monday-origin weekday to a Sunday-origin weekday.
pub const fn monday_to_sunday_origin(weekday: u8) -> u8 {
    (weekday + 1) % 7
}

/// Converts a Sunday-origin weekday to a Monday-origin weekday.
pub const fn sunday_to_monday_origin(weekday: u8) -> u8 {
    (weekday + 6) % 7
}

pub(crate) fn weekday_of_day_count(days: i64) -> u8 {
    (days + WEEKDAY_OF_DAY_0).rem_euclid(7) as u8
}

/// Normalizes a 1-based day number that may lie outside the year.
///
/// Day numbers below 1 roll back into previous years and day numbers beyond
/// the length of the year roll forward into the following years. Returns the
/// adjusted year together with a day number between 1 and the length of that
/// year.
///
/// Returns an error if the adjusted year would be negative or would not fit
/// in an `i32`.
///
/// # Examples
///
/// ```
/// use refclock_time::calendar::days_to_years;
///
/// assert_eq!(days_to_years(2024, 0), Ok((2023, 365)));
/// assert_eq!(days_to_years(2024, 367), Ok((2025, 1)));
/// ```
pub fn days_to_years(year: i32, day_num: i64) -> Result<(i32, u16), DateError> {
    check_year(year)?;

    // Skip whole 400-year cycles first so the loops below run at most a few
    // hundred times.
    let cycles = day_num
        .checked_sub(1)
        .ok_or(DateError::InvalidYear(-1))?
        .div_euclid(DAYS_PER_400_YEARS);
    let mut day_num = day_num - cycles * DAYS_PER_400_YEARS;
    let mut year = cycles
        .checked_mul(400)
        .and_then(|years| years.checked_add(year as i64))
        .ok_or(DateError::InvalidYear(i64::MAX))?;

    while day_num > days_in_year_i64(year) {
        day_num -= days_in_year_i64(year);
        year += 1;
    }
    while day_num < 1 {
        year -= 1;
        day_num += days_in_year_i64(year);
    }

    if year < 0 || year > i32::MAX as i64 {
        return Err(DateError::InvalidYear(year));
    }

    Ok((year as i32, day_num as u16))
}

fn days_in_year_i64(year: i64) -> i64 {
    // The Gregorian cycle repeats every 400 years.
    days_in_year(year.rem_euclid(400) as i32) as i64
}

/// Returns the year, month and day of the month for a 1-based day number.
///
/// The day number may lie outside the year, see [`days_to_years`].
///
/// # Examples
///
/// ```
/// use refclock_time::calendar::date_of_year;
///
/// assert_eq!(date_of_year(2024, 60), Ok((2024, 2, 29)));
/// assert_eq!(date_of_year(2024, -1), Ok((2023, 12, 30)));
/// ```
pub fn date_of_year(year: i32, day_num: i64) -> Result<(i32, u8, u8), DateError> {
    let (year, doy) = days_to_years(year, day_num)?;
    let (month, day) = month_and_day_of_month(year, doy);

    Ok((year, month, day))
}

/// Calculates the month and the day of the month for a valid 1-based day of
/// the year.
fn month_and_day_of_month(year: i32, doy: u16) -> (u8, u8) {
    let table = if is_leap_year(year) {
        &DOY_AT_MONTH_LEAP
    } else {
        &DOY_AT_MONTH
    };

    let doy0 = doy - 1;
    let idx = table.binary_search(&doy0).unwrap_or_else(|e| e - 1);
    let month = idx as u8 + 1;
    let day = (doy0 - table[idx]) as u8 + 1;

    (month, day)
}

/// Returns the year, month and day of the month for a day count relative to
/// 0000-01-01.
///
/// Returns an error if the day count is negative or too large.
pub fn date_from_days_since_year_0(days: i64) -> Result<(i32, u8, u8), DateError> {
    if days < 0 {
        return Err(DateError::InvalidYear(-1));
    }
    let day_num = days.checked_add(1).ok_or(DateError::InvalidYear(i64::MAX))?;

    date_of_year(0, day_num)
}

/// A validated calendar date and time of day, without time zone.
///
/// The second may be 60 to express a positive leap second. Such a date-time
/// converts to the same POSIX instant as the first second of the next minute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawCalendarDate", into = "RawCalendarDate")
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarDate {
    // Field order matters for the derived ordering.
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

/// Unvalidated field layout of a serialized `CalendarDate`.
#[cfg(feature = "serde")]
#[derive(Clone, Copy, serde::Serialize, serde::Deserialize)]
struct RawCalendarDate {
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCalendarDate> for CalendarDate {
    type Error = DateError;

    fn try_from(raw: RawCalendarDate) -> Result<Self, Self::Error> {
        Self::new(raw.year, raw.month, raw.day, raw.hour, raw.minute, raw.second)
    }
}

#[cfg(feature = "serde")]
impl From<CalendarDate> for RawCalendarDate {
    fn from(date: CalendarDate) -> Self {
        Self {
            year: date.year,
            month: date.month,
            day: date.day,
            hour: date.hour,
            minute: date.minute,
            second: date.second,
        }
    }
}

impl CalendarDate {
    /// Creates a date-time from its components.
    ///
    /// Returns an error if any of the components is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::CalendarDate;
    ///
    /// let date = CalendarDate::new(2016, 12, 31, 23, 59, 60).unwrap();
    /// assert_eq!(date.to_string(), "2016-12-31 23:59:60");
    /// assert!(CalendarDate::new(2023, 2, 29, 0, 0, 0).is_err());
    /// ```
    pub fn new(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, DateError> {
        check_date(day, month, year)?;
        if hour > 23 {
            return Err(DateError::InvalidHour(hour));
        }
        if minute > 59 {
            return Err(DateError::InvalidMinute(minute));
        }
        if second > 60 {
            return Err(DateError::InvalidSecond(second));
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Creates a date at midnight.
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, DateError> {
        Self::new(year, month, day, 0, 0, 0)
    }

    /// Returns the date-time of a POSIX timestamp.
    ///
    /// The sub-second part of the timestamp is truncated towards the past.
    ///
    /// Returns an error if the date is before year 0 or after year
    /// `i32::MAX`.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{CalendarDate, PosixTime};
    ///
    /// let t = PosixTime::new(1_483_228_799, 500_000_000).unwrap();
    /// let date = CalendarDate::from_posix(&t).unwrap();
    /// assert_eq!(date, CalendarDate::new(2016, 12, 31, 23, 59, 59).unwrap());
    /// ```
    pub fn from_posix(t: &PosixTime) -> Result<Self, DateError> {
        let secs = t.floor_secs();
        let days = secs.div_euclid(SECS_PER_DAY);
        let sec_of_day = secs.rem_euclid(SECS_PER_DAY);

        let days = days
            .checked_add(DAYS_TO_POSIX_EPOCH)
            .ok_or(DateError::InvalidYear(i64::MAX))?;
        let (year, month, day) = date_from_days_since_year_0(days)?;

        Ok(Self {
            year,
            month,
            day,
            hour: (sec_of_day / 3600) as u8,
            minute: (sec_of_day % 3600 / 60) as u8,
            second: (sec_of_day % 60) as u8,
        })
    }

    /// Returns the POSIX timestamp of this date-time.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{CalendarDate, PosixTime};
    ///
    /// let date = CalendarDate::from_ymd(2017, 1, 1).unwrap();
    /// assert_eq!(date.to_posix(), PosixTime::from_secs(1_483_228_800));
    /// ```
    pub fn to_posix(&self) -> PosixTime {
        let days = self.days_since_year_0() - DAYS_TO_POSIX_EPOCH;
        let secs = days * SECS_PER_DAY
            + self.hour as i64 * 3600
            + self.minute as i64 * 60
            + self.second as i64;

        PosixTime::from_secs(secs)
    }

    /// Returns the year.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Returns the month, between 1 and 12.
    pub const fn month(&self) -> u8 {
        self.month
    }

    /// Returns the day of the month, starting at 1.
    pub const fn day(&self) -> u8 {
        self.day
    }

    /// Returns the hour, between 0 and 23.
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// Returns the minute, between 0 and 59.
    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// Returns the second, between 0 and 60.
    pub const fn second(&self) -> u8 {
        self.second
    }

    /// Returns the number of days since 0000-01-01.
    pub const fn days_since_year_0(&self) -> i64 {
        days_since_year_0_unchecked(self.day, self.month, self.year)
    }

    /// Returns the 1-based day of the year.
    pub const fn day_of_year(&self) -> u16 {
        day_of_year_unchecked(self.day, self.month, self.year)
    }

    /// Returns the day of the week with Monday as day 0.
    pub fn day_of_week(&self) -> u8 {
        weekday_of_day_count(self.days_since_year_0())
    }

    /// Returns the day of the week with Sunday as day 0.
    pub fn day_of_week_sun06(&self) -> u8 {
        monday_to_sunday_origin(self.day_of_week())
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl FromStr for CalendarDate {
    type Err = ParseDateError;

    /// Parses a date-time with the format `YYYY-MM-DD hh:mm:ss`, where the
    /// delimiter between date and time may also be `T` or `t`.
    ///
    /// The year must have at least 4 digits.
    fn from_str(stream: &str) -> Result<Self, Self::Err> {
        // Expect 2 leading digits optionally followed by one of the provided
        // delimiters, and return them as a single `u8`, together with the
        // remaining part of the stream if a delimiter was found.
        fn pull_two_digits<'a>(
            stream: &'a str,
            delimiter: &'a [char],
        ) -> Result<(u8, Option<&'a str>), ParseDateError> {
            let (token, stream) = stream
                .split_once(delimiter)
                .map(|(t, s)| (t, Some(s)))
                .unwrap_or((stream, None));

            if token.len() != 2 {
                return Err(ParseDateError::InvalidFieldWidth);
            }
            if !token.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseDateError::InvalidFieldValue);
            }

            token
                .parse()
                .map_err(|_| ParseDateError::InvalidFieldValue)
                .map(|token| (token, stream))
        }

        let (year, stream) = stream
            .split_once('-')
            .ok_or(ParseDateError::MissingField)?;
        if year.len() < 4 {
            return Err(ParseDateError::InvalidFieldWidth);
        }
        if !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseDateError::InvalidFieldValue);
        }
        let year: i32 = year
            .parse()
            .map_err(|_| ParseDateError::InvalidFieldValue)?;

        let (month, stream) = pull_two_digits(stream, &['-'])?;
        let stream = stream.ok_or(ParseDateError::MissingField)?;
        let (day, stream) = pull_two_digits(stream, &[' ', 'T', 't'])?;
        let stream = stream.ok_or(ParseDateError::MissingField)?;
        let (hour, stream) = pull_two_digits(stream, &[':'])?;
        let stream = stream.ok_or(ParseDateError::MissingField)?;
        let (min, stream) = pull_two_digits(stream, &[':'])?;
        let stream = stream.ok_or(ParseDateError::MissingField)?;
        let (sec, stream) = pull_two_digits(stream, &[])?;
        if stream.is_some() {
            return Err(ParseDateError::InvalidFieldWidth);
        }

        Self::new(year, month, day, hour, min, sec).map_err(ParseDateError::RangeError)
    }
}

#[cfg(feature = "chrono")]
impl TryFrom<CalendarDate> for chrono::NaiveDateTime {
    type Error = DateError;

    fn try_from(date: CalendarDate) -> Result<Self, Self::Error> {
        // `chrono` expresses a leap second as second 59 with an extra second
        // in the nanosecond field.
        let (second, nano) = if date.second == 60 {
            (59, 1_000_000_000)
        } else {
            (date.second as u32, 0)
        };

        chrono::NaiveDate::from_ymd_opt(date.year, date.month as u32, date.day as u32)
            .and_then(|d| d.and_hms_nano_opt(date.hour as u32, date.minute as u32, second, nano))
            .ok_or(DateError::InvalidYear(date.year as i64))
    }
}

#[cfg(feature = "chrono")]
impl TryFrom<chrono::NaiveDateTime> for CalendarDate {
    type Error = DateError;

    fn try_from(date_time: chrono::NaiveDateTime) -> Result<Self, Self::Error> {
        use chrono::{Datelike, Timelike};

        let leap = (date_time.nanosecond() >= 1_000_000_000) as u8;

        Self::new(
            date_time.year(),
            date_time.month() as u8,
            date_time.day() as u8,
            date_time.hour() as u8,
            date_time.minute() as u8,
            date_time.second() as u8 + leap,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_years() {
        assert!(is_leap_year(0));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(2100));
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), Ok(29));
        assert_eq!(days_in_month(2023, 2), Ok(28));
        assert_eq!(days_in_month(2023, 4), Ok(30));
        assert_eq!(days_in_month(2023, 12), Ok(31));
        assert_eq!(days_in_month(2023, 0), Err(DateError::InvalidMonth(0)));
        assert_eq!(days_in_month(2023, 13), Err(DateError::InvalidMonth(13)));
        assert_eq!(days_in_month(-1, 1), Err(DateError::InvalidYear(-1)));
    }

    #[test]
    fn day_counts() {
        assert_eq!(n_days_since_year_0(1, 1, 0), Ok(0));
        assert_eq!(n_days_since_year_0(31, 12, 0), Ok(365));
        assert_eq!(n_days_since_year_0(1, 1, 1970), Ok(DAYS_TO_POSIX_EPOCH));

        // Day 0 is 0000-01-01 and year 0 is a leap year, so the POSIX epoch
        // lies 719528 days after it. The classic 719162 count starts at
        // 0001-01-01.
        let ce = n_days_since_year_0(1, 1, 1).unwrap();
        let posix = n_days_since_year_0(1, 1, 1970).unwrap();
        assert_eq!(posix - ce, 719_162);
        assert_eq!(posix - n_days_since_year_0(1, 1, 0).unwrap(), 719_528);

        // GPS epoch.
        assert_eq!(n_days_since_year_0(6, 1, 1980).unwrap() - posix, 3657);
    }

    #[test]
    fn invalid_dates() {
        assert_eq!(
            n_days_since_year_0(29, 2, 2023),
            Err(DateError::InvalidDayOfMonth(29))
        );
        assert_eq!(
            n_days_since_year_0(0, 1, 2023),
            Err(DateError::InvalidDayOfMonth(0))
        );
        assert_eq!(day_of_year(1, 13, 2023), Err(DateError::InvalidMonth(13)));
        assert_eq!(day_of_week(32, 1, 2023), Err(DateError::InvalidDayOfMonth(32)));
    }

    #[test]
    fn weekdays() {
        // 1970-01-01 was a Thursday.
        assert_eq!(day_of_week(1, 1, 1970), Ok(3));
        assert_eq!(day_of_week_sun06(1, 1, 1970), Ok(4));
        // 1980-01-06, the GPS epoch, was a Sunday.
        assert_eq!(day_of_week(6, 1, 1980), Ok(6));
        assert_eq!(day_of_week_sun06(6, 1, 1980), Ok(0));
        // 0001-01-01 was a Monday, 0000-01-01 a Saturday.
        assert_eq!(day_of_week(1, 1, 1), Ok(0));
        assert_eq!(day_of_week(1, 1, 0), Ok(5));
        // 2000-02-29 was a Tuesday.
        assert_eq!(day_of_week(29, 2, 2000), Ok(1));

        for weekday in 0..7 {
            assert_eq!(
                sunday_to_monday_origin(monday_to_sunday_origin(weekday)),
                weekday
            );
        }
    }

    #[test]
    fn day_of_year_round_trip() {
        for year in [0, 1, 1900, 1970, 2000, 2023, 2024] {
            for month in 1..=12 {
                for day in 1..=days_in_month(year, month).unwrap() {
                    let doy = day_of_year(day, month, year).unwrap();
                    assert_eq!(date_of_year(year, doy as i64), Ok((year, month, day)));
                }
            }
        }
    }

    #[test]
    fn date_of_year_rollover() {
        assert_eq!(date_of_year(2024, 0), Ok((2023, 12, 31)));
        assert_eq!(date_of_year(2024, 367), Ok((2025, 1, 1)));
        assert_eq!(date_of_year(2023, 366), Ok((2024, 1, 1)));
        assert_eq!(date_of_year(2024, -365), Ok((2022, 12, 31)));
        assert_eq!(date_of_year(2000, 366 + 365 * 3 + 1), Ok((2004, 1, 1)));
        assert_eq!(date_of_year(1970, 146_097 + 1), Ok((2370, 1, 1)));
        assert_eq!(date_of_year(0, 0), Err(DateError::InvalidYear(-1)));
    }

    #[test]
    fn days_round_trip() {
        for days in [0, 1, 365, 366, 719_162, 719_528, 730_000, 1_000_000] {
            let (year, month, day) = date_from_days_since_year_0(days).unwrap();
            assert_eq!(n_days_since_year_0(day, month, year), Ok(days));
        }
        assert!(date_from_days_since_year_0(-1).is_err());
    }

    #[test]
    fn calendar_date_posix() {
        let date = CalendarDate::new(2001, 9, 9, 1, 46, 40).unwrap();
        assert_eq!(date.to_posix(), PosixTime::from_secs(1_000_000_000));
        assert_eq!(CalendarDate::from_posix(&date.to_posix()), Ok(date));

        let epoch = CalendarDate::from_posix(&PosixTime::EPOCH).unwrap();
        assert_eq!(epoch, CalendarDate::from_ymd(1970, 1, 1).unwrap());
        assert_eq!(epoch.day_of_week_sun06(), 4);
        assert_eq!(epoch.day_of_year(), 1);
    }

    #[test]
    fn calendar_date_before_posix_epoch() {
        let t = PosixTime::new(0, -500_000_000).unwrap();
        assert_eq!(
            CalendarDate::from_posix(&t),
            CalendarDate::new(1969, 12, 31, 23, 59, 59)
        );

        let date = CalendarDate::from_ymd(1958, 1, 1).unwrap();
        assert_eq!(date.to_posix(), PosixTime::from_secs(-378_691_200));
        assert_eq!(CalendarDate::from_posix(&date.to_posix()), Ok(date));
    }

    #[test]
    fn leap_second_date() {
        let date = CalendarDate::new(2016, 12, 31, 23, 59, 60).unwrap();
        assert_eq!(date.to_posix(), PosixTime::from_secs(1_483_228_800));
        assert_eq!(
            CalendarDate::new(2016, 12, 31, 23, 59, 61),
            Err(DateError::InvalidSecond(61))
        );
    }

    #[test]
    fn parse() {
        assert_eq!(
            "2017-01-01 00:00:00".parse::<CalendarDate>(),
            CalendarDate::from_ymd(2017, 1, 1).map_err(ParseDateError::RangeError)
        );
        assert_eq!(
            "1972-06-30T23:59:60".parse::<CalendarDate>(),
            CalendarDate::new(1972, 6, 30, 23, 59, 60).map_err(ParseDateError::RangeError)
        );
        assert_eq!(
            "72-06-30 00:00:00".parse::<CalendarDate>(),
            Err(ParseDateError::InvalidFieldWidth)
        );
        assert_eq!(
            "2017-01-01".parse::<CalendarDate>(),
            Err(ParseDateError::MissingField)
        );
        assert_eq!(
            "2017-0a-01 00:00:00".parse::<CalendarDate>(),
            Err(ParseDateError::InvalidFieldValue)
        );
        assert_eq!(
            "2017-02-30 00:00:00".parse::<CalendarDate>(),
            Err(ParseDateError::RangeError(DateError::InvalidDayOfMonth(30)))
        );
        assert_eq!(
            "2017-01-01 00:00:00.5".parse::<CalendarDate>(),
            Err(ParseDateError::InvalidFieldWidth)
        );
    }

    #[test]
    fn display() {
        let date = CalendarDate::new(987, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(date.to_string(), "0987-03-04 05:06:07");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_validation() {
        let date = CalendarDate::new(2016, 12, 31, 23, 59, 60).unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(serde_json::from_str::<CalendarDate>(&json).unwrap(), date);

        let invalid = r#"{"year":2024,"month":13,"day":40,"hour":99,"minute":0,"second":0}"#;
        assert!(serde_json::from_str::<CalendarDate>(invalid).is_err());
        let invalid = r#"{"year":2023,"month":2,"day":29,"hour":0,"minute":0,"second":0}"#;
        assert!(serde_json::from_str::<CalendarDate>(invalid).is_err());
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn chrono_round_trip() {
        let date = CalendarDate::new(2016, 12, 31, 23, 59, 60).unwrap();
        let naive: chrono::NaiveDateTime = date.try_into().unwrap();
        assert_eq!(CalendarDate::try_from(naive), Ok(date));
    }
}
