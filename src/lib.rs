//! Time representation and leap-second resolution for radio-clock and GNSS
//! timing adapters.
//!
//! # Overview
//!
//! Reference clocks deliver time as a mix of raw integers: seconds counted
//! from various epochs, binary fractions of a second, GPS week numbers
//! truncated to 8 bits and UTC offsets announced ahead of a leap second. This
//! crate turns those integers into well-defined timestamps and back:
//!
//! - [`calendar`]: proleptic Gregorian calendar arithmetic,
//! - [`epoch`]: constant-bias conversions between the POSIX, NTP, GPS, TAI
//!   and SMPTE epochs,
//! - [`fraction`]: fixed-point binary fraction codecs,
//! - [`leap`]: the table of known leap seconds and pending leap second
//!   announcements,
//! - [`gps_week`]: resolution of truncated GPS leap second week numbers,
//! - [`timestamp`]: hardware timestamps bracketed by cycle counter samples.
//!
//! An [`Instant`] is a signed number of seconds and a signed number of
//! nanoseconds relative to the epoch selected by its type parameter. Both
//! components always carry the sign of the whole value, so that -0.5s is
//! represented as `(0, -500_000_000)`.
//!
//!
//! # Design choices and limitations
//!
//! Nothing in this crate reads global state. The leap second table and the
//! resolver settings are gathered in a [`Config`] value that is passed by
//! reference to the operations that need it.
//!
//! Apart from the leap second file parser, no operation allocates, blocks or
//! panics on malformed input; errors are reported as explicit results.
//!
//!
//! # Features flags
//!
//! ### Support for `no-std`
//!
//! By default, this crate enables the `std` feature to provide
//! `std::error::Error` implementations, conversions to/from
//! `std::time::SystemTime` and the leap second file parser, but specifying
//! `default-features = false` makes it `no-std`-compatible.
//!
//! ### Support for time-related crates
//!
//! Conversion methods to and from UTC date-time stamps from the [chrono] crate
//! are available with the `chrono` feature.
//!
//! ### Serialization
//!
//! Timestamps, calendar dates and related error types can be (de)serialized
//! with `serde` by activating the `serde` feature.
//!
//! ### Embedded logging
//!
//! Value and error types implement `defmt::Format` when the `defmt` feature
//! is activated.
//!
//! ### System clocks
//!
//! On Linux, the `tai_clock` feature provides readers for the `CLOCK_TAI`,
//! `CLOCK_REALTIME` and `CLOCK_MONOTONIC_RAW` system clocks.
//!
//! [chrono]: https://crates.io/crates/chrono
//!
//!
//! # Examples
//!
//! ```
//! use refclock_time::gps_week::{resolve, WeekResolution};
//! use refclock_time::{Config, GpsTime, PosixTime};
//!
//! let config = Config::default();
//!
//! // A receiver reports the last leap second as truncated week 138, day 0.
//! assert_eq!(resolve(&config, 138, 0), Ok(WeekResolution::Resolved(1930)));
//!
//! // 2017-01-01 00:00:00 UTC.
//! let t = PosixTime::from_secs(1_483_228_800);
//! let offset = config.leap_seconds().offset_at(&t).unwrap();
//! assert_eq!(offset, 37);
//!
//! let gps: GpsTime = t.convert(offset as i64).unwrap();
//! assert_eq!(gps.as_secs(), 1930 * 604_800 + 18);
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use core::fmt;
use core::marker::PhantomData;
use core::time::Duration;

pub mod calendar;
#[cfg(all(feature = "tai_clock", target_os = "linux"))]
pub mod clock;
mod config;
pub mod epoch;
mod errors;
pub mod fraction;
pub mod gps_week;
pub mod leap;
#[cfg(feature = "std")]
pub mod leap_file;
pub mod timestamp;

pub use calendar::CalendarDate;
pub use config::Config;
pub use epoch::{Atomic, Epoch, Gps, Ntp, Posix, Smpte, Tai, Tai1958, TimeScale, Utc};
pub use errors::{
    DateError, Error, FractionError, LeapTableError, OutOfRangeError, ParseDateError,
};
pub use fraction::{BinFrac16, BinFrac32};
pub use gps_week::{GpsWeekDay, WeekResolution};
pub use leap::{LeapDatePolicy, LeapSecondEntry, LeapSecondTable, LeapStep, PendingLeapSecond};
pub use timestamp::{CycleBracketedTimestamp, RawTimestamp};

const NANOS_PER_SEC: i32 = 1_000_000_000;

/// An [`Instant`] relative to the POSIX epoch, 1970-01-01 00:00:00 UTC.
///
/// # Examples
///
/// ```
/// use refclock_time::PosixTime;
///
/// // 2009-02-13 23:31:30.987654321 UTC.
/// let t = PosixTime::new(1_234_567_890, 987_654_321).unwrap();
/// assert_eq!(t.as_secs(), 1_234_567_890);
/// assert_eq!(t.subsec_nanos(), 987_654_321);
/// ```
pub type PosixTime = Instant<Posix>;

/// An [`Instant`] relative to the NTP epoch, 1900-01-01 00:00:00 UTC.
pub type NtpTime = Instant<Ntp>;

/// An [`Instant`] relative to 1970-01-01 00:00:00 TAI.
pub type TaiTime = Instant<Tai>;

/// An [`Instant`] relative to the SMPTE ST 2059 epoch, which is also
/// 1970-01-01 00:00:00 TAI.
pub type SmpteTime = Instant<Smpte>;

/// An [`Instant`] relative to the GPS epoch, 1980-01-06 00:00:00 UTC, on the
/// GPS time scale.
///
/// # Examples
///
/// ```
/// use refclock_time::{GpsTime, PosixTime};
///
/// // 2009-02-13 23:31:30 UTC, accounting for the +34s difference between TAI
/// // and UTC on that date.
/// let t = PosixTime::from_secs(1_234_567_890);
/// assert_eq!(t.convert(34), Ok(GpsTime::from_secs(918_603_105)));
/// ```
pub type GpsTime = Instant<Gps>;

/// An [`Instant`] relative to 1958-01-01 00:00:00 TAI.
pub type Tai1958Time = Instant<Tai1958>;

/// Nanosecond-precision timestamp parametrized by its reference epoch.
///
/// A timestamp is represented as a signed 64-bit number of seconds and a
/// signed number of nanoseconds whose magnitude is less than one second. When
/// the timestamp lies in the past of its epoch, both components are
/// non-positive; when it lies in the future, both are non-negative.
///
/// Timestamps with the same epoch are totally ordered.
///
/// # Examples
///
/// ```
/// use refclock_time::{Error, PosixTime};
///
/// let t = PosixTime::new(-1, -250_000_000).unwrap();
/// assert_eq!(t.to_string(), "-1.250000000");
///
/// assert_eq!(PosixTime::new(-1, 250_000_000), Err(Error::InconsistentSign));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "", try_from = "(i64, i32)", into = "(i64, i32)")
)]
pub struct Instant<E: Epoch = Posix> {
    /// The number of whole seconds, truncated towards zero.
    ///
    /// Note that the automatic derivation of `PartialOrd` relies on
    /// lexicographical comparison so the `secs` field must appear before
    /// `nanos` in declaration order to be given higher priority. This ordering
    /// is correct because both fields always have the same sign.
    secs: i64,
    /// The sub-second number of nanoseconds, with the sign of `secs`.
    nanos: i32,
    epoch: PhantomData<E>,
}

impl<E: Epoch> Instant<E> {
    /// The reference epoch, which by definition is always a null timestamp.
    pub const EPOCH: Self = Self::from_parts(0, 0);

    /// The minimum possible timestamp.
    pub const MIN: Self = Self::from_parts(i64::MIN, -(NANOS_PER_SEC - 1));

    /// The maximum possible timestamp.
    pub const MAX: Self = Self::from_parts(i64::MAX, NANOS_PER_SEC - 1);

    pub(crate) const fn from_parts(secs: i64, nanos: i32) -> Self {
        Self {
            secs,
            nanos,
            epoch: PhantomData,
        }
    }

    /// Creates a timestamp relative to the epoch.
    ///
    /// Returns an error if the magnitude of `subsec_nanos` is one second or
    /// more, or if `secs` and `subsec_nanos` have opposite signs.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{Error, PosixTime};
    ///
    /// assert!(PosixTime::new(0, -5).is_ok());
    /// assert_eq!(PosixTime::new(1, -5), Err(Error::InconsistentSign));
    /// assert_eq!(
    ///     PosixTime::new(1, 1_000_000_000),
    ///     Err(Error::InvalidNanosecond(1_000_000_000))
    /// );
    /// ```
    pub const fn new(secs: i64, subsec_nanos: i32) -> Result<Self, Error> {
        if subsec_nanos >= NANOS_PER_SEC || subsec_nanos <= -NANOS_PER_SEC {
            return Err(Error::InvalidNanosecond(subsec_nanos));
        }
        if (secs > 0 && subsec_nanos < 0) || (secs < 0 && subsec_nanos > 0) {
            return Err(Error::InconsistentSign);
        }

        Ok(Self::from_parts(secs, subsec_nanos))
    }

    /// Creates a timestamp from a whole number of seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self::from_parts(secs, 0)
    }

    /// Creates a timestamp from a total number of nanoseconds.
    ///
    /// Returns an error if the number of seconds does not fit in an `i64`.
    pub fn from_total_nanos(nanos: i128) -> Result<Self, OutOfRangeError> {
        // Integer division truncates towards zero so both parts get the same
        // sign.
        let secs = nanos / NANOS_PER_SEC as i128;
        let subsec_nanos = (nanos % NANOS_PER_SEC as i128) as i32;

        i64::try_from(secs)
            .map(|secs| Self::from_parts(secs, subsec_nanos))
            .map_err(|_| OutOfRangeError(()))
    }

    /// Returns the total number of nanoseconds relative to the epoch.
    pub const fn total_nanos(&self) -> i128 {
        self.secs as i128 * NANOS_PER_SEC as i128 + self.nanos as i128
    }

    /// Returns the number of whole seconds relative to the epoch, truncated
    /// towards zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::PosixTime;
    ///
    /// let t = PosixTime::new(-3, -500_000_000).unwrap();
    /// assert_eq!(t.as_secs(), -3);
    /// ```
    pub const fn as_secs(&self) -> i64 {
        self.secs
    }

    /// Returns the sub-second fractional part in nanoseconds, with the sign
    /// of the timestamp.
    pub const fn subsec_nanos(&self) -> i32 {
        self.nanos
    }

    /// Returns `true` if the timestamp lies in the past of the epoch.
    pub const fn is_negative(&self) -> bool {
        self.secs < 0 || self.nanos < 0
    }

    /// Returns the number of whole seconds rounded towards `-∞`.
    pub(crate) const fn floor_secs(&self) -> i64 {
        if self.nanos < 0 {
            self.secs.saturating_sub(1)
        } else {
            self.secs
        }
    }

    fn shifted<E2: Epoch>(self, delta_secs: i64) -> Result<Instant<E2>, OutOfRangeError> {
        // Going through the total number of nanoseconds keeps both parts
        // consistent when the shift changes the sign of the timestamp.
        Instant::from_total_nanos(self.total_nanos() + delta_secs as i128 * NANOS_PER_SEC as i128)
    }

    /// Returns the same point in time referenced to another epoch of the same
    /// time scale.
    ///
    /// Returns an error if the new timestamp is outside the representable
    /// range.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{NtpTime, PosixTime};
    ///
    /// let t = PosixTime::new(1_483_228_800, 5).unwrap();
    /// let ntp: NtpTime = t.to_epoch().unwrap();
    /// assert_eq!(ntp, NtpTime::new(3_692_217_600, 5).unwrap());
    /// ```
    pub fn to_epoch<E2: Epoch<Scale = E::Scale>>(self) -> Result<Instant<E2>, OutOfRangeError> {
        self.shifted(epoch::epoch_delta::<E, E2>(0)?)
    }

    /// Returns the same point in time referenced to any other epoch.
    ///
    /// The argument is the difference between TAI and UTC time in seconds
    /// (a.k.a. leap seconds) applicable at the date represented by the
    /// timestamp, see [`LeapSecondTable::offset_at`]. It is ignored when both
    /// epochs are on the same time scale.
    ///
    /// Returns an error if the new timestamp is outside the representable
    /// range.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{PosixTime, TaiTime};
    ///
    /// // 2000-01-01 00:00:00 UTC, accounting for the +32s difference between
    /// // TAI and UTC on that date.
    /// let t = PosixTime::from_secs(946_684_800);
    /// assert_eq!(t.convert(32), Ok(TaiTime::from_secs(946_684_832)));
    /// ```
    pub fn convert<E2: Epoch>(self, utc_tai_offset: i64) -> Result<Instant<E2>, OutOfRangeError> {
        self.shifted(epoch::epoch_delta::<E, E2>(utc_tai_offset)?)
    }

    /// Adds a number of seconds to a timestamp, checking for overflow.
    pub fn checked_add_secs(self, secs: i64) -> Option<Self> {
        self.shifted(secs).ok()
    }

    /// Adds a duration to a timestamp, checking for overflow.
    ///
    /// Returns `None` if overflow occurred.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use refclock_time::PosixTime;
    ///
    /// let t = PosixTime::new(0, -250_000_000).unwrap();
    /// assert_eq!(
    ///     t.checked_add(Duration::from_millis(500)),
    ///     Some(PosixTime::new(0, 250_000_000).unwrap())
    /// );
    /// assert!(t.checked_add(Duration::MAX).is_none());
    /// ```
    pub fn checked_add(self, rhs: Duration) -> Option<Self> {
        self.total_nanos()
            .checked_add(rhs.as_nanos() as i128)
            .and_then(|nanos| Self::from_total_nanos(nanos).ok())
    }

    /// Subtracts a duration from a timestamp, checking for overflow.
    ///
    /// Returns `None` if overflow occurred.
    pub fn checked_sub(self, rhs: Duration) -> Option<Self> {
        self.total_nanos()
            .checked_sub(rhs.as_nanos() as i128)
            .and_then(|nanos| Self::from_total_nanos(nanos).ok())
    }

    /// Computes the duration elapsed between a timestamp and an earlier
    /// timestamp, checking that the timestamps are appropriately ordered.
    ///
    /// Returns `None` if the argument lies in the future of `self` or if the
    /// duration cannot be represented.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use refclock_time::PosixTime;
    ///
    /// let earlier = PosixTime::new(-1, -500_000_000).unwrap();
    /// let later = PosixTime::new(2, 0).unwrap();
    /// assert_eq!(later.checked_duration_since(earlier), Some(Duration::new(3, 500_000_000)));
    /// assert!(earlier.checked_duration_since(later).is_none());
    /// ```
    pub fn checked_duration_since(self, earlier: Self) -> Option<Duration> {
        let delta = self.total_nanos() - earlier.total_nanos();
        if delta < 0 {
            return None;
        }

        let secs = u64::try_from(delta / NANOS_PER_SEC as i128).ok()?;
        let nanos = (delta % NANOS_PER_SEC as i128) as u32;

        Some(Duration::new(secs, nanos))
    }
}

impl Instant<Posix> {
    /// Creates a timestamp from the system clock.
    ///
    /// Beware that the behavior of the system clock near a leap second
    /// shouldn't be relied upon, where *near* might actually stand for the
    /// whole 24h period preceding a leap second due to the possible use of the
    /// so-called *leap second smearing* strategy.
    #[cfg(feature = "std")]
    pub fn now() -> Result<Self, OutOfRangeError> {
        Self::from_system_time(&std::time::SystemTime::now())
    }

    /// Creates a timestamp from a `SystemTime`, which may lie before the
    /// POSIX epoch.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    /// use refclock_time::PosixTime;
    ///
    /// let system_time = SystemTime::UNIX_EPOCH - Duration::new(1, 5);
    /// assert_eq!(
    ///     PosixTime::from_system_time(&system_time),
    ///     Ok(PosixTime::new(-1, -5).unwrap())
    /// );
    /// ```
    #[cfg(feature = "std")]
    pub fn from_system_time(system_time: &std::time::SystemTime) -> Result<Self, OutOfRangeError> {
        let nanos = match system_time.duration_since(std::time::SystemTime::UNIX_EPOCH) {
            Ok(after) => after.as_nanos() as i128,
            Err(before) => -(before.duration().as_nanos() as i128),
        };

        Self::from_total_nanos(nanos)
    }

    /// Returns a `SystemTime` based on the timestamp.
    ///
    /// Returns an error if the timestamp cannot be represented by the
    /// platform's `SystemTime`.
    #[cfg(feature = "std")]
    pub fn to_system_time(&self) -> Result<std::time::SystemTime, OutOfRangeError> {
        let magnitude = Duration::new(self.secs.unsigned_abs(), self.nanos.unsigned_abs());
        let epoch = std::time::SystemTime::UNIX_EPOCH;

        let system_time = if self.is_negative() {
            epoch.checked_sub(magnitude)
        } else {
            epoch.checked_add(magnitude)
        };

        system_time.ok_or(OutOfRangeError(()))
    }

    /// Creates a timestamp from a `chrono::DateTime`.
    ///
    /// The `chrono` crate expresses a positive leap second by adding one
    /// second to the nanosecond field; such a date-time is mapped to the
    /// first second of the next minute, like its POSIX counterpart.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::PosixTime;
    /// use chrono::DateTime;
    ///
    /// let date_time = DateTime::parse_from_rfc3339("2001-09-15T05:05:00.005Z").unwrap();
    /// assert_eq!(
    ///     PosixTime::from_chrono_date_time(&date_time),
    ///     Ok(PosixTime::new(1_000_530_300, 5_000_000).unwrap())
    /// );
    /// ```
    #[cfg(feature = "chrono")]
    pub fn from_chrono_date_time<Tz: chrono::TimeZone>(
        date_time: &chrono::DateTime<Tz>,
    ) -> Result<Self, OutOfRangeError> {
        let nanos = date_time.timestamp() as i128 * NANOS_PER_SEC as i128
            + date_time.timestamp_subsec_nanos() as i128;

        Self::from_total_nanos(nanos)
    }

    /// Returns a `chrono::DateTime` based on the timestamp.
    ///
    /// Returns an error if the timestamp is outside the range supported by
    /// `chrono`.
    #[cfg(feature = "chrono")]
    pub fn to_chrono_date_time(&self) -> Result<chrono::DateTime<chrono::Utc>, OutOfRangeError> {
        let nanos = self.total_nanos();
        let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SEC as i128))
            .map_err(|_| OutOfRangeError(()))?;
        let subsec_nanos = nanos.rem_euclid(NANOS_PER_SEC as i128) as u32;

        chrono::DateTime::from_timestamp(secs, subsec_nanos).ok_or(OutOfRangeError(()))
    }
}

impl<E: Epoch> Default for Instant<E> {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl<E: Epoch> fmt::Debug for Instant<E> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Instant")
            .field("epoch", &E::NAME)
            .field("secs", &self.secs)
            .field("nanos", &self.nanos)
            .finish()
    }
}

impl<E: Epoch> fmt::Display for Instant<E> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };

        write!(
            fmt,
            "{}{}.{:09}",
            sign,
            self.secs.unsigned_abs(),
            self.nanos.unsigned_abs()
        )
    }
}

#[cfg(feature = "defmt")]
impl<E: Epoch> defmt::Format for Instant<E> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Instant {{ secs: {=i64}, nanos: {=i32} }}",
            self.secs,
            self.nanos
        )
    }
}

impl<E: Epoch> TryFrom<(i64, i32)> for Instant<E> {
    type Error = Error;

    fn try_from((secs, nanos): (i64, i32)) -> Result<Self, Self::Error> {
        Self::new(secs, nanos)
    }
}

impl<E: Epoch> From<Instant<E>> for (i64, i32) {
    fn from(t: Instant<E>) -> Self {
        (t.secs, t.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality() {
        let t0 = TaiTime::new(123, 123_456_789).unwrap();
        let t1 = TaiTime::new(123, 123_456_789).unwrap();
        let t2 = TaiTime::new(123, 123_456_790).unwrap();
        let t3 = TaiTime::new(124, 123_456_789).unwrap();

        assert_eq!(t0, t1);
        assert_ne!(t0, t2);
        assert_ne!(t0, t3);
    }

    #[test]
    fn ordering_across_zero() {
        let ts = [
            PosixTime::new(-2, 0).unwrap(),
            PosixTime::new(-1, -500_000_000).unwrap(),
            PosixTime::new(-1, -200_000_000).unwrap(),
            PosixTime::new(0, -500_000_000).unwrap(),
            PosixTime::EPOCH,
            PosixTime::new(0, 500_000_000).unwrap(),
            PosixTime::new(1, 0).unwrap(),
        ];

        for pair in ts.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].total_nanos() < pair[1].total_nanos());
        }
    }

    #[test]
    fn sign_consistency() {
        assert_eq!(PosixTime::new(5, -1), Err(Error::InconsistentSign));
        assert_eq!(PosixTime::new(-5, 1), Err(Error::InconsistentSign));
        assert!(PosixTime::new(0, 1).is_ok());
        assert!(PosixTime::new(0, -1).is_ok());
        assert_eq!(
            PosixTime::new(0, -1_000_000_000),
            Err(Error::InvalidNanosecond(-1_000_000_000))
        );
    }

    #[test]
    fn total_nanos_round_trip() {
        for nanos in [0, 1, -1, 1_500_000_000, -1_500_000_000, -999_999_999] {
            let t = PosixTime::from_total_nanos(nanos).unwrap();
            assert_eq!(t.total_nanos(), nanos);
            assert!(PosixTime::new(t.as_secs(), t.subsec_nanos()).is_ok());
        }
        assert!(PosixTime::from_total_nanos(PosixTime::MAX.total_nanos() + 1_000_000_000).is_err());
    }

    #[test]
    fn epoch_smoke() {
        // Set all timestamps to 2009-02-13 23:31:30.123456789 UTC.
        const T_POSIX: i64 = 1_234_567_890;
        let posix = PosixTime::new(T_POSIX, 123_456_789).unwrap();
        let ntp = NtpTime::new(3_443_556_690, 123_456_789).unwrap();
        let tai = TaiTime::new(1_234_567_924, 123_456_789).unwrap();
        let tai_1958 = Tai1958Time::new(1_613_259_124, 123_456_789).unwrap();
        let gps = GpsTime::new(918_603_105, 123_456_789).unwrap();

        // TAI - UTC was 34s on that date.
        assert_eq!(posix.to_epoch(), Ok(ntp));
        assert_eq!(posix.convert(34), Ok(tai));
        assert_eq!(posix.convert(34), Ok(tai_1958));
        assert_eq!(posix.convert(34), Ok(gps));
        assert_eq!(gps.convert(34), Ok(posix));
        assert_eq!(gps.to_epoch(), Ok(tai));
        assert_eq!(tai_1958.convert::<Ntp>(34), Ok(ntp));

        let smpte: SmpteTime = gps.to_epoch().unwrap();
        assert_eq!(smpte, tai);
    }

    #[test]
    fn conversion_keeps_fraction() {
        let t = GpsTime::new(1_000, 999_999_999).unwrap();
        let posix: PosixTime = t.convert(37).unwrap();
        assert_eq!(posix.subsec_nanos(), 999_999_999);
    }

    #[test]
    fn conversion_across_sign_change() {
        // 0.25s before the POSIX epoch, expressed on the NTP epoch.
        let ntp = NtpTime::new(2_208_988_799, 750_000_000).unwrap();
        let posix: PosixTime = ntp.to_epoch().unwrap();
        assert_eq!(posix, PosixTime::new(0, -250_000_000).unwrap());
        assert_eq!(posix.to_epoch::<Ntp>(), Ok(ntp));
    }

    #[test]
    fn conversion_overflow() {
        assert!(PosixTime::MAX.to_epoch::<Ntp>().is_err());
        assert!(NtpTime::MIN.to_epoch::<Posix>().is_err());
    }

    #[test]
    fn duration_arithmetic() {
        let t = PosixTime::new(-100, -100_000_000).unwrap();
        let dt = Duration::new(400, 300_000_000);
        assert_eq!(t.checked_add(dt), Some(PosixTime::new(300, 200_000_000).unwrap()));
        assert_eq!(
            PosixTime::new(300, 200_000_000).unwrap().checked_sub(dt),
            Some(t)
        );
        assert!(PosixTime::MAX.checked_add(Duration::new(0, 1)).is_none());
        assert!(PosixTime::MIN.checked_sub(Duration::new(0, 1)).is_none());
        assert_eq!(t.checked_add_secs(100), Some(PosixTime::new(0, -100_000_000).unwrap()));
    }

    #[test]
    fn duration_since_extreme() {
        assert_eq!(
            PosixTime::MAX.checked_duration_since(PosixTime::EPOCH),
            Some(Duration::new(i64::MAX as u64, 999_999_999))
        );
        assert_eq!(
            PosixTime::EPOCH.checked_duration_since(PosixTime::MIN),
            Some(Duration::new(i64::MIN.unsigned_abs(), 999_999_999))
        );
        assert!(PosixTime::MAX.checked_duration_since(PosixTime::MIN).is_none());
    }

    #[test]
    fn display() {
        assert_eq!(PosixTime::new(12, 5).unwrap().to_string(), "12.000000005");
        assert_eq!(PosixTime::new(0, -5).unwrap().to_string(), "-0.000000005");
        assert_eq!(PosixTime::EPOCH.to_string(), "0.000000000");
    }

    #[test]
    fn tuple_conversion() {
        let t = PosixTime::new(-3, -4).unwrap();
        let raw: (i64, i32) = t.into();
        assert_eq!(raw, (-3, -4));
        assert_eq!(PosixTime::try_from(raw), Ok(t));
        assert_eq!(PosixTime::try_from((3, -4)), Err(Error::InconsistentSign));
    }

    #[cfg(feature = "std")]
    #[test]
    fn now_smoke() {
        const START_OF_2022: i64 = 1_640_995_200;
        const START_OF_2100: i64 = 4_102_444_800;

        let now = PosixTime::now().unwrap().as_secs();

        assert!(now > START_OF_2022);
        assert!(now < START_OF_2100);
    }

    #[cfg(feature = "std")]
    #[test]
    fn system_time_round_trip() {
        for t in [
            PosixTime::new(978_352_496, 789_000_000).unwrap(),
            PosixTime::new(-86_400, -1).unwrap(),
        ] {
            let system_time = t.to_system_time().unwrap();
            assert_eq!(PosixTime::from_system_time(&system_time), Ok(t));
        }
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn chrono_round_trip() {
        let date_time = chrono::DateTime::parse_from_rfc3339("1969-12-31T23:59:59.5Z").unwrap();
        let t = PosixTime::from_chrono_date_time(&date_time).unwrap();
        assert_eq!(t, PosixTime::new(0, -500_000_000).unwrap());
        assert_eq!(t.to_chrono_date_time().unwrap(), date_time);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let t = GpsTime::new(-12, -345).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "[-12,-345]");
        assert_eq!(serde_json::from_str::<GpsTime>(&json).unwrap(), t);
        assert!(serde_json::from_str::<GpsTime>("[12,-345]").is_err());
    }
}
