//! Reference epochs and the constant biases between them.
//!
//! An [`Epoch`] marker fixes both the origin of an [`Instant`](crate::Instant)
//! and the time scale it counts on. Two scales are distinguished:
//!
//! - [`Utc`]: POSIX and NTP seconds, which skip leap seconds,
//! - [`Atomic`]: TAI, GPS and SMPTE seconds, which run uniformly.
//!
//! Within a scale, epochs differ by a constant number of seconds. Across
//! scales the current TAI - UTC offset must be supplied, usually from a
//! [`LeapSecondTable`](crate::LeapSecondTable).
//!
//! | Marker      | Epoch                  | Scale    |
//! |-------------|------------------------|----------|
//! | [`Posix`]   | 1970-01-01 00:00:00 UTC | UTC     |
//! | [`Ntp`]     | 1900-01-01 00:00:00 UTC | UTC     |
//! | [`Tai`]     | 1970-01-01 00:00:00 TAI | atomic  |
//! | [`Gps`]     | 1980-01-06 00:00:00 UTC | atomic  |
//! | [`Tai1958`] | 1958-01-01 00:00:00 TAI | atomic  |
//!
//! [`Smpte`] is the SMPTE ST 2059 epoch, which coincides with [`Tai`].

use core::fmt::Debug;
use core::hash::Hash;

use crate::calendar::{days_since_year_0_unchecked, DAYS_TO_POSIX_EPOCH, SECS_PER_DAY};
use crate::OutOfRangeError;

const fn epoch_bias(day: u8, month: u8, year: i32) -> i64 {
    (days_since_year_0_unchecked(day, month, year) - DAYS_TO_POSIX_EPOCH) * SECS_PER_DAY
}

/// Seconds from the POSIX epoch (1970-01-01) to the GPS epoch (1980-01-06),
/// not counting leap seconds.
pub const GPS_EPOCH_BIAS_FROM_POSIX: i64 = epoch_bias(6, 1, 1980);

/// Seconds from the NTP epoch (1900-01-01) to the POSIX epoch (1970-01-01).
///
/// The NTP epoch lies in the past of the POSIX epoch, so `posix = ntp - bias`.
pub const NTP_EPOCH_BIAS_FROM_POSIX: i64 = -epoch_bias(1, 1, 1900);

/// Constant difference TAI - GPS, in seconds.
pub const GPS_TAI_OFFSET: i64 = 19;

/// Seconds from the SMPTE epoch (1970-01-01 00:00:00 TAI) to the GPS epoch.
pub const SMPTE_EPOCH_BIAS_FROM_GPS: i64 = GPS_EPOCH_BIAS_FROM_POSIX + GPS_TAI_OFFSET;

/// Seconds from 1958-01-01 00:00:00 TAI to 1970-01-01 00:00:00 TAI.
///
/// TAI was not formally defined before 1972, so timestamps in the past of
/// 1972 referenced to this epoch are an extrapolation of the current TAI
/// scale rather than physically meaningful TAI values.
pub const TAI_1958_EPOCH_BIAS_FROM_SMPTE: i64 = -epoch_bias(1, 1, 1958);

/// Seconds from 1958-01-01 00:00:00 TAI to the GPS epoch.
pub const SMPTE_1958_EPOCH_BIAS_FROM_GPS: i64 =
    SMPTE_EPOCH_BIAS_FROM_GPS + TAI_1958_EPOCH_BIAS_FROM_SMPTE;

/// Days from the Modified Julian Day epoch (1858-11-17) to the POSIX epoch.
pub const MJD_EPOCH_BIAS_FROM_POSIX_DAYS: i64 =
    DAYS_TO_POSIX_EPOCH - days_since_year_0_unchecked(17, 11, 1858);

/// Returns the GPS - UTC offset for a TAI - UTC offset.
///
/// The result saturates at `i64::MIN`.
///
/// # Examples
///
/// ```
/// use refclock_time::epoch::gps_utc_offset;
///
/// assert_eq!(gps_utc_offset(37), 18);
/// ```
pub const fn gps_utc_offset(utc_tai_offset: i64) -> i64 {
    utc_tai_offset.saturating_sub(GPS_TAI_OFFSET)
}

/// Returns the Modified Julian Day of a number of days since the POSIX epoch.
pub const fn posix_days_to_mjd(days: i64) -> i64 {
    days + MJD_EPOCH_BIAS_FROM_POSIX_DAYS
}

/// Returns the number of days since the POSIX epoch of a Modified Julian Day.
pub const fn mjd_to_posix_days(mjd: i64) -> i64 {
    mjd - MJD_EPOCH_BIAS_FROM_POSIX_DAYS
}

mod sealed {
    pub trait Sealed {}
}

/// A time scale, i.e. the way seconds are counted.
///
/// This trait is sealed: the only scales are [`Utc`] and [`Atomic`].
pub trait TimeScale: sealed::Sealed + Copy + Debug + Default + Eq + Ord + Hash {
    /// Human-readable name of the scale.
    const NAME: &'static str;

    /// Weight of the TAI - UTC offset when moving from this scale to TAI.
    #[doc(hidden)]
    const UTC_TAI_WEIGHT: i64;
}

/// The UTC time scale, which skips leap seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Utc;

impl sealed::Sealed for Utc {}

impl TimeScale for Utc {
    const NAME: &'static str = "UTC";
    const UTC_TAI_WEIGHT: i64 = 1;
}

/// A uniform atomic time scale (TAI, or GPS which is offset by a constant
/// from TAI).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atomic;

impl sealed::Sealed for Atomic {}

impl TimeScale for Atomic {
    const NAME: &'static str = "TAI";
    const UTC_TAI_WEIGHT: i64 = 0;
}

/// The reference epoch of an [`Instant`](crate::Instant).
///
/// Custom epochs may be defined by implementing this trait on a zero-sized
/// type.
///
/// # Examples
///
/// ```
/// use refclock_time::epoch::{Atomic, Epoch};
/// use refclock_time::{Instant, TaiTime};
///
/// // Galileo System Time, 1999-08-22 00:00:19 TAI.
/// #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// struct Gst;
///
/// impl Epoch for Gst {
///     type Scale = Atomic;
///     const EPOCH_REF: i64 = 935_280_019;
///     const NAME: &'static str = "GST";
/// }
///
/// let t = TaiTime::from_secs(935_280_019);
/// assert_eq!(t.to_epoch::<Gst>(), Ok(Instant::<Gst>::EPOCH));
/// ```
pub trait Epoch: Copy + Debug + Default + Eq + Ord + Hash {
    /// The scale on which seconds are counted.
    type Scale: TimeScale;

    /// The signed distance in seconds of this epoch from 1970-01-01 00:00:00
    /// counted on [`Self::Scale`].
    const EPOCH_REF: i64;

    /// Human-readable name of the epoch.
    const NAME: &'static str;
}

/// POSIX epoch, 1970-01-01 00:00:00 UTC.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Posix;

impl Epoch for Posix {
    type Scale = Utc;
    const EPOCH_REF: i64 = 0;
    const NAME: &'static str = "POSIX";
}

/// NTP epoch, 1900-01-01 00:00:00 UTC.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ntp;

impl Epoch for Ntp {
    type Scale = Utc;
    const EPOCH_REF: i64 = -NTP_EPOCH_BIAS_FROM_POSIX;
    const NAME: &'static str = "NTP";
}

/// TAI epoch as used by PTP and SMPTE ST 2059, 1970-01-01 00:00:00 TAI.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tai;

impl Epoch for Tai {
    type Scale = Atomic;
    const EPOCH_REF: i64 = 0;
    const NAME: &'static str = "TAI";
}

/// SMPTE ST 2059 epoch.
pub type Smpte = Tai;

/// GPS epoch, 1980-01-06 00:00:00 UTC (1980-01-06 00:00:19 TAI).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gps;

impl Epoch for Gps {
    type Scale = Atomic;
    const EPOCH_REF: i64 = SMPTE_EPOCH_BIAS_FROM_GPS;
    const NAME: &'static str = "GPS";
}

/// 1958-01-01 00:00:00 TAI.
///
/// See [`TAI_1958_EPOCH_BIAS_FROM_SMPTE`] regarding dates before 1972.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tai1958;

impl Epoch for Tai1958 {
    type Scale = Atomic;
    const EPOCH_REF: i64 = -TAI_1958_EPOCH_BIAS_FROM_SMPTE;
    const NAME: &'static str = "TAI1958";
}

/// Returns the number of seconds to add to a timestamp referenced to `E1` to
/// obtain the same point in time referenced to `E2`.
///
/// The TAI - UTC offset is only used when the two epochs are on different
/// scales.
pub fn epoch_delta<E1: Epoch, E2: Epoch>(utc_tai_offset: i64) -> Result<i64, OutOfRangeError> {
    let scale_delta = (<E1::Scale as TimeScale>::UTC_TAI_WEIGHT
        - <E2::Scale as TimeScale>::UTC_TAI_WEIGHT) as i128
        * utc_tai_offset as i128;
    let delta = E1::EPOCH_REF as i128 - E2::EPOCH_REF as i128 + scale_delta;

    i64::try_from(delta).map_err(|_| OutOfRangeError(()))
}

/// Converts a number of whole seconds from epoch `E1` to epoch `E2`.
///
/// # Examples
///
/// ```
/// use refclock_time::epoch::{convert_secs, Gps, Ntp, Posix};
///
/// // 2017-01-01 00:00:00 UTC, TAI - UTC = 37s.
/// assert_eq!(convert_secs::<Posix, Ntp>(1_483_228_800, 0), Ok(3_692_217_600));
/// assert_eq!(convert_secs::<Posix, Gps>(1_483_228_800, 37), Ok(1_167_264_018));
/// ```
pub fn convert_secs<E1: Epoch, E2: Epoch>(
    secs: i64,
    utc_tai_offset: i64,
) -> Result<i64, OutOfRangeError> {
    secs.checked_add(epoch_delta::<E1, E2>(utc_tai_offset)?)
        .ok_or(OutOfRangeError(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biases() {
        assert_eq!(GPS_EPOCH_BIAS_FROM_POSIX, 315_964_800);
        assert_eq!(NTP_EPOCH_BIAS_FROM_POSIX, 2_208_988_800);
        assert_eq!(SMPTE_EPOCH_BIAS_FROM_GPS, 315_964_819);
        assert_eq!(TAI_1958_EPOCH_BIAS_FROM_SMPTE, 378_691_200);
        assert_eq!(SMPTE_1958_EPOCH_BIAS_FROM_GPS, 694_656_019);
        assert_eq!(MJD_EPOCH_BIAS_FROM_POSIX_DAYS, 40_587);
    }

    #[test]
    fn mjd() {
        // 2017-01-01 is MJD 57754.
        assert_eq!(posix_days_to_mjd(17_167), 57_754);
        assert_eq!(mjd_to_posix_days(57_754), 17_167);
    }

    #[test]
    fn same_scale_ignores_offset() {
        assert_eq!(convert_secs::<Posix, Ntp>(0, 37), Ok(2_208_988_800));
        assert_eq!(convert_secs::<Ntp, Posix>(2_208_988_800, 0), Ok(0));
        assert_eq!(convert_secs::<Gps, Tai>(0, 12_345), Ok(315_964_819));
        assert_eq!(convert_secs::<Tai, Tai1958>(0, 0), Ok(378_691_200));
    }

    #[test]
    fn cross_scale() {
        // 2009-02-13 23:31:30 UTC, TAI - UTC = 34s.
        const T_POSIX: i64 = 1_234_567_890;
        assert_eq!(convert_secs::<Posix, Tai>(T_POSIX, 34), Ok(1_234_567_924));
        assert_eq!(convert_secs::<Posix, Gps>(T_POSIX, 34), Ok(918_603_105));
        assert_eq!(convert_secs::<Posix, Tai1958>(T_POSIX, 34), Ok(1_613_259_124));
        assert_eq!(convert_secs::<Gps, Posix>(918_603_105, 34), Ok(T_POSIX));
        assert_eq!(convert_secs::<Gps, Ntp>(918_603_105, 34), Ok(T_POSIX + 2_208_988_800));
    }

    #[test]
    fn overflow() {
        assert!(convert_secs::<Posix, Ntp>(i64::MAX, 0).is_err());
        assert!(convert_secs::<Ntp, Posix>(i64::MIN, 0).is_err());
        assert!(epoch_delta::<Posix, Tai>(i64::MIN).is_ok());
        assert!(epoch_delta::<Ntp, Tai>(i64::MIN).is_err());
    }
}
