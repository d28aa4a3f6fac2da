//! Leap second table and leap second announcements.
//!
//! A [`LeapSecondTable`] is a borrowed, strictly ascending sequence of
//! [`LeapSecondEntry`] values, each recording the UTC instant at which a new
//! TAI - UTC offset took effect. The instant of an entry is the *end* of the
//! leap second, e.g. 2017-01-01 00:00:00 UTC rather than 2016-12-31 23:59:60
//! UTC, so the new offset applies from that instant onwards.
//!
//! The table is immutable. A refreshed table must be built separately and
//! swapped in as a whole, see `leap_file::SharedLeapSeconds` when the `std`
//! feature is enabled.

use core::fmt;

use tracing::debug;

use crate::epoch::{self, GPS_TAI_OFFSET};
use crate::{Error, GpsTime, LeapTableError, OutOfRangeError, PosixTime, TaiTime};

/// A leap second event: the UTC instant at which a new TAI - UTC offset took
/// effect.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LeapSecondEntry {
    instant: PosixTime,
    utc_tai_offset_after: i32,
}

impl LeapSecondEntry {
    /// Creates an entry from the instant following the leap second and the
    /// TAI - UTC offset that applies from that instant.
    pub const fn new(instant: PosixTime, utc_tai_offset_after: i32) -> Self {
        Self {
            instant,
            utc_tai_offset_after,
        }
    }

    const fn from_secs(secs: i64, utc_tai_offset_after: i32) -> Self {
        Self::new(PosixTime::from_secs(secs), utc_tai_offset_after)
    }

    /// Returns the UTC instant from which the new offset applies.
    pub const fn instant(&self) -> PosixTime {
        self.instant
    }

    /// Returns the TAI - UTC offset in seconds applicable from the entry's
    /// instant.
    pub const fn utc_tai_offset_after(&self) -> i32 {
        self.utc_tai_offset_after
    }

    /// Returns the entry's instant on the TAI time scale.
    pub fn instant_tai(&self) -> Result<TaiTime, OutOfRangeError> {
        self.instant.convert(self.utc_tai_offset_after as i64)
    }
}

const BUILTIN_ENTRIES: [LeapSecondEntry; 28] = [
    LeapSecondEntry::from_secs(63_072_000, 10),    // 1972-01-01
    LeapSecondEntry::from_secs(78_796_800, 11),    // 1972-07-01
    LeapSecondEntry::from_secs(94_694_400, 12),    // 1973-01-01
    LeapSecondEntry::from_secs(126_230_400, 13),   // 1974-01-01
    LeapSecondEntry::from_secs(157_766_400, 14),   // 1975-01-01
    LeapSecondEntry::from_secs(189_302_400, 15),   // 1976-01-01
    LeapSecondEntry::from_secs(220_924_800, 16),   // 1977-01-01
    LeapSecondEntry::from_secs(252_460_800, 17),   // 1978-01-01
    LeapSecondEntry::from_secs(283_996_800, 18),   // 1979-01-01
    LeapSecondEntry::from_secs(315_532_800, 19),   // 1980-01-01
    LeapSecondEntry::from_secs(362_793_600, 20),   // 1981-07-01
    LeapSecondEntry::from_secs(394_329_600, 21),   // 1982-07-01
    LeapSecondEntry::from_secs(425_865_600, 22),   // 1983-07-01
    LeapSecondEntry::from_secs(489_024_000, 23),   // 1985-07-01
    LeapSecondEntry::from_secs(567_993_600, 24),   // 1988-01-01
    LeapSecondEntry::from_secs(631_152_000, 25),   // 1990-01-01
    LeapSecondEntry::from_secs(662_688_000, 26),   // 1991-01-01
    LeapSecondEntry::from_secs(709_948_800, 27),   // 1992-07-01
    LeapSecondEntry::from_secs(741_484_800, 28),   // 1993-07-01
    LeapSecondEntry::from_secs(773_020_800, 29),   // 1994-07-01
    LeapSecondEntry::from_secs(820_454_400, 30),   // 1996-01-01
    LeapSecondEntry::from_secs(867_715_200, 31),   // 1997-07-01
    LeapSecondEntry::from_secs(915_148_800, 32),   // 1999-01-01
    LeapSecondEntry::from_secs(1_136_073_600, 33), // 2006-01-01
    LeapSecondEntry::from_secs(1_230_768_000, 34), // 2009-01-01
    LeapSecondEntry::from_secs(1_341_100_800, 35), // 2012-07-01
    LeapSecondEntry::from_secs(1_435_708_800, 36), // 2015-07-01
    LeapSecondEntry::from_secs(1_483_228_800, 37), // 2017-01-01
];

/// An immutable, strictly ascending table of leap second events.
///
/// The table is never empty, so its last entry always defines the current
/// TAI - UTC offset.
///
/// # Examples
///
/// ```
/// use refclock_time::{LeapSecondTable, PosixTime};
///
/// let table = LeapSecondTable::builtin();
///
/// assert_eq!(table.current_offset(), 37);
/// assert_eq!(table.offset_at(&PosixTime::from_secs(1_483_228_800)), Some(37));
/// assert_eq!(table.offset_at(&PosixTime::from_secs(1_483_228_799)), Some(36));
/// assert_eq!(table.offset_at(&PosixTime::EPOCH), None);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeapSecondTable<'a> {
    entries: &'a [LeapSecondEntry],
}

impl<'a> LeapSecondTable<'a> {
    /// The compiled-in table, from 1972-01-01 (TAI - UTC = 10s) to 2017-01-01
    /// (TAI - UTC = 37s).
    pub const BUILTIN: LeapSecondTable<'static> = LeapSecondTable {
        entries: &BUILTIN_ENTRIES,
    };

    /// Validates and wraps a sequence of leap second entries.
    ///
    /// Returns an error if the sequence is empty, if an entry does not fall
    /// on a whole second or if the entries are not strictly ascending in time.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{LeapSecondEntry, LeapSecondTable, LeapTableError, PosixTime};
    ///
    /// let entries = [
    ///     LeapSecondEntry::new(PosixTime::from_secs(1_435_708_800), 36),
    ///     LeapSecondEntry::new(PosixTime::from_secs(1_341_100_800), 35),
    /// ];
    ///
    /// assert_eq!(LeapSecondTable::new(&entries), Err(LeapTableError::NotAscending(1)));
    /// assert!(LeapSecondTable::new(&entries[..1]).is_ok());
    /// ```
    pub fn new(entries: &'a [LeapSecondEntry]) -> Result<Self, LeapTableError> {
        if entries.is_empty() {
            return Err(LeapTableError::Empty);
        }
        for (idx, entry) in entries.iter().enumerate() {
            if entry.instant.subsec_nanos() != 0 {
                return Err(LeapTableError::FractionalInstant(idx));
            }
            if idx > 0 && entry.instant <= entries[idx - 1].instant {
                return Err(LeapTableError::NotAscending(idx));
            }
        }

        let table = Self { entries };
        debug!(
            entries = entries.len(),
            current_offset = table.current_offset(),
            "leap second table built"
        );

        Ok(table)
    }

    /// Wraps entries that are known to satisfy the invariants checked by
    /// [`new`](Self::new).
    #[cfg(feature = "std")]
    pub(crate) const fn from_validated(entries: &'a [LeapSecondEntry]) -> Self {
        Self { entries }
    }

    /// Returns the compiled-in table.
    pub const fn builtin() -> LeapSecondTable<'static> {
        LeapSecondTable::BUILTIN
    }

    /// Returns the entries of the table in ascending order.
    pub const fn entries(&self) -> &'a [LeapSecondEntry] {
        self.entries
    }

    /// Returns an iterator over the entries in ascending order.
    pub fn iter(&self) -> core::slice::Iter<'a, LeapSecondEntry> {
        self.entries.iter()
    }

    /// Returns the number of entries, which is never zero.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always returns `false`; provided for consistency with `len`.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the most recent entry.
    pub fn last(&self) -> &'a LeapSecondEntry {
        // A table is never empty.
        &self.entries[self.entries.len() - 1]
    }

    /// Returns the TAI - UTC offset defined by the most recent entry.
    pub fn current_offset(&self) -> i32 {
        self.last().utc_tai_offset_after
    }

    /// Returns the index of the latest entry whose instant is not after `t`.
    fn entry_index_at(&self, t: &PosixTime) -> Option<usize> {
        self.entries
            .partition_point(|entry| entry.instant <= *t)
            .checked_sub(1)
    }

    /// Returns the TAI - UTC offset applicable at the UTC instant `t`.
    ///
    /// When `t` coincides with an entry, the new offset applies. Returns `None`
    /// if `t` precedes the first entry.
    pub fn offset_at(&self, t: &PosixTime) -> Option<i32> {
        self.entry_index_at(t)
            .map(|idx| self.entries[idx].utc_tai_offset_after)
    }

    /// Returns the GPS - UTC offset applicable at the UTC instant `t`.
    ///
    /// Returns `None` if `t` precedes the first entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{LeapSecondTable, PosixTime};
    ///
    /// let table = LeapSecondTable::builtin();
    /// assert_eq!(table.gps_utc_offset_at(&PosixTime::from_secs(1_483_228_800)), Some(18));
    /// ```
    pub fn gps_utc_offset_at(&self, t: &PosixTime) -> Option<i32> {
        self.offset_at(t)
            .map(|offset| epoch::gps_utc_offset(offset as i64) as i32)
    }

    /// Converts a UTC instant to TAI using the offset applicable at that
    /// instant.
    ///
    /// Returns an error if `t` precedes the first entry or if the result is
    /// out of range.
    pub fn utc_to_tai(&self, t: &PosixTime) -> Result<TaiTime, Error> {
        let offset = self.offset_at(t).ok_or(Error::OutOfRange)?;

        Ok(t.convert(offset as i64)?)
    }

    /// Converts a UTC instant to GPS time using the offset applicable at that
    /// instant.
    ///
    /// Returns an error if `t` precedes the first entry or if the result is
    /// out of range.
    pub fn utc_to_gps(&self, t: &PosixTime) -> Result<GpsTime, Error> {
        let offset = self.offset_at(t).ok_or(Error::OutOfRange)?;

        Ok(t.convert(offset as i64)?)
    }

    /// Returns the TAI - UTC offset applicable at the TAI instant `t`.
    ///
    /// A TAI instant that falls within an inserted leap second is given the
    /// offset that precedes the leap second.
    fn offset_at_tai(&self, t: &TaiTime) -> Option<i32> {
        let idx = self
            .entries
            .partition_point(|entry| {
                let secs = entry.instant.as_secs();
                TaiTime::from_secs(secs.saturating_add(entry.utc_tai_offset_after as i64)) <= *t
            })
            .checked_sub(1)?;

        Some(self.entries[idx].utc_tai_offset_after)
    }

    /// Converts a TAI instant to UTC using the offset applicable at that
    /// instant.
    ///
    /// An inserted leap second has no UTC counterpart on the POSIX time scale
    /// and is mapped onto the following second, as POSIX clocks do.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{LeapSecondTable, PosixTime, TaiTime};
    ///
    /// let table = LeapSecondTable::builtin();
    ///
    /// // 2016-12-31 23:59:60 UTC.
    /// let leap = TaiTime::from_secs(1_483_228_800 + 36);
    /// assert_eq!(table.tai_to_utc(&leap), Ok(PosixTime::from_secs(1_483_228_800)));
    /// ```
    pub fn tai_to_utc(&self, t: &TaiTime) -> Result<PosixTime, Error> {
        let offset = self.offset_at_tai(t).ok_or(Error::OutOfRange)?;

        Ok(t.convert(offset as i64)?)
    }

    /// Converts a GPS instant to UTC, with the same conventions as
    /// [`tai_to_utc`](Self::tai_to_utc).
    pub fn gps_to_utc(&self, t: &GpsTime) -> Result<PosixTime, Error> {
        self.tai_to_utc(&t.to_epoch()?)
    }
}

impl Default for LeapSecondTable<'static> {
    fn default() -> Self {
        Self::BUILTIN
    }
}

impl<'a> IntoIterator for &LeapSecondTable<'a> {
    type Item = &'a LeapSecondEntry;
    type IntoIter = core::slice::Iter<'a, LeapSecondEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The calendar dates at which a leap second may be scheduled.
///
/// Leap seconds have so far always been applied at the end of December or
/// June, so only January 1st and July 1st are accepted by default. The
/// `Quarterly` policy also accepts April 1st and October 1st, which are
/// permitted by the ITU-R but have never been used. Enabling it weakens the
/// uniqueness of GPS week resolution, see [`gps_week::resolve`].
///
/// [`gps_week::resolve`]: crate::gps_week::resolve
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LeapDatePolicy {
    /// January 1st and July 1st only.
    #[default]
    JanuaryJuly,
    /// January 1st, April 1st, July 1st and October 1st.
    Quarterly,
}

impl LeapDatePolicy {
    /// Returns `true` if a leap second may take effect at the start of the
    /// given day of the month.
    pub const fn accepts(self, day: u8, month: u8) -> bool {
        if day != 1 {
            return false;
        }

        match self {
            Self::JanuaryJuly => matches!(month, 1 | 7),
            Self::Quarterly => matches!(month, 1 | 4 | 7 | 10),
        }
    }
}

/// Returns `true` if a leap second may take effect at the start of the given
/// day of the month under the default [`LeapDatePolicy`].
///
/// # Examples
///
/// ```
/// use refclock_time::leap::is_valid_leap_second_date;
///
/// assert!(is_valid_leap_second_date(1, 1));
/// assert!(is_valid_leap_second_date(1, 7));
/// assert!(!is_valid_leap_second_date(15, 6));
/// assert!(!is_valid_leap_second_date(1, 4));
/// ```
pub const fn is_valid_leap_second_date(day: u8, month: u8) -> bool {
    LeapDatePolicy::JanuaryJuly.accepts(day, month)
}

/// The direction of a leap second.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LeapStep {
    /// A second is removed from UTC.
    Negative,
    /// The offset is unchanged.
    #[default]
    None,
    /// A second is inserted into UTC.
    Positive,
}

impl LeapStep {
    /// Returns the step corresponding to a change of TAI - UTC offset.
    ///
    /// Returns an error if the offset changes by more than one second.
    pub const fn from_delta(delta: i32) -> Result<Self, Error> {
        match delta {
            -1 => Ok(Self::Negative),
            0 => Ok(Self::None),
            1 => Ok(Self::Positive),
            _ => Err(Error::InvalidLeapStep(delta)),
        }
    }

    /// Returns the change of TAI - UTC offset in seconds.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Negative => -1,
            Self::None => 0,
            Self::Positive => 1,
        }
    }
}

impl fmt::Display for LeapStep {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{:+}", self.as_i32())
    }
}

/// An announced leap second that may not have taken effect yet.
///
/// A record with `valid == false` carries no usable instant; its offsets are
/// those announced by the time source, if any.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingLeapSecond {
    /// The UTC instant at which the new offset applies.
    pub instant_utc: PosixTime,
    /// The same instant on the TAI time scale.
    pub instant_tai: TaiTime,
    /// The direction of the leap second.
    pub step: LeapStep,
    /// The GPS - UTC offset applicable from `instant_utc`.
    pub offset_gps_utc: i32,
    /// The TAI - UTC offset applicable from `instant_utc`.
    pub offset_tai_utc: i32,
    /// Whether the record was built from a resolved announcement.
    pub valid: bool,
}

impl PendingLeapSecond {
    /// Creates a valid record from the UTC instant following the leap second,
    /// its direction and the TAI - UTC offset applicable from that instant.
    ///
    /// # Examples
    ///
    /// ```
    /// use refclock_time::{LeapStep, PendingLeapSecond, PosixTime, TaiTime};
    ///
    /// let instant = PosixTime::from_secs(1_483_228_800);
    /// let pending = PendingLeapSecond::new(instant, LeapStep::Positive, 37).unwrap();
    ///
    /// assert_eq!(pending.instant_tai, TaiTime::from_secs(1_483_228_837));
    /// assert_eq!(pending.offset_gps_utc, 18);
    /// assert_eq!(pending.offset_at(&PosixTime::from_secs(1_483_228_799)), 36);
    /// ```
    pub fn new(
        instant_utc: PosixTime,
        step: LeapStep,
        offset_tai_utc: i32,
    ) -> Result<Self, OutOfRangeError> {
        let offset_gps_utc = offset_tai_utc
            .checked_sub(GPS_TAI_OFFSET as i32)
            .ok_or(OutOfRangeError(()))?;

        Ok(Self {
            instant_utc,
            instant_tai: instant_utc.convert(offset_tai_utc as i64)?,
            step,
            offset_gps_utc,
            offset_tai_utc,
            valid: true,
        })
    }

    /// Creates a record describing the most recent entry of a table.
    pub fn from_table(table: &LeapSecondTable<'_>) -> Result<Self, Error> {
        let entries = table.entries();
        let last = table.last();
        let step = match entries.len() {
            1 => LeapStep::None,
            len => {
                let delta = last
                    .utc_tai_offset_after
                    .checked_sub(entries[len - 2].utc_tai_offset_after)
                    .ok_or(Error::OutOfRange)?;
                LeapStep::from_delta(delta)?
            }
        };

        Ok(Self::new(last.instant, step, last.utc_tai_offset_after)?)
    }

    /// Returns the TAI - UTC offset applicable at the UTC instant `t`
    /// according to this record.
    ///
    /// The offset before the leap second saturates at the bounds of `i32`.
    pub fn offset_at(&self, t: &PosixTime) -> i32 {
        if *t >= self.instant_utc {
            self.offset_tai_utc
        } else {
            self.offset_tai_utc.saturating_sub(self.step.as_i32())
        }
    }

    /// Returns `true` if the record is valid and has not taken effect at the
    /// UTC instant `now`.
    pub fn is_pending(&self, now: &PosixTime) -> bool {
        self.valid && *now < self.instant_utc
    }
}
