//! Error types.

use core::fmt;

/// The error type returned when the result of a conversion to or from an
/// [`Instant`](crate::Instant) is outside the representable range, or the
/// conversion would cause the result to overflow.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError(pub(crate) ());

impl fmt::Display for OutOfRangeError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        "timestamp out of representable range".fmt(fmt)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OutOfRangeError {}

/// The error type returned when calendar components are out of range.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DateError {
    /// The year is negative or too large to be processed.
    InvalidYear(i64),
    /// The month is not between 1 and 12.
    InvalidMonth(u8),
    /// The day of the month is less than 1, or more than the maximum value for
    /// this combination of year and month.
    InvalidDayOfMonth(u8),
    /// The hour field value is not between 0 and 23.
    InvalidHour(u8),
    /// The minute field value is not between 0 and 59.
    InvalidMinute(u8),
    /// The second field value is not between 0 and 60.
    InvalidSecond(u8),
}

impl fmt::Display for DateError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidYear(year) => write!(fmt, "year '{}' is not supported", year),
            Self::InvalidMonth(month) => write!(fmt, "month numeral '{}' is not valid", month),
            Self::InvalidDayOfMonth(day) => {
                write!(fmt, "day of month '{}' is not valid for this date", day)
            }
            Self::InvalidHour(hour) => write!(fmt, "hour numeral '{}' is not valid", hour),
            Self::InvalidMinute(min) => write!(fmt, "minute numeral '{}' is not valid", min),
            Self::InvalidSecond(sec) => write!(fmt, "second numeral '{}' is not valid", sec),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DateError {}

/// The error type returned when a date-time string is malformed or one of its
/// fields is out of range.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseDateError {
    /// A field value is not a decimal number.
    InvalidFieldValue,
    /// The width of a fixed-width or minimum-width field is invalid.
    InvalidFieldWidth,
    /// A field is missing.
    MissingField,
    /// One of the field values is out of its expected range.
    RangeError(DateError),
}

impl fmt::Display for ParseDateError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFieldValue => "one of the fields is invalid".fmt(fmt),
            Self::InvalidFieldWidth => "the width of one of the fields is invalid".fmt(fmt),
            Self::MissingField => "a field is missing".fmt(fmt),
            Self::RangeError(err) => err.fmt(fmt),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseDateError {}

/// The error type returned when a decimal fraction cannot be encoded as a
/// binary fraction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FractionError {
    /// The decimal value does not fit in the binary fraction width at the
    /// requested scale, i.e. it is not strictly less than one second.
    Overflow,
    /// The decimal scale is zero.
    InvalidScale,
}

impl fmt::Display for FractionError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => "decimal fraction too large for the binary fraction width".fmt(fmt),
            Self::InvalidScale => "decimal fraction scale must not be zero".fmt(fmt),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FractionError {}

/// The error type returned when a leap second table is malformed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LeapTableError {
    /// The table contains no entries.
    Empty,
    /// The entry at this index is not strictly later than its predecessor.
    NotAscending(usize),
    /// The entry at this index does not fall on a whole second.
    FractionalInstant(usize),
}

impl fmt::Display for LeapTableError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => "leap second table is empty".fmt(fmt),
            Self::NotAscending(idx) => {
                write!(fmt, "leap second entry {} is not in ascending order", idx)
            }
            Self::FractionalInstant(idx) => {
                write!(fmt, "leap second entry {} does not fall on a whole second", idx)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LeapTableError {}

/// The error type reported by the operations of this crate.
///
/// Operations with a narrower failure domain return the specific error type
/// (e.g. [`DateError`]), which converts into this type with `?`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A calendar component is out of range.
    InvalidDate(DateError),
    /// More than one extended GPS week number matches a truncated week number.
    AmbiguousWeekNumber {
        /// The earliest matching week.
        first: u32,
        /// The second matching week.
        second: u32,
    },
    /// No extended GPS week number matches a truncated week number.
    WeekNumberNotFound,
    /// A decimal fraction cannot be represented as a binary fraction.
    FractionOverflow(FractionError),
    /// The seconds and nanoseconds of a timestamp have opposite signs.
    InconsistentSign,
    /// The magnitude of the nanosecond field is one second or more.
    InvalidNanosecond(i32),
    /// A GPS day number is not between 0 and 7.
    InvalidDayOfWeek(u8),
    /// A leap second step is other than -1, 0 or +1.
    InvalidLeapStep(i32),
    /// A leap second table is malformed.
    InvalidLeapTable(LeapTableError),
    /// A result is outside the representable range.
    OutOfRange,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDate(err) => err.fmt(fmt),
            Self::AmbiguousWeekNumber { first, second } => write!(
                fmt,
                "truncated week number is ambiguous (weeks {} and {} both match)",
                first, second
            ),
            Self::WeekNumberNotFound => "no week number matches the truncated week".fmt(fmt),
            Self::FractionOverflow(err) => err.fmt(fmt),
            Self::InconsistentSign => "seconds and nanoseconds have opposite signs".fmt(fmt),
            Self::InvalidNanosecond(nanos) => {
                write!(fmt, "nanosecond value '{}' is not valid", nanos)
            }
            Self::InvalidDayOfWeek(day) => write!(fmt, "day number '{}' is not valid", day),
            Self::InvalidLeapStep(step) => write!(fmt, "leap second step '{}' is not valid", step),
            Self::InvalidLeapTable(err) => err.fmt(fmt),
            Self::OutOfRange => "timestamp outside representable range".fmt(fmt),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidDate(err) => Some(err),
            Self::FractionOverflow(err) => Some(err),
            Self::InvalidLeapTable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OutOfRangeError> for Error {
    fn from(_: OutOfRangeError) -> Self {
        Self::OutOfRange
    }
}

impl From<DateError> for Error {
    fn from(err: DateError) -> Self {
        Self::InvalidDate(err)
    }
}

impl From<FractionError> for Error {
    fn from(err: FractionError) -> Self {
        Self::FractionOverflow(err)
    }
}

impl From<LeapTableError> for Error {
    fn from(err: LeapTableError) -> Self {
        Self::InvalidLeapTable(err)
    }
}
