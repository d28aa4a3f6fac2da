//! Fixed-point binary fractions of a second.
//!
//! Timing hardware commonly reports the sub-second part of a timestamp as an
//! unsigned binary fraction, in units of 1/2¹⁶ or 1/2³² second. The functions
//! of this module convert such fractions to and from decimal fractions at a
//! chosen scale (milliseconds, microseconds or nanoseconds).
//!
//! Decoding truncates towards zero while encoding rounds to the nearest binary
//! value, with ties rounded up. Conversions are therefore lossy: a value that
//! is decoded and re-encoded may differ from the original by up to the
//! granularity of the decimal scale.
//!
//! # Examples
//!
//! ```
//! use refclock_time::fraction::{self, BinFrac32};
//!
//! assert_eq!(fraction::dec_to_bin32(500, fraction::MILLIS), Ok(0x8000_0000));
//! assert_eq!(fraction::bin32_to_dec(0xFFFF_FFFF, fraction::MILLIS), 999);
//!
//! let frac = BinFrac32::from_nanos(250_000_000).unwrap();
//! assert_eq!(frac.to_nanos(), 250_000_000);
//! ```

use core::time::Duration;

use crate::FractionError;

/// Decimal scale for milliseconds.
pub const MILLIS: u32 = 1_000;

/// Decimal scale for microseconds.
pub const MICROS: u32 = 1_000_000;

/// Decimal scale for nanoseconds.
pub const NANOS: u32 = 1_000_000_000;

/// Converts a 16-bit binary fraction to a decimal fraction at the given scale,
/// truncating towards zero.
///
/// A zero scale yields zero.
///
/// # Examples
///
/// ```
/// use refclock_time::fraction::{bin16_to_dec, MICROS};
///
/// assert_eq!(bin16_to_dec(0x4000, MICROS), 250_000);
/// ```
pub const fn bin16_to_dec(bin: u16, scale: u32) -> u32 {
    ((bin as u64 * scale as u64) >> 16) as u32
}

/// Converts a 32-bit binary fraction to a decimal fraction at the given scale,
/// truncating towards zero.
///
/// A zero scale yields zero.
pub const fn bin32_to_dec(bin: u32, scale: u32) -> u32 {
    ((bin as u64 * scale as u64) >> 32) as u32
}

/// Converts a decimal fraction at the given scale to the nearest 16-bit binary
/// fraction, rounding ties up.
///
/// Returns an error if the scale is zero or if the rounded value is one second
/// or more.
///
/// # Examples
///
/// ```
/// use refclock_time::fraction::{dec_to_bin16, NANOS};
/// use refclock_time::FractionError;
///
/// assert_eq!(dec_to_bin16(500_000_000, NANOS), Ok(0x8000));
/// assert_eq!(dec_to_bin16(999_999_999, NANOS), Err(FractionError::Overflow));
/// ```
pub fn dec_to_bin16(dec: u32, scale: u32) -> Result<u16, FractionError> {
    if scale == 0 {
        return Err(FractionError::InvalidScale);
    }
    let twice = ((dec as u64) << 17) / scale as u64;

    u16::try_from((twice + 1) / 2).map_err(|_| FractionError::Overflow)
}

/// Converts a decimal fraction at the given scale to the nearest 32-bit binary
/// fraction, rounding ties up.
///
/// Returns an error if the scale is zero or if the rounded value is one second
/// or more.
pub fn dec_to_bin32(dec: u64, scale: u32) -> Result<u32, FractionError> {
    if scale == 0 {
        return Err(FractionError::InvalidScale);
    }
    let twice = ((dec as u128) << 33) / scale as u128;

    u32::try_from((twice + 1) / 2).map_err(|_| FractionError::Overflow)
}

/// A fraction of one second in units of 1/2¹⁶ second.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BinFrac16(pub u16);

impl BinFrac16 {
    /// Encodes a decimal fraction at the given scale.
    pub fn from_dec(dec: u32, scale: u32) -> Result<Self, FractionError> {
        dec_to_bin16(dec, scale).map(Self)
    }

    /// Encodes a number of nanoseconds.
    pub fn from_nanos(nanos: u32) -> Result<Self, FractionError> {
        Self::from_dec(nanos, NANOS)
    }

    /// Decodes the fraction at the given scale.
    pub const fn to_dec(self, scale: u32) -> u32 {
        bin16_to_dec(self.0, scale)
    }

    /// Decodes the fraction as a number of nanoseconds.
    pub const fn to_nanos(self) -> u32 {
        self.to_dec(NANOS)
    }

    /// Widens the fraction to 32 bits without loss.
    pub const fn to_bin32(self) -> BinFrac32 {
        BinFrac32((self.0 as u32) << 16)
    }
}

/// A fraction of one second in units of 1/2³² second.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BinFrac32(pub u32);

impl BinFrac32 {
    /// Encodes a decimal fraction at the given scale.
    pub fn from_dec(dec: u64, scale: u32) -> Result<Self, FractionError> {
        dec_to_bin32(dec, scale).map(Self)
    }

    /// Encodes a number of nanoseconds.
    pub fn from_nanos(nanos: u32) -> Result<Self, FractionError> {
        Self::from_dec(nanos as u64, NANOS)
    }

    /// Decodes the fraction at the given scale.
    pub const fn to_dec(self, scale: u32) -> u32 {
        bin32_to_dec(self.0, scale)
    }

    /// Decodes the fraction as a number of nanoseconds.
    pub const fn to_nanos(self) -> u32 {
        self.to_dec(NANOS)
    }

    /// Decodes the fraction as a sub-second duration.
    pub const fn to_duration(self) -> Duration {
        Duration::new(0, self.to_nanos())
    }

    /// Narrows the fraction to 16 bits, rounding to nearest with ties up.
    ///
    /// Returns an error if rounding would carry into the next second.
    pub fn to_bin16(self) -> Result<BinFrac16, FractionError> {
        let rounded = (self.0 as u64 + 0x8000) >> 16;

        u16::try_from(rounded)
            .map(BinFrac16)
            .map_err(|_| FractionError::Overflow)
    }
}

impl From<BinFrac16> for BinFrac32 {
    fn from(frac: BinFrac16) -> Self {
        frac.to_bin32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_exact_literals() {
        assert_eq!(bin32_to_dec(0xFFFF_FFFF, MILLIS), 999);
        assert_eq!(bin32_to_dec(0xFFFF_FFFF, NANOS), 999_999_999);
        assert_eq!(bin32_to_dec(0x8000_0000, NANOS), 500_000_000);
        assert_eq!(bin16_to_dec(0xFFFF, MILLIS), 999);
        assert_eq!(bin16_to_dec(0x8000, MILLIS), 500);
        assert_eq!(bin16_to_dec(0, NANOS), 0);
    }

    #[test]
    fn encode_ties_round_up() {
        assert_eq!(dec_to_bin32(500, MILLIS), Ok(0x8000_0000));
        assert_eq!(dec_to_bin16(500, MILLIS), Ok(0x8000));
        // 1ms is 65.536 units of 1/2^16 second.
        assert_eq!(dec_to_bin16(1, MILLIS), Ok(66));
        // 1µs is 4294.967296 units of 1/2^32 second.
        assert_eq!(dec_to_bin32(1, MICROS), Ok(4295));
        assert_eq!(dec_to_bin32(999_999_999, NANOS), Ok(4_294_967_292));
    }

    #[test]
    fn encode_errors() {
        assert_eq!(dec_to_bin16(1, 0), Err(FractionError::InvalidScale));
        assert_eq!(dec_to_bin32(1, 0), Err(FractionError::InvalidScale));
        assert_eq!(dec_to_bin16(1000, MILLIS), Err(FractionError::Overflow));
        assert_eq!(dec_to_bin32(1000, MILLIS), Err(FractionError::Overflow));
        assert_eq!(dec_to_bin16(999_999_999, NANOS), Err(FractionError::Overflow));
        assert_eq!(dec_to_bin32(u64::MAX, NANOS), Err(FractionError::Overflow));
    }

    #[test]
    fn nanos_resolve_every_16_bit_value() {
        for bin in (0..=u16::MAX).step_by(97) {
            let nanos = bin16_to_dec(bin, NANOS);
            assert_eq!(dec_to_bin16(nanos, NANOS), Ok(bin));
        }
    }

    #[test]
    fn re_encoding_stays_within_granularity() {
        // One nanosecond spans about 4.29 units of 1/2^32 second.
        for bin in [0u32, 1, 7, 0x1234_5678, 0x8000_0001, 0xFFFF_FFFF] {
            let nanos = bin32_to_dec(bin, NANOS);
            let back = dec_to_bin32(nanos as u64, NANOS).unwrap();
            assert!(bin.abs_diff(back) <= 5);
        }
        for nanos in [0u32, 1, 333_333_333, 999_999_999] {
            let bin = dec_to_bin32(nanos as u64, NANOS).unwrap();
            let back = bin32_to_dec(bin, NANOS);
            assert!(nanos.abs_diff(back) <= 1);
        }
    }

    #[test]
    fn newtypes() {
        let frac = BinFrac16::from_nanos(750_000_000).unwrap();
        assert_eq!(frac, BinFrac16(0xC000));
        assert_eq!(frac.to_dec(MILLIS), 750);
        assert_eq!(frac.to_bin32(), BinFrac32(0xC000_0000));
        assert_eq!(BinFrac32::from(frac).to_nanos(), 750_000_000);

        let frac = BinFrac32(0x4000_0000);
        assert_eq!(frac.to_duration(), Duration::from_millis(250));
        assert_eq!(frac.to_bin16(), Ok(BinFrac16(0x4000)));
        assert_eq!(BinFrac32(0x0000_8000).to_bin16(), Ok(BinFrac16(1)));
        assert_eq!(BinFrac32(0xFFFF_8000).to_bin16(), Err(FractionError::Overflow));
    }
}
