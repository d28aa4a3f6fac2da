//! Hardware timestamps and cycle counter brackets.
//!
//! Reading a timestamp from a clock device takes time. Sampling a free-running
//! cycle counter just before and just after the read bounds the moment at
//! which the timestamp was latched, which lets the caller estimate the read
//! latency and correlate the device clock with the local counter.
//!
//! Captures on the same device must be serialized by the caller: interleaved
//! reads of the same device register are meaningless.

use core::convert::Infallible;

use num_traits::{PrimInt, WrappingAdd, WrappingSub};

use crate::fraction::BinFrac32;
use crate::{Epoch, Error, Instant, Posix};

/// Returns `a - b` modulo the width of the counter.
///
/// The result is correct as long as the counter wrapped at most once between
/// the two samples.
///
/// # Examples
///
/// ```
/// use refclock_time::timestamp::delta_cycles;
///
/// assert_eq!(delta_cycles(25u64, 10), 15);
/// assert_eq!(delta_cycles(5u32, u32::MAX - 4), 10);
/// ```
pub fn delta_cycles<C: WrappingSub>(a: C, b: C) -> C {
    a.wrapping_sub(&b)
}

/// A timestamp read from a device, bracketed by two samples of a free-running
/// cycle counter.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use refclock_time::timestamp::CycleBracketedTimestamp;
/// use refclock_time::PosixTime;
///
/// let counter = Cell::new(1_000u64);
/// let read_cycles = || {
///     counter.set(counter.get() + 40);
///     counter.get()
/// };
///
/// let read_instant = || PosixTime::from_secs(1_700_000_000);
/// let stamp = CycleBracketedTimestamp::capture(read_instant, read_cycles);
///
/// assert_eq!(stamp.cycles_before(), 1_040);
/// assert_eq!(stamp.cycles_after(), 1_080);
/// assert_eq!(stamp.latency(), 40);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "C: serde::Serialize",
        deserialize = "C: serde::Deserialize<'de>"
    ))
)]
pub struct CycleBracketedTimestamp<C = u64, E: Epoch = Posix> {
    cycles_before: C,
    cycles_after: C,
    instant: Instant<E>,
}

impl<C, E> CycleBracketedTimestamp<C, E>
where
    C: PrimInt + WrappingAdd + WrappingSub,
    E: Epoch,
{
    /// Creates a bracketed timestamp from its parts.
    pub const fn new(cycles_before: C, instant: Instant<E>, cycles_after: C) -> Self {
        Self {
            cycles_before,
            cycles_after,
            instant,
        }
    }

    /// Samples the cycle counter, then the device clock, then the cycle
    /// counter again.
    pub fn capture<I, R>(read_instant: I, mut read_cycles: R) -> Self
    where
        I: FnOnce() -> Instant<E>,
        R: FnMut() -> C,
    {
        let cycles_before = read_cycles();
        let instant = read_instant();
        let cycles_after = read_cycles();

        Self::new(cycles_before, instant, cycles_after)
    }

    /// Same as [`capture`](Self::capture), with a fallible device clock read.
    ///
    /// The counter is not sampled a second time if the read fails.
    pub fn try_capture<I, R, Err>(read_instant: I, mut read_cycles: R) -> Result<Self, Err>
    where
        I: FnOnce() -> Result<Instant<E>, Err>,
        R: FnMut() -> C,
    {
        let cycles_before = read_cycles();
        let instant = read_instant()?;
        let cycles_after = read_cycles();

        Ok(Self::new(cycles_before, instant, cycles_after))
    }

    /// Performs several captures and returns the one with the lowest latency.
    ///
    /// Captures with a null latency are discarded in favor of any other
    /// capture, as they most likely result from a counter that is too coarse.
    /// At least one capture is performed.
    pub fn capture_best_of<I, R>(samples: usize, mut read_instant: I, mut read_cycles: R) -> Self
    where
        I: FnMut() -> Instant<E>,
        R: FnMut() -> C,
    {
        let stamp = Self::try_capture_best_of(
            samples,
            || Ok::<_, Infallible>(read_instant()),
            || Ok(read_cycles()),
        );

        match stamp {
            Ok(stamp) => stamp,
            Err(never) => match never {},
        }
    }

    /// Same as [`capture_best_of`](Self::capture_best_of), with fallible
    /// device clock and counter reads.
    ///
    /// The first failed read aborts the whole operation.
    pub fn try_capture_best_of<I, R, Err>(
        samples: usize,
        mut read_instant: I,
        mut read_cycles: R,
    ) -> Result<Self, Err>
    where
        I: FnMut() -> Result<Instant<E>, Err>,
        R: FnMut() -> Result<C, Err>,
    {
        let mut capture = || -> Result<Self, Err> {
            let cycles_before = read_cycles()?;
            let instant = read_instant()?;
            let cycles_after = read_cycles()?;

            Ok(Self::new(cycles_before, instant, cycles_after))
        };

        let mut best = capture()?;

        for _ in 1..samples {
            let stamp = capture()?;
            let latency = stamp.latency();

            if best.latency().is_zero() || (latency < best.latency() && !latency.is_zero()) {
                best = stamp;
            }
        }

        Ok(best)
    }

    /// Returns the counter sample taken before the device read.
    pub fn cycles_before(&self) -> C {
        self.cycles_before
    }

    /// Returns the counter sample taken after the device read.
    pub fn cycles_after(&self) -> C {
        self.cycles_after
    }

    /// Returns the timestamp read from the device.
    pub fn instant(&self) -> Instant<E> {
        self.instant
    }

    /// Returns the number of counter cycles elapsed during the read.
    pub fn latency(&self) -> C {
        delta_cycles(self.cycles_after, self.cycles_before)
    }

    /// Returns the counter value halfway between the two samples, which is
    /// the best estimate of the moment the timestamp was latched.
    pub fn midpoint_cycles(&self) -> C {
        let half = self.latency() >> 1;

        self.cycles_before.wrapping_add(&half)
    }
}

#[cfg(feature = "defmt")]
impl<C: defmt::Format, E: Epoch> defmt::Format for CycleBracketedTimestamp<C, E> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "CycleBracketedTimestamp({}, {}, {})",
            self.cycles_before,
            self.instant,
            self.cycles_after
        );
    }
}

/// A raw timestamp as latched by timing hardware: whole seconds since the
/// device epoch and a 32-bit binary fraction of a second.
///
/// # Examples
///
/// ```
/// use refclock_time::{BinFrac32, PosixTime, RawTimestamp};
///
/// let raw = RawTimestamp::from_bits(0x6590_3A00_8000_0000);
/// assert_eq!(raw, RawTimestamp::new(0x6590_3A00, BinFrac32(0x8000_0000)));
///
/// let t: PosixTime = raw.to_instant();
/// assert_eq!(t, PosixTime::new(0x6590_3A00, 500_000_000).unwrap());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawTimestamp {
    /// The whole number of seconds.
    pub secs: u32,
    /// The fraction of a second.
    pub frac: BinFrac32,
}

impl RawTimestamp {
    /// Creates a raw timestamp from its parts.
    pub const fn new(secs: u32, frac: BinFrac32) -> Self {
        Self { secs, frac }
    }

    /// Decodes a 64-bit register value holding the seconds in its upper half
    /// and the fraction in its lower half.
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            secs: (bits >> 32) as u32,
            frac: BinFrac32(bits as u32),
        }
    }

    /// Returns the 64-bit register encoding of the timestamp.
    pub const fn to_bits(self) -> u64 {
        (self.secs as u64) << 32 | self.frac.0 as u64
    }

    /// Converts the raw timestamp to an instant relative to the same epoch,
    /// truncating the fraction to the nanosecond.
    pub const fn to_instant<E: Epoch>(&self) -> Instant<E> {
        Instant::from_parts(self.secs as i64, self.frac.to_nanos() as i32)
    }

    /// Encodes an instant as a raw timestamp relative to the same epoch,
    /// rounding the fraction to the nearest binary value.
    ///
    /// Returns an error if the instant is negative or if its number of
    /// seconds does not fit in 32 bits.
    pub fn from_instant<E: Epoch>(t: &Instant<E>) -> Result<Self, Error> {
        if t.is_negative() {
            return Err(Error::OutOfRange);
        }
        let secs = u32::try_from(t.as_secs()).map_err(|_| Error::OutOfRange)?;
        let frac = BinFrac32::from_nanos(t.subsec_nanos() as u32)?;

        Ok(Self { secs, frac })
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::{GpsTime, PosixTime};

    #[test]
    fn capture_order() {
        let step = Cell::new(0u32);
        let next = || {
            step.set(step.get() + 1);
            step.get()
        };

        let stamp = CycleBracketedTimestamp::<u32>::capture(
            || PosixTime::from_secs(next() as i64),
            || next() * 100,
        );

        assert_eq!(stamp.cycles_before(), 100);
        assert_eq!(stamp.instant(), PosixTime::from_secs(2));
        assert_eq!(stamp.cycles_after(), 300);
        assert_eq!(stamp.latency(), 200);
        assert_eq!(stamp.midpoint_cycles(), 200);
    }

    #[test]
    fn wrapping_counter() {
        let stamp = CycleBracketedTimestamp::new(u32::MAX - 9, PosixTime::EPOCH, 10u32);

        assert_eq!(stamp.latency(), 20);
        assert_eq!(stamp.midpoint_cycles(), 0);
        assert_eq!(delta_cycles(3u8, 250), 9);
    }

    #[test]
    fn try_capture_failure() {
        let reads = Cell::new(0);
        let read_cycles = || {
            reads.set(reads.get() + 1);
            0u64
        };

        let result =
            CycleBracketedTimestamp::<u64, Posix>::try_capture(|| Err("busy"), read_cycles);

        assert_eq!(result, Err("busy"));
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn try_capture_success() {
        let stamp = CycleBracketedTimestamp::try_capture(
            || Ok::<_, Error>(GpsTime::from_secs(42)),
            || 7u64,
        )
        .unwrap();

        assert_eq!(stamp.instant(), GpsTime::from_secs(42));
        assert_eq!(stamp.latency(), 0);
    }

    #[test]
    fn best_of_lowest_latency() {
        let mut samples = [0u64, 100, 200, 210, 300, 350].into_iter();
        let mut secs = 0;

        let stamp = CycleBracketedTimestamp::capture_best_of(
            3,
            || {
                secs += 1;
                PosixTime::from_secs(secs)
            },
            || samples.next().unwrap(),
        );

        assert_eq!(stamp.cycles_before(), 200);
        assert_eq!(stamp.latency(), 10);
        assert_eq!(stamp.instant(), PosixTime::from_secs(2));
    }

    #[test]
    fn best_of_discards_null_latency() {
        let mut samples = [0u64, 0, 100, 130, 200, 250].into_iter();

        let stamp = CycleBracketedTimestamp::capture_best_of(
            3,
            || PosixTime::EPOCH,
            || samples.next().unwrap(),
        );

        assert_eq!(stamp.cycles_before(), 100);
        assert_eq!(stamp.latency(), 30);
    }

    #[test]
    fn best_of_single_sample() {
        let mut samples = [5u64, 8].into_iter();

        let stamp = CycleBracketedTimestamp::capture_best_of(
            0,
            || PosixTime::EPOCH,
            || samples.next().unwrap(),
        );

        assert_eq!(stamp.latency(), 3);
    }

    #[test]
    fn try_best_of_lowest_latency() {
        let mut samples = [0u32, 9, 10, 14, 20, 20].into_iter();

        let stamp = CycleBracketedTimestamp::try_capture_best_of(
            3,
            || Ok::<_, ()>(PosixTime::EPOCH),
            || samples.next().ok_or(()),
        )
        .unwrap();

        assert_eq!(stamp.cycles_before(), 10);
        assert_eq!(stamp.latency(), 4);
    }

    #[test]
    fn try_best_of_aborts_on_failed_read() {
        let mut samples = [0u64, 5, 7].into_iter();
        let mut reads = 0;

        let stamp = CycleBracketedTimestamp::try_capture_best_of(
            3,
            || {
                reads += 1;
                Ok(PosixTime::EPOCH)
            },
            || samples.next().ok_or("counter unavailable"),
        );

        assert_eq!(stamp, Err("counter unavailable"));
        assert_eq!(reads, 2);
    }

    #[test]
    fn raw_timestamp() {
        let raw = RawTimestamp::new(1_483_228_800, BinFrac32(0x4000_0000));
        let t: PosixTime = raw.to_instant();

        assert_eq!(t, PosixTime::new(1_483_228_800, 250_000_000).unwrap());
        assert_eq!(RawTimestamp::from_instant(&t), Ok(raw));
        assert_eq!(RawTimestamp::from_bits(raw.to_bits()), raw);

        let t = PosixTime::new(12, 999_999_999).unwrap();
        assert_eq!(
            RawTimestamp::from_instant(&t),
            Ok(RawTimestamp::new(12, BinFrac32(4_294_967_292)))
        );
        assert_eq!(
            RawTimestamp::from_instant(&PosixTime::new(0, -1).unwrap()),
            Err(Error::OutOfRange)
        );
        assert_eq!(
            RawTimestamp::from_instant(&PosixTime::from_secs(1 << 32)),
            Err(Error::OutOfRange)
        );
    }
}
