//! System clock readers for Linux.
//!
//! The kernel maintains a `CLOCK_TAI` clock that differs from
//! `CLOCK_REALTIME` by the TAI - UTC offset configured by the time daemon
//! (e.g. `chronyd` or `ptp4l`). If no daemon sets the offset, both clocks
//! read the same value, which [`tai_utc_offset`] reports as a null offset.

use core::fmt;
use core::time::Duration;

use nix::errno::Errno;
use nix::time::{clock_gettime, ClockId};
use tracing::trace;

use crate::timestamp::CycleBracketedTimestamp;
use crate::{Epoch, Instant, OutOfRangeError, PosixTime, Tai, TaiTime};

/// The error type returned when a system clock cannot be read.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClockError {
    /// The system call failed.
    Sys(Errno),
    /// The clock value is outside the representable range.
    OutOfRange,
}

impl fmt::Display for ClockError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sys(errno) => write!(fmt, "system clock could not be read: {}", errno),
            Self::OutOfRange => "system clock value out of representable range".fmt(fmt),
        }
    }
}

impl std::error::Error for ClockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sys(errno) => Some(errno),
            Self::OutOfRange => None,
        }
    }
}

impl From<Errno> for ClockError {
    fn from(errno: Errno) -> Self {
        Self::Sys(errno)
    }
}

impl From<OutOfRangeError> for ClockError {
    fn from(_: OutOfRangeError) -> Self {
        Self::OutOfRange
    }
}

fn read_clock<E: Epoch>(clock: ClockId) -> Result<Instant<E>, ClockError> {
    let ts = clock_gettime(clock)?;
    let nanos = ts.tv_sec() as i128 * 1_000_000_000 + ts.tv_nsec() as i128;

    Ok(Instant::from_total_nanos(nanos)?)
}

/// Reads `CLOCK_TAI`.
pub fn tai_now() -> Result<TaiTime, ClockError> {
    read_clock(ClockId::CLOCK_TAI)
}

/// Reads `CLOCK_REALTIME`.
pub fn posix_now() -> Result<PosixTime, ClockError> {
    read_clock(ClockId::CLOCK_REALTIME)
}

/// Reads `CLOCK_MONOTONIC_RAW` as a free-running nanosecond counter.
pub fn monotonic_raw_nanos() -> Result<u64, ClockError> {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC_RAW)?;
    let secs = u64::try_from(ts.tv_sec()).map_err(|_| ClockError::OutOfRange)?;
    let nanos = u64::try_from(ts.tv_nsec()).map_err(|_| ClockError::OutOfRange)?;

    secs.checked_mul(1_000_000_000)
        .and_then(|secs| secs.checked_add(nanos))
        .ok_or(ClockError::OutOfRange)
}

/// Returns the TAI - UTC offset currently configured in the kernel, rounded
/// to the nearest second.
///
/// A null offset usually means that no time daemon has configured it.
pub fn tai_utc_offset() -> Result<i64, ClockError> {
    // The TAI read is bracketed by two UTC reads and compared to their
    // midpoint.
    let before = posix_now()?;
    let tai = tai_now()?;
    let after = posix_now()?;

    let midpoint = (before.total_nanos() + after.total_nanos()) / 2;
    let delta = tai.total_nanos() - midpoint;
    let offset = (delta + 500_000_000).div_euclid(1_000_000_000);
    trace!(delta_ns = delta as i64, offset = offset as i64, "kernel TAI offset read");

    i64::try_from(offset).map_err(|_| ClockError::OutOfRange)
}

/// Captures a `CLOCK_TAI` timestamp bracketed by `CLOCK_MONOTONIC_RAW`
/// samples.
///
/// Several captures are performed and the one with the lowest latency is
/// returned. Captures with a null latency are discarded as they are most
/// likely indicative of a platform bug.
pub fn capture_system() -> Result<CycleBracketedTimestamp<u64, Tai>, ClockError> {
    const SAMPLES: usize = 3;

    CycleBracketedTimestamp::try_capture_best_of(SAMPLES, tai_now, monotonic_raw_nanos)
}

/// Returns the read latency of a system capture as a duration.
pub fn latency(stamp: &CycleBracketedTimestamp<u64, Tai>) -> Duration {
    Duration::from_nanos(stamp.latency())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clocks_smoke() {
        const START_OF_2022: i64 = 1_640_995_200;
        const START_OF_2100: i64 = 4_102_444_800;

        let posix = posix_now().unwrap().as_secs();
        let tai = tai_now().unwrap().as_secs();

        assert!(posix > START_OF_2022 && posix < START_OF_2100);
        assert!(tai >= posix - 1 && tai < posix + 100);
    }

    #[test]
    fn offset_smoke() {
        let offset = tai_utc_offset().unwrap();
        assert!((0..=100).contains(&offset));
    }

    #[test]
    fn capture_smoke() {
        const TOLERANCE: Duration = Duration::from_millis(20);

        let stamp = capture_system().unwrap();
        let later = tai_now().unwrap();

        assert!(latency(&stamp) <= TOLERANCE);
        assert!(later >= stamp.instant());
        assert!(monotonic_raw_nanos().unwrap() >= stamp.cycles_after());
    }
}
