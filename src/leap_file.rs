//! Loading and sharing of leap second lists.
//!
//! The [`LeapSecondList`] parser reads the `leap-seconds.list` file published
//! by the IERS and distributed with NTP and most operating systems (e.g.
//! `/usr/share/zoneinfo/leap-seconds.list`). The file contains:
//!
//! - an update line `#$ <NTP seconds>`,
//! - an expiration line `#@ <NTP seconds>`,
//! - one data line `<NTP seconds> <TAI - UTC> [# comment]` per offset change,
//! - comment lines starting with `#`, which are ignored.
//!
//! The hash line of the file is not verified.
//!
//! A [`SharedLeapSeconds`] holds the list in use by the rest of a process and
//! replaces it as a whole when a refreshed file is loaded.

use std::fmt;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::{LeapSecondEntry, LeapSecondTable, LeapTableError, NtpTime, Posix, PosixTime};

/// The error type returned when a leap second file cannot be read or parsed.
#[derive(Debug)]
pub enum ParseLeapFileError {
    /// A line is malformed; the line number is 1-based.
    InvalidLine(usize),
    /// The entries do not form a valid leap second table.
    InvalidTable(LeapTableError),
    /// The file could not be read.
    Io(io::Error),
}

impl fmt::Display for ParseLeapFileError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLine(line) => write!(fmt, "leap second file line {} is malformed", line),
            Self::InvalidTable(err) => err.fmt(fmt),
            Self::Io(err) => write!(fmt, "leap second file could not be read: {}", err),
        }
    }
}

impl std::error::Error for ParseLeapFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidLine(_) => None,
            Self::InvalidTable(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<LeapTableError> for ParseLeapFileError {
    fn from(err: LeapTableError) -> Self {
        Self::InvalidTable(err)
    }
}

impl From<io::Error> for ParseLeapFileError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// An owned, validated leap second table with its publication metadata.
///
/// # Examples
///
/// ```
/// use refclock_time::leap_file::LeapSecondList;
/// use refclock_time::PosixTime;
///
/// let file = "\
/// #$ 3913697179
/// #@ 3960057600
/// 2272060800 10 # 1 Jan 1972
/// 2287785600 11 # 1 Jul 1972
/// ";
///
/// let list: LeapSecondList = file.parse().unwrap();
/// let table = list.table();
///
/// assert_eq!(table.current_offset(), 11);
/// assert_eq!(table.offset_at(&PosixTime::from_secs(78_796_800)), Some(11));
/// assert!(!list.is_expired(&PosixTime::from_secs(1_700_000_000)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeapSecondList {
    entries: Vec<LeapSecondEntry>,
    updated: Option<NtpTime>,
    expires: Option<NtpTime>,
}

impl LeapSecondList {
    /// Creates a list from a copy of the built-in table, without publication
    /// metadata.
    pub fn builtin() -> Self {
        Self {
            entries: LeapSecondTable::BUILTIN.entries().to_vec(),
            updated: None,
            expires: None,
        }
    }

    /// Creates a list from entries, validating them as a leap second table.
    pub fn new(
        entries: Vec<LeapSecondEntry>,
        updated: Option<NtpTime>,
        expires: Option<NtpTime>,
    ) -> Result<Self, LeapTableError> {
        LeapSecondTable::new(&entries)?;

        Ok(Self {
            entries,
            updated,
            expires,
        })
    }

    /// Parses a leap second file from a buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParseLeapFileError> {
        let mut parser = Parser::default();
        for (idx, line) in reader.lines().enumerate() {
            parser.parse_line(idx + 1, &line?)?;
        }

        parser.finish()
    }

    /// Returns the list as a borrowed leap second table.
    pub fn table(&self) -> LeapSecondTable<'_> {
        LeapSecondTable::from_validated(&self.entries)
    }

    /// Returns the last update date of the list, if known.
    pub fn updated(&self) -> Option<NtpTime> {
        self.updated
    }

    /// Returns the expiration date of the list, if known.
    pub fn expires(&self) -> Option<NtpTime> {
        self.expires
    }

    /// Returns `true` if the list has a known expiration date that is not
    /// after `now`.
    ///
    /// Offsets of an expired list remain correct for past dates, but a leap
    /// second may have been announced since its publication.
    pub fn is_expired(&self, now: &PosixTime) -> bool {
        match self.expires.map(|expires| expires.to_epoch::<Posix>()) {
            Some(Ok(expires)) => *now >= expires,
            _ => false,
        }
    }
}

impl Default for LeapSecondList {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FromStr for LeapSecondList {
    type Err = ParseLeapFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser::default();
        for (idx, line) in s.lines().enumerate() {
            parser.parse_line(idx + 1, line)?;
        }

        parser.finish()
    }
}

#[derive(Default)]
struct Parser {
    entries: Vec<LeapSecondEntry>,
    updated: Option<NtpTime>,
    expires: Option<NtpTime>,
}

impl Parser {
    fn parse_line(&mut self, line_num: usize, line: &str) -> Result<(), ParseLeapFileError> {
        let line = line.trim();
        let invalid = || ParseLeapFileError::InvalidLine(line_num);

        if let Some(value) = line.strip_prefix("#$") {
            self.updated = Some(parse_ntp_secs(value.trim()).ok_or_else(invalid)?);
        } else if let Some(value) = line.strip_prefix("#@") {
            self.expires = Some(parse_ntp_secs(value.trim()).ok_or_else(invalid)?);
        } else if !line.is_empty() && !line.starts_with('#') {
            let data = line.split('#').next().unwrap_or_default();
            let mut fields = data.split_whitespace();

            let instant = fields
                .next()
                .and_then(parse_ntp_secs)
                .and_then(|t| t.to_epoch::<Posix>().ok())
                .ok_or_else(invalid)?;
            let offset = fields
                .next()
                .and_then(|field| field.parse::<i32>().ok())
                .ok_or_else(invalid)?;
            if fields.next().is_some() {
                return Err(invalid());
            }

            self.entries.push(LeapSecondEntry::new(instant, offset));
        }

        Ok(())
    }

    fn finish(self) -> Result<LeapSecondList, ParseLeapFileError> {
        let list = LeapSecondList::new(self.entries, self.updated, self.expires)?;
        debug!(
            entries = list.entries.len(),
            current_offset = list.table().current_offset(),
            "leap second file parsed"
        );

        Ok(list)
    }
}

fn parse_ntp_secs(field: &str) -> Option<NtpTime> {
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs = field.parse::<u32>().ok()?;

    Some(NtpTime::from_secs(secs as i64))
}

/// A leap second list shared by several threads and replaced atomically.
///
/// Readers obtain a snapshot of the current list that remains valid even if
/// the list is replaced while they use it.
///
/// # Examples
///
/// ```
/// use refclock_time::leap_file::{LeapSecondList, SharedLeapSeconds};
///
/// let shared = SharedLeapSeconds::default();
/// assert_eq!(shared.load().table().current_offset(), 37);
///
/// let list: LeapSecondList = "2272060800 10\n".parse().unwrap();
/// shared.replace(list);
/// assert_eq!(shared.load().table().current_offset(), 10);
/// ```
#[derive(Debug, Default)]
pub struct SharedLeapSeconds {
    current: RwLock<Arc<LeapSecondList>>,
}

impl SharedLeapSeconds {
    /// Creates a shared list.
    pub fn new(list: LeapSecondList) -> Self {
        Self {
            current: RwLock::new(Arc::new(list)),
        }
    }

    /// Returns a snapshot of the current list.
    pub fn load(&self) -> Arc<LeapSecondList> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());

        guard.clone()
    }

    /// Replaces the current list and returns the previous one.
    pub fn replace(&self, list: LeapSecondList) -> Arc<LeapSecondList> {
        let now = PosixTime::now().ok();
        if now.map_or(false, |now| list.is_expired(&now)) {
            warn!("installing an expired leap second list");
        }
        info!(
            entries = list.entries.len(),
            current_offset = list.table().current_offset(),
            "leap second list replaced"
        );

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());

        std::mem::replace(&mut *guard, Arc::new(list))
    }

    /// Replaces the current list only if the new list was updated more
    /// recently, and returns `true` if it was replaced.
    ///
    /// A list without update date never replaces a list that has one.
    pub fn replace_if_newer(&self, list: LeapSecondList) -> bool {
        let current = self.load().updated;
        let newer = match (current, list.updated) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(current), Some(updated)) => updated > current,
        };
        if newer {
            self.replace(list);
        } else {
            debug!("leap second list not replaced: not newer than the current list");
        }

        newer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Excerpt of an IERS leap-seconds.list file.
    const LEAP_FILE: &str = "\
#	ATOMIC TIME
#
#$	 3913697179
#@	3960057600
#
2272060800	10	# 1 Jan 1972
2287785600	11	# 1 Jul 1972
2303683200	12	# 1 Jan 1973
3644697600	36	# 1 Jul 2015
3692217600	37	# 1 Jan 2017
#
#h	16edd0f0 3666784f 37db6bdd e74ced87 59af48f1
";

    #[test]
    fn parse_file() {
        let list: LeapSecondList = LEAP_FILE.parse().unwrap();
        let table = list.table();

        assert_eq!(table.len(), 5);
        assert_eq!(table.entries()[0].instant(), PosixTime::from_secs(63_072_000));
        assert_eq!(table.current_offset(), 37);
        assert_eq!(list.updated(), Some(NtpTime::from_secs(3_913_697_179)));
        assert_eq!(list.expires(), Some(NtpTime::from_secs(3_960_057_600)));
        assert_eq!(table.offset_at(&PosixTime::from_secs(1_483_228_799)), Some(36));
        assert_eq!(table.offset_at(&PosixTime::from_secs(1_483_228_800)), Some(37));
    }

    #[test]
    fn parse_reader() {
        let list = LeapSecondList::from_reader(LEAP_FILE.as_bytes()).unwrap();
        assert_eq!(list, LEAP_FILE.parse::<LeapSecondList>().unwrap());
    }

    #[test]
    fn expiration() {
        let list: LeapSecondList = LEAP_FILE.parse().unwrap();
        // 2025-06-28, the expiration date in NTP seconds minus the NTP bias.
        let expires = PosixTime::from_secs(3_960_057_600 - 2_208_988_800);

        assert!(!list.is_expired(&PosixTime::from_secs(expires.as_secs() - 1)));
        assert!(list.is_expired(&expires));
        assert!(!LeapSecondList::builtin().is_expired(&PosixTime::MAX));
    }

    #[test]
    fn malformed_lines() {
        assert!(matches!(
            "2272060800\n".parse::<LeapSecondList>(),
            Err(ParseLeapFileError::InvalidLine(1))
        ));
        assert!(matches!(
            "2272060800 10\n2287785600 x\n".parse::<LeapSecondList>(),
            Err(ParseLeapFileError::InvalidLine(2))
        ));
        assert!(matches!(
            "#@ soon\n".parse::<LeapSecondList>(),
            Err(ParseLeapFileError::InvalidLine(1))
        ));
        assert!(matches!(
            "-2272060800 10\n".parse::<LeapSecondList>(),
            Err(ParseLeapFileError::InvalidLine(1))
        ));
        assert!(matches!(
            "2272060800 10 11\n".parse::<LeapSecondList>(),
            Err(ParseLeapFileError::InvalidLine(1))
        ));
    }

    #[test]
    fn invalid_tables() {
        assert!(matches!(
            "# nothing\n".parse::<LeapSecondList>(),
            Err(ParseLeapFileError::InvalidTable(LeapTableError::Empty))
        ));
        assert!(matches!(
            "2287785600 11\n2272060800 10\n".parse::<LeapSecondList>(),
            Err(ParseLeapFileError::InvalidTable(LeapTableError::NotAscending(1)))
        ));
    }

    #[test]
    fn shared_replace() {
        let shared = SharedLeapSeconds::new(LeapSecondList::builtin());
        let before = shared.load();

        let previous = shared.replace(LEAP_FILE.parse().unwrap());

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.table().len(), 28);
        assert_eq!(shared.load().table().len(), 5);
    }

    #[test]
    fn shared_replace_if_newer() {
        let shared = SharedLeapSeconds::default();
        let list: LeapSecondList = LEAP_FILE.parse().unwrap();

        assert!(shared.replace_if_newer(list.clone()));
        assert!(!shared.replace_if_newer(list.clone()));
        assert!(!shared.replace_if_newer(LeapSecondList::builtin()));

        let mut newer = list;
        newer.updated = Some(NtpTime::from_secs(3_913_697_180));
        assert!(shared.replace_if_newer(newer));
    }

    #[test]
    fn shared_across_threads() {
        let shared = Arc::new(SharedLeapSeconds::default());

        let reader = std::thread::spawn({
            let shared = shared.clone();
            move || shared.load().table().current_offset()
        });
        shared.replace(LEAP_FILE.parse().unwrap());

        assert_eq!(reader.join().unwrap(), 37);
        assert_eq!(shared.load().table().current_offset(), 37);
    }
}
