//! Resolver and table configuration.

use crate::leap::{LeapDatePolicy, LeapSecondTable};

/// The default number of 256-week cycles searched by the GPS week resolver,
/// which covers weeks up to year 2102.
pub(crate) const DEFAULT_CYCLE_LIMIT: u32 = 25;

/// Immutable settings shared by the operations that depend on the leap second
/// history.
///
/// A configuration is built once and passed by reference. The default
/// configuration uses the compiled-in leap second table, accepts leap seconds
/// on January 1st and July 1st only and searches 25 cycles of 256 GPS weeks.
///
/// # Examples
///
/// ```
/// use refclock_time::{Config, LeapDatePolicy, LeapSecondTable};
///
/// let config = Config::new(LeapSecondTable::builtin()).with_cycle_limit(40);
///
/// assert_eq!(config.cycle_limit(), 40);
/// assert_eq!(config.leap_date_policy(), LeapDatePolicy::JanuaryJuly);
/// assert_eq!(config.leap_seconds().current_offset(), 37);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Config<'a> {
    leap_seconds: LeapSecondTable<'a>,
    leap_date_policy: LeapDatePolicy,
    cycle_limit: u32,
}

impl<'a> Config<'a> {
    /// Creates a configuration with the default settings and the provided
    /// leap second table.
    pub const fn new(leap_seconds: LeapSecondTable<'a>) -> Self {
        Self {
            leap_seconds,
            leap_date_policy: LeapDatePolicy::JanuaryJuly,
            cycle_limit: DEFAULT_CYCLE_LIMIT,
        }
    }

    /// Sets the number of 256-week cycles searched by the GPS week resolver.
    pub const fn with_cycle_limit(mut self, cycle_limit: u32) -> Self {
        self.cycle_limit = cycle_limit;
        self
    }

    /// Sets the calendar dates at which leap seconds are accepted.
    pub const fn with_leap_date_policy(mut self, policy: LeapDatePolicy) -> Self {
        self.leap_date_policy = policy;
        self
    }

    /// Accepts leap seconds on April 1st and October 1st in addition to
    /// January 1st and July 1st.
    ///
    /// Truncated GPS week numbers are more likely to be ambiguous with this
    /// setting.
    pub const fn allow_quarterly_leap_dates(self) -> Self {
        self.with_leap_date_policy(LeapDatePolicy::Quarterly)
    }

    /// Returns the leap second table.
    pub const fn leap_seconds(&self) -> &LeapSecondTable<'a> {
        &self.leap_seconds
    }

    /// Returns the calendar dates at which leap seconds are accepted.
    pub const fn leap_date_policy(&self) -> LeapDatePolicy {
        self.leap_date_policy
    }

    /// Returns the number of 256-week cycles searched by the GPS week
    /// resolver.
    pub const fn cycle_limit(&self) -> u32 {
        self.cycle_limit
    }
}

impl Default for Config<'static> {
    fn default() -> Self {
        Self::new(LeapSecondTable::BUILTIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.cycle_limit(), DEFAULT_CYCLE_LIMIT);
        assert_eq!(config.leap_date_policy(), LeapDatePolicy::JanuaryJuly);
        assert_eq!(*config.leap_seconds(), LeapSecondTable::BUILTIN);
    }

    #[test]
    fn builders() {
        let config = Config::default()
            .allow_quarterly_leap_dates()
            .with_cycle_limit(3);

        assert_eq!(config.cycle_limit(), 3);
        assert_eq!(config.leap_date_policy(), LeapDatePolicy::Quarterly);
    }
}
