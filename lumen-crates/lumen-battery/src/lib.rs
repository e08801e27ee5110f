//! Crate for calculating Battery levels as percentages, based on millivolt/pct profiles via
//! [`BatteryDischargeProfile`]. All arithmetic is integer with truncation.
#![no_std]

use core::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryDischargeProfile {
    voltage_range: Range<u32>,
    pct_range: Range<u32>,
}

/// Discharge curve of the beacon's 3 V cell, highest segment first.
pub static DISCHARGE_PROFILES: [BatteryDischargeProfile; 5] = [
    BatteryDischargeProfile::new(3000, 2850, 100, 80),
    BatteryDischargeProfile::new(2850, 2700, 80, 50),
    BatteryDischargeProfile::new(2700, 2550, 50, 20),
    BatteryDischargeProfile::new(2550, 2400, 20, 5),
    BatteryDischargeProfile::new(2400, 2300, 5, 0),
];

impl BatteryDischargeProfile {
    /// Creates a new discharge profile. Internally, it stores the millivolts high/low and pct
    /// high/low as ranges.
    #[inline]
    pub const fn new(mv_high: u32, mv_low: u32, pct_high: u32, pct_low: u32) -> Self {
        Self {
            voltage_range: mv_low..mv_high,
            pct_range: pct_low..pct_high,
        }
    }

    /// Calculates a battery percentage according to the specified range of the discharge profile.
    /// If the voltage is outside of the discharge profile, this method returns `None`.
    ///
    /// ```
    /// use lumen_battery::BatteryDischargeProfile;
    ///
    /// let level = BatteryDischargeProfile::new(3000, 2000, 100, 0);
    ///
    /// assert_eq!(level.calc_pct(2500), Some(50));
    /// ```
    pub fn calc_pct(&self, mv: u32) -> Option<u32> {
        if self.voltage_range.contains(&mv) {
            Some(
                self.pct_range.start
                    + (mv - self.voltage_range.start)
                        * (self.pct_range.end - self.pct_range.start)
                        / (self.voltage_range.end - self.voltage_range.start),
            )
        } else {
            None
        }
    }

    /// Calculates a battery level from a range of discharge profiles. Assumes the first
    /// discharge level is the highest, so the levels go from high to low, and the first profile
    /// containing the voltage wins. Voltages at or above the first profile are a full battery.
    ///
    /// ```
    /// use lumen_battery::BatteryDischargeProfile;
    ///
    /// let levels = [
    ///     BatteryDischargeProfile::new(3000, 2500, 100, 50),
    ///     BatteryDischargeProfile::new(2500, 2000, 50, 0),
    /// ];
    ///
    /// assert_eq!(BatteryDischargeProfile::calc_pct_from_profile_range(2750, levels.iter()), 75);
    /// ```
    pub fn calc_pct_from_profile_range<'a>(
        mv: u32,
        levels: impl Iterator<Item = &'a BatteryDischargeProfile>,
    ) -> u32 {
        let mut levels = levels.peekable();

        if let Some(&level) = levels.peek() {
            if mv >= level.voltage_range.end {
                return level.pct_range.end;
            }
        }

        levels.find_map(|level| level.calc_pct(mv)).unwrap_or(0)
    }
}

/// Estimates the battery charge in percent from a millivolt reading, using
/// [`DISCHARGE_PROFILES`].
///
/// ```
/// use lumen_battery::estimate_percent;
///
/// assert_eq!(estimate_percent(3100), 100);
/// assert_eq!(estimate_percent(2775), 65);
/// assert_eq!(estimate_percent(2000), 0);
/// ```
pub fn estimate_percent(mv: u32) -> u8 {
    BatteryDischargeProfile::calc_pct_from_profile_range(mv, DISCHARGE_PROFILES.iter()).min(100)
        as u8
}
