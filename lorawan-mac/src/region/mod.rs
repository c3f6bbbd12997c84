//! Region definitions and the channel table.
//!
//! A region contributes static parameters (default channels, data-rate
//! table, RX2 settings); the channel table itself lives in the
//! [`Configuration`] so a join-accept CFList can extend it at runtime.

use lora_modulation::{Bandwidth, SpreadingFactor};
use lorawan_codec::types::{DataRateRange, Frequency, DR};
use rand_core::RngCore;

#[cfg(feature = "region-eu433")]
mod eu433;
#[cfg(feature = "region-eu868")]
mod eu868;

#[cfg(feature = "region-eu433")]
pub(crate) use eu433::EU433;
#[cfg(feature = "region-eu868")]
pub(crate) use eu868::EU868;

#[cfg(not(any(feature = "region-eu868", feature = "region-eu433")))]
compile_error!("You must enable at least one region! eg: `region-eu868`");

/// Up to 16 channels, the three region defaults plus CFList additions.
pub const MAX_CHANNELS: usize = 16;

/// Number of data-rate slots a region table carries.
pub(crate) const NUM_DATARATES: usize = 8;

/// A (spreading factor, bandwidth) pair with its payload cap, one per DR.
#[derive(Debug, Clone)]
pub struct Datarate {
    pub(crate) spreading_factor: SpreadingFactor,
    pub(crate) bandwidth: Bandwidth,
    pub(crate) max_mac_payload_size: u8,
}

/// Static parameters a region plugs into the engine.
pub(crate) trait ChannelRegion {
    fn datarates() -> &'static [Option<Datarate>; NUM_DATARATES];
    /// The default channels seeded into the channel table.
    fn join_channels() -> &'static [u32];
    fn rx2_frequency() -> u32;
    fn default_rx2_data_rate() -> u8;
}

/// Regions supported by this crate, individually feature-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    #[cfg(feature = "region-eu868")]
    EU868,
    #[cfg(feature = "region-eu433")]
    EU433,
}

macro_rules! region_dispatch {
    ($s:expr, $t:tt $(, $arg:expr)*) => {
        match $s.region {
            #[cfg(feature = "region-eu868")]
            Region::EU868 => EU868::$t($($arg),*),
            #[cfg(feature = "region-eu433")]
            Region::EU433 => EU433::$t($($arg),*),
        }
    };
}

/// Region-specific configuration plus the runtime channel table.
#[derive(Clone)]
pub struct Configuration {
    region: Region,
    channels: [u32; MAX_CHANNELS],
    dr_ranges: [DataRateRange; MAX_CHANNELS],
}

impl Configuration {
    pub fn new(region: Region) -> Configuration {
        let mut cfg = Configuration {
            region,
            channels: [0; MAX_CHANNELS],
            dr_ranges: [DataRateRange::new_from_raw(0); MAX_CHANNELS],
        };
        cfg.reset_channels();
        cfg
    }

    /// Restores the channel table to the region defaults.
    pub(crate) fn reset_channels(&mut self) {
        self.channels = [0; MAX_CHANNELS];
        self.dr_ranges = [DataRateRange::new_from_raw(0); MAX_CHANNELS];
        let default_range = self.default_dr_range();
        for (i, freq) in region_dispatch!(self, join_channels).iter().enumerate() {
            self.channels[i] = *freq;
            self.dr_ranges[i] = default_range;
        }
    }

    fn default_dr_range(&self) -> DataRateRange {
        DataRateRange::new_range(DR::_0, DR::_5)
    }

    pub(crate) fn datarate(&self, dr: u8) -> Option<&'static Datarate> {
        region_dispatch!(self, datarates)
            .get(dr as usize)
            .and_then(|slot| slot.as_ref())
    }

    pub(crate) fn validate_dr(&self, dr: u8) -> bool {
        self.datarate(dr).is_some()
    }

    /// The M value: maximum MAC payload for a data rate, 0 when the data
    /// rate is not defined.
    pub(crate) fn max_payload(&self, dr: u8) -> u8 {
        self.datarate(dr).map_or(0, |d| d.max_mac_payload_size)
    }

    /// The RX1 data rate resulting from the last uplink data rate and the
    /// DLSettings offset.
    pub(crate) fn rx1_dr_offset(&self, last_dr: u8, offset: u8) -> u8 {
        last_dr.saturating_sub(offset)
    }

    pub(crate) fn rx2_frequency(&self) -> u32 {
        region_dispatch!(self, rx2_frequency)
    }

    pub(crate) fn default_rx2_data_rate(&self) -> u8 {
        region_dispatch!(self, default_rx2_data_rate)
    }

    /// Picks a transmit frequency uniformly among the populated channels.
    pub(crate) fn pick_channel<G: RngCore>(&self, rng: &mut G) -> u32 {
        let populated = self.channels.iter().filter(|f| **f != 0).count();
        let nth = rng.next_u32() as usize % populated;
        // the table always holds the region defaults, so `nth` hits
        self.channels.iter().copied().filter(|f| *f != 0).nth(nth).unwrap_or(self.channels[0])
    }

    /// Appends the up-to-5 CFList channels after the region defaults.
    /// A zero frequency leaves the slot empty.
    pub(crate) fn process_cflist(&mut self, cf_list: &[Frequency<'_>; 5]) {
        let base = region_dispatch!(self, join_channels).len();
        let default_range = self.default_dr_range();
        for (i, freq) in cf_list.iter().enumerate() {
            let Some(slot) = base.checked_add(i).filter(|idx| *idx < MAX_CHANNELS) else {
                break;
            };
            let value = freq.value();
            self.channels[slot] = value;
            self.dr_ranges[slot] = if value != 0 {
                default_range
            } else {
                DataRateRange::new_from_raw(0)
            };
        }
    }

    /// The populated channel table entries as (frequency, DR range) pairs.
    pub fn channels(&self) -> impl Iterator<Item = (u32, DataRateRange)> + '_ {
        self.channels
            .iter()
            .zip(self.dr_ranges.iter())
            .filter(|(f, _)| **f != 0)
            .map(|(f, r)| (*f, *r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "region-eu868")]
    fn eu868_defaults() {
        let cfg = Configuration::new(Region::EU868);
        let channels: Vec<_> = cfg.channels().collect();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].0, 868_100_000);
        assert_eq!(channels[1].0, 868_300_000);
        assert_eq!(channels[2].0, 868_500_000);
        assert_eq!(channels[0].1.min_data_rate(), 0);
        assert_eq!(channels[0].1.max_data_rate(), 5);

        assert!(cfg.validate_dr(0));
        assert!(cfg.validate_dr(6));
        assert!(!cfg.validate_dr(7));
        assert_eq!(cfg.max_payload(0), 59);
        assert_eq!(cfg.max_payload(3), 123);
        assert_eq!(cfg.max_payload(5), 250);
        assert_eq!(cfg.rx2_frequency(), 869_525_000);
        assert_eq!(cfg.default_rx2_data_rate(), 0);
    }

    #[test]
    fn rx1_offset_saturates_at_dr0() {
        let cfg = Configuration::new(default_region());
        assert_eq!(cfg.rx1_dr_offset(5, 2), 3);
        assert_eq!(cfg.rx1_dr_offset(1, 3), 0);
    }

    #[test]
    fn cflist_extends_and_reset_restores() {
        let mut cfg = Configuration::new(default_region());
        let freqs = [
            Frequency::new(&[0x18, 0x4F, 0x84]).unwrap(),
            Frequency::new(&[0x48, 0x57, 0x84]).unwrap(),
            Frequency::new(&[0x00, 0x00, 0x00]).unwrap(),
            Frequency::new(&[0x00, 0x00, 0x00]).unwrap(),
            Frequency::new(&[0x00, 0x00, 0x00]).unwrap(),
        ];
        cfg.process_cflist(&freqs);
        let channels: Vec<_> = cfg.channels().collect();
        assert_eq!(channels.len(), 5);
        assert_eq!(channels[3].0, 867_100_000);
        assert_eq!(channels[4].0, 867_300_000);

        cfg.reset_channels();
        assert_eq!(cfg.channels().count(), 3);
    }

    #[test]
    fn picked_channels_come_from_the_table() {
        let mut rng = crate::test_util::FixedRng::cycle(&[0, 1, 2, 3, 4, 5, 6]);
        let cfg = Configuration::new(default_region());
        for _ in 0..7 {
            let freq = cfg.pick_channel(&mut rng);
            assert!(cfg.channels().any(|(f, _)| f == freq));
        }
    }

    fn default_region() -> Region {
        #[cfg(feature = "region-eu868")]
        return Region::EU868;
        #[cfg(all(feature = "region-eu433", not(feature = "region-eu868")))]
        return Region::EU433;
    }
}
