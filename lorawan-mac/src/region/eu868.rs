use super::{Bandwidth, ChannelRegion, Datarate, SpreadingFactor, NUM_DATARATES};

const JOIN_CHANNELS: [u32; 3] = [868_100_000, 868_300_000, 868_500_000];

#[derive(Default, Clone)]
#[allow(clippy::upper_case_acronyms)]
pub(crate) struct EU868;

impl ChannelRegion for EU868 {
    fn datarates() -> &'static [Option<Datarate>; NUM_DATARATES] {
        &DATARATES
    }

    fn join_channels() -> &'static [u32] {
        &JOIN_CHANNELS
    }

    fn rx2_frequency() -> u32 {
        869_525_000
    }

    fn default_rx2_data_rate() -> u8 {
        0
    }
}

pub(crate) const DATARATES: [Option<Datarate>; NUM_DATARATES] = [
    Some(Datarate {
        spreading_factor: SpreadingFactor::_12,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 59,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_11,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 59,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_10,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 59,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_9,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 123,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_8,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 250,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_7,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 250,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_7,
        bandwidth: Bandwidth::_250KHz,
        max_mac_payload_size: 250,
    }),
    // FSK data rate intentionally left out
    None,
];
