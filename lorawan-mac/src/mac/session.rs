use lorawan_codec::keys::{AppSKey, NwkSKey};
use lorawan_codec::parser::DevAddr;

/// How the current session came to be, if at all.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Activation {
    #[default]
    None,
    Abp,
    Otaa,
}

/// Session material shared by the codec paths: the device address and the
/// two session keys. Counters live with the MCPS state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Session {
    pub dev_addr: DevAddr<[u8; 4]>,
    pub nwkskey: NwkSKey,
    pub appskey: AppSKey,
}
