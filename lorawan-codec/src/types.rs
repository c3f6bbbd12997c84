//! Wire-level primitives shared between frames and MAC commands.

/// `DR` is a data-rate index in `0..=15`; the mapping to a (spreading factor,
/// bandwidth) pair is region specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DR {
    _0 = 0,
    _1 = 1,
    _2 = 2,
    _3 = 3,
    _4 = 4,
    _5 = 5,
    _6 = 6,
    _7 = 7,
    _8 = 8,
    _9 = 9,
    _10 = 10,
    _11 = 11,
    _12 = 12,
    _13 = 13,
    _14 = 14,
    _15 = 15,
}

impl DR {
    /// Lowers the data rate by `val` steps, saturating at DR0.
    pub fn offset_sub(&self, val: u8) -> DR {
        u8::try_into((*self as u8).saturating_sub(val)).unwrap()
    }
}

impl TryFrom<u8> for DR {
    type Error = core::convert::Infallible;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        let dr = match v & 0xf {
            0 => DR::_0,
            1 => DR::_1,
            2 => DR::_2,
            3 => DR::_3,
            4 => DR::_4,
            5 => DR::_5,
            6 => DR::_6,
            7 => DR::_7,
            8 => DR::_8,
            9 => DR::_9,
            10 => DR::_10,
            11 => DR::_11,
            12 => DR::_12,
            13 => DR::_13,
            14 => DR::_14,
            _ => DR::_15,
        };
        Ok(dr)
    }
}

/// A channel's data-rate range byte: minimum DR in the low nibble, maximum DR
/// in the high nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DataRateRange(u8);

impl DataRateRange {
    pub fn new_from_raw(byte: u8) -> DataRateRange {
        DataRateRange(byte)
    }

    /// Builds a range from lower and upper bounds, both inclusive.
    pub fn new_range(min: DR, max: DR) -> Self {
        DataRateRange(((max as u8) << 4) | min as u8)
    }

    pub fn max_data_rate(&self) -> u8 {
        self.0 >> 4
    }

    pub fn min_data_rate(&self) -> u8 {
        self.0 & 0x0f
    }

    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for DataRateRange {
    fn from(v: u8) -> Self {
        DataRateRange(v)
    }
}

/// The DLSettings byte of a join accept: RX1 DR offset in bits \[6:4\], RX2
/// data rate in bits \[3:0\].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DLSettings(u8);

impl DLSettings {
    pub fn new(byte: u8) -> DLSettings {
        DLSettings(byte)
    }

    /// Offset between the uplink data rate and the RX1 downlink data rate.
    pub fn rx1_dr_offset(&self) -> u8 {
        (self.0 >> 4) & 0x07
    }

    /// The data rate of the second receive window.
    pub fn rx2_data_rate(&self) -> u8 {
        self.0 & 0x0f
    }

    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for DLSettings {
    fn from(v: u8) -> Self {
        DLSettings(v)
    }
}

/// A channel's central frequency as carried in a CFList: 3 bytes,
/// little-endian, in units of 100 Hz.
#[derive(Debug, PartialEq, Eq)]
pub struct Frequency<'a>(&'a [u8]);

impl<'a> Frequency<'a> {
    /// Constructs a Frequency without checking the slice length.
    ///
    /// The slice must be exactly 3 bytes long.
    pub fn new_from_raw(bytes: &'a [u8]) -> Self {
        Frequency(bytes)
    }

    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() != 3 {
            return None;
        }
        Some(Frequency(bytes))
    }

    /// The frequency in Hz.
    pub fn value(&self) -> u32 {
        ((u32::from(self.0[2]) << 16) + (u32::from(self.0[1]) << 8) + u32::from(self.0[0])) * 100
    }
}

impl<'a> From<&'a [u8; 3]> for Frequency<'a> {
    fn from(v: &'a [u8; 3]) -> Self {
        Frequency(&v[..])
    }
}

impl AsRef<[u8]> for Frequency<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}
