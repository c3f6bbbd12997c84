//! Types and methods for parsing received LoRaWAN payloads.
//!
//! Parsing is zero-copy: the typed payloads borrow (or own) the raw byte
//! buffer and expose accessors over it. Decryption reuses the same memory,
//! which is why it consumes the encrypted payload and hands back a decrypted
//! one.

use super::keys::{AppKey, AppSKey, CryptoFactory, Encrypter, NwkSKey, AES128, MIC};
use super::packet_length::phy::{join::*, mac::FPORT_LEN};
use super::packet_length::phy::{MHDR_LEN, MIC_LEN, PHY_PAYLOAD_MIN_LEN};
use super::securityhelpers;
use super::types::{DLSettings, Frequency};

#[cfg(feature = "default-crypto")]
use super::default_crypto::DefaultFactory;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    InvalidData,
    InvalidMic,
    InvalidKey,
    InvalidMessageType,
    InvalidPayload,
    UnsupportedMajorVersion,
}

macro_rules! fixed_len_struct {
    (
        $(#[$outer:meta])*
        struct $type:ident[$size:expr];
    ) => {
        $(#[$outer])*
        #[derive(Debug, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $type<T: AsRef<[u8]>>(T);

        impl<T: AsRef<[u8]>> $type<T> {
            fn new_from_raw(bytes: T) -> $type<T> {
                $type(bytes)
            }

            pub fn new(data: T) -> Option<$type<T>> {
                if data.as_ref().len() != $size {
                    None
                } else {
                    Some($type(data))
                }
            }

            #[inline]
            pub fn to_owned(&self) -> $type<[u8; $size]> {
                let mut data = [0u8; $size];
                data.copy_from_slice(self.0.as_ref());
                $type(data)
            }
        }

        impl<T: AsRef<[u8]> + Clone> Clone for $type<T> {
            fn clone(&self) -> Self {
                Self(self.0.clone())
            }
        }

        impl<T: AsRef<[u8]> + Copy> Copy for $type<T> {}

        impl<T: AsRef<[u8]>, V: AsRef<[u8]>> PartialEq<$type<T>> for $type<V> {
            fn eq(&self, other: &$type<T>) -> bool {
                self.as_ref() == other.as_ref()
            }
        }

        impl<'a> From<&'a [u8; $size]> for $type<&'a [u8; $size]> {
            fn from(v: &'a [u8; $size]) -> Self {
                $type(v)
            }
        }

        impl From<[u8; $size]> for $type<[u8; $size]> {
            fn from(v: [u8; $size]) -> Self {
                $type(v)
            }
        }

        impl<T: AsRef<[u8]>> AsRef<[u8]> for $type<T> {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl<T: AsRef<[u8]> + Default> Default for $type<T> {
            #[inline]
            fn default() -> $type<T> {
                $type(T::default())
            }
        }
    };
}

fixed_len_struct! {
    /// A 64-bit extended unique identifier, stored in wire (LSB-first) order.
    struct EUI64[8];
}

fixed_len_struct! {
    /// The 16-bit device nonce of a join request, stored in wire order.
    struct DevNonce[2];
}

impl From<u16> for DevNonce<[u8; 2]> {
    fn from(v: u16) -> Self {
        Self::from(v.to_le_bytes())
    }
}

impl From<DevNonce<[u8; 2]>> for u16 {
    fn from(v: DevNonce<[u8; 2]>) -> Self {
        u16::from_le_bytes(v.0)
    }
}

fixed_len_struct! {
    /// The 24-bit server nonce of a join accept, stored in wire order.
    struct AppNonce[3];
}

fixed_len_struct! {
    /// A 32-bit device address, stored in wire (LSB-first) order.
    struct DevAddr[4];
}

impl From<u32> for DevAddr<[u8; 4]> {
    fn from(v: u32) -> Self {
        Self::from(v.to_le_bytes())
    }
}

impl From<DevAddr<[u8; 4]>> for u32 {
    fn from(v: DevAddr<[u8; 4]>) -> Self {
        u32::from_le_bytes(v.0)
    }
}

fixed_len_struct! {
    /// The 24-bit network identifier of a join accept, stored in wire order.
    struct NwkAddr[3];
}

/// MHDR is the first byte of every frame: message type in bits \[7:5\],
/// major version in bits \[1:0\].
#[derive(Debug, PartialEq, Eq)]
pub struct MHDR(u8);

impl MHDR {
    pub fn new(byte: u8) -> MHDR {
        MHDR(byte)
    }

    pub fn mtype(&self) -> MType {
        match self.0 >> 5 {
            0 => MType::JoinRequest,
            1 => MType::JoinAccept,
            2 => MType::UnconfirmedDataUp,
            3 => MType::UnconfirmedDataDown,
            4 => MType::ConfirmedDataUp,
            5 => MType::ConfirmedDataDown,
            6 => MType::RFU,
            _ => MType::Proprietary,
        }
    }

    pub fn major(&self) -> Major {
        if self.0.trailing_zeros() >= 2 {
            Major::LoRaWANR1
        } else {
            Major::RFU
        }
    }
}

impl From<u8> for MHDR {
    fn from(v: u8) -> Self {
        MHDR(v)
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MType {
    JoinRequest,
    JoinAccept,
    UnconfirmedDataUp,
    UnconfirmedDataDown,
    ConfirmedDataUp,
    ConfirmedDataDown,
    RFU,
    Proprietary,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Major {
    LoRaWANR1,
    RFU,
}

/// A parsed physical payload: join request, join accept or data frame.
#[derive(Debug, PartialEq, Eq)]
pub enum PhyPayload<T, F> {
    JoinRequest(JoinRequestPayload<T, F>),
    JoinAccept(JoinAcceptPayload<T, F>),
    Data(DataPayload<T, F>),
}

impl<T: AsRef<[u8]>, F> AsRef<[u8]> for PhyPayload<T, F> {
    fn as_ref(&self) -> &[u8] {
        match self {
            PhyPayload::JoinRequest(jr) => jr.as_bytes(),
            PhyPayload::JoinAccept(ja) => ja.as_bytes(),
            PhyPayload::Data(data) => data.as_bytes(),
        }
    }
}

/// A join accept, encrypted as received or already decrypted.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinAcceptPayload<T, F> {
    Encrypted(EncryptedJoinAcceptPayload<T, F>),
    Decrypted(DecryptedJoinAcceptPayload<T, F>),
}

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for JoinAcceptPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        match self {
            JoinAcceptPayload::Encrypted(e) => e.as_bytes(),
            JoinAcceptPayload::Decrypted(d) => d.as_bytes(),
        }
    }
}

/// A data frame (confirmed or unconfirmed, up or down), encrypted as
/// received or already decrypted.
#[derive(Debug, PartialEq, Eq)]
pub enum DataPayload<T, F> {
    Encrypted(EncryptedDataPayload<T, F>),
    Decrypted(DecryptedDataPayload<T>),
}

impl<T: AsRef<[u8]>, F> DataHeader for DataPayload<T, F> {
    fn as_data_bytes(&self) -> &[u8] {
        match self {
            DataPayload::Encrypted(data) => data.as_data_bytes(),
            DataPayload::Decrypted(data) => data.as_data_bytes(),
        }
    }
}

/// Marker trait distinguishing frame types from arbitrary `AsRef<[u8]>`.
pub trait AsPhyPayloadBytes {
    fn as_bytes(&self) -> &[u8];
}

/// The trailing 4-byte MIC, present on every frame type.
pub trait MICAble {
    fn mic(&self) -> MIC;
}

impl<T: AsPhyPayloadBytes> MICAble for T {
    fn mic(&self) -> MIC {
        let data = self.as_bytes();
        let len = data.len();
        MIC([data[len - 4], data[len - 3], data[len - 2], data[len - 1]])
    }
}

/// Join request as transmitted by a device.
#[derive(Debug, PartialEq, Eq)]
pub struct JoinRequestPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for JoinRequestPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>, F: CryptoFactory> JoinRequestPayload<T, F> {
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        if !Self::can_build_from(data.as_ref()) {
            Err(Error::InvalidData)
        } else {
            Ok(Self(data, factory))
        }
    }

    fn can_build_from(bytes: &[u8]) -> bool {
        bytes.len() == JOIN_REQUEST_LEN && MHDR(bytes[0]).mtype() == MType::JoinRequest
    }

    pub fn app_eui(&self) -> EUI64<&[u8]> {
        EUI64::new_from_raw(&self.0.as_ref()[1..9])
    }

    pub fn dev_eui(&self) -> EUI64<&[u8]> {
        EUI64::new_from_raw(&self.0.as_ref()[9..17])
    }

    pub fn dev_nonce(&self) -> DevNonce<&[u8]> {
        DevNonce::new_from_raw(&self.0.as_ref()[17..19])
    }

    pub fn validate_mic(&self, key: &AppKey) -> bool {
        let d = self.0.as_ref();
        self.mic() == securityhelpers::calculate_mic(&d[..d.len() - MIC_LEN], self.1.new_mac(&key.0))
    }
}

/// Join accept bytes as they came off the air.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedJoinAcceptPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for EncryptedJoinAcceptPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> EncryptedJoinAcceptPayload<T, F> {
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        if Self::can_build_from(data.as_ref()) {
            Ok(Self(data, factory))
        } else {
            Err(Error::InvalidData)
        }
    }

    fn can_build_from(bytes: &[u8]) -> bool {
        (bytes.len() == JOIN_ACCEPT_LEN || bytes.len() == JOIN_ACCEPT_WITH_CFLIST_LEN)
            && MHDR(bytes[0]).mtype() == MType::JoinAccept
    }

    /// Decrypts the body in place. The server ran AES *decryption* over the
    /// plaintext, so the device recovers it with AES encryption, one or two
    /// 16-byte blocks after the MHDR. Does not verify the MIC.
    pub fn decrypt(mut self, key: &AppKey) -> DecryptedJoinAcceptPayload<T, F> {
        {
            let bytes = self.0.as_mut();
            let len = bytes.len();
            let aes_enc = self.1.new_enc(&key.0);

            for i in 0..(len >> 4) {
                let start = (i << 4) + 1;
                aes_enc.encrypt_block(&mut bytes[start..(start + 16)]);
            }
        }
        DecryptedJoinAcceptPayload(self.0, self.1)
    }
}

/// Join accept with its body decrypted.
#[derive(Debug, PartialEq, Eq)]
pub struct DecryptedJoinAcceptPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for DecryptedJoinAcceptPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> DecryptedJoinAcceptPayload<T, F> {
    /// Decrypts a received join accept and verifies its MIC in one step.
    pub fn new_with_factory(data: T, key: &AppKey, factory: F) -> Result<Self, Error> {
        let t = EncryptedJoinAcceptPayload::new_with_factory(data, factory)?;
        let res = t.decrypt(key);
        if res.validate_mic(key) {
            Ok(res)
        } else {
            Err(Error::InvalidMic)
        }
    }
}

impl<T: AsRef<[u8]>, F: CryptoFactory> DecryptedJoinAcceptPayload<T, F> {
    pub fn validate_mic(&self, key: &AppKey) -> bool {
        let d = self.0.as_ref();
        self.mic() == securityhelpers::calculate_mic(&d[..d.len() - MIC_LEN], self.1.new_mac(&key.0))
    }

    /// Derives the network session key from this join accept and the device
    /// nonce of the matching join request.
    pub fn derive_nwkskey<TT: AsRef<[u8]>>(&self, dev_nonce: &DevNonce<TT>, key: &AppKey) -> NwkSKey {
        NwkSKey(self.derive_session_key(0x1, dev_nonce, &key.0))
    }

    /// Derives the application session key from this join accept and the
    /// device nonce of the matching join request.
    pub fn derive_appskey<TT: AsRef<[u8]>>(&self, dev_nonce: &DevNonce<TT>, key: &AppKey) -> AppSKey {
        AppSKey(self.derive_session_key(0x2, dev_nonce, &key.0))
    }

    fn derive_session_key<TT: AsRef<[u8]>>(
        &self,
        pad: u8,
        dev_nonce: &DevNonce<TT>,
        key: &AES128,
    ) -> AES128 {
        let cipher = self.1.new_enc(key);

        // AppNonce is 24 bits, NetID 24 bits, DevNonce 16 bits; all in wire
        // order, zero padded to one AES block.
        let mut block = [0u8; 16];
        block[0] = pad;
        block[1..4].copy_from_slice(self.app_nonce().as_ref());
        block[4..7].copy_from_slice(self.net_id().as_ref());
        block[7..9].copy_from_slice(dev_nonce.as_ref());

        cipher.encrypt_block(&mut block);
        AES128(block)
    }
}

impl<T: AsRef<[u8]>, F> DecryptedJoinAcceptPayload<T, F> {
    pub fn app_nonce(&self) -> AppNonce<&[u8]> {
        const OFFSET: usize = MHDR_LEN;
        AppNonce::new_from_raw(&self.0.as_ref()[OFFSET..OFFSET + APP_NONCE_LEN])
    }

    pub fn net_id(&self) -> NwkAddr<&[u8]> {
        const OFFSET: usize = MHDR_LEN + APP_NONCE_LEN;
        NwkAddr::new_from_raw(&self.0.as_ref()[OFFSET..OFFSET + NET_ID_LEN])
    }

    pub fn dev_addr(&self) -> DevAddr<&[u8]> {
        const OFFSET: usize = MHDR_LEN + APP_NONCE_LEN + NET_ID_LEN;
        DevAddr::new_from_raw(&self.0.as_ref()[OFFSET..OFFSET + DEV_ADDR_LEN])
    }

    pub fn dl_settings(&self) -> DLSettings {
        const OFFSET: usize = MHDR_LEN + APP_NONCE_LEN + NET_ID_LEN + DEV_ADDR_LEN;
        DLSettings::new(self.0.as_ref()[OFFSET])
    }

    /// RX1 delay in seconds, still raw: value 0 means the 1 s default.
    pub fn rx_delay(&self) -> u8 {
        const OFFSET: usize =
            MHDR_LEN + APP_NONCE_LEN + NET_ID_LEN + DEV_ADDR_LEN + DL_SETTINGS_LEN;
        self.0.as_ref()[OFFSET] & 0x0f
    }

    /// The optional CFList: five 3-byte channel frequencies. Only CFList
    /// type 0 (a list of dynamic channels) is understood.
    pub fn c_f_list(&self) -> Option<[Frequency<'_>; 5]> {
        let d = self.0.as_ref();
        if d.len() != JOIN_ACCEPT_WITH_CFLIST_LEN || d[28] != 0 {
            return None;
        }
        Some([
            Frequency::new_from_raw(&d[13..16]),
            Frequency::new_from_raw(&d[16..19]),
            Frequency::new_from_raw(&d[19..22]),
            Frequency::new_from_raw(&d[22..25]),
            Frequency::new_from_raw(&d[25..28]),
        ])
    }
}

/// Accessors shared between encrypted and decrypted data frames.
///
/// Does not re-check the payload size; that happened when the frame was
/// built.
pub trait DataHeader {
    fn as_data_bytes(&self) -> &[u8];

    fn fhdr(&self) -> FHDR<'_> {
        FHDR::new_from_raw(&self.as_data_bytes()[1..(1 + self.fhdr_length())], self.is_uplink())
    }

    fn is_confirmed(&self) -> bool {
        let mtype = MHDR(self.as_data_bytes()[0]).mtype();
        mtype == MType::ConfirmedDataUp || mtype == MType::ConfirmedDataDown
    }

    fn is_uplink(&self) -> bool {
        let mtype = MHDR(self.as_data_bytes()[0]).mtype();
        mtype == MType::UnconfirmedDataUp || mtype == MType::ConfirmedDataUp
    }

    fn f_port(&self) -> Option<u8> {
        let fhdr_length = self.fhdr_length();
        let data = self.as_data_bytes();
        if 1 + fhdr_length < data.len() - 4 {
            Some(data[1 + fhdr_length])
        } else {
            None
        }
    }

    fn fhdr_length(&self) -> usize {
        fhdr_length(self.as_data_bytes()[5])
    }
}

fn fhdr_length(fctrl: u8) -> usize {
    7 + (fctrl & 0x0f) as usize
}

impl<T: DataHeader> AsPhyPayloadBytes for T {
    fn as_bytes(&self) -> &[u8] {
        self.as_data_bytes()
    }
}

/// Data frame bytes as they came off the air.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedDataPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> DataHeader for EncryptedDataPayload<T, F> {
    fn as_data_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>, F: CryptoFactory> EncryptedDataPayload<T, F> {
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        if Self::can_build_from(data.as_ref()) {
            Ok(Self(data, factory))
        } else {
            Err(Error::InvalidData)
        }
    }

    fn can_build_from(bytes: &[u8]) -> bool {
        // The smallest data frame is MHDR + bare FHDR + MIC.
        if bytes.len() < PHY_PAYLOAD_MIN_LEN || 5 + fhdr_length(bytes[5]) > bytes.len() {
            return false;
        }

        matches!(
            MHDR(bytes[0]).mtype(),
            MType::ConfirmedDataUp
                | MType::ConfirmedDataDown
                | MType::UnconfirmedDataUp
                | MType::UnconfirmedDataDown
        )
    }

    /// Verifies the MIC against the network session key. `fcnt` is the full
    /// 32-bit counter the frame is assumed to carry.
    pub fn validate_mic(&self, key: &NwkSKey, fcnt: u32) -> bool {
        let d = self.0.as_ref();
        self.mic()
            == securityhelpers::calculate_data_mic(
                &d[..d.len() - MIC_LEN],
                self.1.new_mac(&key.0),
                fcnt,
            )
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> EncryptedDataPayload<T, F> {
    /// Decrypts the FRMPayload in place, consuming the encrypted frame. The
    /// MIC is not verified here.
    ///
    /// FPort 0 selects the network session key (the payload carries MAC
    /// commands); any other port selects the application session key. A
    /// frame without FRMPayload passes through untouched.
    pub fn decrypt(
        mut self,
        nwk_skey: Option<&NwkSKey>,
        app_skey: Option<&AppSKey>,
        fcnt: u32,
    ) -> Result<DecryptedDataPayload<T>, Error> {
        let fhdr_length = self.fhdr_length();
        let key = if self.f_port().unwrap_or(0) != 0 {
            app_skey.map(|k| &k.0)
        } else {
            nwk_skey.map(|k| &k.0)
        };

        let data = self.0.as_mut();
        let len = data.len();
        let start = MHDR_LEN + fhdr_length + FPORT_LEN;
        let end = len - MIC_LEN;
        if start < end {
            let Some(key) = key else {
                return Err(Error::InvalidKey);
            };
            securityhelpers::encrypt_frm_data_payload(data, start, end, fcnt, &self.1.new_enc(key));
        }

        Ok(DecryptedDataPayload(self.0))
    }
}

/// Data frame with its FRMPayload decrypted.
#[derive(Debug, PartialEq, Eq)]
pub struct DecryptedDataPayload<T>(T);

impl<T: AsRef<[u8]>> DataHeader for DecryptedDataPayload<T> {
    fn as_data_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>> DecryptedDataPayload<T> {
    /// The FRMPayload: application data, MAC commands when FPort is 0, or
    /// nothing.
    pub fn frm_payload(&self) -> FRMPayload<'_> {
        let data = self.as_data_bytes();
        let len = data.len();
        let fhdr_length = self.fhdr_length();
        if len < fhdr_length + MHDR_LEN + FPORT_LEN + MIC_LEN + 1 {
            FRMPayload::None
        } else if self.f_port() != Some(0) {
            // the length check above guarantees the FPort byte exists
            FRMPayload::Data(&data[(1 + fhdr_length + 1)..(len - 4)])
        } else {
            FRMPayload::MACCommands(FRMMacCommands::new(
                &data[(1 + fhdr_length + 1)..(len - 4)],
                self.is_uplink(),
            ))
        }
    }
}

/// Parses bytes as a LoRaWAN physical payload using the default software
/// crypto.
#[cfg(feature = "default-crypto")]
pub fn parse<T: AsRef<[u8]> + AsMut<[u8]>>(data: T) -> Result<PhyPayload<T, DefaultFactory>, Error> {
    parse_with_factory(data, DefaultFactory)
}

/// Parses bytes as a LoRaWAN physical payload with the given crypto factory.
pub fn parse_with_factory<T, F>(data: T, factory: F) -> Result<PhyPayload<T, F>, Error>
where
    T: AsRef<[u8]> + AsMut<[u8]>,
    F: CryptoFactory,
{
    let bytes = data.as_ref();
    if bytes.len() < PHY_PAYLOAD_MIN_LEN {
        return Err(Error::InvalidPayload);
    }
    let mhdr = MHDR(bytes[0]);
    if mhdr.major() != Major::LoRaWANR1 {
        return Err(Error::UnsupportedMajorVersion);
    }
    match mhdr.mtype() {
        MType::JoinRequest => {
            Ok(PhyPayload::JoinRequest(JoinRequestPayload::new_with_factory(data, factory)?))
        }
        MType::JoinAccept => Ok(PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(
            EncryptedJoinAcceptPayload::new_with_factory(data, factory)?,
        ))),
        MType::UnconfirmedDataUp
        | MType::ConfirmedDataUp
        | MType::UnconfirmedDataDown
        | MType::ConfirmedDataDown => Ok(PhyPayload::Data(DataPayload::Encrypted(
            EncryptedDataPayload::new_with_factory(data, factory)?,
        ))),
        _ => Err(Error::InvalidMessageType),
    }
}

/// The frame header of a data frame: DevAddr, FCtrl, FCnt and FOpts.
#[derive(Debug, PartialEq, Eq)]
pub struct FHDR<'a>(&'a [u8], bool);

impl<'a> FHDR<'a> {
    pub fn new_from_raw(bytes: &'a [u8], uplink: bool) -> FHDR<'a> {
        FHDR(bytes, uplink)
    }

    pub fn new(bytes: &'a [u8], uplink: bool) -> Option<FHDR<'a>> {
        let data_len = bytes.len();
        if data_len < 7 || data_len < fhdr_length(bytes[4]) {
            return None;
        }
        Some(FHDR(bytes, uplink))
    }

    pub fn dev_addr(&self) -> DevAddr<&'a [u8]> {
        DevAddr::new_from_raw(&self.0[0..4])
    }

    pub fn fctrl(&self) -> FCtrl {
        FCtrl(self.0[4], self.1)
    }

    /// The truncated 16-bit frame counter carried on the wire.
    pub fn fcnt(&self) -> u16 {
        u16::from_le_bytes([self.0[5], self.0[6]])
    }

    pub fn fopts_len(&self) -> u8 {
        FCtrl(self.0[4], self.1).f_opts_len()
    }

    /// The raw FOpts bytes.
    pub fn data(&self) -> &'a [u8] {
        &self.0[7..(7 + self.fopts_len() as usize)]
    }
}

/// The FCtrl byte together with the frame direction it was read from.
#[derive(Debug, PartialEq, Eq)]
pub struct FCtrl(pub u8, pub bool);

impl FCtrl {
    pub fn new(byte: u8, uplink: bool) -> FCtrl {
        FCtrl(byte, uplink)
    }

    pub fn set_adr(&mut self) {
        self.0 |= 1 << 7;
    }

    pub fn adr(&self) -> bool {
        self.0 >> 7 == 1
    }

    pub fn set_adr_ack_req(&mut self) {
        self.0 |= 1 << 6;
    }

    pub fn adr_ack_req(&self) -> bool {
        self.1 && self.0 & (1 << 6) != 0
    }

    pub fn set_ack(&mut self) {
        self.0 |= 1 << 5;
    }

    pub fn ack(&self) -> bool {
        self.0 & (1 << 5) != 0
    }

    /// Downlink only: the network has more data pending for the device.
    pub fn f_pending(&self) -> bool {
        !self.1 && self.0 & (1 << 4) != 0
    }

    pub fn f_opts_len(&self) -> u8 {
        self.0 & 0x0f
    }

    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

/// FRMPayload content: application data or MAC commands.
#[derive(Debug, PartialEq, Eq)]
pub enum FRMPayload<'a> {
    Data(&'a [u8]),
    MACCommands(FRMMacCommands<'a>),
    None,
}

/// MAC commands carried in the FRMPayload (FPort 0).
#[derive(Debug, PartialEq, Eq)]
pub struct FRMMacCommands<'a>(bool, &'a [u8]);

impl<'a> FRMMacCommands<'a> {
    pub fn new(bytes: &'a [u8], uplink: bool) -> Self {
        FRMMacCommands(uplink, bytes)
    }

    pub fn data(&self) -> &'a [u8] {
        self.1
    }
}
