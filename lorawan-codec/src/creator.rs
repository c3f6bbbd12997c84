//! Types and methods for building LoRaWAN payloads into caller-provided
//! buffers.

use super::keys::{self, CryptoFactory, Decrypter};
use super::maccommands::{build_mac_commands, mac_commands_len, SerializableMacCommand};
use super::packet_length::phy::join::{JOIN_ACCEPT_LEN, JOIN_ACCEPT_WITH_CFLIST_LEN, JOIN_REQUEST_LEN};
use super::parser;
use super::securityhelpers;
use super::types::Frequency;

#[cfg(feature = "default-crypto")]
use super::default_crypto::DefaultFactory;

/// MAC commands riding in FOpts may take at most 15 bytes.
const PIGGYBACK_MAC_COMMANDS_MAX_LEN: usize = 15;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    BufferTooShort,
    MacCommandTooBigForFOpts,
    DataAndMacCommandsInPayloadNotAllowed,
    FPortMustBeProvided,
    TooManyFrequencies,
}

fn set_mic<F: CryptoFactory>(data: &mut [u8], key: &keys::AES128, factory: &F) {
    let len = data.len();
    let mic = securityhelpers::calculate_mic(&data[..len - 4], factory.new_mac(key));
    data[len - 4..].copy_from_slice(&mic.0[..]);
}

/// JoinRequestCreator builds the binary representation of a join request.
pub struct JoinRequestCreator<D, F> {
    data: D,
    factory: F,
}

impl<D: AsMut<[u8]>, F: CryptoFactory> JoinRequestCreator<D, F> {
    /// Creates a well initialized JoinRequestCreator over the given buffer
    /// with specific crypto functions.
    pub fn with_options(mut data: D, factory: F) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < JOIN_REQUEST_LEN {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x00;
        Ok(Self { data, factory })
    }

    pub fn set_app_eui<H: AsRef<[u8]>, T: Into<parser::EUI64<H>>>(&mut self, app_eui: T) -> &mut Self {
        let converted = app_eui.into();
        self.data.as_mut()[1..9].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_dev_eui<H: AsRef<[u8]>, T: Into<parser::EUI64<H>>>(&mut self, dev_eui: T) -> &mut Self {
        let converted = dev_eui.into();
        self.data.as_mut()[9..17].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_dev_nonce<H: AsRef<[u8]>, T: Into<parser::DevNonce<H>>>(
        &mut self,
        dev_nonce: T,
    ) -> &mut Self {
        let converted = dev_nonce.into();
        self.data.as_mut()[17..19].copy_from_slice(converted.as_ref());
        self
    }

    /// Provides the binary representation of the join request with the MIC
    /// set, 23 bytes.
    pub fn build(&mut self, key: &keys::AppKey) -> &[u8] {
        let d = &mut self.data.as_mut()[..JOIN_REQUEST_LEN];
        set_mic(d, &key.0, &self.factory);
        d
    }
}

/// JoinAcceptCreator builds the binary representation of a join accept, as a
/// network server (or a test harness) would.
pub struct JoinAcceptCreator<D, F> {
    data: D,
    with_c_f_list: bool,
    encrypted: bool,
    factory: F,
}

impl<D: AsMut<[u8]>, F: CryptoFactory> JoinAcceptCreator<D, F> {
    /// Creates a well initialized JoinAcceptCreator over the given buffer
    /// with specific crypto functions.
    pub fn with_options(mut data: D, factory: F) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < JOIN_ACCEPT_LEN {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x20;
        Ok(Self { data, with_c_f_list: false, encrypted: false, factory })
    }

    pub fn set_app_nonce<H: AsRef<[u8]>, T: Into<parser::AppNonce<H>>>(
        &mut self,
        app_nonce: T,
    ) -> &mut Self {
        let converted = app_nonce.into();
        self.data.as_mut()[1..4].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_net_id<H: AsRef<[u8]>, T: Into<parser::NwkAddr<H>>>(&mut self, net_id: T) -> &mut Self {
        let converted = net_id.into();
        self.data.as_mut()[4..7].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_dev_addr<H: AsRef<[u8]>, T: Into<parser::DevAddr<H>>>(
        &mut self,
        dev_addr: T,
    ) -> &mut Self {
        let converted = dev_addr.into();
        self.data.as_mut()[7..11].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_dl_settings<T: Into<super::types::DLSettings>>(&mut self, dl_settings: T) -> &mut Self {
        self.data.as_mut()[11] = dl_settings.into().raw_value();
        self
    }

    pub fn set_rx_delay(&mut self, rx_delay: u8) -> &mut Self {
        self.data.as_mut()[12] = rx_delay;
        self
    }

    /// Sets the optional CFList, up to five extra channel frequencies.
    pub fn set_c_f_list<'a, C: AsRef<[Frequency<'a>]>>(&mut self, list: C) -> Result<&mut Self, Error> {
        let ch_list = list.as_ref();
        if ch_list.len() > 5 {
            return Err(Error::TooManyFrequencies);
        }
        let d = self.data.as_mut();
        if d.len() < JOIN_ACCEPT_WITH_CFLIST_LEN {
            return Err(Error::BufferTooShort);
        }
        ch_list.iter().enumerate().for_each(|(i, fr)| {
            let v = fr.value() / 100;
            d[13 + i * 3] = (v & 0xff) as u8;
            d[14 + i * 3] = ((v >> 8) & 0xff) as u8;
            d[15 + i * 3] = ((v >> 16) & 0xff) as u8;
        });
        self.with_c_f_list = true;
        Ok(self)
    }

    /// Provides the encrypted binary representation of the join accept with
    /// the MIC set.
    pub fn build(&mut self, key: &keys::AppKey) -> Result<&[u8], Error> {
        let required_len =
            if self.with_c_f_list { JOIN_ACCEPT_WITH_CFLIST_LEN } else { JOIN_ACCEPT_LEN };
        if self.data.as_mut().len() < required_len {
            return Err(Error::BufferTooShort);
        }
        if !self.encrypted {
            self.encrypt_payload(key, required_len);
        }
        Ok(&self.data.as_mut()[..required_len])
    }

    // The device decrypts with AES encryption, so the server side applies
    // AES decryption to the MIC'd plaintext.
    fn encrypt_payload(&mut self, key: &keys::AppKey, len: usize) {
        let d = &mut self.data.as_mut()[..len];
        set_mic(d, &key.0, &self.factory);
        let aes_dec = self.factory.new_dec(&key.0);
        for i in 0..(d.len() >> 4) {
            let start = (i << 4) + 1;
            aes_dec.decrypt_block(&mut d[start..(16 + start)]);
        }
        self.encrypted = true;
    }
}

/// DataPayloadCreator builds the binary representation of confirmed and
/// unconfirmed data frames.
///
/// By default the frame is an unconfirmed data uplink.
pub struct DataPayloadCreator<D, F> {
    data: D,
    data_f_port: Option<u8>,
    fcnt: u32,
    factory: F,
}

impl<D: AsMut<[u8]>, F: CryptoFactory> DataPayloadCreator<D, F> {
    /// Creates a well initialized DataPayloadCreator over the given buffer
    /// with specific crypto functions.
    ///
    /// The buffer needs to fit the largest frame that may be built, 256
    /// bytes.
    pub fn with_options(mut data: D, factory: F) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < 256 {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x40;
        d[5] = 0x00;
        Ok(DataPayloadCreator { data, data_f_port: None, fcnt: 0, factory })
    }

    pub fn set_uplink(&mut self, uplink: bool) -> &mut Self {
        if uplink {
            self.data.as_mut()[0] &= 0xdf;
        } else {
            self.data.as_mut()[0] |= 0x20;
        }
        self
    }

    pub fn set_confirmed(&mut self, confirmed: bool) -> &mut Self {
        let d = self.data.as_mut();
        if confirmed {
            d[0] &= 0xbf;
            d[0] |= 0x80;
        } else {
            d[0] &= 0x7f;
            d[0] |= 0x40;
        }
        self
    }

    pub fn set_dev_addr<H: AsRef<[u8]>, T: Into<parser::DevAddr<H>>>(
        &mut self,
        dev_addr: T,
    ) -> &mut Self {
        let converted = dev_addr.into();
        self.data.as_mut()[1..5].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_fctrl(&mut self, fctrl: &parser::FCtrl) -> &mut Self {
        self.data.as_mut()[5] = fctrl.raw_value();
        self
    }

    /// Sets the frame counter. Only the low 16 bits go on the wire; the full
    /// value feeds the MIC and the payload keystream.
    pub fn set_fcnt(&mut self, fcnt: u32) -> &mut Self {
        let d = self.data.as_mut();
        self.fcnt = fcnt;
        d[6] = (fcnt & 0xff) as u8;
        d[7] = ((fcnt >> 8) & 0xff) as u8;
        self
    }

    pub fn set_f_port(&mut self, f_port: u8) -> &mut Self {
        self.data_f_port = Some(f_port);
        self
    }

    /// Whether a set of MAC commands fits into FOpts.
    pub fn can_piggyback(cmds: &[&dyn SerializableMacCommand]) -> bool {
        mac_commands_len(cmds) <= PIGGYBACK_MAC_COMMANDS_MAX_LEN
    }

    /// Provides the binary representation of the data frame with the
    /// FRMPayload encrypted and the MIC set.
    ///
    /// MAC commands go into FOpts, or into the FRMPayload when FPort is 0;
    /// FPort 0 frames cannot also carry application data.
    pub fn build(
        &mut self,
        payload: &[u8],
        cmds: &[&dyn SerializableMacCommand],
        nwk_skey: &keys::NwkSKey,
        app_skey: &keys::AppSKey,
    ) -> Result<&[u8], Error> {
        let d = self.data.as_mut();
        let mut last_filled = 8; // MHDR + FHDR without FOpts
        let has_fport = self.data_f_port.is_some();
        let has_fport_zero = has_fport && self.data_f_port.unwrap() == 0;
        let mac_cmds_len = mac_commands_len(cmds);

        if mac_cmds_len > PIGGYBACK_MAC_COMMANDS_MAX_LEN && !has_fport_zero {
            return Err(Error::MacCommandTooBigForFOpts);
        }

        let mut payload_len = payload.len();
        if has_fport_zero && payload_len > 0 {
            return Err(Error::DataAndMacCommandsInPayloadNotAllowed);
        }
        if !has_fport && payload_len > 0 {
            return Err(Error::FPortMustBeProvided);
        }

        // FOpts carries the commands unless they ride on FPort 0
        if !has_fport_zero && mac_cmds_len > 0 {
            d[5] &= 0xf0;
            d[5] |= mac_cmds_len as u8 & 0x0f;
            // length was checked against the 15-byte cap above
            build_mac_commands(cmds, &mut d[last_filled..last_filled + mac_cmds_len]).unwrap();
            last_filled += mac_cmds_len;
        }

        if has_fport {
            d[last_filled] = self.data_f_port.unwrap();
            last_filled += 1;
        }

        let mut enc_key = &app_skey.0;
        if mac_cmds_len > 0 && has_fport_zero {
            enc_key = &nwk_skey.0;
            payload_len = mac_cmds_len;
            build_mac_commands(cmds, &mut d[last_filled..last_filled + payload_len]).unwrap();
        } else {
            d[last_filled..last_filled + payload_len].copy_from_slice(payload);
        }

        securityhelpers::encrypt_frm_data_payload(
            d,
            last_filled,
            last_filled + payload_len,
            self.fcnt,
            &self.factory.new_enc(enc_key),
        );

        let mic = securityhelpers::calculate_data_mic(
            &d[..last_filled + payload_len],
            self.factory.new_mac(&nwk_skey.0),
            self.fcnt,
        );
        d[last_filled + payload_len..last_filled + payload_len + 4].copy_from_slice(&mic.0);

        Ok(&d[..last_filled + payload_len + 4])
    }
}

#[cfg(feature = "default-crypto")]
impl<D: AsMut<[u8]>> JoinRequestCreator<D, DefaultFactory> {
    /// Creates a well initialized JoinRequestCreator using the default
    /// software crypto.
    pub fn new(data: D) -> Result<Self, Error> {
        Self::with_options(data, DefaultFactory)
    }
}

#[cfg(feature = "default-crypto")]
impl<D: AsMut<[u8]>> JoinAcceptCreator<D, DefaultFactory> {
    /// Creates a well initialized JoinAcceptCreator using the default
    /// software crypto.
    pub fn new(data: D) -> Result<Self, Error> {
        Self::with_options(data, DefaultFactory)
    }
}

#[cfg(feature = "default-crypto")]
impl<D: AsMut<[u8]>> DataPayloadCreator<D, DefaultFactory> {
    /// Creates a well initialized DataPayloadCreator using the default
    /// software crypto.
    pub fn new(data: D) -> Result<Self, Error> {
        Self::with_options(data, DefaultFactory)
    }
}
