//! MLME, the control-plane service access point: join, link check and the
//! MAC information base.

use lorawan_codec::creator::JoinRequestCreator;
use lorawan_codec::keys::{AppEui, AppKey, CryptoFactory, DevEui};
use lorawan_codec::packet_length::phy::join::JOIN_REQUEST_LEN;
use lorawan_codec::parser::{DevAddr, DevNonce, EncryptedJoinAcceptPayload};
use rand_core::RngCore;

use crate::radio::{Radio, Timer};

use super::{fopts, Activation, Error, Mac, Sap, JOIN_TX_RAND_MASK_US};

/// OTAA join parameters.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub deveui: DevEui,
    pub appeui: AppEui,
    pub appkey: AppKey,
    pub dr: u8,
}

/// A MAC information base attribute with its value, for MLME SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Mib {
    /// Only `None` and `Abp` can be set; OTAA is the outcome of a join.
    ActivationMethod(Activation),
    DevAddr(DevAddr<[u8; 4]>),
    Rx2DataRate(u8),
}

/// A MAC information base attribute selector, for MLME GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MibAttribute {
    ActivationMethod,
    DevAddr,
}

/// Management requests.
#[derive(Debug)]
pub enum MlmeRequest {
    /// Start an over-the-air activation. Confirmed asynchronously.
    Join(JoinRequest),
    /// Queue a LinkCheckReq onto the next uplink. Confirmed asynchronously
    /// once the answer (or the reception timeout) arrives.
    LinkCheck,
    Set(Mib),
    Get(MibAttribute),
    Reset,
}

/// Synchronous outcome of an accepted management request.
#[derive(Debug, PartialEq, Eq)]
pub enum MlmeResponse {
    /// The confirm follows asynchronously through the SAP.
    Deferred,
    /// The request completed immediately.
    Done,
    /// The attribute read by MLME GET.
    Mib(Mib),
}

/// Link margin and gateway count reported by a LinkCheckAns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct LinkCheckInfo {
    pub margin: u8,
    pub gateway_count: u8,
}

/// Asynchronous management confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MlmeConfirm {
    Join(Result<(), Error>),
    LinkCheck(Result<LinkCheckInfo, Error>),
}

impl MlmeConfirm {
    /// The stable numeric representation of the confirm status.
    pub fn code(&self) -> i8 {
        match self {
            MlmeConfirm::Join(Ok(())) | MlmeConfirm::LinkCheck(Ok(_)) => super::STATUS_SUCCESS,
            MlmeConfirm::Join(Err(e)) | MlmeConfirm::LinkCheck(Err(e)) => e.code(),
        }
    }
}

/// Unsolicited management events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MlmeIndication {
    /// The network has more data pending; schedule an uplink soon.
    ScheduleUplink,
}

pub(crate) struct MlmeState {
    pub(crate) activation: Activation,
    /// Pending option bits, see [`fopts`].
    pub(crate) pending_mlme_opts: u8,
    /// Network identifier installed by the last join accept.
    pub(crate) nid: u32,
    /// Remaining time-on-air allowance, µs. Joins require it non-negative.
    pub(crate) backoff_budget: i32,
    /// Hour-tick state, phase and countdown packed into one byte.
    pub(crate) backoff_state: u8,
    /// Nonce of the in-flight (or last) join attempt, wire order.
    pub(crate) dev_nonce: [u8; 2],
    /// Root key of the in-flight join attempt.
    pub(crate) appkey: AppKey,
    /// A join request is awaiting its accept.
    pub(crate) join_pending: bool,
}

impl Default for MlmeState {
    fn default() -> Self {
        MlmeState {
            activation: Activation::None,
            pending_mlme_opts: 0,
            nid: super::DEFAULT_NET_ID,
            backoff_budget: 0,
            backoff_state: 0,
            dev_nonce: [0; 2],
            appkey: AppKey::from([0; 16]),
            join_pending: false,
        }
    }
}

impl MlmeState {
    /// Clears everything a session reset must clear. The duty-cycle state
    /// deliberately survives, it tracks hours since boot.
    pub(crate) fn reset(&mut self) {
        self.activation = Activation::None;
        self.pending_mlme_opts = 0;
        self.nid = super::DEFAULT_NET_ID;
        self.join_pending = false;
    }
}

impl<R, T, G, E, C> Mac<R, T, G, E, C>
where
    R: Radio,
    T: Timer,
    G: RngCore,
    E: Sap,
    C: CryptoFactory + Default,
{
    /// Performs a management request. `Deferred` responses announce an
    /// asynchronous confirm through the SAP.
    pub fn mlme_request(&mut self, request: MlmeRequest) -> Result<MlmeResponse, Error> {
        match request {
            MlmeRequest::Join(join) => self.start_join(join).map(|()| MlmeResponse::Deferred),
            MlmeRequest::LinkCheck => {
                self.mlme.pending_mlme_opts |= fopts::OPT_LINK_CHECK_REQ;
                Ok(MlmeResponse::Deferred)
            }
            MlmeRequest::Set(mib) => self.mib_set(mib).map(|()| MlmeResponse::Done),
            MlmeRequest::Get(attribute) => self.mib_get(attribute).map(MlmeResponse::Mib),
            MlmeRequest::Reset => {
                self.reset();
                Ok(MlmeResponse::Done)
            }
        }
    }

    fn start_join(&mut self, join: JoinRequest) -> Result<(), Error> {
        if self.mlme.activation != Activation::None {
            return Err(Error::Invalid);
        }
        if !self.acquire() {
            return Err(Error::Busy);
        }
        match self.send_join_request(join) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.release();
                Err(e)
            }
        }
    }

    fn send_join_request(&mut self, join: JoinRequest) -> Result<(), Error> {
        if self.mlme.backoff_budget < 0 {
            return Err(Error::QuotaExceeded);
        }
        if !self.region.validate_dr(join.dr) {
            return Err(Error::Invalid);
        }

        let nonce = self.rng.next_u32();
        self.mlme.dev_nonce = [(nonce & 0xFF) as u8, ((nonce >> 8) & 0xFF) as u8];
        self.mlme.appkey = join.appkey;
        self.mlme.join_pending = true;

        {
            let mut phy = JoinRequestCreator::with_options(&mut self.tx.buf[..], C::default())
                .map_err(|_| Error::Invalid)?;
            phy.set_app_eui(join.appeui)
                .set_dev_eui(join.deveui)
                .set_dev_nonce(DevNonce::from(self.mlme.dev_nonce));
            phy.build(&join.appkey);
        }
        self.tx.len = JOIN_REQUEST_LEN;

        // disperse the transmission so a whole deployment powering up
        // together does not join in lockstep
        let delay = self.rng.next_u32() & JOIN_TX_RAND_MASK_US;
        self.timer.usleep(delay);

        self.send_frame(join.dr);
        self.mlme.backoff_budget -= self.tx.toa_us as i32;
        Ok(())
    }

    /// Handles a frame received with the join-accept message type.
    pub(crate) fn process_join_accept(&mut self, buf: &mut [u8]) {
        if !self.mlme.join_pending {
            trace!("lorawan-mac: join accept without a pending join, dropping");
            self.finalize_no_rx();
            return;
        }

        let status = self.install_join_accept(buf);
        self.mlme.join_pending = false;
        self.sap.mlme_confirm(MlmeConfirm::Join(status));
        self.release();
    }

    fn install_join_accept(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let appkey = self.mlme.appkey;
        let encrypted = EncryptedJoinAcceptPayload::new_with_factory(&mut *buf, C::default())
            .map_err(|_| Error::BadMessage)?;
        let decrypted = encrypted.decrypt(&appkey);
        if !decrypted.validate_mic(&appkey) {
            debug!("lorawan-mac: join accept with invalid MIC");
            return Err(Error::BadMessage);
        }

        let dev_nonce = DevNonce::from(self.mlme.dev_nonce);
        self.session.nwkskey = decrypted.derive_nwkskey(&dev_nonce, &appkey);
        self.session.appskey = decrypted.derive_appskey(&dev_nonce, &appkey);
        self.session.dev_addr = decrypted.dev_addr().to_owned();

        let nid = decrypted.net_id();
        self.mlme.nid = u32::from_le_bytes([nid.as_ref()[0], nid.as_ref()[1], nid.as_ref()[2], 0]);

        self.dl_settings = decrypted.dl_settings().raw_value();
        let rx_delay = decrypted.rx_delay();
        self.rx_delay = if rx_delay == 0 { 1 } else { rx_delay };

        if let Some(cf_list) = decrypted.c_f_list() {
            self.region.process_cflist(&cf_list);
        }

        self.mlme.activation = Activation::Otaa;
        self.mcps.fcnt_up = 0;
        self.mcps.fcnt_down = 0;
        Ok(())
    }

    /// Reception over without a frame: a pending join or link check is
    /// answered with a timeout.
    pub(crate) fn mlme_no_rx(&mut self) {
        if self.mlme.activation == Activation::None && self.mlme.join_pending {
            self.mlme.join_pending = false;
            self.sap.mlme_confirm(MlmeConfirm::Join(Err(Error::TimedOut)));
            self.release();
        } else if fopts::link_check_pending(self.mlme.pending_mlme_opts) {
            self.sap.mlme_confirm(MlmeConfirm::LinkCheck(Err(Error::TimedOut)));
            self.mlme.pending_mlme_opts &= !fopts::OPT_LINK_CHECK_REQ;
        }
    }

    fn mib_set(&mut self, mib: Mib) -> Result<(), Error> {
        match mib {
            Mib::ActivationMethod(activation) => {
                if activation == Activation::Otaa {
                    return Err(Error::Invalid);
                }
                self.mlme.activation = activation;
            }
            Mib::DevAddr(dev_addr) => self.session.dev_addr = dev_addr,
            Mib::Rx2DataRate(dr) => self.set_rx2_dr(dr),
        }
        Ok(())
    }

    fn mib_get(&self, attribute: MibAttribute) -> Result<Mib, Error> {
        match attribute {
            MibAttribute::ActivationMethod => Ok(Mib::ActivationMethod(self.mlme.activation)),
            MibAttribute::DevAddr => Ok(Mib::DevAddr(self.session.dev_addr)),
        }
    }
}
