//! MCPS, the data-plane service access point: confirmed and unconfirmed
//! uplinks, downlink processing and the ACK retry machinery.

use heapless::Vec;
use lorawan_codec::creator::DataPayloadCreator;
use lorawan_codec::keys::CryptoFactory;
use lorawan_codec::maccommands::SerializableMacCommand;
use lorawan_codec::parser::{DataHeader, EncryptedDataPayload, FCtrl, FRMPayload};
use rand_core::RngCore;

use crate::radio::{Radio, Timer};

use super::{fopts, Error, Mac, Sap, MAX_FCNT_GAP, RETRY_RAND_MASK_MS};

const PORT_MIN: u8 = 1;
const PORT_MAX: u8 = 223;

/// MHDR plus the fixed part of the FHDR.
const UPLINK_HDR_LEN: usize = 8;

/// Confirmed or unconfirmed data exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum McpsKind {
    Confirmed,
    Unconfirmed,
}

/// An uplink request: application payload on `port`, transmitted at `dr`.
#[derive(Debug)]
pub struct McpsRequest<'a> {
    pub kind: McpsKind,
    pub port: u8,
    pub dr: u8,
    pub data: &'a [u8],
}

/// Closes an accepted uplink request; `Err(TimedOut)` is the only failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct McpsConfirm {
    pub kind: McpsKind,
    pub status: Result<(), Error>,
}

impl McpsConfirm {
    /// The stable numeric representation of the confirm status.
    pub fn code(&self) -> i8 {
        match self.status {
            Ok(()) => super::STATUS_SUCCESS,
            Err(e) => e.code(),
        }
    }
}

/// A received application payload, handed up while a downlink is processed.
#[derive(Debug, PartialEq, Eq)]
pub struct McpsIndication<'a> {
    pub kind: McpsKind,
    pub port: u8,
    pub data: &'a [u8],
}

/// Reception outcome fed to the retry logic.
#[derive(Debug, Clone, Copy)]
pub(crate) enum McpsEvent {
    /// A downlink was accepted; `ack` mirrors its ACK bit.
    Rx { ack: bool },
    /// Both windows closed without an acceptable frame.
    NoRx,
}

#[derive(Default)]
pub(crate) struct McpsState {
    pub(crate) fcnt_up: u32,
    pub(crate) fcnt_down: u32,
    /// Transmission attempts left for the in-flight confirmed uplink.
    pub(crate) nb_trials: u8,
    /// A confirmed downlink arrived; the next uplink must carry ACK.
    pub(crate) ack_requested: bool,
    /// The in-flight uplink is confirmed and expects a downlink ACK.
    pub(crate) waiting_for_ack: bool,
    /// Kind of the uplink a confirm is owed for, if any.
    pub(crate) in_flight: Option<McpsKind>,
}

/// Widens a received 16-bit frame counter against the last accepted 32-bit
/// value, accounting for a roll-over of the low half.
pub(crate) fn fcnt_stol(fcnt_down: u32, s_fcnt: u16) -> u32 {
    let mut fcnt = (fcnt_down & 0xFFFF_0000) | u32::from(s_fcnt);
    if (fcnt_down & 0xFFFF) + MAX_FCNT_GAP > 0xFFFF && u32::from(s_fcnt) < (fcnt_down & 0xFFFF) {
        fcnt += 0x1_0000;
    }
    fcnt
}

impl<R, T, G, E, C> Mac<R, T, G, E, C>
where
    R: Radio,
    T: Timer,
    G: RngCore,
    E: Sap,
    C: CryptoFactory + Default,
{
    /// Requests a data uplink. `Ok(())` means the request was accepted and
    /// the matching confirm will be emitted asynchronously.
    pub fn mcps_request(&mut self, request: McpsRequest<'_>) -> Result<(), Error> {
        if self.mlme.activation == super::Activation::None {
            return Err(Error::NotConnected);
        }
        if !self.acquire() {
            return Err(Error::Busy);
        }
        match self.start_uplink(request) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.release();
                Err(e)
            }
        }
    }

    fn start_uplink(&mut self, request: McpsRequest<'_>) -> Result<(), Error> {
        if !(PORT_MIN..=PORT_MAX).contains(&request.port) {
            return Err(Error::BadPort);
        }
        if !self.region.validate_dr(request.dr) {
            return Err(Error::Invalid);
        }

        let fopts_len = fopts::options_len(self.mlme.pending_mlme_opts);
        let frame_size = UPLINK_HDR_LEN + fopts_len + request.data.len();
        if frame_size > self.region.max_payload(request.dr) as usize {
            return Err(Error::MessageTooBig);
        }

        self.build_uplink(&request)?;

        self.mcps.waiting_for_ack = matches!(request.kind, McpsKind::Confirmed);
        self.mcps.ack_requested = false;
        self.mcps.in_flight = Some(request.kind);
        self.mcps.nb_trials = super::DEFAULT_RETX;

        self.send_frame(request.dr);
        Ok(())
    }

    fn build_uplink(&mut self, request: &McpsRequest<'_>) -> Result<(), Error> {
        let mut scratch = [0u8; super::TX_BUF_LEN];
        let mut phy = DataPayloadCreator::with_options(&mut scratch[..], C::default())
            .map_err(|_| Error::Invalid)?;

        let mut fctrl = FCtrl::new(0, true);
        if self.mcps.ack_requested {
            fctrl.set_ack();
        }

        phy.set_uplink(true)
            .set_confirmed(matches!(request.kind, McpsKind::Confirmed))
            .set_fctrl(&fctrl)
            .set_dev_addr(self.session.dev_addr)
            .set_fcnt(self.mcps.fcnt_up)
            .set_f_port(request.port);

        let link_check = lorawan_codec::maccommands::LinkCheckReqPayload();
        let mut cmds: Vec<&dyn SerializableMacCommand, 8> = Vec::new();
        if fopts::link_check_pending(self.mlme.pending_mlme_opts) {
            // capacity 8 leaves plenty of room for the single pending option
            cmds.push(&link_check).ok();
        }

        let frame = phy
            .build(request.data, &cmds, &self.session.nwkskey, &self.session.appskey)
            .map_err(|_| Error::Invalid)?;
        self.tx.buf[..frame.len()].copy_from_slice(frame);
        self.tx.len = frame.len();
        Ok(())
    }

    /// Validates, decrypts and dispatches a received data downlink.
    /// Returns false when the frame must be dropped.
    pub(crate) fn process_downlink(&mut self, buf: &mut [u8]) -> bool {
        let Ok(frame) = EncryptedDataPayload::new_with_factory(&mut *buf, C::default()) else {
            debug!("lorawan-mac: malformed downlink, dropping");
            return false;
        };

        if frame.fhdr().dev_addr() != self.session.dev_addr {
            trace!("lorawan-mac: downlink for another device, dropping");
            return false;
        }

        let fcnt = fcnt_stol(self.mcps.fcnt_down, frame.fhdr().fcnt());
        if self.mcps.fcnt_down > fcnt || self.mcps.fcnt_down + MAX_FCNT_GAP < fcnt {
            debug!("lorawan-mac: frame counter outside the window, dropping");
            return false;
        }

        if !frame.validate_mic(&self.session.nwkskey, fcnt) {
            debug!("lorawan-mac: invalid MIC, dropping");
            return false;
        }

        let fopts_len = frame.fhdr().fopts_len();
        let f_port = frame.f_port();
        if fopts_len > 0 && f_port == Some(0) {
            debug!("lorawan-mac: FOpts next to port-0 payload, dropping");
            return false;
        }

        let confirmed = frame.is_confirmed();
        let ack = frame.fhdr().fctrl().ack();
        let frame_pending = frame.fhdr().fctrl().f_pending();

        let Ok(frame) =
            frame.decrypt(Some(&self.session.nwkskey), Some(&self.session.appskey), fcnt)
        else {
            return false;
        };

        self.mcps.fcnt_down = fcnt;
        if confirmed {
            self.mcps.ack_requested = true;
        }

        // MAC commands ride either in the FOpts or, on port 0, in the
        // payload itself
        if fopts_len > 0 {
            self.process_fopts(frame.fhdr().data());
        } else if let FRMPayload::MACCommands(cmds) = frame.frm_payload() {
            self.process_fopts(cmds.data());
        }

        self.mcps_event(McpsEvent::Rx { ack });

        if frame_pending {
            self.sap.mlme_indication(super::MlmeIndication::ScheduleUplink);
        }

        if let (Some(port), FRMPayload::Data(data)) = (f_port, frame.frm_payload()) {
            let kind = if confirmed { McpsKind::Confirmed } else { McpsKind::Unconfirmed };
            self.sap.mcps_indication(McpsIndication { kind, port, data });
        }

        true
    }

    /// Drives the in-flight uplink towards its confirm: a missing ACK
    /// burns one trial and schedules a retransmission, everything else
    /// finishes the transaction.
    pub(crate) fn mcps_event(&mut self, event: McpsEvent) {
        let Some(kind) = self.mcps.in_flight else {
            return;
        };

        let missing_ack = self.mcps.waiting_for_ack
            && match event {
                McpsEvent::Rx { ack } => !ack,
                McpsEvent::NoRx => true,
            };

        if missing_ack {
            self.mcps.nb_trials -= 1;
            if self.mcps.nb_trials > 0 {
                self.timer.set(1000 + (self.rng.next_u32() & RETRY_RAND_MASK_MS));
            } else {
                self.end_of_tx(kind, Err(Error::TimedOut));
            }
        } else {
            self.end_of_tx(kind, Ok(()));
        }
    }

    fn end_of_tx(&mut self, kind: McpsKind, status: Result<(), Error>) {
        self.mcps.waiting_for_ack = false;
        self.mcps.in_flight = None;
        self.sap.mcps_confirm(McpsConfirm { kind, status });
        // one increment per transaction, retries notwithstanding
        self.mcps.fcnt_up += 1;
        self.release();
    }
}
