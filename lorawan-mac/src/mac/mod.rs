//! The Class A MAC engine.
//!
//! [`Mac`] owns the protocol state and is driven entirely by method calls:
//! MCPS and MLME requests from the user side, `on_tx_done` / `on_rx_done` /
//! `on_no_rx` from the radio, `on_timer_fired` from the timer service and
//! `on_hour_tick` from whatever keeps wall-clock time. Confirms and
//! indications flow back through the [`Sap`] handed in at construction.
//!
//! The reception windows are not blocking waits. After a transmission the
//! engine arms the timer for the RX1 instant, opens the radio in
//! single-reception mode when it fires, and lets the radio's own preamble
//! timeout (`on_no_rx`) step it from RX1 to RX2 while the timer, re-armed
//! for one second, opens RX2:
//!
//! ```text
//! IDLE --request--> TX --tx_done--> RX1 --no_rx--> RX2 --no_rx--> IDLE
//!                       (timer opens each window while in RX1/RX2)
//! ```

use core::marker::PhantomData;

use lorawan_codec::keys::{AppSKey, CryptoFactory, NwkSKey};
use lorawan_codec::parser::{DevAddr, MHDR, MType};
use rand_core::RngCore;

use crate::airtime;
use crate::radio::{CodingRate, Radio, Timer, SYNC_WORD_PRIVATE, SYNC_WORD_PUBLIC};
use crate::region;

pub(crate) mod backoff;
mod fopts;
mod mcps;
mod mlme;
mod session;


pub use mcps::{McpsConfirm, McpsIndication, McpsKind, McpsRequest};
pub use mlme::{
    JoinRequest, LinkCheckInfo, Mib, MibAttribute, MlmeConfirm, MlmeIndication, MlmeRequest,
    MlmeResponse,
};
pub use session::{Activation, Session};

/// Largest forward jump the downlink frame counter may take.
pub const MAX_FCNT_GAP: u32 = 16_384;
/// Transmission attempts for a confirmed uplink, first try included.
pub const DEFAULT_RETX: u8 = 5;

const DEFAULT_RX1_DELAY_SECS: u8 = 1;
const JOIN_DELAY1_SECS: u8 = 5;
/// Preamble symbols to wait for when a reception window opens.
const MIN_SYMBOLS_TIMEOUT: u16 = 50;
/// Spacing between the openings of RX1 and RX2.
const RX2_WINDOW_SPACING_MS: u32 = 1000;
/// Random sub-second dispersion of join requests, in microseconds.
const JOIN_TX_RAND_MASK_US: u32 = 0x1F_FFFF;
/// Random component of the confirmed-uplink retry delay, in milliseconds.
const RETRY_RAND_MASK_MS: u32 = 0x7FF;
const PUBLIC_NETWORK: bool = true;
const DEFAULT_NET_ID: u32 = 0;
const TX_BUF_LEN: usize = 256;

const DL_SETTINGS_RX2_DR_MASK: u8 = 0x0F;
const DL_SETTINGS_DR_OFFSET_MASK: u8 = 0x70;
const DL_SETTINGS_DR_OFFSET_POS: u8 = 4;

/// Error kinds surfaced through request results and confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    /// A transaction is already in flight.
    Busy,
    /// The operation requires an active session.
    NotConnected,
    /// Bad argument: unsupported data rate, unknown MIB attribute, ...
    Invalid,
    /// Malformed frame, MIC failure or wrong join-accept size.
    BadMessage,
    /// FPort outside the application range 1..=223.
    BadPort,
    /// Payload exceeds the per-data-rate cap.
    MessageTooBig,
    /// Time-on-air budget exhausted, join refused.
    QuotaExceeded,
    /// Both reception windows expired, retries included.
    TimedOut,
}

impl Error {
    /// Stable numeric code of this error kind. Successful confirms use 0,
    /// deferred requests 1.
    pub const fn code(self) -> i8 {
        match self {
            Error::Busy => -1,
            Error::NotConnected => -2,
            Error::Invalid => -3,
            Error::BadMessage => -4,
            Error::BadPort => -5,
            Error::MessageTooBig => -6,
            Error::QuotaExceeded => -7,
            Error::TimedOut => -8,
        }
    }
}

/// Numeric status of a successful synchronous confirm.
pub const STATUS_SUCCESS: i8 = 0;
/// Numeric status of a request whose confirm arrives asynchronously.
pub const STATUS_DEFERRED: i8 = 1;

/// Upcalls into the enclosing stack. Confirms answer accepted requests;
/// indications may arrive whenever a received frame is being processed.
pub trait Sap {
    fn mcps_confirm(&mut self, confirm: McpsConfirm);
    fn mcps_indication(&mut self, indication: McpsIndication<'_>);
    fn mlme_confirm(&mut self, confirm: MlmeConfirm);
    fn mlme_indication(&mut self, indication: MlmeIndication);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
enum State {
    Idle,
    Tx,
    Rx1,
    Rx2,
}

struct TxSlot {
    buf: [u8; TX_BUF_LEN],
    len: usize,
    /// Time on air of the in-flight frame, µs.
    toa_us: u32,
    last_dr: u8,
}

impl Default for TxSlot {
    fn default() -> Self {
        TxSlot { buf: [0; TX_BUF_LEN], len: 0, toa_us: 0, last_dr: 0 }
    }
}

/// The MAC engine. One instance drives one radio.
pub struct Mac<R, T, G, E, C>
where
    R: Radio,
    T: Timer,
    G: RngCore,
    E: Sap,
    C: CryptoFactory + Default,
{
    radio: R,
    timer: T,
    rng: G,
    sap: E,
    crypto: PhantomData<C>,
    region: region::Configuration,
    state: State,
    busy: bool,
    session: Session,
    mcps: mcps::McpsState,
    mlme: mlme::MlmeState,
    /// DLSettings byte: RX1 DR offset in bits [6:4], RX2 DR in bits [3:0].
    dl_settings: u8,
    /// RX1 delay in seconds, 1..=15.
    rx_delay: u8,
    tx: TxSlot,
}

impl<R, T, G, E, C> Mac<R, T, G, E, C>
where
    R: Radio,
    T: Timer,
    G: RngCore,
    E: Sap,
    C: CryptoFactory + Default,
{
    /// Creates the engine over its capabilities and brings radio and
    /// session state to the defaults.
    pub fn new(region: region::Configuration, radio: R, timer: T, rng: G, sap: E) -> Self {
        let mut mac = Mac {
            radio,
            timer,
            rng,
            sap,
            crypto: PhantomData,
            region,
            state: State::Idle,
            busy: false,
            session: Session::default(),
            mcps: mcps::McpsState::default(),
            mlme: mlme::MlmeState::default(),
            dl_settings: 0,
            rx_delay: DEFAULT_RX1_DELAY_SECS,
            tx: TxSlot::default(),
        };
        // open the first duty-cycle window right away; the host keeps
        // calling on_hour_tick from here on
        backoff::expire(&mut mac.mlme.backoff_state, &mut mac.mlme.backoff_budget);
        mac.reset();
        mac
    }

    /// Restores radio defaults and clears all session state. Any in-flight
    /// transaction is aborted without a confirm.
    pub(crate) fn reset(&mut self) {
        self.timer.stop();
        self.radio.sleep();
        self.state = State::Idle;
        self.busy = false;

        self.radio.set_coding_rate(CodingRate::_4_5);
        self.radio
            .set_sync_word(if PUBLIC_NETWORK { SYNC_WORD_PUBLIC } else { SYNC_WORD_PRIVATE });
        self.dl_settings = 0;
        self.set_rx2_dr(self.region.default_rx2_data_rate());

        self.tx = TxSlot::default();
        self.mcps = mcps::McpsState::default();
        self.mlme.reset();
        self.session = Session::default();
        self.rx_delay = DEFAULT_RX1_DELAY_SECS;
        self.region.reset_channels();
    }

    /// Installs externally provisioned session keys, the companion of
    /// activating by personalisation through the MIB.
    pub fn set_session_keys(&mut self, nwkskey: NwkSKey, appskey: AppSKey) {
        self.session.nwkskey = nwkskey;
        self.session.appskey = appskey;
    }

    pub fn activation(&self) -> Activation {
        self.mlme.activation
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn fcnt_up(&self) -> u32 {
        self.mcps.fcnt_up
    }

    pub fn fcnt_down(&self) -> u32 {
        self.mcps.fcnt_down
    }

    pub fn dev_addr(&self) -> DevAddr<[u8; 4]> {
        self.session.dev_addr
    }

    pub fn region(&self) -> &region::Configuration {
        &self.region
    }

    /// Advances the duty-cycle budget. Call once per hour.
    pub fn on_hour_tick(&mut self) {
        backoff::expire(&mut self.mlme.backoff_state, &mut self.mlme.backoff_budget);
    }

    /// The radio finished transmitting: schedule RX1 and pre-configure the
    /// radio for it, on the uplink channel with the offset data rate.
    pub fn on_tx_done(&mut self) {
        debug_assert!(matches!(self.state, State::Tx));
        self.state = State::Rx1;

        // an unactivated MAC can only have sent a join request
        let delay_secs = if self.mlme.activation == Activation::None {
            JOIN_DELAY1_SECS
        } else {
            self.rx_delay
        };
        self.timer.set(u32::from(delay_secs) * 1000);

        let rx1_dr = self.region.rx1_dr_offset(self.tx.last_dr, self.dr_offset());
        self.config_radio(None, rx1_dr, true);
        self.radio.sleep();
    }

    /// The armed timeout fired: open the pending reception window, or
    /// retransmit the stored frame when a retry was scheduled.
    pub fn on_timer_fired(&mut self) {
        match self.state {
            State::Idle => {
                let dr = self.tx.last_dr;
                self.send_frame(dr);
            }
            State::Rx1 => {
                // RX2 opens on its own schedule even if RX1 sees no frame
                self.timer.set(RX2_WINDOW_SPACING_MS);
                self.radio.rx_on();
            }
            State::Rx2 => self.radio.rx_on(),
            State::Tx => unreachable!("timeout while transmitting"),
        }
    }

    /// The radio saw no preamble in the open window.
    pub fn on_no_rx(&mut self) {
        match self.state {
            State::Rx1 => {
                let rx2_dr = self.rx2_dr();
                self.config_radio(Some(self.region.rx2_frequency()), rx2_dr, true);
                self.state = State::Rx2;
            }
            State::Rx2 => {
                self.state = State::Idle;
                self.finalize_no_rx();
            }
            State::Idle | State::Tx => unreachable!("no-rx outside a reception window"),
        }
        self.radio.sleep();
    }

    /// The radio received a frame in one of the windows: route it to the
    /// join-accept or downlink path.
    pub fn on_rx_done(&mut self, data: &[u8]) {
        debug_assert!(matches!(self.state, State::Rx1 | State::Rx2));
        self.radio.sleep();
        self.state = State::Idle;
        self.timer.stop();

        let mut buf = [0u8; TX_BUF_LEN];
        if data.is_empty() || data.len() > TX_BUF_LEN {
            debug!("lorawan-mac: unusable frame length, dropping");
            self.finalize_no_rx();
            return;
        }
        let buf = &mut buf[..data.len()];
        buf.copy_from_slice(data);

        match MHDR::new(buf[0]).mtype() {
            MType::JoinAccept => self.process_join_accept(buf),
            MType::ConfirmedDataDown | MType::UnconfirmedDataDown => {
                if !self.process_downlink(buf) {
                    self.finalize_no_rx();
                }
            }
            _ => {
                trace!("lorawan-mac: unexpected mtype, dropping");
                self.finalize_no_rx();
            }
        }
    }

    /// A dropped frame or an expired RX2 window end the reception phase;
    /// the outstanding transaction decides between retry and final confirm.
    fn finalize_no_rx(&mut self) {
        self.mlme_no_rx();
        self.mcps_event(mcps::McpsEvent::NoRx);
    }

    /// Transmits the prepared TX buffer: picks a channel, programs the
    /// radio and accounts the airtime.
    fn send_frame(&mut self, dr: u8) {
        self.state = State::Tx;

        let channel = self.region.pick_channel(&mut self.rng);
        self.config_radio(Some(channel), dr, false);

        self.tx.last_dr = dr;
        self.tx.toa_us = airtime::time_on_air_us(self.tx.len, dr, airtime::CR_4_5);

        self.radio.send(&self.tx.buf[..self.tx.len]);
    }

    fn config_radio(&mut self, frequency: Option<u32>, dr: u8, rx: bool) {
        if let Some(hz) = frequency {
            self.radio.set_frequency(hz);
        }
        self.radio.set_iq_invert(rx);
        self.set_dr(dr);
        if rx {
            self.radio.set_rx_symbol_timeout(MIN_SYMBOLS_TIMEOUT);
        }
    }

    fn set_dr(&mut self, dr: u8) {
        // data rates are validated before a transaction starts
        if let Some(datarate) = self.region.datarate(dr) {
            self.radio.set_spreading_factor(datarate.spreading_factor);
            self.radio.set_bandwidth(datarate.bandwidth);
        }
    }

    pub(crate) fn set_rx2_dr(&mut self, rx2_dr: u8) {
        self.dl_settings &= !DL_SETTINGS_RX2_DR_MASK;
        self.dl_settings |= rx2_dr & DL_SETTINGS_RX2_DR_MASK;
    }

    fn rx2_dr(&self) -> u8 {
        self.dl_settings & DL_SETTINGS_RX2_DR_MASK
    }

    fn dr_offset(&self) -> u8 {
        (self.dl_settings & DL_SETTINGS_DR_OFFSET_MASK) >> DL_SETTINGS_DR_OFFSET_POS
    }

    /// Claims the MAC for a new transaction.
    fn acquire(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    /// Releases the MAC; called exactly when a transaction's confirm goes
    /// out.
    fn release(&mut self) {
        self.busy = false;
    }
}
