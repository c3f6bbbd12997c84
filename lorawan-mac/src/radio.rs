//! Capability traits for the radio physical layer and the timer service.

pub use lora_modulation::{Bandwidth, CodingRate, SpreadingFactor};

/// Sync word of public LoRaWAN networks.
pub const SYNC_WORD_PUBLIC: u8 = 0x34;
/// Sync word of private LoRaWAN networks.
pub const SYNC_WORD_PRIVATE: u8 = 0x12;

/// The radio driver surface the engine programs.
///
/// The engine calls these while reacting to requests and events; the driver
/// reports back by delivering `on_tx_done`, `on_rx_done` and `on_no_rx` to
/// the MAC from the same task.
pub trait Radio {
    fn set_coding_rate(&mut self, cr: CodingRate);
    fn set_sync_word(&mut self, sync_word: u8);
    fn set_frequency(&mut self, hz: u32);
    fn set_iq_invert(&mut self, invert: bool);
    /// Programs single-reception mode with the given preamble timeout in
    /// symbols.
    fn set_rx_symbol_timeout(&mut self, symbols: u16);
    fn rx_on(&mut self);
    fn set_spreading_factor(&mut self, sf: SpreadingFactor);
    fn set_bandwidth(&mut self, bw: Bandwidth);
    /// Hands a complete frame to the radio for transmission.
    fn send(&mut self, frame: &[u8]);
    fn sleep(&mut self);
}

/// One-shot relative timer plus a bounded busy-sleep.
///
/// Implementations compensate for clock drift themselves, typically by
/// multiplying the relative milliseconds with a board-specific drift factor
/// before arming the hardware timer.
pub trait Timer {
    /// Arms the one-shot timer, replacing any armed timeout. Fires back via
    /// `on_timer_fired`.
    fn set(&mut self, ms: u32);
    fn stop(&mut self);
    /// Blocking micro-sleep, used only to randomise join-request timing.
    fn usleep(&mut self, us: u32);
}
