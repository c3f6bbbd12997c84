//! Shared fakes for driving the engine in unit tests: a recording radio
//! and timer, a scripted RNG and a SAP that journals every upcall.

use std::cell::RefCell;
use std::rc::Rc;

use rand_core::RngCore;

use crate::mac::{McpsConfirm, McpsIndication, McpsKind, MlmeConfirm, MlmeIndication, Sap};
use crate::radio::{Bandwidth, CodingRate, Radio, SpreadingFactor, Timer};

#[derive(Debug, Clone, PartialEq)]
pub enum RadioOp {
    CodingRate(CodingRate),
    SyncWord(u8),
    Frequency(u32),
    IqInvert(bool),
    SymbolTimeout(u16),
    RxOn,
    SpreadingFactor(SpreadingFactor),
    Bandwidth(Bandwidth),
    Send(Vec<u8>),
    Sleep,
}

/// Radio double that journals every driver call.
#[derive(Default, Clone)]
pub struct TestRadio {
    pub ops: Rc<RefCell<Vec<RadioOp>>>,
}

impl TestRadio {
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                RadioOp::Send(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_frequency(&self) -> Option<u32> {
        self.ops.borrow().iter().rev().find_map(|op| match op {
            RadioOp::Frequency(hz) => Some(*hz),
            _ => None,
        })
    }

    pub fn rx_on_count(&self) -> usize {
        self.ops.borrow().iter().filter(|op| matches!(op, RadioOp::RxOn)).count()
    }
}

impl Radio for TestRadio {
    fn set_coding_rate(&mut self, cr: CodingRate) {
        self.ops.borrow_mut().push(RadioOp::CodingRate(cr));
    }

    fn set_sync_word(&mut self, sync_word: u8) {
        self.ops.borrow_mut().push(RadioOp::SyncWord(sync_word));
    }

    fn set_frequency(&mut self, hz: u32) {
        self.ops.borrow_mut().push(RadioOp::Frequency(hz));
    }

    fn set_iq_invert(&mut self, invert: bool) {
        self.ops.borrow_mut().push(RadioOp::IqInvert(invert));
    }

    fn set_rx_symbol_timeout(&mut self, symbols: u16) {
        self.ops.borrow_mut().push(RadioOp::SymbolTimeout(symbols));
    }

    fn rx_on(&mut self) {
        self.ops.borrow_mut().push(RadioOp::RxOn);
    }

    fn set_spreading_factor(&mut self, sf: SpreadingFactor) {
        self.ops.borrow_mut().push(RadioOp::SpreadingFactor(sf));
    }

    fn set_bandwidth(&mut self, bw: Bandwidth) {
        self.ops.borrow_mut().push(RadioOp::Bandwidth(bw));
    }

    fn send(&mut self, frame: &[u8]) {
        self.ops.borrow_mut().push(RadioOp::Send(frame.to_vec()));
    }

    fn sleep(&mut self) {
        self.ops.borrow_mut().push(RadioOp::Sleep);
    }
}

/// Timer double that records armed timeouts and sleeps.
#[derive(Default, Clone)]
pub struct TestTimer {
    pub armed: Rc<RefCell<Vec<u32>>>,
    pub stops: Rc<RefCell<usize>>,
    pub usleeps: Rc<RefCell<Vec<u32>>>,
}

impl TestTimer {
    pub fn last_armed(&self) -> Option<u32> {
        self.armed.borrow().last().copied()
    }
}

impl Timer for TestTimer {
    fn set(&mut self, ms: u32) {
        self.armed.borrow_mut().push(ms);
    }

    fn stop(&mut self) {
        *self.stops.borrow_mut() += 1;
    }

    fn usleep(&mut self, us: u32) {
        self.usleeps.borrow_mut().push(us);
    }
}

/// RNG that replays a fixed sequence, repeating it when exhausted.
pub struct FixedRng {
    values: Vec<u32>,
    index: usize,
}

impl FixedRng {
    pub fn cycle(values: &[u32]) -> Self {
        assert!(!values.is_empty());
        FixedRng { values: values.to_vec(), index: 0 }
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        let value = self.values[self.index % self.values.len()];
        self.index += 1;
        value
    }

    fn next_u64(&mut self) -> u64 {
        u64::from(self.next_u32()) << 32 | u64::from(self.next_u32())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Everything the engine reported upwards, in arrival order per queue.
#[derive(Default)]
pub struct SapLog {
    pub mcps_confirms: Vec<McpsConfirm>,
    pub mcps_indications: Vec<(McpsKind, u8, Vec<u8>)>,
    pub mlme_confirms: Vec<MlmeConfirm>,
    pub mlme_indications: Vec<MlmeIndication>,
}

/// SAP double sharing its journal with the test body.
#[derive(Default, Clone)]
pub struct RecordingSap {
    pub log: Rc<RefCell<SapLog>>,
}

impl Sap for RecordingSap {
    fn mcps_confirm(&mut self, confirm: McpsConfirm) {
        self.log.borrow_mut().mcps_confirms.push(confirm);
    }

    fn mcps_indication(&mut self, indication: McpsIndication<'_>) {
        self.log.borrow_mut().mcps_indications.push((
            indication.kind,
            indication.port,
            indication.data.to_vec(),
        ));
    }

    fn mlme_confirm(&mut self, confirm: MlmeConfirm) {
        self.log.borrow_mut().mlme_confirms.push(confirm);
    }

    fn mlme_indication(&mut self, indication: MlmeIndication) {
        self.log.borrow_mut().mlme_indications.push(indication);
    }
}
