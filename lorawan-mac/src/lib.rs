//! An event-driven LoRaWAN 1.0 Class A MAC engine.
//!
//! The [`mac::Mac`] type owns the protocol state and drives a LoRa radio
//! through the join / uplink / downlink cycle. It is built for a single
//! logical task: user requests, radio events and timer events are all plain
//! method calls, assumed to be serialised by the caller, and never block
//! beyond a bounded micro-sleep.
//!
//! The engine's collaborators are capabilities handed in at construction:
//! a [`radio::Radio`], a [`radio::Timer`], an [`RngCore`] and a user
//! [`mac::Sap`] that receives confirms and indications. Cryptography goes
//! through the codec crate's [`CryptoFactory`] seam.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod fmt;

pub mod airtime;
pub mod mac;
pub mod radio;
pub mod region;

#[cfg(test)]
mod test_util;

#[cfg(feature = "default-crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "default-crypto")))]
pub use lorawan_codec::default_crypto;
pub use lorawan_codec::{
    keys::{AppEui, AppKey, AppSKey, CryptoFactory, DevEui, NwkSKey},
    parser::DevAddr,
};

pub use rand_core::RngCore;
