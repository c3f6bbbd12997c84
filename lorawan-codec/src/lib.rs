//! Reading and writing of LoRaWAN 1.0 frames.
//!
//! The crate is split the same way the protocol is: [`parser`] turns received
//! bytes into typed frames (join request, join accept, data up/down) and
//! handles decryption and MIC validation; [`creator`] builds the frames a
//! device transmits; [`maccommands`] covers the MAC commands piggy-backed in
//! the FOpts field. All cryptography goes through the [`keys::CryptoFactory`]
//! seam, with a software implementation in [`default_crypto`] behind the
//! `default-crypto` feature.
#![no_std]
#![allow(clippy::upper_case_acronyms)]

pub mod creator;
pub mod keys;
pub mod maccommands;
pub mod packet_length;
pub mod parser;
pub mod types;

#[cfg(feature = "default-crypto")]
pub mod default_crypto;

mod securityhelpers;
