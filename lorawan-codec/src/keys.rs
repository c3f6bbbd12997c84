//! Key and identifier newtypes plus the crypto seam used by the rest of the
//! crate.

use super::parser::EUI64;

/// AES128 represents a 128-bit AES key.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct AES128(pub [u8; 16]);

impl From<[u8; 16]> for AES128 {
    fn from(v: [u8; 16]) -> Self {
        AES128(v)
    }
}

impl core::str::FromStr for AES128 {
    type Err = hex::FromHexError;

    /// Parses a key from its 32-character MSB-first hex representation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut key = [0; 16];
        hex::decode_to_slice(s, &mut key)?;
        Ok(AES128(key))
    }
}

/// MIC represents the 4-byte LoRaWAN message integrity code.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct MIC(pub [u8; 4]);

impl From<[u8; 4]> for MIC {
    fn from(v: [u8; 4]) -> Self {
        MIC(v)
    }
}

macro_rules! lorawan_key {
    (
        $(#[$outer:meta])*
        pub struct $type:ident(AES128);
    ) => {
        $(#[$outer])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $type(pub AES128);

        impl From<[u8; 16]> for $type {
            fn from(key: [u8; 16]) -> Self {
                $type(AES128(key))
            }
        }

        impl $type {
            pub fn inner(&self) -> &AES128 {
                &self.0
            }
        }

        impl AsRef<[u8]> for $type {
            fn as_ref(&self) -> &[u8] {
                &self.0 .0
            }
        }

        impl core::str::FromStr for $type {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($type(s.parse()?))
            }
        }
    };
}

lorawan_key!(
    /// The application root key, entered in MSB format. A key printed by the
    /// network server as `00:11:..:FF` is the byte sequence `[0x00, 0x11, ..,
    /// 0xFF]`.
    pub struct AppKey(AES128);
);
lorawan_key!(
    /// The network session key derived from a join exchange or provisioned
    /// for ABP, MSB format.
    pub struct NwkSKey(AES128);
);
lorawan_key!(
    /// The application session key derived from a join exchange or
    /// provisioned for ABP, MSB format.
    pub struct AppSKey(AES128);
);

macro_rules! lorawan_eui {
    (
        $(#[$outer:meta])*
        pub struct $type:ident(EUI64<[u8; 8]>);
    ) => {
        $(#[$outer])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $type(EUI64<[u8; 8]>);

        impl From<[u8; 8]> for $type {
            fn from(v: [u8; 8]) -> Self {
                $type(EUI64::from(v))
            }
        }

        impl From<$type> for EUI64<[u8; 8]> {
            fn from(v: $type) -> Self {
                v.0
            }
        }

        impl AsRef<[u8]> for $type {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl core::str::FromStr for $type {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut eui = [0; 8];
                hex::decode_to_slice(s, &mut eui)?;
                Ok($type(EUI64::from(eui)))
            }
        }
    };
}

lorawan_eui!(
    /// DevEui is carried LSB-first on the wire; construct it with the bytes
    /// in the order they should be transmitted.
    pub struct DevEui(EUI64<[u8; 8]>);
);
lorawan_eui!(
    /// AppEui (JoinEui) is carried LSB-first on the wire; construct it with
    /// the bytes in the order they should be transmitted.
    pub struct AppEui(EUI64<[u8; 8]>);
);

/// One-block AES128 encryption. `block` is exactly 16 bytes.
pub trait Encrypter {
    fn encrypt_block(&self, block: &mut [u8]);
}

/// One-block AES128 decryption. `block` is exactly 16 bytes.
pub trait Decrypter {
    fn decrypt_block(&self, block: &mut [u8]);
}

/// Incremental AES-CMAC computation.
pub trait Mac {
    fn input(&mut self, data: &[u8]);
    fn result(self) -> [u8; 16];
}

/// Abstraction over the crypto primitives.
///
/// Allows swapping the software implementation for a hardware-backed one; the
/// whole codec is generic over this factory.
pub trait CryptoFactory {
    type E: Encrypter;
    type D: Decrypter;
    type M: Mac;

    fn new_enc(&self, key: &AES128) -> Self::E;
    fn new_dec(&self, key: &AES128) -> Self::D;
    fn new_mac(&self, key: &AES128) -> Self::M;
}
