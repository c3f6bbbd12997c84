//! MIC computation and FRMPayload cryptography.
//!
//! The helper block layout is shared between the MIC (first byte 0x49) and
//! the payload keystream (first byte 0x01); both carry the direction bit, the
//! device address and the 32-bit frame counter of the frame they protect.

use crate::keys::{Encrypter, Mac, MIC};

/// First byte of the B0 block used for data-frame MICs.
const MIC_BLOCK_START: u8 = 0x49;
/// First byte of the A blocks used for the payload keystream.
const CRYPT_BLOCK_START: u8 = 0x01;

/// Fills `block` with the shared helper-block prefix, taking the direction
/// bit and device address from the frame bytes. `block[15]` is left for the
/// caller.
fn fill_helper_block(phy_payload: &[u8], first: u8, fcnt: u32, block: &mut [u8; 16]) {
    block[0] = first;
    // block[1..5] stay zero
    block[5] = (phy_payload[0] & 0x20) >> 5;
    block[6..10].copy_from_slice(&phy_payload[1..5]);
    block[10..14].copy_from_slice(&fcnt.to_le_bytes());
    // block[14] stays zero
}

/// Computes the MIC over raw bytes, without a B0 block. Used for join
/// request and join accept frames.
pub fn calculate_mic<M: Mac>(data: &[u8], mut mac: M) -> MIC {
    mac.input(data);
    let digest = mac.result();

    let mut mic = [0u8; 4];
    mic.copy_from_slice(&digest[0..4]);
    MIC(mic)
}

/// Computes the MIC of a data frame: CMAC over B0 followed by the frame
/// without its MIC field.
pub fn calculate_data_mic<M: Mac>(data: &[u8], mut mac: M, fcnt: u32) -> MIC {
    let mut b0 = [0u8; 16];
    fill_helper_block(data, MIC_BLOCK_START, fcnt, &mut b0);
    b0[15] = data.len() as u8;

    mac.input(&b0);
    calculate_mic(data, mac)
}

/// Applies the AES-CTR-style keystream to `phy_payload[start..end]` in
/// place. Applying it twice with identical parameters is the identity, so
/// the same routine encrypts uplinks and decrypts downlinks.
pub fn encrypt_frm_data_payload<E: Encrypter>(
    phy_payload: &mut [u8],
    start: usize,
    end: usize,
    fcnt: u32,
    enc: &E,
) {
    let mut a = [0u8; 16];
    fill_helper_block(phy_payload, CRYPT_BLOCK_START, fcnt, &mut a);

    let mut s = [0u8; 16];
    for (i, b) in phy_payload[start..end].iter_mut().enumerate() {
        if i & 0x0f == 0 {
            a[15] = (i >> 4) as u8 + 1;
            s.copy_from_slice(&a);
            enc.encrypt_block(&mut s);
        }
        *b ^= s[i & 0x0f];
    }
}
