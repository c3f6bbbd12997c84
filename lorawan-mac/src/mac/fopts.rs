//! Encoding and decoding of the MAC command options carried in frame
//! headers.

use lorawan_codec::keys::CryptoFactory;
use lorawan_codec::maccommands::{parse_downlink_mac_commands, DownlinkMacCommand};
use rand_core::RngCore;

use crate::radio::{Radio, Timer};

use super::{LinkCheckInfo, Mac, MlmeConfirm, Sap};

/// A LinkCheckReq is queued for the next uplink.
pub(crate) const OPT_LINK_CHECK_REQ: u8 = 1 << 0;

/// CID byte of a queued option.
const CID_LEN: usize = 1;

pub(crate) fn link_check_pending(pending_opts: u8) -> bool {
    pending_opts & OPT_LINK_CHECK_REQ != 0
}

/// FOpts bytes the pending options will occupy on the next uplink. Stays
/// below the 16-byte FOpts ceiling by construction.
pub(crate) fn options_len(pending_opts: u8) -> usize {
    if link_check_pending(pending_opts) {
        CID_LEN
    } else {
        0
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
    /// Walks received MAC commands. Processing stops at the first command
    /// that cannot be recognised.
    pub(crate) fn process_fopts(&mut self, fopts: &[u8]) {
        for command in parse_downlink_mac_commands(fopts) {
            match command {
                DownlinkMacCommand::LinkCheckAns(answer) => {
                    self.sap.mlme_confirm(MlmeConfirm::LinkCheck(Ok(LinkCheckInfo {
                        margin: answer.margin(),
                        gateway_count: answer.gateway_count(),
                    })));
                    self.mlme.pending_mlme_opts &= !OPT_LINK_CHECK_REQ;
                }
            }
        }
    }
}
