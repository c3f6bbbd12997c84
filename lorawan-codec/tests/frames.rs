use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use generic_array::GenericArray;

use lorawan_codec::creator::{DataPayloadCreator, JoinAcceptCreator, JoinRequestCreator};
use lorawan_codec::keys::{AppKey, AppSKey, NwkSKey, MIC};
use lorawan_codec::maccommands::{
    parse_downlink_mac_commands, DownlinkMacCommand, LinkCheckReqPayload, SerializableMacCommand,
};
use lorawan_codec::parser::{
    parse, DataHeader, DataPayload, DevAddr, DevNonce, FRMPayload, JoinAcceptPayload, MICAble,
    PhyPayload,
};

fn aes_encrypt(key: &[u8; 16], block: [u8; 16]) -> [u8; 16] {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut b = GenericArray::clone_from_slice(&block);
    cipher.encrypt_block(&mut b);
    b.into()
}

#[test]
fn join_request_layout_and_mic() {
    let appkey = AppKey::from([0; 16]);
    let mut buf = [0u8; 23];
    let mut phy = JoinRequestCreator::new(&mut buf[..]).unwrap();
    phy.set_app_eui(&[0x02; 8]).set_dev_eui(&[0x01; 8]).set_dev_nonce(&[0x78, 0x56]);
    let frame = phy.build(&appkey).to_vec();

    assert_eq!(frame.len(), 23);
    assert_eq!(frame[0], 0x00);
    assert_eq!(&frame[1..9], &[0x02; 8]);
    assert_eq!(&frame[9..17], &[0x01; 8]);
    assert_eq!(&frame[17..19], &[0x78, 0x56]);

    let mut copy = frame.clone();
    match parse(copy.as_mut_slice()).unwrap() {
        PhyPayload::JoinRequest(jr) => {
            assert!(jr.validate_mic(&appkey));
            assert_eq!(u16::from(jr.dev_nonce().to_owned()), 0x5678);
        }
        other => panic!("parsed as {other:?}"),
    }
}

#[test]
fn join_accept_roundtrip_and_session_keys() {
    let appkey = AppKey::from([0; 16]);
    let dev_nonce = DevNonce::from([0x78, 0x56]);

    let mut buffer = [0u8; 17];
    let mut phy = JoinAcceptCreator::new(&mut buffer[..]).unwrap();
    phy.set_app_nonce(&[0xAB, 0xCD, 0xEF])
        .set_net_id(&[0x01, 0x02, 0x03])
        .set_dev_addr(&[0x04, 0x03, 0x02, 0x01])
        .set_dl_settings(0)
        .set_rx_delay(1);
    let mut frame = phy.build(&appkey).unwrap().to_vec();

    let decrypted = match parse(frame.as_mut_slice()).unwrap() {
        PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(encrypted)) => {
            encrypted.decrypt(&appkey)
        }
        other => panic!("parsed as {other:?}"),
    };
    assert!(decrypted.validate_mic(&appkey));
    assert_eq!(decrypted.app_nonce().as_ref(), &[0xAB, 0xCD, 0xEF]);
    assert_eq!(decrypted.net_id().as_ref(), &[0x01, 0x02, 0x03]);
    assert_eq!(decrypted.dev_addr().as_ref(), &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(decrypted.rx_delay(), 1);
    assert!(decrypted.c_f_list().is_none());

    // session keys are single AES blocks over pad | AppNonce | NetID | DevNonce
    let mut block = [0u8; 16];
    block[1..9].copy_from_slice(&[0xAB, 0xCD, 0xEF, 0x01, 0x02, 0x03, 0x78, 0x56]);
    block[0] = 0x01;
    let expected_nwk = aes_encrypt(&[0; 16], block);
    block[0] = 0x02;
    let expected_app = aes_encrypt(&[0; 16], block);

    assert_eq!(decrypted.derive_nwkskey(&dev_nonce, &appkey), NwkSKey::from(expected_nwk));
    assert_eq!(decrypted.derive_appskey(&dev_nonce, &appkey), AppSKey::from(expected_app));
}

#[test]
fn join_accept_cflist() {
    let appkey = AppKey::from([3; 16]);
    let mut buffer = [0u8; 33];
    let mut phy = JoinAcceptCreator::new(&mut buffer[..]).unwrap();
    phy.set_app_nonce(&[1, 2, 3]).set_net_id(&[4, 5, 6]).set_dev_addr(&[1, 1, 1, 1]);
    phy.set_dl_settings(0).set_rx_delay(1);
    let freqs = [
        lorawan_codec::types::Frequency::new(&[0x18, 0x4F, 0x84]).unwrap(),
        lorawan_codec::types::Frequency::new(&[0x48, 0x57, 0x84]).unwrap(),
    ];
    phy.set_c_f_list(&freqs[..]).unwrap();
    let mut frame = phy.build(&appkey).unwrap().to_vec();
    assert_eq!(frame.len(), 33);

    let decrypted = match parse(frame.as_mut_slice()).unwrap() {
        PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(encrypted)) => {
            encrypted.decrypt(&appkey)
        }
        other => panic!("parsed as {other:?}"),
    };
    assert!(decrypted.validate_mic(&appkey));
    let cf_list = decrypted.c_f_list().unwrap();
    assert_eq!(cf_list[0].value(), 867_100_000);
    assert_eq!(cf_list[1].value(), 867_300_000);
    assert_eq!(cf_list[2].value(), 0);
}

#[test]
fn uplink_roundtrip() {
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let mut buf = [0u8; 256];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    phy.set_confirmed(false)
        .set_uplink(true)
        .set_f_port(1)
        .set_dev_addr(&[4, 3, 2, 1])
        .set_fcnt(1);
    let mut frame = phy.build(b"hello", &[], &nwk_skey, &app_skey).unwrap().to_vec();

    // MHDR + FHDR(7) + FPort + payload + MIC
    assert_eq!(frame.len(), 1 + 7 + 1 + 5 + 4);

    match parse(frame.as_mut_slice()).unwrap() {
        PhyPayload::Data(DataPayload::Encrypted(enc)) => {
            assert!(enc.validate_mic(&nwk_skey, 1));
            let dec = enc.decrypt(Some(&nwk_skey), Some(&app_skey), 1).unwrap();
            assert_eq!(dec.fhdr().dev_addr(), DevAddr::from([4, 3, 2, 1]));
            assert_eq!(dec.fhdr().fcnt(), 1);
            assert_eq!(dec.f_port(), Some(1));
            assert_eq!(dec.frm_payload(), FRMPayload::Data(b"hello"));
        }
        other => panic!("parsed as {other:?}"),
    }
}

#[test]
fn uplink_with_piggybacked_link_check() {
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let link_check = LinkCheckReqPayload();
    let cmds: [&dyn SerializableMacCommand; 1] = [&link_check];

    let mut buf = [0u8; 256];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    phy.set_f_port(42).set_dev_addr(&[0; 4]).set_fcnt(7);
    let mut frame = phy.build(b"x", &cmds, &nwk_skey, &app_skey).unwrap().to_vec();

    match parse(frame.as_mut_slice()).unwrap() {
        PhyPayload::Data(DataPayload::Encrypted(enc)) => {
            assert_eq!(enc.fhdr().fopts_len(), 1);
            assert_eq!(enc.fhdr().data(), &[0x02]);
        }
        other => panic!("parsed as {other:?}"),
    }
}

#[test]
fn frm_payload_encryption_is_an_involution() {
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([0xA5; 16]);
    let payload: Vec<u8> = (0..37).collect();

    let mut buf = [0u8; 256];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    phy.set_f_port(12).set_dev_addr(&[9, 8, 7, 6]).set_fcnt(0x1234);
    let mut frame = phy.build(&payload, &[], &nwk_skey, &app_skey).unwrap().to_vec();

    // decrypting applies the identical keystream a second time
    match parse(frame.as_mut_slice()).unwrap() {
        PhyPayload::Data(DataPayload::Encrypted(enc)) => {
            let dec = enc.decrypt(Some(&nwk_skey), Some(&app_skey), 0x1234).unwrap();
            assert_eq!(dec.frm_payload(), FRMPayload::Data(&payload[..]));
        }
        other => panic!("parsed as {other:?}"),
    }
}

#[test]
fn data_mic_is_cmac_over_b0_and_frame() {
    use cmac::Mac as _;

    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let fcnt = 0x0000_0102u32;

    let mut buf = [0u8; 256];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    phy.set_f_port(1).set_dev_addr(&[4, 3, 2, 1]).set_fcnt(fcnt);
    let frame = phy.build(b"data", &[], &nwk_skey, &app_skey).unwrap().to_vec();

    let msg = &frame[..frame.len() - 4];
    let mut b0 = [0u8; 16];
    b0[0] = 0x49;
    b0[5] = 0; // uplink
    b0[6..10].copy_from_slice(&[4, 3, 2, 1]);
    b0[10..14].copy_from_slice(&fcnt.to_le_bytes());
    b0[15] = msg.len() as u8;

    let mut cmac = <cmac::Cmac<Aes128> as KeyInit>::new(GenericArray::from_slice(&[2; 16]));
    cmac.update(&b0);
    cmac.update(msg);
    let digest = cmac.finalize().into_bytes();

    let mut expected = [0u8; 4];
    expected.copy_from_slice(&digest[..4]);

    let mut copy = frame.clone();
    match parse(copy.as_mut_slice()).unwrap() {
        PhyPayload::Data(DataPayload::Encrypted(enc)) => {
            assert_eq!(enc.mic(), MIC(expected));
        }
        other => panic!("parsed as {other:?}"),
    }
}

#[test]
fn downlink_link_check_ans_parses() {
    let fopts = [0x02, 0x0A, 0x03];
    let mut cmds = parse_downlink_mac_commands(&fopts);
    match cmds.next().unwrap() {
        DownlinkMacCommand::LinkCheckAns(ans) => {
            assert_eq!(ans.margin(), 10);
            assert_eq!(ans.gateway_count(), 3);
        }
    }
    assert!(cmds.next().is_none());
}

#[test]
fn unknown_cid_stops_fopts_processing() {
    // LinkCheckAns followed by an unknown command
    let fopts = [0x02, 0x0A, 0x03, 0x7F, 0x00];
    let mut cmds = parse_downlink_mac_commands(&fopts);
    assert!(matches!(cmds.next(), Some(DownlinkMacCommand::LinkCheckAns(_))));
    assert!(cmds.next().is_none());
    assert!(cmds.next().is_none());
}

#[test]
fn keys_parse_from_hex_strings() {
    let key: AppKey = "000102030405060708090A0B0C0D0E0F".parse().unwrap();
    assert_eq!(
        key.as_ref(),
        &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]
    );
    assert!("not hex".parse::<AppKey>().is_err());
}
