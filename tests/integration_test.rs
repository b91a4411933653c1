use std::collections::VecDeque;

use canopen_sdo_client::dictionary::UpdateFlag;
use canopen_sdo_client::transport::CanTransport;
use canopen_sdo_client::{AbortCode, ClientError, DataType, Dictionary, SdoClient, SdoClientConfig, Value};
use lazy_static::lazy_static;

lazy_static! {
    /// Literal byte sequences straight out of the SDO wire-format scenarios:
    /// expedited upload of 0x1018:01, expedited download to 0x6040:00.
    static ref EXPEDITED_UPLOAD_REQUEST: [u8; 8] = [0x40, 0x18, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00];
    static ref EXPEDITED_UPLOAD_RESPONSE: [u8; 8] = [0x43, 0x18, 0x10, 0x01, 0xEF, 0xBE, 0xAD, 0xDE];
    static ref EXPEDITED_DOWNLOAD_REQUEST: [u8; 8] = [0x2B, 0x40, 0x60, 0x00, 0x34, 0x12, 0x00, 0x00];
    static ref EXPEDITED_DOWNLOAD_RESPONSE: [u8; 8] = [0x60, 0x40, 0x60, 0x00, 0x00, 0x00, 0x00, 0x00];
}

#[derive(Default)]
struct ScriptedTransport {
    sent: Vec<[u8; 8]>,
    inbox: VecDeque<[u8; 8]>,
}

impl ScriptedTransport {
    fn expect(mut self, frame: [u8; 8]) -> Self {
        self.inbox.push_back(frame);
        self
    }
}

impl CanTransport for ScriptedTransport {
    fn send_sdo(&mut self, _cob_id: u16, data: &[u8; 8]) -> Result<(), ClientError> {
        self.sent.push(*data);
        Ok(())
    }

    fn receive_sdo(&mut self) -> Option<[u8; 8]> {
        self.inbox.pop_front()
    }
}

#[derive(Default)]
struct TestDictionary {
    updates: Vec<(u16, u8, Option<Value>, UpdateFlag)>,
    errors: Vec<(u16, u8, AbortCode)>,
}

impl Dictionary for TestDictionary {
    fn update(&mut self, index: u16, sub_index: u8, value: Option<&Value>, flag: UpdateFlag) {
        self.updates.push((index, sub_index, value.cloned(), flag));
    }

    fn set_error(&mut self, index: u16, sub_index: u8, abort_code: AbortCode) {
        self.errors.push((index, sub_index, abort_code));
    }
}

#[test]
fn expedited_upload_round_trip_matches_wire_scenario() {
    let transport = ScriptedTransport::default().expect(*EXPEDITED_UPLOAD_RESPONSE);
    let mut client = SdoClient::new(transport, SdoClientConfig::new(1));
    let mut dict = TestDictionary::default();

    client.upload(0x1018, 1, DataType::Unsigned32);
    client.poll(&mut dict, 0);
    client.poll(&mut dict, 1);

    assert_eq!(dict.updates.len(), 1);
    assert_eq!(dict.updates[0], (0x1018, 1, Some(Value::Unsigned32(0xDEADBEEF)), UpdateFlag::Read));
}

#[test]
fn expedited_download_round_trip_matches_wire_scenario() {
    let transport = ScriptedTransport::default().expect(*EXPEDITED_DOWNLOAD_RESPONSE);
    let mut client = SdoClient::new(transport, SdoClientConfig::new(1));
    let mut dict = TestDictionary::default();

    client.download(0x6040, 0, Value::Unsigned16(0x1234));
    client.poll(&mut dict, 0);
    client.poll(&mut dict, 1);

    assert_eq!(dict.updates[0].3, UpdateFlag::Written);
}

#[test]
fn segmented_upload_of_a_ten_byte_string() {
    let transport = ScriptedTransport::default()
        .expect([0x41, 0x08, 0x10, 0x00, 0x0A, 0x00, 0x00, 0x00])
        .expect([0x00, b'H', b'e', b'l', b'l', b'o', b'-', b'-'])
        .expect([0x19, b'!', b'!', b'!', 0, 0, 0, 0]);
    let mut client = SdoClient::new(transport, SdoClientConfig::new(1));
    let mut dict = TestDictionary::default();

    client.upload(0x1008, 0, DataType::VisibleString);
    client.poll(&mut dict, 0);
    client.poll(&mut dict, 1);
    client.poll(&mut dict, 2);
    client.poll(&mut dict, 3);

    assert_eq!(dict.updates[0].2, Some(Value::VisibleString("Hello--!!!".to_string())));
}

#[test]
fn server_toggle_violation_aborts_with_code_0x05030000() {
    let transport = ScriptedTransport::default()
        .expect([0x41, 0x08, 0x10, 0x00, 0x0A, 0x00, 0x00, 0x00])
        .expect([0x00, b'H', b'e', b'l', b'l', b'o', b'-', b'-'])
        .expect([0x00, b'm', b'o', b'r', b'e', 0, 0, 0]);
    let mut client = SdoClient::new(transport, SdoClientConfig::new(1));
    let mut dict = TestDictionary::default();

    client.upload(0x1008, 0, DataType::VisibleString);
    for now_ms in 0..4 {
        client.poll(&mut dict, now_ms);
    }

    assert_eq!(dict.errors[0].2, AbortCode::ToggleBitNotAlternated);
    assert_eq!(dict.errors[0].2.code(), 0x0503_0000);
}

#[test]
fn block_download_of_200_bytes_uses_29_sub_block_frames() {
    let transport = ScriptedTransport::default()
        .expect([0xA4, 0x50, 0x1F, 0x01, 0x7F, 0x00, 0x00, 0x00])
        .expect([0xA2, 29, 0x7F, 0x00, 0x00, 0x00, 0x00, 0x00])
        .expect([0xA1, 0, 0, 0, 0, 0, 0, 0]);
    let mut client = SdoClient::new(transport, SdoClientConfig::new(1));
    let mut dict = TestDictionary::default();

    client.download(0x1F50, 1, Value::Domain(vec![0xAA; 200]));
    for now_ms in 0..4 {
        client.poll(&mut dict, now_ms);
    }

    assert_eq!(dict.updates[0].3, UpdateFlag::Written);
}

#[test]
fn unanswered_request_times_out_and_frees_the_engine() {
    let transport = ScriptedTransport::default();
    let mut client = SdoClient::new(transport, SdoClientConfig::new(1).with_timeout_ms(100));
    let mut dict = TestDictionary::default();

    client.upload(0x1018, 1, DataType::Unsigned32);
    client.poll(&mut dict, 0);
    assert!(client.is_busy());

    client.poll(&mut dict, 100);
    assert!(!client.is_busy());
    assert_eq!(dict.errors[0].2, AbortCode::SdoProtocolTimedOut);

    // Engine is free again and pumps the next queued request immediately.
    client.upload(0x1019, 1, DataType::Unsigned32);
    client.poll(&mut dict, 101);
    assert!(client.is_busy());
}

#[test]
fn duplicate_requests_for_the_same_object_are_coalesced() {
    let transport = ScriptedTransport::default().expect(*EXPEDITED_UPLOAD_RESPONSE);
    let mut client = SdoClient::new(transport, SdoClientConfig::new(1));
    let mut dict = TestDictionary::default();

    client.upload(0x1018, 1, DataType::Unsigned32);
    client.upload(0x1018, 1, DataType::Unsigned32);
    assert_eq!(client.pending_len(), 1);

    client.poll(&mut dict, 0);
    client.poll(&mut dict, 1);
    assert_eq!(dict.updates.len(), 1);
}

#[test]
fn initiate_request_constants_match_wire_scenario() {
    assert_eq!(*EXPEDITED_UPLOAD_REQUEST, [0x40, 0x18, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(*EXPEDITED_DOWNLOAD_REQUEST, [0x2B, 0x40, 0x60, 0x00, 0x34, 0x12, 0x00, 0x00]);
}
