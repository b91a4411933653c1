use crate::config::SdoClientConfig;
use crate::data_type::DataType;
use crate::dictionary::Dictionary;
use crate::engine::TransferEngine;
use crate::transport::CanTransport;
use crate::value::Value;

/// Owns a transport and drives one SDO client node. `CAN` is anything that
/// implements `CanTransport` (which any `embedded_can::nb::Can` gets for
/// free); `poll` must be called repeatedly by the embedding application with
/// a monotonically increasing `now_ms`.
pub struct SdoClient<CAN: CanTransport> {
    can_network: CAN,
    engine: TransferEngine,
}

impl<CAN: CanTransport> SdoClient<CAN> {
    pub fn new(can_network: CAN, config: SdoClientConfig) -> Self {
        SdoClient {
            can_network,
            engine: TransferEngine::new(config),
        }
    }

    /// Queues an upload (object dictionary read) of `(index, sub_index)`,
    /// declaring the type the result should be marshalled into.
    pub fn upload(&mut self, index: u16, sub_index: u8, declared_type: DataType) {
        self.engine.submit_upload(index, sub_index, declared_type);
    }

    /// Queues a download (object dictionary write) of `value` to
    /// `(index, sub_index)`.
    pub fn download(&mut self, index: u16, sub_index: u8, value: Value) {
        self.engine.submit_download(index, sub_index, value);
    }

    /// Advances the client by one event: see `TransferEngine::poll`.
    /// `dictionary` is notified of completions and failures.
    pub fn poll<D: Dictionary>(&mut self, dictionary: &mut D, now_ms: u64) {
        self.engine.poll(&mut self.can_network, dictionary, now_ms);
    }

    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    pub fn pending_len(&self) -> usize {
        self.engine.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::tests::RecordingDictionary;
    use crate::dictionary::UpdateFlag;
    use crate::error::ClientError;
    use crate::frame::SDO_FRAME_LEN;
    use crate::prelude::*;

    #[derive(Default)]
    struct MockTransport {
        sent: Vec<[u8; SDO_FRAME_LEN]>,
        inbox: VecDeque<[u8; SDO_FRAME_LEN]>,
    }

    impl CanTransport for MockTransport {
        fn send_sdo(&mut self, _cob_id: u16, data: &[u8; SDO_FRAME_LEN]) -> Result<(), ClientError> {
            self.sent.push(*data);
            Ok(())
        }

        fn receive_sdo(&mut self) -> Option<[u8; SDO_FRAME_LEN]> {
            self.inbox.pop_front()
        }
    }

    #[test]
    fn upload_then_poll_completes_expedited_read() {
        let config = SdoClientConfig::new(1);
        let mut client = SdoClient::new(MockTransport::default(), config);
        let mut dict = RecordingDictionary::default();

        client.upload(0x1018, 1, DataType::Unsigned32);
        client.poll(&mut dict, 0);
        assert!(client.is_busy());

        client.can_network.inbox.push_back([0x43, 0x18, 0x10, 0x01, 0x01, 0x00, 0x00, 0x00]);
        client.poll(&mut dict, 1);

        assert!(!client.is_busy());
        assert_eq!(dict.updates[0].3, UpdateFlag::Read);
        assert_eq!(dict.updates[0].2, Some(Value::Unsigned32(1)));
    }
}
