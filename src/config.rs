/// Runtime configuration for one `SdoClient` instance. No EDS/DCF file is
/// parsed by this crate; the embedding application supplies these values
/// programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdoClientConfig {
    pub node_id: u8,
    pub timeout_ms: u64,
    pub cob_id_tx: u16,
    pub cob_id_rx: u16,
    pub initial_block_size: u8,
}

impl SdoClientConfig {
    /// `node_id` must be in `1..=127`; COB-IDs default to the standard
    /// `0x600 + node_id` (client-to-server) / `0x580 + node_id`
    /// (server-to-client) pair.
    pub fn new(node_id: u8) -> Self {
        SdoClientConfig {
            node_id,
            timeout_ms: 1000,
            cob_id_tx: crate::constant::COB_FUNC_RECEIVE_SDO + node_id as u16,
            cob_id_rx: crate::constant::COB_FUNC_TRANSMIT_SDO + node_id as u16,
            initial_block_size: 127,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_initial_block_size(mut self, block_size: u8) -> Self {
        self.initial_block_size = block_size;
        self
    }
}
