use crate::data_type::DataType;
use crate::prelude::*;

/// Which way a transfer moves data relative to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Read an object from the server.
    Upload,
    /// Write an object to the server.
    Download,
}

/// Where a `Request` sits in the Engine's state machine. `Free` is not a
/// request state; it belongs to the Engine itself (see `engine::EngineState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Upload,
    UploadSegment,
    Download,
    DownloadSegment,
    BlockUpload,
    BlockUploadEnd,
    BlockDownload,
    BlockDownloadEnd,
}

/// A single logical upload or download, from submission to completion.
#[derive(Debug, Clone)]
pub struct Request {
    pub index: u16,
    pub sub_index: u8,
    pub direction: Direction,
    pub declared_type: DataType,
    /// For download, the size of `payload_bytes` at submission time. For
    /// upload, zero until the server's initiate response fills it in.
    pub declared_size: u32,
    /// Accumulated on upload; consumed on download.
    pub payload_bytes: Vec<u8>,
    /// Remaining bytes to move: unsent on download, unreceived on upload.
    pub transferred: u32,
    pub toggle: bool,
    pub block_size: u8,
    pub seqno: u8,
    pub ackseq: u8,
    pub segment_buffer: Vec<u8>,
    /// Sticky for the duration of one sub-block: set on the first sequence
    /// mismatch, cleared once the client asks the server to retransmit.
    pub error_flag: bool,
    pub state: TransferState,
}

impl Request {
    pub fn upload(index: u16, sub_index: u8, declared_type: DataType) -> Self {
        Request {
            index,
            sub_index,
            direction: Direction::Upload,
            declared_type,
            declared_size: 0,
            payload_bytes: Vec::new(),
            transferred: 0,
            toggle: false,
            block_size: 127,
            seqno: 1,
            ackseq: 0,
            segment_buffer: Vec::new(),
            error_flag: false,
            state: TransferState::Upload,
        }
    }

    pub fn download(index: u16, sub_index: u8, payload_bytes: Vec<u8>, declared_type: DataType) -> Self {
        let declared_size = payload_bytes.len() as u32;
        Request {
            index,
            sub_index,
            direction: Direction::Download,
            declared_type,
            declared_size,
            transferred: declared_size,
            payload_bytes,
            toggle: false,
            block_size: 127,
            seqno: 1,
            ackseq: 0,
            segment_buffer: Vec::new(),
            error_flag: false,
            state: TransferState::Download,
        }
    }

    pub fn key(&self) -> (u16, u8) {
        (self.index, self.sub_index)
    }
}
