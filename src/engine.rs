use crate::data_type::DataType;
use crate::dictionary::{Dictionary, UpdateFlag};
use crate::error::AbortCode;
use crate::frame::{self, SDO_FRAME_LEN};
use crate::prelude::*;
use crate::queue::RequestQueue;
use crate::request::{Direction, Request, TransferState};
use crate::timeout::TimeoutController;
use crate::transport::CanTransport;
use crate::value::Value;
use crate::config::SdoClientConfig;
use crate::{debug, error, info, warn};

/// Whether the Engine currently owns a Request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Free,
    Busy,
}

/// Drives one active Request to completion through one of the six SDO
/// sub-protocols, pulling the next request from the queue whenever it goes
/// idle. Single-threaded, cooperative, non-blocking: `poll` never blocks on
/// I/O and must be called repeatedly by the embedding application.
pub struct TransferEngine {
    config: SdoClientConfig,
    queue: RequestQueue,
    active: Option<Request>,
    state: EngineState,
    timeout: TimeoutController,
}

impl TransferEngine {
    pub fn new(config: SdoClientConfig) -> Self {
        let timeout = TimeoutController::new(config.timeout_ms);
        TransferEngine {
            config,
            queue: RequestQueue::new(),
            active: None,
            state: EngineState::Free,
            timeout,
        }
    }

    pub fn submit_upload(&mut self, index: u16, sub_index: u8, declared_type: DataType) {
        self.queue.submit(Request::upload(index, sub_index, declared_type));
    }

    pub fn submit_download(&mut self, index: u16, sub_index: u8, value: Value) {
        let data_type = value.data_type();
        self.queue.submit(Request::download(index, sub_index, value.encode(), data_type));
    }

    /// Advances the Engine by at most one event: a timeout check, a queue
    /// pump if idle, and the processing of at most one inbound frame.
    pub fn poll<T: CanTransport, D: Dictionary>(&mut self, transport: &mut T, dictionary: &mut D, now_ms: u64) {
        if self.state == EngineState::Busy && self.timeout.expired(now_ms) {
            warn!("SDO request timed out");
            self.fail_active(transport, dictionary, AbortCode::SdoProtocolTimedOut, true, now_ms);
        }

        self.pump(transport, dictionary, now_ms);

        if let Some(data) = transport.receive_sdo() {
            self.process_frame(&data, transport, dictionary, now_ms);
        }
    }

    fn pump<T: CanTransport, D: Dictionary>(&mut self, transport: &mut T, dictionary: &mut D, now_ms: u64) {
        if self.state == EngineState::Busy {
            return;
        }
        if let Some(req) = self.queue.pop() {
            self.state = EngineState::Busy;
            self.start(req, transport, dictionary, now_ms);
        }
    }

    fn send<T: CanTransport>(&mut self, transport: &mut T, data: &[u8; SDO_FRAME_LEN], now_ms: u64) -> bool {
        match transport.send_sdo(self.config.cob_id_tx, data) {
            Ok(()) => {
                debug!("sent SDO frame {:x?}", data);
                self.timeout.arm(now_ms);
                true
            }
            Err(_) => false,
        }
    }

    fn start<T: CanTransport, D: Dictionary>(&mut self, mut req: Request, transport: &mut T, dictionary: &mut D, now_ms: u64) {
        let sent = match req.direction {
            Direction::Download if req.declared_size <= 4 => {
                let frame = frame::initiate_download_expedited(req.index, req.sub_index, &req.payload_bytes);
                req.state = TransferState::Download;
                self.send(transport, &frame, now_ms)
            }
            Direction::Download if req.declared_size < 128 => {
                let frame = frame::initiate_download_segmented(req.index, req.sub_index, req.declared_size);
                req.state = TransferState::Download;
                self.send(transport, &frame, now_ms)
            }
            Direction::Download => {
                let frame = frame::init_block_download(req.index, req.sub_index, req.declared_size);
                req.state = TransferState::BlockDownload;
                req.seqno = 0;
                self.send(transport, &frame, now_ms)
            }
            // Unbounded-length types go straight to block upload; everything
            // else starts with a plain initiate and lets the server's
            // response decide expedited vs segmented.
            Direction::Upload if req.declared_type == DataType::Domain => {
                let frame = frame::init_block_upload(req.index, req.sub_index, self.config.initial_block_size);
                req.state = TransferState::BlockUpload;
                req.block_size = self.config.initial_block_size;
                req.seqno = 0;
                self.send(transport, &frame, now_ms)
            }
            Direction::Upload => {
                let frame = frame::initiate_upload(req.index, req.sub_index);
                req.state = TransferState::Upload;
                self.send(transport, &frame, now_ms)
            }
        };

        if !sent {
            error!("transport failed to send initiate frame for ({:#x}, {})", req.index, req.sub_index);
            dictionary.update(req.index, req.sub_index, None, UpdateFlag::Error);
            self.state = EngineState::Free;
            self.pump(transport, dictionary, now_ms);
            return;
        }
        self.active = Some(req);
    }

    fn process_frame<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        if self.active.is_none() {
            return;
        }

        if frame::scs_of(data) == frame::scs::ABORT {
            let code = frame::decode_abort_code(data);
            warn!("server aborted transfer with code {:#010x}", code);
            self.fail_active(transport, dictionary, AbortCode::from_code(code), false, now_ms);
            return;
        }

        let state = self.active.as_ref().unwrap().state;
        match state {
            TransferState::Upload => self.on_upload_initiate_response(data, transport, dictionary, now_ms),
            TransferState::UploadSegment => self.on_upload_segment_response(data, transport, dictionary, now_ms),
            TransferState::Download => self.on_download_initiate_response(data, transport, dictionary, now_ms),
            TransferState::DownloadSegment => self.on_download_segment_response(data, transport, dictionary, now_ms),
            TransferState::BlockUpload => self.on_block_upload_frame(data, transport, dictionary, now_ms),
            TransferState::BlockUploadEnd => self.on_block_upload_end(data, transport, dictionary, now_ms),
            TransferState::BlockDownload => self.on_block_download_frame(data, transport, dictionary, now_ms),
            TransferState::BlockDownloadEnd => self.on_block_download_end(data, transport, dictionary, now_ms),
        }
    }

    fn identifier_mismatch(&self, data: &[u8; SDO_FRAME_LEN]) -> bool {
        let req = self.active.as_ref().unwrap();
        frame::index_of(data) != (req.index, req.sub_index)
    }

    // ---- expedited / segmented download -----------------------------------

    fn on_download_initiate_response<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        if self.identifier_mismatch(data) {
            self.fail_active(transport, dictionary, AbortCode::CommandSpecifierNotValidOrUnknown, true, now_ms);
            return;
        }
        let expedited = self.active.as_ref().unwrap().declared_size <= 4;
        if expedited {
            self.complete_active(transport, dictionary, UpdateFlag::Written, now_ms);
        } else {
            self.active.as_mut().unwrap().state = TransferState::DownloadSegment;
            self.send_next_download_segment(transport, now_ms);
        }
    }

    fn send_next_download_segment<T: CanTransport>(&mut self, transport: &mut T, now_ms: u64) {
        let req = self.active.as_mut().unwrap();
        let offset = (req.declared_size - req.transferred) as usize;
        let chunk_len = (req.transferred as usize).min(7);
        let chunk = req.payload_bytes[offset..offset + chunk_len].to_vec();
        let last = chunk_len as u32 == req.transferred;
        req.transferred -= chunk_len as u32;
        let toggle = req.toggle;
        let frame = frame::download_segment(toggle, &chunk, last);
        self.send(transport, &frame, now_ms);
    }

    fn on_download_segment_response<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        let resp = frame::decode_segment_response(data);
        let req = self.active.as_ref().unwrap();
        if resp.toggle != req.toggle {
            self.fail_active(transport, dictionary, AbortCode::ToggleBitNotAlternated, true, now_ms);
            return;
        }
        if req.transferred == 0 {
            self.complete_active(transport, dictionary, UpdateFlag::Written, now_ms);
        } else {
            self.active.as_mut().unwrap().toggle = !req.toggle;
            self.send_next_download_segment(transport, now_ms);
        }
    }

    // ---- expedited / segmented upload --------------------------------------

    fn on_upload_initiate_response<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        if self.identifier_mismatch(data) {
            self.fail_active(transport, dictionary, AbortCode::CommandSpecifierNotValidOrUnknown, true, now_ms);
            return;
        }
        let resp = frame::decode_initiate_response(data);
        if resp.expedited {
            let data_len = 4 - resp.unused_tail as usize;
            self.active.as_mut().unwrap().payload_bytes = data[4..4 + data_len].to_vec();
            self.complete_active(transport, dictionary, UpdateFlag::Read, now_ms);
        } else {
            // Read all four size bytes, not just byte 4.
            let size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
            let req = self.active.as_mut().unwrap();
            req.declared_size = size;
            req.transferred = size;
            req.state = TransferState::UploadSegment;
            req.toggle = false;
            self.send_upload_segment_request(transport, now_ms);
        }
    }

    fn send_upload_segment_request<T: CanTransport>(&mut self, transport: &mut T, now_ms: u64) {
        let toggle = self.active.as_ref().unwrap().toggle;
        let frame = frame::upload_segment_request(toggle);
        self.send(transport, &frame, now_ms);
    }

    fn on_upload_segment_response<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        let resp = frame::decode_segment_response(data);
        let req = self.active.as_ref().unwrap();
        if resp.toggle != req.toggle {
            self.fail_active(transport, dictionary, AbortCode::ToggleBitNotAlternated, true, now_ms);
            return;
        }
        let data_len = 7 - resp.unused_tail as usize;
        let req = self.active.as_mut().unwrap();
        req.payload_bytes.extend_from_slice(&data[1..1 + data_len]);
        req.transferred = req.transferred.saturating_sub(data_len as u32);
        if resp.last {
            self.complete_active(transport, dictionary, UpdateFlag::Read, now_ms);
        } else {
            req.toggle = !req.toggle;
            self.send_upload_segment_request(transport, now_ms);
        }
    }

    // ---- block download -----------------------------------------------------

    fn send_block_download_burst<T: CanTransport>(&mut self, transport: &mut T, now_ms: u64) {
        let req = self.active.as_ref().unwrap();
        let offset = (req.declared_size - req.transferred) as usize;
        let chunk_len = (req.transferred as usize).min(req.block_size as usize * 7);
        let chunk = req.payload_bytes[offset..offset + chunk_len].to_vec();
        let mut seq = 1u8;
        let mut sent_ok = true;
        for frag in chunk.chunks(7) {
            let frame_offset = offset + ((seq - 1) as usize) * 7;
            let last = frame_offset + frag.len() == req.declared_size as usize;
            let frame = frame::block_download_segment(seq, last, frag);
            // Only the final outbound frame of the burst needs to (re)arm the
            // timeout; earlier ones in the burst are fire-and-forget.
            if !transport.send_sdo(self.config.cob_id_tx, &frame).is_ok() {
                sent_ok = false;
                break;
            }
            seq += 1;
        }
        if sent_ok {
            self.timeout.arm(now_ms);
        } else {
            self.timeout.cancel();
        }
    }

    fn on_block_download_frame<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        let awaiting_initiate_response = self.active.as_ref().unwrap().seqno == 0;
        if awaiting_initiate_response {
            if self.identifier_mismatch(data) {
                self.fail_active(transport, dictionary, AbortCode::CommandSpecifierNotValidOrUnknown, true, now_ms);
                return;
            }
            let resp = frame::decode_block_download_initiate_response(data);
            let req = self.active.as_mut().unwrap();
            req.block_size = resp.block_size.max(1);
            req.seqno = 1;
            self.send_block_download_burst(transport, now_ms);
            return;
        }

        let ack = frame::decode_block_download_ack(data);
        let req = self.active.as_ref().unwrap();
        let offset = (req.declared_size - req.transferred) as usize;
        let chunk_len = (req.transferred as usize).min(req.block_size as usize * 7);
        let frames_sent = (chunk_len + 6) / 7;

        if ack.ackseq as usize == frames_sent {
            let req = self.active.as_mut().unwrap();
            req.transferred -= chunk_len as u32;
            req.block_size = ack.next_block_size.max(1);
            if req.transferred == 0 {
                let rem = (req.declared_size % 7) as u8;
                let n = if rem == 0 { 0 } else { 7 - rem };
                let frame = frame::end_block_download(n);
                req.state = TransferState::BlockDownloadEnd;
                self.send(transport, &frame, now_ms);
            } else {
                self.send_block_download_burst(transport, now_ms);
            }
        } else {
            // Partial or zero ack: resend starting after the last good frame.
            let resume_offset = offset + (ack.ackseq as usize) * 7;
            let req = self.active.as_mut().unwrap();
            req.transferred = req.declared_size - resume_offset as u32;
            req.block_size = ack.next_block_size.max(1);
            self.send_block_download_burst(transport, now_ms);
        }
    }

    fn on_block_download_end<T: CanTransport, D: Dictionary>(
        &mut self,
        _data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        self.complete_active(transport, dictionary, UpdateFlag::Written, now_ms);
    }

    // ---- block upload ---------------------------------------------------------

    fn on_block_upload_frame<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        let awaiting_initiate_response = self.active.as_ref().unwrap().seqno == 0;
        if awaiting_initiate_response {
            if self.identifier_mismatch(data) {
                self.fail_active(transport, dictionary, AbortCode::CommandSpecifierNotValidOrUnknown, true, now_ms);
                return;
            }
            let resp = frame::decode_block_upload_initiate_response(data);
            if !resp.size_indicated {
                self.fail_active(transport, dictionary, AbortCode::DataTypeMismatchLengthMismatch, true, now_ms);
                return;
            }
            let req = self.active.as_mut().unwrap();
            req.declared_size = resp.declared_size;
            req.seqno = 1;
            let frame = frame::start_block_upload();
            self.send(transport, &frame, now_ms);
            return;
        }

        let seg = frame::decode_block_upload_segment(data);
        let req = self.active.as_mut().unwrap();
        if seg.seqno == req.seqno && !req.error_flag {
            req.segment_buffer.extend_from_slice(&data[1..]);
            req.ackseq = req.seqno;
        } else if !req.error_flag {
            req.error_flag = true;
        }

        let boundary = req.seqno >= req.block_size || seg.last;
        if !boundary {
            req.seqno += 1;
            return;
        }

        if !req.error_flag {
            let committed = req.segment_buffer.clone();
            req.payload_bytes.extend_from_slice(&committed);
        }
        req.segment_buffer.clear();
        let committed_len = req.payload_bytes.len() as u32;
        let remaining = req.declared_size.saturating_sub(committed_len);
        let next_block_size = (((remaining + 6) / 7).min(127)).max(1) as u8;
        let ackseq = req.ackseq;
        req.ackseq = 0;
        req.error_flag = false;
        req.seqno = 1;
        req.block_size = next_block_size;
        if seg.last {
            req.state = TransferState::BlockUploadEnd;
        }
        let frame = frame::block_upload_response(ackseq, next_block_size);
        self.send(transport, &frame, now_ms);
    }

    fn on_block_upload_end<T: CanTransport, D: Dictionary>(
        &mut self,
        data: &[u8; SDO_FRAME_LEN],
        transport: &mut T,
        dictionary: &mut D,
        now_ms: u64,
    ) {
        let end = frame::decode_block_upload_end(data);
        let req = self.active.as_mut().unwrap();
        let n = end.unused_tail as usize;
        if n > req.payload_bytes.len() {
            self.fail_active(transport, dictionary, AbortCode::InvalidBlockSize, true, now_ms);
            return;
        }
        let new_len = req.payload_bytes.len() - n;
        req.payload_bytes.truncate(new_len);
        if req.payload_bytes.len() as u32 != req.declared_size {
            self.fail_active(transport, dictionary, AbortCode::InvalidBlockSize, true, now_ms);
            return;
        }
        let frame = frame::end_block_upload();
        self.send(transport, &frame, now_ms);
        self.complete_active(transport, dictionary, UpdateFlag::Read, now_ms);
    }

    // ---- terminal transitions ----------------------------------------------

    fn complete_active<T: CanTransport, D: Dictionary>(&mut self, transport: &mut T, dictionary: &mut D, flag: UpdateFlag, now_ms: u64) {
        let req = self.active.take().expect("complete_active called without an active request");
        self.timeout.cancel();
        let value = Value::decode(req.declared_type, &req.payload_bytes).ok();
        info!("SDO transfer ({:#x}, {}) completed: {:?}", req.index, req.sub_index, flag);
        dictionary.update(req.index, req.sub_index, value.as_ref(), flag);
        self.state = EngineState::Free;
        self.pump(transport, dictionary, now_ms);
    }

    fn fail_active<T: CanTransport, D: Dictionary>(
        &mut self,
        transport: &mut T,
        dictionary: &mut D,
        abort_code: AbortCode,
        send_abort_frame: bool,
        now_ms: u64,
    ) {
        let req = self.active.take().expect("fail_active called without an active request");
        self.timeout.cancel();
        if send_abort_frame {
            let frame = frame::abort(req.index, req.sub_index, abort_code.code());
            let _ = transport.send_sdo(self.config.cob_id_tx, &frame);
        }
        error!("SDO transfer ({:#x}, {}) aborted: {:?}", req.index, req.sub_index, abort_code);
        dictionary.set_error(req.index, req.sub_index, abort_code);
        dictionary.update(req.index, req.sub_index, None, UpdateFlag::Error);
        self.state = EngineState::Free;
        self.pump(transport, dictionary, now_ms);
    }

    pub fn is_busy(&self) -> bool {
        self.state == EngineState::Busy
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }
}
