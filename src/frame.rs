use bitfield_struct::bitfield;

use crate::prelude::*;

/// Number of bytes in every SDO frame payload (CiA 301 §7.2.4).
pub const SDO_FRAME_LEN: usize = 8;

/// Command specifiers carried in bits 7:5 of byte 0, client-to-server direction.
pub mod ccs {
    pub const DOWNLOAD_SEGMENT: u8 = 0;
    pub const INITIATE_DOWNLOAD: u8 = 1;
    pub const INITIATE_UPLOAD: u8 = 2;
    pub const UPLOAD_SEGMENT: u8 = 3;
    pub const ABORT: u8 = 4;
    pub const BLOCK_UPLOAD: u8 = 5;
    pub const BLOCK_DOWNLOAD: u8 = 6;
}

/// Command specifiers carried in bits 7:5 of byte 0, server-to-client direction.
pub mod scs {
    pub const UPLOAD_SEGMENT: u8 = 0;
    pub const DOWNLOAD_SEGMENT: u8 = 1;
    pub const INITIATE_UPLOAD: u8 = 2;
    pub const INITIATE_DOWNLOAD: u8 = 3;
    pub const ABORT: u8 = 4;
    pub const BLOCK_DOWNLOAD: u8 = 5;
    pub const BLOCK_UPLOAD: u8 = 6;
}

/// Block-transfer subcommands, carried in the low bits of byte 0 once `ccs`/`scs`
/// is 5 (block upload) or 6 (block download).
pub mod block_cs {
    pub const INITIATE: u8 = 0;
    pub const END: u8 = 1;
    pub const CONFIRM: u8 = 2;
    pub const START: u8 = 3;
}

#[bitfield(u8, order = Msb)]
pub struct InitiateCmd {
    #[bits(3)]
    pub cs: u8,
    #[bits(1)]
    _reserved: u8,
    #[bits(2)]
    pub n: u8,
    #[bits(1)]
    pub e: bool,
    #[bits(1)]
    pub s: bool,
}

#[bitfield(u8, order = Msb)]
pub struct SegmentCmd {
    #[bits(3)]
    pub cs: u8,
    #[bits(1)]
    pub t: u8,
    #[bits(3)]
    pub n: u8,
    #[bits(1)]
    pub c: bool,
}

#[bitfield(u8, order = Msb)]
pub struct BlockDownloadInitiateCmd {
    #[bits(3)]
    pub cs: u8,
    #[bits(2)]
    _reserved: u8,
    #[bits(1)]
    pub cc: bool,
    #[bits(1)]
    pub s: bool,
    #[bits(1)]
    pub sub: bool,
}

#[bitfield(u8, order = Msb)]
pub struct BlockDownloadEndCmd {
    #[bits(3)]
    pub cs: u8,
    #[bits(3)]
    pub n: u8,
    #[bits(1)]
    _reserved: bool,
    #[bits(1)]
    pub sub: bool,
}

#[bitfield(u8, order = Msb)]
pub struct BlockUploadInitiateCmd {
    #[bits(3)]
    pub cs: u8,
    #[bits(2)]
    _reserved: u8,
    #[bits(1)]
    pub cc: bool,
    #[bits(2)]
    pub sub: u8,
}

#[bitfield(u8, order = Msb)]
pub struct BlockUploadCmd {
    #[bits(3)]
    pub cs: u8,
    #[bits(3)]
    _reserved: u8,
    #[bits(2)]
    pub sub: u8,
}

fn flatten8(parts: &[&[u8]]) -> [u8; SDO_FRAME_LEN] {
    let mut out = [0u8; SDO_FRAME_LEN];
    let mut i = 0;
    for part in parts {
        for &b in part.iter() {
            if i >= SDO_FRAME_LEN {
                break;
            }
            out[i] = b;
            i += 1;
        }
    }
    out
}

/// Client → server: expedited download initiate. `data` is 1..4 bytes.
pub fn initiate_download_expedited(index: u16, sub_index: u8, data: &[u8]) -> [u8; SDO_FRAME_LEN] {
    let n = (4 - data.len()) as u8;
    let cmd = InitiateCmd::new()
        .with_cs(ccs::INITIATE_DOWNLOAD)
        .with_n(n)
        .with_e(true)
        .with_s(true);
    flatten8(&[&[cmd.into()], &index.to_le_bytes(), &[sub_index], data])
}

/// Client → server: normal (segmented) download initiate, declaring the total size.
pub fn initiate_download_segmented(index: u16, sub_index: u8, size: u32) -> [u8; SDO_FRAME_LEN] {
    let cmd = InitiateCmd::new().with_cs(ccs::INITIATE_DOWNLOAD).with_s(true);
    flatten8(&[&[cmd.into()], &index.to_le_bytes(), &[sub_index], &size.to_le_bytes()])
}

/// Client → server: upload initiate request (server decides expedited vs segmented).
pub fn initiate_upload(index: u16, sub_index: u8) -> [u8; SDO_FRAME_LEN] {
    let cmd = InitiateCmd::new().with_cs(ccs::INITIATE_UPLOAD);
    flatten8(&[&[cmd.into()], &index.to_le_bytes(), &[sub_index]])
}

/// Client → server: one download-segment frame carrying up to 7 data bytes.
pub fn download_segment(toggle: bool, data: &[u8], last: bool) -> [u8; SDO_FRAME_LEN] {
    let n = (7 - data.len()) as u8;
    let cmd = SegmentCmd::new()
        .with_cs(ccs::DOWNLOAD_SEGMENT)
        .with_t(toggle as u8)
        .with_n(n)
        .with_c(last);
    flatten8(&[&[cmd.into()], data])
}

/// Client → server: request for the next upload segment.
pub fn upload_segment_request(toggle: bool) -> [u8; SDO_FRAME_LEN] {
    let cmd = SegmentCmd::new().with_cs(ccs::UPLOAD_SEGMENT).with_t(toggle as u8);
    flatten8(&[&[cmd.into()]])
}

/// Client → server: abort the active transfer with the given reason.
pub fn abort(index: u16, sub_index: u8, code: u32) -> [u8; SDO_FRAME_LEN] {
    flatten8(&[
        &[ccs::ABORT << 5],
        &index.to_le_bytes(),
        &[sub_index],
        &code.to_le_bytes(),
    ])
}

/// Client → server: block-download initiate, declaring the total size, CRC disabled.
pub fn init_block_download(index: u16, sub_index: u8, size: u32) -> [u8; SDO_FRAME_LEN] {
    let cmd = BlockDownloadInitiateCmd::new()
        .with_cs(ccs::BLOCK_DOWNLOAD)
        .with_cc(false)
        .with_s(true)
        .with_sub(false);
    flatten8(&[&[cmd.into()], &index.to_le_bytes(), &[sub_index], &size.to_le_bytes()])
}

/// Client → server: one sub-block frame. `seqno` is 1..=127; `last` marks the final
/// frame of the whole transfer (not just the sub-block).
pub fn block_download_segment(seqno: u8, last: bool, data: &[u8]) -> [u8; SDO_FRAME_LEN] {
    let byte0 = seqno | (if last { 0x80 } else { 0 });
    flatten8(&[&[byte0], data])
}

/// Client → server: block-download end, `n` is the number of unused tail bytes
/// (0..=7) in the final sub-block frame. CRC is always transmitted as zero.
pub fn end_block_download(n: u8) -> [u8; SDO_FRAME_LEN] {
    let cmd = BlockDownloadEndCmd::new()
        .with_cs(ccs::BLOCK_DOWNLOAD)
        .with_n(n)
        .with_sub(true);
    flatten8(&[&[cmd.into()], &[0, 0]])
}

/// Client → server: block-upload initiate, CRC disabled, `pst` always zero.
pub fn init_block_upload(index: u16, sub_index: u8, block_size: u8) -> [u8; SDO_FRAME_LEN] {
    let cmd = BlockUploadInitiateCmd::new()
        .with_cs(ccs::BLOCK_UPLOAD)
        .with_cc(false)
        .with_sub(block_cs::INITIATE);
    flatten8(&[&[cmd.into()], &index.to_le_bytes(), &[sub_index], &[block_size, 0]])
}

/// Client → server: starts the server's sub-block streaming.
pub fn start_block_upload() -> [u8; SDO_FRAME_LEN] {
    let cmd = BlockUploadCmd::new().with_cs(ccs::BLOCK_UPLOAD).with_sub(block_cs::START);
    flatten8(&[&[cmd.into()]])
}

/// Client → server: acknowledges a completed sub-block and requests the next one.
pub fn block_upload_response(ackseq: u8, block_size: u8) -> [u8; SDO_FRAME_LEN] {
    let cmd = BlockUploadCmd::new().with_cs(ccs::BLOCK_UPLOAD).with_sub(block_cs::CONFIRM);
    flatten8(&[&[cmd.into()], &[ackseq, block_size]])
}

/// Client → server: confirms receipt of the block-upload-end frame.
pub fn end_block_upload() -> [u8; SDO_FRAME_LEN] {
    let cmd = BlockUploadCmd::new().with_cs(ccs::BLOCK_UPLOAD).with_sub(block_cs::END);
    flatten8(&[&[cmd.into()]])
}

/// The (index, subindex) pair carried in bytes 1..4 of every initiate frame.
pub fn index_of(data: &[u8; SDO_FRAME_LEN]) -> (u16, u8) {
    (u16::from_le_bytes([data[1], data[2]]), data[3])
}

pub fn scs_of(data: &[u8; SDO_FRAME_LEN]) -> u8 {
    data[0] >> 5
}

/// Decoded server response to an upload/download initiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitiateResponse {
    pub expedited: bool,
    pub size_indicated: bool,
    pub unused_tail: u8,
}

pub fn decode_initiate_response(data: &[u8; SDO_FRAME_LEN]) -> InitiateResponse {
    let cmd = InitiateCmd::from(data[0]);
    InitiateResponse {
        expedited: cmd.e(),
        size_indicated: cmd.s(),
        unused_tail: cmd.n(),
    }
}

/// Decoded server response to a download-segment or upload-segment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentResponse {
    pub toggle: bool,
    pub unused_tail: u8,
    pub last: bool,
}

pub fn decode_segment_response(data: &[u8; SDO_FRAME_LEN]) -> SegmentResponse {
    let cmd = SegmentCmd::from(data[0]);
    SegmentResponse {
        toggle: cmd.t() != 0,
        unused_tail: cmd.n(),
        last: cmd.c(),
    }
}

/// Decoded server response to a block-download initiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDownloadInitiateResponse {
    pub crc_enabled: bool,
    pub block_size: u8,
}

pub fn decode_block_download_initiate_response(data: &[u8; SDO_FRAME_LEN]) -> BlockDownloadInitiateResponse {
    let cmd = BlockDownloadInitiateCmd::from(data[0]);
    BlockDownloadInitiateResponse {
        crc_enabled: cmd.cc(),
        block_size: data[4],
    }
}

/// Decoded server ack of a completed sub-block during block download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDownloadAck {
    pub ackseq: u8,
    pub next_block_size: u8,
}

pub fn decode_block_download_ack(data: &[u8; SDO_FRAME_LEN]) -> BlockDownloadAck {
    BlockDownloadAck {
        ackseq: data[1],
        next_block_size: data[2],
    }
}

/// Decoded server response to a block-upload initiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUploadInitiateResponse {
    pub crc_enabled: bool,
    pub size_indicated: bool,
    pub declared_size: u32,
}

pub fn decode_block_upload_initiate_response(data: &[u8; SDO_FRAME_LEN]) -> BlockUploadInitiateResponse {
    let cmd = BlockUploadInitiateCmd::from(data[0]);
    // bit 0 of byte 0 doubles as the size-indicated flag on this response.
    let size_indicated = data[0] & 0x01 != 0;
    BlockUploadInitiateResponse {
        crc_enabled: cmd.cc(),
        size_indicated,
        declared_size: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
    }
}

/// Decoded server sub-block data frame during block upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUploadSegment {
    pub seqno: u8,
    pub last: bool,
}

pub fn decode_block_upload_segment(data: &[u8; SDO_FRAME_LEN]) -> BlockUploadSegment {
    BlockUploadSegment {
        seqno: data[0] & 0x7F,
        last: data[0] & 0x80 != 0,
    }
}

/// Decoded server block-upload-end frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUploadEnd {
    pub unused_tail: u8,
}

pub fn decode_block_upload_end(data: &[u8; SDO_FRAME_LEN]) -> BlockUploadEnd {
    // Same n-at-bits-4:2 layout as the block-download-end command byte.
    let cmd = BlockDownloadEndCmd::from(data[0]);
    BlockUploadEnd { unused_tail: cmd.n() }
}

/// The 32-bit abort code carried in bytes 4..7 of a server abort frame.
pub fn decode_abort_code(data: &[u8; SDO_FRAME_LEN]) -> u32 {
    u32::from_le_bytes([data[4], data[5], data[6], data[7]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expedited_upload_initiate_request() {
        let frame = initiate_upload(0x1018, 1);
        assert_eq!(frame, [0x40, 0x18, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn expedited_download_initiate_request() {
        let frame = initiate_download_expedited(0x6040, 0, &0x1234u16.to_le_bytes());
        assert_eq!(frame, [0x2B, 0x40, 0x60, 0x00, 0x34, 0x12, 0x00, 0x00]);
    }

    #[test]
    fn initiate_response_decodes_expedited_flags() {
        let data = [0x43u8, 0x18, 0x10, 0x01, 0xEF, 0xBE, 0xAD, 0xDE];
        let resp = decode_initiate_response(&data);
        assert!(resp.expedited);
        assert!(resp.size_indicated);
        assert_eq!(resp.unused_tail, 0);
        assert_eq!(scs_of(&data), scs::INITIATE_UPLOAD);
    }

    #[test]
    fn segment_request_toggles() {
        assert_eq!(upload_segment_request(false)[0], 0x60);
        assert_eq!(upload_segment_request(true)[0], 0x70);
    }

    #[test]
    fn abort_frame_matches_spec_example() {
        let frame = abort(0, 0, 0x0503_0000);
        assert_eq!(frame, [0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x05]);
    }

    #[test]
    fn block_download_ack_decodes() {
        let data = [0xA2u8, 0x1D, 0x7F, 0x00, 0x00, 0x00, 0x00, 0x00];
        let ack = decode_block_download_ack(&data);
        assert_eq!(ack.ackseq, 29);
        assert_eq!(ack.next_block_size, 127);
    }

    #[test]
    fn block_upload_segment_last_flag() {
        let data = [0x83u8, 1, 2, 3, 4, 5, 6, 7];
        let seg = decode_block_upload_segment(&data);
        assert_eq!(seg.seqno, 3);
        assert!(seg.last);
    }
}
