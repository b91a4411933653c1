use core::fmt::Formatter;
use crate::prelude::*;

/// Local error conditions that never reach the wire: malformed inputs to
/// the codec, a transport that failed to send, or a caller violating a
/// precondition of the public API. Distinct from [`AbortCode`], which is
/// the CANopen wire-level abort reason sent to or received from the server.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ClientError {
    /// The transport reported a send failure for an outbound frame.
    TransportSendFailed,
    /// A received frame was not exactly 8 bytes.
    MalformedFrame { len: usize },
    /// A byte slice handed to the marshaller did not match the width its
    /// `DataType` requires.
    ValueLengthMismatch { expected: usize, got: usize },
    /// The active request left the engine without completing cleanly;
    /// used internally to signal an invariant violation rather than a
    /// wire-level protocol failure.
    InternalStateError { more_info: String },
}

impl core::fmt::Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ClientError::TransportSendFailed => write!(f, "transport failed to send a frame"),
            ClientError::MalformedFrame { len } => write!(f, "frame has {} bytes, expected 8", len),
            ClientError::ValueLengthMismatch { expected, got } => {
                write!(f, "value is {} bytes, expected {}", got, expected)
            }
            ClientError::InternalStateError { more_info } => {
                write!(f, "internal SDO engine error: {}", more_info)
            }
        }
    }
}

/// The 32-bit CANopen abort code family (CiA 301 Table 39), restricted to
/// the codes this client can emit or must recognize when received.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum AbortCode {
    ToggleBitNotAlternated,
    SdoProtocolTimedOut,
    CommandSpecifierNotValidOrUnknown,
    InvalidBlockSize,
    InvalidSequenceNumber,
    CRCError,
    OutOfMemory,
    UnsupportedAccessToObject,
    ObjectDoesNotExistInObjectDictionary,
    DataTypeMismatchLengthMismatch,
    SubIndexDoesNotExist,
    GeneralError,
    /// Covers any abort code the client receives but has no dedicated
    /// variant for; the raw code is still preserved in the notification
    /// sent to the dictionary.
    Other(u32),
}

impl AbortCode {
    pub fn code(&self) -> u32 {
        match *self {
            AbortCode::ToggleBitNotAlternated => 0x0503_0000,
            AbortCode::SdoProtocolTimedOut => 0x0504_0000,
            AbortCode::CommandSpecifierNotValidOrUnknown => 0x0504_0001,
            AbortCode::InvalidBlockSize => 0x0504_0002,
            AbortCode::InvalidSequenceNumber => 0x0504_0003,
            AbortCode::CRCError => 0x0504_0004,
            AbortCode::OutOfMemory => 0x0504_0005,
            AbortCode::UnsupportedAccessToObject => 0x0601_0000,
            AbortCode::ObjectDoesNotExistInObjectDictionary => 0x0602_0000,
            AbortCode::DataTypeMismatchLengthMismatch => 0x0607_0010,
            AbortCode::SubIndexDoesNotExist => 0x0609_0011,
            AbortCode::GeneralError => 0x0800_0000,
            AbortCode::Other(code) => code,
        }
    }

    pub fn description(&self) -> &'static str {
        match *self {
            AbortCode::ToggleBitNotAlternated => "Toggle bit not alternated",
            AbortCode::SdoProtocolTimedOut => "SDO protocol timed out",
            AbortCode::CommandSpecifierNotValidOrUnknown => "Client/server command specifier not valid or unknown",
            AbortCode::InvalidBlockSize => "Invalid block size (block mode only)",
            AbortCode::InvalidSequenceNumber => "Invalid sequence number (block mode only)",
            AbortCode::CRCError => "CRC error (block mode only)",
            AbortCode::OutOfMemory => "Out of memory",
            AbortCode::UnsupportedAccessToObject => "Unsupported access to an object",
            AbortCode::ObjectDoesNotExistInObjectDictionary => "Object does not exist in the object dictionary",
            AbortCode::DataTypeMismatchLengthMismatch => "Data type does not match; length of service parameter does not match",
            AbortCode::SubIndexDoesNotExist => "Sub-index does not exist",
            AbortCode::GeneralError => "General error",
            AbortCode::Other(_) => "Unrecognized abort code",
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0x0503_0000 => AbortCode::ToggleBitNotAlternated,
            0x0504_0000 => AbortCode::SdoProtocolTimedOut,
            0x0504_0001 => AbortCode::CommandSpecifierNotValidOrUnknown,
            0x0504_0002 => AbortCode::InvalidBlockSize,
            0x0504_0003 => AbortCode::InvalidSequenceNumber,
            0x0504_0004 => AbortCode::CRCError,
            0x0504_0005 => AbortCode::OutOfMemory,
            0x0601_0000 => AbortCode::UnsupportedAccessToObject,
            0x0602_0000 => AbortCode::ObjectDoesNotExistInObjectDictionary,
            0x0607_0010 => AbortCode::DataTypeMismatchLengthMismatch,
            0x0609_0011 => AbortCode::SubIndexDoesNotExist,
            0x0800_0000 => AbortCode::GeneralError,
            other => AbortCode::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_codes() {
        let codes = [
            AbortCode::ToggleBitNotAlternated,
            AbortCode::SdoProtocolTimedOut,
            AbortCode::CommandSpecifierNotValidOrUnknown,
            AbortCode::InvalidBlockSize,
            AbortCode::DataTypeMismatchLengthMismatch,
            AbortCode::SubIndexDoesNotExist,
        ];
        for code in codes {
            assert_eq!(AbortCode::from_code(code.code()), code);
        }
    }

    #[test]
    fn unknown_code_preserved() {
        let ac = AbortCode::from_code(0xDEAD_BEEF);
        assert_eq!(ac, AbortCode::Other(0xDEAD_BEEF));
        assert_eq!(ac.code(), 0xDEAD_BEEF);
    }

    #[test]
    fn spec_literal_codes() {
        assert_eq!(AbortCode::ToggleBitNotAlternated.code(), 0x0503_0000);
        assert_eq!(AbortCode::SdoProtocolTimedOut.code(), 0x0504_0000);
        assert_eq!(AbortCode::CommandSpecifierNotValidOrUnknown.code(), 0x0504_0001);
        assert_eq!(AbortCode::DataTypeMismatchLengthMismatch.code(), 0x0607_0010);
    }
}
