use crate::data_type::DataType;
use crate::error::ClientError;
use crate::prelude::*;

/// CANopen `TIME_OF_DAY` / `TIME_DIFFERENCE` wire structure: a 28-bit
/// millisecond-of-day field (4 reserved bits above it) followed by a 16-bit
/// day count, both little-endian, 6 bytes total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStamp {
    pub days: u16,
    pub milliseconds: u32,
}

impl TimeStamp {
    fn to_bytes(self) -> Vec<u8> {
        let low = self.milliseconds & 0x0FFF_FFFF;
        let mut out = low.to_le_bytes().to_vec();
        out.extend_from_slice(&self.days.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let low = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let days = u16::from_le_bytes([bytes[4], bytes[5]]);
        TimeStamp {
            days,
            milliseconds: low & 0x0FFF_FFFF,
        }
    }
}

/// A typed object-dictionary value, tagged by the CANopen basic type it was
/// transferred as. Produced by the Marshaller on upload completion, consumed
/// by the Marshaller to build the byte payload of a download.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer8(i8),
    Integer16(i16),
    Integer24(i32),
    Integer32(i32),
    Integer40(i64),
    Integer48(i64),
    Integer56(i64),
    Integer64(i64),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned24(u32),
    Unsigned32(u32),
    Unsigned40(u64),
    Unsigned48(u64),
    Unsigned56(u64),
    Unsigned64(u64),
    Real32(f32),
    Real64(f64),
    VisibleString(String),
    OctetString(Vec<u8>),
    UnicodeString(Vec<u8>),
    TimeOfDay(TimeStamp),
    TimeDifference(TimeStamp),
    Domain(Vec<u8>),
}

fn sign_extend_le(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    if let Some(&last) = bytes.last() {
        if last & 0x80 != 0 {
            for b in &mut buf[bytes.len()..] {
                *b = 0xFF;
            }
        }
    }
    i64::from_le_bytes(buf)
}

fn zero_extend_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

fn truncate_le(value: i64, width: usize) -> Vec<u8> {
    value.to_le_bytes()[..width].to_vec()
}

fn truncate_le_unsigned(value: u64, width: usize) -> Vec<u8> {
    value.to_le_bytes()[..width].to_vec()
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer8(_) => DataType::Integer8,
            Value::Integer16(_) => DataType::Integer16,
            Value::Integer24(_) => DataType::Integer24,
            Value::Integer32(_) => DataType::Integer32,
            Value::Integer40(_) => DataType::Integer40,
            Value::Integer48(_) => DataType::Integer48,
            Value::Integer56(_) => DataType::Integer56,
            Value::Integer64(_) => DataType::Integer64,
            Value::Unsigned8(_) => DataType::Unsigned8,
            Value::Unsigned16(_) => DataType::Unsigned16,
            Value::Unsigned24(_) => DataType::Unsigned24,
            Value::Unsigned32(_) => DataType::Unsigned32,
            Value::Unsigned40(_) => DataType::Unsigned40,
            Value::Unsigned48(_) => DataType::Unsigned48,
            Value::Unsigned56(_) => DataType::Unsigned56,
            Value::Unsigned64(_) => DataType::Unsigned64,
            Value::Real32(_) => DataType::Real32,
            Value::Real64(_) => DataType::Real64,
            Value::VisibleString(_) => DataType::VisibleString,
            Value::OctetString(_) => DataType::OctetString,
            Value::UnicodeString(_) => DataType::UnicodeString,
            Value::TimeOfDay(_) => DataType::TimeOfDay,
            Value::TimeDifference(_) => DataType::TimeDifference,
            Value::Domain(_) => DataType::Domain,
        }
    }

    /// Encodes this value to the little-endian byte sequence it would occupy
    /// on the wire. Strings carry no terminator; `Domain` is passed through.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::Boolean(b) => vec![*b as u8],
            Value::Integer8(v) => v.to_le_bytes().to_vec(),
            Value::Integer16(v) => v.to_le_bytes().to_vec(),
            Value::Integer24(v) => truncate_le(*v as i64, 3),
            Value::Integer32(v) => v.to_le_bytes().to_vec(),
            Value::Integer40(v) => truncate_le(*v, 5),
            Value::Integer48(v) => truncate_le(*v, 6),
            Value::Integer56(v) => truncate_le(*v, 7),
            Value::Integer64(v) => v.to_le_bytes().to_vec(),
            Value::Unsigned8(v) => v.to_le_bytes().to_vec(),
            Value::Unsigned16(v) => v.to_le_bytes().to_vec(),
            Value::Unsigned24(v) => truncate_le_unsigned(*v as u64, 3),
            Value::Unsigned32(v) => v.to_le_bytes().to_vec(),
            Value::Unsigned40(v) => truncate_le_unsigned(*v, 5),
            Value::Unsigned48(v) => truncate_le_unsigned(*v, 6),
            Value::Unsigned56(v) => truncate_le_unsigned(*v, 7),
            Value::Unsigned64(v) => v.to_le_bytes().to_vec(),
            Value::Real32(v) => v.to_le_bytes().to_vec(),
            Value::Real64(v) => v.to_le_bytes().to_vec(),
            Value::VisibleString(s) => s.as_bytes().to_vec(),
            Value::OctetString(b) => b.clone(),
            Value::UnicodeString(b) => b.clone(),
            Value::TimeOfDay(t) => t.to_bytes(),
            Value::TimeDifference(t) => t.to_bytes(),
            Value::Domain(b) => b.clone(),
        }
    }

    /// Decodes `bytes` according to `data_type`. Fixed-width types require an
    /// exact length match; variable-length types accept any length.
    pub fn decode(data_type: DataType, bytes: &[u8]) -> Result<Value, ClientError> {
        if let Some(width) = data_type.fixed_width() {
            if bytes.len() != width {
                return Err(ClientError::ValueLengthMismatch {
                    expected: width,
                    got: bytes.len(),
                });
            }
        }

        Ok(match data_type {
            DataType::Boolean => Value::Boolean(bytes[0] != 0),
            DataType::Integer8 => Value::Integer8(bytes[0] as i8),
            DataType::Integer16 => Value::Integer16(i16::from_le_bytes([bytes[0], bytes[1]])),
            DataType::Integer24 => Value::Integer24(sign_extend_le(bytes) as i32),
            DataType::Integer32 => Value::Integer32(i32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Integer40 => Value::Integer40(sign_extend_le(bytes)),
            DataType::Integer48 => Value::Integer48(sign_extend_le(bytes)),
            DataType::Integer56 => Value::Integer56(sign_extend_le(bytes)),
            DataType::Integer64 => Value::Integer64(i64::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Unsigned8 => Value::Unsigned8(bytes[0]),
            DataType::Unsigned16 => Value::Unsigned16(u16::from_le_bytes([bytes[0], bytes[1]])),
            DataType::Unsigned24 => Value::Unsigned24(zero_extend_le(bytes) as u32),
            DataType::Unsigned32 => Value::Unsigned32(u32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Unsigned40 => Value::Unsigned40(zero_extend_le(bytes)),
            DataType::Unsigned48 => Value::Unsigned48(zero_extend_le(bytes)),
            DataType::Unsigned56 => Value::Unsigned56(zero_extend_le(bytes)),
            DataType::Unsigned64 => Value::Unsigned64(u64::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Real32 => Value::Real32(f32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Real64 => Value::Real64(f64::from_le_bytes(bytes.try_into().unwrap())),
            DataType::VisibleString => Value::VisibleString(
                String::from_utf8_lossy(bytes).into_owned(),
            ),
            DataType::OctetString => Value::OctetString(bytes.to_vec()),
            DataType::UnicodeString => Value::UnicodeString(bytes.to_vec()),
            DataType::TimeOfDay => Value::TimeOfDay(TimeStamp::from_bytes(bytes)),
            DataType::TimeDifference => Value::TimeDifference(TimeStamp::from_bytes(bytes)),
            DataType::Domain => Value::Domain(bytes.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_expedited_u32() {
        let v = Value::Unsigned32(0xDEADBEEF);
        let bytes = v.encode();
        assert_eq!(bytes, vec![0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(Value::decode(DataType::Unsigned32, &bytes).unwrap(), v);
    }

    #[test]
    fn packs_tight_width_integers() {
        let v = Value::Integer24(-1);
        assert_eq!(v.encode(), vec![0xFF, 0xFF, 0xFF]);
        let back = Value::decode(DataType::Integer24, &[0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(back, Value::Integer24(-1));

        let u = Value::Unsigned40(0x01_0203_0405);
        assert_eq!(u.encode(), vec![0x05, 0x04, 0x03, 0x02, 0x01]);
        let back = Value::decode(DataType::Unsigned40, &u.encode()).unwrap();
        assert_eq!(back, u);
    }

    #[test]
    fn sign_extends_negative_values() {
        let v = Value::Integer48(-42);
        let bytes = v.encode();
        assert_eq!(bytes.len(), 6);
        let back = Value::decode(DataType::Integer48, &bytes).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn rejects_wrong_length_for_fixed_width_type() {
        let err = Value::decode(DataType::Unsigned32, &[1, 2, 3]).unwrap_err();
        assert_eq!(err, ClientError::ValueLengthMismatch { expected: 4, got: 3 });
    }

    #[test]
    fn visible_string_has_no_terminator() {
        let v = Value::VisibleString("hello".to_string());
        assert_eq!(v.encode(), b"hello".to_vec());
    }

    #[test]
    fn time_of_day_packs_28_bit_ms_and_16_bit_days() {
        let ts = TimeStamp {
            days: 14_000,
            milliseconds: 12_345_678,
        };
        let v = Value::TimeOfDay(ts);
        let bytes = v.encode();
        assert_eq!(bytes.len(), 6);
        let back = Value::decode(DataType::TimeOfDay, &bytes).unwrap();
        assert_eq!(back, Value::TimeOfDay(ts));
    }

    #[test]
    fn domain_passes_through_arbitrary_bytes() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let v = Value::Domain(data.clone());
        assert_eq!(v.encode(), data);
        assert_eq!(Value::decode(DataType::Domain, &data).unwrap(), Value::Domain(data));
    }
}
