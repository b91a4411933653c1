/// Semantic type tag used to marshal the raw bytes of a transfer back into
/// a typed value once it completes. Mirrors the CANopen basic data types
/// (CiA 301 Table 44) that a client can request or write through SDO.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DataType {
    Boolean,
    Integer8,
    Integer16,
    Integer24,
    Integer32,
    Integer40,
    Integer48,
    Integer56,
    Integer64,
    Unsigned8,
    Unsigned16,
    Unsigned24,
    Unsigned32,
    Unsigned40,
    Unsigned48,
    Unsigned56,
    Unsigned64,
    Real32,
    Real64,
    VisibleString,
    OctetString,
    UnicodeString,
    TimeOfDay,
    TimeDifference,
    Domain,
}

impl DataType {
    /// Width in bytes for fixed-size types; `None` for variable-length types.
    /// Used to pick a sub-protocol for downloads whose size is implied by
    /// the type rather than an explicit byte slice.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            DataType::Boolean | DataType::Integer8 | DataType::Unsigned8 => Some(1),
            DataType::Integer16 | DataType::Unsigned16 => Some(2),
            DataType::Integer24 | DataType::Unsigned24 => Some(3),
            DataType::Integer32 | DataType::Unsigned32 | DataType::Real32 => Some(4),
            DataType::Integer40 | DataType::Unsigned40 => Some(5),
            DataType::Integer48
            | DataType::Unsigned48
            | DataType::TimeOfDay
            | DataType::TimeDifference => Some(6),
            DataType::Integer56 | DataType::Unsigned56 => Some(7),
            DataType::Integer64 | DataType::Unsigned64 | DataType::Real64 => Some(8),
            DataType::VisibleString
            | DataType::OctetString
            | DataType::UnicodeString
            | DataType::Domain => None,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::Integer8
                | DataType::Integer16
                | DataType::Integer24
                | DataType::Integer32
                | DataType::Integer40
                | DataType::Integer48
                | DataType::Integer56
                | DataType::Integer64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_matches_wire_size() {
        assert_eq!(DataType::Boolean.fixed_width(), Some(1));
        assert_eq!(DataType::Integer24.fixed_width(), Some(3));
        assert_eq!(DataType::Unsigned40.fixed_width(), Some(5));
        assert_eq!(DataType::Unsigned56.fixed_width(), Some(7));
        assert_eq!(DataType::Real64.fixed_width(), Some(8));
        assert_eq!(DataType::TimeOfDay.fixed_width(), Some(6));
        assert_eq!(DataType::Domain.fixed_width(), None);
        assert_eq!(DataType::VisibleString.fixed_width(), None);
    }

    #[test]
    fn signedness() {
        assert!(DataType::Integer32.is_signed());
        assert!(!DataType::Unsigned32.is_signed());
        assert!(!DataType::Real32.is_signed());
    }
}
