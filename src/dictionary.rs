use crate::error::AbortCode;
use crate::prelude::*;
use crate::value::Value;

/// How a completed transfer affects the object dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFlag {
    Read,
    Written,
    Error,
}

/// The narrow capability handle the Engine is given at construction instead
/// of a pointer back to a full object-dictionary store. The dictionary does
/// not need to know anything about SDO internals; it only reacts to the
/// outcome of a transfer it already knew was in flight.
pub trait Dictionary {
    /// Called exactly once per request, after it leaves the active slot.
    /// `value` is `Some` on `Read`/`Written`, `None` on `Error`.
    fn update(&mut self, index: u16, sub_index: u8, value: Option<&Value>, flag: UpdateFlag);

    /// Called immediately before `update(.., UpdateFlag::Error)` whenever the
    /// failure carries a wire-level abort code (as opposed to a transport
    /// failure or timeout, which still call `update` with `UpdateFlag::Error`
    /// but have no abort code to report).
    fn set_error(&mut self, index: u16, sub_index: u8, abort_code: AbortCode);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Default)]
    pub(crate) struct RecordingDictionary {
        pub(crate) updates: Vec<(u16, u8, Option<Value>, UpdateFlag)>,
        pub(crate) errors: Vec<(u16, u8, AbortCode)>,
    }

    impl Dictionary for RecordingDictionary {
        fn update(&mut self, index: u16, sub_index: u8, value: Option<&Value>, flag: UpdateFlag) {
            self.updates.push((index, sub_index, value.cloned(), flag));
        }

        fn set_error(&mut self, index: u16, sub_index: u8, abort_code: AbortCode) {
            self.errors.push((index, sub_index, abort_code));
        }
    }

    #[test]
    fn records_a_successful_read() {
        let mut dict = RecordingDictionary::default();
        let v = Value::Unsigned32(7);
        dict.update(0x1018, 1, Some(&v), UpdateFlag::Read);
        assert_eq!(dict.updates.len(), 1);
        assert_eq!(dict.updates[0].3, UpdateFlag::Read);
    }

    #[test]
    fn records_error_with_companion_abort_code() {
        let mut dict = RecordingDictionary::default();
        dict.set_error(0x1018, 1, AbortCode::SdoProtocolTimedOut);
        dict.update(0x1018, 1, None, UpdateFlag::Error);
        assert_eq!(dict.errors[0].2, AbortCode::SdoProtocolTimedOut);
        assert!(dict.updates[0].2.is_none());
    }
}
