use embedded_can::nb::Can;
use embedded_can::{Frame, StandardId};

use crate::error::ClientError;
use crate::frame::SDO_FRAME_LEN;
use crate::prelude::*;
use crate::{error, info, warn};

/// Non-blocking CAN transport the client sends SDO frames over and receives
/// them from. Anything implementing `embedded_can::nb::Can` gets this for
/// free; the client only ever sees raw 8-byte SDO payloads and a COB-ID.
pub trait CanTransport {
    fn send_sdo(&mut self, cob_id: u16, data: &[u8; SDO_FRAME_LEN]) -> Result<(), ClientError>;

    /// Returns the next inbound SDO frame, or `None` if nothing is waiting.
    /// A frame whose `dlc` is not exactly 8 bytes is dropped and logged.
    fn receive_sdo(&mut self) -> Option<[u8; SDO_FRAME_LEN]>;
}

impl<C> CanTransport for C
where
    C: Can,
    C::Frame: Frame + Debug,
{
    fn send_sdo(&mut self, cob_id: u16, data: &[u8; SDO_FRAME_LEN]) -> Result<(), ClientError> {
        let id = StandardId::new(cob_id).ok_or(ClientError::TransportSendFailed)?;
        let frame = C::Frame::new(id, data).ok_or(ClientError::TransportSendFailed)?;
        match self.transmit(&frame) {
            Ok(_) => Ok(()),
            Err(err) => {
                error!("transport failed to send SDO frame: {:?}, err = {:?}", frame, err);
                Err(ClientError::TransportSendFailed)
            }
        }
    }

    fn receive_sdo(&mut self) -> Option<[u8; SDO_FRAME_LEN]> {
        match self.receive() {
            Ok(frame) => {
                let data = frame.data();
                if data.len() != SDO_FRAME_LEN {
                    warn!("dropped inbound frame with unexpected length {}", data.len());
                    return None;
                }
                let mut out = [0u8; SDO_FRAME_LEN];
                out.copy_from_slice(data);
                Some(out)
            }
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(err)) => {
                info!("error reading CAN frame: {:?}", err);
                None
            }
        }
    }
}
