//! Frames to be sent on the bus

use super::{dlc_to_len, FrameFormat, TooMuchData};
use embedded_can::{Id, StandardId};

/// A transmission request, handed to the controller through
/// [`Mac::data_req`].
///
/// Fields are public so that a request can also be assembled directly, for
/// instance with a data length code above 8 (legal in a classical frame; 8
/// bytes are transmitted regardless).
///
/// [`Mac::data_req`]: crate::mac::Mac::data_req
#[derive(Copy, Clone, Debug)]
pub struct Frame {
    /// The 11-bit identifier
    pub id: StandardId,
    /// Requested frame format
    pub format: FrameFormat,
    /// Data length code as transmitted, 0..=15
    pub dlc: u8,
    /// Data field backing buffer
    pub data: [u8; 8],
}

impl Frame {
    /// Builds a classical base data frame carrying `data`, with the data
    /// length code equal to the payload length.
    pub fn new(id: StandardId, data: &[u8]) -> Result<Self, TooMuchData> {
        if data.len() > 8 {
            return Err(TooMuchData);
        }
        let mut buf = [0; 8];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self {
            id,
            format: FrameFormat::Cbff,
            dlc: data.len() as u8,
            data: buf,
        })
    }
}

impl embedded_can::Frame for Frame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let Id::Standard(id) = id.into() else {
            return None;
        };
        Frame::new(id, data).ok()
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        // Remote frames are unsupported
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.dlc.into()
    }

    fn data(&self) -> &[u8] {
        &self.data[..dlc_to_len(self.dlc)]
    }
}
