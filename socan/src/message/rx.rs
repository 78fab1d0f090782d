//! Frames received from the bus

use super::{dlc_to_len, FrameFormat};
use embedded_can::{Id, StandardId};

/// A frame reassembled by the receive engine, delivered to the upper layer
/// once it has passed CRC and form checks.
#[derive(Copy, Clone, Debug)]
pub struct Frame {
    timestamp: u64,
    id: StandardId,
    dlc: u8,
    data: [u8; 8],
}

impl Frame {
    pub(crate) fn assemble(timestamp: u64, raw_id: u16, dlc: u8, data: [u8; 8]) -> Self {
        Self {
            timestamp,
            // The mask ensures the ID is in range for an 11-bit integer
            id: unsafe { StandardId::new_unchecked(raw_id & StandardId::MAX.as_raw()) },
            dlc,
            data,
        }
    }

    /// Node-clock timestamp of the sample point at which the frame completed.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The 11-bit identifier.
    pub fn id(&self) -> StandardId {
        self.id
    }

    /// The data length code exactly as received; may exceed the 8 bytes a
    /// classical frame can carry.
    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// The data field.
    pub fn data(&self) -> &[u8] {
        &self.data[..dlc_to_len(self.dlc)]
    }

    /// Format of the received frame.
    pub fn format(&self) -> FrameFormat {
        FrameFormat::Cbff
    }
}

impl embedded_can::Frame for Frame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let Id::Standard(id) = id.into() else {
            return None;
        };
        if data.len() > 8 {
            return None;
        }
        let mut buf = [0; 8];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            timestamp: 0,
            id,
            dlc: data.len() as u8,
            data: buf,
        })
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
        Frame::data(self)
    }
}
