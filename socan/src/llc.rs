//! Contract between the controller and its upper layer

use crate::message::rx;
use embedded_can::StandardId;
use socan_core::Level;

/// Outcome of a transmission request, reported through [`Llc::data_conf`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    /// The frame went out and the end of frame was reached without error
    Success,
    /// The request was rejected or the transfer was aborted
    NoSuccess,
}

/// Upcalls from the controller to the layer above it, typically the link
/// layer control.
///
/// The two confirmed-service methods are called from inside [`Mac::tick`], at
/// the sample point that completes the corresponding transfer; they must not
/// block. Calling [`Mac::data_req`] back from inside `data_conf` is allowed
/// and is the natural way to chain transmissions.
///
/// [`Mac::tick`]: crate::mac::Mac::tick
/// [`Mac::data_req`]: crate::mac::Mac::data_req
pub trait Llc {
    /// A received frame passed validation and is complete.
    ///
    /// On a transmitting node this also fires for the node's own frame, at
    /// the same sample point as the matching [`Llc::data_conf`] and before
    /// it.
    fn data_ind(&mut self, frame: &rx::Frame);

    /// A transmission request completed with the given status.
    ///
    /// For requests rejected without touching the bus (handshake violation,
    /// unsupported format) `timestamp` is 0.
    fn data_conf(&mut self, timestamp: u64, id: StandardId, status: TxStatus);

    /// Whether the payload injection extension is armed.
    ///
    /// When this returns `true` and a data field begins on the bus, the
    /// transmit engine enters its injection state and calls
    /// [`Llc::ext_tx_data_ind`] for every payload bit. A node with the
    /// extension armed must not issue transmission requests of its own.
    fn ext_tx_enabled(&self) -> bool {
        false
    }

    /// Called at every sample point inside the data field of the frame in
    /// transit while the injection extension is armed. `sampled` is the bus
    /// level just read. Returning a level drives it at the next bit boundary
    /// in place of the recessive default.
    fn ext_tx_data_ind(&mut self, timestamp: u64, sampled: Level) -> Option<Level> {
        let _ = (timestamp, sampled);
        None
    }
}

/// Discards everything; useful for receive-only setups that poll the
/// controller state instead.
impl Llc for () {
    fn data_ind(&mut self, _frame: &rx::Frame) {}

    fn data_conf(&mut self, _timestamp: u64, _id: StandardId, _status: TxStatus) {}
}
