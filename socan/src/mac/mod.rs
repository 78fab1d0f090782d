//! Medium access control: framing, stuffing, acknowledgement
//!
//! Two coupled engines share the controller state: the receive engine
//! de-stuffs and deserializes the sampled bit stream, the transmit engine
//! serializes and stuffs the outgoing one. Both advance at the sample point,
//! receive side first. The coupling is deliberate: the receive engine runs on
//! every frame, including the node's own, so the stuff counters and the CRC
//! register it maintains are exactly what the transmit engine needs for stuff
//! insertion and for the check sequence it sends.

mod rx;
mod tx;

pub use rx::RxState;
pub use tx::TxState;

use crate::config::{BitTiming, BitTimingError};
use crate::crc::Crc15;
use crate::llc::{Llc, TxStatus};
use crate::message::{self, tx as tx_msg, FrameFormat};
use crate::pcs::Pcs;
use embedded_can::StandardId;
use socan_core::{Level, Transceiver};
use tx::ShiftReg;

/// Protocol errors observable at the receive engine.
///
/// Any of these sends the receive engine into [`RxState::Error`]; the next
/// sample point triggers recovery back to bus integration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Sixth consecutive bit at the same level inside the stuffed region
    Stuff,
    /// Non-zero CRC residue at the end of the CRC field
    Crc,
    /// Dominant level in a field that is recessive by form, or an
    /// unsupported format announced in the control field
    Form,
    /// Recessive level in the acknowledge slot
    Ack,
}

/// The controller: both frame engines on top of a [`Pcs`], wired to the
/// transceiver `P` below and the upper layer `L` above.
pub struct Mac<P, L> {
    pcs: Pcs<P>,
    llc: L,

    rx_state: RxState,
    bus_integration: u8,

    // De-stuffing and CRC, shared by the two engines
    nc_bits: u8,
    nc_pol: Level,
    crc: Crc15,
    field_bits: u8,
    bus_bits: u32,
    de_stuffed_bits: u32,

    last_error: Option<ProtocolError>,

    rx_identifier: u16,
    rx_rtr: Level,
    rx_ide: Level,
    rx_fdf: Level,
    rx_dlc: u8,
    rx_byte: u8,
    rx_byte_index: usize,
    rx_data: [u8; 8],

    tx_state: TxState,
    data_req_pending: bool,
    tx_identifier: StandardId,
    tx_dlc: u8,
    tx_data: [u8; 8],
    tx_byte_index: usize,
    tx_bit_count: u8,
    tx_shift: ShiftReg,
}

impl<P: Transceiver, L: Llc> Mac<P, L> {
    /// Creates a controller with validated bit-timing parameters, owning the
    /// transceiver and the upper-layer sink. The receive engine starts in bus
    /// integration.
    pub fn new(timing: BitTiming, pma: P, llc: L) -> Result<Self, BitTimingError> {
        Ok(Self {
            pcs: Pcs::new(timing, pma)?,
            llc,
            rx_state: RxState::BusIntegration,
            bus_integration: 0,
            nc_bits: 0,
            nc_pol: Level::Recessive,
            crc: Crc15::new(),
            field_bits: 0,
            bus_bits: 0,
            de_stuffed_bits: 0,
            last_error: None,
            rx_identifier: 0,
            rx_rtr: Level::Recessive,
            rx_ide: Level::Recessive,
            rx_fdf: Level::Recessive,
            rx_dlc: 0,
            rx_byte: 0,
            rx_byte_index: 0,
            rx_data: [0; 8],
            tx_state: TxState::Idle,
            data_req_pending: false,
            tx_identifier: StandardId::ZERO,
            tx_dlc: 0,
            tx_data: [0; 8],
            tx_byte_index: 0,
            tx_bit_count: 0,
            tx_shift: ShiftReg::empty(),
        })
    }

    /// One node-clock tick with the bus level just sampled. Everything the
    /// controller does happens synchronously inside this call: bit timing,
    /// both frame engines, and upcalls into the upper layer.
    pub fn tick(&mut self, bus_level: Level) {
        if let Some(sample) = self.pcs.tick(bus_level) {
            self.rx_sample(sample.timestamp, sample.level);
            self.tx_sample(sample.timestamp, sample.level);
        }
    }

    /// Requests the transmission of a frame.
    ///
    /// A request while another is still pending, or for a format other than
    /// the classical base format, is confirmed immediately with
    /// [`TxStatus::NoSuccess`] and does not disturb the pending transfer.
    /// Otherwise the frame is latched and goes out as soon as the bus is
    /// idle; completion is reported through [`Llc::data_conf`].
    pub fn data_req(&mut self, frame: tx_msg::Frame) {
        if self.data_req_pending {
            self.llc.data_conf(0, frame.id, TxStatus::NoSuccess);
            return;
        }

        match frame.format {
            FrameFormat::Cbff => {
                self.tx_identifier = frame.id;
                self.tx_dlc = frame.dlc;
                self.tx_data = [0; 8];
                let len = message::dlc_to_len(frame.dlc);
                self.tx_data[..len].copy_from_slice(&frame.data[..len]);
                self.data_req_pending = true;
            }
            _ => self.llc.data_conf(0, frame.id, TxStatus::NoSuccess),
        }
    }

    /// Current receive engine state.
    pub fn rx_state(&self) -> RxState {
        self.rx_state
    }

    /// Current transmit engine state.
    pub fn tx_state(&self) -> TxState {
        self.tx_state
    }

    /// Whether a transmission request is latched and not yet confirmed.
    pub fn transfer_pending(&self) -> bool {
        self.data_req_pending
    }

    /// The most recent protocol error, if any was detected since creation.
    pub fn protocol_error(&self) -> Option<ProtocolError> {
        self.last_error
    }

    /// Current node-clock timestamp.
    pub fn timestamp(&self) -> u64 {
        self.pcs.timestamp()
    }

    /// The owned transceiver.
    pub fn transceiver(&self) -> &P {
        self.pcs.transceiver()
    }

    /// The owned transceiver, mutably.
    pub fn transceiver_mut(&mut self) -> &mut P {
        self.pcs.transceiver_mut()
    }

    /// The owned upper-layer sink.
    pub fn llc(&self) -> &L {
        &self.llc
    }

    /// The owned upper-layer sink, mutably.
    pub fn llc_mut(&mut self) -> &mut L {
        &mut self.llc
    }

    /// Releases the transceiver and the upper-layer sink.
    pub fn release(self) -> (P, L) {
        (self.pcs.release(), self.llc)
    }

    /// Receive-side recovery: drive recessive, re-open hard synchronization
    /// and reintegrate. A latched transmission request stays latched and goes
    /// out again once the bus has been idle long enough.
    fn rx_recover(&mut self, ts: u64) {
        trace!("mac @{} recovering to bus integration", ts);
        self.pcs.data_req(Level::Recessive);
        self.pcs.allow_hard_sync(true);
        self.rx_state = RxState::BusIntegration;
        self.tx_state = TxState::Idle;
    }

    /// Transmit-side recovery: additionally aborts the latched request and
    /// confirms it with no success.
    fn tx_recover(&mut self, ts: u64) {
        self.data_req_pending = false;
        self.llc.data_conf(ts, self.tx_identifier, TxStatus::NoSuccess);
        self.pcs.data_req(Level::Recessive);
        self.pcs.allow_hard_sync(true);
        self.rx_state = RxState::BusIntegration;
        self.tx_state = TxState::Idle;
    }

    fn rx_error(&mut self, error: ProtocolError) {
        self.last_error = Some(error);
        self.rx_state = RxState::Error;
    }
}
