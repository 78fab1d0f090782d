//! Receive engine: de-stuffing, deserialization, acknowledgement

use super::{Mac, ProtocolError, TxState};
use crate::crc::Crc15;
use crate::llc::Llc;
use crate::message::{self, rx};
use socan_core::{Level, Transceiver};

/// Receive engine state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Waiting for 11 consecutive recessive bits before joining bus traffic
    BusIntegration,
    /// Bus idle; a dominant bit is a start of frame
    Idle,
    /// Receiving the 11-bit identifier
    Identifier,
    /// Remote transmission request bit
    Rtr,
    /// Identifier extension bit
    Ide,
    /// FD format bit
    Fdf,
    /// Data length code, 4 bits
    Dlc,
    /// Data field
    Data,
    /// CRC field, 15 bits
    Crc,
    /// CRC delimiter
    CrcDelimiter,
    /// Acknowledge slot; this node drives it dominant
    Ack,
    /// Acknowledge delimiter
    AckDelimiter,
    /// End of frame, 7 recessive bits
    Eof,
    /// A protocol error was detected; recovery runs at the next sample point
    Error,
}

impl<P: Transceiver, L: Llc> Mac<P, L> {
    /// Receive-side processing of one sampled bit. Runs before the transmit
    /// side at every sample point.
    pub(super) fn rx_sample(&mut self, ts: u64, bit: Level) {
        match self.rx_state {
            RxState::BusIntegration => {
                if bit.is_dominant() {
                    self.bus_integration = 0;
                } else {
                    self.bus_integration += 1;
                    if self.bus_integration == 11 {
                        trace!("mac @{} bus idle", ts);
                        self.bus_integration = 0;
                        self.rx_state = RxState::Idle;
                    }
                }
            }

            RxState::Idle => {
                if bit.is_dominant() {
                    // Start of frame: one dominant bit received, seed the
                    // de-stuffing pipeline with it.
                    self.nc_bits = 1;
                    self.nc_pol = bit;
                    self.bus_bits = 1;
                    self.de_stuffed_bits = 1;

                    self.destuffed_bit(ts, bit);
                }
            }

            RxState::Identifier
            | RxState::Rtr
            | RxState::Ide
            | RxState::Fdf
            | RxState::Dlc
            | RxState::Data
            | RxState::Crc
            | RxState::CrcDelimiter => {
                // Common entry for all states with de-stuffing active. The
                // CRC delimiter is in the list because a stuff bit may still
                // follow the last bit of the CRC field and must not be taken
                // for the delimiter.
                self.bus_bits += 1;

                if self.nc_bits == 5 {
                    // A stuff bit is due, at the opposite level of the run
                    // it terminates.
                    if bit == self.nc_pol {
                        debug!("mac @{} stuff error", ts);
                        self.rx_error(ProtocolError::Stuff);
                    } else {
                        trace!("mac @{} discarding stuff bit", ts);
                        self.nc_bits = 1;
                        self.nc_pol = bit;
                    }
                } else {
                    if bit != self.nc_pol {
                        self.nc_bits = 1;
                        self.nc_pol = bit;
                    } else {
                        self.nc_bits += 1;
                    }

                    self.de_stuffed_bits += 1;
                    self.destuffed_bit(ts, bit);
                }
            }

            RxState::Ack | RxState::AckDelimiter | RxState::Eof => {
                // De-stuffing is bypassed in the frame trailer.
                self.destuffed_bit(ts, bit);
            }

            RxState::Error => self.rx_recover(ts),
        }
    }

    /// Deserialization of one de-stuffed bit: field assembly, CRC
    /// accumulation and the framing transitions.
    fn destuffed_bit(&mut self, ts: u64, bit: Level) {
        match self.rx_state {
            RxState::Idle => {
                trace!("mac @{} start of frame", ts);

                // No hard synchronization while a frame is in progress.
                self.pcs.allow_hard_sync(false);

                self.crc = Crc15::new();
                self.crc.update(bit);
                self.field_bits = 10;
                self.rx_identifier = 0;
                self.rx_state = RxState::Identifier;
            }

            RxState::Identifier => {
                // Within a field the most significant bit comes first.
                self.rx_identifier = (self.rx_identifier << 1) | u16::from(bit);
                self.crc.update(bit);
                if self.field_bits == 0 {
                    trace!("mac @{} identifier {}", ts, self.rx_identifier);
                    self.rx_state = RxState::Rtr;
                } else {
                    self.field_bits -= 1;
                }
            }

            RxState::Rtr => {
                // Unchecked: remote frames are unsupported, a data frame
                // carries a dominant RTR bit.
                self.rx_rtr = bit;
                trace!("mac @{} rtr bit {}", ts, u8::from(self.rx_rtr));
                self.crc.update(bit);
                self.rx_state = RxState::Ide;
            }

            RxState::Ide => {
                self.rx_ide = bit;
                self.crc.update(bit);
                if self.rx_ide.is_recessive() {
                    debug!("mac @{} extended formats unsupported", ts);
                    self.rx_error(ProtocolError::Form);
                } else {
                    self.rx_state = RxState::Fdf;
                }
            }

            RxState::Fdf => {
                self.rx_fdf = bit;
                self.crc.update(bit);
                if self.rx_fdf.is_recessive() {
                    debug!("mac @{} FD formats unsupported", ts);
                    self.rx_error(ProtocolError::Form);
                } else {
                    self.field_bits = 3;
                    self.rx_dlc = 0;
                    self.rx_state = RxState::Dlc;
                }
            }

            RxState::Dlc => {
                self.rx_dlc = (self.rx_dlc << 1) | u8::from(bit);
                self.crc.update(bit);
                if self.field_bits == 0 {
                    trace!("mac @{} dlc {}", ts, self.rx_dlc);

                    let data_bits = 8 * message::dlc_to_len(self.rx_dlc) as u8;
                    if data_bits > 0 {
                        self.rx_data = [0; 8];
                        self.rx_byte = 0;
                        self.rx_byte_index = 0;
                        self.field_bits = data_bits - 1;
                        self.rx_state = RxState::Data;

                        // Hand the data field of the incoming frame to the
                        // payload injection extension, if armed.
                        if self.llc.ext_tx_enabled() {
                            self.tx_bit_count = self.field_bits;
                            self.tx_state = TxState::ExtData;
                        }
                    } else {
                        self.field_bits = 14;
                        self.rx_state = RxState::Crc;
                    }
                } else {
                    self.field_bits -= 1;
                }
            }

            RxState::Data => {
                self.rx_byte = (self.rx_byte << 1) | u8::from(bit);
                self.crc.update(bit);
                if self.field_bits % 8 == 0 {
                    // Byte boundary. Bits travel MSb first within a byte,
                    // bytes in ascending order across the field.
                    self.rx_data[self.rx_byte_index] = self.rx_byte;
                    self.rx_byte_index += 1;
                    self.rx_byte = 0;
                }
                if self.field_bits == 0 {
                    self.field_bits = 14;
                    self.rx_state = RxState::Crc;
                } else {
                    self.field_bits -= 1;
                }
            }

            RxState::Crc => {
                // The received check sequence is not stored anywhere:
                // clocking it through the register leaves zero residue
                // exactly when the frame is intact.
                self.crc.update(bit);
                if self.field_bits == 0 {
                    if self.crc.value() != 0 {
                        debug!(
                            "mac @{} CRC error, id {} dlc {}",
                            ts,
                            self.rx_identifier,
                            self.rx_dlc
                        );
                        self.rx_error(ProtocolError::Crc);
                    } else {
                        self.rx_state = RxState::CrcDelimiter;
                    }
                } else {
                    self.field_bits -= 1;
                }
            }

            RxState::CrcDelimiter => {
                if bit.is_dominant() {
                    debug!("mac @{} form error at CRC delimiter", ts);
                    self.rx_error(ProtocolError::Form);
                } else {
                    // Acknowledge the frame with a dominant bit starting at
                    // the next bit boundary. On a transmitting node the
                    // transmit engine overrides this in the same sample,
                    // so a transmitter does not acknowledge its own frame.
                    self.pcs.data_req(Level::Dominant);
                    self.rx_state = RxState::Ack;
                }
            }

            RxState::Ack => {
                if bit.is_recessive() {
                    debug!("mac @{} acknowledge error", ts);
                    self.rx_error(ProtocolError::Ack);
                } else {
                    // Stop driving the acknowledge bit.
                    self.pcs.data_req(Level::Recessive);
                    self.rx_state = RxState::AckDelimiter;
                }
            }

            RxState::AckDelimiter => {
                if bit.is_dominant() {
                    debug!("mac @{} form error at acknowledge delimiter", ts);
                    self.rx_error(ProtocolError::Form);
                } else {
                    self.field_bits = 6;
                    self.rx_state = RxState::Eof;
                }
            }

            RxState::Eof => {
                // A dominant level in the last of the 7 end-of-frame bits
                // does not invalidate the frame.
                if bit.is_dominant() && self.field_bits != 0 {
                    debug!("mac @{} form error at end of frame", ts);
                    self.rx_error(ProtocolError::Form);
                } else if self.field_bits == 0 {
                    trace!(
                        "mac @{} frame complete, id {} dlc {} ({} bus bits, {} de-stuffed)",
                        ts,
                        self.rx_identifier,
                        self.rx_dlc,
                        self.bus_bits,
                        self.de_stuffed_bits
                    );

                    let frame =
                        rx::Frame::assemble(ts, self.rx_identifier, self.rx_dlc, self.rx_data);
                    self.llc.data_ind(&frame);

                    self.pcs.allow_hard_sync(true);
                    self.rx_state = RxState::Idle;
                } else {
                    self.field_bits -= 1;
                }
            }

            // Bus integration and error samples never reach the
            // deserializer.
            RxState::BusIntegration | RxState::Error => {}
        }
    }
}
