//! Transmit engine: serialization, stuff insertion, confirmation

use super::{Mac, RxState};
use crate::llc::{Llc, TxStatus};
use crate::message;
use socan_core::{Level, Transceiver};

/// Transmit engine state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// No frame going out; a latched request starts once the bus is idle
    Idle,
    /// Shifting out the 11-bit identifier
    Identifier,
    /// Remote transmission request bit, dominant for a data frame
    Rtr,
    /// Identifier extension bit, dominant for a base frame
    Ide,
    /// FD format bit, dominant for a classical frame
    Fdf,
    /// Data length code, 4 bits
    Dlc,
    /// Data field
    Data,
    /// Latching the check sequence computed by the receive engine
    CrcLatch,
    /// CRC field, 15 bits
    Crc,
    /// CRC delimiter, recessive
    CrcDelimiter,
    /// Acknowledge slot, released for a receiver to drive
    Ack,
    /// Acknowledge delimiter, recessive
    AckDelimiter,
    /// End of frame, 7 recessive bits
    Eof,
    /// Waiting one bit for the last end-of-frame sample before confirming
    EofTail,
    /// Injecting payload bits into the data field of a received frame
    ExtData,
    /// Releasing the bus after the last injected payload bit
    ExtTail,
    /// Reserved; recovery runs at the next sample point
    Error,
}

/// MSb-first transmit shift register. Fields are loaded left-aligned and
/// shifted out one bit per sample point.
#[derive(Copy, Clone, Debug)]
pub(super) struct ShiftReg(u32);

impl ShiftReg {
    pub(super) const fn empty() -> Self {
        Self(0)
    }

    /// Loads the `bits` low bits of `value`, left-aligned.
    fn load(value: u32, bits: u8) -> Self {
        Self(value << (32 - bits))
    }

    /// Takes the top bit out of the register.
    fn shift_out(&mut self) -> Level {
        let bit = Level::from_bit(self.0 & 0x8000_0000 != 0);
        self.0 <<= 1;
        bit
    }
}

impl<P: Transceiver, L: Llc> Mac<P, L> {
    /// Transmit-side processing of one sampled bit. Runs after the receive
    /// side, so the stuff counters and the CRC register already cover this
    /// sample.
    pub(super) fn tx_sample(&mut self, ts: u64, bit: Level) {
        match self.tx_state {
            TxState::Idle => {
                // Honor a latched request once the bus is idle. The request
                // issued here reaches the bus at the next bit boundary and
                // comes back through the receive engine at the sample point
                // after that.
                if self.data_req_pending && self.rx_state == RxState::Idle {
                    self.tx_step(ts, bit);
                }
            }

            TxState::Identifier
            | TxState::Rtr
            | TxState::Ide
            | TxState::Fdf
            | TxState::Dlc
            | TxState::Data
            | TxState::CrcLatch
            | TxState::Crc
            | TxState::CrcDelimiter
            | TxState::ExtData => {
                // Common entry for all states with stuff insertion active.
                // The receive engine keeps the run-length counters over the
                // very samples this engine put on the bus. The CRC delimiter
                // is in the list because a stuff bit may still be owed right
                // after the last bit of the CRC field.
                if self.nc_bits == 5 {
                    trace!("mac @{} inserting stuff bit", ts);
                    self.pcs.data_req(!self.nc_pol);
                } else {
                    self.tx_step(ts, bit);
                }
            }

            TxState::Ack | TxState::AckDelimiter | TxState::Eof | TxState::EofTail => {
                // Stuff insertion is bypassed in the frame trailer.
                self.tx_step(ts, bit);
            }

            TxState::ExtTail => {
                // Transient state after the last injected payload bit: drive
                // the bus back to recessive no matter what the extension
                // transmitted last.
                self.pcs.data_req(Level::Recessive);
                self.tx_state = TxState::Idle;
            }

            TxState::Error => self.tx_recover(ts),
        }
    }

    fn tx_step(&mut self, ts: u64, bit: Level) {
        match self.tx_state {
            TxState::Idle => {
                trace!("mac @{} transmission starts", ts);

                // Start of frame at the next bit boundary.
                self.pcs.data_req(Level::Dominant);

                self.tx_shift = ShiftReg::load(u32::from(self.tx_identifier.as_raw()), 11);
                self.tx_bit_count = 10;
                self.tx_state = TxState::Identifier;
            }

            TxState::Identifier => {
                let out = self.tx_shift.shift_out();
                self.pcs.data_req(out);
                if self.tx_bit_count == 0 {
                    self.tx_state = TxState::Rtr;
                } else {
                    self.tx_bit_count -= 1;
                }
            }

            TxState::Rtr => {
                // Dominant: remote frames are unsupported.
                self.pcs.data_req(Level::Dominant);
                self.tx_state = TxState::Ide;
            }

            TxState::Ide => {
                // Dominant: base format.
                self.pcs.data_req(Level::Dominant);
                self.tx_state = TxState::Fdf;
            }

            TxState::Fdf => {
                // Dominant: classical frame.
                self.pcs.data_req(Level::Dominant);

                self.tx_shift = ShiftReg::load(u32::from(self.tx_dlc), 4);
                self.tx_bit_count = 3;
                self.tx_state = TxState::Dlc;
            }

            TxState::Dlc => {
                let out = self.tx_shift.shift_out();
                self.pcs.data_req(out);
                if self.tx_bit_count == 0 {
                    if self.tx_dlc > 0 {
                        self.tx_byte_index = 0;
                        self.tx_shift = ShiftReg::load(u32::from(self.tx_data[0]), 8);
                        self.tx_bit_count = 8 * message::dlc_to_len(self.tx_dlc) as u8 - 1;
                        self.tx_state = TxState::Data;
                    } else {
                        self.tx_state = TxState::CrcLatch;
                    }
                } else {
                    self.tx_bit_count -= 1;
                }
            }

            TxState::Data => {
                let out = self.tx_shift.shift_out();
                self.pcs.data_req(out);
                if self.tx_bit_count == 0 {
                    self.tx_state = TxState::CrcLatch;
                } else {
                    if self.tx_bit_count % 8 == 0 {
                        // Byte boundary, reload with the next byte.
                        self.tx_byte_index += 1;
                        self.tx_shift =
                            ShiftReg::load(u32::from(self.tx_data[self.tx_byte_index]), 8);
                    }
                    self.tx_bit_count -= 1;
                }
            }

            TxState::CrcLatch => {
                // By this sample point the receive engine has clocked its
                // CRC register through the last bit of the data field, over
                // exactly the bits this engine drove. Latch it, and emit the
                // first CRC bit in this same step so that no extra bit
                // boundary slips in.
                self.tx_shift = ShiftReg::load(u32::from(self.crc.value()), 15);
                self.tx_bit_count = 13;

                let out = self.tx_shift.shift_out();
                self.pcs.data_req(out);
                self.tx_state = TxState::Crc;
            }

            TxState::Crc => {
                let out = self.tx_shift.shift_out();
                self.pcs.data_req(out);
                if self.tx_bit_count == 0 {
                    self.tx_state = TxState::CrcDelimiter;
                } else {
                    self.tx_bit_count -= 1;
                }
            }

            TxState::CrcDelimiter => {
                self.pcs.data_req(Level::Recessive);
                self.tx_state = TxState::Ack;
            }

            TxState::Ack => {
                // Released recessive: acknowledgement has to come from a
                // receiver. The receive engine requested a dominant level in
                // this same sample; issuing recessive after it makes sure a
                // transmitter does not acknowledge its own frame.
                self.pcs.data_req(Level::Recessive);
                self.tx_state = TxState::AckDelimiter;
            }

            TxState::AckDelimiter => {
                self.pcs.data_req(Level::Recessive);
                self.tx_bit_count = 6;
                self.tx_state = TxState::Eof;
            }

            TxState::Eof => {
                self.pcs.data_req(Level::Recessive);
                if self.tx_bit_count == 0 {
                    // Hold off for one more bit so that the last bit of the
                    // end of frame is sampled before the confirmation.
                    self.tx_state = TxState::EofTail;
                } else {
                    self.tx_bit_count -= 1;
                }
            }

            TxState::EofTail => {
                trace!("mac @{} transmission complete", ts);

                // No intermission: back to idle right after the last
                // end-of-frame sample.
                self.data_req_pending = false;
                self.tx_state = TxState::Idle;
                self.llc
                    .data_conf(ts, self.tx_identifier, TxStatus::Success);
            }

            TxState::ExtData => {
                // Recessive unless the extension overrides it; this also
                // brings the bus back up after a dominant stuff bit even if
                // the extension stays silent.
                self.pcs.data_req(Level::Recessive);
                if let Some(level) = self.llc.ext_tx_data_ind(ts, bit) {
                    self.pcs.data_req(level);
                }

                if self.tx_bit_count == 0 {
                    // The extension owes no stuff bit after its last payload
                    // bit; the transmitting node inserts it.
                    self.tx_state = TxState::ExtTail;
                } else {
                    self.tx_bit_count -= 1;
                }
            }

            // Handled in tx_sample.
            TxState::ExtTail | TxState::Error => {}
        }
    }
}
