//! Frame check sequence

use socan_core::Level;

/// CRC-15 polynomial x^15 + x^14 + x^10 + x^8 + x^7 + x^4 + x^3 + 1. It is
/// monic, MSb omitted.
const POLYNOMIAL: u16 = 0x4599;

/// The 15-bit CRC register clocked once per bit, start of frame through the
/// end of the data field on generation, through the end of the CRC field on
/// checking.
///
/// The transmitter sends the register contents MSb first after the data
/// field; a receiver that keeps clocking the received CRC bits through its
/// own register ends up with an all-zero register exactly when the frame
/// arrived unaltered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Crc15(u16);

impl Crc15 {
    /// A cleared register, ready for the start of frame bit.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Clocks one bit into the register.
    pub fn update(&mut self, bit: Level) {
        let feedback = ((self.0 >> 14) & 1) as u8 ^ u8::from(bit);
        self.0 = (self.0 << 1) & 0x7FFF;
        if feedback != 0 {
            self.0 ^= POLYNOMIAL;
        }
    }

    /// The current register contents.
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl Default for Crc15 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn feed(crc: &mut Crc15, value: u32, bits: u8) {
        for i in (0..bits).rev() {
            crc.update(Level::from_bit(value >> i & 1 != 0));
        }
    }

    #[test]
    fn zeros_leave_the_register_clear() {
        let mut crc = Crc15::new();
        feed(&mut crc, 0, 19);
        assert_eq!(crc.value(), 0);
    }

    #[test]
    fn first_recessive_bit_loads_the_polynomial() {
        let mut crc = Crc15::new();
        crc.update(Level::Recessive);
        assert_eq!(crc.value(), POLYNOMIAL);
    }

    #[test]
    fn residue_is_zero_over_sequence_plus_check_bits() {
        // Clocking the generated check sequence back through the register
        // must clear it, for any input sequence.
        for seed in [0x0000_0000u32, 0x745F_3E11, 0xFFFF_FFFF, 0x0000_0001] {
            let mut crc = Crc15::new();
            feed(&mut crc, seed, 32);
            let check = crc.value();
            feed(&mut crc, u32::from(check), 15);
            assert_eq!(crc.value(), 0, "residue for seed {seed:#010x}");
        }
    }
}
