//! Bit-time configuration

use core::ops::RangeInclusive;
use fugit::HertzU32;

/// Number of quanta in the synchronization segment. Fixed by the standard.
pub const SYNC_SEG: u8 = 1;

/// Bit-timing parameters. The nominal bit time is determined by
/// - the time quantum, which is `prescaler` node-clock ticks long
/// - the number of time quanta in a bit time: the synchronization segment
///   (always one quantum), `prop_seg`, `phase_seg1` and `phase_seg2`
///
/// The bus is sampled on the last quantum of `phase_seg1`; resynchronization
/// lengthens `phase_seg1` or shortens `phase_seg2` by at most `sjw` quanta.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    /// Node-clock ticks per time quantum
    pub prescaler: u8,
    /// Propagation segment, in quanta
    pub prop_seg: u8,
    /// Phase buffer segment before the sample point, in quanta
    pub phase_seg1: u8,
    /// Phase buffer segment after the sample point, in quanta
    pub phase_seg2: u8,
    /// Synchronization jump width, in quanta
    pub sjw: u8,
}

impl Default for BitTiming {
    fn default() -> Self {
        // 10 quanta per bit with the sample point between quantum 6 and 7, a
        // common layout for classical CAN controllers.
        Self {
            prescaler: 1,
            prop_seg: 3,
            phase_seg1: 3,
            phase_seg2: 3,
            sjw: 1,
        }
    }
}

/// Misconfigurations of [`BitTiming`].
#[derive(Debug)]
pub enum BitTimingError {
    /// Prescaler value outside the reported valid range
    Prescaler(RangeInclusive<u8>),
    /// Propagation segment outside the reported valid range
    PropSeg(RangeInclusive<u8>),
    /// Phase segment 1 outside the reported valid range
    PhaseSeg1(RangeInclusive<u8>),
    /// Phase segment 2 outside the reported valid range
    PhaseSeg2(RangeInclusive<u8>),
    /// Synchronization jump width outside the reported valid range
    SynchronizationJumpWidth(RangeInclusive<u8>),
}

/// Valid values of a BitTiming struct
#[derive(Clone)]
pub(crate) struct BitTimingRanges {
    prescaler: RangeInclusive<u8>,
    prop_seg: RangeInclusive<u8>,
    phase_seg1: RangeInclusive<u8>,
    phase_seg2: RangeInclusive<u8>,
    sjw: RangeInclusive<u8>,
}

pub(crate) const CLASSIC_BIT_TIMING_RANGES: BitTimingRanges = BitTimingRanges {
    prescaler: 1..=32,
    prop_seg: 1..=8,
    phase_seg1: 1..=8,
    phase_seg2: 2..=8,
    sjw: 1..=4,
};

impl BitTiming {
    /// Returns the number of time quanta that make up one bit time.
    pub fn quanta_per_bit(&self) -> u8 {
        SYNC_SEG + self.prop_seg + self.phase_seg1 + self.phase_seg2
    }

    /// Returns the quantum index, counted from the start of the bit, at which
    /// the bus is sampled.
    pub fn sample_point(&self) -> u8 {
        SYNC_SEG + self.prop_seg + self.phase_seg1 - 1
    }

    /// Returns the bit rate resulting from these parameters at the given
    /// node-clock frequency.
    pub fn bitrate(&self, node_clock: HertzU32) -> HertzU32 {
        node_clock / (u32::from(self.prescaler) * u32::from(self.quanta_per_bit()))
    }

    pub(crate) fn check(&self, valid: &BitTimingRanges) -> Result<(), BitTimingError> {
        if !valid.prescaler.contains(&self.prescaler) {
            Err(BitTimingError::Prescaler(valid.prescaler.clone()))
        } else if !valid.prop_seg.contains(&self.prop_seg) {
            Err(BitTimingError::PropSeg(valid.prop_seg.clone()))
        } else if !valid.phase_seg1.contains(&self.phase_seg1) {
            Err(BitTimingError::PhaseSeg1(valid.phase_seg1.clone()))
        } else if !valid.phase_seg2.contains(&self.phase_seg2) {
            Err(BitTimingError::PhaseSeg2(valid.phase_seg2.clone()))
        } else if !valid.sjw.contains(&self.sjw) {
            Err(BitTimingError::SynchronizationJumpWidth(valid.sjw.clone()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_timing_is_valid() {
        let timing = BitTiming::default();
        assert!(timing.check(&CLASSIC_BIT_TIMING_RANGES).is_ok());
        assert_eq!(timing.quanta_per_bit(), 10);
        assert_eq!(timing.sample_point(), 6);
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let mut timing = BitTiming::default();
        timing.prescaler = 0;
        assert!(matches!(
            timing.check(&CLASSIC_BIT_TIMING_RANGES),
            Err(BitTimingError::Prescaler(_))
        ));

        let mut timing = BitTiming::default();
        timing.phase_seg2 = 1;
        assert!(matches!(
            timing.check(&CLASSIC_BIT_TIMING_RANGES),
            Err(BitTimingError::PhaseSeg2(_))
        ));

        let mut timing = BitTiming::default();
        timing.sjw = 5;
        assert!(matches!(
            timing.check(&CLASSIC_BIT_TIMING_RANGES),
            Err(BitTimingError::SynchronizationJumpWidth(_))
        ));
    }

    #[test]
    fn bitrate_derivation() {
        use fugit::RateExtU32 as _;
        let timing = BitTiming::default();
        assert_eq!(timing.bitrate(10.MHz()), 1.MHz::<1, 1>());

        let slow = BitTiming {
            prescaler: 4,
            ..BitTiming::default()
        };
        assert_eq!(slow.bitrate(10.MHz()), 250.kHz::<1, 1>());
    }
}
