//! Physical coding sub-layer: bit timing, synchronization, sampling
//!
//! The engine counts node-clock ticks into time quanta and quanta into
//! nominal bits. Edges on the bus resynchronize the quantum counter, hard or
//! soft depending on what the frame engine currently allows; at the sample
//! point the bus level is handed upward, and at the bit boundary the level
//! most recently requested for transmission is handed to the transceiver.

use crate::config::{BitTiming, BitTimingError, CLASSIC_BIT_TIMING_RANGES};
use socan_core::{Level, Transceiver};

/// A bus sample taken at the sample point of a nominal bit.
#[derive(Copy, Clone, Debug)]
pub struct Sample {
    /// Node-clock timestamp of the tick that closed the sample point quantum
    pub timestamp: u64,
    /// Bus level read at the sample point
    pub level: Level,
}

/// The software bit-time engine, driving transceiver `P`.
pub struct Pcs<P> {
    pma: P,
    timing: BitTiming,
    quanta_per_bit: u8,
    sample_point: u8,

    timestamp: u64,
    prescaler_cnt: u8,
    /// Quantum number of the quantum that ends at the current quantum-clock
    /// edge. May transiently equal `quanta_per_bit` right after a negative
    /// soft resynchronization; the wrap at the end of the step restores the
    /// normal range.
    quantum_cnt: u8,

    prev_bus_level: Level,
    prev_sample: Level,
    sync_inhibit: bool,
    hard_sync_allowed: bool,

    output_buf: Level,
    sending_level: Level,
}

impl<P: Transceiver> Pcs<P> {
    /// Creates the engine with validated bit-timing parameters, owning the
    /// transceiver. The bus is assumed recessive at start.
    pub fn new(timing: BitTiming, pma: P) -> Result<Self, BitTimingError> {
        timing.check(&CLASSIC_BIT_TIMING_RANGES)?;
        Ok(Self {
            pma,
            quanta_per_bit: timing.quanta_per_bit(),
            sample_point: timing.sample_point(),
            timing,
            timestamp: 0,
            prescaler_cnt: 0,
            quantum_cnt: 0,
            prev_bus_level: Level::Recessive,
            prev_sample: Level::Recessive,
            sync_inhibit: false,
            hard_sync_allowed: true,
            output_buf: Level::Recessive,
            sending_level: Level::Recessive,
        })
    }

    /// One node-clock tick with the bus level just sampled. Returns the
    /// sample to hand to the frame engine when this tick closes the sample
    /// point quantum of a bit.
    pub fn tick(&mut self, bus_level: Level) -> Option<Sample> {
        // The first tick is taken to arrive one node-clock period after the
        // beginning of the epoch, hence the increment comes first.
        self.timestamp = self.timestamp.wrapping_add(1);

        self.prescaler_cnt = (self.prescaler_cnt + 1) % self.timing.prescaler;
        if self.prescaler_cnt == 0 {
            self.quantum_step(self.timestamp, bus_level)
        } else {
            None
        }
    }

    /// Latches the level to transmit. The transceiver is actually updated at
    /// the next bit boundary, never intra-bit.
    pub fn data_req(&mut self, level: Level) {
        self.output_buf = level;
    }

    /// Selects hard or soft resynchronization. The frame engine forbids hard
    /// synchronization from the start of frame to the end of frame.
    pub fn allow_hard_sync(&mut self, allowed: bool) {
        self.hard_sync_allowed = allowed;
    }

    /// Current node-clock timestamp.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The owned transceiver.
    pub fn transceiver(&self) -> &P {
        &self.pma
    }

    /// The owned transceiver, mutably.
    pub fn transceiver_mut(&mut self) -> &mut P {
        &mut self.pma
    }

    /// Releases the transceiver.
    pub fn release(self) -> P {
        self.pma
    }

    /// One edge of the quantum clock: edge detection, resynchronization,
    /// sampling and bit-boundary transmission.
    fn quantum_step(&mut self, ts: u64, bus_level: Level) -> Option<Sample> {
        let edge = self.prev_bus_level != bus_level;

        // An edge qualifies for synchronization only while no other edge has
        // been used since the last recessive sample, and only if the bus was
        // recessive at that sample.
        if edge && !self.sync_inhibit && self.prev_sample.is_recessive() {
            // Positive phase error before the sample point, negative after
            // it, zero within the synchronization segment.
            let phase_error: i16 = if self.quantum_cnt == 0 {
                0
            } else if self.quantum_cnt <= self.sample_point {
                i16::from(self.quantum_cnt)
            } else {
                i16::from(self.quantum_cnt) - i16::from(self.quanta_per_bit)
            };

            // A dominant-going edge while we drive dominant is our own doing
            // and must not move the bit clock.
            if phase_error < 0 || (phase_error > 0 && self.sending_level.is_recessive()) {
                if self.hard_sync_allowed {
                    // The quantum just elapsed becomes the synchronization
                    // segment; the jump width does not apply.
                    self.quantum_cnt = 0;
                    trace!("pcs @{} hard sync", ts);
                } else {
                    let sjw = i16::from(self.timing.sjw);
                    let adjust = phase_error.clamp(-sjw, sjw);

                    // Lengthening phase segment 1 decreases the counter,
                    // shortening phase segment 2 increases it. A negative
                    // adjustment may leave the counter equal to
                    // quanta_per_bit; that is 0 modulo the bit length and the
                    // update below brings it back in range.
                    self.quantum_cnt = (i16::from(self.quantum_cnt) - adjust) as u8;
                    trace!(
                        "pcs @{} soft sync, phase error {} adjusted by {}",
                        ts,
                        phase_error,
                        adjust
                    );
                }
            }
        }

        // Any detected edge, used or not, inhibits further synchronization.
        if edge {
            self.sync_inhibit = true;
        }

        let mut sample = None;
        if self.quantum_cnt == self.sample_point {
            sample = Some(Sample {
                timestamp: ts,
                level: bus_level,
            });

            // Synchronization opens up again once the bus is seen recessive
            // at a sample point.
            if bus_level.is_recessive() {
                self.sync_inhibit = false;
            }
            self.prev_sample = bus_level;
        }

        // Transmission starts at the bit boundary, or one quantum later when
        // a resynchronization consumed all of phase segment 2; hence `>=`.
        if self.quantum_cnt >= self.quanta_per_bit - 1 {
            self.pma.drive(self.output_buf);
            self.sending_level = self.output_buf;
        }

        self.quantum_cnt = (self.quantum_cnt + 1) % self.quanta_per_bit;
        self.prev_bus_level = bus_level;

        sample
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Transceiver stub recording the most recent drive request.
    struct Probe {
        level: Level,
        drives: u32,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                level: Level::Recessive,
                drives: 0,
            }
        }
    }

    impl Transceiver for Probe {
        fn drive(&mut self, level: Level) {
            self.level = level;
            self.drives += 1;
        }
    }

    fn pcs() -> Pcs<Probe> {
        Pcs::new(BitTiming::default(), Probe::new()).unwrap()
    }

    #[test]
    fn samples_fall_on_the_sample_point() {
        // 10 quanta per bit, prescaler 1: the sample point quantum closes at
        // ticks 7, 17, 27, ...
        let mut pcs = pcs();
        let mut sampled_at = [0u64; 3];
        let mut n = 0;
        for _ in 0..30 {
            if let Some(sample) = pcs.tick(Level::Recessive) {
                sampled_at[n] = sample.timestamp;
                n += 1;
            }
        }
        assert_eq!(n, 3);
        assert_eq!(sampled_at, [7, 17, 27]);
    }

    #[test]
    fn prescaler_stretches_the_quantum() {
        let timing = BitTiming {
            prescaler: 2,
            ..BitTiming::default()
        };
        let mut pcs = Pcs::new(timing, Probe::new()).unwrap();
        let first = (1..=40)
            .find_map(|_| pcs.tick(Level::Recessive).map(|s| s.timestamp))
            .unwrap();
        assert_eq!(first, 14);
    }

    #[test]
    fn requested_level_is_driven_at_the_bit_boundary() {
        let mut pcs = pcs();
        pcs.data_req(Level::Dominant);
        for _ in 1..=9 {
            pcs.tick(Level::Recessive);
            assert_eq!(pcs.transceiver().level, Level::Recessive);
        }
        pcs.tick(Level::Recessive);
        assert_eq!(pcs.transceiver().level, Level::Dominant);
        assert_eq!(pcs.transceiver().drives, 1);
    }

    #[test]
    fn late_edge_soft_syncs_by_at_most_sjw() {
        // Recessive through the first bit, then a dominant edge two quanta
        // into the second bit: phase error +2, clipped to the jump width 1,
        // so the next sample point slips by exactly one tick.
        let mut pcs = pcs();
        pcs.allow_hard_sync(false);
        for _ in 1..=12 {
            pcs.tick(Level::Recessive);
        }
        let mut sample = None;
        for _ in 13..=30 {
            if let Some(s) = pcs.tick(Level::Dominant) {
                sample = Some(s);
                break;
            }
        }
        let sample = sample.unwrap();
        assert_eq!(sample.timestamp, 18);
        assert!(sample.level.is_dominant());
    }

    #[test]
    fn hard_sync_restarts_the_bit() {
        // Same stimulus as the soft sync test, but with hard synchronization
        // allowed the edge opens a new bit outright: the quantum that ends at
        // tick 13 becomes the synchronization segment, so the sample point
        // quantum closes at tick 19.
        let mut pcs = pcs();
        for _ in 1..=12 {
            pcs.tick(Level::Recessive);
        }
        let mut sample = None;
        for _ in 13..=30 {
            if let Some(s) = pcs.tick(Level::Dominant) {
                sample = Some(s);
                break;
            }
        }
        assert_eq!(sample.unwrap().timestamp, 19);
    }

    #[test]
    fn own_dominant_edge_does_not_resync() {
        // Same late dominant edge as the soft sync test, but while we are
        // driving dominant ourselves: the edge is self-caused and must leave
        // the bit clock untouched, so the sample point stays at tick 17.
        let mut pcs = pcs();
        pcs.allow_hard_sync(false);
        pcs.data_req(Level::Dominant);
        for _ in 1..=12 {
            pcs.tick(Level::Recessive);
        }
        let mut sample = None;
        for _ in 13..=30 {
            if let Some(s) = pcs.tick(Level::Dominant) {
                sample = Some(s);
                break;
            }
        }
        assert_eq!(sample.unwrap().timestamp, 17);
    }
}
