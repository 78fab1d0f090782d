#![no_std]
#![warn(missing_docs)]
//! # SOCAN
//!
//! ## Overview
//! This crate provides a software-defined CAN controller.
//!
//! It implements the following features:
//!
//! - the ISO 11898-1 physical coding sub-layer in software: time quantum
//!   counting, edge detection, hard and soft resynchronization bounded by the
//!   synchronization jump width, and sample point extraction
//! - the medium access control layer for classical base frames (11-bit
//!   identifiers): bit (de-)stuffing, CRC-15 generation and checking, frame
//!   (de)serialization, acknowledgement, and error detection with recovery
//! - transmission requests and received frame delivery through a small
//!   upcall contract with the upper layer
//! - an extension seam for overlaying payload bits onto the data field of a
//!   frame in transit
//! - a simulated transceiver with wired-AND bus combination for host use
//!
//! Unlike a CAN peripheral embedded in an MCU, this controller owns neither a
//! timer nor a pin. The platform driver samples the bus at a fixed node-clock
//! rate and calls [`Mac::tick`](mac::Mac::tick) with each sample; the
//! controller hands levels to drive back to the [`Transceiver`] it owns. All
//! protocol work happens synchronously inside `tick`, which makes the
//! controller equally at home
//! behind a GPIO pair on a microcontroller and on a simulated bus in a host
//! process.
//!
//! ## General usage example
//!
//! Two controllers on a simulated wired-AND bus, one transmitting to the
//! other:
//!
//! ```
//! use embedded_can::StandardId;
//! use socan::config::BitTiming;
//! use socan::llc::{Llc, TxStatus};
//! use socan::mac::Mac;
//! use socan::message::{rx, tx};
//! use socan::sim::SimTransceiver;
//!
//! /// Collects what the controller delivers to the upper layer.
//! #[derive(Default)]
//! struct Host {
//!     received: Option<(u16, u8)>,
//!     confirmed: Option<TxStatus>,
//! }
//!
//! impl Llc for Host {
//!     fn data_ind(&mut self, frame: &rx::Frame) {
//!         self.received = Some((frame.id().as_raw(), frame.dlc()));
//!     }
//!
//!     fn data_conf(&mut self, _timestamp: u64, _id: StandardId, status: TxStatus) {
//!         self.confirmed = Some(status);
//!     }
//! }
//!
//! // 10 time quanta per bit, sample point after the seventh.
//! let timing = BitTiming::default();
//! let mut a = Mac::new(timing, SimTransceiver::new(), Host::default()).unwrap();
//! let mut b = Mac::new(timing, SimTransceiver::new(), Host::default()).unwrap();
//!
//! // Every node samples the wired-AND of all driven levels.
//! let step = |a: &mut Mac<SimTransceiver, Host>, b: &mut Mac<SimTransceiver, Host>| {
//!     let bus = a.transceiver().driven() & b.transceiver().driven();
//!     a.tick(bus);
//!     b.tick(bus);
//! };
//!
//! // Both controllers join the bus after 11 recessive bits.
//! for _ in 0..120 {
//!     step(&mut a, &mut b);
//! }
//!
//! let frame = tx::Frame::new(StandardId::new(0x345).unwrap(), &[0x5A, 0xA5]).unwrap();
//! a.data_req(frame);
//! for _ in 0..2000 {
//!     step(&mut a, &mut b);
//! }
//!
//! assert_eq!(b.llc().received, Some((0x345, 2)));
//! assert_eq!(a.llc().confirmed, Some(TxStatus::Success));
//! ```
//!
//! ## Scope
//!
//! Classical base frame format only. Extended (29-bit) identifiers, CAN FD,
//! remote frames, overload and error frames, error counters and bus-off
//! management, intermission timing and arbitration are not implemented;
//! receiving a frame that announces one of the unsupported formats drives the
//! receiver into recovery.
//!
//! [`Transceiver`]: socan_core::Transceiver

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod config;
pub mod crc;
pub mod llc;
pub mod mac;
pub mod message;
pub mod pcs;
pub mod prelude;
pub mod sim;


pub use embedded_can;
pub use socan_core as core;
