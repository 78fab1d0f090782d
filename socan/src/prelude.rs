//! Convenience re-export of common members
//!
//! Like the standard library's prelude, this module simplifies importing of
//! common items. Unlike the standard prelude, the contents of this module
//! must be imported manually:
//!
//! ```
//! use socan::prelude::*;
//! ```

pub use crate::llc::Llc as _;
pub use embedded_can::Frame as _;
pub use socan_core::Transceiver as _;
