#![macro_use]
#![allow(unused_macros)]

//! Internal logging shim.
//!
//! Trace points forward to `defmt` or to the `log` facade depending on the
//! enabled cargo feature, and compile to nothing when neither is selected.
//! Only plain `{}` placeholders are used at call sites so that the same
//! format string works with both backends.

macro_rules! trace {
    ($($arg:expr),* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg),*);
        #[cfg(all(not(feature = "defmt"), feature = "log"))]
        ::log::trace!($($arg),*);
        #[cfg(all(not(feature = "defmt"), not(feature = "log")))]
        let _ = ($(&$arg),*);
    }};
}

macro_rules! debug {
    ($($arg:expr),* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg),*);
        #[cfg(all(not(feature = "defmt"), feature = "log"))]
        ::log::debug!($($arg),*);
        #[cfg(all(not(feature = "defmt"), not(feature = "log")))]
        let _ = ($(&$arg),*);
    }};
}
