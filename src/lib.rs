#![doc = include_str!("../README.md")]

#[cfg(feature = "profiling")]
macro_rules! profile {
    () => {
        puffin::profile_function!();
    };
}

#[cfg(not(feature = "profiling"))]
macro_rules! profile {
    () => {};
}

pub mod crt;
pub mod decode;
pub mod encode;
pub mod error;
pub mod filter;
pub mod fixed;
pub mod signal;

pub mod prelude {
    //! Re-exports of the common types needed to drive the signal path.

    pub use crate::{
        crt::{Config, Crt},
        encode::{ChromaCarrier, FrameInput, PaletteFrame, RgbFrame},
        error::{Error, Result},
        signal::{ChromaPattern, SignalMode},
    };
}
