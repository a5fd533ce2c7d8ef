//! Error handling.

use thiserror::Error;

/// Result returned from fallible [`crate::crt::Crt`] methods.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    /// The output raster must have at least one pixel in each dimension;
    /// the horizontal resampler divides by the output width.
    #[error("invalid output dimensions {width}x{height}")]
    InvalidOutputSize { width: usize, height: usize },
}
