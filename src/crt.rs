//! CRT engine implementation. The primary entry-point for the signal
//! path: owns the analog buffers, sync locks, monitor knobs, and filter
//! state, so independent instances never alias.

use crate::{
    decode::Yiq,
    error::{Error, Result},
    filter::{Equalizer, LowPass},
    signal::{ChromaPattern, Layout, SignalMode, I_FREQ, L_FREQ, Q_FREQ, Y_FREQ},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Signal-path configuration, fixed for the lifetime of a [`Crt`]. The
/// line geometry and IRE levels are derived from it at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct Config {
    pub mode: SignalMode,
    pub chroma_pattern: ChromaPattern,
    /// Sample the palette signal at 6 samples per subcarrier cycle
    /// instead of 3, reducing blur and bleed.
    pub palette_hires: bool,
    /// Search for vertical sync. When off, the decoder assumes line 0.
    pub vsync_lock: bool,
    /// Search for horizontal sync. When off, the decoder assumes
    /// sample 0.
    pub hsync_lock: bool,
    /// Emulate beam bloom. Side effect: the screen gets black borders.
    pub bloom: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: SignalMode::Rgb,
            chroma_pattern: ChromaPattern::Checkered,
            palette_hires: false,
            vsync_lock: true,
            hsync_lock: true,
            bloom: false,
        }
    }
}

impl Config {
    /// Configuration for a console palette source. Palette timing uses
    /// the sawtooth chroma pattern.
    pub const fn palette() -> Self {
        Self {
            mode: SignalMode::Palette,
            chroma_pattern: ChromaPattern::Sawtooth,
            palette_hires: false,
            vsync_lock: true,
            hsync_lock: true,
            bloom: false,
        }
    }
}

/// NTSC signal encode/decode engine.
///
/// One call to an encoder populates the analog field buffer; one call to
/// [`Crt::decode`] demodulates it into the output raster, blending 50/50
/// with the previous frame. Monitor knobs are public fields and may be
/// adjusted between fields; [`Crt::reset`] restores their defaults
/// without dropping sync.
#[must_use]
pub struct Crt {
    /// Hue rotation in degrees.
    pub hue: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    /// Added to the encoder's black level, in IRE.
    pub black_point: i32,
    /// Scales the encoder's white level, in percent.
    pub white_point: i32,
    pub(crate) config: Config,
    pub(crate) layout: Layout,
    /// One frame of composite signal, written by the encoders.
    pub(crate) analog: Vec<i8>,
    /// The signal as received: analog plus clamped noise.
    pub(crate) received: Vec<i8>,
    pub(crate) out: Vec<u32>,
    pub(crate) outw: usize,
    pub(crate) outh: usize,
    pub(crate) hsync: i32,
    pub(crate) vsync: i32,
    /// Color carrier reference, one leaky accumulator per phase bucket.
    pub(crate) burst_ref: [i32; 4],
    pub(crate) noise_state: i32,
    pub(crate) iir_y: LowPass,
    pub(crate) iir_i: LowPass,
    pub(crate) iir_q: LowPass,
    pub(crate) eq_y: Equalizer,
    pub(crate) eq_i: Equalizer,
    pub(crate) eq_q: Equalizer,
    /// Demodulated line scratch, sized `av_len + 1` so the resampler can
    /// read one sample ahead.
    pub(crate) scan: Vec<Yiq>,
}

impl Crt {
    const NOISE_SEED: i32 = 194;

    /// Create an engine rendering into a `width`x`height` output raster.
    pub fn new(config: Config, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidOutputSize { width, height });
        }
        let layout = Layout::new(config.mode, config.chroma_pattern, config.palette_hires);
        let rate = layout.hres as i32;
        let mut crt = Self {
            hue: 0,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            black_point: 0,
            white_point: 0,
            config,
            layout,
            analog: vec![0; layout.input_size()],
            received: vec![0; layout.input_size()],
            out: vec![0; width * height],
            outw: width,
            outh: height,
            hsync: 0,
            vsync: 0,
            burst_ref: [0; 4],
            noise_state: Self::NOISE_SEED,
            iir_y: LowPass::new(L_FREQ, Y_FREQ),
            iir_i: LowPass::new(L_FREQ, I_FREQ),
            iir_q: LowPass::new(L_FREQ, Q_FREQ),
            // Band gains are pre-scaled 16-bit fixed point, tuned for
            // NTSC luma/chroma shaping.
            eq_y: Equalizer::new(
                layout.khz_to_line(1500),
                layout.khz_to_line(3000),
                rate,
                65536,
                8192,
                9175,
            ),
            eq_i: Equalizer::new(
                layout.khz_to_line(80),
                layout.khz_to_line(1150),
                rate,
                65536,
                65536,
                1311,
            ),
            eq_q: Equalizer::new(
                layout.khz_to_line(80),
                layout.khz_to_line(1000),
                rate,
                65536,
                65536,
                0,
            ),
            scan: vec![Yiq::default(); layout.av_len + 1],
        };
        crt.reset();
        debug!(mode = ?config.mode, hres = layout.hres, "initialized crt engine");
        Ok(crt)
    }

    /// Restore the monitor knobs to their defaults and drop sync lock.
    pub fn reset(&mut self) {
        self.hue = 0;
        self.saturation = 18;
        self.brightness = 0;
        self.contrast = self.layout.default_contrast;
        self.black_point = 0;
        self.white_point = 100;
        self.hsync = 0;
        self.vsync = 0;
    }

    /// Change the output raster geometry. Filter coefficients and sync
    /// state are untouched; the new frame starts black.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidOutputSize { width, height });
        }
        self.outw = width;
        self.outh = height;
        self.out = vec![0; width * height];
        Ok(())
    }

    /// The decoded output frame, `0x00RRGGBB` per pixel, row-major.
    #[must_use]
    pub fn frame(&self) -> &[u32] {
        &self.out
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.outw
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.outh
    }

    /// The composite field buffer the encoders write into.
    #[must_use]
    pub fn analog(&self) -> &[i8] {
        &self.analog
    }

    /// Mutable access to the composite field buffer, for feeding the
    /// decoder an externally sourced signal.
    pub fn analog_mut(&mut self) -> &mut [i8] {
        &mut self.analog
    }

    /// Last recovered horizontal sync offset, in samples.
    #[must_use]
    pub const fn hsync(&self) -> i32 {
        self.hsync
    }

    /// Last recovered vertical sync line.
    #[must_use]
    pub const fn vsync(&self) -> i32 {
        self.vsync
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }
}

impl std::fmt::Debug for Crt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crt")
            .field("config", &self.config)
            .field("out", &format_args!("{}x{}", self.outw, self.outh))
            .field("hue", &self.hue)
            .field("brightness", &self.brightness)
            .field("contrast", &self.contrast)
            .field("saturation", &self.saturation)
            .field("black_point", &self.black_point)
            .field("white_point", &self.white_point)
            .field("hsync", &self.hsync)
            .field("vsync", &self.vsync)
            .finish_non_exhaustive()
    }
}
