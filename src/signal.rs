//! Composite signal geometry: line timing, IRE levels, and the chroma
//! subcarrier pattern. Derived once per engine from its [`Layout`]
//! configuration inputs and shared by the encoders and the decoder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Total scan lines per frame.
pub const VRES: usize = 262;
/// First line carrying active video.
pub const CRT_TOP: usize = 21;
/// Final line carrying active video.
pub const CRT_BOT: usize = 261;
/// Number of active video lines.
pub const CRT_LINES: usize = CRT_BOT - CRT_TOP;

/// Color burst cycles per line. Hardware puts somewhere between 7 and 12
/// cycles in the back porch.
pub const CB_CYCLES: usize = 10;

/// Line sample frequency, 14.31818 MHz in units of 10 Hz.
pub const L_FREQ: i32 = 1_431_818;
/// Luma bandwidth, 4.2 MHz.
pub const Y_FREQ: i32 = 420_000;
/// I chroma bandwidth, 1.5 MHz.
pub const I_FREQ: i32 = 150_000;
/// Q chroma bandwidth, 0.55 MHz.
pub const Q_FREQ: i32 = 55_000;

/// Modulo that stays non-negative for negative `x`.
pub(crate) const fn posmod(x: i32, n: i32) -> i32 {
    ((x % n) + n) % n
}

#[derive(Error, Debug)]
#[must_use]
#[error("failed to parse `ChromaPattern`")]
pub struct ParseChromaPatternError;

/// How the chroma subcarrier phase relates from one line to the next.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum ChromaPattern {
    /// 228 chroma cycles per line; artifacts stack vertically. Produces
    /// the rainbow effect on dithered waterfalls.
    Vertical,
    /// 227.5 cycles per line; every other line has reversed phase.
    #[default]
    Checkered,
    /// 227.3 cycles per line; artifacts crawl diagonally.
    Sawtooth,
}

impl ChromaPattern {
    pub const fn as_slice() -> &'static [Self] {
        &[Self::Vertical, Self::Checkered, Self::Sawtooth]
    }

    /// Subcarrier cycles per line, scaled by 10.
    #[must_use]
    pub const fn subcarrier_cycles(&self) -> i32 {
        match self {
            Self::Vertical => 2280,
            Self::Checkered => 2275,
            Self::Sawtooth => 2273,
        }
    }

    /// Chroma phase sign for a scan line.
    #[inline]
    #[must_use]
    pub const fn phase(&self, line: i32) -> i32 {
        match self {
            Self::Checkered if line & 1 == 1 => -1,
            _ => 1,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Checkered => "checkered",
            Self::Sawtooth => "sawtooth",
        }
    }
}

impl AsRef<str> for ChromaPattern {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for ChromaPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<usize> for ChromaPattern {
    type Error = ParseChromaPatternError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Vertical),
            1 => Ok(Self::Checkered),
            2 => Ok(Self::Sawtooth),
            _ => Err(ParseChromaPatternError),
        }
    }
}

/// Which encoder front-end the signal levels and line timing model.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum SignalMode {
    /// General RGB raster source; line segments derive from NTSC
    /// nanosecond timing.
    #[default]
    Rgb,
    /// Console PPU palette source; line segments derive from PPU pixel
    /// counts.
    Palette,
}

/// Signal amplitudes in IRE units (100 IRE ≈ 0.714 V).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Levels {
    pub white: i32,
    pub burst: i32,
    pub black: i32,
    pub blank: i32,
    pub sync: i32,
}

impl Levels {
    pub const RGB: Self = Self {
        white: 100,
        burst: 20,
        black: 7,
        blank: 0,
        sync: -40,
    };

    /// Terminated-measurement levels for PPU composite output.
    /// <https://www.nesdev.org/wiki/NTSC_video#Terminated_measurement>
    pub const PALETTE: Self = Self {
        white: 110,
        burst: 30,
        black: 0,
        blank: 0,
        sync: -37,
    };
}

/// RGB line segment durations in nanoseconds. The full line is ~63500 ns:
/// front porch, sync tip, breezeway, color burst, back porch, then active
/// video.
const FP_NS: i32 = 1500;
const SYNC_NS: i32 = 4700;
const BW_NS: i32 = 600;
const CB_NS: i32 = 2500;
const BP_NS: i32 = 1600;
const AV_NS: i32 = 52600;
const HB_NS: i32 = FP_NS + SYNC_NS + BW_NS + CB_NS + BP_NS;
const LINE_NS: i32 = HB_NS + AV_NS;

/// Palette line segments in PPU pixels, 341 per line: front porch, sync
/// tip, breezeway, color burst, back porch, pulse, left border, active
/// video, right border.
/// <https://www.nesdev.org/wiki/NTSC_video#Scanline_Timing>
const FP_PX: i32 = 9;
const SYNC_PX: i32 = 25;
const BW_PX: i32 = 4;
const CB_PX: i32 = 15;
const BP_PX: i32 = 5;
const PS_PX: i32 = 1;
const LB_PX: i32 = 15;
const AV_PX: i32 = 256;
const RB_PX: i32 = 11;
const HB_PX: i32 = FP_PX + SYNC_PX + BW_PX + CB_PX + BP_PX;
const LINE_PX: i32 = HB_PX + PS_PX + LB_PX + AV_PX + RB_PX;

/// Sampled line geometry shared by the encoders and the decoder. All
/// positions are in samples from the start of a line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub struct Layout {
    /// Samples per scan line.
    pub hres: usize,
    /// Samples per subcarrier cycle.
    pub cb_freq: usize,
    /// Sync tip start.
    pub sync_beg: usize,
    /// Breezeway start (sync tip end).
    pub bw_beg: usize,
    /// Color burst start.
    pub cb_beg: usize,
    /// Back porch start.
    pub bp_beg: usize,
    /// Active video start.
    pub av_beg: usize,
    /// Active video length.
    pub av_len: usize,
    pub levels: Levels,
    /// Multiplier applied to the sync level for the vertical sync
    /// integration threshold.
    pub vsync_scale: i32,
    pub default_contrast: i32,
}

impl Layout {
    pub const fn new(mode: SignalMode, pattern: ChromaPattern, palette_hires: bool) -> Self {
        let cb_freq = match mode {
            SignalMode::Rgb => 4,
            SignalMode::Palette if palette_hires => 6,
            SignalMode::Palette => 3,
        };
        let hres = pattern.subcarrier_cycles() * cb_freq / 10;
        match mode {
            SignalMode::Rgb => Self {
                hres: hres as usize,
                cb_freq: cb_freq as usize,
                sync_beg: ns2pos(FP_NS, hres),
                bw_beg: ns2pos(FP_NS + SYNC_NS, hres),
                cb_beg: ns2pos(FP_NS + SYNC_NS + BW_NS, hres),
                bp_beg: ns2pos(FP_NS + SYNC_NS + BW_NS + CB_NS, hres),
                av_beg: ns2pos(HB_NS, hres),
                av_len: ns2pos(AV_NS, hres),
                levels: Levels::RGB,
                vsync_scale: 100,
                default_contrast: 179,
            },
            SignalMode::Palette => Self {
                hres: hres as usize,
                cb_freq: cb_freq as usize,
                sync_beg: px2pos(FP_PX, hres),
                bw_beg: px2pos(FP_PX + SYNC_PX, hres),
                cb_beg: px2pos(FP_PX + SYNC_PX + BW_PX, hres),
                bp_beg: px2pos(HB_PX, hres),
                // The decoder scans the 256 pixel region past the pulse
                // and left border.
                av_beg: px2pos(HB_PX + PS_PX + LB_PX, hres),
                av_len: px2pos(AV_PX, hres),
                levels: Levels::PALETTE,
                vsync_scale: if palette_hires { 150 } else { 100 },
                default_contrast: 180,
            },
        }
    }

    /// Total samples in one frame of signal.
    #[must_use]
    pub const fn input_size(&self) -> usize {
        self.hres * VRES
    }

    /// Length of the color burst in samples.
    #[must_use]
    pub const fn burst_len(&self) -> usize {
        CB_CYCLES * self.cb_freq
    }

    /// Convert a kHz cutoff to its rate in line samples.
    #[must_use]
    pub const fn khz_to_line(&self, khz: i32) -> i32 {
        (self.hres as i32) * (khz * 100) / L_FREQ
    }
}

/// Nanosecond offset to sample position.
const fn ns2pos(ns: i32, hres: i32) -> usize {
    (ns * hres / LINE_NS) as usize
}

/// PPU pixel offset to sample position.
const fn px2pos(px: i32, hres: i32) -> usize {
    (px * hres / LINE_PX) as usize
}
