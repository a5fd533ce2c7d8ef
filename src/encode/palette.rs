//! Console palette encoder: models a PPU driving the composite line
//! directly with per-color square waves, four samples per subcarrier
//! cycle. Reproduces dot crawl and emphasis attenuation artifacts.

use crate::{
    crt::Crt,
    encode::{self, ChromaCarrier},
    signal::{CRT_LINES, CRT_TOP},
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Color emphasis bits of a 9-bit palette pixel. An active emphasis
    /// bit attenuates the signal during the subcarrier phases of its
    /// complementary colors.
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[must_use]
    pub struct Emphasis: u16 {
        const RED = 0x040;
        const GREEN = 0x080;
        const BLUE = 0x100;
    }
}

/// Which emphasis bits attenuate each pair of subcarrier phases.
const ACTIVE: [Emphasis; 6] = [
    Emphasis::RED.union(Emphasis::GREEN),
    Emphasis::RED,
    Emphasis::RED.union(Emphasis::BLUE),
    Emphasis::BLUE,
    Emphasis::GREEN.union(Emphasis::BLUE),
    Emphasis::GREEN,
];

/// Measured composite potentials per brightness row, in millivolts, for
/// the low and high halves of the color square wave, normal and
/// emphasis-attenuated.
/// <https://www.nesdev.org/wiki/NTSC_video#Terminated_measurement>
const LO_MV: [[i32; 4]; 2] = [[228, 312, 552, 880], [192, 256, 448, 712]];
const HI_MV: [[i32; 4]; 2] = [[616, 840, 1100, 1100], [500, 676, 896, 896]];
const BLANK_MV: i32 = 312;
const WHITE_MV: i32 = 1100;

/// Normalize a measured potential so blank sits at 0 and white at 1024,
/// the scale the four-sample accumulation expects.
const fn normalize(mv: i32) -> i32 {
    (mv - BLANK_MV) * 1024 / (WHITE_MV - BLANK_MV)
}

/// Signal level per `[high/low half][normal/attenuated][6-bit color]`.
/// Hue column 0x0 is flat at the high level, 0xD flat at the low level
/// (blacker than black), 0xE/0xF forced to blank.
static IRE_LEVELS: [[[i32; 64]; 2]; 2] = ire_levels();

const fn ire_levels() -> [[[i32; 64]; 2]; 2] {
    let mut t = [[[0; 64]; 2]; 2];
    let mut color = 0;
    while color < 64 {
        let hue = color & 0x0f;
        let luma = (color >> 4) & 3;
        let mut att = 0;
        while att < 2 {
            let lo = normalize(LO_MV[att][luma]);
            let hi = normalize(HI_MV[att][luma]);
            let (low_half, high_half) = match hue {
                0x00 => (hi, hi),
                0x0d => (lo, lo),
                0x0e | 0x0f => (0, 0),
                _ => (lo, hi),
            };
            t[0][att][color] = low_half;
            t[1][att][color] = high_half;
            att += 1;
        }
        color += 1;
    }
    t
}

/// One sample of the square wave a palette pixel drives onto the line at
/// the given subcarrier phase (12 phases per chroma cycle).
#[inline]
#[must_use]
pub fn square_sample(p: u16, phase: i32) -> i32 {
    let hue = i32::from(p & 0x0f);
    let high = (hue + phase) % 12 < 6;
    let attenuated = Emphasis::from_bits_truncate(p).intersects(ACTIVE[((phase >> 1) % 6) as usize]);
    IRE_LEVELS[usize::from(high)][usize::from(attenuated)][usize::from(p & 0x3f)]
}

/// One field of console palette pixels and how to encode it. Palette
/// fields are always progressive and always carry color burst.
#[derive(Debug, Copy, Clone)]
#[must_use]
pub struct PaletteFrame<'a> {
    /// 9-bit palette pixels: low 4 bits hue, bits 4..5 brightness, bits
    /// 6..8 emphasis (see [`Emphasis`]).
    pub pixels: &'a [u16],
    pub width: usize,
    pub height: usize,
    /// Field alignment of the three-frame dot crawl cycle, 0..=2.
    pub dot_crawl_offset: usize,
    pub carrier: ChromaCarrier,
}

impl Crt {
    /// Encode palette pixels into the analog field buffer.
    pub fn encode_palette(&mut self, frame: &PaletteFrame<'_>) {
        profile!();
        let l = self.layout;
        let (destw, desth) = encode::dest_rect(&l, self.config.bloom, None, CRT_LINES);

        // Signal stays quarter-cycle aligned.
        let xo = l.av_beg & !3;
        let yo = CRT_TOP;

        // Line offset and burst phase offset realizing the dot crawl.
        let (lo, po) = if self.config.palette_hires {
            match frame.dot_crawl_offset % 3 {
                0 => (1, 3),
                1 => (3, 1),
                _ => (2, 0),
            }
        } else {
            let p = frame.dot_crawl_offset % 3;
            (if p == 1 { 3 } else { p }, p)
        };

        encode::write_sync_pattern(self, 0, Some((frame.carrier, po as i32)));

        if frame.width == 0 || frame.height == 0 || destw == 0 {
            return;
        }

        let white_scale = l.levels.white * self.white_point / 100;
        let mut phase: i32 = 0;
        for y in lo..desth {
            let sy = ((y * frame.height) / desth).min(frame.height - 1) * frame.width;
            phase += xo as i32 * 3;
            for x in 0..destw {
                let p = frame.pixels[(x * frame.width) / destw + sy];

                // Four samples per subcarrier cycle.
                let mut ire = l.levels.black + self.black_point;
                ire += square_sample(p, phase);
                ire += square_sample(p, phase + 1);
                ire += square_sample(p, phase + 2);
                ire += square_sample(p, phase + 3);
                let ire = ((ire * white_scale) >> 12).clamp(0, 110);

                if let Some(s) = self.analog.get_mut((y + yo) * l.hres + x + xo) {
                    *s = ire as i8;
                }
                phase += 3;
            }
            // Reduce here so the accumulation never overflows down the
            // frame.
            phase = (phase + (l.hres - destw) as i32 * 3) % 12;
        }
    }
}
