//! Field synthesis shared by both encoder front-ends: the horizontal
//! blanking pattern, vertical-interval pulses, and color burst.

pub mod palette;
pub mod rgb;

pub use palette::PaletteFrame;
pub use rgb::RgbFrame;

use crate::{
    crt::Crt,
    fixed,
    signal::{Layout, CRT_LINES, CRT_TOP, VRES},
};
use serde::{Deserialize, Serialize};

/// Chroma subcarrier reference: four samples spanning one cycle, plus the
/// scale those samples are expressed in. `{0, 1, 0, -1}` at scale 1 is a
/// unit sine; carriers built from [`ChromaCarrier::from_hue`] use scale 16
/// for finer phase resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct ChromaCarrier {
    pub pattern: [i32; 4],
    pub scale: i32,
}

impl Default for ChromaCarrier {
    fn default() -> Self {
        Self {
            pattern: [0, 1, 0, -1],
            scale: 1,
        }
    }
}

impl ChromaCarrier {
    /// Unit carrier rotated by `offset` quarter cycles (90° per step).
    pub const fn with_phase_offset(offset: usize) -> Self {
        const REF: [i32; 4] = [0, 1, 0, -1];
        let mut pattern = [0; 4];
        let mut i = 0;
        while i < 4 {
            pattern[i] = REF[(offset + i) & 3];
            i += 1;
        }
        Self { pattern, scale: 1 }
    }

    /// Carrier sampled from a hue angle in degrees.
    pub const fn from_hue(hue: i32) -> Self {
        let mut pattern = [0; 4];
        let mut i = 0;
        while i < 4 {
            let (sn, _) = fixed::sincos14((hue + (i as i32) * 90) * 8192 / 180);
            pattern[i] = sn >> 11;
            i += 1;
        }
        Self { pattern, scale: 16 }
    }

    /// Carrier sample for quarter-cycle index `i` (wraps mod 4).
    #[inline]
    #[must_use]
    pub(crate) const fn at(&self, i: i32) -> i32 {
        self.pattern[(i & 3) as usize]
    }
}

/// A caller-owned source image for one encoded field.
#[derive(Debug)]
#[must_use]
pub enum FrameInput<'a> {
    Rgb(RgbFrame<'a>),
    Palette(PaletteFrame<'a>),
}

impl Crt {
    /// Encode one field from any supported source.
    pub fn encode(&mut self, input: &FrameInput<'_>) {
        match input {
            FrameInput::Rgb(frame) => self.encode_rgb(frame),
            FrameInput::Palette(frame) => self.encode_palette(frame),
        }
    }
}

fn fill(line: &mut [i8], beg: usize, end: usize, level: i8) {
    line[beg..end].fill(level);
}

/// Write the full-frame timing pattern into the analog buffer. Lines 0..3
/// and 7..9 carry equalizing pulses, 4..6 the vertical serration (offset
/// for odd fields), everything else the standard blank/sync/blank line.
/// When a carrier is given, ten cycles of burst go out on every video
/// line, shifted by the paired quarter-cycle offset.
pub(crate) fn write_sync_pattern(
    crt: &mut Crt,
    field: usize,
    burst: Option<(ChromaCarrier, i32)>,
) {
    let l = crt.layout;
    let hres = l.hres;
    let sync = l.levels.sync as i8;
    let blank = l.levels.blank as i8;

    for n in 0..VRES {
        let line = &mut crt.analog[n * hres..(n + 1) * hres];

        if n <= 3 || (7..=9).contains(&n) {
            // Equalizing pulses: small blips of sync, mostly blank.
            fill(line, 0, 4 * hres / 100, sync);
            fill(line, 4 * hres / 100, 50 * hres / 100, blank);
            fill(line, 50 * hres / 100, 54 * hres / 100, sync);
            fill(line, 54 * hres / 100, hres, blank);
        } else if (4..=6).contains(&n) {
            // Vertical sync pulse: small blips of blank, mostly sync.
            let offs: [usize; 4] = if field == 1 {
                [4, 50, 96, 100]
            } else {
                [46, 50, 96, 100]
            };
            let mut t = 0;
            for (k, pct) in offs.into_iter().enumerate() {
                let end = pct * hres / 100;
                fill(line, t, end, if k & 1 == 0 { sync } else { blank });
                t = end;
            }
        } else {
            // Video line: front porch, sync tip, then blank through the
            // back porch. Lines above the active range blank out fully.
            fill(line, 0, l.sync_beg, blank);
            fill(line, l.sync_beg, l.bw_beg, sync);
            fill(line, l.bw_beg, l.av_beg, blank);
            if n < CRT_TOP {
                fill(line, l.av_beg, hres, blank);
            }
            if let Some((carrier, po)) = burst {
                for t in l.cb_beg..l.cb_beg + l.burst_len() {
                    let cb = carrier.at(t as i32 + po);
                    line[t] = (i32::from(blank) + cb * l.levels.burst / carrier.scale) as i8;
                }
            }
        }
    }
}

/// Destination rectangle inside the active video window. `raw` sizes the
/// rect from the source image (clipped to the envelope); bloom shrinks
/// the envelope to leave room for beam wander.
pub(crate) fn dest_rect(
    l: &Layout,
    bloom: bool,
    raw: Option<(usize, usize)>,
    default_h: usize,
) -> (usize, usize) {
    if bloom {
        let max_w = l.av_len * 55500 >> 16;
        let max_h = CRT_LINES * 63500 >> 16;
        match raw {
            Some((w, h)) => (w.min(max_w), h.min(max_h)),
            None => (max_w, max_h),
        }
    } else {
        let max_h = CRT_LINES * 64500 >> 16;
        match raw {
            Some((w, h)) => (w.min(l.av_len), h.min(max_h)),
            None => (l.av_len, default_h),
        }
    }
}
