//! Band-limiting and equalization filters for shaping the Y/I/Q channels
//! on either side of the composite signal.

use crate::fixed::{self, EXP_ONE, EXP_PI, T14_PI};
use serde::{Deserialize, Serialize};

/// Input history kept by the equalizer; the oldest tap feeds the high
/// band, giving it a small group delay.
const HISTLEN: usize = 3;

/// Equalizer fixed-point precision. The band gains are pre-scaled against
/// this value, so the two must change together.
const EQ_P: i32 = 16;
const EQ_R: i32 = 1 << (EQ_P - 1);

/// Single-pole IIR low-pass, used to bandlimit Y/I/Q before the chroma
/// carrier is modulated on.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct LowPass {
    c: i32,
    h: i32,
}

impl LowPass {
    /// `freq` is the total bandwidth and `limit` the cutoff, both in Hz.
    pub const fn new(freq: i32, limit: i32) -> Self {
        let rate = (freq << 9) / limit;
        Self {
            c: EXP_ONE - fixed::expx(-((EXP_PI << 9) / rate)),
            h: 0,
        }
    }

    pub fn reset(&mut self) {
        self.h = 0;
    }

    #[inline]
    pub fn filter(&mut self, s: i32) -> i32 {
        self.h += fixed::exp_mul(s - self.h, self.c);
        self.h
    }
}

/// Three-band equalizer: two cascaded 4-stage one-pole low-passes split
/// the input into low/mid/high bands, each scaled by its own 16-bit gain.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Equalizer {
    lf: i32,
    hf: i32,
    g: [i32; 3],
    f_lo: [i32; 4],
    f_hi: [i32; 4],
    h: [i32; HISTLEN],
}

impl Equalizer {
    /// `f_lo`/`f_hi` are the band split cutoffs and `rate` the sampling
    /// rate, all in line samples. Gains are `EQ_P`-bit fixed point.
    pub const fn new(f_lo: i32, f_hi: i32, rate: i32, g_lo: i32, g_mid: i32, g_hi: i32) -> Self {
        let (lo_sn, _) = fixed::sincos14(T14_PI * f_lo / rate);
        let (hi_sn, _) = fixed::sincos14(T14_PI * f_hi / rate);
        Self {
            lf: 2 * (lo_sn << (EQ_P - 15)),
            hf: 2 * (hi_sn << (EQ_P - 15)),
            g: [g_lo, g_mid, g_hi],
            f_lo: [0; 4],
            f_hi: [0; 4],
            h: [0; HISTLEN],
        }
    }

    pub fn reset(&mut self) {
        self.f_lo = [0; 4];
        self.f_hi = [0; 4];
        self.h = [0; HISTLEN];
    }

    pub fn filter(&mut self, s: i32) -> i32 {
        // 64-bit products: cranked saturation can push the chroma bands
        // past what a 32-bit multiply holds.
        let step = |f: i32, prev: i32, cur: i32| -> i32 {
            ((i64::from(f) * i64::from(prev - cur) + i64::from(EQ_R)) >> EQ_P) as i32
        };

        self.f_lo[0] += step(self.lf, s, self.f_lo[0]);
        self.f_hi[0] += step(self.hf, s, self.f_hi[0]);
        for i in 1..4 {
            self.f_lo[i] += step(self.lf, self.f_lo[i - 1], self.f_lo[i]);
            self.f_hi[i] += step(self.hf, self.f_hi[i - 1], self.f_hi[i]);
        }

        let mut r = [
            self.f_lo[3],
            self.f_hi[3] - self.f_lo[3],
            self.h[HISTLEN - 1] - self.f_hi[3],
        ];
        for (band, gain) in r.iter_mut().zip(self.g) {
            *band = ((i64::from(*band) * i64::from(gain)) >> EQ_P) as i32;
        }

        for i in (1..HISTLEN).rev() {
            self.h[i] = self.h[i - 1];
        }
        self.h[0] = s;

        r[0] + r[1] + r[2]
    }
}
