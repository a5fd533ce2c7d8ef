//! Composite decoder: noise injection, sync recovery by integration,
//! color-burst phase locking, quadrature demodulation, band shaping,
//! horizontal resampling, and the phosphor blend into the output raster.

use crate::{
    crt::Crt,
    fixed,
    signal::{posmod, CRT_BOT, CRT_LINES, CRT_TOP, VRES},
};
use tracing::trace;

/// Demodulated YIQ triple for one line sample.
#[derive(Default, Debug, Copy, Clone)]
pub(crate) struct Yiq {
    pub(crate) y: i32,
    pub(crate) i: i32,
    pub(crate) q: i32,
}

/// Sync search windows, in lines/samples around the previous lock.
const VSYNC_WINDOW: i32 = 8;
const HSYNC_WINDOW: i32 = 8;

impl Crt {
    /// Decode the analog field buffer into the output raster, degrading
    /// the signal with `noise` first (0 = clean; negative treated as 0).
    ///
    /// Each output pixel is blended 50/50 with the prior frame's pixel,
    /// so a stable image wants a few accumulated fields.
    pub fn decode(&mut self, noise: i32) {
        profile!();
        let l = self.layout;
        let hres = l.hres as i32;
        let size = l.input_size();
        let noise = noise.max(0);

        let (huesn, huecs) = fixed::sincos14(((self.hue % 360) + 90) * 8192 / 180);
        let (huesn, huecs) = (huesn >> 11, huecs >> 11);

        // Signal plus quantized noise into the receive buffer.
        let mut rn = self.noise_state;
        for (dst, &src) in self.received.iter_mut().zip(self.analog.iter()) {
            rn = rn.wrapping_mul(214_019).wrapping_add(140_327_895);
            let s = i32::from(src) + (((((rn >> 16) & 0xff) - 0x7f) * noise) >> 8);
            *dst = s.clamp(-127, 127) as i8;
        }
        self.noise_state = rn;

        // Look for vertical sync: integrate candidate lines until one
        // dips below the threshold. The vsync pulse is much longer than
        // hsync, hence the larger multiplier; integration also rides out
        // noise.
        let mut vhit = None;
        'vsearch: for i in -VSYNC_WINDOW..VSYNC_WINDOW {
            let line = posmod(self.vsync + i, VRES as i32);
            let base = line as usize * l.hres;
            let mut s = 0;
            for j in 0..l.hres {
                s += i32::from(self.received[base + j]);
                if s <= l.vsync_scale * l.levels.sync {
                    vhit = Some((line, j));
                    break 'vsearch;
                }
            }
        }
        let field = match vhit {
            Some((line, j)) => {
                if line != self.vsync {
                    trace!(line, "vertical sync moved");
                }
                self.vsync = line;
                // A hit in the second half of the line means odd field.
                usize::from(j > l.hres / 2)
            }
            // Gave up; keep the previous lock.
            None => 0,
        };
        if !self.config.vsync_lock {
            self.vsync = 0;
        }

        // Ratio of output height to active signal lines.
        let ratio = ((self.outh << 16) / CRT_LINES + 32768) >> 16;
        let field = field * (ratio / 2);

        let bright = self.brightness - (l.levels.black + self.black_point);
        let max_e = (128 + noise / 2) * l.av_len as i32;
        let mut prev_e: i32 = 16384 / 8;

        for line in CRT_TOP..CRT_BOT {
            let beg = (line - CRT_TOP) * self.outh / CRT_LINES + field;
            let end = ((line - CRT_TOP + 1) * self.outh / CRT_LINES + field).min(self.outh);
            if beg >= self.outh {
                continue;
            }

            // Look for horizontal sync, same integration idea.
            let ln = posmod(line as i32 + self.vsync, VRES as i32) as usize * l.hres;
            let base = ln + self.hsync as usize;
            let mut s = 0;
            let mut hhit = None;
            for i in -HSYNC_WINDOW..HSYNC_WINDOW {
                let idx = (base as i32 + l.sync_beg as i32 + i) as usize % size;
                s += i32::from(self.received[idx]);
                if s <= 4 * l.levels.sync {
                    hhit = Some(i);
                    break;
                }
            }
            if self.config.hsync_lock {
                if let Some(i) = hhit {
                    self.hsync = posmod(i + self.hsync, hres);
                }
            } else {
                self.hsync = 0;
            }

            // Accumulate the burst into the carrier reference, aligned to
            // the quarter-cycle sample grid.
            let aligned = ln + (self.hsync & !3) as usize;
            for i in l.cb_beg..l.cb_beg + l.burst_len() {
                let sample = i32::from(self.received[(aligned + i) % size]);
                let bucket = &mut self.burst_ref[i & 3];
                *bucket = *bucket * 127 / 128 + sample;
            }

            let xpos = posmod(l.av_beg as i32 + self.hsync, hres);
            let ypos = posmod(line as i32 + self.vsync, VRES as i32);
            let pos = (xpos + ypos * hres) as usize;
            let pa = pos & 3;

            // Carrier amplitude carries saturation, phase difference
            // carries hue.
            let dci = self.burst_ref[(pa + 1) & 3] - self.burst_ref[(pa + 3) & 3];
            let dcq = self.burst_ref[(pa + 2) & 3] - self.burst_ref[pa];

            // Rotate by the hue adjustment angle.
            let w0 = ((dci * huecs - dcq * huesn) >> 4) * self.saturation;
            let w1 = ((dcq * huecs + dci * huesn) >> 4) * self.saturation;
            let wave = [w0, w1, -w0, -w1];

            let (scan_l, dx) = if self.config.bloom {
                // Beam energy widens or narrows the scan line.
                let mut e = 0;
                for i in 0..l.av_len {
                    e += i32::from(self.received[(pos + i) % size]);
                }
                prev_e = prev_e * 123 / 128 + ((((max_e >> 1) - e) << 10) / max_e);
                let line_w = l.av_len as i32 * 112 / 128 + (prev_e >> 9);
                let dx = (line_w << 12) / self.outw as i32;
                let scan_l = ((l.av_len as i32 / 2 - (line_w >> 1) + 8) << 12).max(0);
                (scan_l, dx)
            } else {
                (0, ((l.av_len as i32 - 1) << 12) / self.outw as i32)
            };
            let scan_r = (l.av_len as i32 - 1) << 12;
            let eq_from = (scan_l >> 12) as usize;
            let eq_to = if self.config.bloom {
                (scan_r >> 12) as usize
            } else {
                l.av_len
            };

            self.eq_y.reset();
            self.eq_i.reset();
            self.eq_q.reset();

            // Demodulate: the 90° offset between the I and Q wave taps is
            // what separates the two.
            for i in eq_from..eq_to {
                let s = i32::from(self.received[(pos + i) % size]);
                let w = i as i32;
                self.scan[i] = Yiq {
                    y: self.eq_y.filter(s + bright) << 4,
                    i: self.eq_i.filter((s * wave[(w & 3) as usize]) >> 9) >> 3,
                    q: self.eq_q.filter((s * wave[((w + 3) & 3) as usize]) >> 9) >> 3,
                };
            }

            // Resample the scan line into the output row with sub-sample
            // interpolation, then blend into the phosphor.
            let row = beg * self.outw;
            let mut col = 0;
            let mut pos12 = scan_l;
            while pos12 < scan_r && col < self.outw {
                let rf = pos12 & 0xfff;
                let lf = 0xfff - rf;
                let s = (pos12 >> 12) as usize;
                let a = self.scan[s];
                let b = self.scan[s + 1];

                let y = ((a.y * lf) >> 2) + ((b.y * rf) >> 2);
                let i = ((a.i * lf) >> 14) + ((b.i * rf) >> 14);
                let q = ((a.q * lf) >> 14) + ((b.q * rf) >> 14);

                let r = (((y + 3879 * i + 2556 * q) >> 12) * self.contrast) >> 8;
                let g = (((y - 1126 * i - 2605 * q) >> 12) * self.contrast) >> 8;
                let b = (((y - 4530 * i + 7021 * q) >> 12) * self.contrast) >> 8;

                let aa = (r.clamp(0, 255) as u32) << 16
                    | (g.clamp(0, 255) as u32) << 8
                    | b.clamp(0, 255) as u32;
                let bb = self.out[row + col];
                // The mask keeps a channel's low bit from carrying into
                // its neighbor.
                self.out[row + col] = ((aa & 0xfefeff) >> 1) + ((bb & 0xfefeff) >> 1);
                col += 1;
                pos12 += dx;
            }

            // Duplicate the row over the extra output lines it covers.
            for r in beg + 1..end {
                self.out
                    .copy_within((r - 1) * self.outw..r * self.outw, r * self.outw);
            }
        }
    }
}
