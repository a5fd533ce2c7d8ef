//! General RGB raster encoder: integer RGB→YIQ conversion, band-limiting,
//! and quadrature modulation of I/Q onto the chroma carrier.

use crate::{
    crt::Crt,
    encode::{self, ChromaCarrier},
    signal::{CRT_LINES, CRT_TOP},
};

/// One field of RGB source pixels and how to encode it.
#[derive(Debug, Copy, Clone)]
#[must_use]
pub struct RgbFrame<'a> {
    /// `0x00RRGGBB` pixels, row-major.
    pub pixels: &'a [u32],
    pub width: usize,
    pub height: usize,
    /// Keep the source dimensions instead of scaling to the active
    /// window. Needed for images that rely on artifact colors.
    pub raw: bool,
    /// `false` encodes a monochrome field: no burst, no chroma.
    pub color: bool,
    /// 0 = even, 1 = odd.
    pub field: usize,
    pub carrier: ChromaCarrier,
}

/// Y/I/Q conversion rows of the RGB matrix, 15-bit fixed point.
const YIQ_Y: [i32; 3] = [19595, 38470, 7471];
const YIQ_I: [i32; 3] = [39059, -18022, -21103];
const YIQ_Q: [i32; 3] = [13894, -34275, 20382];

#[inline]
const fn channels(p: u32) -> (i32, i32, i32) {
    (
        (p >> 16 & 0xff) as i32,
        (p >> 8 & 0xff) as i32,
        (p & 0xff) as i32,
    )
}

impl Crt {
    /// Encode an RGB image into the analog field buffer, centered in the
    /// active video window with slight vertical field blending.
    pub fn encode_rgb(&mut self, frame: &RgbFrame<'_>) {
        profile!();
        let l = self.layout;
        let field = frame.field & 1;
        let (destw, desth) = encode::dest_rect(
            &l,
            self.config.bloom,
            frame.raw.then_some((frame.width, frame.height)),
            CRT_LINES * 64500 >> 16,
        );

        // Center the rect and keep the signal quarter-cycle aligned.
        let xo = (l.av_beg + 4 + (l.av_len - destw) / 2) & !3;
        let yo = CRT_TOP + 4 + (CRT_LINES - desth) / 2;

        encode::write_sync_pattern(self, field, frame.color.then_some((frame.carrier, 0)));

        if frame.width == 0 || frame.height == 0 || destw == 0 || desth == 0 {
            return;
        }

        let white_scale = l.levels.white * self.white_point / 100;
        for y in 0..desth {
            let field_offset = (field * frame.height + desth) / desth / 2;
            let sy_a = ((y * frame.height) / desth + field_offset).min(frame.height - 1);
            let sy_b = ((y * frame.height + desth / 2) / desth + field_offset).min(frame.height - 1);
            let row_a = sy_a * frame.width;
            let row_b = sy_b * frame.width;

            self.iir_y.reset();
            self.iir_i.reset();
            self.iir_q.reset();

            let ph = self.config.chroma_pattern.phase((y + yo) as i32);
            for x in 0..destw {
                let sx = (x * frame.width) / destw;
                let (ra, ga, ba) = channels(frame.pixels[sx + row_a]);
                let (rb, gb, bb) = channels(frame.pixels[sx + row_b]);

                // RGB to YIQ, blending with the second field row.
                let (r, g, b) = (ra + rb, ga + gb, ba + bb);
                let fy = (YIQ_Y[0] * r + YIQ_Y[1] * g + YIQ_Y[2] * b) >> 15;
                let fi = (YIQ_I[0] * r + YIQ_I[1] * g + YIQ_I[2] * b) >> 15;
                let fq = (YIQ_Q[0] * r + YIQ_Q[1] * g + YIQ_Q[2] * b) >> 15;

                // Bandlimit Y, modulate I/Q onto the carrier.
                let fy = self.iir_y.filter(fy);
                let fi =
                    self.iir_i.filter(fi) * ph * frame.carrier.at(x as i32) / frame.carrier.scale;
                let fq = self.iir_q.filter(fq) * ph * frame.carrier.at(x as i32 + 3)
                    / frame.carrier.scale;

                let mut ire = l.levels.black + self.black_point;
                ire += ((fy + fi + fq) * white_scale) >> 10;
                let ire = ire.clamp(0, 110);

                if let Some(s) = self.analog.get_mut((y + yo) * l.hres + x + xo) {
                    *s = ire as i8;
                }
            }
        }
    }

    /// Encode an RGB image stretched over the whole active video window.
    /// Skips the vertical field blending of [`Crt::encode_rgb`], which is
    /// useful for test patterns.
    pub fn encode_rgb_fullscreen(&mut self, frame: &RgbFrame<'_>) {
        profile!();
        let l = self.layout;
        let field = frame.field & 1;
        let (destw, desth) = (l.av_len, CRT_LINES);

        let xo = l.av_beg & !3;
        let yo = CRT_TOP;

        encode::write_sync_pattern(self, field, frame.color.then_some((frame.carrier, 0)));

        if frame.width == 0 || frame.height == 0 {
            return;
        }

        let white_scale = l.levels.white * self.white_point / 100;
        for y in 0..desth {
            let field_offset = (field * frame.height + desth) / desth / 2;
            let sy = ((y * frame.height) / desth + field_offset).min(frame.height - 1);
            let row = sy * frame.width;

            self.iir_y.reset();
            self.iir_i.reset();
            self.iir_q.reset();

            let ph = self.config.chroma_pattern.phase((y + yo) as i32);
            for x in 0..destw {
                let sx = (x * frame.width) / destw;
                let (r, g, b) = channels(frame.pixels[sx + row]);

                // Wider shift: only one sample contributes.
                let fy = (YIQ_Y[0] * r + YIQ_Y[1] * g + YIQ_Y[2] * b) >> 14;
                let fi = (YIQ_I[0] * r + YIQ_I[1] * g + YIQ_I[2] * b) >> 14;
                let fq = (YIQ_Q[0] * r + YIQ_Q[1] * g + YIQ_Q[2] * b) >> 14;

                let fy = self.iir_y.filter(fy);
                let fi =
                    self.iir_i.filter(fi) * ph * frame.carrier.at(x as i32) / frame.carrier.scale;
                let fq = self.iir_q.filter(fq) * ph * frame.carrier.at(x as i32 + 3)
                    / frame.carrier.scale;

                let mut ire = l.levels.black + self.black_point;
                ire += ((fy + fi + fq) * white_scale) >> 10;
                let ire = ire.clamp(0, 110);

                if let Some(s) = self.analog.get_mut((y + yo) * l.hres + x + xo) {
                    *s = ire as i8;
                }
            }
        }
    }
}
