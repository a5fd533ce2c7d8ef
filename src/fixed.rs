//! Fixed-point math kernel. Everything downstream of these routines is
//! integer-only, so two machines always produce bit-identical frames.

/// One full turn of the 14-bit angle format (2π == 16384).
pub const T14_2PI: i32 = 16384;
pub const T14_MASK: i32 = T14_2PI - 1;
pub const T14_PI: i32 = T14_2PI / 2;

/// Precision of [`expx`] (11-bit fixed point, 1.0 == 2048).
pub const EXP_P: i32 = 11;
pub const EXP_ONE: i32 = 1 << EXP_P;
pub const EXP_MASK: i32 = EXP_ONE - 1;
/// π in [`expx`] fixed point.
pub const EXP_PI: i32 = 6434;

/// Significant points on a quarter sine wave, scaled to 15 bits. The two
/// trailing entries keep the interpolation in [`sintabil8`] in bounds at
/// the quarter boundary.
const SIGPSIN15: [i32; 18] = [
    0x0000, 0x0c88, 0x18f8, 0x2528, 0x30f8, 0x3c50, 0x4718, 0x5130, 0x5a80, 0x62f0, 0x6a68, 0x70e0,
    0x7640, 0x7a78, 0x7d88, 0x7f60, 0x8000, 0x7f60,
];

/// Table lookup with 8-bit linear interpolation. `n` must be within one
/// quarter turn (0..=4096).
const fn sintabil8(n: i32) -> i32 {
    let f = n & 0xff;
    let i = (n >> 8) as usize;
    let a = SIGPSIN15[i];
    let b = SIGPSIN15[i + 1];
    a + ((b - a) * f >> 8)
}

/// 14-bit interpolated sine/cosine. Treats `n` as an angle with
/// [`T14_2PI`] per turn and returns `(sin, cos)` scaled to ±2¹⁵.
///
/// Exact at the four quadrant boundaries and monotonic within a quarter.
#[must_use]
pub const fn sincos14(n: i32) -> (i32, i32) {
    let n = n & T14_MASK;
    let h = n & ((T14_2PI >> 1) - 1);

    let (mut sn, mut cs);
    if h > (T14_2PI >> 2) - 1 {
        cs = -sintabil8(h - (T14_2PI >> 2));
        sn = sintabil8((T14_2PI >> 1) - h);
    } else {
        cs = sintabil8((T14_2PI >> 2) - h);
        sn = sintabil8(h);
    }
    if n > (T14_2PI >> 1) - 1 {
        cs = -cs;
        sn = -sn;
    }
    (sn, cs)
}

#[inline]
#[must_use]
pub const fn exp_mul(x: i32, y: i32) -> i32 {
    (x * y) >> EXP_P
}

#[inline]
#[must_use]
pub const fn exp_div(x: i32, y: i32) -> i32 {
    (x << EXP_P) / y
}

/// Integer powers of e in [`expx`] fixed point: e⁰ through e⁴.
const E11: [i32; 5] = [EXP_ONE, 5567, 15133, 41135, 111817];

/// Fixed-point e^x. The integer part multiplies powers from [`E11`]
/// (iterating e⁴ for exponents past the table); the fractional part is a
/// truncated Taylor series that exits once the next term underflows.
/// Negative input returns the reciprocal.
#[must_use]
pub const fn expx(n: i32) -> i32 {
    if n == 0 {
        return EXP_ONE;
    }
    let neg = n < 0;
    let mut n = if neg { -n } else { n };

    let mut idx = n >> EXP_P;
    let mut res = EXP_ONE;
    let mut i = 0;
    while i < idx / 4 {
        res = exp_mul(res, E11[4]);
        i += 1;
    }
    idx &= 3;
    if idx > 0 {
        res = exp_mul(res, E11[idx as usize]);
    }

    n &= EXP_MASK;
    let mut nxt = EXP_ONE;
    let mut acc = 0;
    let mut del = 1;
    let mut i = 1;
    while i < 17 {
        acc += nxt / del;
        nxt = exp_mul(nxt, n);
        del *= i;
        if del > nxt || nxt <= 0 || del <= 0 {
            break;
        }
        i += 1;
    }
    res = exp_mul(res, acc);

    if neg {
        res = exp_div(EXP_ONE, res);
    }
    res
}
