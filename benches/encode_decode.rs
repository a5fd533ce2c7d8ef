use criterion::{criterion_group, criterion_main, Criterion};
use crtsim::prelude::*;
use std::hint::black_box;

fn field_cycle(crt: &mut Crt, pixels: &[u32], fields: u32) {
    let frame = RgbFrame {
        pixels,
        width: 256,
        height: 240,
        raw: false,
        color: true,
        field: 0,
        carrier: ChromaCarrier::default(),
    };
    for _ in 0..fields {
        crt.encode_rgb(&frame);
        crt.decode(black_box(12));
    }
}

fn palette_cycle(crt: &mut Crt, pixels: &[u16], fields: u32) {
    for n in 0..fields {
        let frame = PaletteFrame {
            pixels,
            width: 256,
            height: 240,
            dot_crawl_offset: n as usize % 3,
            carrier: ChromaCarrier::default(),
        };
        crt.encode_palette(&frame);
        crt.decode(black_box(12));
    }
}

fn rgb(c: &mut Criterion) {
    let mut group = c.benchmark_group("crt");
    group.sample_size(30);
    let pixels: Vec<u32> = (0..256u32 * 240)
        .map(|i| i.wrapping_mul(0x0101_0101).rotate_left(i % 7) & 0x00FF_FFFF)
        .collect();
    let mut crt = Crt::new(Config::default(), 640, 480).expect("valid output size");
    group.bench_function("rgb_field", |b| {
        b.iter(|| field_cycle(&mut crt, black_box(&pixels), 1))
    });
    group.finish();
}

fn palette(c: &mut Criterion) {
    let mut group = c.benchmark_group("crt");
    group.sample_size(30);
    let pixels: Vec<u16> = (0..256usize * 240).map(|i| (i % 0x40) as u16).collect();
    let mut crt = Crt::new(Config::palette(), 640, 480).expect("valid output size");
    group.bench_function("palette_field", |b| {
        b.iter(|| palette_cycle(&mut crt, black_box(&pixels), 1))
    });
    group.finish();
}

criterion_group!(benches, rgb, palette);
criterion_main!(benches);
