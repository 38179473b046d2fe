//! Performance benchmarks for the software scaler
//!
//! Run with: cargo bench --bench scaler_benchmarks
//!
//! Measures the per-frame cost of the pass-through copy, colour conversion
//! alone and conversion with resampling for typical camera layouts.

use crabcapture::scaler::{ScaleFilter, Scaler, ScalerConfig, SoftwareScaler};
use crabcapture::testing::synthetic_video_frame;
use crabcapture::{PixelFormat, Size};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

fn scaler_for(
    filter: ScaleFilter,
    input_format: PixelFormat,
    input_size: Size,
    output_size: Size,
) -> SoftwareScaler {
    let mut scaler = SoftwareScaler::new(filter);
    scaler
        .configure(ScalerConfig {
            input_format,
            input_size,
            output_format: PixelFormat::Bgr32,
            output_size,
        })
        .expect("valid scaler config");
    scaler
}

fn bench_convert_to_bgr32(c: &mut Criterion) {
    let mut group = c.benchmark_group("Convert to BGR32");
    group.measurement_time(Duration::from_secs(5));

    let size = Size::new(640, 480);
    for format in [PixelFormat::Nv12, PixelFormat::Yuv420p, PixelFormat::Yuyv422, PixelFormat::Bgr24] {
        let frame = synthetic_video_frame(format, size, 0).expect("synthetic frame");
        let mut scaler = scaler_for(ScaleFilter::Nearest, format, size, size);
        let mut image = scaler.allocate_output_image().expect("output image");

        group.throughput(Throughput::Bytes(frame.data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format), &frame, |b, frame| {
            b.iter(|| scaler.convert(black_box(frame), &mut image).expect("convert"));
        });
    }
    group.finish();
}

fn bench_downscale(c: &mut Criterion) {
    let mut group = c.benchmark_group("Downscale NV12 720p");
    group.sample_size(20);

    let input = Size::new(1280, 720);
    let frame = synthetic_video_frame(PixelFormat::Nv12, input, 0).expect("synthetic frame");
    for (filter, name) in [
        (ScaleFilter::Nearest, "nearest"),
        (ScaleFilter::Triangle, "triangle"),
        (ScaleFilter::Lanczos3, "lanczos3"),
    ] {
        let mut scaler = scaler_for(filter, PixelFormat::Nv12, input, Size::new(640, 360));
        let mut image = scaler.allocate_output_image().expect("output image");
        group.bench_function(name, |b| {
            b.iter(|| scaler.convert(black_box(&frame), &mut image).expect("convert"));
        });
    }
    group.finish();
}

fn bench_same_layout_copy(c: &mut Criterion) {
    let size = Size::new(1920, 1080);
    let frame = synthetic_video_frame(PixelFormat::Bgr32, size, 0).expect("synthetic frame");
    let mut scaler = scaler_for(ScaleFilter::Triangle, PixelFormat::Bgr32, size, size);
    let mut image = scaler.allocate_output_image().expect("output image");

    c.bench_function("BGR32 1080p copy", |b| {
        b.iter(|| scaler.convert(black_box(&frame), &mut image).expect("convert"));
    });
}

criterion_group!(
    benches,
    bench_convert_to_bgr32,
    bench_downscale,
    bench_same_layout_copy
);
criterion_main!(benches);
