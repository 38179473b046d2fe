//! Unpacking frames to RGBA and packing RGBA back into any [`PixelFormat`].
//!
//! YUV uses BT.601 limited-range integer coefficients. Chroma is sampled
//! from the covering block on unpack and averaged over the block on pack.

use crate::errors::CaptureError;
use crate::types::{PixelFormat, Size};
use image::{Rgba, RgbaImage};

fn clamp(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

pub(crate) fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    [
        clamp((298 * c + 409 * e + 128) >> 8),
        clamp((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp((298 * c + 516 * d + 128) >> 8),
    ]
}

pub(crate) fn rgb_to_yuv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    [
        clamp(((66 * r + 129 * g + 25 * b + 128) >> 8) + 16),
        clamp(((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128),
        clamp(((112 * r - 94 * g - 18 * b + 128) >> 8) + 128),
    ]
}

fn gray(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

fn luma_index(format: PixelFormat, size: Size, x: usize, y: usize) -> usize {
    let w = size.width as usize;
    let packed_stride = w.div_ceil(2) * 4;
    match format {
        PixelFormat::Yuyv422 => y * packed_stride + (x / 2) * 4 + (x % 2) * 2,
        PixelFormat::Uyvy422 => y * packed_stride + (x / 2) * 4 + 1 + (x % 2) * 2,
        _ => y * w + x,
    }
}

/// Byte offsets of the U and V samples for chroma position (`cx`, `cy`).
fn chroma_indices(format: PixelFormat, size: Size, cx: usize, cy: usize) -> (usize, usize) {
    let planes = format.planes(size);
    match format {
        PixelFormat::Nv12 => {
            let u = planes[1].offset + cy * planes[1].stride + cx * 2;
            (u, u + 1)
        }
        PixelFormat::Yuv420p | PixelFormat::Yuv422p => (
            planes[1].offset + cy * planes[1].stride + cx,
            planes[2].offset + cy * planes[2].stride + cx,
        ),
        PixelFormat::Yv12 => (
            planes[2].offset + cy * planes[2].stride + cx,
            planes[1].offset + cy * planes[1].stride + cx,
        ),
        PixelFormat::Yuyv422 => {
            let base = cy * planes[0].stride + cx * 4;
            (base + 1, base + 3)
        }
        PixelFormat::Uyvy422 => {
            let base = cy * planes[0].stride + cx * 4;
            (base, base + 2)
        }
        PixelFormat::Bgr24 | PixelFormat::Bgr32 | PixelFormat::Bgra32 | PixelFormat::Gray8 => {
            (0, 0)
        }
    }
}

/// Unpacks a tightly packed buffer into RGBA.
pub(crate) fn to_rgba(
    format: PixelFormat,
    size: Size,
    data: &[u8],
) -> Result<RgbaImage, CaptureError> {
    let expected = format.buffer_size(size);
    if data.len() < expected {
        return Err(CaptureError::ConversionFailed(format!(
            "{} {} frame holds {} of {} bytes",
            size,
            format,
            data.len(),
            expected
        )));
    }

    let mut out = RgbaImage::new(size.width, size.height);
    match format {
        PixelFormat::Bgr24 => {
            for (px, src) in out.pixels_mut().zip(data.chunks_exact(3)) {
                *px = Rgba([src[2], src[1], src[0], 255]);
            }
        }
        PixelFormat::Bgr32 => {
            for (px, src) in out.pixels_mut().zip(data.chunks_exact(4)) {
                *px = Rgba([src[2], src[1], src[0], 255]);
            }
        }
        PixelFormat::Bgra32 => {
            for (px, src) in out.pixels_mut().zip(data.chunks_exact(4)) {
                *px = Rgba([src[2], src[1], src[0], src[3]]);
            }
        }
        PixelFormat::Gray8 => {
            for (px, &g) in out.pixels_mut().zip(data) {
                *px = Rgba([g, g, g, 255]);
            }
        }
        PixelFormat::Nv12
        | PixelFormat::Yuv420p
        | PixelFormat::Yv12
        | PixelFormat::Yuv422p
        | PixelFormat::Yuyv422
        | PixelFormat::Uyvy422 => {
            let (sx, sy) = format.chroma_subsampling().unwrap_or((0, 0));
            for (x, y, px) in out.enumerate_pixels_mut() {
                let (x, y) = (x as usize, y as usize);
                let luma = data[luma_index(format, size, x, y)];
                let (u, v) = chroma_indices(format, size, x >> sx, y >> sy);
                let [r, g, b] = yuv_to_rgb(luma, data[u], data[v]);
                *px = Rgba([r, g, b, 255]);
            }
        }
    }
    Ok(out)
}

/// Packs `image` into `out`, which must be exactly `format.buffer_size`.
pub(crate) fn from_rgba(
    image: &RgbaImage,
    format: PixelFormat,
    out: &mut [u8],
) -> Result<(), CaptureError> {
    let size = Size::new(image.width(), image.height());
    let expected = format.buffer_size(size);
    if out.len() != expected {
        return Err(CaptureError::ConversionFailed(format!(
            "output buffer is {} bytes, {} {} needs {}",
            out.len(),
            size,
            format,
            expected
        )));
    }

    match format {
        PixelFormat::Bgr24 => {
            for (dst, px) in out.chunks_exact_mut(3).zip(image.pixels()) {
                dst.copy_from_slice(&[px[2], px[1], px[0]]);
            }
        }
        PixelFormat::Bgr32 => {
            for (dst, px) in out.chunks_exact_mut(4).zip(image.pixels()) {
                dst.copy_from_slice(&[px[2], px[1], px[0], 255]);
            }
        }
        PixelFormat::Bgra32 => {
            for (dst, px) in out.chunks_exact_mut(4).zip(image.pixels()) {
                dst.copy_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
        PixelFormat::Gray8 => {
            for (dst, px) in out.iter_mut().zip(image.pixels()) {
                *dst = gray(px[0], px[1], px[2]);
            }
        }
        PixelFormat::Nv12
        | PixelFormat::Yuv420p
        | PixelFormat::Yv12
        | PixelFormat::Yuv422p
        | PixelFormat::Yuyv422
        | PixelFormat::Uyvy422 => {
            for (x, y, px) in image.enumerate_pixels() {
                let [luma, _, _] = rgb_to_yuv(px[0], px[1], px[2]);
                out[luma_index(format, size, x as usize, y as usize)] = luma;
            }

            let (sx, sy) = format.chroma_subsampling().unwrap_or((0, 0));
            let (bw, bh) = (1u32 << sx, 1u32 << sy);
            for cy in 0..size.height.div_ceil(bh) {
                for cx in 0..size.width.div_ceil(bw) {
                    let mut sum = [0u32; 3];
                    let mut count = 0u32;
                    for y in cy * bh..((cy + 1) * bh).min(size.height) {
                        for x in cx * bw..((cx + 1) * bw).min(size.width) {
                            let px = image.get_pixel(x, y);
                            sum[0] += px[0] as u32;
                            sum[1] += px[1] as u32;
                            sum[2] += px[2] as u32;
                            count += 1;
                        }
                    }
                    let avg = |c: u32| ((c + count / 2) / count) as u8;
                    let [_, u, v] = rgb_to_yuv(avg(sum[0]), avg(sum[1]), avg(sum[2]));
                    let (ui, vi) = chroma_indices(format, size, cx as usize, cy as usize);
                    out[ui] = u;
                    out[vi] = v;
                }
            }
        }
    }
    Ok(())
}
