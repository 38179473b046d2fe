//! Synthetic pictures and YUV4MPEG2 files
//!
//! Frames are a moving gradient so that scaled output differs between
//! frames and between pixels.

use crate::errors::CaptureError;
use crate::scaler::convert;
use crate::source::Y4mHeader;
use crate::types::{Frame, PixelFormat, Size};
use image::{Rgba, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Gradient picture that shifts with `frame_number`.
pub fn synthetic_rgba(frame_number: u64, size: Size) -> RgbaImage {
    let base = (frame_number % 256) as u8;
    RgbaImage::from_fn(size.width, size.height, |x, y| {
        Rgba([
            base.wrapping_add((x % 256) as u8),
            base.wrapping_add((y % 256) as u8),
            base.wrapping_add(((x + y) % 256) as u8),
            255,
        ])
    })
}

/// Tightly packed bytes of the gradient in `format`.
pub fn synthetic_frame_bytes(
    format: PixelFormat,
    size: Size,
    frame_number: u64,
) -> Result<Vec<u8>, CaptureError> {
    let mut data = vec![0u8; format.buffer_size(size)];
    convert::from_rgba(&synthetic_rgba(frame_number, size), format, &mut data)?;
    Ok(data)
}

pub fn synthetic_video_frame(
    format: PixelFormat,
    size: Size,
    frame_number: u64,
) -> Result<Frame, CaptureError> {
    let data = synthetic_frame_bytes(format, size, frame_number)?;
    Ok(Frame::new(format, size, data).with_pts(Some(frame_number as i64)))
}

fn colorspace_tag(format: PixelFormat) -> Option<&'static str> {
    match format {
        PixelFormat::Yuv420p => Some("420jpeg"),
        PixelFormat::Yuv422p => Some("422"),
        PixelFormat::Gray8 => Some("mono"),
        _ => None,
    }
}

/// Writes `frames` gradient frames to a YUV4MPEG2 file.
///
/// Only the layouts a Y4M reader maps back (`Yuv420p`, `Yuv422p`, `Gray8`)
/// can be written.
pub fn write_y4m(
    path: impl AsRef<Path>,
    format: PixelFormat,
    size: Size,
    frames: u64,
) -> Result<(), CaptureError> {
    let colorspace = colorspace_tag(format).ok_or_else(|| {
        CaptureError::invalid_argument(format!("{format} cannot be stored in a Y4M file"))
    })?;

    let mut out = BufWriter::new(File::create(path.as_ref())?);
    out.write_all(Y4mHeader::new(size, colorspace).to_line().as_bytes())?;
    for n in 0..frames {
        out.write_all(b"FRAME\n")?;
        out.write_all(&synthetic_frame_bytes(format, size, n)?)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_differ_over_time() {
        let size = Size::new(16, 8);
        let a = synthetic_frame_bytes(PixelFormat::Bgr24, size, 0).unwrap();
        let b = synthetic_frame_bytes(PixelFormat::Bgr24, size, 1).unwrap();
        assert_eq!(a.len(), 16 * 8 * 3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_frame_is_complete() {
        let frame = synthetic_video_frame(PixelFormat::Nv12, Size::new(5, 3), 7).unwrap();
        assert!(frame.is_complete());
        assert_eq!(frame.pts, Some(7));
    }

    #[test]
    fn test_y4m_rejects_packed_formats() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_y4m(dir.path().join("x.y4m"), PixelFormat::Bgr32, Size::new(2, 2), 1);
        assert!(matches!(result, Err(CaptureError::InvalidArgument(_))));
    }

    #[test]
    fn test_y4m_file_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.y4m");
        let size = Size::new(4, 2);
        write_y4m(&path, PixelFormat::Yuv420p, size, 3).unwrap();

        let header = Y4mHeader::new(size, "420jpeg").to_line();
        let expected = header.len() + 3 * (6 + PixelFormat::Yuv420p.buffer_size(size));
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, expected);
    }
}
