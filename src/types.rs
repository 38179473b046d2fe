//! Core value types shared by the catalog, decoders, scalers and the session.

use crate::errors::CaptureError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// False for sizes too large to allocate a frame for. The bound is the
    /// usual codec limit: the area padded by 128 on each axis stays below
    /// `i32::MAX / 8`.
    pub fn fits_frame_limit(&self) -> bool {
        let w = u64::from(self.width) + 128;
        let h = u64::from(self.height) + 128;
        w.checked_mul(h).is_some_and(|area| area < MAX_FRAME_AREA)
    }
}

const MAX_FRAME_AREA: u64 = (i32::MAX / 8) as u64;

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = CaptureError;

    /// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| CaptureError::invalid_argument(format!("size should be WxH: {s}")))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| CaptureError::invalid_argument(format!("invalid width: {w}")))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| CaptureError::invalid_argument(format!("invalid height: {h}")))?;
        Ok(Self { width, height })
    }
}

/// Decoder-native pixel formats.
///
/// Packed RGB variants are named after their byte order in memory, so
/// `Bgr32` is `B, G, R, X` per pixel. All layouts are tightly packed
/// (1-byte row alignment) with chroma dimensions rounded up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 4:2:0, Y plane followed by interleaved UV.
    Nv12,
    /// 4:2:0 planar, Y then U then V.
    Yuv420p,
    /// 4:2:0 planar, Y then V then U.
    Yv12,
    /// 4:2:2 planar.
    Yuv422p,
    /// 4:2:2 packed, `Y0 U Y1 V`.
    Yuyv422,
    /// 4:2:2 packed, `U Y0 V Y1`.
    Uyvy422,
    Bgr24,
    /// `B G R X`, the fourth byte is padding.
    Bgr32,
    Bgra32,
    Gray8,
}

/// Position of one plane inside a contiguous frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub offset: usize,
    pub stride: usize,
    pub rows: usize,
}

impl PlaneLayout {
    /// `None` when the plane's end would overflow `usize`.
    fn checked(offset: usize, stride: usize, rows: usize) -> Option<Self> {
        stride.checked_mul(rows)?.checked_add(offset)?;
        Some(Self {
            offset,
            stride,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.stride * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn end(&self) -> usize {
        self.offset + self.len()
    }
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 10] = [
        PixelFormat::Nv12,
        PixelFormat::Yuv420p,
        PixelFormat::Yv12,
        PixelFormat::Yuv422p,
        PixelFormat::Yuyv422,
        PixelFormat::Uyvy422,
        PixelFormat::Bgr24,
        PixelFormat::Bgr32,
        PixelFormat::Bgra32,
        PixelFormat::Gray8,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Nv12 => "nv12",
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Yv12 => "yv12",
            PixelFormat::Yuv422p => "yuv422p",
            PixelFormat::Yuyv422 => "yuyv422",
            PixelFormat::Uyvy422 => "uyvy422",
            PixelFormat::Bgr24 => "bgr24",
            PixelFormat::Bgr32 => "bgr32",
            PixelFormat::Bgra32 => "bgra32",
            PixelFormat::Gray8 => "gray8",
        }
    }

    /// Horizontal and vertical chroma subsampling as log2 shifts, `None` for
    /// formats without chroma planes.
    pub fn chroma_subsampling(self) -> Option<(u32, u32)> {
        match self {
            PixelFormat::Nv12 | PixelFormat::Yuv420p | PixelFormat::Yv12 => Some((1, 1)),
            PixelFormat::Yuv422p | PixelFormat::Yuyv422 | PixelFormat::Uyvy422 => Some((1, 0)),
            PixelFormat::Bgr24 | PixelFormat::Bgr32 | PixelFormat::Bgra32 | PixelFormat::Gray8 => {
                None
            }
        }
    }

    pub fn is_yuv(self) -> bool {
        self.chroma_subsampling().is_some()
    }

    /// Plane layout in memory order for a frame of `size`, `None` when the
    /// layout does not fit in `usize`.
    pub fn checked_planes(self, size: Size) -> Option<Vec<PlaneLayout>> {
        let w = size.width as usize;
        let h = size.height as usize;
        let cw = w.div_ceil(2);
        let luma = PlaneLayout::checked(0, w, h)?;

        let planes = match self {
            PixelFormat::Nv12 => {
                let chroma = PlaneLayout::checked(luma.end(), cw.checked_mul(2)?, h.div_ceil(2))?;
                vec![luma, chroma]
            }
            PixelFormat::Yuv420p | PixelFormat::Yv12 | PixelFormat::Yuv422p => {
                let rows = if self == PixelFormat::Yuv422p {
                    h
                } else {
                    h.div_ceil(2)
                };
                let first = PlaneLayout::checked(luma.end(), cw, rows)?;
                let second = PlaneLayout::checked(first.end(), cw, rows)?;
                vec![luma, first, second]
            }
            PixelFormat::Yuyv422 | PixelFormat::Uyvy422 => {
                vec![PlaneLayout::checked(0, cw.checked_mul(4)?, h)?]
            }
            PixelFormat::Bgr24 => vec![PlaneLayout::checked(0, w.checked_mul(3)?, h)?],
            PixelFormat::Bgr32 | PixelFormat::Bgra32 => {
                vec![PlaneLayout::checked(0, w.checked_mul(4)?, h)?]
            }
            PixelFormat::Gray8 => vec![luma],
        };
        Some(planes)
    }

    /// Plane layout in memory order, empty when the layout overflows.
    pub fn planes(self, size: Size) -> Vec<PlaneLayout> {
        self.checked_planes(size).unwrap_or_default()
    }

    /// Bytes needed to hold one tightly packed frame of `size`, `None` on
    /// overflow.
    pub fn checked_buffer_size(self, size: Size) -> Option<usize> {
        Some(self.checked_planes(size)?.last().map(PlaneLayout::end).unwrap_or(0))
    }

    /// Like [`PixelFormat::checked_buffer_size`], with overflow reported as 0.
    pub fn buffer_size(self, size: Size) -> usize {
        self.checked_buffer_size(size).unwrap_or(0)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CaptureError::UnsupportedFormat(s.to_string()))
    }
}

/// What a decoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
}

/// Where a source comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Device,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Device => "device",
        }
    }
}

/// One enumerated source. Only meaningful for the enumeration pass that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    /// Full name: the file path, or the device's reported name.
    pub name: String,
    pub kind: SourceKind,
    /// Backend handle: the file path, or the device index.
    pub locator: String,
}

impl SourceDescriptor {
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.clone(),
            kind: SourceKind::File,
            locator: path,
        }
    }

    pub fn device(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Device,
            locator: locator.into(),
        }
    }
}

/// A decoded picture: all planes packed into one contiguous buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub format: PixelFormat,
    pub size: Size,
    pub data: Vec<u8>,
    pub pts: Option<i64>,
}

impl Frame {
    pub fn new(format: PixelFormat, size: Size, data: Vec<u8>) -> Self {
        Self {
            format,
            size,
            data,
            pts: None,
        }
    }

    pub fn with_pts(mut self, pts: Option<i64>) -> Self {
        self.pts = pts;
        self
    }

    /// Bytes the layout requires, which may be less than `data.len()`.
    pub fn expected_len(&self) -> usize {
        self.format.buffer_size(self.size)
    }

    pub fn is_complete(&self) -> bool {
        self.data.len() >= self.expected_len()
    }

    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        let layout = *self.format.planes(self.size).get(index)?;
        self.data.get(layout.offset..layout.end())
    }
}

/// A scaler output buffer, reused across reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub format: PixelFormat,
    pub size: Size,
    pub data: Vec<u8>,
}

impl Image {
    /// Allocates a zeroed buffer sized for `format` at `size`. Fails instead
    /// of aborting when the buffer can't be sized or allocated.
    pub fn try_new(format: PixelFormat, size: Size) -> Result<Self, CaptureError> {
        let len = format.checked_buffer_size(size).ok_or_else(|| {
            CaptureError::invalid_argument(format!("{size} {format} frame overflows memory"))
        })?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            CaptureError::invalid_argument(format!(
                "cannot allocate {len} bytes for {size} {format}: {e}"
            ))
        })?;
        data.resize(len, 0);
        Ok(Self { format, size, data })
    }

    pub fn buffer_size(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sizes() {
        let size = Size::new(640, 480);
        assert_eq!(PixelFormat::Nv12.buffer_size(size), 640 * 480 * 3 / 2);
        assert_eq!(PixelFormat::Yuv420p.buffer_size(size), 640 * 480 * 3 / 2);
        assert_eq!(PixelFormat::Yuv422p.buffer_size(size), 640 * 480 * 2);
        assert_eq!(PixelFormat::Yuyv422.buffer_size(size), 640 * 480 * 2);
        assert_eq!(PixelFormat::Bgr24.buffer_size(size), 640 * 480 * 3);
        assert_eq!(PixelFormat::Bgr32.buffer_size(size), 640 * 480 * 4);
        assert_eq!(PixelFormat::Gray8.buffer_size(size), 640 * 480);
    }

    #[test]
    fn test_odd_dimensions_round_chroma_up() {
        let size = Size::new(3, 3);
        // 9 luma + 2x2 U + 2x2 V
        assert_eq!(PixelFormat::Yuv420p.buffer_size(size), 9 + 4 + 4);
        // 2 macropixels of 4 bytes per row
        assert_eq!(PixelFormat::Uyvy422.buffer_size(size), 8 * 3);
    }

    #[test]
    fn test_planes_are_contiguous() {
        for format in PixelFormat::ALL {
            let planes = format.planes(Size::new(17, 9));
            let mut offset = 0;
            for plane in planes {
                assert_eq!(plane.offset, offset, "{format}");
                offset = plane.end();
            }
        }
    }

    #[test]
    fn test_huge_sizes_do_not_overflow() {
        let size = Size::new(u32::MAX, u32::MAX);
        assert!(!size.fits_frame_limit());
        assert!(Size::new(1920, 1080).fits_frame_limit());
        assert!(Size::new(8192, 8192).fits_frame_limit());
        assert!(!Size::new(16384, 16384).fits_frame_limit());

        if usize::BITS == 64 {
            assert!(PixelFormat::Gray8.checked_buffer_size(size).is_some());
            assert_eq!(PixelFormat::Bgr32.checked_buffer_size(size), None);
            assert_eq!(PixelFormat::Bgr32.buffer_size(size), 0);
            assert!(PixelFormat::Bgr32.planes(size).is_empty());
        }
    }

    #[test]
    fn test_image_try_new() {
        let image = Image::try_new(PixelFormat::Bgr24, Size::new(4, 2)).unwrap();
        assert_eq!(image.buffer_size(), 24);
        assert!(image.as_bytes().iter().all(|&b| b == 0));

        let result = Image::try_new(PixelFormat::Bgr32, Size::new(u32::MAX, u32::MAX));
        assert!(matches!(result, Err(CaptureError::InvalidArgument(_))));
    }

    #[test]
    fn test_size_parse() {
        assert_eq!("1280x720".parse::<Size>().unwrap(), Size::new(1280, 720));
        assert!("1280".parse::<Size>().is_err());
        assert!("ax720".parse::<Size>().is_err());
    }

    #[test]
    fn test_frame_plane_access() {
        let size = Size::new(4, 2);
        let data: Vec<u8> = (0..PixelFormat::Yuv420p.buffer_size(size) as u8).collect();
        let frame = Frame::new(PixelFormat::Yuv420p, size, data);
        assert_eq!(frame.plane(0).unwrap().len(), 8);
        assert_eq!(frame.plane(1).unwrap(), &[8, 9]);
        assert_eq!(frame.plane(2).unwrap(), &[10, 11]);
        assert!(frame.plane(3).is_none());
    }

    #[test]
    fn test_pixel_format_from_str() {
        assert_eq!("NV12".parse::<PixelFormat>().unwrap(), PixelFormat::Nv12);
        assert!("h264".parse::<PixelFormat>().is_err());
    }
}
