//! Platform pixel-format identifiers and their decoder-native counterparts.
//!
//! Callers name formats with Windows media-subtype GUIDs. The table below is
//! the only place that decides which of them a session can negotiate.

use crate::errors::CaptureError;
use crate::types::PixelFormat;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Windows-layout GUID, ABI compatible with the C `GUID` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

const FOURCC_TAIL: [u8; 8] = [0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71];

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// The `XXXXXXXX-0000-0010-8000-00AA00389B71` subtype for a FourCC.
    pub const fn from_fourcc(fourcc: u32) -> Self {
        Self::new(fourcc, 0x0000, 0x0010, FOURCC_TAIL)
    }

    /// The FourCC characters, if this is a FourCC-derived subtype.
    pub fn fourcc(&self) -> Option<[u8; 4]> {
        if self.data2 == 0x0000 && self.data3 == 0x0010 && self.data4 == FOURCC_TAIL {
            Some(self.data1.to_le_bytes())
        } else {
            None
        }
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl FromStr for Guid {
    type Err = CaptureError;

    /// Parses `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, braces optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CaptureError::invalid_argument(format!("malformed GUID: {s}"));
        let trimmed = s.trim().trim_start_matches('{').trim_end_matches('}');
        let parts: Vec<&str> = trimmed.split('-').collect();
        let lengths = [8, 4, 4, 4, 12];
        if parts.len() != lengths.len()
            || parts
                .iter()
                .zip(lengths)
                .any(|(part, len)| part.len() != len || !part.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(invalid());
        }

        let data1 = u32::from_str_radix(parts[0], 16).map_err(|_| invalid())?;
        let data2 = u16::from_str_radix(parts[1], 16).map_err(|_| invalid())?;
        let data3 = u16::from_str_radix(parts[2], 16).map_err(|_| invalid())?;
        let tail = format!("{}{}", parts[3], parts[4]);
        let mut data4 = [0u8; 8];
        for (i, byte) in data4.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&tail[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self::new(data1, data2, data3, data4))
    }
}

pub const MEDIASUBTYPE_NV12: Guid = Guid::from_fourcc(0x3231_564E);
pub const MEDIASUBTYPE_IYUV: Guid = Guid::from_fourcc(0x5655_5949);
pub const MEDIASUBTYPE_I420: Guid = Guid::from_fourcc(0x3032_3449);
pub const MEDIASUBTYPE_422P: Guid = Guid::from_fourcc(0x5032_3234);
pub const MEDIASUBTYPE_VYUY: Guid = Guid::from_fourcc(0x5955_5956);
pub const MEDIASUBTYPE_UYVY: Guid = Guid::from_fourcc(0x5956_5955);
pub const MEDIASUBTYPE_YV12: Guid = Guid::from_fourcc(0x3231_5659);
pub const MEDIASUBTYPE_YUY2: Guid = Guid::from_fourcc(0x3259_5559);
pub const MEDIASUBTYPE_RGB24: Guid = Guid::new(
    0xE436_EB7D,
    0x524F,
    0x11CE,
    [0x9F, 0x53, 0x00, 0x20, 0xAF, 0x0B, 0xA7, 0x70],
);
pub const MEDIASUBTYPE_RGB32: Guid = Guid::new(
    0xE436_EB7E,
    0x524F,
    0x11CE,
    [0x9F, 0x53, 0x00, 0x20, 0xAF, 0x0B, 0xA7, 0x70],
);
pub const MEDIASUBTYPE_ARGB32: Guid = Guid::new(
    0x773C_9AC0,
    0x3274,
    0x11D0,
    [0xB7, 0x24, 0x00, 0xAA, 0x00, 0x6C, 0x1A, 0x01],
);

/// One row of the negotiation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormatMapping {
    pub platform: Guid,
    pub decoder: PixelFormat,
    pub label: &'static str,
}

const fn mapping(platform: Guid, decoder: PixelFormat, label: &'static str) -> PixelFormatMapping {
    PixelFormatMapping {
        platform,
        decoder,
        label,
    }
}

// Several subtypes intentionally share a decoder format.
static SUPPORTED_PIXEL_FORMATS: [PixelFormatMapping; 11] = [
    mapping(MEDIASUBTYPE_NV12, PixelFormat::Nv12, "NV12"),
    mapping(MEDIASUBTYPE_IYUV, PixelFormat::Yuv420p, "I420"),
    mapping(MEDIASUBTYPE_I420, PixelFormat::Yuv420p, "I420"),
    mapping(MEDIASUBTYPE_RGB32, PixelFormat::Bgr32, "RGB32"),
    mapping(MEDIASUBTYPE_ARGB32, PixelFormat::Bgra32, "ARGB32"),
    mapping(MEDIASUBTYPE_RGB24, PixelFormat::Bgr24, "RGB24"),
    mapping(MEDIASUBTYPE_422P, PixelFormat::Yuv422p, "422P"),
    mapping(MEDIASUBTYPE_VYUY, PixelFormat::Yuyv422, "YUY2"),
    mapping(MEDIASUBTYPE_UYVY, PixelFormat::Uyvy422, "UYVY"),
    mapping(MEDIASUBTYPE_YV12, PixelFormat::Yv12, "YV12"),
    mapping(MEDIASUBTYPE_YUY2, PixelFormat::Yuyv422, "YUY2"),
];

/// The platform format has no decoder mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("platform format {0} is not supported")]
pub struct NotSupported(pub Guid);

impl From<NotSupported> for CaptureError {
    fn from(error: NotSupported) -> Self {
        CaptureError::UnsupportedFormat(error.0.to_string())
    }
}

/// All table rows, in lookup order.
pub fn entries() -> &'static [PixelFormatMapping] {
    &SUPPORTED_PIXEL_FORMATS
}

pub fn lookup(platform: &Guid) -> Option<&'static PixelFormatMapping> {
    SUPPORTED_PIXEL_FORMATS
        .iter()
        .find(|entry| entry.platform == *platform)
}

/// Maps a platform subtype to the decoder format it negotiates to.
pub fn lookup_decoder_format(platform: &Guid) -> Result<PixelFormat, NotSupported> {
    lookup(platform)
        .map(|entry| entry.decoder)
        .ok_or(NotSupported(*platform))
}

/// First platform subtype that maps to `format`.
pub fn lookup_platform_format(format: PixelFormat) -> Option<Guid> {
    SUPPORTED_PIXEL_FORMATS
        .iter()
        .find(|entry| entry.decoder == format)
        .map(|entry| entry.platform)
}

/// First row whose label matches, ignoring case.
pub fn lookup_by_label(label: &str) -> Option<&'static PixelFormatMapping> {
    SUPPORTED_PIXEL_FORMATS
        .iter()
        .find(|entry| entry.label.eq_ignore_ascii_case(label))
}

pub fn label_for(platform: &Guid) -> Option<&'static str> {
    lookup(platform).map(|entry| entry.label)
}

pub fn is_supported(platform: &Guid) -> bool {
    lookup(platform).is_some()
}

/// Resolves a user-supplied format: a table label (`NV12`) or a GUID string.
pub fn parse_platform_format(s: &str) -> Result<Guid, CaptureError> {
    if let Some(entry) = lookup_by_label(s) {
        return Ok(entry.platform);
    }
    s.parse()
}
