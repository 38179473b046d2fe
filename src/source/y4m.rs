//! YUV4MPEG2 file reader.
//!
//! The stream is a text header line followed by `FRAME` records, each a
//! parameter line and one raw picture. There is exactly one stream, index 0.

use super::{Decoder, MediaSource, OpenMode, Packet, RawVideoDecoder};
use crate::errors::CaptureError;
use crate::types::{PixelFormat, Size};
use bytes::Bytes;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

const SIGNATURE: &str = "YUV4MPEG2";
const FRAME_TAG: &[u8] = b"FRAME";
const MAX_LINE: usize = 4096;

/// Parsed stream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Y4mHeader {
    pub size: Size,
    /// `C` tag, `420jpeg` when absent.
    pub colorspace: String,
    pub frame_rate: Option<(u32, u32)>,
}

impl Y4mHeader {
    pub fn new(size: Size, colorspace: impl Into<String>) -> Self {
        Self {
            size,
            colorspace: colorspace.into(),
            frame_rate: None,
        }
    }

    pub fn parse(line: &str) -> Result<Self, CaptureError> {
        let mut tokens = line.split_ascii_whitespace();
        if tokens.next() != Some(SIGNATURE) {
            return Err(CaptureError::OpenFailed(
                "missing YUV4MPEG2 signature".to_string(),
            ));
        }

        let mut width = None;
        let mut height = None;
        let mut colorspace = "420jpeg".to_string();
        let mut frame_rate = None;

        for token in tokens {
            let mut chars = token.chars();
            let tag = chars.next();
            let value = chars.as_str();
            match tag {
                Some('W') => width = value.parse::<u32>().ok(),
                Some('H') => height = value.parse::<u32>().ok(),
                Some('C') => colorspace = value.to_string(),
                Some('F') => {
                    frame_rate = value
                        .split_once(':')
                        .and_then(|(n, d)| Some((n.parse().ok()?, d.parse().ok()?)));
                }
                // Interlacing, aspect ratio and X extensions don't affect layout.
                _ => {}
            }
        }

        match (width, height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => Ok(Self {
                size: Size::new(width, height),
                colorspace,
                frame_rate,
            }),
            _ => Err(CaptureError::OpenFailed(format!(
                "header has no valid frame size: {line}"
            ))),
        }
    }

    /// Pixel format for the colorspace, `None` for layouts we can't decode.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        match self.colorspace.as_str() {
            "420" | "420jpeg" | "420paldv" | "420mpeg2" => Some(PixelFormat::Yuv420p),
            "422" => Some(PixelFormat::Yuv422p),
            "mono" => Some(PixelFormat::Gray8),
            _ => None,
        }
    }

    pub fn to_line(&self) -> String {
        let (num, den) = self.frame_rate.unwrap_or((30, 1));
        format!(
            "{SIGNATURE} W{} H{} F{num}:{den} Ip A1:1 C{}\n",
            self.size.width, self.size.height, self.colorspace
        )
    }
}

pub struct Y4mSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    header: Option<Y4mHeader>,
    frame_len: usize,
    next_pts: i64,
}

impl Y4mSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            header: None,
            frame_len: 0,
            next_pts: 0,
        }
    }

    pub fn header(&self) -> Option<&Y4mHeader> {
        self.header.as_ref()
    }

    fn read_line(reader: &mut BufReader<File>) -> Result<Vec<u8>, CaptureError> {
        let mut line = Vec::new();
        reader
            .by_ref()
            .take(MAX_LINE as u64)
            .read_until(b'\n', &mut line)?;
        if !line.is_empty() && line.last() != Some(&b'\n') && line.len() >= MAX_LINE {
            return Err(CaptureError::DecodeFailed(
                "y4m line exceeds maximum length".to_string(),
            ));
        }
        Ok(line)
    }
}

impl MediaSource for Y4mSource {
    fn open(&mut self, _mode: OpenMode) -> Result<(), CaptureError> {
        let file = File::open(&self.path).map_err(|e| {
            CaptureError::OpenFailed(format!("{}: {}", self.path.display(), e))
        })?;
        let mut reader = BufReader::new(file);
        let line = Self::read_line(&mut reader)?;
        let header = Y4mHeader::parse(String::from_utf8_lossy(&line).trim_end())?;

        if !header.size.fits_frame_limit() {
            return Err(CaptureError::OpenFailed(format!(
                "{}: frame size {} is too large",
                self.path.display(),
                header.size
            )));
        }

        self.frame_len = match header.pixel_format() {
            Some(format) => format.checked_buffer_size(header.size).ok_or_else(|| {
                CaptureError::OpenFailed(format!(
                    "{}: {} {} overflows memory",
                    self.path.display(),
                    header.size,
                    format
                ))
            })?,
            None => 0,
        };
        log::debug!(
            "Opened {} ({} C{})",
            self.path.display(),
            header.size,
            header.colorspace
        );
        self.header = Some(header);
        self.reader = Some(reader);
        self.next_pts = 0;
        Ok(())
    }

    fn decoders(&mut self) -> Vec<Box<dyn Decoder>> {
        let Some(header) = &self.header else {
            return Vec::new();
        };
        match header.pixel_format() {
            Some(format) => vec![Box::new(RawVideoDecoder::new(0, format, header.size))],
            None => {
                log::warn!(
                    "{}: unsupported y4m colorspace {}",
                    self.path.display(),
                    header.colorspace
                );
                Vec::new()
            }
        }
    }

    fn read(&mut self) -> Result<Option<Packet>, CaptureError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        if self.frame_len == 0 {
            return Ok(None);
        }

        let line = Self::read_line(reader)?;
        if line.is_empty() {
            return Ok(None);
        }
        if !line.starts_with(FRAME_TAG) {
            return Err(CaptureError::DecodeFailed(format!(
                "expected FRAME marker in {}",
                self.path.display()
            )));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(self.frame_len).map_err(|e| {
            CaptureError::DecodeFailed(format!(
                "cannot buffer {} byte frame: {}",
                self.frame_len, e
            ))
        })?;
        data.resize(self.frame_len, 0);
        match reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                log::warn!("{}: truncated final frame", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let pts = self.next_pts;
        self.next_pts += 1;
        Ok(Some(Packet::new(0, Bytes::from(data)).with_pts(pts)))
    }

    fn close(&mut self) {
        self.reader = None;
        self.header = None;
        self.frame_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_header_parse() {
        let header = Y4mHeader::parse("YUV4MPEG2 W320 H240 F25:1 Ip A1:1 C422").unwrap();
        assert_eq!(header.size, Size::new(320, 240));
        assert_eq!(header.frame_rate, Some((25, 1)));
        assert_eq!(header.pixel_format(), Some(PixelFormat::Yuv422p));
    }

    #[test]
    fn test_header_defaults_to_420() {
        let header = Y4mHeader::parse("YUV4MPEG2 W2 H2").unwrap();
        assert_eq!(header.pixel_format(), Some(PixelFormat::Yuv420p));
    }

    #[test]
    fn test_header_rejects_missing_size() {
        assert!(Y4mHeader::parse("YUV4MPEG2 W320").is_err());
        assert!(Y4mHeader::parse("RIFF W2 H2").is_err());
    }

    #[test]
    fn test_reads_frames_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = Y4mHeader::new(Size::new(2, 2), "mono").to_line().into_bytes();
        bytes.extend_from_slice(b"FRAME\n");
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        bytes.extend_from_slice(b"FRAME Ixyz\n");
        bytes.extend_from_slice(&[5, 6, 7, 8]);
        let path = write_file(dir.path(), "clip.y4m", &bytes);

        let mut source = Y4mSource::new(&path);
        source.open(OpenMode::ReadOnly).unwrap();
        assert_eq!(source.decoders().len(), 1);

        let first = source.read().unwrap().unwrap();
        assert_eq!(&first.data[..], &[1, 2, 3, 4]);
        assert_eq!(first.pts, Some(0));
        let second = source.read().unwrap().unwrap();
        assert_eq!(&second.data[..], &[5, 6, 7, 8]);
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_truncated_frame_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = Y4mHeader::new(Size::new(2, 2), "mono").to_line().into_bytes();
        bytes.extend_from_slice(b"FRAME\n");
        bytes.extend_from_slice(&[1, 2]);
        let path = write_file(dir.path(), "short.y4m", &bytes);

        let mut source = Y4mSource::new(&path);
        source.open(OpenMode::ReadOnly).unwrap();
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_unknown_colorspace_has_no_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = Y4mHeader::new(Size::new(2, 2), "444alpha").to_line().into_bytes();
        let path = write_file(dir.path(), "alpha.y4m", &bytes);

        let mut source = Y4mSource::new(&path);
        source.open(OpenMode::ReadOnly).unwrap();
        assert!(source.decoders().is_empty());
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_oversized_header_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"YUV4MPEG2 W4294967295 H4294967295 Cmono\n".to_vec();
        bytes.extend_from_slice(b"FRAME\n");
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let path = write_file(dir.path(), "huge.y4m", &bytes);

        let mut source = Y4mSource::new(&path);
        let result = source.open(OpenMode::ReadOnly);
        assert!(matches!(result, Err(CaptureError::OpenFailed(_))));
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_open_missing_file() {
        let mut source = Y4mSource::new("/definitely/not/here.y4m");
        let result = source.open(OpenMode::ReadOnly);
        assert!(matches!(result, Err(CaptureError::OpenFailed(_))));
    }
}
