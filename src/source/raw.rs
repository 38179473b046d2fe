use super::{Decoder, Packet};
use crate::errors::CaptureError;
use crate::types::{Frame, MediaKind, PixelFormat, Size};

/// Decoder for uncompressed video: every packet is one tightly packed frame.
#[derive(Debug, Clone)]
pub struct RawVideoDecoder {
    stream_index: usize,
    format: PixelFormat,
    size: Size,
}

impl RawVideoDecoder {
    pub fn new(stream_index: usize, format: PixelFormat, size: Size) -> Self {
        Self {
            stream_index,
            format,
            size,
        }
    }
}

impl Decoder for RawVideoDecoder {
    fn name(&self) -> &str {
        "rawvideo"
    }

    fn media_kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn native_size(&self) -> Size {
        self.size
    }

    fn native_format(&self) -> PixelFormat {
        self.format
    }

    fn is_same_stream(&self, packet: &Packet) -> bool {
        packet.stream_index == self.stream_index
    }

    fn decode(&mut self, packet: &Packet) -> Result<Frame, CaptureError> {
        let expected = self.format.checked_buffer_size(self.size).ok_or_else(|| {
            CaptureError::DecodeFailed(format!("{} {} overflows memory", self.size, self.format))
        })?;
        if packet.data.len() != expected {
            return Err(CaptureError::DecodeFailed(format!(
                "{} packet holds {} bytes, {} {} needs {}",
                self.name(),
                packet.data.len(),
                self.size,
                self.format,
                expected
            )));
        }
        Ok(Frame::new(self.format, self.size, packet.data.to_vec()).with_pts(packet.pts))
    }
}
