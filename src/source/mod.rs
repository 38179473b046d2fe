//! Source readers and decoders.
//!
//! A [`MediaSource`] yields coded packets; each of its [`Decoder`]s turns the
//! packets of one stream into [`Frame`]s.

pub mod mjpeg;
pub mod raw;
pub mod y4m;

#[cfg(feature = "device")]
pub mod device;

pub use mjpeg::MjpegDecoder;
pub use raw::RawVideoDecoder;
pub use y4m::{Y4mHeader, Y4mSource};

#[cfg(feature = "device")]
pub use device::DeviceSource;

use crate::errors::CaptureError;
use crate::types::{Frame, MediaKind, PixelFormat, Size};
use bytes::Bytes;

/// One coded unit read from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub stream_index: usize,
    pub data: Bytes,
    pub pts: Option<i64>,
}

impl Packet {
    pub fn new(stream_index: usize, data: impl Into<Bytes>) -> Self {
        Self {
            stream_index,
            data: data.into(),
            pts: None,
        }
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
}

/// A file or device producing packets.
pub trait MediaSource: Send {
    fn open(&mut self, mode: OpenMode) -> Result<(), CaptureError>;

    /// Hands out one decoder per stream. Ownership moves to the caller, which
    /// keeps the one it binds and drops the rest.
    fn decoders(&mut self) -> Vec<Box<dyn Decoder>>;

    /// Next packet, or `None` once the source has no more data.
    ///
    /// May block on device or file I/O.
    fn read(&mut self) -> Result<Option<Packet>, CaptureError>;

    fn close(&mut self);
}

/// Turns the packets of one stream into frames.
pub trait Decoder: Send {
    fn name(&self) -> &str;

    fn media_kind(&self) -> MediaKind;

    fn native_size(&self) -> Size;

    fn native_format(&self) -> PixelFormat;

    fn is_same_stream(&self, packet: &Packet) -> bool;

    fn decode(&mut self, packet: &Packet) -> Result<Frame, CaptureError>;
}
