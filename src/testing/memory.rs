//! In-memory catalog with scripted packet streams
//!
//! Every source and decoder it hands out is tracked, so tests can check that
//! a session releases everything it acquired and in which order.

use super::synthetic_data::synthetic_frame_bytes;
use crate::catalog::SourceCatalog;
use crate::errors::CaptureError;
use crate::source::{Decoder, MediaSource, OpenMode, Packet, RawVideoDecoder};
use crate::types::{Frame, MediaKind, PixelFormat, Size, SourceDescriptor, SourceKind};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One stream of a scripted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub index: usize,
    pub kind: MediaKind,
    pub format: PixelFormat,
    pub size: Size,
}

impl StreamSpec {
    pub fn video(index: usize, format: PixelFormat, size: Size) -> Self {
        Self {
            index,
            kind: MediaKind::Video,
            format,
            size,
        }
    }

    pub fn audio(index: usize) -> Self {
        Self {
            index,
            kind: MediaKind::Audio,
            format: PixelFormat::Gray8,
            size: Size::new(1, 1),
        }
    }
}

/// Streams and the packets a source will yield, in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    pub streams: Vec<StreamSpec>,
    pub packets: Vec<Packet>,
    pub fail_open: bool,
}

impl ScriptedSource {
    /// A single video stream at index 0.
    pub fn video(format: PixelFormat, size: Size) -> Self {
        Self {
            streams: vec![StreamSpec::video(0, format, size)],
            ..Self::default()
        }
    }

    pub fn with_stream(mut self, stream: StreamSpec) -> Self {
        self.streams.push(stream);
        self
    }

    /// Appends `count` gradient frames for stream `index`.
    pub fn with_frames(mut self, index: usize, count: u64) -> Result<Self, CaptureError> {
        let stream = self
            .streams
            .iter()
            .find(|s| s.index == index)
            .copied()
            .ok_or_else(|| CaptureError::not_found("stream", index.to_string()))?;
        let start = self.packets.len() as u64;
        for n in start..start + count {
            let data = synthetic_frame_bytes(stream.format, stream.size, n)?;
            self.packets
                .push(Packet::new(index, data).with_pts(n as i64));
        }
        Ok(self)
    }

    pub fn with_packet(mut self, packet: Packet) -> Self {
        self.packets.push(packet);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

#[derive(Default)]
struct Shared {
    sources: Mutex<Vec<(String, ScriptedSource)>>,
    events: Mutex<Vec<String>>,
    live_sources: AtomicUsize,
    live_decoders: AtomicUsize,
    opens: AtomicUsize,
    close_calls: AtomicUsize,
}

impl Shared {
    fn record(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// A [`SourceCatalog`] over scripted sources. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    shared: Arc<Shared>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: impl Into<String>, source: ScriptedSource) {
        if let Ok(mut sources) = self.shared.sources.lock() {
            sources.push((name.into(), source));
        }
    }

    /// Adds a single-stream video source with `frames` gradient frames.
    pub fn add_video(&self, name: impl Into<String>, format: PixelFormat, size: Size, frames: u64) {
        let script = ScriptedSource::video(format, size);
        let script = match script.clone().with_frames(0, frames) {
            Ok(script) => script,
            Err(e) => {
                log::warn!("Could not script frames: {}", e);
                script
            }
        };
        self.add(name, script);
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut sources) = self.shared.sources.lock() {
            sources.retain(|(n, _)| n != name);
        }
    }

    /// Sources currently open and not yet closed.
    pub fn live_sources(&self) -> usize {
        self.shared.live_sources.load(Ordering::SeqCst)
    }

    /// Decoders handed out and not yet dropped.
    pub fn live_decoders(&self) -> usize {
        self.shared.live_decoders.load(Ordering::SeqCst)
    }

    /// Successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// `MediaSource::close` calls so far, including ones on never-opened
    /// sources.
    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    /// `open`, `decoder dropped` and `close` events in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.shared
            .events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl SourceCatalog for MemoryCatalog {
    fn kind(&self) -> SourceKind {
        SourceKind::Device
    }

    fn enumerate(&self) -> Result<Vec<SourceDescriptor>, CaptureError> {
        let sources = self
            .shared
            .sources
            .lock()
            .map_err(|_| CaptureError::Backend("memory catalog poisoned".to_string()))?;
        Ok(sources
            .iter()
            .enumerate()
            .map(|(i, (name, _))| SourceDescriptor::device(name.clone(), i.to_string()))
            .collect())
    }

    fn open_source(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<Box<dyn MediaSource>, CaptureError> {
        let sources = self
            .shared
            .sources
            .lock()
            .map_err(|_| CaptureError::Backend("memory catalog poisoned".to_string()))?;
        let script = sources
            .iter()
            .find(|(name, _)| *name == descriptor.name)
            .map(|(_, script)| script.clone())
            .ok_or_else(|| CaptureError::not_found("source", descriptor.name.clone()))?;
        Ok(Box::new(MemorySource {
            name: descriptor.name.clone(),
            script,
            pending: VecDeque::new(),
            opened: false,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemorySource {
    name: String,
    script: ScriptedSource,
    pending: VecDeque<Packet>,
    opened: bool,
    shared: Arc<Shared>,
}

impl MediaSource for MemorySource {
    fn open(&mut self, _mode: OpenMode) -> Result<(), CaptureError> {
        if self.script.fail_open {
            return Err(CaptureError::OpenFailed(self.name.clone()));
        }
        self.pending = self.script.packets.iter().cloned().collect();
        self.opened = true;
        self.shared.live_sources.fetch_add(1, Ordering::SeqCst);
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.shared.record(format!("open {}", self.name));
        Ok(())
    }

    fn decoders(&mut self) -> Vec<Box<dyn Decoder>> {
        self.script
            .streams
            .iter()
            .map(|spec| {
                self.shared.live_decoders.fetch_add(1, Ordering::SeqCst);
                Box::new(MemoryDecoder {
                    spec: *spec,
                    raw: RawVideoDecoder::new(spec.index, spec.format, spec.size),
                    owner: self.name.clone(),
                    shared: Arc::clone(&self.shared),
                }) as Box<dyn Decoder>
            })
            .collect()
    }

    fn read(&mut self) -> Result<Option<Packet>, CaptureError> {
        if !self.opened {
            return Err(CaptureError::NotOpened);
        }
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        self.release();
    }
}

impl MemorySource {
    fn release(&mut self) {
        if !self.opened {
            return;
        }
        self.opened = false;
        self.pending.clear();
        self.shared.live_sources.fetch_sub(1, Ordering::SeqCst);
        self.shared.record(format!("close {}", self.name));
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.release();
    }
}

struct MemoryDecoder {
    spec: StreamSpec,
    raw: RawVideoDecoder,
    owner: String,
    shared: Arc<Shared>,
}

impl Decoder for MemoryDecoder {
    fn name(&self) -> &str {
        match self.spec.kind {
            MediaKind::Video => self.raw.name(),
            _ => "scripted",
        }
    }

    fn media_kind(&self) -> MediaKind {
        self.spec.kind
    }

    fn native_size(&self) -> Size {
        self.spec.size
    }

    fn native_format(&self) -> PixelFormat {
        self.spec.format
    }

    fn is_same_stream(&self, packet: &Packet) -> bool {
        self.raw.is_same_stream(packet)
    }

    fn decode(&mut self, packet: &Packet) -> Result<Frame, CaptureError> {
        match self.spec.kind {
            MediaKind::Video => self.raw.decode(packet),
            kind => Err(CaptureError::DecodeFailed(format!(
                "{kind:?} stream {} has no pictures",
                self.spec.index
            ))),
        }
    }
}

impl Drop for MemoryDecoder {
    fn drop(&mut self) {
        self.shared.live_decoders.fetch_sub(1, Ordering::SeqCst);
        self.shared.record(format!(
            "drop decoder {}:{}",
            self.owner, self.spec.index
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_packets_in_order() {
        let catalog = MemoryCatalog::new();
        catalog.add_video("cam", PixelFormat::Gray8, Size::new(2, 2), 2);

        let descriptor = catalog.describe(0).unwrap();
        let mut source = catalog.open_source(&descriptor).unwrap();
        source.open(OpenMode::ReadOnly).unwrap();
        assert_eq!(catalog.live_sources(), 1);

        let first = source.read().unwrap().unwrap();
        let second = source.read().unwrap().unwrap();
        assert_eq!(first.pts, Some(0));
        assert_eq!(second.pts, Some(1));
        assert!(source.read().unwrap().is_none());

        source.close();
        assert_eq!(catalog.live_sources(), 0);
    }

    #[test]
    fn test_decoders_are_counted() {
        let catalog = MemoryCatalog::new();
        catalog.add(
            "av",
            ScriptedSource::video(PixelFormat::Nv12, Size::new(4, 4)).with_stream(StreamSpec::audio(1)),
        );
        let descriptor = catalog.describe(0).unwrap();
        let mut source = catalog.open_source(&descriptor).unwrap();

        let decoders = source.decoders();
        assert_eq!(decoders.len(), 2);
        assert_eq!(catalog.live_decoders(), 2);
        drop(decoders);
        assert_eq!(catalog.live_decoders(), 0);
    }

    #[test]
    fn test_unknown_stream_frames_rejected() {
        let result = ScriptedSource::video(PixelFormat::Nv12, Size::new(4, 4)).with_frames(3, 1);
        assert!(matches!(result, Err(CaptureError::NotFound { .. })));
    }
}
