//! The capture-session state machine.
//!
//! A session owns at most one open source and everything derived from it:
//! the bound decoder, an optional scaler, the last decoded frame and the
//! scaler's output image. Ownership is strictly hierarchical and
//! [`CaptureSession::close`] releases children before parents.

use crate::catalog::{self, SourceCatalog};
use crate::config::CrabCaptureConfig;
use crate::errors::CaptureError;
use crate::formats::{self, Guid};
use crate::scaler::{self, OutputFormatPolicy, ScaleFilter, Scaler, ScalerConfig, ScalerFactory};
use crate::source::{Decoder, MediaSource, OpenMode};
use crate::types::{Frame, Image, MediaKind, PixelFormat, Size, SourceDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opened,
    Capturing,
}

/// Outcome of the last successful `start_capture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiation {
    pub platform_format: Guid,
    /// Decoder format the platform format maps to.
    pub requested_format: PixelFormat,
    /// Format of the bytes `read_frame` returns.
    pub output_format: PixelFormat,
    pub output_size: Size,
    /// False on the pass-through path.
    pub scaled: bool,
}

struct Stream {
    descriptor: SourceDescriptor,
    source: Box<dyn MediaSource>,
    decoder: Box<dyn Decoder>,
}

pub struct CaptureSession {
    catalog: Box<dyn SourceCatalog>,
    scaler_factory: ScalerFactory,
    output_policy: OutputFormatPolicy,
    stream: Option<Stream>,
    scaler: Option<Box<dyn Scaler>>,
    image: Option<Image>,
    frame: Option<Frame>,
    negotiation: Option<Negotiation>,
}

impl CaptureSession {
    pub fn new(catalog: Box<dyn SourceCatalog>) -> Self {
        Self {
            catalog,
            scaler_factory: scaler::software_factory(ScaleFilter::default()),
            output_policy: OutputFormatPolicy::default(),
            stream: None,
            scaler: None,
            image: None,
            frame: None,
            negotiation: None,
        }
    }

    pub fn from_config(config: &CrabCaptureConfig) -> Result<Self, CaptureError> {
        let catalog = catalog::from_config(&config.source)?;
        Ok(Self::new(catalog)
            .with_scaler_factory(scaler::software_factory(config.capture.filter))
            .with_output_policy(config.capture.output_format))
    }

    pub fn with_scaler_factory(mut self, factory: ScalerFactory) -> Self {
        self.scaler_factory = factory;
        self
    }

    pub fn with_output_policy(mut self, policy: OutputFormatPolicy) -> Self {
        self.output_policy = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        match (&self.stream, &self.negotiation) {
            (None, _) => SessionState::Closed,
            (Some(_), None) => SessionState::Opened,
            (Some(_), Some(_)) => SessionState::Capturing,
        }
    }

    pub fn catalog(&self) -> &dyn SourceCatalog {
        self.catalog.as_ref()
    }

    pub fn descriptor(&self) -> Option<&SourceDescriptor> {
        self.stream.as_ref().map(|s| &s.descriptor)
    }

    pub fn decoder_name(&self) -> Option<&str> {
        self.stream.as_ref().map(|s| s.decoder.name())
    }

    pub fn negotiation(&self) -> Option<&Negotiation> {
        self.negotiation.as_ref()
    }

    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn device_count(&self) -> usize {
        self.catalog.count()
    }

    /// Full name of the source at `index`, `None` when out of range.
    pub fn device_name(&self, index: usize) -> Option<String> {
        match self.catalog.describe(index) {
            Ok(descriptor) => Some(descriptor.name),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    pub fn device_friendly_name(&self, index: usize) -> Option<String> {
        match self.catalog.describe(index) {
            Ok(descriptor) => Some(self.catalog.friendly_name(&descriptor)),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    /// Opens `name` and binds its first video decoder. Any open source is
    /// closed first; on failure the session stays closed.
    pub fn open(&mut self, name: &str) -> Result<(), CaptureError> {
        self.close();

        let descriptor = self.catalog.resolve_by_name(name)?;
        let mut source = self.catalog.open_source(&descriptor)?;
        if let Err(e) = source.open(OpenMode::ReadOnly) {
            source.close();
            return Err(e);
        }

        let decoder = source
            .decoders()
            .into_iter()
            .find(|decoder| decoder.media_kind() == MediaKind::Video);

        let Some(decoder) = decoder else {
            source.close();
            return Err(CaptureError::DecoderBindFailed(descriptor.name));
        };

        log::info!(
            "Source {} is open, using decoder {} ({} {})",
            descriptor.name,
            decoder.name(),
            decoder.native_size(),
            decoder.native_format()
        );
        self.stream = Some(Stream {
            descriptor,
            source,
            decoder,
        });
        Ok(())
    }

    /// Releases scaler, frame, decoder and source, in that order. Safe in any
    /// state.
    pub fn close(&mut self) {
        self.scaler = None;
        self.image = None;
        self.negotiation = None;
        self.frame = None;

        let Some(stream) = self.stream.take() else {
            log::debug!("close: no source is open");
            return;
        };
        let Stream {
            descriptor,
            mut source,
            decoder,
        } = stream;
        drop(decoder);
        source.close();
        log::info!("Source {} closed", descriptor.name);
    }

    /// Negotiates output for `platform_format` at `width` x `height`.
    ///
    /// When the decoder already produces that size no scaler is built and
    /// frames pass through in their native format. Asking again for the same
    /// outcome keeps the current scaler and output image.
    pub fn start_capture(
        &mut self,
        platform_format: &Guid,
        width: u32,
        height: u32,
    ) -> Result<(), CaptureError> {
        let Some(stream) = self.stream.as_ref() else {
            return Err(CaptureError::NotOpened);
        };
        let requested_size = Size::new(width, height);
        if requested_size.is_empty() {
            return Err(CaptureError::invalid_argument(format!(
                "capture size {requested_size} has a zero dimension"
            )));
        }
        if !requested_size.fits_frame_limit() {
            return Err(CaptureError::invalid_argument(format!(
                "capture size {requested_size} is too large"
            )));
        }
        let requested_format = formats::lookup_decoder_format(platform_format).map_err(|e| {
            log::error!("Requested format not supported: {}", e);
            CaptureError::from(e)
        })?;

        let native_size = stream.decoder.native_size();
        let native_format = stream.decoder.native_format();
        let scaled = native_size != requested_size;
        let negotiation = Negotiation {
            platform_format: *platform_format,
            requested_format,
            output_format: if scaled {
                self.output_policy.output_format(requested_format)
            } else {
                native_format
            },
            output_size: requested_size,
            scaled,
        };

        // Same outcome as before: keep the scaler and its image.
        if self.negotiation == Some(negotiation) && (!scaled || self.image.is_some()) {
            log::debug!(
                "Capture already negotiated at {} {}",
                requested_size,
                negotiation.output_format
            );
            return Ok(());
        }

        self.scaler = None;
        self.image = None;
        self.negotiation = None;

        if !scaled {
            log::info!(
                "Capturing {} {} without scaling",
                native_size,
                native_format
            );
            self.negotiation = Some(negotiation);
            return Ok(());
        }

        let mut scaler = (self.scaler_factory)();
        scaler.configure(ScalerConfig {
            input_format: native_format,
            input_size: native_size,
            output_format: negotiation.output_format,
            output_size: requested_size,
        })?;
        let image = scaler.allocate_output_image()?;

        log::info!(
            "Capturing {} {} scaled to {} {}",
            native_size,
            native_format,
            requested_size,
            negotiation.output_format
        );
        self.scaler = Some(scaler);
        self.image = Some(image);
        self.negotiation = Some(negotiation);
        Ok(())
    }

    /// Reads, decodes and (when negotiated) converts the next frame.
    ///
    /// `Ok(None)` means no frame is available right now, e.g. end of
    /// stream. The returned bytes belong to the session and are replaced by
    /// the next call.
    pub fn read_frame(&mut self) -> Result<Option<&[u8]>, CaptureError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(CaptureError::NotOpened);
        };

        let packet = loop {
            match stream.source.read()? {
                None => {
                    log::debug!("No more packets from {}", stream.descriptor.name);
                    return Ok(None);
                }
                Some(packet) if packet.is_empty() => {
                    log::debug!("Empty packet from {}", stream.descriptor.name);
                    return Ok(None);
                }
                Some(packet) if stream.decoder.is_same_stream(&packet) => break packet,
                Some(packet) => {
                    log::trace!("Skipping packet from stream {}", packet.stream_index);
                }
            }
        };

        self.frame = None;
        let frame = stream.decoder.decode(&packet).map_err(|e| {
            log::error!("Could not decode frame: {}", e);
            e
        })?;
        let frame = self.frame.insert(frame);

        if let (Some(scaler), Some(image)) = (self.scaler.as_mut(), self.image.as_mut()) {
            return match scaler.convert(frame, image) {
                Ok(rows) if rows > 0 => Ok(Some(image.as_bytes())),
                Ok(_) => {
                    log::error!("Could not scale frame: no rows written");
                    Err(CaptureError::ConversionFailed(
                        "scaler wrote no rows".to_string(),
                    ))
                }
                Err(e) => {
                    log::error!("Could not scale frame: {}", e);
                    Err(e)
                }
            };
        }

        let native_format = stream.decoder.native_format();
        let native_size = stream.decoder.native_size();
        let len = native_format.checked_buffer_size(native_size).ok_or_else(|| {
            CaptureError::DecodeFailed(format!("{native_size} {native_format} overflows memory"))
        })?;
        match frame.data.get(..len) {
            Some(bytes) => Ok(Some(bytes)),
            None => Err(CaptureError::DecodeFailed(format!(
                "decoded frame holds {} bytes, native layout needs {}",
                frame.data.len(),
                len
            ))),
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}
