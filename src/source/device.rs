use super::{Decoder, MediaSource, MjpegDecoder, OpenMode, Packet, RawVideoDecoder};
use crate::errors::CaptureError;
use crate::types::{PixelFormat, Size};
use bytes::Bytes;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    Camera,
};

/// Owned nokhwa camera. Backend handles aren't marked `Send`.
struct CameraHandle(Camera);

// SAFETY: the handle is never shared. It moves with the source that owns it
// and is only touched through `&mut DeviceSource`, one thread at a time.
unsafe impl Send for CameraHandle {}

/// Live camera read through nokhwa. Each captured buffer is one packet on
/// stream 0, in whatever frame format the camera negotiated.
pub struct DeviceSource {
    index: u32,
    camera: Option<CameraHandle>,
    frame_format: Option<FrameFormat>,
    size: Size,
    next_pts: i64,
}

impl DeviceSource {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            camera: None,
            frame_format: None,
            size: Size::default(),
            next_pts: 0,
        }
    }
}

impl MediaSource for DeviceSource {
    fn open(&mut self, _mode: OpenMode) -> Result<(), CaptureError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(self.index), requested).map_err(|e| {
            CaptureError::OpenFailed(format!("Failed to initialize camera {}: {}", self.index, e))
        })?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::Backend(format!("Failed to start stream: {}", e)))?;

        let format = camera.camera_format();
        self.size = Size::new(format.resolution().width(), format.resolution().height());
        self.frame_format = Some(format.format());
        self.camera = Some(CameraHandle(camera));
        self.next_pts = 0;

        log::info!(
            "Camera {} streaming {:?} at {}",
            self.index,
            format.format(),
            self.size
        );
        Ok(())
    }

    fn decoders(&mut self) -> Vec<Box<dyn Decoder>> {
        let size = self.size;
        match self.frame_format {
            Some(FrameFormat::MJPEG) => vec![Box::new(MjpegDecoder::new(0, size))],
            Some(FrameFormat::YUYV) => {
                vec![Box::new(RawVideoDecoder::new(0, PixelFormat::Yuyv422, size))]
            }
            Some(FrameFormat::NV12) => {
                vec![Box::new(RawVideoDecoder::new(0, PixelFormat::Nv12, size))]
            }
            Some(FrameFormat::GRAY) => {
                vec![Box::new(RawVideoDecoder::new(0, PixelFormat::Gray8, size))]
            }
            // Swapped to BGR in `read`.
            Some(FrameFormat::RAWRGB) => {
                vec![Box::new(RawVideoDecoder::new(0, PixelFormat::Bgr24, size))]
            }
            other => {
                log::warn!("Camera {}: no decoder for {:?}", self.index, other);
                Vec::new()
            }
        }
    }

    fn read(&mut self) -> Result<Option<Packet>, CaptureError> {
        let Some(CameraHandle(camera)) = self.camera.as_mut() else {
            return Ok(None);
        };

        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::Backend(format!("Failed to capture frame: {}", e)))?;

        let mut data = buffer.buffer().to_vec();
        if self.frame_format == Some(FrameFormat::RAWRGB) {
            for pixel in data.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }

        let pts = self.next_pts;
        self.next_pts += 1;
        Ok(Some(Packet::new(0, Bytes::from(data)).with_pts(pts)))
    }

    fn close(&mut self) {
        if let Some(CameraHandle(mut camera)) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Camera {}: failed to stop stream: {}", self.index, e);
            }
        }
        self.frame_format = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_device_source_is_send() {
        assert_send::<DeviceSource>();
        let source: Box<dyn MediaSource> = Box::new(DeviceSource::new(0));
        drop(source);
    }
}
