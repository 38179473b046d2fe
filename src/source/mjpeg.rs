use super::{Decoder, Packet};
use crate::errors::CaptureError;
use crate::types::{Frame, MediaKind, PixelFormat, Size};
use image::ImageFormat;

/// Motion-JPEG decoder producing `Bgr24` frames.
#[derive(Debug, Clone)]
pub struct MjpegDecoder {
    stream_index: usize,
    size: Size,
}

impl MjpegDecoder {
    pub fn new(stream_index: usize, size: Size) -> Self {
        Self { stream_index, size }
    }
}

impl Decoder for MjpegDecoder {
    fn name(&self) -> &str {
        "mjpeg"
    }

    fn media_kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn native_size(&self) -> Size {
        self.size
    }

    fn native_format(&self) -> PixelFormat {
        PixelFormat::Bgr24
    }

    fn is_same_stream(&self, packet: &Packet) -> bool {
        packet.stream_index == self.stream_index
    }

    fn decode(&mut self, packet: &Packet) -> Result<Frame, CaptureError> {
        let rgb = image::load_from_memory_with_format(&packet.data, ImageFormat::Jpeg)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        if Size::new(width, height) != self.size {
            return Err(CaptureError::DecodeFailed(format!(
                "jpeg is {width}x{height}, stream is {}",
                self.size
            )));
        }

        let mut data = rgb.into_raw();
        for pixel in data.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
        Ok(Frame::new(PixelFormat::Bgr24, self.size, data).with_pts(packet.pts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, RgbImage};

    fn encode_jpeg(image: &RgbImage) -> Vec<u8> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 95)
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .unwrap();
        out
    }

    #[test]
    fn test_decode_swaps_to_bgr() {
        let image = RgbImage::from_pixel(16, 8, image::Rgb([250, 10, 10]));
        let mut decoder = MjpegDecoder::new(0, Size::new(16, 8));
        let frame = decoder.decode(&Packet::new(0, encode_jpeg(&image))).unwrap();

        assert_eq!(frame.format, PixelFormat::Bgr24);
        assert_eq!(frame.data.len(), 16 * 8 * 3);
        // Red ends up in the last byte of each pixel.
        assert!(frame.data[2] > 200);
        assert!(frame.data[0] < 60);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut decoder = MjpegDecoder::new(0, Size::new(16, 8));
        let result = decoder.decode(&Packet::new(0, vec![0u8; 32]));
        assert!(matches!(result, Err(CaptureError::DecodeFailed(_))));
    }

    #[test]
    fn test_decode_rejects_size_mismatch() {
        let image = RgbImage::new(8, 8);
        let mut decoder = MjpegDecoder::new(0, Size::new(16, 8));
        let result = decoder.decode(&Packet::new(0, encode_jpeg(&image)));
        assert!(matches!(result, Err(CaptureError::DecodeFailed(_))));
    }
}
