use super::convert;
use super::{ScaleFilter, Scaler, ScalerConfig};
use crate::errors::CaptureError;
use crate::types::{Frame, Image};
use image::imageops;

/// CPU scaler: unpack to RGBA, resample with `image`, pack to the output
/// format.
#[derive(Debug, Clone, Default)]
pub struct SoftwareScaler {
    filter: ScaleFilter,
    config: Option<ScalerConfig>,
}

impl SoftwareScaler {
    pub fn new(filter: ScaleFilter) -> Self {
        Self {
            filter,
            config: None,
        }
    }

    fn configured(&self) -> Result<ScalerConfig, CaptureError> {
        self.config
            .ok_or_else(|| CaptureError::ConversionFailed("scaler is not configured".to_string()))
    }
}

impl Scaler for SoftwareScaler {
    fn configure(&mut self, config: ScalerConfig) -> Result<(), CaptureError> {
        if config.input_size.is_empty() || config.output_size.is_empty() {
            return Err(CaptureError::invalid_argument(format!(
                "cannot scale {} to {}",
                config.input_size, config.output_size
            )));
        }
        log::debug!(
            "Scaler configured: {} {} -> {} {} ({:?})",
            config.input_size,
            config.input_format,
            config.output_size,
            config.output_format,
            self.filter
        );
        self.config = Some(config);
        Ok(())
    }

    fn config(&self) -> Option<&ScalerConfig> {
        self.config.as_ref()
    }

    fn allocate_output_image(&self) -> Result<Image, CaptureError> {
        let config = self.configured()?;
        Image::try_new(config.output_format, config.output_size)
    }

    fn convert(&mut self, frame: &Frame, image: &mut Image) -> Result<u32, CaptureError> {
        let config = self.configured()?;
        if frame.format != config.input_format || frame.size != config.input_size {
            return Err(CaptureError::ConversionFailed(format!(
                "frame is {} {}, scaler expects {} {}",
                frame.size, frame.format, config.input_size, config.input_format
            )));
        }
        if image.format != config.output_format || image.size != config.output_size {
            return Err(CaptureError::ConversionFailed(format!(
                "image is {} {}, scaler produces {} {}",
                image.size, image.format, config.output_size, config.output_format
            )));
        }

        if frame.format == image.format && frame.size == image.size {
            let len = image.data.len();
            let src = frame.data.get(..len).ok_or_else(|| {
                CaptureError::ConversionFailed("frame shorter than its layout".to_string())
            })?;
            image.data.copy_from_slice(src);
            return Ok(image.size.height);
        }

        let rgba = convert::to_rgba(frame.format, frame.size, &frame.data)?;
        let scaled = if frame.size == image.size {
            rgba
        } else {
            imageops::resize(
                &rgba,
                image.size.width,
                image.size.height,
                self.filter.to_filter_type(),
            )
        };
        convert::from_rgba(&scaled, image.format, &mut image.data)?;
        Ok(image.size.height)
    }
}
