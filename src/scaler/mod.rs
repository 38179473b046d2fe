//! Pixel-format and resolution conversion.

pub(crate) mod convert;
pub mod software;

pub use software::SoftwareScaler;

use crate::errors::CaptureError;
use crate::types::{Frame, Image, PixelFormat, Size};
use serde::{Deserialize, Serialize};

/// The format every scaler outputs unless the session is told otherwise.
pub const CANONICAL_OUTPUT_FORMAT: PixelFormat = PixelFormat::Bgr32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalerConfig {
    pub input_format: PixelFormat,
    pub input_size: Size,
    pub output_format: PixelFormat,
    pub output_size: Size,
}

/// Converts decoder frames into a preallocated output image.
pub trait Scaler: Send {
    fn configure(&mut self, config: ScalerConfig) -> Result<(), CaptureError>;

    fn config(&self) -> Option<&ScalerConfig>;

    /// A buffer sized for the configured output.
    fn allocate_output_image(&self) -> Result<Image, CaptureError>;

    /// Converts `frame` into `image`, returning the number of rows written.
    fn convert(&mut self, frame: &Frame, image: &mut Image) -> Result<u32, CaptureError>;
}

/// Builds a fresh scaler each time a capture is negotiated.
pub type ScalerFactory = Box<dyn Fn() -> Box<dyn Scaler> + Send>;

/// Which output format a negotiated scaler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormatPolicy {
    /// Always [`CANONICAL_OUTPUT_FORMAT`], whatever the caller asked for.
    #[default]
    Canonical,
    /// The decoder format the requested platform format maps to.
    Requested,
}

impl OutputFormatPolicy {
    pub fn output_format(&self, requested: PixelFormat) -> PixelFormat {
        match self {
            OutputFormatPolicy::Canonical => CANONICAL_OUTPUT_FORMAT,
            OutputFormatPolicy::Requested => requested,
        }
    }
}

/// Resampling filter for [`SoftwareScaler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ScaleFilter {
    pub fn to_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ScaleFilter::Nearest => FilterType::Nearest,
            ScaleFilter::Triangle => FilterType::Triangle,
            ScaleFilter::CatmullRom => FilterType::CatmullRom,
            ScaleFilter::Gaussian => FilterType::Gaussian,
            ScaleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Factory producing [`SoftwareScaler`]s with the given filter.
pub fn software_factory(filter: ScaleFilter) -> ScalerFactory {
    Box::new(move || Box::new(SoftwareScaler::new(filter)) as Box<dyn Scaler>)
}
