use super::SourceCatalog;
use crate::errors::CaptureError;
use crate::source::{DeviceSource, MediaSource};
use crate::types::{SourceDescriptor, SourceKind};
use nokhwa::{query, utils::ApiBackend};

/// Cameras reported by the platform's native backend.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog;

impl DeviceCatalog {
    pub fn new() -> Self {
        Self
    }
}

impl SourceCatalog for DeviceCatalog {
    fn kind(&self) -> SourceKind {
        SourceKind::Device
    }

    fn enumerate(&self) -> Result<Vec<SourceDescriptor>, CaptureError> {
        let cameras = query(ApiBackend::Auto)
            .map_err(|e| CaptureError::Backend(format!("Failed to query cameras: {}", e)))?;

        Ok(cameras
            .into_iter()
            .enumerate()
            .map(|(position, camera)| {
                // String-indexed backends fall back to query order.
                let index = camera.index().as_index().unwrap_or(position as u32);
                SourceDescriptor::device(camera.human_name(), index.to_string())
            })
            .collect())
    }

    fn open_source(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<Box<dyn MediaSource>, CaptureError> {
        let index = descriptor.locator.parse::<u32>().map_err(|_| {
            CaptureError::invalid_argument(format!("Invalid device index: {}", descriptor.locator))
        })?;
        Ok(Box::new(DeviceSource::new(index)))
    }
}
