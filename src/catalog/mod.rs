//! Enumeration and name resolution of capturable sources.

pub mod file;

#[cfg(feature = "device")]
pub mod device;

pub use file::FileCatalog;

#[cfg(feature = "device")]
pub use device::DeviceCatalog;

use crate::config::SourceConfig;
use crate::errors::CaptureError;
use crate::source::MediaSource;
use crate::types::{SourceDescriptor, SourceKind};
use std::path::Path;

/// Lists sources and opens them.
///
/// Every query re-enumerates: live devices come and go, and file-backed
/// catalogs re-scan their directory.
pub trait SourceCatalog: Send {
    fn kind(&self) -> SourceKind;

    fn enumerate(&self) -> Result<Vec<SourceDescriptor>, CaptureError>;

    fn open_source(&self, descriptor: &SourceDescriptor)
        -> Result<Box<dyn MediaSource>, CaptureError>;

    fn count(&self) -> usize {
        match self.enumerate() {
            Ok(sources) => sources.len(),
            Err(e) => {
                log::warn!("Failed to enumerate {} sources: {}", self.kind().as_str(), e);
                0
            }
        }
    }

    fn describe(&self, index: usize) -> Result<SourceDescriptor, CaptureError> {
        let mut sources = self.enumerate()?;
        let count = sources.len();
        if index >= count {
            return Err(CaptureError::OutOfRange { index, count });
        }
        Ok(sources.swap_remove(index))
    }

    /// Exact name, then exact friendly name, then a suffix of the full name,
    /// so `clip.y4m` finds `/home/me/clip.y4m`.
    fn resolve_by_name(&self, name: &str) -> Result<SourceDescriptor, CaptureError> {
        if name.is_empty() {
            return Err(CaptureError::not_found("source", name));
        }

        let sources = self.enumerate()?;
        sources
            .iter()
            .find(|d| d.name == name)
            .or_else(|| sources.iter().find(|d| self.friendly_name(d) == name))
            .or_else(|| sources.iter().find(|d| d.name.ends_with(name)))
            .cloned()
            .ok_or_else(|| CaptureError::not_found("source", name))
    }

    fn friendly_name(&self, descriptor: &SourceDescriptor) -> String {
        friendly_name(descriptor)
    }
}

/// Display name: the last path segment for files, the device name otherwise.
pub fn friendly_name(descriptor: &SourceDescriptor) -> String {
    match descriptor.kind {
        SourceKind::File => Path::new(&descriptor.locator)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        SourceKind::Device => descriptor.name.clone(),
    }
}

/// Builds the catalog selected by configuration.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn SourceCatalog>, CaptureError> {
    match config.kind {
        SourceKind::File => {
            let directory = config.resolve_media_directory()?;
            Ok(Box::new(FileCatalog::new(directory, config.extensions.clone())))
        }
        SourceKind::Device => {
            #[cfg(feature = "device")]
            {
                Ok(Box::new(DeviceCatalog::new()))
            }
            #[cfg(not(feature = "device"))]
            {
                Err(CaptureError::Config(
                    "device sources requested but crate built without the device feature"
                        .to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCatalog(Vec<SourceDescriptor>);

    impl SourceCatalog for FixedCatalog {
        fn kind(&self) -> SourceKind {
            SourceKind::File
        }

        fn enumerate(&self) -> Result<Vec<SourceDescriptor>, CaptureError> {
            Ok(self.0.clone())
        }

        fn open_source(
            &self,
            descriptor: &SourceDescriptor,
        ) -> Result<Box<dyn MediaSource>, CaptureError> {
            Err(CaptureError::OpenFailed(descriptor.name.clone()))
        }
    }

    fn catalog() -> FixedCatalog {
        FixedCatalog(vec![
            SourceDescriptor::file("/media/a/myclip.y4m"),
            SourceDescriptor::file("/media/b/clip.y4m"),
        ])
    }

    #[test]
    fn test_describe_out_of_range() {
        let result = catalog().describe(2);
        assert!(matches!(
            result,
            Err(CaptureError::OutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_friendly_name_preferred_over_suffix() {
        // "clip.y4m" is a suffix of both; the exact file name wins.
        let found = catalog().resolve_by_name("clip.y4m").unwrap();
        assert_eq!(found.name, "/media/b/clip.y4m");
    }

    #[test]
    fn test_suffix_match() {
        let found = catalog().resolve_by_name("a/myclip.y4m").unwrap();
        assert_eq!(found.name, "/media/a/myclip.y4m");
    }

    #[test]
    fn test_empty_name_never_matches() {
        assert!(matches!(
            catalog().resolve_by_name(""),
            Err(CaptureError::NotFound { .. })
        ));
    }

    #[test]
    fn test_device_friendly_name() {
        let device = SourceDescriptor::device("Integrated Webcam", "0");
        assert_eq!(friendly_name(&device), "Integrated Webcam");
    }

    #[test]
    fn test_file_friendly_name_last_resort() {
        let odd = SourceDescriptor::file("/");
        assert_eq!(friendly_name(&odd), "");
    }
}
