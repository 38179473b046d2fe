use super::SourceCatalog;
use crate::errors::CaptureError;
use crate::source::{MediaSource, Y4mSource};
use crate::types::{SourceDescriptor, SourceKind};
use std::fs;
use std::path::{Path, PathBuf};

/// Media files directly inside one directory, in lexical path order.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    directory: PathBuf,
    extensions: Vec<String>,
}

impl FileCatalog {
    /// `extensions` match case-insensitively, with or without a leading dot.
    pub fn new(directory: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            directory: directory.into(),
            extensions,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl SourceCatalog for FileCatalog {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn enumerate(&self) -> Result<Vec<SourceDescriptor>, CaptureError> {
        if !self.directory.is_dir() {
            log::warn!(
                "Media directory {} does not exist",
                self.directory.display()
            );
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.is_file() && self.matches_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| SourceDescriptor::file(path.to_string_lossy().into_owned()))
            .collect())
    }

    fn open_source(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<Box<dyn MediaSource>, CaptureError> {
        if descriptor.kind != SourceKind::File {
            return Err(CaptureError::invalid_argument(format!(
                "{} is not a file source",
                descriptor.name
            )));
        }

        let path = Path::new(&descriptor.locator);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("y4m") => Ok(Box::new(Y4mSource::new(path))),
            _ => Err(CaptureError::OpenFailed(format!(
                "no reader for {}",
                descriptor.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_enumerate_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.y4m", "a.Y4M", "notes.txt", "c.mp4"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("nested.y4m")).unwrap();

        let catalog = FileCatalog::new(dir.path(), vec![".y4m".to_string()]);
        let names: Vec<String> = catalog
            .enumerate()
            .unwrap()
            .iter()
            .map(|d| catalog.friendly_name(d))
            .collect();
        assert_eq!(names, vec!["a.Y4M", "b.y4m"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let catalog = FileCatalog::new("/no/such/media/dir", vec!["y4m".to_string()]);
        assert_eq!(catalog.count(), 0);
        assert!(catalog.describe(0).is_err());
    }

    #[test]
    fn test_rescans_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(dir.path(), vec!["y4m".to_string()]);
        assert_eq!(catalog.count(), 0);
        File::create(dir.path().join("late.y4m")).unwrap();
        assert_eq!(catalog.count(), 1);
    }

    #[test]
    fn test_open_unknown_container() {
        let catalog = FileCatalog::new("/tmp", vec!["mp4".to_string()]);
        let result = catalog.open_source(&SourceDescriptor::file("/tmp/clip.mp4"));
        assert!(matches!(result, Err(CaptureError::OpenFailed(_))));
    }
}
