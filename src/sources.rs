use crate::constants::{MAX_FILE_SIZE, SUPPORTED_IMAGE_EXTENSIONS};
use crate::error::{CompressionError, Result};
use crate::formats::mime_for_path;
use glob::glob;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Where a source file's bytes come from
#[derive(Debug, Clone)]
pub enum SourceOrigin {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A raw file handle as selected by the user: name, content, declared type
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub origin: SourceOrigin,
    pub mime_type: Option<String>,
}

/// A source file whose full content has been read into memory
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
}

impl SourceFile {
    /// File on disk; the declared type is taken from its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let mime_type = Some(mime_for_path(&path).to_string());
        Self {
            name,
            origin: SourceOrigin::Path(path),
            mime_type,
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            origin: SourceOrigin::Memory(bytes.into()),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Declared MIME type, or one derived from the name when none was given
    pub fn effective_mime_type(&self) -> String {
        match &self.mime_type {
            Some(mime) if !mime.trim().is_empty() => mime.clone(),
            _ => mime_for_path(Path::new(&self.name)).to_string(),
        }
    }

    /// Reads the full content into memory.
    ///
    /// # Returns
    /// * `Ok(LoadedFile)` - name, bytes and effective MIME type
    /// * `Err(CompressionError::Read)` - the file could not be read
    /// * `Err(CompressionError::FileTooLarge)` - content exceeds `MAX_FILE_SIZE`
    pub async fn read(&self) -> Result<LoadedFile> {
        let bytes: Arc<[u8]> = match &self.origin {
            SourceOrigin::Memory(bytes) => bytes.clone(),
            SourceOrigin::Path(path) => {
                // Check the size before loading to avoid pulling huge files into memory
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| CompressionError::Read(self.name.clone(), e))?;
                if metadata.len() > MAX_FILE_SIZE {
                    return Err(CompressionError::FileTooLarge(metadata.len(), MAX_FILE_SIZE));
                }
                tokio::fs::read(path)
                    .await
                    .map_err(|e| CompressionError::Read(self.name.clone(), e))?
                    .into()
            }
        };

        if bytes.len() as u64 > MAX_FILE_SIZE {
            return Err(CompressionError::FileTooLarge(bytes.len() as u64, MAX_FILE_SIZE));
        }

        Ok(LoadedFile {
            name: self.name.clone(),
            bytes,
            mime_type: self.effective_mime_type(),
        })
    }
}

/// Collects image files from a single file, a directory or a glob pattern.
///
/// Directory and glob results are sorted so selection order is stable.
pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();
    let input_path = Path::new(input);

    if input_path.is_file() {
        image_files.push(input_path.to_path_buf());
    } else if input_path.is_dir() {
        let walker = if recursive {
            WalkDir::new(input_path).sort_by_file_name()
        } else {
            WalkDir::new(input_path).max_depth(1).sort_by_file_name()
        };

        for entry in walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_image_file(path) {
                image_files.push(path.to_path_buf());
            }
        }
    } else if let Ok(glob_pattern) = glob(input) {
        let mut matches: Vec<PathBuf> = glob_pattern
            .flatten()
            .filter(|entry| entry.is_file() && is_image_file(entry))
            .collect();
        matches.sort();
        image_files.extend(matches);
    } else {
        return Err(CompressionError::NoImageFilesFound(input.to_string()));
    }

    Ok(image_files)
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
