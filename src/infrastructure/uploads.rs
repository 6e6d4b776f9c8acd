use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::errors::DomainError;

/// URL prefix under which stored images are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Image files on local disk, named by random UUID.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Lower-cased extension of `filename` if it is an accepted image type.
    pub fn image_extension(filename: &str) -> Result<String, DomainError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(DomainError::InvalidInput(format!(
                "'{filename}' is not an accepted image (allowed: {})",
                ALLOWED_EXTENSIONS.join(", ")
            )))
        }
    }

    /// Writes `bytes` under a fresh name and returns its public URL.
    pub fn save(&self, extension: &str, bytes: &[u8]) -> Result<String, DomainError> {
        if bytes.is_empty() {
            return Err(DomainError::InvalidInput("uploaded file is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(self.too_large());
        }
        fs::create_dir_all(&self.dir)?;
        let name = format!("{}.{extension}", Uuid::new_v4());
        fs::write(self.dir.join(&name), bytes)?;
        log::info!("Stored upload {name} ({} bytes)", bytes.len());
        Ok(format!("{PUBLIC_PREFIX}/{name}"))
    }

    pub fn too_large(&self) -> DomainError {
        DomainError::InvalidInput(format!(
            "file exceeds the {} byte upload limit",
            self.max_bytes
        ))
    }
}
