use super::types::FileMetadata;
use crate::error::MetadataError;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const EXTENSION: &str = "json";

/// Directory of `<filename>.json` placement documents.
///
/// This is the only durable record of where chunks live. Losing a document
/// makes the file unrecoverable even though its chunks remain on the nodes.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, MetadataError> {
        validate_filename(filename)?;
        Ok(self.dir.join(format!("{}.{}", filename, EXTENSION)))
    }

    /// Writes the document through a temporary file so readers never see a
    /// half-written one.
    pub async fn save(&self, filename: &str, metadata: &FileMetadata) -> Result<(), MetadataError> {
        let path = self.path_for(filename)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let body = serde_json::to_vec_pretty(metadata).map_err(|source| MetadataError::Corrupt {
            filename: filename.to_string(),
            source,
        })?;

        let temp = self.dir.join(format!(".tmp-{}", Uuid::new_v4()));
        tokio::fs::write(&temp, &body).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!("Saved metadata for {} ({} chunks)", filename, metadata.len());
        Ok(())
    }

    /// Like `save`, but fails with `AlreadyExists` instead of replacing a
    /// document. Of two concurrent creates for one filename exactly one wins.
    pub async fn create(&self, filename: &str, metadata: &FileMetadata) -> Result<(), MetadataError> {
        let path = self.path_for(filename)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let body = serde_json::to_vec_pretty(metadata).map_err(|source| MetadataError::Corrupt {
            filename: filename.to_string(),
            source,
        })?;

        // The link publishes the fully written temp file, and only if the name is free.
        let temp = self.dir.join(format!(".tmp-{}", Uuid::new_v4()));
        tokio::fs::write(&temp, &body).await?;
        let linked = tokio::fs::hard_link(&temp, &path).await;
        let _ = tokio::fs::remove_file(&temp).await;

        match linked {
            Ok(()) => {
                tracing::debug!("Created metadata for {} ({} chunks)", filename, metadata.len());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(MetadataError::AlreadyExists(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn load(&self, filename: &str) -> Result<Option<FileMetadata>, MetadataError> {
        let path = self.path_for(filename)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata = serde_json::from_slice(&body).map_err(|source| MetadataError::Corrupt {
            filename: filename.to_string(),
            source,
        })?;
        Ok(Some(metadata))
    }

    pub async fn exists(&self, filename: &str) -> Result<bool, MetadataError> {
        let path = self.path_for(filename)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// Returns whether a document was removed. Removing a missing one is not an error.
    pub async fn remove(&self, filename: &str) -> Result<bool, MetadataError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All filenames with a document, sorted.
    pub async fn list(&self) -> Result<Vec<String>, MetadataError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut filenames = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && !stem.starts_with(".tmp-")
            {
                filenames.push(stem.to_string());
            }
        }

        filenames.sort();
        Ok(filenames)
    }
}

/// Filenames become path components, so separators and dot-only names are refused.
pub fn validate_filename(filename: &str) -> Result<(), MetadataError> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);
    if bad {
        return Err(MetadataError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}
