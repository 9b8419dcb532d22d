use std::path::{Path, PathBuf};

use tokio::io::{AsyncWriteExt, BufWriter};

use crate::entry::DecisionEntry;

/// Errors that can occur during decision log I/O.
#[derive(Debug, thiserror::Error)]
pub enum DecisionWriteError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open decision log {path}: {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize decision entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write to decision log: {0}")]
    Write(std::io::Error),

    #[error("failed to flush decision log: {0}")]
    Flush(std::io::Error),
}

/// Appends [`DecisionEntry`] values to a file, one JSON object per line.
///
/// Writes are buffered; call [`flush`](Self::flush) to push them to the file.
pub struct DecisionWriter {
    path: PathBuf,
    file: BufWriter<tokio::fs::File>,
    written: u64,
}

impl DecisionWriter {
    /// Open (or create) `path` in append mode, creating parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DecisionWriteError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DecisionWriteError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| DecisionWriteError::OpenFile {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: BufWriter::new(file),
            written: 0,
        })
    }

    pub async fn write(&mut self, entry: &DecisionEntry) -> Result<(), DecisionWriteError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        self.file
            .write_all(&line)
            .await
            .map_err(DecisionWriteError::Write)?;
        self.written += 1;

        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), DecisionWriteError> {
        self.file.flush().await.map_err(DecisionWriteError::Flush)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries written since the file was opened.
    pub fn written(&self) -> u64 {
        self.written
    }
}
