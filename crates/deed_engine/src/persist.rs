use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Size of a completed download at `path`, or `None` if absent or empty.
pub fn existing_download_size(path: &Path) -> Option<u64> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}

/// Download body staged next to its destination and renamed into place on commit.
///
/// Dropping an uncommitted file removes it, so an interrupted transfer never
/// leaves a partial document behind.
pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
    written: u64,
}

impl StagedFile {
    pub fn create(target: &Path) -> Result<Self, PersistError> {
        let dir = target
            .parent()
            .ok_or_else(|| PersistError::OutputDir("destination has no parent".into()))?;
        ensure_output_dir(dir)?;
        let tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(dir)?;
        Ok(Self {
            tmp,
            target: target.to_path_buf(),
            written: 0,
        })
    }

    /// Appends `data` in slices of at most `chunk_size` bytes.
    pub fn write_chunked(&mut self, data: &[u8], chunk_size: usize) -> Result<(), PersistError> {
        for slice in data.chunks(chunk_size.max(1)) {
            self.tmp.write_all(slice)?;
            self.written += slice.len() as u64;
        }
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and renames over the target. Returns the byte count.
    pub fn commit(mut self) -> Result<u64, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;

        // Replace existing file if present (e.g. an empty leftover).
        if self.target.exists() {
            fs::remove_file(&self.target)?;
        }
        self.tmp
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.written)
    }
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut staged = StagedFile::create(&target)?;
        staged.write_chunked(content, content.len())?;
        staged.commit()?;
        Ok(target)
    }
}
