use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use deed_core::{parse_asset_list, AssetId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetListError {
    #[error("asset list not found: {0}")]
    Missing(PathBuf),
    #[error("cannot read asset list {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Loads one identifier per line, normalized, in file order.
pub fn load_asset_list(path: &Path) -> Result<Vec<AssetId>, AssetListError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_asset_list(text.trim_start_matches('\u{feff}'))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(AssetListError::Missing(path.to_path_buf()))
        }
        Err(source) => Err(AssetListError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
