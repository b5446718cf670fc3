use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use deed_core::{AssetId, DiscoveryStatus, LedgerRow, LEDGER_HEADERS};
use engine_logging::engine_warn;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

const DELIMITER: u8 = b';';
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger file not found: {0}")]
    Missing(PathBuf),
    #[error("ledger has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Writes `rows` to `{dir}/{filename}` with a UTF-8 BOM, replacing any existing file.
pub fn write_ledger(dir: &Path, filename: &str, rows: &[LedgerRow]) -> Result<PathBuf, LedgerError> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(&mut buffer);
        writer.write_record(LEDGER_HEADERS)?;
        for row in rows {
            writer.write_record([
                row.asset.as_str(),
                row.original_link.as_str(),
                row.recent_link.as_str(),
                row.status.to_string().as_str(),
            ])?;
        }
        writer.flush()?;
    }

    let path = AtomicFileWriter::new(dir.to_path_buf()).write(filename, &buffer)?;
    Ok(path)
}

/// Reads a ledger by header name. A leading BOM is ignored and rows with a
/// blank asset are skipped.
pub fn read_ledger(path: &Path) -> Result<Vec<LedgerRow>, LedgerError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(LedgerError::Missing(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let [asset_header, original_header, recent_header, status_header] = LEDGER_HEADERS;
    let asset_col = column(asset_header).ok_or(LedgerError::MissingColumn(asset_header))?;
    let original_col = column(original_header);
    let recent_col = column(recent_header);
    let status_col = column(status_header);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        let Some(asset) = record.get(asset_col).and_then(AssetId::parse) else {
            engine_warn!("Ledger {:?}: row {} has no asset, skipped", path, line + 2);
            continue;
        };
        let status = field(status_col)
            .parse::<DiscoveryStatus>()
            .unwrap_or_else(|never| match never {});
        rows.push(LedgerRow {
            asset,
            original_link: field(original_col),
            recent_link: field(recent_col),
            status,
        });
    }
    Ok(rows)
}
