pub mod calamine_reader;

use crate::error::StockscanError;

/// One worksheet as raw cell text, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Trait for spreadsheet reading backends.
pub trait WorkbookReader {
    /// Read every visible sheet of an attachment.
    ///
    /// Returns [`StockscanError::LegacyFormat`] when the bytes are a legacy
    /// binary workbook that must go through [`WorkbookReader::read_converted`].
    fn read_workbook(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawSheet>, StockscanError>;

    /// Read a legacy workbook through a converted copy.
    fn read_converted(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawSheet>, StockscanError>;
}

/// Read a workbook, falling back to the converted path for legacy files.
pub fn read_any(
    reader: &dyn WorkbookReader,
    name: &str,
    bytes: &[u8],
) -> Result<Vec<RawSheet>, StockscanError> {
    match reader.read_workbook(name, bytes) {
        Err(StockscanError::LegacyFormat) => {
            tracing::debug!(file = name, "legacy workbook, reading converted copy");
            reader.read_converted(name, bytes)
        }
        other => other,
    }
}
