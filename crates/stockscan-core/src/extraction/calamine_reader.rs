use std::collections::HashSet;
use std::io::{Cursor, Write};

use calamine::{Data, Range, Reader};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::StockscanError;
use crate::extraction::{RawSheet, WorkbookReader};

const OLE2_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];
const ZIP_MAGIC: [u8; 2] = [b'P', b'K'];

/// Workbook reader built on calamine.
///
/// Zip-based workbooks (xlsx, xlsm) are also opened with umya-spreadsheet to
/// find hidden rows, which are dropped. Legacy OLE2 `.xls` files are refused
/// by [`WorkbookReader::read_workbook`] and read from a temp copy by
/// [`WorkbookReader::read_converted`].
#[derive(Debug, Default, Clone)]
pub struct CalamineWorkbookReader;

impl CalamineWorkbookReader {
    pub fn new() -> Self {
        Self
    }
}

impl WorkbookReader for CalamineWorkbookReader {
    fn read_workbook(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawSheet>, StockscanError> {
        if is_legacy(bytes) {
            return Err(StockscanError::LegacyFormat);
        }

        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| StockscanError::Workbook(format!("{name}: {e}")))?;

        let hidden = if bytes.starts_with(&ZIP_MAGIC) {
            hidden_rows(bytes).unwrap_or_else(|e| {
                debug!(file = name, "could not read hidden rows, keeping all: {e}");
                Default::default()
            })
        } else {
            Default::default()
        };

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| StockscanError::Workbook(format!("{name}/{sheet_name}: {e}")))?;
            let skip = hidden.get(&sheet_name);
            sheets.push(RawSheet {
                rows: range_rows(&range, skip),
                name: sheet_name,
            });
        }
        Ok(sheets)
    }

    fn read_converted(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawSheet>, StockscanError> {
        let mut tmpfile = tempfile::Builder::new()
            .prefix("stockscan-")
            .suffix(".xls")
            .tempfile()?;
        tmpfile.write_all(bytes)?;
        tmpfile.flush()?;

        let mut workbook = calamine::open_workbook_auto(tmpfile.path())
            .map_err(|e| StockscanError::Workbook(format!("{name} (converted): {e}")))?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| StockscanError::Workbook(format!("{name}/{sheet_name}: {e}")))?;
            sheets.push(RawSheet {
                rows: range_rows(&range, None),
                name: sheet_name,
            });
        }
        Ok(sheets)
    }
}

fn is_legacy(bytes: &[u8]) -> bool {
    bytes.starts_with(&OLE2_MAGIC)
}

/// Zero-based hidden row numbers per sheet name.
fn hidden_rows(
    bytes: &[u8],
) -> Result<std::collections::HashMap<String, HashSet<u32>>, StockscanError> {
    let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        .map_err(|e| StockscanError::Workbook(format!("umya read failed: {e:?}")))?;

    let mut out = std::collections::HashMap::new();
    for ws in book.get_sheet_collection() {
        let rows: HashSet<u32> = ws
            .get_row_dimensions()
            .into_iter()
            .filter(|row| row.get_hidden().to_owned())
            .map(|row| row.get_row_num().to_owned().saturating_sub(1))
            .collect();
        if !rows.is_empty() {
            out.insert(ws.get_name().to_string(), rows);
        }
    }
    Ok(out)
}

/// Rows of a calamine range as text, skipping hidden rows.
///
/// Leading empty rows and columns before the used range are kept so column
/// positions match the sheet.
fn range_rows(range: &Range<Data>, hidden: Option<&HashSet<u32>>) -> Vec<Vec<String>> {
    let (row0, col0) = range.start().unwrap_or((0, 0));
    let lead = vec![String::new(); col0 as usize];

    let mut rows = Vec::new();
    for r in 0..row0 {
        if hidden.is_some_and(|h| h.contains(&r)) {
            continue;
        }
        rows.push(Vec::new());
    }
    for (offset, row) in range.rows().enumerate() {
        let absolute = row0 + offset as u32;
        if hidden.is_some_and(|h| h.contains(&absolute)) {
            continue;
        }
        let mut cells = lead.clone();
        cells.extend(row.iter().map(cell_as_string));
        rows.push(cells);
    }
    rows
}

/// Convert a calamine cell to text the way a spreadsheet displays it.
pub fn cell_as_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => {
            excel_serial_to_iso(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string())
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERROR:{e:?}"),
    }
}

fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let secs = ((serial - serial.floor()) * 86_400.0).round() as u32;

    // Serial 0 is 1899-12-30 once the fictitious 1900-02-29 is accounted for.
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_days(Days::new(days))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs % 86_400, 0)?;
    let dt = NaiveDateTime::new(date, time);

    if secs % 86_400 == 0 {
        Some(dt.format("%Y-%m-%d").to_string())
    } else {
        Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}
