use std::path::{Path, PathBuf};

use tracing::info;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::StockscanError;
use crate::model::{CellValue, ConsolidatedSheetItem, InventoryReport, ReportSheetItem};
use crate::report::{
    ReportWriter, CONSOLIDATED_HEADERS, CONSOLIDATED_SHEET, REPORT_FILE_NAME, SUMMARY_HEADERS,
    SUMMARY_SHEET,
};

/// Report writer producing an `.xlsx` workbook with umya-spreadsheet.
#[derive(Debug, Clone)]
pub struct XlsxReportWriter {
    path: PathBuf,
}

impl XlsxReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writer targeting `Report.xlsx` inside a run directory.
    pub fn in_dir(run_dir: &Path) -> Self {
        Self::new(run_dir.join(REPORT_FILE_NAME))
    }
}

impl ReportWriter for XlsxReportWriter {
    fn write_report(&self, report: &InventoryReport) -> Result<PathBuf, StockscanError> {
        let mut book = umya_spreadsheet::new_file_empty_worksheet();

        write_summary(new_sheet(&mut book, SUMMARY_SHEET)?, &report.report_items);
        write_consolidated(new_sheet(&mut book, CONSOLIDATED_SHEET)?, &report.consolidated);
        for sheet in &report.separate_sheets {
            let ws = new_sheet(&mut book, &sheet.name)?;
            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    set_cell(ws, c, r, value);
                }
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        umya_spreadsheet::writer::xlsx::write(&book, &self.path)
            .map_err(|e| StockscanError::Report(format!("{}: {e:?}", self.path.display())))?;

        info!(
            path = %self.path.display(),
            summary_rows = report.report_items.len(),
            items = report.consolidated.len(),
            sheets = report.separate_sheets.len(),
            "report written"
        );
        Ok(self.path.clone())
    }
}

fn new_sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet, StockscanError> {
    book.new_sheet(name)
        .map_err(|e| StockscanError::Report(format!("cannot add sheet '{name}': {e}")))
}

fn write_header(ws: &mut Worksheet, headers: &[&str]) {
    for (c, title) in headers.iter().enumerate() {
        set_text(ws, c, 0, title);
    }
}

fn write_summary(ws: &mut Worksheet, items: &[ReportSheetItem]) {
    write_header(ws, &SUMMARY_HEADERS);
    for (i, item) in items.iter().enumerate() {
        let r = i + 1;
        set_text(ws, 0, r, &item.sender);
        set_text(ws, 1, r, &item.received_at);
        set_text(ws, 2, r, &item.sheet_name);
        set_text(ws, 3, r, &item.status.to_string());
        set_text(ws, 4, r, &item.comments);
        set_text(ws, 5, r, &item.file_name);

        let sheet = item.sheet_name.trim();
        if !sheet.is_empty() {
            link(ws, 2, r, &format!("'{sheet}'!A1"), true);
        }
        link(ws, 5, r, &item.file_path, false);
    }
}

fn write_consolidated(ws: &mut Worksheet, items: &[ConsolidatedSheetItem]) {
    write_header(ws, &CONSOLIDATED_HEADERS);
    for (i, item) in items.iter().enumerate() {
        let r = i + 1;
        let p = &item.pricing_details;
        set_text(ws, 0, r, &item.sender);
        set_cell(ws, 1, r, &item.barcode);
        set_cell(ws, 2, r, &item.quantity);
        set_cell(ws, 3, r, &item.product_description);
        set_cell(ws, 4, r, &item.unit_price);
        set_number(ws, 5, r, p.median);
        set_number(ws, 6, r, p.lowest_price);
        set_text(ws, 7, r, p.lowest_price_retailer.as_deref().unwrap_or_default());
        set_number(ws, 8, r, p.highest_price);
        set_text(ws, 9, r, p.highest_price_retailer.as_deref().unwrap_or_default());
        set_number(ws, 10, r, p.average_price);
    }
}

/// umya addresses cells as 1-based (column, row).
fn coord(col: usize, row: usize) -> (u32, u32) {
    (col as u32 + 1, row as u32 + 1)
}

fn set_text(ws: &mut Worksheet, col: usize, row: usize, value: &str) {
    if !value.is_empty() {
        ws.get_cell_mut(coord(col, row)).set_value_string(value);
    }
}

fn set_number(ws: &mut Worksheet, col: usize, row: usize, value: Option<f64>) {
    if let Some(v) = value {
        ws.get_cell_mut(coord(col, row)).set_value_number(v);
    }
}

fn set_cell(ws: &mut Worksheet, col: usize, row: usize, value: &CellValue) {
    match value {
        CellValue::Empty => {}
        CellValue::Int(i) => set_number(ws, col, row, Some(*i as f64)),
        CellValue::Float(f) => set_number(ws, col, row, Some(*f)),
        CellValue::Text(s) => set_text(ws, col, row, s),
    }
}

fn link(ws: &mut Worksheet, col: usize, row: usize, target: &str, internal: bool) {
    ws.get_cell_mut(coord(col, row))
        .get_hyperlink_mut()
        .set_url(target)
        .set_location(internal);
}
