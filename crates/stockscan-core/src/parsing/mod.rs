pub mod bounds;
pub mod header;
pub mod normalize;
pub mod rows;
pub mod values;

use serde::Serialize;

use crate::model::{CellValue, ConsolidatedSheetItem, FieldColumnIndex, FieldLabelMap, TableBounds};
use bounds::estimate_bounds;
use header::locate_header;
use normalize::Grid;
use rows::extract_rows;
use tracing::debug;

/// Everything the core extracts from one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetExtraction {
    pub header_row: Option<usize>,
    pub columns: FieldColumnIndex,
    pub bounds: Option<TableBounds>,
    pub items: Vec<ConsolidatedSheetItem>,
    /// Bounded table rows, header first; fewer than 2 rows means no usable table.
    pub table: Vec<Vec<CellValue>>,
}

impl SheetExtraction {
    pub fn has_table(&self) -> bool {
        self.table.len() > 1
    }
}

/// Run header location, bounds estimation and row extraction over a grid.
///
/// Never fails: a missing header or missing data rows simply yield an
/// extraction without items or table.
pub fn extract_sheet(grid: &Grid, labels: &FieldLabelMap, sender: &str) -> SheetExtraction {
    let scan = locate_header(grid, labels);

    let Some(header_row) = scan.header_row else {
        debug!(
            located = scan.columns.located_count(),
            "no header row reached the match threshold"
        );
        return SheetExtraction {
            columns: scan.columns,
            ..Default::default()
        };
    };

    let bounds = match estimate_bounds(grid, header_row, &scan.columns) {
        Ok(bounds) => Some(bounds),
        Err(e) => {
            debug!(header_row, "skipping bounded table: {e}");
            None
        }
    };

    let rows = extract_rows(grid, header_row, &scan.columns, bounds, sender);

    SheetExtraction {
        header_row: Some(header_row),
        columns: scan.columns,
        bounds,
        items: rows.items,
        table: rows.table,
    }
}
