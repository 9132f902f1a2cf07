pub mod config;
pub mod error;
pub mod extraction;
pub mod mail;
pub mod model;
pub mod oracle;
pub mod parsing;
pub mod pipeline;
pub mod pricing;
pub mod report;

pub use error::StockscanError;
pub use parsing::{extract_sheet, SheetExtraction};
pub use pipeline::{generate_inventory, run_pipeline, Collaborators, RunContext};

use extraction::{read_any, WorkbookReader};
use model::FieldLabelMap;
use oracle::{resolve_labels, HeaderOracle};
use parsing::normalize::normalize_grid;

/// Extraction result for one sheet of a local workbook.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SheetResult {
    pub sheet_name: String,
    pub labels: FieldLabelMap,
    pub extraction: SheetExtraction,
}

/// Run the extraction core over every non-empty sheet of a workbook file's
/// bytes, without mail, pricing or report output.
pub fn extract_workbook(
    name: &str,
    bytes: &[u8],
    reader: &dyn WorkbookReader,
    oracle: &dyn HeaderOracle,
    sender: &str,
) -> Result<Vec<SheetResult>, StockscanError> {
    let sheets = read_any(reader, name, bytes)?;

    let mut results = Vec::new();
    for sheet in sheets {
        let grid = normalize_grid(&sheet.rows);
        if grid.is_blank() {
            continue;
        }
        let labels = resolve_labels(oracle, &grid);
        let extraction = extract_sheet(&grid, &labels, sender);
        results.push(SheetResult {
            sheet_name: sheet.name,
            labels,
            extraction,
        });
    }
    Ok(results)
}
