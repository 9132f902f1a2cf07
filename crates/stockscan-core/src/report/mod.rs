pub mod xlsx;

use std::path::PathBuf;

use crate::error::StockscanError;
use crate::model::InventoryReport;

pub const SUMMARY_SHEET: &str = "Summary";
pub const CONSOLIDATED_SHEET: &str = "Consolidated";
pub const REPORT_FILE_NAME: &str = "Report.xlsx";

pub const SUMMARY_HEADERS: [&str; 6] = ["SENDER", "TIME", "SHEET", "STATUS", "COMMENTS", "FILE"];

pub const CONSOLIDATED_HEADERS: [&str; 11] = [
    "SENDER",
    "BARCODE",
    "QUANTITY",
    "PRODUCT DESCRIPTION",
    "UNIT PRICE",
    "PRICERUNNER - MEDIAN PRICE",
    "PRICERUNNER - LOWEST PRICE",
    "PRICERUNNER - RETAILER (LOWEST PRICE)",
    "PRICERUNNER - HIGHEST PRICE",
    "PRICERUNNER - RETAILER (HIGHEST PRICE)",
    "PRICERUNNER - AVERAGE PRICE",
];

/// Writes the final multi-sheet report.
pub trait ReportWriter {
    /// Write the report and return where it was written.
    fn write_report(&self, report: &InventoryReport) -> Result<PathBuf, StockscanError>;
}
