//! Integration tests for the extraction pipeline.
//!
//! Mock collaborators stand in for the mailbox, workbook files, the header
//! oracle, the price service and the report file, so these tests run
//! without network access.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;

use stockscan_core::config::AppConfig;
use stockscan_core::error::StockscanError;
use stockscan_core::extraction::{RawSheet, WorkbookReader};
use stockscan_core::mail::MessageSource;
use stockscan_core::model::{
    Attachment, CellValue, InventoryReport, Message, MessageBody, PricingDetails,
    ProcessingStatus, Sender,
};
use stockscan_core::oracle::HeaderOracle;
use stockscan_core::pipeline::{ATTACHMENT_FAILURE_COMMENT, NO_HEADER_COMMENT};
use stockscan_core::pricing::PriceLookupService;
use stockscan_core::report::ReportWriter;
use stockscan_core::{generate_inventory, run_pipeline, Collaborators, RunContext};

/// Serves sheets by attachment name. Names ending in `.xls` are legacy and
/// only readable through the converted path; unknown names are unreadable.
struct MockReader {
    workbooks: HashMap<String, Vec<RawSheet>>,
    converted: Cell<usize>,
}

impl MockReader {
    fn new(workbooks: &[(&str, Vec<RawSheet>)]) -> Self {
        Self {
            workbooks: workbooks
                .iter()
                .map(|(name, sheets)| (name.to_string(), sheets.clone()))
                .collect(),
            converted: Cell::new(0),
        }
    }

    fn lookup(&self, name: &str) -> Result<Vec<RawSheet>, StockscanError> {
        self.workbooks
            .get(name)
            .cloned()
            .ok_or_else(|| StockscanError::Workbook(format!("{name}: corrupt")))
    }
}

impl WorkbookReader for MockReader {
    fn read_workbook(&self, name: &str, _bytes: &[u8]) -> Result<Vec<RawSheet>, StockscanError> {
        if name.ends_with(".xls") {
            return Err(StockscanError::LegacyFormat);
        }
        self.lookup(name)
    }

    fn read_converted(&self, name: &str, _bytes: &[u8]) -> Result<Vec<RawSheet>, StockscanError> {
        self.converted.set(self.converted.get() + 1);
        self.lookup(name)
    }
}

/// Answers by the first CSV line, so each sheet gets the labels of its own
/// first row. Unknown sheets get an all-empty answer.
struct MockOracle {
    answers: HashMap<String, String>,
    calls: Cell<usize>,
}

impl MockOracle {
    fn new(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            calls: Cell::new(0),
        }
    }
}

impl HeaderOracle for MockOracle {
    fn complete(&self, csv: &str) -> Result<String, StockscanError> {
        self.calls.set(self.calls.get() + 1);
        let first_line = csv.lines().next().unwrap_or_default();
        Ok(self.answers.get(first_line).cloned().unwrap_or_else(|| {
            r#"{"barcode":"","quantity":"","product":"","price":""}"#.to_string()
        }))
    }
}

struct MockPrices;

impl PriceLookupService for MockPrices {
    fn lookup(&self, gtin14s: &[String]) -> Result<HashMap<String, PricingDetails>, StockscanError> {
        Ok(gtin14s
            .iter()
            .filter(|g| g.as_str() == "05012345678900")
            .map(|g| {
                (
                    g.clone(),
                    PricingDetails {
                        median: Some(12.5),
                        lowest_price: Some(9.99),
                        lowest_price_retailer: Some("Shop B".into()),
                        ..Default::default()
                    },
                )
            })
            .collect())
    }
}

struct CapturingWriter {
    written: RefCell<Option<InventoryReport>>,
}

impl ReportWriter for CapturingWriter {
    fn write_report(&self, report: &InventoryReport) -> Result<PathBuf, StockscanError> {
        *self.written.borrow_mut() = Some(report.clone());
        Ok(PathBuf::from("Report.xlsx"))
    }
}

struct MockSource {
    messages: Vec<Message>,
}

impl MessageSource for MockSource {
    fn fetch_messages(&self) -> Result<Vec<Message>, StockscanError> {
        Ok(self.messages.clone())
    }
}

fn sheet(name: &str, rows: &[&[&str]]) -> RawSheet {
    RawSheet {
        name: name.into(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    }
}

fn message(attachments: &[&str]) -> Message {
    Message {
        id: "m1".into(),
        sender: Sender {
            name: "Ann".into(),
            address: "ann@example.com".into(),
        },
        received_at: "2024-05-01 10:15:00".into(),
        body: MessageBody {
            content: "stock list attached".into(),
            content_type: "text".into(),
        },
        has_attachments: true,
        attachments: attachments
            .iter()
            .map(|name| Attachment {
                name: name.to_string(),
                content: vec![0],
            })
            .collect(),
    }
}

fn context(run_dir: PathBuf) -> RunContext {
    RunContext {
        config: AppConfig::default(),
        run_dir,
    }
}

const FULL_HEADER: &str = "EAN,QTY,PRODUCTS,PRICE €";
const FULL_ANSWER: &str =
    r#"{"barcode":"EAN","quantity":"QTY","product":"PRODUCTS","price":"PRICE €"}"#;

// ---------------------------------------------------------------------------
// All four columns resolve: one clean item, PROCESSED, separate sheet kept
// ---------------------------------------------------------------------------
#[test]
fn fully_matched_sheet_is_processed() {
    let reader = MockReader::new(&[(
        "stock.xlsx",
        vec![sheet(
            "Offer",
            &[
                &["EAN", "QTY", "PRODUCTS", "PRICE €"],
                &["5012345678900", "10", "Widget", "1.50"],
                &["", "", "", ""],
            ],
        )],
    )]);
    let oracle = MockOracle::new(&[(FULL_HEADER, FULL_ANSWER)]);
    let ctx = context(PathBuf::from("/run"));

    let report = generate_inventory(&ctx, &[message(&["stock.xlsx"])], &reader, &oracle);

    assert_eq!(oracle.calls.get(), 1);
    assert_eq!(report.consolidated.len(), 1);
    let item = &report.consolidated[0];
    assert_eq!(item.sender, "Ann - ann@example.com");
    assert_eq!(item.barcode, CellValue::Int(5012345678900));
    assert_eq!(item.quantity, CellValue::Int(10));
    assert_eq!(item.product_description, CellValue::Text("Widget".into()));
    assert_eq!(item.unit_price, CellValue::Float(1.5));

    assert_eq!(report.report_items.len(), 1);
    let row = &report.report_items[0];
    assert_eq!(row.status, ProcessingStatus::Processed);
    assert_eq!(row.comments, "");
    assert_eq!(row.sheet_name, "M-1A-1S-1");
    assert_eq!(row.file_name, "stock.xlsx");
    assert_eq!(
        PathBuf::from(&row.file_path),
        PathBuf::from("/run/Messages/Message 1/Attachments/stock.xlsx")
    );

    assert_eq!(report.separate_sheets.len(), 1);
    assert_eq!(report.separate_sheets[0].name, "M-1A-1S-1");
    assert_eq!(report.separate_sheets[0].rows.len(), 2);
}

// ---------------------------------------------------------------------------
// Oracle finds nothing on both windows: NOT PROCESSED, no separate sheet
// ---------------------------------------------------------------------------
#[test]
fn unresolved_sheet_is_not_processed() {
    let reader = MockReader::new(&[(
        "notes.xlsx",
        vec![sheet("Notes", &[&["Meeting notes"], &["call back Tuesday"]])],
    )]);
    let oracle = MockOracle::new(&[]);
    let ctx = context(PathBuf::from("/run"));

    let report = generate_inventory(&ctx, &[message(&["notes.xlsx"])], &reader, &oracle);

    assert_eq!(oracle.calls.get(), 2);
    assert!(report.consolidated.is_empty());
    assert!(report.separate_sheets.is_empty());
    let row = &report.report_items[0];
    assert_eq!(row.status, ProcessingStatus::NotProcessed);
    assert_eq!(row.comments, NO_HEADER_COMMENT);
    assert_eq!(row.sheet_name, "");
}

// ---------------------------------------------------------------------------
// Only product and price resolve: PARTIALLY PROCESSED, sparse rows still pass
// ---------------------------------------------------------------------------
#[test]
fn partial_labels_are_partially_processed() {
    let reader = MockReader::new(&[(
        "list.xlsx",
        vec![sheet(
            "List",
            &[
                &["Name", "Cost", "Notes"],
                &["Widget", "2.5", ""],
                &["Gadget", "", ""],
                &["Sprocket", "4", "new"],
            ],
        )],
    )]);
    let oracle = MockOracle::new(&[(
        "Name,Cost,Notes",
        r#"{"barcode":"","quantity":"","product":"Name","price":"Cost"}"#,
    )]);
    let ctx = context(PathBuf::from("/run"));

    let report = generate_inventory(&ctx, &[message(&["list.xlsx"])], &reader, &oracle);

    let row = &report.report_items[0];
    assert_eq!(row.status, ProcessingStatus::PartiallyProcessed);
    assert_eq!(
        row.comments,
        "Couldn't detect any headers that relate to barcode, quantity"
    );
    assert_eq!(report.consolidated.len(), 2);
    assert_eq!(report.consolidated[0].unit_price, CellValue::Float(2.5));
    assert_eq!(report.consolidated[1].unit_price, CellValue::Float(4.0));
}

// ---------------------------------------------------------------------------
// Unreadable attachment yields one NOT PROCESSED row and the run continues
// ---------------------------------------------------------------------------
#[test]
fn unreadable_attachment_is_reported_and_skipped() {
    let reader = MockReader::new(&[(
        "good.xlsx",
        vec![sheet(
            "Offer",
            &[&["EAN", "QTY", "PRODUCTS", "PRICE €"], &["1", "2", "a", "3"]],
        )],
    )]);
    let oracle = MockOracle::new(&[(FULL_HEADER, FULL_ANSWER)]);
    let ctx = context(PathBuf::from("/run"));
    let msg = message(&["broken.xlsx", "image.png", "good.xlsx"]);

    let report = generate_inventory(&ctx, &[msg], &reader, &oracle);

    assert_eq!(report.report_items.len(), 2);
    let failed = &report.report_items[0];
    assert_eq!(failed.status, ProcessingStatus::NotProcessed);
    assert_eq!(failed.comments, ATTACHMENT_FAILURE_COMMENT);
    assert_eq!(failed.file_name, "broken.xlsx");
    assert_eq!(failed.sheet_name, "");

    // The good workbook is the second Excel attachment.
    assert_eq!(report.report_items[1].sheet_name, "M-1A-2S-1");
    assert_eq!(report.consolidated.len(), 1);
}

// ---------------------------------------------------------------------------
// Blank sheets are skipped without a summary row or a sheet number
// ---------------------------------------------------------------------------
#[test]
fn blank_sheets_are_skipped() {
    let reader = MockReader::new(&[(
        "stock.xlsx",
        vec![
            sheet("Empty", &[&["", ""], &[" ", ""]]),
            sheet(
                "Offer",
                &[&["EAN", "QTY", "PRODUCTS", "PRICE €"], &["1", "2", "a", "3"]],
            ),
        ],
    )]);
    let oracle = MockOracle::new(&[(FULL_HEADER, FULL_ANSWER)]);
    let ctx = context(PathBuf::from("/run"));

    let report = generate_inventory(&ctx, &[message(&["stock.xlsx"])], &reader, &oracle);

    assert_eq!(report.report_items.len(), 1);
    assert_eq!(report.report_items[0].sheet_name, "M-1A-1S-1");
}

// ---------------------------------------------------------------------------
// Legacy workbooks go through the converted read path
// ---------------------------------------------------------------------------
#[test]
fn legacy_workbook_uses_converted_copy() {
    let reader = MockReader::new(&[(
        "old.xls",
        vec![sheet(
            "Sheet1",
            &[&["EAN", "QTY", "PRODUCTS", "PRICE €"], &["1", "2", "a", "3"]],
        )],
    )]);
    let oracle = MockOracle::new(&[(FULL_HEADER, FULL_ANSWER)]);
    let ctx = context(PathBuf::from("/run"));

    let report = generate_inventory(&ctx, &[message(&["old.xls"])], &reader, &oracle);

    assert_eq!(reader.converted.get(), 1);
    assert_eq!(report.report_items[0].status, ProcessingStatus::Processed);
}

// ---------------------------------------------------------------------------
// Full run: messages saved, prices attached, report handed to the writer
// ---------------------------------------------------------------------------
#[test]
fn full_run_prices_items_and_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let reader = MockReader::new(&[(
        "stock.xlsx",
        vec![sheet(
            "Offer",
            &[
                &["EAN", "QTY", "PRODUCTS", "PRICE €"],
                &["5012345678900", "10", "Widget", "1.50"],
                &["4006381333931", "3", "Pen", "0.99"],
            ],
        )],
    )]);
    let oracle = MockOracle::new(&[(FULL_HEADER, FULL_ANSWER)]);
    let source = MockSource {
        messages: vec![message(&["stock.xlsx"])],
    };
    let writer = CapturingWriter {
        written: RefCell::new(None),
    };
    let ctx = context(dir.path().to_path_buf());

    let path = run_pipeline(
        &ctx,
        &Collaborators {
            source: &source,
            reader: &reader,
            oracle: &oracle,
            prices: &MockPrices,
            writer: &writer,
        },
    )
    .unwrap();

    assert_eq!(path, Some(PathBuf::from("Report.xlsx")));
    assert!(dir
        .path()
        .join("Messages/Message 1/Attachments/stock.xlsx")
        .exists());

    let report = writer.written.borrow().clone().unwrap();
    assert_eq!(report.consolidated.len(), 2);
    assert_eq!(report.consolidated[0].pricing_details.median, Some(12.5));
    assert_eq!(
        report.consolidated[0]
            .pricing_details
            .lowest_price_retailer
            .as_deref(),
        Some("Shop B")
    );
    assert_eq!(report.consolidated[1].pricing_details, PricingDetails::default());
}

#[test]
fn run_without_messages_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let writer = CapturingWriter {
        written: RefCell::new(None),
    };
    let path = run_pipeline(
        &context(dir.path().to_path_buf()),
        &Collaborators {
            source: &MockSource { messages: vec![] },
            reader: &MockReader::new(&[]),
            oracle: &MockOracle::new(&[]),
            prices: &MockPrices,
            writer: &writer,
        },
    )
    .unwrap();
    assert_eq!(path, None);
    assert!(writer.written.borrow().is_none());
}
