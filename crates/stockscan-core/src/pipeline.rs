use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::StockscanError;
use crate::extraction::{read_any, WorkbookReader};
use crate::mail::{attachment_path, save_messages, MessageSource};
use crate::model::{
    Attachment, FieldColumnIndex, InventoryReport, Message, ProcessingStatus, ReportSheetItem,
    SeparateSheet,
};
use crate::oracle::{resolve_labels, HeaderOracle};
use crate::parsing::normalize::normalize_grid;
use crate::parsing::{extract_sheet, SheetExtraction};
use crate::pricing::{enrich_prices, PriceLookupService};
use crate::report::ReportWriter;

pub const ATTACHMENT_FAILURE_COMMENT: &str =
    "System Exception: Couldn't process the attachment. Check logs for more details.";
pub const ONE_HEADER_COMMENT: &str =
    "Could detect just one header that relate to barcode, quantity, product description or unit price.";
pub const NO_HEADER_COMMENT: &str =
    "Couldn't detect any headers that relate to barcode, quantity, product description, unit price.";
const MISSING_HEADERS_PREFIX: &str = "Couldn't detect any headers that relate to";

/// Per-run settings and paths.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: AppConfig,
    pub run_dir: PathBuf,
}

impl RunContext {
    /// Create a fresh `<output_dir>/<dd-mm-YYYY HH-MM-SS>` run directory.
    pub fn create(config: AppConfig) -> Result<Self, StockscanError> {
        let stamp = Local::now().format("%d-%m-%Y %H-%M-%S").to_string();
        let run_dir = config.app.output_dir.join(stamp);
        std::fs::create_dir_all(&run_dir)?;
        Ok(Self { config, run_dir })
    }
}

/// The collaborators a full run talks to.
pub struct Collaborators<'a> {
    pub source: &'a dyn MessageSource,
    pub reader: &'a dyn WorkbookReader,
    pub oracle: &'a dyn HeaderOracle,
    pub prices: &'a dyn PriceLookupService,
    pub writer: &'a dyn ReportWriter,
}

/// Fetch, save, extract, price and report. Returns the report path, or
/// `None` when there were no messages to process.
pub fn run_pipeline(
    ctx: &RunContext,
    with: &Collaborators<'_>,
) -> Result<Option<PathBuf>, StockscanError> {
    let messages = with.source.fetch_messages()?;
    if messages.is_empty() {
        info!("no messages with Excel attachments");
        return Ok(None);
    }

    save_messages(&ctx.run_dir, &messages)?;

    let mut report = generate_inventory(ctx, &messages, with.reader, with.oracle);
    enrich_prices(
        &mut report.consolidated,
        with.prices,
        ctx.config.pricing.batch_size,
    );
    with.writer.write_report(&report).map(Some)
}

/// Run the extraction core over every Excel attachment of every message.
///
/// Never fails: an unreadable attachment becomes one NOT PROCESSED summary
/// row and processing moves on.
pub fn generate_inventory(
    ctx: &RunContext,
    messages: &[Message],
    reader: &dyn WorkbookReader,
    oracle: &dyn HeaderOracle,
) -> InventoryReport {
    let mut report = InventoryReport::default();

    for (m, message) in messages.iter().enumerate() {
        let message_number = m + 1;
        info!(
            "analysing message {message_number}/{} from {}",
            messages.len(),
            message.sender
        );

        let excel = message.attachments.iter().filter(|a| a.is_excel());
        for (a, attachment) in excel.enumerate() {
            let source = AttachmentSource {
                message,
                attachment,
                message_number,
                attachment_number: a + 1,
                file_path: attachment_path(&ctx.run_dir, message_number, &attachment.name),
            };
            if let Err(e) = process_attachment(&source, reader, oracle, &mut report) {
                warn!(
                    sender = %message.sender,
                    received_at = %message.received_at,
                    attachment = %attachment.name,
                    "attachment failed to process: {e}"
                );
                report.report_items.push(source.report_item(
                    String::new(),
                    ProcessingStatus::NotProcessed,
                    ATTACHMENT_FAILURE_COMMENT.into(),
                ));
            }
        }
    }

    info!(
        sheets = report.report_items.len(),
        items = report.consolidated.len(),
        "extraction finished"
    );
    report
}

struct AttachmentSource<'a> {
    message: &'a Message,
    attachment: &'a Attachment,
    message_number: usize,
    attachment_number: usize,
    file_path: PathBuf,
}

impl AttachmentSource<'_> {
    fn report_item(
        &self,
        sheet_name: String,
        status: ProcessingStatus,
        comments: String,
    ) -> ReportSheetItem {
        ReportSheetItem {
            sender: self.message.sender.to_string(),
            received_at: self.message.received_at.clone(),
            sheet_name,
            status,
            comments,
            file_name: self.attachment.name.clone(),
            file_path: path_string(&self.file_path),
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn process_attachment(
    source: &AttachmentSource<'_>,
    reader: &dyn WorkbookReader,
    oracle: &dyn HeaderOracle,
    report: &mut InventoryReport,
) -> Result<(), StockscanError> {
    let sheets = read_any(reader, &source.attachment.name, &source.attachment.content)?;
    let sender = source.message.sender.to_string();

    let mut sheet_number = 0;
    for sheet in sheets {
        let grid = normalize_grid(&sheet.rows);
        if grid.is_blank() {
            continue;
        }
        sheet_number += 1;
        let name = format!(
            "M-{}A-{}S-{sheet_number}",
            source.message_number, source.attachment_number
        );

        let labels = resolve_labels(oracle, &grid);
        let extraction = extract_sheet(&grid, &labels, &sender);
        let (status, comments) = sheet_status(&extraction.columns);

        info!(
            sheet = %sheet.name,
            report_sheet = %name,
            %status,
            items = extraction.items.len(),
            "sheet processed"
        );

        let SheetExtraction { items, table, .. } = extraction;
        report.consolidated.extend(items);

        let keep_table = status != ProcessingStatus::NotProcessed && table.len() > 1;
        let sheet_name = if keep_table { name.clone() } else { String::new() };
        if keep_table {
            report.separate_sheets.push(SeparateSheet { name, rows: table });
        }
        report
            .report_items
            .push(source.report_item(sheet_name, status, comments));
    }
    Ok(())
}

/// Status and comment for a sheet from its located columns.
pub fn sheet_status(columns: &FieldColumnIndex) -> (ProcessingStatus, String) {
    let located = columns.located_count();
    let status = ProcessingStatus::from_located_count(located);
    let comments = match status {
        ProcessingStatus::Processed => String::new(),
        ProcessingStatus::PartiallyProcessed => {
            let missing: Vec<&str> = columns.missing().map(|f| f.description()).collect();
            format!("{MISSING_HEADERS_PREFIX} {}", missing.join(", "))
        }
        ProcessingStatus::NotProcessed if located == 1 => ONE_HEADER_COMMENT.to_string(),
        ProcessingStatus::NotProcessed => NO_HEADER_COMMENT.to_string(),
    };
    (status, comments)
}
