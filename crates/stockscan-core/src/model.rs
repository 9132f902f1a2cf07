use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four columns sought in every sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Barcode,
    Quantity,
    Product,
    Price,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Barcode, Field::Quantity, Field::Product, Field::Price];

    fn slot(self) -> usize {
        match self {
            Field::Barcode => 0,
            Field::Quantity => 1,
            Field::Product => 2,
            Field::Price => 3,
        }
    }

    /// Wording used in report comments.
    pub fn description(self) -> &'static str {
        match self {
            Field::Barcode => "barcode",
            Field::Quantity => "quantity",
            Field::Product => "product description",
            Field::Price => "unit price",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Barcode => write!(f, "barcode"),
            Field::Quantity => write!(f, "quantity"),
            Field::Product => write!(f, "product"),
            Field::Price => write!(f, "price"),
        }
    }
}

/// Best-guess header label per field, as resolved by the header oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLabelMap {
    labels: [Option<String>; 4],
}

impl FieldLabelMap {
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// Build a map from raw labels. Empty or whitespace-only labels are unresolved.
    pub fn from_labels(barcode: &str, quantity: &str, product: &str, price: &str) -> Self {
        let mut map = Self::default();
        for (field, raw) in Field::ALL.into_iter().zip([barcode, quantity, product, price]) {
            map.set(field, raw);
        }
        map
    }

    pub fn set(&mut self, field: Field, raw: &str) {
        let trimmed = raw.trim();
        self.labels[field.slot()] = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.labels[field.slot()].as_deref()
    }

    /// Resolved (field, label) pairs in field order.
    pub fn resolved(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|label| (field, label)))
    }

    pub fn is_unresolved(&self) -> bool {
        self.labels.iter().all(Option::is_none)
    }
}

/// Zero-based column of each located field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldColumnIndex {
    columns: [Option<usize>; 4],
}

impl FieldColumnIndex {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns[field.slot()]
    }

    pub fn set(&mut self, field: Field, column: usize) {
        self.columns[field.slot()] = Some(column);
    }

    pub fn reset(&mut self) {
        self.columns = [None; 4];
    }

    pub fn located_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }

    pub fn missing(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL
            .into_iter()
            .filter(move |field| self.get(*field).is_none())
    }

    pub fn contains_column(&self, column: usize) -> bool {
        self.columns.contains(&Some(column))
    }
}

/// Inclusive left/right column extent of the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBounds {
    pub left: usize,
    pub right: usize,
}

impl TableBounds {
    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }
}

/// A typed cell as emitted into the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Int(_) | CellValue::Float(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Summary of third-party offers for one barcode. Unset fields mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingDetails {
    pub median: Option<f64>,
    pub lowest_price: Option<f64>,
    pub lowest_price_retailer: Option<String>,
    pub highest_price: Option<f64>,
    pub highest_price_retailer: Option<String>,
    pub average_price: Option<f64>,
}

/// One extracted item in the flat cross-sheet list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedSheetItem {
    pub sender: String,
    pub barcode: CellValue,
    pub quantity: CellValue,
    pub product_description: CellValue,
    pub unit_price: CellValue,
    #[serde(default)]
    pub pricing_details: PricingDetails,
}

/// Bounded re-extraction of one source sheet, header row first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparateSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    #[serde(rename = "PROCESSED")]
    Processed,
    #[serde(rename = "PARTIALLY PROCESSED")]
    PartiallyProcessed,
    #[serde(rename = "NOT PROCESSED")]
    NotProcessed,
}

impl ProcessingStatus {
    pub fn from_located_count(count: usize) -> Self {
        if count >= Field::ALL.len() {
            ProcessingStatus::Processed
        } else if count >= 2 {
            ProcessingStatus::PartiallyProcessed
        } else {
            ProcessingStatus::NotProcessed
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Processed => write!(f, "PROCESSED"),
            ProcessingStatus::PartiallyProcessed => write!(f, "PARTIALLY PROCESSED"),
            ProcessingStatus::NotProcessed => write!(f, "NOT PROCESSED"),
        }
    }
}

/// Processing outcome of one (message, attachment, sheet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSheetItem {
    pub sender: String,
    pub received_at: String,
    /// Empty when the sheet produced no separate-sheet table.
    pub sheet_name: String,
    pub status: ProcessingStatus,
    pub comments: String,
    pub file_name: String,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub name: String,
    pub address: String,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub content: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl Attachment {
    /// Only `.xls` and `.xlsx` attachments are processed.
    pub fn is_excel(&self) -> bool {
        let lower = self.name.to_lowercase();
        lower.ends_with(".xlsx") || lower.ends_with(".xls")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    /// `YYYY-MM-DD HH:MM:SS` as received from the mail server.
    pub received_at: String,
    pub body: MessageBody,
    pub has_attachments: bool,
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn has_excel_files(&self) -> bool {
        self.attachments.iter().any(Attachment::is_excel)
    }
}

/// The three collections handed to the report writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub report_items: Vec<ReportSheetItem>,
    pub consolidated: Vec<ConsolidatedSheetItem>,
    pub separate_sheets: Vec<SeparateSheet>,
}
