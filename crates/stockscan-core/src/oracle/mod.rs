pub mod openai;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StockscanError;
use crate::model::{Field, FieldLabelMap};
use crate::parsing::normalize::Grid;

/// Rows sent on the first oracle request.
pub const FIRST_WINDOW: usize = 30;
/// Rows sent on the single escalation request.
pub const ESCALATED_WINDOW: usize = 50;

/// System instructions given to a language-model oracle.
pub const HEADER_INSTRUCTIONS: &str = "You are a sales data assistant who identifies the header row \
(i.e. the CSV line) and provides four headers from CSV content as a JSON object: \
{\"barcode\": <Barcode_Column>, \"quantity\": <Quantity_Column>, \"product\": <Product_Column>, \"price\": <Price_Column>}. \
Each property relates to the Barcode, Quantity, Product description and Price column headers respectively. \
Synonyms and abbreviations count: a barcode (GTIN) header could be EAN, UPC or GTIN; \
quantity could be Quantity, Stock, Pieces, PCS, QTY or Units; price could be Price, Unit Price or Cost; \
product could be Product, Name, Description, Item or DESC. \
All values must come from the same row, the one considered the header row. \
Check the column values too: most values under the barcode header should be valid GTINs. \
If no suitable header exists for a property, set it to an empty string. \
Reply with the JSON object only.";

/// Maps the first rows of a sheet, rendered as CSV, to a raw reply.
///
/// Every call is an independent request; implementations must not carry
/// conversation state from one sheet to the next.
pub trait HeaderOracle {
    fn complete(&self, csv: &str) -> Result<String, StockscanError>;
}

/// Oracle that always answers with the same labels. Used when the caller
/// already knows the headers.
#[derive(Debug, Clone)]
pub struct StaticOracle {
    labels: FieldLabelMap,
}

impl StaticOracle {
    pub fn new(labels: FieldLabelMap) -> Self {
        Self { labels }
    }
}

impl HeaderOracle for StaticOracle {
    fn complete(&self, _csv: &str) -> Result<String, StockscanError> {
        let reply = LabelReply {
            barcode: self.labels.get(Field::Barcode).unwrap_or("").into(),
            quantity: self.labels.get(Field::Quantity).unwrap_or("").into(),
            product: self.labels.get(Field::Product).unwrap_or("").into(),
            price: self.labels.get(Field::Price).unwrap_or("").into(),
        };
        Ok(serde_json::to_string(&reply)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LabelReply {
    barcode: String,
    quantity: String,
    product: String,
    price: String,
}

/// Parse an oracle reply into a label map.
///
/// Accepts a bare JSON object or one wrapped in a ```json fence. Anything
/// other than exactly the four string keys is an error.
pub fn parse_reply(reply: &str) -> Result<FieldLabelMap, StockscanError> {
    let body = strip_fence(reply);
    let parsed: LabelReply = serde_json::from_str(body)
        .map_err(|e| StockscanError::OracleReply(format!("{e}: {}", truncate(body, 120))))?;
    Ok(FieldLabelMap::from_labels(
        &parsed.barcode,
        &parsed.quantity,
        &parsed.product,
        &parsed.price,
    ))
}

fn strip_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Resolve the four field labels for a grid.
///
/// Sends the first 30 rows; if nothing resolves (failed request, bad reply
/// or all four labels empty) sends the first 50 rows once more. A second
/// miss returns an unresolved map and the sheet is skipped downstream.
pub fn resolve_labels(oracle: &dyn HeaderOracle, grid: &Grid) -> FieldLabelMap {
    let first = ask(oracle, grid, FIRST_WINDOW);
    if !first.is_unresolved() {
        return first;
    }

    debug!(rows = ESCALATED_WINDOW, "no labels resolved, widening the window");
    ask(oracle, grid, ESCALATED_WINDOW)
}

fn ask(oracle: &dyn HeaderOracle, grid: &Grid, rows: usize) -> FieldLabelMap {
    let csv = match grid.head_csv(rows) {
        Ok(csv) => csv,
        Err(e) => {
            warn!("could not render sheet rows: {e}");
            return FieldLabelMap::unresolved();
        }
    };

    match oracle.complete(&csv).and_then(|reply| parse_reply(&reply)) {
        Ok(labels) => labels,
        Err(e) => {
            warn!(rows, "header oracle gave no usable answer: {e}");
            FieldLabelMap::unresolved()
        }
    }
}
