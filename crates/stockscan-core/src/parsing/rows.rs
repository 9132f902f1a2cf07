use crate::model::{CellValue, ConsolidatedSheetItem, Field, FieldColumnIndex, TableBounds};
use crate::parsing::normalize::Grid;
use crate::parsing::values::{meaningful, parse_float, parse_integer, parse_text};

/// Non-blank fields a row needs to enter the consolidated list.
pub const VALID_FIELD_THRESHOLD: usize = 2;

/// Rows extracted from one sheet below its header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowExtraction {
    pub items: Vec<ConsolidatedSheetItem>,
    /// Bounded table, header row first. Empty when no bounds were available.
    pub table: Vec<Vec<CellValue>>,
}

/// Extract consolidated items and bounded table rows from every data row.
///
/// The two outputs apply independent noise filters: an item needs two of the
/// four fields, a table row needs at least half of the bounded cells filled.
pub fn extract_rows(
    grid: &Grid,
    header_row: usize,
    columns: &FieldColumnIndex,
    bounds: Option<TableBounds>,
    sender: &str,
) -> RowExtraction {
    let mut extraction = RowExtraction::default();

    if let (Some(bounds), Some(header)) = (bounds, grid.rows().get(header_row)) {
        extraction.table.push(
            slice_row(header, bounds)
                .iter()
                .map(|cell| parse_text(cell))
                .collect(),
        );
    }

    for row in grid.rows().iter().skip(header_row + 1) {
        if let Some(item) = consolidated_item(row, columns, sender) {
            extraction.items.push(item);
        }
        if let Some(bounds) = bounds {
            if let Some(cells) = bounded_row(row, bounds, columns) {
                extraction.table.push(cells);
            }
        }
    }

    extraction
}

fn consolidated_item(
    row: &[String],
    columns: &FieldColumnIndex,
    sender: &str,
) -> Option<ConsolidatedSheetItem> {
    let cell = |field: Field| field_cell(row, columns, field);

    let item = ConsolidatedSheetItem {
        sender: sender.to_string(),
        barcode: parse_integer(cell(Field::Barcode)).into_cell(),
        quantity: parse_integer(cell(Field::Quantity)).into_cell(),
        product_description: parse_text(cell(Field::Product)),
        unit_price: parse_float(cell(Field::Price)).into_cell(),
        pricing_details: Default::default(),
    };

    let filled = [
        &item.barcode,
        &item.quantity,
        &item.product_description,
        &item.unit_price,
    ]
    .iter()
    .filter(|value| !value.is_blank())
    .count();

    (filled >= VALID_FIELD_THRESHOLD).then_some(item)
}

/// Cell under a located field column; rows shorter than the column read as blank.
fn field_cell<'a>(row: &'a [String], columns: &FieldColumnIndex, field: Field) -> &'a str {
    columns
        .get(field)
        .and_then(|col| row.get(col))
        .map(|s| s.as_str())
        .unwrap_or("")
}

fn bounded_row(
    row: &[String],
    bounds: TableBounds,
    columns: &FieldColumnIndex,
) -> Option<Vec<CellValue>> {
    let cells = slice_row(row, bounds);

    let filled = cells.iter().filter(|c| meaningful(c).is_some()).count();
    if filled * 2 < bounds.width() {
        return None;
    }

    let integer_columns = [columns.get(Field::Barcode), columns.get(Field::Quantity)];
    Some(
        cells
            .iter()
            .enumerate()
            .map(|(offset, cell)| {
                if integer_columns.contains(&Some(bounds.left + offset)) {
                    parse_integer(cell).into_cell()
                } else {
                    parse_text(cell)
                }
            })
            .collect(),
    )
}

fn slice_row(row: &[String], bounds: TableBounds) -> &[String] {
    if bounds.left >= row.len() {
        return &[];
    }
    let right = bounds.right.min(row.len() - 1);
    &row[bounds.left..=right]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::normalize::normalize_grid;

    fn grid(rows: &[&[&str]]) -> Grid {
        let raw: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        normalize_grid(&raw)
    }

    fn all_columns() -> FieldColumnIndex {
        let mut idx = FieldColumnIndex::default();
        for (i, field) in Field::ALL.into_iter().enumerate() {
            idx.set(field, i);
        }
        idx
    }

    #[test]
    fn test_typed_consolidated_item() {
        let g = grid(&[
            &["EAN", "QTY", "PRODUCTS", "PRICE €"],
            &["5012345678900", "10", "Widget", "1.50"],
            &["", "", "", ""],
        ]);
        let bounds = TableBounds { left: 0, right: 3 };
        let out = extract_rows(&g, 0, &all_columns(), Some(bounds), "Ann - ann@example.com");

        assert_eq!(out.items.len(), 1);
        let item = &out.items[0];
        assert_eq!(item.barcode, CellValue::Int(5012345678900));
        assert_eq!(item.quantity, CellValue::Int(10));
        assert_eq!(item.product_description, CellValue::Text("Widget".into()));
        assert_eq!(item.unit_price, CellValue::Float(1.5));
        assert_eq!(item.sender, "Ann - ann@example.com");

        assert_eq!(out.table.len(), 2);
        assert_eq!(out.table[0][3], CellValue::Text("PRICE €".into()));
        assert_eq!(out.table[1][0], CellValue::Int(5012345678900));
        assert_eq!(out.table[1][3], CellValue::Text("1.50".into()));
    }

    #[test]
    fn test_single_field_row_is_noise() {
        let g = grid(&[
            &["EAN", "QTY", "PRODUCTS", "PRICE"],
            &["", "", "Subtotal", ""],
        ]);
        let out = extract_rows(&g, 0, &all_columns(), None, "s");
        assert!(out.items.is_empty());
        assert!(out.table.is_empty());
    }

    #[test]
    fn test_placeholder_counts_as_blank() {
        let g = grid(&[
            &["EAN", "QTY", "PRODUCTS", "PRICE"],
            &["Unnamed: 0", "Unnamed: 1", "Widget", ""],
        ]);
        let out = extract_rows(&g, 0, &all_columns(), None, "s");
        assert!(out.items.is_empty());
    }

    #[test]
    fn test_unparseable_values_stay_text() {
        let g = grid(&[
            &["EAN", "QTY", "PRODUCTS", "PRICE"],
            &["ABC-1", "ten", "Widget", "POA"],
        ]);
        let out = extract_rows(&g, 0, &all_columns(), None, "s");
        assert_eq!(out.items[0].barcode, CellValue::Text("ABC-1".into()));
        assert_eq!(out.items[0].quantity, CellValue::Text("ten".into()));
        assert_eq!(out.items[0].unit_price, CellValue::Text("POA".into()));
    }

    #[test]
    fn test_partial_fields_pass_threshold() {
        let mut idx = FieldColumnIndex::default();
        idx.set(Field::Product, 0);
        idx.set(Field::Price, 1);
        let g = grid(&[&["Name", "Cost"], &["Widget", "2.5"], &["Gadget", ""]]);
        let out = extract_rows(&g, 0, &idx, None, "s");
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].barcode, CellValue::Empty);
        assert_eq!(out.items[0].unit_price, CellValue::Float(2.5));
    }

    #[test]
    fn test_bounded_row_needs_half_coverage() {
        let mut idx = FieldColumnIndex::default();
        idx.set(Field::Barcode, 1);
        idx.set(Field::Product, 2);
        let g = grid(&[
            &["", "EAN", "DESC", "NOTE", "SIZE"],
            &["", "1", "a", "", ""],
            &["", "2", "", "", ""],
            &["x", "3", "b", "c", "d"],
        ]);
        let bounds = TableBounds { left: 1, right: 4 };
        let out = extract_rows(&g, 0, &idx, Some(bounds), "s");

        // header + row 1 (2 of 4) + row 3 (4 of 4); row 2 has 1 of 4
        assert_eq!(out.table.len(), 3);
        assert_eq!(
            out.table[1],
            vec![
                CellValue::Int(1),
                CellValue::Text("a".into()),
                CellValue::Empty,
                CellValue::Empty
            ]
        );
        // Consolidated path keeps rows 1 and 3 only (row 2 has one field).
        assert_eq!(out.items.len(), 2);
    }

    #[test]
    fn test_header_placeholders_cleared() {
        let g = grid(&[&["EAN", "Unnamed: 1", "QTY"], &["1", "x", "2"]]);
        let mut idx = FieldColumnIndex::default();
        idx.set(Field::Barcode, 0);
        idx.set(Field::Quantity, 2);
        let out = extract_rows(&g, 0, &idx, Some(TableBounds { left: 0, right: 2 }), "s");
        assert_eq!(out.table[0][1], CellValue::Empty);
        assert_eq!(out.table[1][2], CellValue::Int(2));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let g = grid(&[
            &["EAN", "QTY", "PRODUCTS", "PRICE"],
            &["1", "2", "a", "3.5"],
            &["", "4", "", "1"],
        ]);
        let bounds = Some(TableBounds { left: 0, right: 3 });
        let first = extract_rows(&g, 0, &all_columns(), bounds, "s");
        let second = extract_rows(&g, 0, &all_columns(), bounds, "s");
        assert_eq!(first, second);
    }
}
