use stockscan_core::model::{CellValue, ConsolidatedSheetItem, Field};
use stockscan_core::pipeline::sheet_status;
use stockscan_core::SheetResult;

pub fn print(file_name: &str, sheets: &[SheetResult]) {
    if sheets.is_empty() {
        println!("{file_name}: no sheets with data");
        return;
    }

    for (i, sheet) in sheets.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let extraction = &sheet.extraction;
        let (status, comments) = sheet_status(&extraction.columns);

        println!("=== {} ===\n", sheet.sheet_name);
        println!("  Status: {status}");
        if !comments.is_empty() {
            println!("  {comments}");
        }

        for field in Field::ALL {
            let label = sheet.labels.get(field).unwrap_or("-");
            let column = extraction
                .columns
                .get(field)
                .map(|c| format!("column {}", c + 1))
                .unwrap_or_else(|| "not found".into());
            println!("  {:<20} {:<24} {}", field.description(), label, column);
        }

        match extraction.header_row {
            Some(row) => println!("  Header row: {}", row + 1),
            None => println!("  Header row: not found"),
        }
        if let Some(bounds) = extraction.bounds {
            println!(
                "  Table columns: {}..{} ({} kept row(s))",
                bounds.left + 1,
                bounds.right + 1,
                extraction.table.len().saturating_sub(1)
            );
        }

        if !extraction.items.is_empty() {
            println!();
            print_items(&extraction.items);
        }
    }
}

fn print_items(items: &[ConsolidatedSheetItem]) {
    let rows: Vec<[String; 4]> = items
        .iter()
        .map(|item| {
            [
                cell(&item.barcode),
                cell(&item.quantity),
                cell(&item.product_description),
                cell(&item.unit_price),
            ]
        })
        .collect();

    let headers = ["BARCODE", "QUANTITY", "PRODUCT DESCRIPTION", "UNIT PRICE"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (w, value) in widths.iter_mut().zip(row) {
            *w = (*w).max(value.chars().count());
        }
    }

    println!(
        "  {:<w0$}  {:>w1$}  {:<w2$}  {:>w3$}",
        headers[0],
        headers[1],
        headers[2],
        headers[3],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
        w3 = widths[3]
    );
    for row in &rows {
        println!(
            "  {:<w0$}  {:>w1$}  {:<w2$}  {:>w3$}",
            row[0],
            row[1],
            row[2],
            row[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3]
        );
    }
}

fn cell(value: &CellValue) -> String {
    match value {
        CellValue::Float(f) => format!("{f:.2}"),
        other => other.to_string(),
    }
}
