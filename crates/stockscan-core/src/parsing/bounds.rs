use crate::error::StockscanError;
use crate::model::{FieldColumnIndex, TableBounds};
use crate::parsing::normalize::Grid;

/// Estimate the left/right column bounds of the data table below `header_row`.
///
/// Each data row contributes its first and last column that is either a
/// located field column or non-blank. The bounds are the most frequent of
/// those edges, so a minority of ragged or noisy rows does not move them.
pub fn estimate_bounds(
    grid: &Grid,
    header_row: usize,
    columns: &FieldColumnIndex,
) -> Result<TableBounds, StockscanError> {
    let mut left_edges = Vec::new();
    let mut right_edges = Vec::new();

    for row in grid.rows().iter().skip(header_row + 1) {
        let occupied = |(col, cell): (usize, &String)| {
            columns.contains_column(col) || !cell.trim().is_empty()
        };
        if let Some(left) = row.iter().enumerate().position(occupied) {
            left_edges.push(left);
        }
        if let Some(right) = row.iter().enumerate().rposition(occupied) {
            right_edges.push(right);
        }
    }

    let (Some(left), Some(right)) = (mode(&left_edges), mode(&right_edges)) else {
        return Err(StockscanError::InsufficientData(format!(
            "no data rows below header row {header_row}"
        )));
    };

    if left > right {
        return Err(StockscanError::InsufficientData(format!(
            "table bounds collapsed (left {left} > right {right})"
        )));
    }

    Ok(TableBounds { left, right })
}

/// Most frequent value; ties go to the value seen first.
fn mode(values: &[usize]) -> Option<usize> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => entry.1 += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
