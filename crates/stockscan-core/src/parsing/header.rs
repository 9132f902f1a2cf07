use crate::model::{FieldColumnIndex, FieldLabelMap};
use crate::parsing::normalize::Grid;

/// Fields that must match in one row for it to count as the header row.
pub const HEADER_MATCH_THRESHOLD: usize = 2;

/// Result of scanning a grid for its header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderScan {
    pub header_row: Option<usize>,
    /// Final column mapping. When no header row was found this still holds
    /// the partial mapping of the last row that matched any label.
    pub columns: FieldColumnIndex,
}

/// Find the first row whose cells contain at least two resolved labels.
///
/// Every row matching at least one label re-anchors the scan: the column
/// mapping is cleared and rebuilt from that row alone, so a weaker match
/// above the real header never leaks into the result. The first row to
/// reach the threshold wins.
pub fn locate_header(grid: &Grid, labels: &FieldLabelMap) -> HeaderScan {
    let mut columns = FieldColumnIndex::default();

    if labels.is_unresolved() {
        return HeaderScan {
            header_row: None,
            columns,
        };
    }

    for (row_index, row) in grid.rows().iter().enumerate() {
        let matches: Vec<_> = labels
            .resolved()
            .filter_map(|(field, label)| {
                row.iter()
                    .position(|cell| cell.trim() == label)
                    .map(|col| (field, col))
            })
            .collect();

        if matches.is_empty() {
            continue;
        }

        columns.reset();
        for (field, col) in matches {
            columns.set(field, col);
        }

        if columns.located_count() >= HEADER_MATCH_THRESHOLD {
            return HeaderScan {
                header_row: Some(row_index),
                columns,
            };
        }
    }

    HeaderScan {
        header_row: None,
        columns,
    }
}
