use crate::error::StockscanError;

/// Rectangular grid of trimmed cell text for one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl Grid {
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Cell text, or "" outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// True when no cell holds any text.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(|c| c.is_empty())
    }

    /// Render the first `limit` rows as comma-separated text.
    pub fn head_csv(&self, limit: usize) -> Result<String, StockscanError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in self.rows.iter().take(limit) {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| StockscanError::Io(std::io::Error::other(e.to_string())))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Normalize raw sheet rows into a [`Grid`].
///
/// Cells are trimmed and line breaks inside a cell collapse to a single
/// space, so every grid row renders as exactly one CSV line. Short rows are
/// padded with empty cells to the widest row.
pub fn normalize_grid(raw: &[Vec<String>]) -> Grid {
    let width = raw.iter().map(Vec::len).max().unwrap_or(0);

    let rows = raw
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(|c| normalize_cell(c)).collect();
            cells.resize(width, String::new());
            cells
        })
        .collect();

    Grid { rows, width }
}

fn normalize_cell(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.contains(|c: char| c == '\n' || c == '\r') {
        trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        trimmed.to_string()
    }
}
