use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoError, IoResult};

/// One labelled row of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// A row-labelled table of optional numbers, written with blank cells for `None`.
///
/// The first header cell (`corner`) names the row labels, e.g. `dataset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub corner: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(corner: impl Into<String>, columns: Vec<String>) -> Self {
        Table {
            corner: corner.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: impl Into<String>, values: Vec<Option<f64>>) {
        self.rows.push(TableRow {
            label: label.into(),
            values,
        });
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.values.get(col).copied().flatten())
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|r| r.values.get(col).copied().flatten())
            .collect()
    }
}

/// Write a table; `None` becomes an empty cell.
pub fn write_table(path: &Path, table: &Table) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push(table.corner.clone());
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.label.clone());
        record.extend(row.values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read a table written by [`write_table`] or by hand.
///
/// The first row holds the column names, the first column the row labels.
/// Blank cells read as `None`; anything else must be a number.
pub fn read_table(path: &Path) -> IoResult<Table> {
    let malformed = |reason: String| IoError::Table {
        path: path.to_path_buf(),
        reason,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let mut fields = headers.iter();
    let corner = fields
        .next()
        .ok_or_else(|| malformed("missing header row".into()))?
        .to_string();
    let columns: Vec<String> = fields.map(str::to_string).collect();
    if columns.is_empty() {
        return Err(malformed("no value columns".into()));
    }

    let mut table = Table::new(corner, columns);
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let mut cells = record.iter();
        let label = match cells.next() {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => continue,
        };
        let mut values = Vec::with_capacity(table.n_cols());
        for col in 0..table.n_cols() {
            let cell = cells.next().unwrap_or("");
            if cell.is_empty() {
                values.push(None);
            } else {
                let v = cell.parse::<f64>().map_err(|_| {
                    malformed(format!("row {}, column {}: {cell:?} is not a number", i + 2, col + 2))
                })?;
                values.push(Some(v));
            }
        }
        table.push_row(label, values);
    }
    Ok(table)
}

/// Write free-form rows of varying length, used for the test summary listing.
pub fn write_records(path: &Path, rows: &[Vec<String>]) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
