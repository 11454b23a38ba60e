use std::path::Path;

use crate::error::JsaError;

/// An in-memory tabular file: header row plus string cells. This is the
/// interchange type between every pipeline stage; CSV on disk is its only
/// persistent form.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// A table with the same header and no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn read_csv(path: &Path) -> Result<Self, JsaError> {
        let mut reader = csv::Reader::from_path(path)?;
        let columns = reader.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(String::from).collect());
        }
        Ok(Self { columns, rows })
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), JsaError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Append another table's rows, aligning columns by name. Columns the
    /// other table introduces are added to this one (existing rows padded
    /// with empty cells); cells the other table lacks come out empty.
    /// Row order within each table is preserved.
    pub fn append(&mut self, other: Table) {
        for col in &other.columns {
            if self.column_index(col).is_none() {
                self.columns.push(col.clone());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }

        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|col| other.columns.iter().position(|c| c == col))
            .collect();

        for other_row in other.rows {
            let row = mapping
                .iter()
                .map(|idx| {
                    idx.and_then(|i| other_row.get(i).cloned())
                        .unwrap_or_default()
                })
                .collect();
            self.rows.push(row);
        }
    }

    /// Add a column holding the same value in every row.
    pub fn add_constant_column(&mut self, name: &str, value: &str) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.to_string());
        }
    }

    /// Add a column from per-row values. Panics if the length disagrees with
    /// the row count; callers derive values from this table's own rows.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) {
        assert_eq!(values.len(), self.rows.len(), "column length mismatch");
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }
}
