//! Row-oriented assembly of flat records into a rectangular table.

use indexmap::IndexSet;

use crate::value::{FlatRecord, FlatValue};

/// A table built from many flat records.
///
/// Columns are the union of record keys in first-seen order; a record lacking
/// a column gets a null cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FlatValue>>,
}

impl RecordTable {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = FlatRecord>,
    {
        let records: Vec<FlatRecord> = records.into_iter().collect();

        let mut columns = IndexSet::new();
        for record in &records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.insert(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.swap_remove(column).unwrap_or(FlatValue::Null))
                    .collect()
            })
            .collect();

        Self {
            columns: columns.into_iter().collect(),
            rows,
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

    /// Iterate the cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &FlatValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Rebuild row `index` as a record, dropping null cells.
    pub fn record(&self, index: usize) -> Option<FlatRecord> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .zip(row)
                .filter(|(_, value)| !value.is_null())
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect(),
        )
    }
}

impl FromIterator<FlatRecord> for RecordTable {
    fn from_iter<I: IntoIterator<Item = FlatRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}
