//! Tabular values.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A header row plus records of string cells.
///
/// Every record has exactly as many cells as there are headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a record's width differs from the
    /// header's.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(Error::InvalidInput(format!(
                "row {index} has {} cells, expected {}",
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    /// Column names.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Records, in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cells of the named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map_or("", String::as_str))
                .collect(),
        )
    }

    /// Returns a copy with a leading row-number column named by an empty
    /// header.
    #[must_use]
    pub fn with_index(&self) -> Self {
        let headers = std::iter::once(String::new())
            .chain(self.headers.iter().cloned())
            .collect();
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| std::iter::once(i.to_string()).chain(row.iter().cloned()).collect())
            .collect();
        Self { headers, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Table::new(strings(&["a", "b"]), vec![strings(&["1"])]).unwrap_err();
        assert_eq!(err.to_string(), "invalid input: row 0 has 1 cells, expected 2");
    }

    #[test]
    fn test_with_index() {
        let table = Table::new(
            strings(&["name"]),
            vec![strings(&["x"]), strings(&["y"])],
        )
        .unwrap();
        let indexed = table.with_index();
        assert_eq!(indexed.headers(), strings(&["", "name"]).as_slice());
        assert_eq!(indexed.column(""), Some(vec!["0", "1"]));
        assert_eq!(indexed.column("name"), Some(vec!["x", "y"]));
        assert_eq!(indexed.column("missing"), None);
    }
}
