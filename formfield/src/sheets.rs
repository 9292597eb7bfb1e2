use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::errors::SheetError;

static CELL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z]{1,3})([1-9][0-9]{0,6})\s*$").expect("valid cell pattern"));

/// Read-only access to the spreadsheet cells an autocomplete field points at.
#[allow(async_fn_in_trait)]
pub trait SheetLookup {
    /// Values inside the rectangle spanned by `from_row` and `to_row`, row by row.
    async fn values(&self, data_url: &str, sheet: &str, from_row: &str, to_row: &str) -> Result<Vec<String>, SheetError>;
}

/// Zero-based (row, column) of an A1-style reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub column: usize,
}

impl CellRef {
    pub fn parse(reference: &str) -> Result<Self, SheetError> {
        let invalid = || SheetError::InvalidCell {
            reference: reference.to_string(),
        };
        let captures = CELL_REFERENCE.captures(reference).ok_or_else(invalid)?;
        let column = captures[1]
            .chars()
            .fold(0usize, |acc, letter| acc * 26 + (letter.to_ascii_uppercase() as usize - 'A' as usize + 1))
            - 1;
        let row = captures[2].parse::<usize>().map_err(|_| invalid())? - 1;
        Ok(Self { row, column })
    }
}

/// Grids held in memory, keyed by data url and sheet name.
#[derive(Debug, Clone, Default)]
pub struct StaticSheets {
    grids: HashMap<(String, String), Vec<Vec<String>>>,
}

impl StaticSheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, data_url: impl Into<String>, sheet: impl Into<String>, rows: Vec<Vec<String>>) {
        self.grids.insert((data_url.into(), sheet.into()), rows);
    }

    pub fn with_sheet(mut self, data_url: impl Into<String>, sheet: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        self.insert(data_url, sheet, rows);
        self
    }

    fn read(&self, data_url: &str, sheet: &str, from: CellRef, to: CellRef) -> Result<Vec<String>, SheetError> {
        let grid = self
            .grids
            .get(&(data_url.to_string(), sheet.to_string()))
            .ok_or_else(|| SheetError::UnknownSheet {
                data_url: data_url.to_string(),
                sheet: sheet.to_string(),
            })?;
        let (top, bottom) = (from.row.min(to.row), from.row.max(to.row));
        let (left, right) = (from.column.min(to.column), from.column.max(to.column));

        let values = grid
            .iter()
            .skip(top)
            .take(bottom - top + 1)
            .flat_map(|row| row.iter().skip(left).take(right - left + 1).cloned())
            .collect();
        Ok(values)
    }
}

impl SheetLookup for StaticSheets {
    async fn values(&self, data_url: &str, sheet: &str, from_row: &str, to_row: &str) -> Result<Vec<String>, SheetError> {
        let from = CellRef::parse(from_row)?;
        let to = CellRef::parse(to_row)?;
        self.read(data_url, sheet, from, to)
    }
}

impl<T: SheetLookup> SheetLookup for &T {
    async fn values(&self, data_url: &str, sheet: &str, from_row: &str, to_row: &str) -> Result<Vec<String>, SheetError> {
        (**self).values(data_url, sheet, from_row, to_row).await
    }
}
