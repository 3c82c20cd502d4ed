//! In-memory workbooks, for library users and tests that do not touch disk.

use super::{DefinedName, Workbook, WorkbookSource};
use crate::error::{E2vError, E2vResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryWorkbook {
    sheets: Vec<String>,
    names: Vec<DefinedName>,
    saves: usize,
}

impl MemoryWorkbook {
    pub fn new(sheets: &[&str]) -> Self {
        Self {
            sheets: sheets.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_names(mut self, names: Vec<DefinedName>) -> Self {
        self.names = names;
        self
    }

    /// How many times the workbook was saved.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> &[String] {
        &self.sheets
    }

    fn defined_names(&self) -> &[DefinedName] {
        &self.names
    }

    fn defined_names_mut(&mut self) -> &mut Vec<DefinedName> {
        &mut self.names
    }

    fn save(&mut self) -> E2vResult<()> {
        self.saves += 1;
        Ok(())
    }
}

/// Hands out copies of registered workbooks by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    books: HashMap<PathBuf, MemoryWorkbook>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workbook(mut self, path: impl Into<PathBuf>, book: MemoryWorkbook) -> Self {
        self.books.insert(path.into(), book);
        self
    }
}

impl WorkbookSource for MemorySource {
    fn open(&self, path: &Path) -> E2vResult<Box<dyn Workbook>> {
        self.books
            .get(path)
            .cloned()
            .map(|book| Box::new(book) as Box<dyn Workbook>)
            .ok_or_else(|| E2vError::Workbook(format!("no such workbook: {}", path.display())))
    }
}
