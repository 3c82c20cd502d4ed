//! Excel workbooks: defined names and the per-run workbook cache.
//!
//! - `Workbook`: sheet names plus the defined names of one workbook
//! - `write_cellrange`: the naming policy (no-op, conflict or forced replace)
//! - `Excels`: one handle per path for a whole run, saved once at the end

mod memory;
mod xlsx;

pub use memory::{MemorySource, MemoryWorkbook};
pub use xlsx::{XlsxSource, XlsxWorkbook};

use crate::error::{E2vError, E2vResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A `<definedName>` of a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// Index of the sheet the name is local to; `None` for workbook scope.
    pub local_sheet_id: Option<u32>,
    pub refers_to: String,
    /// Attributes other than `name` and `localSheetId`, kept as read.
    pub extra_attributes: Vec<(String, String)>,
}

impl DefinedName {
    pub fn local(name: &str, sheet_id: u32, refers_to: &str) -> Self {
        Self {
            name: name.to_string(),
            local_sheet_id: Some(sheet_id),
            refers_to: refers_to.to_string(),
            extra_attributes: Vec::new(),
        }
    }
}

/// The part of a spreadsheet workbook the cellrange writer needs.
pub trait Workbook: fmt::Debug {
    fn sheet_names(&self) -> &[String];

    fn defined_names(&self) -> &[DefinedName];

    /// Mutable access; implementations treat any call as a modification.
    fn defined_names_mut(&mut self) -> &mut Vec<DefinedName>;

    /// Persist pending modifications.
    fn save(&mut self) -> E2vResult<()>;

    /// Index of a sheet, matched case-insensitively.
    fn sheet_index(&self, sheet: &str) -> Option<u32> {
        self.sheet_names()
            .iter()
            .position(|s| s.eq_ignore_ascii_case(sheet))
            .and_then(|idx| u32::try_from(idx).ok())
    }

    /// Names local to a sheet.
    fn local_names(&self, sheet_id: u32) -> Vec<&DefinedName> {
        self.defined_names()
            .iter()
            .filter(|d| d.local_sheet_id == Some(sheet_id))
            .collect()
    }
}

/// What [`write_cellrange`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Unchanged,
    Replaced,
}

/// Define `name` local to `sheet`, pointing at `address`.
///
/// Writing an identical definition again is a no-op. A definition with the
/// same name at another address is a [`E2vError::NameConflict`] unless
/// `force`, which replaces it.
pub fn write_cellrange(
    workbook: &mut dyn Workbook,
    name: &str,
    sheet: &str,
    address: &str,
    force: bool,
) -> E2vResult<WriteOutcome> {
    let sheet_id = workbook.sheet_index(sheet).ok_or_else(|| {
        E2vError::Workbook(format!(
            "sheet '{}' not found, the workbook has [{}]",
            sheet,
            workbook.sheet_names().join(", ")
        ))
    })?;

    let existing = workbook
        .defined_names()
        .iter()
        .position(|d| d.local_sheet_id == Some(sheet_id) && d.name.eq_ignore_ascii_case(name));

    let outcome = match existing {
        Some(idx) => {
            let current = &workbook.defined_names()[idx].refers_to;
            if current == address {
                return Ok(WriteOutcome::Unchanged);
            }
            if !force {
                return Err(E2vError::NameConflict {
                    name: name.to_string(),
                    address: address.to_string(),
                    existing: current.clone(),
                });
            }
            workbook.defined_names_mut().remove(idx);
            WriteOutcome::Replaced
        }
        None => WriteOutcome::Created,
    };

    workbook
        .defined_names_mut()
        .push(DefinedName::local(name, sheet_id, address));
    debug!("{:?} cellrange '{}' at '{}'", outcome, name, address);
    Ok(outcome)
}

/// Opens workbooks for [`Excels`].
pub trait WorkbookSource: fmt::Debug {
    fn open(&self, path: &Path) -> E2vResult<Box<dyn Workbook>>;
}

/// Workbooks opened during a run, one handle per path.
///
/// Variables writing to the same file share the handle, so their names
/// accumulate. Nothing reaches disk until [`Excels::save_and_close`].
#[derive(Debug)]
pub struct Excels {
    source: Box<dyn WorkbookSource>,
    books: BTreeMap<PathBuf, Box<dyn Workbook>>,
}

impl Excels {
    pub fn new(source: impl WorkbookSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            books: BTreeMap::new(),
        }
    }

    /// Workbooks read from `.xlsx` files on disk.
    pub fn xlsx() -> Self {
        Self::new(XlsxSource)
    }

    /// Return the cached handle for `path`, opening it the first time.
    pub fn read(&mut self, path: &Path) -> E2vResult<&mut dyn Workbook> {
        if !self.books.contains_key(path) {
            let book = self.source.open(path)?;
            debug!("opened workbook {}", path.display());
            self.books.insert(path.to_path_buf(), book);
        }
        self.books
            .get_mut(path)
            .map(|book| book.as_mut() as &mut dyn Workbook)
            .ok_or_else(|| E2vError::Workbook(format!("workbook {} is not open", path.display())))
    }

    /// An already opened workbook.
    pub fn get(&self, path: &Path) -> Option<&dyn Workbook> {
        self.books.get(path).map(|book| book.as_ref())
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.books.contains_key(path)
    }

    pub fn open_paths(&self) -> Vec<&Path> {
        self.books.keys().map(PathBuf::as_path).collect()
    }

    /// Save every open workbook once and empty the cache.
    pub fn save_and_close(&mut self) -> E2vResult<()> {
        for (path, mut book) in std::mem::take(&mut self.books) {
            book.save()?;
            info!("saved {}", path.display());
        }
        Ok(())
    }

    /// Drop every open workbook without saving.
    pub fn discard(&mut self) {
        self.books.clear();
    }
}
