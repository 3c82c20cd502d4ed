//! Cell-range layout engine.
//!
//! Starting from the reference cell, each dimension rule is folded into the
//! sequence of elements in the order the variable declares its dims. A fold
//! either widens the current blocks (step 1), or multiplies them by the
//! members of the dimension, shifting them along a row/column or assigning
//! them a sheet/file. Every fold builds a new sequence.

use crate::core::addressing::{absolute_range, quote_sheet_name, within_sheet, CellRef};
use crate::core::identifier::{IdentifierKind, Identifiers};
use crate::error::{E2vError, E2vResult};
use crate::subscripts::SubscriptRegistry;
use crate::types::{DimensionRule, ReadAlong, Step};
use tracing::debug;

/// One block of cells while the layout is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub subs: Vec<String>,
    pub rows: (u32, u32),
    pub cols: (u32, u32),
    pub sheet: Option<String>,
    pub file: Option<String>,
    pub cellname: String,
}

impl Element {
    pub fn origin(origin: CellRef, base_name: &str) -> Self {
        Self {
            subs: Vec::new(),
            rows: (origin.row, origin.row),
            cols: (origin.col, origin.col),
            sheet: None,
            file: None,
            cellname: base_name.to_string(),
        }
    }

    fn extent_mut(&mut self, axis: ReadAlong) -> &mut (u32, u32) {
        match axis {
            ReadAlong::Row => &mut self.rows,
            _ => &mut self.cols,
        }
    }

    /// Grow the block along `axis` by `cells` positions.
    ///
    /// `None` when the far edge does not fit in a `u32`.
    pub fn extended(&self, axis: ReadAlong, cells: u32) -> Option<Self> {
        let mut out = self.clone();
        let extent = out.extent_mut(axis);
        extent.1 = extent.1.checked_add(cells)?;
        Some(out)
    }

    /// Move the whole block `offset` positions along `axis`.
    pub fn shifted(&self, axis: ReadAlong, offset: u32) -> Option<Self> {
        let mut out = self.clone();
        let extent = out.extent_mut(axis);
        extent.0 = extent.0.checked_add(offset)?;
        extent.1 = extent.1.checked_add(offset)?;
        Some(out)
    }

    fn with_sub(mut self, sub: &str) -> Self {
        self.subs.push(sub.to_string());
        self
    }
}

fn off_sheet(element: &Element, axis: ReadAlong) -> E2vError {
    E2vError::Layout(format!(
        "cellrange '{}' runs past the last {} of the sheet",
        element.cellname,
        if axis == ReadAlong::Row { "row" } else { "column" }
    ))
}

/// Step 1: append the range name itself and widen every block to cover all members.
pub fn fold_whole(
    elements: &[Element],
    dim: &str,
    axis: ReadAlong,
    members: usize,
) -> E2vResult<Vec<Element>> {
    let width = u32::try_from(members.saturating_sub(1)).unwrap_or(u32::MAX);
    elements
        .iter()
        .map(|element| {
            element
                .extended(axis, width)
                .map(|out| out.with_sub(dim))
                .ok_or_else(|| off_sheet(element, axis))
        })
        .collect()
}

/// Step N: one block per member, member `i` shifted `i * step` along `axis`.
///
/// `names` are the cleaned members appended to the cellrange names.
pub fn fold_spaced(
    elements: &[Element],
    members: &[String],
    names: &[String],
    axis: ReadAlong,
    step: u32,
) -> E2vResult<Vec<Element>> {
    elements
        .iter()
        .flat_map(move |element| {
            members
                .iter()
                .zip(names)
                .zip(0u32..)
                .map(move |((member, name), idx)| -> E2vResult<Element> {
                    let mut out = idx
                        .checked_mul(step)
                        .and_then(|offset| element.shifted(axis, offset))
                        .ok_or_else(|| off_sheet(element, axis))?
                        .with_sub(member);
                    out.cellname = format!("{}_{}", out.cellname, name);
                    Ok(out)
                })
        })
        .collect()
}

/// Sheet/file list: one block per member, placed in the matching sheet or file.
pub fn fold_spread(
    elements: &[Element],
    members: &[String],
    axis: ReadAlong,
    targets: &[String],
) -> Vec<Element> {
    elements
        .iter()
        .flat_map(move |element| {
            members.iter().zip(targets).map(move |(member, target)| {
                let mut out = element.clone().with_sub(member);
                match axis {
                    ReadAlong::Sheet => out.sheet = Some(target.clone()),
                    _ => out.file = Some(target.clone()),
                }
                out
            })
        })
        .collect()
}

/// Everything the engine needs to lay out one variable.
#[derive(Debug, Clone)]
pub struct LayoutSpec<'a> {
    /// Cleaned variable name, prefix of every cellrange name.
    pub base_name: &'a str,
    pub origin: CellRef,
    pub sheet: Option<&'a str>,
    pub file: Option<&'a str>,
    /// Rules in declaration order.
    pub rules: &'a [DimensionRule],
    /// Axis and length of the x/time series the data runs along.
    pub series: Option<(ReadAlong, u32)>,
}

/// A finished block with its sheet, file, name and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBlock {
    pub subs: Vec<String>,
    pub rows: (u32, u32),
    pub cols: (u32, u32),
    pub sheet: String,
    pub file: String,
    pub name: String,
    /// `SHEET!$A$1:$B$2`
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub blocks: Vec<CellBlock>,
    /// Row/col axes visited with step 1, in visiting order.
    pub natural_axes: Vec<ReadAlong>,
}

impl Layout {
    /// Whether a constants table must be read transposed (`*` suffix).
    ///
    /// Vensim reads a 1-D range along columns and a 2-D range with the first
    /// dimension down the rows.
    pub fn is_transposed(&self) -> bool {
        matches!(
            self.natural_axes.as_slice(),
            [ReadAlong::Row] | [ReadAlong::Col, ReadAlong::Row]
        )
    }

    /// Distinct `(sheet, file)` pairs in first-appearance order.
    pub fn locations(&self) -> Vec<(&str, &str)> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        for block in &self.blocks {
            let pair = (block.sheet.as_str(), block.file.as_str());
            if !seen.contains(&pair) {
                seen.push(pair);
            }
        }
        seen
    }
}

/// Expand the dimension rules of a variable into its cell blocks.
///
/// # Errors
/// Fails on unknown subscript ranges, on two step-1 dimensions along the same
/// row/col axis, on two dimensions along sheet or file, and when no sheet or
/// file is known for the blocks.
pub fn build_layout(
    spec: &LayoutSpec<'_>,
    registry: &SubscriptRegistry,
    identifiers: &mut Identifiers,
) -> E2vResult<Layout> {
    let mut first = Element::origin(spec.origin, spec.base_name);
    let mut visited: Vec<ReadAlong> = Vec::new();

    if let Some((axis, length)) = spec.series {
        first = first
            .extended(axis, length.saturating_sub(1))
            .ok_or_else(|| off_sheet(&first, axis))?;
        visited.push(axis);
    }

    let mut elements = vec![first];
    for rule in spec.rules {
        let members = registry.get(&rule.name)?;
        elements = match (&rule.step, rule.read_along.is_grid()) {
            (Step::Whole, true) => {
                visited.push(rule.read_along);
                fold_whole(&elements, &rule.name, rule.read_along, members.len())?
            }
            (Step::Spacing(step), true) => {
                let names = members
                    .iter()
                    .map(|m| identifiers.clean(m, IdentifierKind::Subscript))
                    .collect::<E2vResult<Vec<_>>>()?;
                fold_spaced(&elements, members, &names, rule.read_along, *step)?
            }
            (Step::Targets(targets), false) => {
                visited.push(rule.read_along);
                fold_spread(&elements, members, rule.read_along, targets)
            }
            _ => {
                return Err(E2vError::config(format!(
                    "dimension '{}' read along {} has an incompatible step {:?}",
                    rule.name, rule.read_along, rule.step
                )))
            }
        };
    }

    for axis in [ReadAlong::Col, ReadAlong::Row] {
        if visited.iter().filter(|v| **v == axis).count() > 1 {
            return Err(E2vError::Layout(format!(
                "Two or more dimensions are defined along {} with step 1.",
                axis
            )));
        }
    }

    for (axis, default) in [(ReadAlong::File, spec.file), (ReadAlong::Sheet, spec.sheet)] {
        match visited.iter().filter(|v| **v == axis).count() {
            0 => {
                let default = default.ok_or_else(|| {
                    E2vError::config(format!(
                        "'{}' needs a {} unless one of its dimensions is read along {}",
                        spec.base_name, axis, axis
                    ))
                })?;
                for element in &mut elements {
                    match axis {
                        ReadAlong::Sheet => element.sheet = Some(default.to_string()),
                        _ => element.file = Some(default.to_string()),
                    }
                }
            }
            1 => {}
            _ => {
                return Err(E2vError::Layout(format!(
                    "Two or more dimensions are defined along {}.",
                    axis
                )))
            }
        }
    }

    let blocks = elements.into_iter().map(finish).collect::<E2vResult<Vec<_>>>()?;
    debug!("laid out '{}' in {} cellranges", spec.base_name, blocks.len());

    Ok(Layout {
        blocks,
        natural_axes: visited.into_iter().filter(|v| v.is_grid()).collect(),
    })
}

fn finish(element: Element) -> E2vResult<CellBlock> {
    if !within_sheet(element.rows, element.cols) {
        return Err(E2vError::Layout(format!(
            "cellrange '{}' ends at {} which is outside the sheet (last cell is XFD1048576)",
            element.cellname,
            CellRef::new(element.rows.1, element.cols.1)
        )));
    }
    let (Some(sheet), Some(file)) = (element.sheet, element.file) else {
        return Err(E2vError::Layout(format!(
            "cellrange '{}' has no sheet or file",
            element.cellname
        )));
    };

    Ok(CellBlock {
        address: format!(
            "{}!{}",
            quote_sheet_name(&sheet),
            absolute_range(element.rows, element.cols)
        ),
        subs: element.subs,
        rows: element.rows,
        cols: element.cols,
        sheet,
        file,
        name: element.cellname,
    })
}
