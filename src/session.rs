//! One run of the generator.
//!
//! A `Session` owns the subscript registry, the workbook cache and the
//! identifier warnings for a whole run. Variables are planned (layout,
//! cellrange names, equation text) and then written into their workbooks;
//! nothing reaches disk before [`Session::finish`].

use crate::core::emitter::{constants_equation, data_equation, join_equations, lookups_equation};
use crate::core::identifier::{IdentifierKind, Identifiers, SanitizeWarning};
use crate::core::layout::{build_layout, Layout, LayoutSpec};
use crate::core::series::{replicate_series, SeriesRange};
use crate::error::{E2vError, E2vResult};
use crate::excel::{write_cellrange, Excels, WriteOutcome};
use crate::subscripts::SubscriptRegistry;
use crate::types::{ExternalVariable, SeriesKind, VariableKind};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// A cellrange name to define in a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRange {
    pub name: String,
    pub file: String,
    pub sheet: String,
    pub address: String,
}

impl From<SeriesRange> for PlannedRange {
    fn from(range: SeriesRange) -> Self {
        Self {
            name: range.name,
            file: range.file,
            sheet: range.sheet,
            address: range.address,
        }
    }
}

/// Everything computed for one variable before touching any workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePlan {
    pub variable: String,
    pub layout: Layout,
    /// Series copies first, then the data blocks.
    pub ranges: Vec<PlannedRange>,
    /// The variable's block of Vensim equations.
    pub equations: String,
}

/// Counts of write outcomes over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    pub unchanged: usize,
    pub replaced: usize,
}

impl Tally {
    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Created => self.created += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
            WriteOutcome::Replaced => self.replaced += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.unchanged + self.replaced
    }
}

/// A cellrange name may appear once per (file, sheet), or repeat with the same address.
fn check_unique_names(variable: &str, ranges: &[PlannedRange]) -> E2vResult<()> {
    let mut seen: HashMap<(&str, String, String), &str> = HashMap::new();
    for range in ranges {
        let key = (
            range.file.as_str(),
            range.sheet.to_lowercase(),
            range.name.to_lowercase(),
        );
        match seen.get(&key) {
            Some(first) if *first != range.address => {
                return Err(E2vError::Layout(format!(
                    "'{}' would define the cellrange '{}' twice in '{}': '{}' and '{}'. \
                     Rename the subscripts or the series so their cleaned names differ.",
                    variable, range.name, range.file, first, range.address
                )));
            }
            Some(_) => {}
            None => {
                seen.insert(key, &range.address);
            }
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct Session {
    registry: SubscriptRegistry,
    excels: Excels,
    identifiers: Identifiers,
    tally: Tally,
}

impl Session {
    pub fn new(registry: SubscriptRegistry, excels: Excels) -> Self {
        Self {
            registry,
            excels,
            identifiers: Identifiers::new(),
            tally: Tally::default(),
        }
    }

    pub fn registry(&self) -> &SubscriptRegistry {
        &self.registry
    }

    pub fn excels(&self) -> &Excels {
        &self.excels
    }

    /// Sanitization warnings collected so far.
    pub fn warnings(&self) -> &[SanitizeWarning] {
        self.identifiers.warnings()
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Lay out `variable` and build its equations without writing anything.
    ///
    /// # Errors
    /// Layout and naming errors of the variable.
    pub fn plan(&mut self, variable: &ExternalVariable) -> E2vResult<VariablePlan> {
        let base_name = self.identifiers.clean(&variable.name, IdentifierKind::Variable)?;
        let series_name = variable
            .series()
            .map(|series| self.identifiers.clean(&series.name, IdentifierKind::Series))
            .transpose()?;
        let rules = variable.ordered_rules()?;

        let spec = LayoutSpec {
            base_name: &base_name,
            origin: variable.cell,
            sheet: variable.sheet.as_deref(),
            file: variable.file.as_deref(),
            rules: &rules,
            series: variable.series().map(|s| (s.read_along, s.length)),
        };
        let layout = build_layout(&spec, &self.registry, &mut self.identifiers);
        self.announce_warnings();
        let layout = layout?;

        let mut ranges: Vec<PlannedRange> = Vec::new();
        let lines: Vec<String> = match (&variable.kind, series_name) {
            (VariableKind::Series { kind, series }, Some(series_name)) => {
                ranges.extend(
                    replicate_series(&series_name, series, &layout)?
                        .into_iter()
                        .map(PlannedRange::from),
                );
                layout
                    .blocks
                    .iter()
                    .map(|block| match kind {
                        SeriesKind::Data { interp } => {
                            data_equation(&variable.name, block, &series_name, variable.loading, *interp)
                        }
                        SeriesKind::Lookups => {
                            lookups_equation(&variable.name, block, &series_name, variable.loading)
                        }
                    })
                    .collect()
            }
            _ => {
                let transpose = layout.is_transposed();
                layout
                    .blocks
                    .iter()
                    .map(|block| constants_equation(&variable.name, block, variable.loading, transpose))
                    .collect()
            }
        };

        ranges.extend(layout.blocks.iter().map(|block| PlannedRange {
            name: block.name.clone(),
            file: block.file.clone(),
            sheet: block.sheet.clone(),
            address: block.address.clone(),
        }));
        check_unique_names(&variable.name, &ranges)?;

        Ok(VariablePlan {
            variable: variable.name.clone(),
            equations: join_equations(&lines, &variable.units, &variable.description),
            layout,
            ranges,
        })
    }

    /// Plan `variable` and define its cellranges in the cached workbooks.
    ///
    /// Stops at the first failing write; ranges written before it stay in
    /// the cache.
    pub fn execute(&mut self, variable: &ExternalVariable) -> E2vResult<VariablePlan> {
        let plan = self.plan(variable)?;

        for range in &plan.ranges {
            let workbook = self.excels.read(Path::new(&range.file))?;
            let outcome = write_cellrange(workbook, &range.name, &range.sheet, &range.address, variable.force)?;
            self.tally.record(outcome);
        }

        debug!(
            "{} '{}': {} cellranges",
            variable.kind.type_name(),
            variable.name,
            plan.ranges.len()
        );
        Ok(plan)
    }

    /// Execute every variable in order; returns the equation blocks joined by a blank line.
    pub fn execute_all(&mut self, variables: &[ExternalVariable]) -> E2vResult<String> {
        let blocks = variables
            .iter()
            .map(|variable| self.execute(variable).map(|plan| plan.equations))
            .collect::<E2vResult<Vec<_>>>()?;
        Ok(blocks.join("\n\n"))
    }

    /// Like [`Session::execute_all`] without writing to any workbook.
    pub fn plan_all(&mut self, variables: &[ExternalVariable]) -> E2vResult<String> {
        let blocks = variables
            .iter()
            .map(|variable| self.plan(variable).map(|plan| plan.equations))
            .collect::<E2vResult<Vec<_>>>()?;
        Ok(blocks.join("\n\n"))
    }

    /// Save every workbook touched during the run.
    pub fn finish(&mut self) -> E2vResult<()> {
        self.excels.save_and_close()
    }

    /// Drop all pending workbook changes.
    pub fn discard(&mut self) {
        self.excels.discard();
    }

    fn announce_warnings(&mut self) {
        for warning in self.identifiers.drain_new() {
            warn!("{}", warning);
        }
    }
}
