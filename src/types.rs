use crate::core::addressing::CellRef;
use crate::error::{E2vError, E2vResult};
use crate::subscripts::SubscriptRegistry;
use std::fmt;
use std::str::FromStr;

//==============================================================================
// Layout keywords
//==============================================================================

/// Spreadsheet axis a dimension (or a series) is read along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadAlong {
    Row,
    Col,
    Sheet,
    File,
}

impl ReadAlong {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadAlong::Row => "row",
            ReadAlong::Col => "col",
            ReadAlong::Sheet => "sheet",
            ReadAlong::File => "file",
        }
    }

    /// Row and column are the table axes; sheet and file select where the table is.
    pub fn is_grid(self) -> bool {
        matches!(self, ReadAlong::Row | ReadAlong::Col)
    }
}

impl fmt::Display for ReadAlong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadAlong {
    type Err = E2vError;

    fn from_str(s: &str) -> E2vResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "row" => Ok(ReadAlong::Row),
            "col" => Ok(ReadAlong::Col),
            "sheet" => Ok(ReadAlong::Sheet),
            "file" => Ok(ReadAlong::File),
            _ => Err(E2vError::config(format!(
                "read_along must be 'row', 'col', 'sheet' or 'file', got '{}'",
                s
            ))),
        }
    }
}

/// How the members of a dimension are laid out along its axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Step 1: one range covers the whole dimension.
    Whole,
    /// Rows or columns between consecutive members (always > 1).
    Spacing(u32),
    /// One sheet name or file path per member.
    Targets(Vec<String>),
}

impl Step {
    /// Build a numeric step, folding `1` into [`Step::Whole`].
    pub fn from_number(step: u32) -> E2vResult<Self> {
        match step {
            0 => Err(E2vError::config("the step between subscripts must be at least 1")),
            1 => Ok(Step::Whole),
            n => Ok(Step::Spacing(n)),
        }
    }
}

/// Placement of one dimension of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionRule {
    pub name: String,
    pub read_along: ReadAlong,
    pub step: Step,
}

/// Vensim GET function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Loading {
    #[default]
    Direct,
    Xls,
}

impl fmt::Display for Loading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Loading::Direct => "DIRECT",
            Loading::Xls => "XLS",
        })
    }
}

impl FromStr for Loading {
    type Err = E2vError;

    fn from_str(s: &str) -> E2vResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "DIRECT" => Ok(Loading::Direct),
            "XLS" => Ok(Loading::Xls),
            _ => Err(E2vError::config(format!(
                "loading must be 'DIRECT' or 'XLS', got '{}'",
                s
            ))),
        }
    }
}

/// Interpolation keyword of GET DATA equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Interpolate,
    Raw,
    HoldBackward,
    LookForward,
}

impl Interpolation {
    pub fn keyword(self) -> &'static str {
        match self {
            Interpolation::Interpolate => "INTERPOLATE",
            Interpolation::Raw => "RAW",
            Interpolation::HoldBackward => "HOLD BACKWARD",
            Interpolation::LookForward => "LOOK FORWARD",
        }
    }
}

impl FromStr for Interpolation {
    type Err = E2vError;

    /// Accepts Vensim keywords in any case, with `_` standing for spaces.
    fn from_str(s: &str) -> E2vResult<Self> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "INTERPOLATE" => Ok(Interpolation::Interpolate),
            "RAW" => Ok(Interpolation::Raw),
            "HOLD BACKWARD" => Ok(Interpolation::HoldBackward),
            "LOOK FORWARD" => Ok(Interpolation::LookForward),
            _ => Err(E2vError::config(format!(
                "interp must be 'interpolate', 'raw', 'hold backward' or 'look forward', got '{}'",
                s
            ))),
        }
    }
}

//==============================================================================
// Variables
//==============================================================================

/// The x (lookups) or time (data) axis of a series variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDescriptor {
    pub name: String,
    pub cell: CellRef,
    pub read_along: ReadAlong,
    pub length: u32,
}

impl SeriesDescriptor {
    /// # Errors
    /// Fails for a malformed cell, an axis other than row/col, or a zero length.
    pub fn new(name: &str, cell: &str, read_along: ReadAlong, length: u32) -> E2vResult<Self> {
        if !read_along.is_grid() {
            return Err(E2vError::config(format!(
                "read_along must be 'row' or 'col' for the series '{}', got '{}'",
                name.trim(),
                read_along
            )));
        }
        if length == 0 {
            return Err(E2vError::config(format!(
                "the length of the series '{}' must be at least 1",
                name.trim()
            )));
        }

        Ok(Self {
            name: name.trim().to_string(),
            cell: cell.parse()?,
            read_along,
            length,
        })
    }
}

/// Series variable flavours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesKind {
    Data { interp: Option<Interpolation> },
    Lookups,
}

/// What a variable reads from the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    Constants,
    Series {
        kind: SeriesKind,
        series: SeriesDescriptor,
    },
}

impl VariableKind {
    /// A GET DATA variable; `interp` is validated here, before any layout runs.
    pub fn data(series: SeriesDescriptor, interp: Option<&str>) -> E2vResult<Self> {
        let interp = interp
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<Interpolation>)
            .transpose()?;
        Ok(VariableKind::Series {
            kind: SeriesKind::Data { interp },
            series,
        })
    }

    pub fn lookups(series: SeriesDescriptor) -> Self {
        VariableKind::Series {
            kind: SeriesKind::Lookups,
            series,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            VariableKind::Constants => "constants",
            VariableKind::Series {
                kind: SeriesKind::Data { .. },
                ..
            } => "data",
            VariableKind::Series {
                kind: SeriesKind::Lookups,
                ..
            } => "lookups",
        }
    }
}

/// A Vensim variable read from spreadsheet cell ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub cell: CellRef,
    pub description: String,
    pub units: String,
    pub file: Option<String>,
    pub sheet: Option<String>,
    pub kind: VariableKind,
    pub force: bool,
    pub loading: Loading,
    rules: Vec<DimensionRule>,
}

impl ExternalVariable {
    /// Create a variable anchored at `cell` (upper-left data cell).
    ///
    /// # Errors
    /// Fails for a malformed cell or a dimension declared twice.
    pub fn new(kind: VariableKind, name: &str, dims: &[&str], cell: &str) -> E2vResult<Self> {
        let name = name.trim().to_string();
        let dims: Vec<String> = dims.iter().map(|d| d.trim().to_string()).collect();

        for (idx, dim) in dims.iter().enumerate() {
            if dims[..idx].contains(dim) {
                return Err(E2vError::config(format!(
                    "dimension '{}' is declared twice for '{}'",
                    dim, name
                )));
            }
        }

        let cell = cell.parse().map_err(|_| {
            E2vError::config(format!(
                "'{}' is not a valid reference cell for '{}'",
                cell, name
            ))
        })?;

        Ok(Self {
            name,
            dims,
            cell,
            description: String::new(),
            units: String::new(),
            file: None,
            sheet: None,
            kind,
            force: false,
            loading: Loading::Direct,
            rules: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.trim().to_string();
        self
    }

    pub fn in_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn in_sheet(mut self, sheet: &str) -> Self {
        self.sheet = Some(sheet.to_string());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_loading(mut self, loading: Loading) -> Self {
        self.loading = loading;
        self
    }

    /// Place one of the variable's dimensions.
    ///
    /// Adding a rule for a dimension that already has one replaces it.
    ///
    /// # Errors
    /// Fails when the dimension is not a registry entry or not one of the
    /// variable's dims, or when the step does not suit the axis.
    pub fn add_dimension(
        &mut self,
        registry: &SubscriptRegistry,
        name: &str,
        read_along: ReadAlong,
        step: Step,
    ) -> E2vResult<()> {
        let name = name.trim();
        let members = registry.get(name)?;

        if !self.dims.iter().any(|d| d == name) {
            return Err(E2vError::config(format!(
                "'{}' is not a dimension of '{}', its dimensions are [{}]",
                name,
                self.name,
                self.dims.join(", ")
            )));
        }

        match (&step, read_along.is_grid()) {
            (Step::Targets(_), true) => {
                return Err(E2vError::config(format!(
                    "dimension '{}' is read along {}, its step must be a number of {}s, not a list",
                    name, read_along, read_along
                )));
            }
            (Step::Whole | Step::Spacing(_), false) => {
                return Err(E2vError::config(format!(
                    "dimension '{}' is read along {}, it needs the list of {}s of each subscript",
                    name, read_along, read_along
                )));
            }
            (Step::Targets(targets), false) if targets.len() != members.len() => {
                return Err(E2vError::config(format!(
                    "dimension '{}' has {} subscripts but {} {}s were given",
                    name,
                    members.len(),
                    targets.len(),
                    read_along
                )));
            }
            _ => {}
        }

        let rule = DimensionRule {
            name: name.to_string(),
            read_along,
            step,
        };
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        Ok(())
    }

    /// Dimension rules in the order the dims were declared.
    ///
    /// # Errors
    /// Fails if any declared dimension has no rule.
    pub fn ordered_rules(&self) -> E2vResult<Vec<DimensionRule>> {
        self.dims
            .iter()
            .map(|dim| {
                self.rules
                    .iter()
                    .find(|r| &r.name == dim)
                    .cloned()
                    .ok_or_else(|| {
                        E2vError::config(format!(
                            "dimension '{}' of '{}' has no read_along information",
                            dim, self.name
                        ))
                    })
            })
            .collect()
    }

    pub fn series(&self) -> Option<&SeriesDescriptor> {
        match &self.kind {
            VariableKind::Constants => None,
            VariableKind::Series { series, .. } => Some(series),
        }
    }
}
