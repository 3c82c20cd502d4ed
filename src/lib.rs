//! excels2vensim - Vensim GET DIRECT/XLS equations from Excel cellranges
//!
//! This library lays out subscripted Vensim variables over spreadsheet cells,
//! defines the matching cellrange names in the workbooks and produces the
//! equations that read them.
//!
//! # Features
//!
//! - Constants, data and lookups (`GET_DIRECT_*` / `GET_XLS_*`)
//! - Dimensions along rows, columns, sheets or files, with spacing
//! - Subscript ranges from JSON or from a Vensim `.mdl` model
//! - JSON and YAML configuration validated against a JSON Schema
//! - Names saved into `.xlsx` files without touching the cell data
//!
//! # Example
//!
//! ```no_run
//! use excels2vensim::excel::Excels;
//! use excels2vensim::session::Session;
//! use excels2vensim::subscripts::SubscriptRegistry;
//! use excels2vensim::types::{ExternalVariable, ReadAlong, Step, VariableKind};
//! use std::path::Path;
//!
//! let registry = SubscriptRegistry::load(Path::new("subscripts.json"))?;
//! let mut var = ExternalVariable::new(VariableKind::Constants, "var1", &["source"], "A24")?
//!     .in_file("inputs.xlsx")
//!     .in_sheet("Region1");
//! var.add_dimension(&registry, "source", ReadAlong::Col, Step::Whole)?;
//!
//! let mut session = Session::new(registry, Excels::xlsx());
//! let equations = session.execute_all(&[var])?;
//! session.finish()?;
//! println!("{}", equations);
//! # Ok::<(), excels2vensim::error::E2vError>(())
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod excel;
pub mod parser;
pub mod session;
pub mod subscripts;
pub mod types;

// Re-export commonly used types
pub use error::{E2vError, E2vResult};
pub use session::{Session, VariablePlan};
pub use types::{ExternalVariable, Loading, ReadAlong, Step, VariableKind};
