//! Cell-range layout and Vensim equation generation.
//!
//! - `addressing`: column letters and A1 references
//! - `identifier`: cellrange-safe names and their warnings
//! - `layout`: expansion of dimension rules into cell blocks
//! - `series`: x/time ranges replicated per sheet/file
//! - `emitter`: equation text

pub mod addressing;
pub mod emitter;
pub mod identifier;
pub mod layout;
pub mod series;

pub use addressing::{column_to_number, number_to_column, parse_address, parse_cell, CellRef};
pub use identifier::{clean_identifier, IdentifierKind, Identifiers, SanitizeWarning};
pub use layout::{build_layout, CellBlock, Layout, LayoutSpec};
pub use series::{replicate_series, SeriesRange};
