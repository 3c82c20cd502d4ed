//! Vensim equation text for GET DIRECT/XLS CONSTANTS, DATA and LOOKUPS.
//!
//! Each cell block gives one equation line; the lines of a variable share the
//! units and description footer.

use crate::core::layout::CellBlock;
use crate::types::{Interpolation, Loading};

/// Separator closing every equation but the last of a variable.
const LINE_END: &str = " ~~|";

fn left_hand_side(name: &str, subs: &[String]) -> String {
    if subs.is_empty() {
        name.to_string()
    } else {
        format!("{}[{}]", name, subs.join(", "))
    }
}

/// `NAME[subs]=\n\tGET_DIRECT_CONSTANTS('file', 'sheet', 'cellname') ~~|`
///
/// With `transpose` the cellrange name gets the `*` suffix.
pub fn constants_equation(name: &str, block: &CellBlock, loading: Loading, transpose: bool) -> String {
    let marker = if transpose { "*" } else { "" };
    format!(
        "{}=\n\tGET_{}_CONSTANTS('{}', '{}', '{}{}'){}",
        left_hand_side(name, &block.subs),
        loading,
        block.file,
        block.sheet,
        block.name,
        marker,
        LINE_END
    )
}

/// `NAME[subs]:=` or `NAME[subs]:KEYWORD::=` followed by GET_*_DATA.
pub fn data_equation(
    name: &str,
    block: &CellBlock,
    series_name: &str,
    loading: Loading,
    interp: Option<Interpolation>,
) -> String {
    let assign = match interp {
        Some(keyword) => format!(":{}::=", keyword.keyword()),
        None => ":=".to_string(),
    };
    format!(
        "{}{}\n\tGET_{}_DATA('{}', '{}', '{}', '{}'){}",
        left_hand_side(name, &block.subs),
        assign,
        loading,
        block.file,
        block.sheet,
        series_name,
        block.name,
        LINE_END
    )
}

pub fn lookups_equation(name: &str, block: &CellBlock, series_name: &str, loading: Loading) -> String {
    format!(
        "{}=\n\tGET_{}_LOOKUPS('{}', '{}', '{}', '{}'){}",
        left_hand_side(name, &block.subs),
        loading,
        block.file,
        block.sheet,
        series_name,
        block.name,
        LINE_END
    )
}

/// Join the lines of one variable and close them with units and description.
pub fn join_equations(lines: &[String], units: &str, description: &str) -> String {
    let joined = lines.join("\n");
    let body = joined.strip_suffix(LINE_END).unwrap_or(&joined);
    format!("{}\n\t~\t{}\n\t~\t{}\n\t|", body, units, description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(subs: &[&str], name: &str) -> CellBlock {
        CellBlock {
            subs: subs.iter().map(|s| s.to_string()).collect(),
            rows: (0, 0),
            cols: (0, 0),
            sheet: "GPH".to_string(),
            file: "inputs.xlsx".to_string(),
            name: name.to_string(),
            address: String::new(),
        }
    }

    #[test]
    fn test_constants_equation() {
        let line = constants_equation("q_row", &block(&["source"], "q_row"), Loading::Direct, false);
        assert_eq!(
            line,
            "q_row[source]=\n\tGET_DIRECT_CONSTANTS('inputs.xlsx', 'GPH', 'q_row') ~~|"
        );
    }

    #[test]
    fn test_constants_transposed_marker() {
        let line = constants_equation("q", &block(&["source"], "q"), Loading::Xls, true);
        assert!(line.ends_with("GET_XLS_CONSTANTS('inputs.xlsx', 'GPH', 'q*') ~~|"));
    }

    #[test]
    fn test_data_equation_keyword_clause() {
        let b = block(&["age", "EU27"], "var2");
        let with = data_equation("var2", &b, "year", Loading::Direct, Some(Interpolation::HoldBackward));
        assert!(with.starts_with("var2[age, EU27]:HOLD BACKWARD::=\n\t"));
        let without = data_equation("var2", &b, "year", Loading::Direct, None);
        assert!(without.starts_with("var2[age, EU27]:=\n\tGET_DIRECT_DATA('inputs.xlsx', 'GPH', 'year', 'var2')"));
    }

    #[test]
    fn test_lookups_equation() {
        let line = lookups_equation("v", &block(&["a"], "v_a"), "year", Loading::Direct);
        assert_eq!(
            line,
            "v[a]=\n\tGET_DIRECT_LOOKUPS('inputs.xlsx', 'GPH', 'year', 'v_a') ~~|"
        );
    }

    #[test]
    fn test_scalar_has_no_brackets() {
        let line = constants_equation("k", &block(&[], "k"), Loading::Direct, false);
        assert!(line.starts_with("k=\n"));
    }

    #[test]
    fn test_join_strips_last_separator() {
        let lines = vec!["a[x]=\n\tA ~~|".to_string(), "a[y]=\n\tB ~~|".to_string()];
        assert_eq!(
            join_equations(&lines, "Twh", "my variable"),
            "a[x]=\n\tA ~~|\na[y]=\n\tB\n\t~\tTwh\n\t~\tmy variable\n\t|"
        );
    }
}
