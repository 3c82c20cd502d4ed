//! Layout and equation tests through the public API
//!
//! Variables are planned against in-memory workbooks, so nothing here
//! touches the filesystem.

use excels2vensim::core::{column_to_number, number_to_column, parse_cell, CellRef};
use excels2vensim::excel::{Excels, MemorySource, MemoryWorkbook};
use excels2vensim::session::Session;
use excels2vensim::subscripts::SubscriptRegistry;
use excels2vensim::types::{ExternalVariable, ReadAlong, SeriesDescriptor, Step, VariableKind};
use excels2vensim::E2vError;
use pretty_assertions::assert_eq;
use std::path::Path;

fn registry() -> SubscriptRegistry {
    SubscriptRegistry::from_ranges([
        ("source", vec!["gas", "coal", "wind"]),
        ("destination", vec!["Elec/el", "heat", "transport", "industry"]),
        ("region", vec!["EU27", "UK"]),
        ("age", vec!["young", "old"]),
    ])
}

fn session() -> Session {
    let source = MemorySource::new().with_workbook(
        "inputs.xlsx",
        MemoryWorkbook::new(&["Region1", "EU27", "UK"]),
    );
    Session::new(registry(), Excels::new(source))
}

fn constants(name: &str, dims: &[&str], cell: &str) -> ExternalVariable {
    ExternalVariable::new(VariableKind::Constants, name, dims, cell)
        .unwrap()
        .in_file("inputs.xlsx")
        .in_sheet("Region1")
}

// ═══════════════════════════════════════════════════════════════════════════
// CELL ADDRESSING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_column_round_trip_up_to_three_letters() {
    // 26 + 26^2 + 26^3 names of one to three letters
    for n in 0..18_278u32 {
        let col = number_to_column(n);
        assert!(col.len() <= 3, "{} -> {}", n, col);
        assert_eq!(column_to_number(&col), Some(n), "{}", col);
        assert_eq!(column_to_number(&col.to_lowercase()), Some(n), "{}", col);
    }
    assert_eq!(number_to_column(18_277), "ZZZ");
    assert_eq!(number_to_column(18_278), "AAAA");
    assert_eq!(column_to_number("XFD"), Some(16_383));
}

#[test]
fn test_parse_cell_rejects_malformed() {
    for bad in ["A2A", "H0", "0", "5A", "A_1", "ZZZZ1", "A", ""] {
        assert_eq!(parse_cell(bad), None, "{} should not parse", bad);
    }
}

#[test]
fn test_parse_cell_accepts() {
    assert_eq!(parse_cell("A2"), Some(CellRef::new(1, 0)));
    assert_eq!(parse_cell("h574"), Some(CellRef::new(573, 7)));
    assert_eq!(parse_cell("Va2"), Some(CellRef::new(1, 572)));
    assert_eq!(parse_cell("ABA2"), Some(CellRef::new(1, 728)));
}

// ═══════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_one_dimension_along_columns() {
    let mut s = session();
    let mut var = constants("q_row", &["source"], "A24");
    var.add_dimension(s.registry(), "source", ReadAlong::Col, Step::Whole)
        .unwrap();

    let plan = s.plan(&var).unwrap();
    assert_eq!(plan.layout.blocks.len(), 1);
    assert_eq!(plan.layout.blocks[0].address, "Region1!$A$24:$C$24");
    assert_eq!(
        plan.equations,
        "q_row[source]=\n\tGET_DIRECT_CONSTANTS('inputs.xlsx', 'Region1', 'q_row')\n\t~\t\n\t~\t\n\t|"
    );
}

#[test]
fn test_one_dimension_along_rows_is_transposed() {
    let mut s = session();
    let mut var = constants("q_col", &["source"], "A24");
    var.add_dimension(s.registry(), "source", ReadAlong::Row, Step::Whole)
        .unwrap();

    let plan = s.plan(&var).unwrap();
    assert_eq!(plan.layout.blocks[0].address, "Region1!$A$24:$A$26");
    assert!(plan.equations.contains("'q_col*')"));
    // the cellrange itself keeps the plain name
    assert_eq!(plan.ranges[0].name, "q_col");
}

#[test]
fn test_table_orientation() {
    let mut s = session();

    let mut cols_first = constants("t1", &["source", "destination"], "B2");
    cols_first
        .add_dimension(s.registry(), "source", ReadAlong::Col, Step::Whole)
        .unwrap();
    cols_first
        .add_dimension(s.registry(), "destination", ReadAlong::Row, Step::Whole)
        .unwrap();
    let plan = s.plan(&cols_first).unwrap();
    assert_eq!(plan.layout.blocks[0].address, "Region1!$B$2:$D$5");
    assert!(plan.equations.contains("'t1*')"));

    let mut rows_first = constants("t2", &["destination", "source"], "B2");
    rows_first
        .add_dimension(s.registry(), "destination", ReadAlong::Row, Step::Whole)
        .unwrap();
    rows_first
        .add_dimension(s.registry(), "source", ReadAlong::Col, Step::Whole)
        .unwrap();
    let plan = s.plan(&rows_first).unwrap();
    assert_eq!(plan.layout.blocks[0].address, "Region1!$B$2:$D$5");
    assert!(plan.equations.contains("'t2')"));
}

#[test]
fn test_row_spacing_shifts_each_member() {
    let mut s = session();
    let mut var = constants("var", &["source", "destination"], "E5");
    var.add_dimension(s.registry(), "source", ReadAlong::Col, Step::Whole)
        .unwrap();
    var.add_dimension(s.registry(), "destination", ReadAlong::Row, Step::Spacing(17))
        .unwrap();

    let plan = s.plan(&var).unwrap();
    assert_eq!(plan.layout.blocks.len(), 4);
    for (i, block) in plan.layout.blocks.iter().enumerate() {
        let row = 4 + 17 * i as u32;
        assert_eq!(block.rows, (row, row));
        assert_eq!(block.cols, (4, 6));
    }
    assert_eq!(plan.layout.blocks[0].name, "var_Elec_el");
    assert_eq!(plan.layout.blocks[0].subs, vec!["source", "Elec/el"]);
    // spacing does not count as a step-1 axis, so no transposition
    assert!(!plan.equations.contains('*'));
}

#[test]
fn test_two_step_one_dimensions_on_one_axis_fail() {
    let mut s = session();
    let mut var = constants("bad", &["source", "region"], "A1");
    var.add_dimension(s.registry(), "source", ReadAlong::Col, Step::Whole)
        .unwrap();
    var.add_dimension(s.registry(), "region", ReadAlong::Col, Step::Whole)
        .unwrap();

    let err = s.execute(&var).unwrap_err();
    assert!(err
        .to_string()
        .contains("Two or more dimensions are defined along col with step 1."));
    assert!(!s.excels().is_open(Path::new("inputs.xlsx")));
}

#[test]
fn test_two_sheet_dimensions_fail() {
    let mut s = session();
    let mut var = ExternalVariable::new(VariableKind::Constants, "bad", &["region", "age"], "A1")
        .unwrap()
        .in_file("inputs.xlsx");
    var.add_dimension(
        s.registry(),
        "region",
        ReadAlong::Sheet,
        Step::Targets(vec!["EU27".into(), "UK".into()]),
    )
    .unwrap();
    var.add_dimension(
        s.registry(),
        "age",
        ReadAlong::Sheet,
        Step::Targets(vec!["EU27".into(), "UK".into()]),
    )
    .unwrap();

    let err = s.plan(&var).unwrap_err();
    assert!(err
        .to_string()
        .contains("Two or more dimensions are defined along sheet."));
}

#[test]
fn test_missing_sheet_is_a_config_error() {
    let mut s = session();
    let var = ExternalVariable::new(VariableKind::Constants, "k", &[], "A1")
        .unwrap()
        .in_file("inputs.xlsx");
    let err = s.plan(&var).unwrap_err();
    assert!(matches!(err, E2vError::Config(_)));
}

#[test]
fn test_unknown_dimension_lists_ranges() {
    let registry = registry();
    let mut var = constants("k", &["color"], "A1");
    let err = var
        .add_dimension(&registry, "color", ReadAlong::Col, Step::Whole)
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'color' is not in the list of subscript ranges:"));
    assert!(message.contains("source"));
}

// ═══════════════════════════════════════════════════════════════════════════
// NAME COLLISIONS AND SHEET LIMITS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_members_cleaning_to_one_name_fail_even_with_force() {
    let source = MemorySource::new().with_workbook("inputs.xlsx", MemoryWorkbook::new(&["Region1"]));
    let mut s = Session::new(
        SubscriptRegistry::from_ranges([("d", vec!["a b", "a-b"])]),
        Excels::new(source),
    );
    let mut var = constants("v", &["d"], "A1").with_force(true);
    var.add_dimension(s.registry(), "d", ReadAlong::Row, Step::Spacing(2))
        .unwrap();

    let err = s.plan(&var).unwrap_err();
    assert!(matches!(err, E2vError::Layout(_)));
    let message = err.to_string();
    assert!(message.contains("'v_a_b'"));
    assert!(message.contains("Region1!$A$1:$A$1"));
    assert!(message.contains("Region1!$A$3:$A$3"));

    assert!(s.execute(&var).is_err());
    assert!(!s.excels().is_open(Path::new("inputs.xlsx")));
}

#[test]
fn test_series_named_like_variable_fails() {
    let mut s = session();
    let series = SeriesDescriptor::new("v", "A2", ReadAlong::Row, 4).unwrap();
    let mut var = ExternalVariable::new(VariableKind::lookups(series), "v", &["source"], "B2")
        .unwrap()
        .in_file("inputs.xlsx")
        .in_sheet("Region1");
    var.add_dimension(s.registry(), "source", ReadAlong::Col, Step::Whole)
        .unwrap();

    let err = s.plan(&var).unwrap_err();
    assert!(err.to_string().contains("Region1!$A$2:$A$5"));
    assert!(err.to_string().contains("Region1!$B$2:$D$5"));
}

#[test]
fn test_same_name_in_different_sheets_is_fine() {
    let mut s = session();
    let mut var = constants("k", &["region"], "C3");
    var.add_dimension(
        s.registry(),
        "region",
        ReadAlong::Sheet,
        Step::Targets(vec!["EU27".into(), "UK".into()]),
    )
    .unwrap();

    let plan = s.plan(&var).unwrap();
    let names: Vec<&str> = plan.ranges.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["k", "k"]);
}

#[test]
fn test_huge_spacing_is_a_layout_error() {
    let mut s = session();
    let mut var = constants("v", &["source"], "A1");
    var.add_dimension(s.registry(), "source", ReadAlong::Row, Step::Spacing(3_000_000_000))
        .unwrap();

    let err = s.plan(&var).unwrap_err();
    assert!(matches!(err, E2vError::Layout(_)));
}

#[test]
fn test_block_past_last_column_fails() {
    let mut s = session();
    let mut var = constants("v", &["source"], "XFD1");
    var.add_dimension(s.registry(), "source", ReadAlong::Col, Step::Spacing(5))
        .unwrap();

    let err = s.plan(&var).unwrap_err();
    assert!(err.to_string().contains("outside the sheet"));
}

#[test]
fn test_series_past_last_row_fails() {
    let mut s = session();
    let series = SeriesDescriptor::new("year", "B2", ReadAlong::Row, u32::MAX).unwrap();
    let var = ExternalVariable::new(VariableKind::data(series, None).unwrap(), "w", &[], "C2")
        .unwrap()
        .in_file("inputs.xlsx")
        .in_sheet("Region1");

    let err = s.plan(&var).unwrap_err();
    assert!(matches!(err, E2vError::Layout(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// SANITIZATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_special_characters_reported_once() {
    let mut s = session();
    for cell in ["A1", "A5"] {
        let mut var = constants("  Elec/el", &["destination"], cell);
        var.add_dimension(s.registry(), "destination", ReadAlong::Row, Step::Spacing(2))
            .unwrap();
        s.plan(&var).unwrap();
    }

    let originals: Vec<&str> = s.warnings().iter().map(|w| w.original.as_str()).collect();
    // the variable name and the member share the same original text
    assert_eq!(originals, vec!["Elec/el"]);
    assert_eq!(s.warnings()[0].cleaned, "Elec_el");
    assert_eq!(
        s.warnings()[0].to_string(),
        "The name of the variable 'Elec/el' has special characters. 'Elec_el' will be used for cellrange names."
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// DATA AND LOOKUPS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_invalid_interpolation_fails_at_construction() {
    let series = SeriesDescriptor::new("year", "B1", ReadAlong::Col, 5).unwrap();
    let err = VariableKind::data(series, Some("non_valid")).unwrap_err();
    assert!(matches!(err, E2vError::Config(_)));
}

#[test]
fn test_data_keyword_clause() {
    let mut s = session();
    let series = SeriesDescriptor::new("year", "B1", ReadAlong::Col, 5).unwrap();

    let with = ExternalVariable::new(
        VariableKind::data(series.clone(), Some("hold backward")).unwrap(),
        "v",
        &[],
        "B2",
    )
    .unwrap()
    .in_file("inputs.xlsx")
    .in_sheet("Region1");
    assert!(s.plan(&with).unwrap().equations.starts_with("v:HOLD BACKWARD::=\n\t"));

    let without = ExternalVariable::new(VariableKind::data(series, None).unwrap(), "w", &[], "B3")
        .unwrap()
        .in_file("inputs.xlsx")
        .in_sheet("Region1");
    let plan = s.plan(&without).unwrap();
    assert!(plan
        .equations
        .starts_with("w:=\n\tGET_DIRECT_DATA('inputs.xlsx', 'Region1', 'year', 'w')"));
    assert_eq!(plan.layout.blocks[0].address, "Region1!$B$3:$F$3");
}

#[test]
fn test_lookups_series_along_rows() {
    let mut s = session();
    let series = SeriesDescriptor::new("x axis", "A2", ReadAlong::Row, 4).unwrap();
    let mut var = ExternalVariable::new(VariableKind::lookups(series), "lk", &["source"], "B2")
        .unwrap()
        .in_file("inputs.xlsx")
        .in_sheet("Region1");
    var.add_dimension(s.registry(), "source", ReadAlong::Col, Step::Whole)
        .unwrap();

    let plan = s.plan(&var).unwrap();
    assert_eq!(plan.ranges[0].name, "x_axis");
    assert_eq!(plan.ranges[0].address, "Region1!$A$2:$A$5");
    assert_eq!(plan.ranges[1].address, "Region1!$B$2:$D$5");
    assert!(plan
        .equations
        .starts_with("lk[source]=\n\tGET_DIRECT_LOOKUPS('inputs.xlsx', 'Region1', 'x_axis', 'lk')"));
}

#[test]
fn test_series_replicated_per_file() {
    let source = MemorySource::new()
        .with_workbook("young.xlsx", MemoryWorkbook::new(&["Data"]))
        .with_workbook("old.xlsx", MemoryWorkbook::new(&["Data"]));
    let mut s = Session::new(registry(), Excels::new(source));

    let series = SeriesDescriptor::new("year", "B1", ReadAlong::Col, 3).unwrap();
    let mut var = ExternalVariable::new(VariableKind::data(series, None).unwrap(), "pop", &["age"], "B2")
        .unwrap()
        .in_sheet("Data");
    var.add_dimension(
        s.registry(),
        "age",
        ReadAlong::File,
        Step::Targets(vec!["young.xlsx".into(), "old.xlsx".into()]),
    )
    .unwrap();

    s.execute(&var).unwrap();
    let files: Vec<String> = s
        .excels()
        .open_paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    assert_eq!(files, vec!["old.xlsx", "young.xlsx"]);
    for file in ["young.xlsx", "old.xlsx"] {
        let book = s.excels().get(Path::new(file)).unwrap();
        let names: Vec<&str> = book.defined_names().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["year", "pop"]);
    }
}
