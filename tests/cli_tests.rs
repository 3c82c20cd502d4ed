//! CLI Integration Tests
//!
//! Runs the excels2vensim binary with assert_cmd against fixture workbooks
//! written with rust_xlsxwriter.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use excels2vensim::excel::{Workbook, XlsxWorkbook};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Project {
    dir: TempDir,
}

impl Project {
    /// Workbook, subscripts and a one-variable config in a scratch directory.
    fn new(cell: &str) -> Self {
        let dir = TempDir::new().unwrap();

        let mut book = rust_xlsxwriter::Workbook::new();
        book.add_worksheet().set_name("Region1").unwrap();
        book.save(dir.path().join("inputs.xlsx")).unwrap();

        fs::write(
            dir.path().join("subs.json"),
            r#"{"source": ["gas", "coal", "wind"]}"#,
        )
        .unwrap();

        let project = Self { dir };
        project.write_config(cell);
        project
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_config(&self, cell: &str) {
        let config = format!(
            r#"{{
    "q_row": {{
        "type": "constants",
        "dims": ["source"],
        "cell": "{}",
        "units": "1",
        "description": "Share",
        "file": "inputs.xlsx",
        "sheet": "Region1",
        "dimensions": {{"source": ["col"]}}
    }}
}}"#,
            cell
        );
        fs::write(self.path("config.json"), config).unwrap();
    }

    fn generate(&self) -> Command {
        let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
        cmd.current_dir(self.dir.path())
            .args(["generate", "subs.json", "config.json"]);
        cmd
    }
}

fn workbook_bytes(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("excels2vensim"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_generate_help() {
    let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
    cmd.args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

// ═══════════════════════════════════════════════════════════════════════════
// GENERATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_generate_prints_equations_and_names_ranges() {
    let project = Project::new("A24");

    project
        .generate()
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "q_row[source]=\n\tGET_DIRECT_CONSTANTS('inputs.xlsx', 'Region1', 'q_row')\n\t~\t1\n\t~\tShare\n\t|",
        ));

    let book = XlsxWorkbook::open(&project.path("inputs.xlsx")).unwrap();
    assert!(book
        .defined_names()
        .iter()
        .any(|d| d.name == "q_row" && d.refers_to == "Region1!$A$24:$C$24"));
}

#[test]
fn test_generate_dry_run_leaves_workbook() {
    let project = Project::new("A24");
    let before = workbook_bytes(&project.path("inputs.xlsx"));

    project
        .generate()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("GET_DIRECT_CONSTANTS"));

    assert_eq!(workbook_bytes(&project.path("inputs.xlsx")), before);
}

#[test]
fn test_generate_output_file_and_loading() {
    let project = Project::new("A24");

    project
        .generate()
        .args(["--loading", "xls", "-o", "eqs.txt"])
        .assert()
        .success();

    let text = fs::read_to_string(project.path("eqs.txt")).unwrap();
    assert!(text.contains("GET_XLS_CONSTANTS('inputs.xlsx', 'Region1', 'q_row')"));
}

#[test]
fn test_generate_conflict_fails_and_saves_nothing() {
    let project = Project::new("A24");
    project.generate().assert().success();
    let after_first = workbook_bytes(&project.path("inputs.xlsx"));

    project.write_config("A30");
    project
        .generate()
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exist in 'Region1!$A$24:$C$24'"));
    assert_eq!(workbook_bytes(&project.path("inputs.xlsx")), after_first);

    project.generate().arg("--force").assert().success();
    assert_ne!(workbook_bytes(&project.path("inputs.xlsx")), after_first);
}

#[test]
fn test_generate_rejects_subscripts_extension() {
    let project = Project::new("A24");
    fs::write(project.path("subs.txt"), "{}").unwrap();

    let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
    cmd.current_dir(project.dir.path())
        .args(["generate", "subs.txt", "config.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must end with .json or .mdl"));
}

#[test]
fn test_generate_needs_config() {
    let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
    cmd.args(["generate", "subs.json"]).assert().failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// SUBSCRIPTS AND RANGES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_subscripts_command_prints_json() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("model.mdl"),
        "region: north, south ~~|\nx = 1 ~ m ~ |\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
    cmd.current_dir(dir.path())
        .args(["subscripts", "model.mdl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"region\""))
        .stdout(predicate::str::contains("\"south\""));
}

#[test]
fn test_ranges_command_lists_names() {
    let project = Project::new("A24");
    project.generate().assert().success();

    let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
    cmd.current_dir(project.dir.path())
        .args(["ranges", "inputs.xlsx", "--sheet", "region1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("q_row"))
        .stdout(predicate::str::contains("Region1!$A$24:$C$24"));
}

#[test]
fn test_ranges_unknown_sheet() {
    let project = Project::new("A24");

    let mut cmd = Command::cargo_bin("excels2vensim").unwrap();
    cmd.current_dir(project.dir.path())
        .args(["ranges", "inputs.xlsx", "--sheet", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sheet 'Nope' not found"));
}
