use crate::core::addressing::parse_address;
use crate::error::{E2vError, E2vResult};
use crate::excel::{Excels, Workbook, XlsxWorkbook};
use crate::parser::{load_config, ConfigFormat};
use crate::session::Session;
use crate::subscripts::SubscriptRegistry;
use crate::types::{ExternalVariable, Loading};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Rows of cell values shown per cellrange by `ranges --values`.
const PREVIEW_ROWS: usize = 5;

/// Options of the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub subscripts: PathBuf,
    pub configs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    /// Overwrite conflicting cellranges for every variable.
    pub force: bool,
    /// Loading method for every variable, instead of the configured one.
    pub loading: Option<Loading>,
    pub dry_run: bool,
    pub verbose: bool,
}

fn check_file(path: &Path, extensions: &[&str], what: &str) -> E2vResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !extensions.contains(&ext.as_str()) {
        return Err(E2vError::config(format!(
            "when parsing '{}'\nThe {} file name must end with {}",
            path.display(),
            what,
            extensions
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(" or ")
        )));
    }
    if !path.is_file() {
        return Err(E2vError::config(format!(
            "when parsing '{}'\nThe {} file does not exist",
            path.display(),
            what
        )));
    }
    Ok(())
}

fn write_or_print(text: &str, output: Option<&Path>) -> E2vResult<()> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            eprintln!("   Output: {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn load_variables(options: &GenerateOptions, registry: &SubscriptRegistry) -> E2vResult<Vec<ExternalVariable>> {
    let mut variables = Vec::new();
    for config in &options.configs {
        let loaded = load_config(config, registry)?;
        if options.verbose {
            eprintln!("   {} variables in {}", loaded.len(), config.display());
        }
        variables.extend(loaded);
    }

    for variable in &mut variables {
        if options.force {
            variable.force = true;
        }
        if let Some(loading) = options.loading {
            variable.loading = loading;
        }
    }
    Ok(variables)
}

/// Execute the generate command
pub fn generate(options: GenerateOptions) -> E2vResult<()> {
    check_file(&options.subscripts, &["json", "mdl"], "subscripts")?;
    for config in &options.configs {
        ConfigFormat::from_path(config)?;
        check_file(config, &["json", "yaml", "yml"], "config")?;
    }

    eprintln!("{}", "🔥 excels2vensim - Generate".bold().green());
    eprintln!("   Subscripts: {}", options.subscripts.display());

    let registry = SubscriptRegistry::load(&options.subscripts)?;
    if options.verbose {
        eprintln!("   {} subscript ranges", registry.len());
    }

    let variables = load_variables(&options, &registry)?;
    let mut session = Session::new(registry, Excels::xlsx());

    let equations = if options.dry_run {
        eprintln!("{}", "📋 Dry run - workbooks are left untouched".yellow());
        session.plan_all(&variables)?
    } else {
        match session.execute_all(&variables) {
            Ok(equations) => {
                session.finish()?;
                equations
            }
            Err(e) => {
                session.discard();
                eprintln!(
                    "\n{}",
                    format!("❌ Nothing was saved: {}", e).bold().red()
                );
                return Err(e);
            }
        }
    };

    let warnings = session.warnings().len();
    if warnings > 0 {
        eprintln!(
            "{}",
            format!("⚠️  {} names were sanitized for cellranges", warnings).yellow()
        );
    }

    if !options.dry_run {
        let tally = session.tally();
        eprintln!(
            "{}",
            format!(
                "✅ {} variables, {} cellranges ({} new, {} unchanged, {} replaced)",
                variables.len(),
                tally.total(),
                tally.created,
                tally.unchanged,
                tally.replaced
            )
            .bold()
            .green()
        );
    }

    write_or_print(&equations, options.output.as_deref())
}

/// Execute the subscripts command
pub fn subscripts(model: PathBuf, output: Option<PathBuf>) -> E2vResult<()> {
    check_file(&model, &["mdl"], "model")?;

    let registry = SubscriptRegistry::load(&model)?;
    eprintln!(
        "{}",
        format!("✅ {} subscript ranges in {}", registry.len(), model.display())
            .bold()
            .green()
    );

    write_or_print(&registry.to_json_pretty()?, output.as_deref())
}

/// Execute the ranges command
pub fn ranges(workbook: PathBuf, sheet: Option<String>, values: bool) -> E2vResult<()> {
    check_file(&workbook, &["xlsx", "xlsm"], "workbook")?;

    let book = XlsxWorkbook::open(&workbook)?;
    println!("{}", format!("📊 {}", workbook.display()).bold());

    let sheets: Vec<(u32, &String)> = book
        .sheet_names()
        .iter()
        .zip(0u32..)
        .map(|(name, idx)| (idx, name))
        .filter(|(_, name)| {
            sheet
                .as_deref()
                .map_or(true, |wanted| wanted.eq_ignore_ascii_case(name))
        })
        .collect();

    if sheets.is_empty() {
        return Err(E2vError::Workbook(format!(
            "sheet '{}' not found, the workbook has [{}]",
            sheet.unwrap_or_default(),
            book.sheet_names().join(", ")
        )));
    }

    for (idx, name) in sheets {
        let names = book.local_names(idx);
        println!("\n   {} ({} cellranges)", name.bright_blue().bold(), names.len());
        for defined in names {
            println!("      {} → {}", defined.name.bold(), defined.refers_to);
            if values {
                print_values(&book, &defined.refers_to)?;
            }
        }
    }

    if sheet.is_none() {
        let global: Vec<_> = book
            .defined_names()
            .iter()
            .filter(|d| d.local_sheet_id.is_none())
            .collect();
        if !global.is_empty() {
            println!("\n   {} ({} names)", "workbook scope".bright_blue().bold(), global.len());
            for defined in global {
                println!("      {} → {}", defined.name.bold(), defined.refers_to);
            }
        }
    }

    Ok(())
}

fn print_values(book: &XlsxWorkbook, address: &str) -> E2vResult<()> {
    let Some((sheet, from, to)) = parse_address(address) else {
        println!("         {}", "(not a plain cell range)".dimmed());
        return Ok(());
    };

    let rows = book.range_values(&sheet, from, to)?;
    for row in rows.iter().take(PREVIEW_ROWS) {
        println!("         {}", row.join("\t"));
    }
    if rows.len() > PREVIEW_ROWS {
        println!("         {}", format!("... {} more rows", rows.len() - PREVIEW_ROWS).dimmed());
    }
    Ok(())
}
