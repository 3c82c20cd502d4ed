use anyhow::Context;
use clap::{Parser, Subcommand};
use excels2vensim::cli::{self, GenerateOptions};
use excels2vensim::types::Loading;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "excels2vensim")]
#[command(about = "Generate Vensim GET XLS/DIRECT equations with cellrange names.")]
#[command(long_about = "excels2vensim - Vensim GET DIRECT/XLS equations from Excel cellranges

Describes where each variable lives in the spreadsheets, names the cellranges
in the workbooks and prints the equations that read them.

COMMANDS:
  generate    - Name the cellranges and print the equations
  subscripts  - Extract the subscript ranges of a Vensim model as JSON
  ranges      - List the cellranges defined in a workbook

EXAMPLES:
  excels2vensim generate model.mdl config.json          # Equations to stdout
  excels2vensim generate subs.json a.json b.yaml -o eqs.txt
  excels2vensim generate subs.json config.json --dry-run
  excels2vensim ranges inputs.xlsx --sheet Region1 --values")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Name the cellranges and print the equations.

Reads the subscript ranges (Vensim model or JSON mapping) and every
configuration file in order. Each variable gets its cellranges defined in
its workbook(s); the workbooks are saved once, after all variables succeed.
If anything fails no workbook is modified.

CONFIGURATION (JSON or YAML):
  var1:
    type: constants            # constants, data or lookups
    dims: [source, destination]
    cell: A24                  # upper-left data cell
    sheet: Region1
    file: inputs.xlsx
    dimensions:
      source: [col]            # step 1: one range covers the dimension
      destination: [row, 17]   # one range per subscript, 17 rows apart

  Data and lookups also need 'time' or 'x':
    time: {name: year, cell: B1, read_along: col, length: 10}

NAMING CONFLICTS:
  A cellrange already defined elsewhere is an error unless --force
  (or 'force: true' in the variable).")]
    /// Name the cellranges and print the equations
    Generate {
        /// Subscripts file: Vensim model (.mdl) or JSON (.json)
        subscripts: PathBuf,

        /// Configuration files (.json, .yaml, .yml)
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Write the equations to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Overwrite conflicting cellranges
        #[arg(long)]
        force: bool,

        /// Loading method for every variable (DIRECT or XLS)
        #[arg(long, value_name = "METHOD")]
        loading: Option<Loading>,

        /// Print the equations without modifying any workbook
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show debug logs and extra progress
        #[arg(short, long)]
        verbose: bool,
    },

    /// Extract the subscript ranges of a Vensim model as JSON
    Subscripts {
        /// Vensim model file (.mdl)
        model: PathBuf,

        /// Write the JSON to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List the cellranges defined in a workbook
    Ranges {
        /// Excel file (.xlsx)
        workbook: PathBuf,

        /// Only this sheet
        #[arg(short, long)]
        sheet: Option<String>,

        /// Show the first cell values of each cellrange
        #[arg(long)]
        values: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "excels2vensim=debug"
    } else {
        "excels2vensim=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            subscripts,
            configs,
            output,
            force,
            loading,
            dry_run,
            verbose,
        } => {
            init_logging(verbose);
            cli::generate(GenerateOptions {
                subscripts,
                configs,
                output,
                force,
                loading,
                dry_run,
                verbose,
            })
            .context("generate failed")
        }

        Commands::Subscripts { model, output } => {
            init_logging(false);
            cli::subscripts(model.clone(), output)
                .with_context(|| format!("could not read the subscripts of {}", model.display()))
        }

        Commands::Ranges {
            workbook,
            sheet,
            values,
        } => {
            init_logging(false);
            cli::ranges(workbook.clone(), sheet, values)
                .with_context(|| format!("could not list the cellranges of {}", workbook.display()))
        }
    }
}
