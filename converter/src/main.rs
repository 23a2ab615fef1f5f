//! Birdsheet CLI - Convert a bird survey spreadsheet into database load files
//!
//! # Main Commands
//!
//! ```bash
//! birdsheet                             # Convert ./all_data.ods into ./*.csv
//! birdsheet convert data.xlsx -o out    # Convert another document
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! birdsheet sheets data.ods             # List sheet names
//! birdsheet inspect data.ods Users      # Show a sheet's columns and types
//! birdsheet hash secret                 # Print a salted password digest
//! ```

use birdsheet::logs::{log_error, LOGGER};
use birdsheet::{hash_password, open_document, run, NamePolicy, PipelineConfig, PipelineResult, TrimPolicy};
use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "birdsheet")]
#[command(about = "Convert a bird survey spreadsheet into headerless CSV load files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document into five CSV files (default command)
    Convert(ConvertArgs),

    /// List the sheets of a document
    Sheets {
        /// Input document
        input: PathBuf,
    },

    /// Show the columns, inferred types and row count of a sheet
    Inspect {
        /// Input document
        input: PathBuf,

        /// Sheet name
        sheet: String,
    },

    /// Print the salted SHA-256 digest of a password
    Hash {
        /// Plaintext password
        plaintext: String,

        /// Salt appended before hashing (default: BIRDS or $BIRDSHEET_SALT)
        #[arg(short, long)]
        salt: Option<String>,
    },
}

#[derive(Args, Default)]
struct ConvertArgs {
    /// Input document (default: all_data.ods)
    input: Option<PathBuf>,

    /// Document format: ods or xlsx (detected from the extension if not specified)
    #[arg(short, long)]
    format: Option<String>,

    /// Directory for the output files (default: current directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Salt appended to passwords before hashing
    #[arg(short, long)]
    salt: Option<String>,

    /// Reject scientific names with more than two parts
    #[arg(long)]
    strict_names: bool,

    /// How to drop artifact rows from Users: fixed or structural
    #[arg(long)]
    users_trim: Option<String>,

    /// Write a JSON run report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command.unwrap_or_else(|| Commands::Convert(ConvertArgs::default())) {
        Commands::Convert(args) => cmd_convert(args),

        Commands::Sheets { input } => cmd_sheets(&input),

        Commands::Inspect { input, sheet } => cmd_inspect(&input, &sheet),

        Commands::Hash { plaintext, salt } => cmd_hash(&plaintext, salt),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

/// Defaults, then the config file, then the environment, then flags.
fn build_config(args: ConvertArgs) -> PipelineResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    }
    .with_env();

    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(format) = args.format {
        config.format = Some(format.parse()?);
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(salt) = args.salt {
        config.salt = salt;
    }
    if args.strict_names {
        config.name_policy = NamePolicy::Strict;
    }
    if let Some(mode) = args.users_trim {
        config.users_trim = mode.parse::<TrimPolicy>()?;
    }
    if args.report.is_some() {
        config.report = args.report;
    }
    Ok(config)
}

fn cmd_convert(args: ConvertArgs) -> Result<(), Box<dyn Error>> {
    LOGGER.set_quiet(args.quiet);
    let config = build_config(args)?;
    let report = run(&config)?;

    if !report.warnings.is_empty() {
        eprintln!("⚠️  {} warning(s) during conversion", report.warnings.len());
    }
    Ok(())
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn Error>> {
    let document = open_document(input, None)?;
    eprintln!("📄 {} ({})", input.display(), document.format());
    for name in document.sheet_names() {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_inspect(input: &Path, sheet: &str) -> Result<(), Box<dyn Error>> {
    let mut document = open_document(input, None)?;
    let table = document.read_sheet(sheet)?;

    eprintln!("📋 {} has {} columns:", sheet, table.width());
    for (i, column) in table.schema().columns().iter().enumerate() {
        println!("[{:2}] {} ({})", i + 1, column.name, column.kind);
    }
    eprintln!("✅ {} data rows", table.row_count());
    Ok(())
}

fn cmd_hash(plaintext: &str, salt: Option<String>) -> Result<(), Box<dyn Error>> {
    let salt = match salt {
        Some(salt) => salt,
        None => PipelineConfig::default().with_env().salt,
    };
    println!("{}", hash_password(plaintext, &salt));
    Ok(())
}
