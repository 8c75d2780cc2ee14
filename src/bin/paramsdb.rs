//! ParamsDB Command Line Interface
//!
//! Re-aligns the parameter dump, checks it and generates the firmware
//! parameter sources.
//!
//! # Usage
//!
//! ```bash
//! # Generate <PROFILE>_Params.h/.c from the discovered ParamsDB.txt
//! paramsdb
//!
//! # Re-align a dump in place
//! paramsdb align path/to/ParamsDB.txt
//!
//! # Print the format/type consistency report
//! paramsdb check
//!
//! # Materialize a dump from a plain JSON database export
//! paramsdb import export.json -o ParamsDB.txt
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use paramsdb_gen::config::{discover_input, GeneratorConfig, DEFAULT_INPUT, INPUT_ENV};
use paramsdb_gen::run;
use paramsdb_gen::GenerateError;

#[derive(Parser)]
#[command(name = "paramsdb")]
#[command(version)]
#[command(about = "Generate firmware parameter sources from a ParamsDB dump")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Suppress the summary output
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-align, check and generate <PROFILE>_Params.h/.c (default)
    Generate {
        /// Dump to read (discovered when omitted)
        file: Option<PathBuf>,
    },

    /// Re-align the dump in place, keeping a .backup copy
    Align {
        /// Dump to re-align (discovered when omitted)
        file: Option<PathBuf>,
    },

    /// Run the format/type and checksum consistency checks
    Check {
        /// Dump to check (discovered when omitted)
        file: Option<PathBuf>,
    },

    /// Transform a plain JSON database export into an aligned dump
    Import {
        /// JSON export ({"<table>": {"columns": [...], "rows": [...]}})
        export: PathBuf,

        /// Dump to write
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        output: PathBuf,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Generate { file: None }) {
        Commands::Generate { file } => cmd_generate(file, cli.quiet),
        Commands::Align { file } => cmd_align(file, cli.quiet),
        Commands::Check { file } => cmd_check(file),
        Commands::Import { export, output } => cmd_import(&export, &output, cli.quiet),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            if let Some(generate) = e.downcast_ref::<GenerateError>() {
                for d in generate.diagnostics() {
                    eprintln!("  {}", d);
                }
            }
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn resolve_input(file: Option<PathBuf>) -> Result<PathBuf> {
    file.or_else(discover_input).ok_or_else(|| {
        anyhow!(
            "no input given and no {} found (set {} or pass a path)",
            DEFAULT_INPUT,
            INPUT_ENV
        )
    })
}

fn cmd_generate(file: Option<PathBuf>, quiet: bool) -> Result<bool> {
    let input = resolve_input(file)?;
    let config = GeneratorConfig::for_input(&input)?;
    let outcome = run::generate(&input, &config)?;

    if !quiet {
        for d in &outcome.diagnostics {
            println!("{} {}", "warning:".yellow(), d);
        }
        if outcome.input_rewritten {
            println!("{} Re-aligned {}", "OK".green(), input.display());
        }
        println!("{} Generated {}", "OK".green(), outcome.header_path.display());
        println!("{} Generated {}", "OK".green(), outcome.source_path.display());
    }
    Ok(true)
}

fn cmd_align(file: Option<PathBuf>, quiet: bool) -> Result<bool> {
    let input = resolve_input(file)?;
    let config = GeneratorConfig::for_input(&input)?;
    let outcome = run::align(&input, &config)?;

    if !quiet {
        for issue in &outcome.issues {
            println!("{} {}", "warning:".yellow(), issue);
        }
        if outcome.changed {
            println!(
                "{} Re-aligned {} table(s) in {}",
                "OK".green(),
                outcome.blocks_aligned,
                input.display()
            );
        } else {
            println!("{} {} is already aligned", "OK".green(), input.display());
        }
    }
    Ok(true)
}

fn cmd_check(file: Option<PathBuf>) -> Result<bool> {
    let input = resolve_input(file)?;
    let report = run::check(&input)?;

    println!("{}", report);
    if !report.is_consistent() {
        println!("{}", "Consistency errors found".red().bold());
    } else if !report.is_clean() {
        println!("{}", "No errors, but there are warnings".yellow());
    } else {
        println!("{}", "All formats match their types and checksums are unique".green());
    }
    Ok(report.is_clean())
}

fn cmd_import(export: &Path, output: &Path, quiet: bool) -> Result<bool> {
    let config = GeneratorConfig::for_input(output)?;
    let outcome = run::import(export, output, &config, &mut rand::thread_rng())?;

    if !quiet {
        println!(
            "{} Wrote {} table(s) to {}",
            "OK".green(),
            outcome.tables,
            outcome.output.display()
        );
    }
    Ok(true)
}
