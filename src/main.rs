//! Sheetcalc - spreadsheet formula evaluation from the command line

mod config;

use anyhow::{Context, Result, bail};
use sheetcalc_core::{CellRef, Document, EvalOptions};
use sheetcalc_engine::engine::{Grid, evaluate, function_help, is_error_tag};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use config::Config;

fn print_usage() {
    eprintln!("Usage: sheetcalc [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Sheet to load (.calc); prints every cell value");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --command <FORMULA>   Evaluate a single formula and print the result");
    eprintln!("  -o, --output <FILE>       Write the loaded sheet to a .calc file");
    eprintln!("  --config <FILE>           Use this config file instead of the user one");
    eprintln!("  --functions               List the built-in functions");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Set SHEETCALC_LOG (e.g. debug) to log to stderr.");
}

enum Mode {
    Command(String),
    Sheet {
        path: PathBuf,
        output: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SHEETCALC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = env::args().collect();

    let mut command: Option<String> = None;
    let mut file_path: Option<PathBuf> = None;
    let mut output_file: Option<PathBuf> = None;
    let mut config_file: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            "--functions" => {
                for line in function_help() {
                    println!("{}", line);
                }
                return ExitCode::SUCCESS;
            }
            "-c" | "--command" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --command requires a formula");
                    return ExitCode::FAILURE;
                }
                command = Some(args[i].to_string());
            }
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --output requires a file path");
                    return ExitCode::FAILURE;
                }
                output_file = Some(PathBuf::from(&args[i]));
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    return ExitCode::FAILURE;
                }
                config_file = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                return ExitCode::FAILURE;
            }
            _ => {
                if file_path.is_none() {
                    file_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    return ExitCode::FAILURE;
                }
            }
        }
        i += 1;
    }

    let mode = match (command, file_path) {
        (Some(formula), None) => Mode::Command(formula),
        (None, Some(path)) => Mode::Sheet {
            path,
            output: output_file,
        },
        (Some(_), Some(_)) => {
            eprintln!("Error: --command cannot be combined with a file");
            return ExitCode::FAILURE;
        }
        (None, None) => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(mode, config_file.as_deref()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(mode: Mode, config_file: Option<&Path>) -> Result<ExitCode> {
    let config = Config::load(config_file)?;
    match mode {
        Mode::Command(formula) => Ok(run_command(&formula, &config.eval)),
        Mode::Sheet { path, output } => {
            run_sheet(&path, output.as_deref(), config.eval)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Evaluate one formula against an empty sheet; error results exit with 1.
fn run_command(formula: &str, options: &EvalOptions) -> ExitCode {
    let formula = if formula.trim_start().starts_with('=') {
        formula.trim_start().to_string()
    } else {
        format!("={}", formula)
    };
    let result = evaluate(&formula, &CellRef::new(0, 0), &Grid::new(), options);
    println!("{}", result.value);
    if is_error_tag(&result.value) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_sheet(path: &Path, output: Option<&Path>, options: EvalOptions) -> Result<()> {
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    let mut doc = Document::with_file(Some(path.to_path_buf()), options)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    for (cell, _) in doc.snapshot().cells {
        println!("{}: {}", cell, doc.get_value(&cell));
    }

    if let Some(output) = output {
        doc.save_as(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        eprintln!("Saved to {}", output.display());
    }
    Ok(())
}
