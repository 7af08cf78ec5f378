use clap::{Parser, Subcommand};
use log::debug;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sysf_core::{Module, Span, Type};
use sysf_interp::{Evaluator, LlmConfig};
use sysf_typeck::TypeError;

#[derive(Parser)]
#[command(name = "sysf", about = "System F with data types and LLM functions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a source file and print the surface AST
    Parse {
        /// Path to the source file
        file: PathBuf,
    },
    /// Elaborate and type-check a source file without running it
    Check {
        /// Path to the source file
        file: PathBuf,
    },
    /// Type-check and evaluate a source file
    Run {
        /// Path to the source file
        file: PathBuf,
        /// Declaration whose value is printed (defaults to `main`, or every
        /// declaration when there is no `main`)
        #[arg(long)]
        entry: Option<String>,
        /// Model used by LLM functions whose pragma names none
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature used by LLM functions whose pragma sets none
        #[arg(long)]
        temperature: Option<f64>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no declaration named {0}")]
    UnknownEntry(String),

    /// Diagnostics have already been written to stderr.
    #[error("aborting due to previous errors")]
    Reported,
}

type Result<T> = std::result::Result<T, CliError>;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Parse { file } => parse(&file),
        Command::Check { file } => check(&file),
        Command::Run {
            file,
            entry,
            model,
            temperature,
        } => {
            let mut config = LlmConfig::default();
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(temperature) = temperature {
                config.temperature = temperature;
            }
            run(&file, entry.as_deref(), config)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Reported) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_file(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).map_err(|source| CliError::Read {
        path: file.to_path_buf(),
        source,
    })
}

fn report(file: &Path, span: Span, kind: &str, message: impl std::fmt::Display) {
    eprintln!(
        "{}:{}:{}: {} error: {}",
        file.display(),
        span.start,
        span.end,
        kind,
        message
    );
}

fn parse(file: &Path) -> Result<()> {
    let source = read_file(file)?;
    let (module, errors) = sysf_parser::parse(&source);
    for error in &errors {
        report(file, error.span, "parse", &error.message);
    }

    print!("{}", sysf_ast::pretty_print(&module));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::Reported)
    }
}

/// Parse and elaborate `file`, reporting every diagnostic.
fn load(file: &Path) -> Result<Module> {
    let source = read_file(file)?;
    let (surface, parse_errors) = sysf_parser::parse(&source);
    if !parse_errors.is_empty() {
        for error in &parse_errors {
            report(file, error.span, "parse", &error.message);
        }
        return Err(CliError::Reported);
    }

    let module = sysf_elab::elaborate(&surface);
    for warning in &module.warnings {
        eprintln!("{}: warning: {}", file.display(), warning);
    }
    if module.has_errors() {
        for error in &module.errors {
            report(file, error.span(), "elaboration", error);
        }
        return Err(CliError::Reported);
    }
    debug!("elaborated {} declarations", module.declarations.len());
    Ok(module)
}

fn type_check(file: &Path, module: &Module) -> Result<HashMap<SmolStr, Type>> {
    sysf_typeck::check_program(module).map_err(|e| {
        report(file, declaration_span(module, &e), "type", &e);
        CliError::Reported
    })
}

fn declaration_span(module: &Module, error: &TypeError) -> Span {
    error
        .declaration()
        .and_then(|name| module.term_declaration(name))
        .map(|decl| decl.span)
        .unwrap_or_default()
}

fn check(file: &Path) -> Result<()> {
    let module = load(file)?;
    let types = type_check(file, &module)?;
    for decl in module.term_declarations() {
        if let Some(ty) = types.get(&decl.name) {
            println!("{} : {}", decl.name, ty);
        }
    }
    println!("OK");
    Ok(())
}

fn run(file: &Path, entry: Option<&str>, config: LlmConfig) -> Result<()> {
    let module = load(file)?;
    type_check(file, &module)?;

    let entry = match entry {
        Some(name) if module.term_declaration(name).is_none() => {
            return Err(CliError::UnknownEntry(name.to_string()))
        }
        Some(name) => Some(name),
        None => module.term_declaration("main").map(|_| "main"),
    };

    let mut evaluator = Evaluator::new(&module).with_llm_config(config);
    for decl in module.term_declarations() {
        let value = match evaluator.evaluate_declaration(decl) {
            Ok(value) => value,
            Err(e) => {
                report(file, decl.span, "runtime", &e);
                return Err(CliError::Reported);
            }
        };
        match entry {
            Some(name) if decl.name == name => println!("{}", value),
            Some(_) => {}
            None => println!("{} = {}", decl.name, value),
        }
    }
    Ok(())
}
