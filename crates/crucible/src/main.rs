//! Crucible CLI (spec §6): a thin, spec-compatible driver over
//! `crucible-core`. Not itself part of the specified compiler core —
//! same relationship the teacher's `depyler` binary has to
//! `depyler-core`.

mod cache;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use crucible_core::{CompileOptions, Compiler};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "crucible", version, about = "Ahead-of-time compiler for a typed Python subset")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Bypass the external build-artifact cache oracle.
    #[arg(long, global = true)]
    force: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and run a single file (run is out of scope for the core;
    /// this prints the generated IR in place of executing it).
    Compile {
        file: PathBuf,
        /// Emit a serialized bytecode program instead of backend IR.
        #[arg(long)]
        emit_bytecode: bool,
        /// Select the WebAssembly backend target.
        #[arg(long)]
        wasm: bool,
    },
    /// Compile a file and its import graph, producing either a shared
    /// library (default) or an executable.
    Build {
        file: PathBuf,
        /// Produce an executable instead of a shared library.
        #[arg(long)]
        binary: bool,
        #[arg(long)]
        emit_bytecode: bool,
        #[arg(long)]
        wasm: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .init();

    let cli = Cli::parse();
    let project_config = config::load_project_config().unwrap_or_default();

    match run(cli, &project_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli, project_config: &config::ProjectConfig) -> Result<(), DriverError> {
    match cli.command {
        Command::Compile {
            file,
            emit_bytecode,
            wasm,
        } => {
            let options = CompileOptions {
                force: cli.force || project_config.force,
                emit_bytecode,
                wasm_target: wasm,
            };
            compile(&file, options)
        }
        Command::Build {
            file,
            binary,
            emit_bytecode,
            wasm,
        } => {
            let options = CompileOptions {
                force: cli.force || project_config.force,
                emit_bytecode,
                wasm_target: wasm,
            };
            build(&file, binary, options)
        }
    }
}

fn compile(file: &PathBuf, options: CompileOptions) -> Result<(), DriverError> {
    if !options.force && cache::is_up_to_date(file)? {
        tracing::debug!(path = %file.display(), "cache hit, skipping recompile");
        println!("{}", "(cached, use --force to recompile)".dimmed());
        return Ok(());
    }
    if options.emit_bytecode {
        return emit_bytecode(file);
    }
    let compiler = Compiler::new(options);
    let output = compiler.compile_file(file).map_err(DriverError::Compile)?;
    println!("{}", output.root_ir);
    cache::write_sidecar(file)?;
    Ok(())
}

/// `--emit-bytecode` (spec §6): prints the serialized bytecode program
/// for `file` instead of IR, for the runtime VM to load directly. Only
/// a module written entirely in the embedded bytecode VM's opcode set
/// (literal arithmetic, plain assignment — no functions, classes, or
/// calls) can be represented this way; anything else is unsupported.
fn emit_bytecode(file: &PathBuf) -> Result<(), DriverError> {
    let source = std::fs::read_to_string(file)?;
    let program = crucible_core::bytecode::BytecodeProgram::compile_literal(&source, true)
        .ok_or_else(|| {
            DriverError::Compile(crucible_core::error::CompileError::new(
                crucible_core::error::ErrorKind::UnsupportedError(
                    "module uses a construct the embedded bytecode VM does not support"
                        .to_string(),
                ),
            ))
        })?;
    let json = serde_json::to_string(&program).map_err(|e| {
        DriverError::Compile(crucible_core::error::CompileError::new(
            crucible_core::error::ErrorKind::InternalError(e.to_string()),
        ))
    })?;
    println!("{json}");
    cache::write_sidecar(file)?;
    Ok(())
}

fn build(file: &PathBuf, binary: bool, options: CompileOptions) -> Result<(), DriverError> {
    if !options.force && cache::is_up_to_date(file)? {
        println!("{}", "(cached, use --force to rebuild)".dimmed());
        return Ok(());
    }
    let compiler = Compiler::new(options);
    let output = compiler.compile_file(file).map_err(DriverError::Compile)?;
    let artifact_kind = if binary { "executable" } else { "shared library" };
    tracing::info!(units = output.units.len(), artifact_kind, "build complete");
    println!(
        "{} {} ({} dependency unit(s), {} artifact)",
        "built".green().bold(),
        file.display(),
        output.units.len(),
        artifact_kind
    );
    cache::write_sidecar(file)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum DriverError {
    #[error(transparent)]
    Compile(#[from] crucible_core::error::CompileError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Distinct, non-mandated exit codes per spec §6 so scripts can
    /// branch on failure category without scraping stderr.
    fn exit_code(&self) -> u8 {
        use crucible_core::error::ErrorKind;
        match self {
            DriverError::Io(_) => 7,
            DriverError::Compile(e) => match e.kind {
                ErrorKind::LexError(_) => 1,
                ErrorKind::ParseError(_) => 2,
                ErrorKind::ImportError(_) => 3,
                ErrorKind::SemanticError(_) => 4,
                ErrorKind::TypeError(_) => 5,
                ErrorKind::UnsupportedError(_) => 6,
                ErrorKind::IoError(_) => 7,
                ErrorKind::InternalError(_) => 8,
            },
        }
    }
}
