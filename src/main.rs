// File: src/main.rs
//
// CLI entry point: run a script file or launch the REPL. Argument parsing,
// file IO, and process exit codes — ambient scaffolding around the VM core,
// not part of the interpreter itself.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};

use lumen::repl::Repl;
use lumen::vm::{InterpretResult, Vm};

#[derive(ClapParser)]
#[command(
    name = "lumen",
    about = "Lumen: a small class-based scripting language",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print each executed instruction and the value stack before it runs.
    #[arg(long, global = true)]
    trace: bool,

    /// Bytes the heap may grow to before the first collection (default 1 MiB).
    #[arg(long, global = true)]
    heap_limit: Option<usize>,

    /// Multiplier applied to live bytes to compute the next collection
    /// threshold once one has run (default 2).
    #[arg(long, global = true)]
    growth_factor: Option<usize>,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Run a Lumen script file.
    Run {
        /// Path to the .lumen file.
        file: PathBuf,
    },

    /// Launch the interactive Lumen REPL.
    Repl,
}

fn build_vm(cli: &Cli) -> Vm {
    let mut vm = Vm::new().with_trace(cli.trace);
    if let Some(limit) = cli.heap_limit {
        vm = vm.with_heap_limit(limit);
    }
    if let Some(factor) = cli.growth_factor {
        vm = vm.with_growth_factor(factor);
    }
    vm
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { file } => {
            let source = match fs::read_to_string(file) {
                Ok(source) => source,
                Err(err) => {
                    eprintln!("Can't read '{}': {}", file.display(), err);
                    return ExitCode::from(74);
                }
            };
            let mut vm = build_vm(&cli);
            // Exit codes follow the sysexits.h convention: 65 for a compile
            // error, 70 for a runtime fault.
            match vm.interpret(&source) {
                InterpretResult::Ok => ExitCode::SUCCESS,
                InterpretResult::CompileError => ExitCode::from(65),
                InterpretResult::RuntimeError => ExitCode::from(70),
            }
        }
        Commands::Repl => {
            let vm = build_vm(&cli);
            match Repl::new(vm) {
                Ok(mut repl) => match repl.run() {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(err) => {
                        eprintln!("REPL error: {}", err);
                        ExitCode::from(1)
                    }
                },
                Err(err) => {
                    eprintln!("Failed to start REPL: {}", err);
                    ExitCode::from(1)
                }
            }
        }
    }
}
