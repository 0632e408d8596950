//! Kestrel CLI
//!
//! Main entry point for the `kestrel` command.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use kestrel::debugger::{EditorInput, LineSource, ScriptedInput};
use kestrel::{Completion, DebugConfig, Debugger, Interpreter, SourceFile, Value};

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "The Kestrel scripting language and debugger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Kestrel program
    Run {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Run under the interactive debugger
        #[arg(short, long)]
        debug: bool,

        /// Disable colored debugger output
        #[arg(long)]
        no_color: bool,

        /// Extra lines shown by the debugger's `list` command
        #[arg(long, value_name = "N", default_value_t = 5)]
        list_window: usize,

        /// Do not pause before the first statement
        #[arg(long)]
        no_stop_on_entry: bool,
    },

    /// Start the interactive REPL
    Repl,

    /// Parse a Kestrel file and print its AST as JSON
    Parse {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show information about this build
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries program and debugger output; logs go to stderr
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Run {
            input,
            debug,
            no_color,
            list_window,
            no_stop_on_entry,
        } => {
            let config = debug.then(|| DebugConfig {
                color: !no_color,
                list_window,
                stop_on_entry: !no_stop_on_entry,
                ..DebugConfig::default()
            });
            run(&input, config)
        }
        Commands::Repl => kestrel::repl::run(),
        Commands::Parse { input } => parse(&input),
        Commands::Info => info(),
    }
}

fn read_source(input: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(input)
        .map_err(|e| miette::miette!("Failed to read input file: {}", e))?;
    Ok(SourceFile::new(input.to_string_lossy().to_string(), content))
}

fn run(input: &Path, debug: Option<DebugConfig>) -> Result<()> {
    tracing::info!("Running {:?}", input);

    let source = read_source(input)?;
    let program = kestrel::parse_source(&source.content)?;
    tracing::debug!("Parsed {} statements", program.stmts.len());

    let mut interpreter = Interpreter::new();
    if let Some(config) = debug {
        let commands: Box<dyn LineSource> = if std::io::stdin().is_terminal() {
            Box::new(
                EditorInput::new()
                    .map_err(|e| miette::miette!("Failed to open terminal: {}", e))?,
            )
        } else {
            Box::new(
                ScriptedInput::from_reader(std::io::stdin().lock())
                    .map_err(|e| miette::miette!("Failed to read debugger commands: {}", e))?,
            )
        };
        let debugger = Debugger::new(
            &source.content,
            config,
            commands,
            Box::new(std::io::stdout()),
        );
        interpreter.attach_debugger(debugger);
    }

    match interpreter.run(&program) {
        Ok(Completion::Value(Value::Nil)) => Ok(()),
        Ok(Completion::Value(result)) => {
            println!("{}", result);
            Ok(())
        }
        Ok(Completion::Quit) => std::process::exit(0),
        Err(e) => Err(kestrel::diagnostics::with_source(e, &source)),
    }
}

fn parse(input: &Path) -> Result<()> {
    let source = read_source(input)?;
    let program = kestrel::parse_source(&source.content)?;
    let json = serde_json::to_string_pretty(&program)
        .map_err(|e| miette::miette!("Failed to serialize AST: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn info() -> Result<()> {
    println!("Kestrel v{}", kestrel::VERSION);
    println!();
    println!("Debugger commands:");
    println!("{}", kestrel::debugger::command::HELP);
    Ok(())
}
