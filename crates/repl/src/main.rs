//! staxr - REPL and file driver for the Stax VM
//!
//! Usage:
//!   staxr                    # interactive REPL
//!   staxr program.stax       # compile + run a file, print the stack
//!   staxr -e "2 3 +"         # evaluate one unit and print the stack
//!
//! REPL commands:
//!   :quit, :q                # exit
//!   :stack                   # print the operand stack
//!   :words                   # list bound words
//!   :reset                   # discard the session (fresh VM)
//!   :help                    # show help
//!
//! Exit codes: 0 on success, 1 when compilation or evaluation fails.

mod config;
mod engine;
mod format;

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

use config::ReplConfig;
use engine::Session;

#[derive(ClapParser)]
#[command(name = "staxr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stax REPL and file runner", long_about = None)]
struct Cli {
    /// Stax source file to execute (starts the REPL when omitted)
    file: Option<PathBuf>,

    /// Evaluate one unit of source text and print the resulting stack
    #[arg(short = 'e', long = "eval", value_name = "SOURCE")]
    eval: Option<String>,

    /// Alternate config file (default: ~/.staxr.toml if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    // Log level via STAXR_LOG; quiet by default so the REPL stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STAXR_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("staxr=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "staxr", &mut io::stdout());
        return;
    }

    let config = match ReplConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let result = if let Some(source) = cli.eval {
        run_source(config, &source)
    } else if let Some(file) = cli.file {
        run_file(config, &file)
    } else {
        repl(config)
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Evaluate one unit and print the final stack.
fn run_source(config: ReplConfig, source: &str) -> Result<(), String> {
    let mut session = Session::new(config);
    session.eval_unit(source).map_err(|e| e.to_string())?;
    let stack = session.stack_line();
    if !stack.is_empty() {
        println!("{stack}");
    }
    Ok(())
}

/// Compile and run a whole source file, then print the final stack.
fn run_file(config: ReplConfig, path: &Path) -> Result<(), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
    info!(file = %path.display(), "running");
    run_source(config, &source)
}

/// The interactive loop: one compile unit per line, stack echoed after
/// each successful evaluation.
fn repl(config: ReplConfig) -> Result<(), String> {
    if config.banner {
        println!("Stax {} - :help for commands, :quit to leave", env!("CARGO_PKG_VERSION"));
    }

    let history = config.history_path();
    let mut session = Session::new(config);
    let mut editor = DefaultEditor::new().map_err(|e| format!("readline init failed: {e}"))?;
    if let Some(path) = &history {
        // Missing history is normal on first run.
        let _ = editor.load_history(path);
    }

    loop {
        match editor.readline("stax> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                // ':' also opens a colon definition, so only the known
                // command names are intercepted; ': f ... ;' falls through.
                if let Some(command) = line.strip_prefix(':')
                    && is_meta_command(command.trim())
                {
                    if !meta_command(&mut session, command.trim()) {
                        break;
                    }
                    continue;
                }
                match session.eval_unit(line) {
                    Ok(()) => println!("  {}", nonempty(session.stack_line())),
                    Err(e) => eprintln!("{e}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(format!("readline failed: {e}")),
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
    Ok(())
}

fn is_meta_command(command: &str) -> bool {
    matches!(command, "q" | "quit" | "stack" | "words" | "reset" | "help")
}

/// Handle a `:command`; returns false when the REPL should exit.
fn meta_command(session: &mut Session, command: &str) -> bool {
    match command {
        "q" | "quit" => return false,
        "stack" => println!("  {}", nonempty(session.stack_line())),
        "words" => println!("{}", session.words().join(" ")),
        "reset" => {
            session.reset();
            println!("session reset");
        }
        "help" => {
            println!(":quit, :q    exit");
            println!(":stack       print the operand stack");
            println!(":words       list bound words");
            println!(":reset       discard the session");
        }
        _ => {}
    }
    true
}

fn nonempty(stack: String) -> String {
    if stack.is_empty() { "<empty>".to_string() } else { stack }
}
