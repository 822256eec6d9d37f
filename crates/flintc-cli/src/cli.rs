//! Argument definitions and dispatch.

use clap::{Parser, Subcommand};

use crate::commands;

#[derive(Parser)]
#[command(name = "flintc", version, about = "Flint compiler front/middle-end")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse and verify a source file without emitting anything.
    Check {
        /// Source file to check.
        file: String,
    },
    /// Print the parsed AST.
    Ast {
        /// Source file to parse.
        file: String,
        /// Emit JSON instead of the debug tree.
        #[arg(long)]
        json: bool,
    },
    /// Print the textual IR of the compiled module, runtime included.
    Ir {
        /// Source file to compile.
        file: String,
    },
}

/// Run one command; the return value becomes the process exit code.
pub fn dispatch(args: Args) -> i32 {
    let result = match args.command {
        Command::Check { file } => commands::check(&file),
        Command::Ast { file, json } => commands::ast(&file, json),
        Command::Ir { file } => commands::ir(&file),
    };
    match result {
        Ok(()) => 0,
        Err(message) => {
            eprintln!("{message}");
            1
        }
    }
}
