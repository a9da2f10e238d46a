#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "basalt")]
#[command(author, version, about = "A BASIC-family to JavaScript transpiler", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compile a source file to JavaScript
    Compile {
        /// Input file, or "-" to read from stdin
        input: String,

        /// Output file (if not specified, prints to stdout)
        #[arg(long, short = 'o')]
        outfile: Option<PathBuf>,
    },

    /// Start an HTTP compile server
    Serve {
        /// Port to listen on
        #[arg(long, short = 'p', default_value = "7878")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that handle their own output (JSON to stdout, no logging)
    if let Some(Commands::Compile { input, outfile }) = &cli.command {
        return commands::compile::run(input, outfile.as_deref(), cli.json);
    }

    // Initialize logging for other commands
    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Serve { port, host }) => commands::serve::run(&host, port),
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Compile { .. }) => {
            unreachable!() // Handled above
        }
    }
}
