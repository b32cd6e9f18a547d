use std::io::Read;

use clap::{Parser, Subcommand};
use quill::{parse_to_string, run, tokenize_to_string};

/// quill is a tool for managing quill source code.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a quill program.
    Run {
        /// Source file. `-` reads standard input.
        #[arg(default_value = "-")]
        source: String,
    },
    /// Print the token stream of a quill program.
    Tokenize {
        /// Source file. `-` reads standard input.
        #[arg(default_value = "-")]
        source: String,
    },
    /// Print the parsed AST of a quill program.
    Parse {
        /// Source file. `-` reads standard input.
        #[arg(default_value = "-")]
        source: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let (Command::Run { source } | Command::Tokenize { source } | Command::Parse { source }) =
        &cli.command;

    let text = read_source(source).unwrap_or_else(|err| {
                                      eprintln!("failed to read '{source}': {err}");
                                      std::process::exit(1);
                                  });

    match &cli.command {
        Command::Run { .. } => {
            let mut printer = |s: &str| print!("{s}");
            run(&text, &mut printer);
        },
        Command::Tokenize { .. } => print!("{}", tokenize_to_string(&text)),
        Command::Parse { .. } => println!("{}", parse_to_string(&text)),
    }
}

fn read_source(source: &str) -> std::io::Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(source)
}
