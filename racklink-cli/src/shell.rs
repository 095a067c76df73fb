//! Interactive shell on a single session

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tokio::io::{AsyncBufReadExt, BufReader};

use racklink::Client;

use crate::cli::Operation;

const PROMPT: &str = "racklink> ";

/// A line typed at the prompt, parsed with the one-shot command grammar
#[derive(Parser, Debug)]
#[command(name = "racklink", no_binary_name = true, disable_help_subcommand = true)]
struct ShellLine {
    #[command(subcommand)]
    op: Operation,
}

/// What the user asked for on one line
#[derive(Debug)]
pub enum ShellInput {
    Empty,
    Help,
    Quit,
    Run(Operation),
}

/// Parse one shell line
///
/// The command word is case-insensitive. Errors come back as the text to
/// show the user.
pub fn parse_line(line: &str) -> Result<ShellInput, String> {
    let mut words: Vec<String> = line.split_whitespace().map(String::from).collect();

    let Some(first) = words.first_mut() else {
        return Ok(ShellInput::Empty);
    };
    *first = first.to_lowercase();

    match first.as_str() {
        "quit" | "exit" | "q" => return Ok(ShellInput::Quit),
        "help" | "?" => return Ok(ShellInput::Help),
        _ => {}
    }

    match ShellLine::try_parse_from(&words) {
        Ok(line) => Ok(ShellInput::Run(line.op)),
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            Err(format!("Unknown command '{}'. Type 'help' for help.", words[0]))
        }
        Err(e) => Err(e.to_string().trim_end().to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  ping                    - Send a ping");
    println!("  count                   - Show the number of outlets");
    println!("  list                    - List all outlets");
    println!("  get <n>                 - Show outlet n");
    println!("  on <n>                  - Turn outlet n on");
    println!("  off <n>                 - Turn outlet n off");
    println!("  raw <cmd> <sub> [data]  - Send a raw command (hex)");
    println!("  sensors                 - Read all sensors");
    println!("  sensor <kind>           - Read one sensor");
    println!("  help                    - Show this help");
    println!("  quit                    - Exit");
}

/// Read commands from stdin until quit, EOF or a lost connection
pub async fn run(client: &mut Client) -> Result<()> {
    println!("RackLink interactive shell. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", PROMPT);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_line(&line) {
            Ok(ShellInput::Empty) => {}
            Ok(ShellInput::Help) => print_help(),
            Ok(ShellInput::Quit) => break,
            Ok(ShellInput::Run(op)) => {
                if let Err(e) = crate::execute(client, op).await {
                    println!("✗ {:#}", e);
                }

                if !client.is_connected() {
                    println!("✗ Connection lost");
                    break;
                }
            }
            Err(message) => println!("{}", message),
        }
    }

    Ok(())
}
