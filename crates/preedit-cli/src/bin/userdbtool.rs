use std::path::Path;

use clap::{Parser, Subcommand};

use preedit_cli::commands::userdb_ops;

#[derive(Parser)]
#[command(name = "userdbtool", about = "preedit-core learning-store inspection tool")]
struct Cli {
    /// Learning-store checkpoint file (default: ~/.local/share/preedit/userdb.bin)
    #[arg(long)]
    file: Option<String>,
    /// Entry ceiling to apply when opening the store
    #[arg(long, default_value = "100000")]
    max_entries: usize,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every recorded phrase
    List {
        /// Emit JSON instead of a tab-separated listing
        #[arg(long)]
        json: bool,
    },
    /// Remove one recorded (phrase, context1, context2) entry
    Forget {
        phrase: String,
        #[arg(default_value = "")]
        context1: String,
        #[arg(default_value = "")]
        context2: String,
    },
    /// Run a decay pass and rewrite the checkpoint, truncating the WAL
    Compact,
    /// Show entry/WAL counters without printing every entry
    Info,
}

fn main() {
    let cli = Cli::parse();
    let path_str = cli.file.unwrap_or_else(userdb_ops::default_userdb_path);
    let path = Path::new(&path_str);

    match cli.command {
        Command::List { json } => userdb_ops::list(path, cli.max_entries, json),
        Command::Forget { phrase, context1, context2 } => {
            userdb_ops::forget(path, cli.max_entries, &phrase, &context1, &context2)
        }
        Command::Compact => userdb_ops::compact(path, cli.max_entries),
        Command::Info => userdb_ops::info(path, cli.max_entries),
    }
}
