use clap::{Parser, Subcommand};

use preedit_cli::commands::{compose_ops, dict_ops};

#[derive(Parser)]
#[command(name = "preeditool", about = "preedit-core locale bundle build/inspect tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a word-list dictionary source file
    DictValidate {
        /// Path to the word-list text file (one word per line)
        file: String,
    },
    /// Look up a prefix against a word-list source file
    DictLookup {
        /// Path to the word-list text file
        file: String,
        /// Prefix to search for
        prefix: String,
    },
    /// Validate a compose file (and any `include`d files)
    ComposeValidate {
        /// Path to the system compose file
        file: String,
        /// Path to a user overlay compose file, loaded after `file`
        #[arg(long)]
        user_file: Option<String>,
        #[arg(long, default_value = "en_US")]
        locale: String,
        #[arg(long, default_value = "/usr/share/X11/locale")]
        system_dir: String,
        #[arg(long)]
        home_dir: Option<String>,
    },
    /// Show compose completions for a key-sequence prefix
    ComposeCompletions {
        /// Path to the system compose file
        file: String,
        /// Space-separated keysym prefix, e.g. "dead_macron"
        prefix: Vec<String>,
        /// Path to a user overlay compose file, loaded after `file`
        #[arg(long)]
        user_file: Option<String>,
        #[arg(long, default_value = "en_US")]
        locale: String,
        #[arg(long, default_value = "/usr/share/X11/locale")]
        system_dir: String,
        #[arg(long)]
        home_dir: Option<String>,
    },
}

fn home_dir_or_default(home_dir: Option<String>) -> String {
    home_dir.unwrap_or_else(|| std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::DictValidate { file } => dict_ops::validate(&file),
        Command::DictLookup { file, prefix } => dict_ops::lookup(&file, &prefix),
        Command::ComposeValidate { file, user_file, locale, system_dir, home_dir } => {
            compose_ops::validate(&file, user_file.as_deref(), &locale, &system_dir, &home_dir_or_default(home_dir))
        }
        Command::ComposeCompletions { file, prefix, user_file, locale, system_dir, home_dir } => {
            compose_ops::completions(&file, user_file.as_deref(), &locale, &system_dir, &home_dir_or_default(home_dir), &prefix)
        }
    }
}
