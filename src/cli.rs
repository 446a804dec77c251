use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Paginate(PaginateArgs),
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    Progress {
        #[command(subcommand)]
        command: ProgressCommand,
    },
}

#[derive(Debug, Args)]
pub struct PaginateArgs {
    /// Chapter HTML file to paginate.
    #[arg(long)]
    pub input: String,

    /// Page budget in words of stripped text (default: 400).
    #[arg(long)]
    pub budget_words: Option<usize>,

    /// Page budget in characters of stripped text.
    #[arg(long)]
    pub budget_chars: Option<usize>,

    /// Print each page's HTML fragment, not just per-page stats.
    #[arg(long, default_value_t = false)]
    pub show_pages: bool,
}

#[derive(Debug, Subcommand)]
pub enum LibraryCommand {
    List(LibraryArgs),
    Check(LibraryArgs),
}

#[derive(Debug, Args)]
pub struct LibraryArgs {
    /// Grimoire catalog YAML document.
    #[arg(long)]
    pub catalog: String,
}

#[derive(Debug, Subcommand)]
pub enum ProgressCommand {
    Show(ProgressShowArgs),
}

#[derive(Debug, Args)]
pub struct ProgressShowArgs {
    /// Directory holding the local progress store.
    #[arg(long)]
    pub data_dir: String,

    /// User identifier.
    #[arg(long)]
    pub user: String,

    /// Show a single grimoire's record instead of the full list.
    #[arg(long)]
    pub grimoire: Option<String>,
}
