use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    grimorium::logging::init().context("init logging")?;

    let cli = grimorium::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        grimorium::cli::Command::Paginate(args) => {
            grimorium::paginator::run(args).context("paginate")?;
        }
        grimorium::cli::Command::Library {
            command: grimorium::cli::LibraryCommand::List(args),
        } => {
            grimorium::library::list(args).context("library list")?;
        }
        grimorium::cli::Command::Library {
            command: grimorium::cli::LibraryCommand::Check(args),
        } => {
            grimorium::library::check(args).context("library check")?;
        }
        grimorium::cli::Command::Progress {
            command: grimorium::cli::ProgressCommand::Show(args),
        } => {
            grimorium::progress::show(args).await.context("progress show")?;
        }
    }

    Ok(())
}
