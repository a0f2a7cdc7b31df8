use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "outbox-weaver",
    version,
    about = "Merge Mastodon archive exports into one outbox and rebuild reply threads"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    /// Log progress at info level (OUTBOX_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Combine every archive export below the archives dir into the outbox.
    Merge {
        #[arg(long)]
        archives_dir: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Rebuild reply threads from the merged outbox.
    Threads {
        #[arg(long)]
        outbox: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        include_replies_to_others: bool,
        #[arg(long)]
        include_non_public: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show resolved paths, config and outbox state.
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let report = match cli.command {
        Command::Merge {
            archives_dir,
            output,
            dry_run,
        } => commands::merge::run(&commands::merge::MergeOptions {
            archives_dir,
            output,
            dry_run,
        })?,
        Command::Threads {
            outbox,
            output,
            include_replies_to_others,
            include_non_public,
            dry_run,
        } => commands::threads::run(&commands::threads::ThreadsOptions {
            outbox,
            output,
            include_replies_to_others,
            include_non_public,
            dry_run,
        })?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
