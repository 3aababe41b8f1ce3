//! `harvest-replace`: replace a string in every Markdown file under a root.
//!
//! Lists the affected files first and asks before writing unless `--force`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use harvest_engine::{find_markdown_containing, replace_in_files};
use harvest_logging::{harvest_error, LogDestination};

#[derive(Parser, Debug)]
#[command(
    name = "harvest-replace",
    version,
    about = "Replace a string in all .md files below a directory"
)]
struct Args {
    /// Directory searched recursively for .md files.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Text to replace.
    #[arg(long)]
    source: String,

    /// Replacement text.
    #[arg(long)]
    target: String,

    /// Replace without asking.
    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    harvest_logging::initialize(&LogDestination::Terminal, false);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            harvest_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    println!(
        "Searching {:?} for .md files containing {:?}...",
        args.root, args.source
    );
    let files = find_markdown_containing(&args.root, &args.source)
        .with_context(|| format!("cannot search {:?}", args.root))?;
    if files.is_empty() {
        println!("No files to change.");
        return Ok(());
    }

    println!("\n{} file(s) contain {:?}:", files.len(), args.source);
    for path in &files {
        println!("  - {}", path.display());
    }

    if !args.force {
        print!(
            "\nReplace every {:?} with {:?}? (y/n) ",
            args.source, args.target
        );
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !is_confirmation(&answer) {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let changed = replace_in_files(&files, &args.source, &args.target)?;
    println!("\nDone: {changed} file(s) changed.");
    Ok(())
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
