// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notestash::{ConfigArgs, Desk, SortKey};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notestash", about = "Markdown notes with embedded media", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes
    List {
        /// recent, oldest, title or title-desc
        #[arg(long, short, default_value = "recent")]
        sort: SortKey,

        /// Case-insensitive filter over title, content and tags
        #[arg(long, short = 'q', default_value = "")]
        search: String,
    },

    /// Print a note
    Show {
        /// Note filename, e.g. Trip_to_Rome.md
        filename: String,
    },

    /// Save a new note
    New {
        /// Title (empty for an untitled note)
        #[arg(long, short, default_value = "")]
        title: String,

        /// Read content from a file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Replace a note's content and tags
    Edit {
        filename: String,

        /// Read content from a file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Tags (comma-separated); existing tags are kept when omitted
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Save under a new title as well
        #[arg(long)]
        rename: Option<String>,
    },

    /// Delete a note with its media and sidecar
    Delete {
        filename: String,

        /// Skip the summary and delete right away
        #[arg(long, short)]
        yes: bool,
    },

    /// Bundle a note and its media into a zip archive
    Export {
        filename: String,

        /// Copy the archive here before it is cleaned up
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Copy a media file into staging and print its marker
    Stage {
        path: PathBuf,

        /// Alt text for the printed marker
        #[arg(long, default_value = "")]
        alt: String,
    },

    /// Show tags and their colors
    Tags,
}

fn read_content(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.into_config();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    tracing::debug!("Notes: {}, staging: {}", config.notes_dir.display(), config.staging_dir.display());
    let desk = Desk::open(&config)?;

    match cli.command {
        Commands::List { sort, search } => {
            let notes = desk.list(sort, &search);
            if notes.is_empty() {
                println!("No notes found");
            }
            for note in notes {
                let tags = if note.tags.is_empty() { String::new() } else { format!(" [{}]", note.tags.join(", ")) };
                println!("{:<40} {}{}", note.filename, note, tags);
            }
        }

        Commands::Show { filename } => {
            let note = desk.note(&filename)?;
            println!("# {}", note.title);
            if !note.tags.is_empty() {
                println!("tags: {}", note.tags.join(", "));
            }
            println!();
            println!("{}", note.content);
        }

        Commands::New { title, file, tags } => {
            let content = read_content(file)?;
            let note = desk.save_new(&title, &content, &tags)?;
            println!("Saved as {}", note.filename);
        }

        Commands::Edit { filename, file, tags, rename } => {
            let content = read_content(file)?;
            let current = desk.note(&filename)?;
            let tags = tags.unwrap_or(current.tags);
            let mut note = desk.save_edit(&filename, &content, &tags)?;
            if let Some(title) = rename {
                note = desk.rename(&note.filename, &title)?;
            }
            println!("Saved changes to {}", note.filename);
        }

        Commands::Delete { filename, yes } => {
            let plan = desk.delete_plan(&filename)?;
            if !yes {
                println!("{}: {}", plan.title, plan.describe());
                println!("Re-run with --yes to confirm.");
                return Ok(());
            }
            let report = desk.delete(&filename)?;
            println!("Deleted {} ({} images)", filename, report.media_removed.len());
        }

        Commands::Export { filename, out } => {
            let exported = desk.export(&filename).await?;
            match out {
                Some(dest) => {
                    std::fs::copy(&exported.path, &dest)
                        .with_context(|| format!("copying archive to {}", dest.display()))?;
                    println!("Exported to {}", dest.display());
                }
                None => println!("{} ({})", exported.path.display(), exported.url),
            }
            if !exported.skipped.is_empty() {
                println!("Missing media skipped: {}", exported.skipped.join(", "));
            }
            tracing::info!("Waiting for archive cleanup");
            exported.cleanup.await.context("archive cleanup task")?;
        }

        Commands::Stage { path, alt } => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("upload");
            let target = desk.stage_upload(name, &bytes)?;
            println!("![{}]({})", alt, target);
        }

        Commands::Tags => {
            let colors = desk.tag_colors();
            if colors.is_empty() {
                println!("No tags");
            }
            for (tag, color) in colors {
                println!("{:<24} {}", tag, color);
            }
        }
    }

    Ok(())
}
