//! Operational commands for a quill deployment.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use quill_db::{Database, MirrorStore, SqliteMirror};
use quill_server::migrate::{copy_to_secondary, describe_post};
use quill_types::models::PostSort;

#[derive(Debug, Parser)]
#[command(name = "quill-admin", version, about = "Maintenance commands for the quill blog stores")]
struct Cli {
    /// Primary store path
    #[arg(long, env = "QUILL_DB_PATH", default_value = "quill.db")]
    db_path: PathBuf,

    /// Secondary store path
    #[arg(long, env = "QUILL_SECONDARY_DB_PATH", default_value = "quill-secondary.db")]
    secondary_db_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the secondary store and its tables
    SetupSecondary,
    /// Copy every post and comment from the primary into the secondary
    Migrate,
    /// Print every post in the primary store
    CheckPosts,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill_admin=info,quill_server=info,quill_db=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::SetupSecondary => {
            SqliteMirror::create(&cli.secondary_db_path)?;
        }
        Command::Migrate => {
            let db = Database::open(&cli.db_path)?;
            let mirror = SqliteMirror::probe(&cli.secondary_db_path)
                .context("run `quill-admin setup-secondary` first")?;

            let report = copy_to_secondary(&db, &mirror)?;
            info!(
                "Copied {} posts ({} failed), {} comments ({} failed)",
                report.posts_copied,
                report.posts_failed,
                report.comments_copied,
                report.comments_failed
            );

            let counts = mirror.counts()?;
            println!("Secondary store: {}", mirror.path().display());
            println!("Posts in secondary: {}", counts.posts);
            println!("Comments in secondary: {}", counts.comments);
        }
        Command::CheckPosts => {
            let db = Database::open(&cli.db_path)?;
            let posts = db.list_posts(PostSort::DateAsc)?;
            println!("Total posts in database: {}\n", posts.len());
            for (i, post) in posts.iter().enumerate() {
                println!("{}", describe_post(i + 1, post));
            }
        }
    }

    Ok(())
}
