use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

mod commands;
mod configuration;
mod error;
mod prompt;
mod session;

use commands::describe::describe_scene;
use commands::scan::scan_file;
use commands::session::build_session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session that turns requests into scene code
    Session {
        /// Blender scene the model may ask about
        #[arg(short, long)]
        scene: Option<PathBuf>,

        /// Name of the session, used for its log file
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Render the cameras of a scene and describe it
    Describe {
        /// Blender scene file
        file: PathBuf,
    },

    /// Check generated code for risky constructs
    Scan {
        /// Python source file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match cli.command {
        Command::Session { scene, name } => {
            let mut session = build_session(scene, name).await?;
            session.start().await?;
        }
        Command::Describe { file } => describe_scene(&file).await?,
        Command::Scan { file } => {
            if !scan_file(&file)? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
