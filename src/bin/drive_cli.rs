//! Thin command-line harness over a freshly bootstrapped [`hyperdrive::Drive`].
//!
//! The in-memory reference feed/trie only live for the process's lifetime,
//! so there is no "reopen an existing drive on disk" story here; instead
//! this runs either one ad hoc subcommand, or a TOML script of several
//! operations against one drive within a single process.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;

use hyperdrive::feed::memory::MemoryFeedFactory;
use hyperdrive::feed::FeedFactory;
use hyperdrive::trie::memory::MemoryTrie;
use hyperdrive::{Drive, Error, KeyPair};

#[derive(Parser)]
#[command(name = "drive-cli", about = "Exercise a Hyperdrive instance from the command line")]
struct Cli {
    /// TOML script of operations to run instead of a single subcommand.
    #[arg(long)]
    script: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Command {
    /// Write `data` to `path`, creating it if necessary.
    Write { path: String, data: String },
    /// Print the contents of `path`.
    Read { path: String },
    /// List the direct children of `path`.
    Ls { path: String },
    /// Create a directory at `path`.
    Mkdir { path: String },
    /// Print the stat record for `path`.
    Stat { path: String },
}

#[derive(Deserialize)]
struct Script {
    #[serde(default)]
    op: Vec<Command>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let feeds: Arc<dyn FeedFactory> = Arc::new(MemoryFeedFactory::new());
    let trie = Arc::new(MemoryTrie::new());
    let drive = Drive::open(KeyPair::generate(), trie, feeds).await?;

    if let Some(script_path) = cli.script {
        let contents = std::fs::read_to_string(&script_path)?;
        let script: Script = toml::from_str(&contents)?;
        for op in script.op {
            run(&drive, op).await?;
        }
        return Ok(());
    }

    match cli.command {
        Some(command) => run(&drive, command).await?,
        None => eprintln!("nothing to do: pass --script <file.toml> or a subcommand"),
    }
    Ok(())
}

async fn run(drive: &Drive, command: Command) -> Result<(), Error> {
    match command {
        Command::Write { path, data } => {
            drive.write_file(&path, data.as_bytes()).await?;
            println!("wrote {} bytes to {path}", data.len());
        }
        Command::Read { path } => {
            let data = drive.read_file(&path).await?;
            println!("{}", String::from_utf8_lossy(&data));
        }
        Command::Ls { path } => {
            for entry in drive.read_dir(&path).await? {
                println!("{entry}");
            }
        }
        Command::Mkdir { path } => {
            drive.mkdir(&path).await?;
            println!("created {path}");
        }
        Command::Stat { path } => {
            let stat = drive.stat(&path).await?;
            println!("{stat:?}");
        }
    }
    Ok(())
}
