//! CLI argument definitions for the Pagetree binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Inspect and build Pagetree documents
#[derive(Parser, Debug)]
#[command(name = "pagetree")]
#[command(about = "Pagetree: collaborative page/block/component documents")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Origin tag used for the batches this invocation writes
    #[arg(long, global = true, env = "PAGETREE_CLIENT_ID")]
    pub client_id: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a document from JSON page descriptors
    Import(ImportArgs),
    /// Print the page tree of a document snapshot
    Show(SnapshotArgs),
    /// Verify the structural invariants of a document snapshot
    Check(SnapshotArgs),
}

/// Arguments for the import command
#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// JSON file holding an array of page descriptors
    pub input: PathBuf,

    /// Existing snapshot to import into. Starts from an empty document when
    /// omitted.
    #[arg(long)]
    pub into: Option<PathBuf>,

    /// Where to write the resulting snapshot
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for commands that read a snapshot
#[derive(clap::Args, Debug)]
pub struct SnapshotArgs {
    /// Snapshot file written by `pagetree import --out`
    pub snapshot: PathBuf,
}
