//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::FamilyKind;

/// Rank-constrained collection hierarchies: numbering, synonyms and full names
#[derive(Parser, Debug)]
#[command(name = "ranktree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -v info, -vv debug, -vvv trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Explicit config file (applied after the global one)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Snapshot directory (default: `snapshot_dir` setting)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a family as a tree
    Show {
        /// Tree family (taxon, geography, storage, ...)
        family: FamilyKind,
        /// Show composed full names
        #[arg(short, long, conflicts_with = "numbers")]
        full_names: bool,
        /// Show node number intervals and ids
        #[arg(short, long)]
        numbers: bool,
    },

    /// Check intervals, ranks and synonym links of every family
    Verify,

    /// Renumber a family and recompose all of its full names
    Rebuild {
        family: FamilyKind,
        /// Write to this file instead of overwriting the snapshot
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Build a family snapshot from flat `[[records]]` in a TOML file
    Import {
        family: FamilyKind,
        #[arg(value_hint = ValueHint::FilePath)]
        records: PathBuf,
    },

    /// Print the full name of a node
    FullName { family: FamilyKind, id: u64 },

    /// Print the accepted node a reference to `id` should use
    Resolve { family: FamilyKind, id: u64 },

    /// List the proper descendants of a node
    Descendants { family: FamilyKind, id: u64 },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented template config
    Template,
    /// Show config file locations
    Path,
}
