//! Terminal output for ranktree commands.
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

use crate::application::FamilyReport;
use crate::domain::TreeNode;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "warning".yellow(), msg);
}

/// One line per family: green check with node count, or red cross with the
/// integrity error. Returns whether the family passed.
pub fn family_report(report: &FamilyReport) -> bool {
    match &report.result {
        Ok(()) => {
            println!(
                "{} {:<22} {}",
                "✓".green(),
                report.kind.to_string(),
                format!("{} nodes", report.nodes).dimmed()
            );
            true
        }
        Err(e) => {
            println!("{} {:<22} {}", "✗".red(), report.kind.to_string(), e);
            false
        }
    }
}

/// Print a snapshot write: `Rebuilt: storage (12 nodes) -> path`.
pub fn written(verb: &str, what: &(impl Display + ?Sized), target: &Path) {
    println!("{}: {} -> {}", verb.green(), what, target.display());
}

/// Tab-separated id, interval and name, for piping into other tools.
pub fn node_row(node: &TreeNode) {
    let marker = if node.is_accepted { "" } else { " (synonym)" };
    println!("{}\t{}\t{}{}", node.id, node.interval, node.name, marker);
}

pub fn location(label: &str, path: &Path) {
    println!("{:>8}: {}", label.cyan(), path.display());
}

/// Plain data on stdout.
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}
