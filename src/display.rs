//! Render a family as a `termtree` for the terminal.

use termtree::Tree as TermTree;
use tracing::instrument;

use crate::domain::{NodeId, TreeFamily};
use crate::tree::Tree;

/// What each rendered line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Label {
    /// Node name only
    #[default]
    Name,
    /// Composed full name
    FullName,
    /// Name with node number interval and id
    Numbered,
}

pub trait TreeDisplay {
    fn to_term_tree(&self, label: Label) -> TermTree<String>;
}

impl<F: TreeFamily> TreeDisplay for Tree<F> {
    #[instrument(level = "debug", skip(self))]
    fn to_term_tree(&self, label: Label) -> TermTree<String> {
        match self.root() {
            Some(root) => build(self, root, label),
            None => TermTree::new(format!("{} (empty)", self.family_name())),
        }
    }
}

fn build<F: TreeFamily>(tree: &Tree<F>, id: NodeId, label: Label) -> TermTree<String> {
    let mut term = TermTree::new(line(tree, id, label));
    if let Ok(children) = tree.children_of(id) {
        for child in children {
            term.push(build(tree, child.id, label));
        }
    }
    term
}

fn line<F: TreeFamily>(tree: &Tree<F>, id: NodeId, label: Label) -> String {
    let Ok(node) = tree.get(id) else {
        return format!("<missing {}>", id);
    };
    let text = match label {
        Label::Name => node.name.clone(),
        Label::FullName => tree.display_name(id),
        Label::Numbered => format!(
            "{} [{}..{}] {}",
            node.name,
            node.node_number(),
            node.highest_child_node_number(),
            id
        ),
    };
    match node.accepted_id {
        Some(accepted) if !node.is_accepted => format!("{} = {}", text, accepted),
        _ => text,
    }
}
