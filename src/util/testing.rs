//! Test setup shared by unit and integration tests.

use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{NodeId, RankDefinition, RankSchema, TreeFamily};
use crate::tree::Tree;

static TEST_SETUP: Once = Once::new();

/// Install a global tracing subscriber once per test binary.
///
/// `RUST_LOG` controls the level, defaulting to `debug`.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let noisy_modules = ["rayon"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Schema with ranks 0, 10, 20, ... `levels` deep, none enforced.
pub fn flat_schema(levels: u32) -> RankSchema {
    let ranks = (0..levels)
        .map(|i| RankDefinition::new(i * 10, format!("Level{i}")))
        .collect();
    RankSchema::new(99, ranks).unwrap_or_else(|e| panic!("test schema: {e}"))
}

/// Create a chain of `depth` nodes below `parent`, one per level.
pub fn chain<F: TreeFamily>(tree: &mut Tree<F>, parent: NodeId, depth: u32) -> Vec<NodeId> {
    let start = tree
        .get(parent)
        .map(|n| n.rank_id)
        .unwrap_or_else(|e| panic!("chain parent: {e}"));
    let mut ids = Vec::with_capacity(depth as usize);
    let mut current = parent;
    for level in 1..=depth {
        current = tree
            .create_child(current, start + level * 10, &format!("n{level}"))
            .unwrap_or_else(|e| panic!("chain level {level}: {e}"));
        ids.push(current);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_flat_schema_when_built_then_levels_ascend_by_ten() {
        let schema = flat_schema(4);
        let ids: Vec<u32> = schema.ranks().iter().map(|r| r.rank_id).collect();
        assert_eq!(ids, vec![0, 10, 20, 30]);
    }
}
