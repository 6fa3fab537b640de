use std::path::Path;

use crate::config::DbConfig;
use crate::memtable::RbTree;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config rooted in a temp directory, with the default Level-0 capacity
/// of 4.
pub fn config_in(root: &Path) -> DbConfig {
    init_tracing();
    DbConfig {
        data_dir: root.join("data"),
        compaction_dir: root.join("compaction"),
        ..DbConfig::default()
    }
}

/// Builds an unbounded tree from key/value pairs.
pub fn tree_of(pairs: &[(&str, &str)]) -> RbTree {
    let mut tree = RbTree::new(0);
    for (key, value) in pairs {
        tree.insert(key, value).unwrap();
    }
    tree
}
