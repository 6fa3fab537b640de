use std::path::Path;

use crate::config::DbConfig;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write-through config: no cache batching, memtable large enough that
/// nothing flushes on its own.
pub fn memtable_only_config(root: &Path) -> DbConfig {
    init_tracing();
    DbConfig {
        data_dir: root.join("data"),
        compaction_dir: root.join("compaction"),
        hot_cache_capacity: 0,
        memtable_max_size: 0,
        ..DbConfig::default()
    }
}

/// Tiny bounds everywhere so flushes and compactions trigger quickly.
pub fn small_buffer_config(root: &Path) -> DbConfig {
    init_tracing();
    DbConfig {
        data_dir: root.join("data"),
        compaction_dir: root.join("compaction"),
        hot_cache_capacity: 0,
        memtable_max_size: 4,
        level0_capacity: 2,
        ..DbConfig::default()
    }
}
