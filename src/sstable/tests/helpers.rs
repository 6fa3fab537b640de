use crate::memtable::RbTree;
use crate::sstable::Record;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The seven-record fixture shared across the codec tests: keys "1".."7"
/// inserted out of order, values `x, b, c, d, e, f, g` in key order.
pub fn seven_record_tree() -> RbTree {
    let mut tree = RbTree::new(0);
    for (key, value) in [
        ("5", "e"),
        ("6", "f"),
        ("7", "g"),
        ("3", "c"),
        ("4", "d"),
        ("1", "x"),
        ("2", "b"),
    ] {
        tree.insert(key, value).unwrap();
    }
    tree
}

/// Shorthand record constructor for merge tests.
pub fn record(key: &str, value: &str, written_at: u64, tombstone: bool) -> Record {
    Record {
        key: key.to_owned(),
        value: value.to_owned(),
        written_at,
        tombstone,
    }
}
