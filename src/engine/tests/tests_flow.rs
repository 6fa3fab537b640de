#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::engine::Db;
    use crate::engine::tests::helpers::{memtable_only_config, small_buffer_config};
    use tempfile::TempDir;

    #[test]
    fn test_memtable_overflow_flushes_to_level0() {
        let tmp = TempDir::new().unwrap();
        let mut db = Db::open(small_buffer_config(tmp.path())).unwrap();

        // memtable_max_size = 4: the fifth distinct key freezes the tree
        // and hands it to the LSM manager.
        for i in 0..5 {
            db.put(&format!("key-{i}"), &format!("value-{i}")).unwrap();
        }

        let stats = db.stats().unwrap();
        assert_eq!(stats.level0_runs, 1);
        assert_eq!(stats.buffered_records, 1);

        for i in 0..5 {
            assert_eq!(
                db.get(&format!("key-{i}")).unwrap(),
                Some(format!("value-{i}")),
            );
        }
    }

    #[test]
    fn test_sustained_writes_reach_level1() {
        let tmp = TempDir::new().unwrap();
        let mut db = Db::open(small_buffer_config(tmp.path())).unwrap();

        // 4 records per flush, 2 flushes per compaction: 40 writes churn
        // through several merges.
        for i in 0..40 {
            db.put(&format!("key-{i:02}"), &format!("value-{i}")).unwrap();
        }

        let stats = db.stats().unwrap();
        assert_eq!(stats.level1_runs, 1);

        for i in 0..40 {
            assert_eq!(
                db.get(&format!("key-{i:02}")).unwrap(),
                Some(format!("value-{i}")),
                "key-{i:02}",
            );
        }
    }

    #[test]
    fn test_overwrites_survive_the_full_pipeline() {
        let tmp = TempDir::new().unwrap();
        let mut db = Db::open(small_buffer_config(tmp.path())).unwrap();

        for round in 0..6 {
            for key in ["a", "b", "c", "d"] {
                db.put(key, &format!("{key}-{round}")).unwrap();
            }
        }

        for key in ["a", "b", "c", "d"] {
            assert_eq!(db.get(key).unwrap(), Some(format!("{key}-5")));
        }
    }

    #[test]
    fn test_delete_suppresses_flushed_values() {
        let tmp = TempDir::new().unwrap();
        let mut db = Db::open(memtable_only_config(tmp.path())).unwrap();

        db.put("k", "v").unwrap();
        db.flush().unwrap();

        // The tombstone sits above the on-disk value.
        db.delete("k").unwrap();
        assert_eq!(db.get("k").unwrap(), None);

        // And keeps suppressing it once it is flushed itself.
        db.flush().unwrap();
        assert_eq!(db.get("k").unwrap(), None);
    }

    #[test]
    fn test_put_after_delete_resurrects() {
        let tmp = TempDir::new().unwrap();
        let mut db = Db::open(memtable_only_config(tmp.path())).unwrap();

        db.put("k", "v1").unwrap();
        db.flush().unwrap();
        db.delete("k").unwrap();
        db.flush().unwrap();
        db.put("k", "v2").unwrap();

        assert_eq!(db.get("k").unwrap(), Some("v2".to_owned()));
    }

    #[test]
    fn test_close_persists_and_reopen_recovers() {
        let tmp = TempDir::new().unwrap();
        let config = memtable_only_config(tmp.path());

        {
            let mut db = Db::open(config.clone()).unwrap();
            for i in 0..10 {
                db.put(&format!("key-{i}"), &format!("value-{i}")).unwrap();
            }
            db.delete("key-3").unwrap();
            db.close().unwrap();
        }

        let db = Db::open(config).unwrap();
        for i in 0..10 {
            let expected = if i == 3 {
                None
            } else {
                Some(format!("value-{i}"))
            };
            assert_eq!(db.get(&format!("key-{i}")).unwrap(), expected, "key-{i}");
        }
    }

    #[test]
    fn test_random_workload_matches_a_model() {
        use rand::Rng;

        let tmp = TempDir::new().unwrap();
        let mut db = Db::open(small_buffer_config(tmp.path())).unwrap();
        let mut model: HashMap<String, Option<String>> = HashMap::new();
        let mut rng = rand::rng();

        for op in 0..300 {
            let key = format!("key-{:02}", rng.random_range(0..20));
            if rng.random_bool(0.25) {
                db.delete(&key).unwrap();
                model.insert(key, None);
            } else {
                let value = format!("value-{op}");
                db.put(&key, &value).unwrap();
                model.insert(key, Some(value));
            }
        }

        for (key, expected) in &model {
            assert_eq!(db.get(key).unwrap(), *expected, "key {key}");
        }

        // The same state must be visible after a restart.
        db.close().unwrap();
        let tmp_config = small_buffer_config(tmp.path());
        let db = Db::open(tmp_config).unwrap();
        for (key, expected) in &model {
            assert_eq!(db.get(key).unwrap(), *expected, "key {key} after reopen");
        }
    }
}
