//! emberdb core -- keyspace engine, transaction pipeline, append log.
//!
//! - **Radix tree** ([`radix`]): prefix-compressed store for the string namespace
//! - **Containers** ([`containers`]): hash, adaptive list, adaptive set, ordered set
//! - **Dictionary** ([`dict`]) and **TTL store** ([`ttl`]): the keyspace itself
//! - **Log** ([`log`]): segmented append-only journal and replay
//! - **Transactions** ([`tx`]): the `update`/`view` mutation surface
//! - **Database** ([`db`]): open/recovery and the top-level engine
//! - **Sweeper/evicter** ([`sweeper`]): background expiration and eviction

pub mod actions;
pub mod clock;
pub mod config;
pub mod containers;
pub mod db;
pub mod dict;
pub mod error;
pub mod log;
pub mod radix;
pub mod sweeper;
pub mod ttl;
pub mod tx;
pub mod value;

pub use config::{DbConfig, EvictionPolicy, FlushPolicy};
pub use db::Database;
pub use error::{DbError, DbResult};
pub use sweeper::{spawn_evicter, spawn_sweeper};
pub use tx::Tx;
pub use value::{Scalar, Value};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;

    fn open_db(dir: &std::path::Path) -> Database {
        let mut config = DbConfig::default();
        config.aof_path = dir.to_path_buf();
        Database::open(config).expect("open database")
    }

    #[test]
    fn scenario_set_then_get() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        db.update(|tx| tx.set_string("foo", "bar")).unwrap();
        let got = db.view(|tx| tx.get("foo")).unwrap();
        assert_eq!(got, b"bar");
    }

    #[test]
    fn scenario_incr_by_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let db = open_db(dir.path());
            db.update(|tx| tx.set_string("foo", "3")).unwrap();
            db.update(|tx| tx.incr_by("foo", 2)).unwrap();
        }
        let db = open_db(dir.path());
        let got = db.view(|tx| tx.get("foo")).unwrap();
        assert_eq!(got, b"5");
    }

    #[test]
    fn scenario_list_push_then_reopen() {
        let dir = tempdir().unwrap();
        {
            let db = open_db(dir.path());
            for i in 0..100 {
                db.update(|tx| tx.l_push("foo", vec![format!("data_{i}").into_bytes()])).unwrap();
            }
        }
        let db = open_db(dir.path());
        for i in 0..100 {
            let got = db.view(|tx| tx.l_index("foo", i)).unwrap();
            assert_eq!(got, format!("data_{i}").into_bytes());
        }
    }

    #[test]
    fn scenario_set_add_then_remove_all() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        for i in 0..100 {
            db.update(|tx| tx.s_add("foo", vec![Scalar::from(format!("value_{i}").as_str())])).unwrap();
        }
        for i in 0..100 {
            db.update(|tx| tx.s_rem("foo", vec![Scalar::from(format!("value_{i}").as_str())])).unwrap();
        }
        let is_member = db.view(|tx| tx.s_is_member("foo", &Scalar::from("value_7"))).unwrap();
        assert!(!is_member);
    }

    #[test]
    fn scenario_zset_add_then_reopen() {
        let dir = tempdir().unwrap();
        {
            let db = open_db(dir.path());
            for i in 0..100 {
                db.update(|tx| tx.z_add("foo", vec![(format!("member_{i}"), i as f64)])).unwrap();
            }
        }
        let db = open_db(dir.path());
        let card = db.view(|tx| tx.z_card("foo")).unwrap();
        assert_eq!(card, 100);
        for i in 0..100 {
            let members = db.view(|tx| tx.z_range("foo", i, i)).unwrap();
            assert_eq!(members, vec![format!("member_{i}")]);
        }
    }

    #[test]
    fn scenario_expired_key_is_invisible() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        db.update(|tx| tx.set_string("foo", "bar")).unwrap();
        db.update(|tx| tx.set_expire("foo", 1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        let result = db.view(|tx| tx.get("foo"));
        assert!(result.is_err());
    }

    #[test]
    fn view_rejects_writes() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let result = db.view(|tx| tx.set_string("foo", "bar"));
        assert!(matches!(result, Err(DbError::ContractViolation(_))));
    }

    #[test]
    fn wrong_type_access_is_rejected() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        db.update(|tx| tx.set_string("foo", "bar")).unwrap();
        let result = db.view(|tx| tx.h_get("foo", "field"));
        assert!(matches!(result, Err(DbError::WrongType { .. })));
    }

    #[tokio::test]
    async fn sweeper_reaps_expired_keys_in_background() {
        let dir = tempdir().unwrap();
        let mut config = DbConfig::default();
        config.aof_path = dir.path().to_path_buf();
        config.sweeper_interval = std::time::Duration::from_millis(10);
        let db = Arc::new(Database::open(config).unwrap());
        db.update(|tx| tx.set_string("foo", "bar")).unwrap();
        db.update(|tx| tx.set_expire("foo", 1)).unwrap();

        let handle = spawn_sweeper(db.clone());
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        handle.abort();

        assert_eq!(db.dict_len(), 0);
    }
}
