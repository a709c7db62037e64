//! Typed, serializable descriptions of every write operation.
//!
//! Each write method on [`crate::tx::Tx`] performs its mutation eagerly
//! and, in the same call, builds one of these structs to hand to the log.
//! On recovery the log iterator yields these back in commit order and
//! [`Action::apply`] replays each against a fresh [`crate::db::Database`].

use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::DbResult;

fn warn_on_err<T>(key: &str, result: DbResult<T>) {
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "replayed action did not apply cleanly");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Action {
    SetString { key: String, value: Vec<u8> },
    Append { key: String, value: Vec<u8> },
    IncrBy { key: String, delta: i64 },
    SetExpire { key: String, deadline_ms: i64 },
    GetDel { key: String },
    GetEx { key: String, deadline_ms: i64 },
    MSet { pairs: Vec<(String, Vec<u8>)> },

    HSet { key: String, field: String, value: Vec<u8> },
    HDel { key: String, fields: Vec<String> },
    HIncrBy { key: String, field: String, delta: i64 },

    LPush { key: String, values: Vec<Vec<u8>> },
    LPop { key: String, count: usize },
    LInsert { key: String, index: usize, value: Vec<u8> },

    SAdd { key: String, members: Vec<crate::value::Scalar> },
    SRem { key: String, members: Vec<crate::value::Scalar> },
    SPop { key: String, count: usize },

    ZAdd { key: String, members: Vec<(String, f64)> },
    ZRem { key: String, members: Vec<String> },
    ZIncrBy { key: String, member: String, delta: f64 },
    ZStore { key: String, members: Vec<(String, f64)> },

    Delete { keys: Vec<String> },
}

impl Action {
    /// Replays this action's effect against `db`, bypassing the
    /// transaction log (recovery has no log of its own to append to).
    pub fn apply(self, db: &Database) {
        // Every apply_* call below was already validated once, at commit
        // time, by the live Tx method that produced this action; a
        // failure here means recovered state has drifted from what was
        // committed, so it is logged rather than silently ignored.
        match self {
            Action::SetString { key, value } => db.apply_set_string(&key, value),
            Action::Append { key, value } => db.apply_append(&key, value),
            Action::IncrBy { key, delta } => warn_on_err(&key, db.apply_incr_by(&key, delta)),
            Action::SetExpire { key, deadline_ms } => db.apply_set_expire(&key, deadline_ms),
            Action::GetDel { key } => {
                db.apply_delete(&[key]);
            }
            Action::GetEx { key, deadline_ms } => db.apply_set_expire(&key, deadline_ms),
            Action::MSet { pairs } => {
                for (key, value) in pairs {
                    db.apply_set_string(&key, value);
                }
            }
            Action::HSet { key, field, value } => warn_on_err(&key, db.apply_hset(&key, &field, value)),
            Action::HDel { key, fields } => {
                db.apply_hdel(&key, &fields);
            }
            Action::HIncrBy { key, field, delta } => warn_on_err(&key, db.apply_hincr_by(&key, &field, delta)),
            Action::LPush { key, values } => warn_on_err(&key, db.apply_lpush(&key, values)),
            Action::LPop { key, count } => {
                db.apply_lpop(&key, count);
            }
            Action::LInsert { key, index, value } => warn_on_err(&key, db.apply_linsert(&key, index, value)),
            Action::SAdd { key, members } => warn_on_err(&key, db.apply_sadd(&key, members)),
            Action::SRem { key, members } => {
                db.apply_srem(&key, &members);
            }
            Action::SPop { key, count } => {
                db.apply_spop(&key, count);
            }
            Action::ZAdd { key, members } => warn_on_err(&key, db.apply_zadd(&key, members)),
            Action::ZRem { key, members } => {
                db.apply_zrem(&key, &members);
            }
            Action::ZIncrBy { key, member, delta } => warn_on_err(&key, db.apply_zincr_by(&key, &member, delta)),
            Action::ZStore { key, members } => db.apply_zstore(&key, members),
            Action::Delete { keys } => {
                db.apply_delete(&keys);
            }
        }
    }
}
