//! Wire-level command variants, one enum per logical family. Each maps
//! onto exactly one `Database::update`/`view` call (§4.15): deserialize,
//! one transaction, serialize.

use emberdb_core::containers::zset::skiplist::{ScoreBound, ScoreRangeOptions};
use emberdb_core::{Database, Scalar};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;

/// Wire representation of a set/zset member scalar: either kind decodes
/// from whichever JSON type the caller sent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScalarWire {
    Int(i64),
    Str(String),
}

impl From<ScalarWire> for Scalar {
    fn from(w: ScalarWire) -> Self {
        match w {
            ScalarWire::Int(i) => Scalar::Int(i),
            ScalarWire::Str(s) => Scalar::Str(s),
        }
    }
}

impl From<Scalar> for ScalarWire {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Int(i) => ScalarWire::Int(i),
            Scalar::Str(s) => ScalarWire::Str(s),
        }
    }
}

fn bytes_to_json(b: Vec<u8>) -> Value {
    String::from_utf8(b).map_or_else(|e| json!(e.into_bytes()), Value::String)
}

// ---- string family ---------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StringCommand {
    Set { key: String, value: String },
    Get { key: String },
    GetDel { key: String },
    GetEx { key: String, ttl_ms: i64 },
    GetRange { key: String, start: i64, end: i64 },
    MGet { keys: Vec<String> },
    MSet { pairs: Vec<(String, String)> },
    Append { key: String, value: String },
    IncrBy { key: String, delta: i64 },
    DecrBy { key: String, delta: i64 },
    Incr { key: String },
    Decr { key: String },
    Expire { key: String, ttl_ms: i64 },
    Exists { key: String },
    Lcs { key_a: String, key_b: String },
    Del { keys: Vec<String> },
}

pub fn execute_string(cmd: StringCommand, db: &Database) -> Result<Value, ApiError> {
    match cmd {
        StringCommand::Set { key, value } => {
            db.update(|tx| tx.set_string(&key, value))?;
            Ok(json!(null))
        }
        StringCommand::Get { key } => Ok(bytes_to_json(db.view(|tx| tx.get(&key))?)),
        StringCommand::GetDel { key } => Ok(bytes_to_json(db.update(|tx| tx.get_del(&key))?)),
        StringCommand::GetEx { key, ttl_ms } => Ok(bytes_to_json(db.update(|tx| tx.get_ex(&key, ttl_ms))?)),
        StringCommand::GetRange { key, start, end } => {
            Ok(bytes_to_json(db.view(|tx| tx.get_range(&key, start, end))?))
        }
        StringCommand::MGet { keys } => {
            let values = db.view(|tx| Ok(tx.m_get(&keys)))?;
            Ok(json!(values.into_iter().map(|v| v.map(bytes_to_json)).collect::<Vec<_>>()))
        }
        StringCommand::MSet { pairs } => {
            let pairs = pairs.into_iter().map(|(k, v)| (k, v.into_bytes())).collect();
            db.update(|tx| tx.m_set(pairs))?;
            Ok(json!(null))
        }
        StringCommand::Append { key, value } => {
            db.update(|tx| tx.append(&key, value))?;
            Ok(json!(null))
        }
        StringCommand::IncrBy { key, delta } => Ok(json!(db.update(|tx| tx.incr_by(&key, delta))?)),
        StringCommand::DecrBy { key, delta } => Ok(json!(db.update(|tx| tx.decr_by(&key, delta))?)),
        StringCommand::Incr { key } => Ok(json!(db.update(|tx| tx.incr(&key))?)),
        StringCommand::Decr { key } => Ok(json!(db.update(|tx| tx.decr(&key))?)),
        StringCommand::Expire { key, ttl_ms } => {
            db.update(|tx| tx.set_expire(&key, ttl_ms))?;
            Ok(json!(null))
        }
        StringCommand::Exists { key } => Ok(json!(db.view(|tx| Ok(tx.exists(&key)))?)),
        StringCommand::Lcs { key_a, key_b } => Ok(bytes_to_json(db.view(|tx| tx.lcs(&key_a, &key_b))?)),
        StringCommand::Del { keys } => Ok(json!(db.update(|tx| tx.del(keys))?)),
    }
}

// ---- hash family -------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HashCommand {
    Set { key: String, field: String, value: String },
    Get { key: String, field: String },
    GetAll { key: String },
    Exists { key: String, field: String },
    Del { key: String, fields: Vec<String> },
    IncrBy { key: String, field: String, delta: i64 },
    Keys { key: String },
    Len { key: String },
    Vals { key: String },
}

pub fn execute_hash(cmd: HashCommand, db: &Database) -> Result<Value, ApiError> {
    match cmd {
        HashCommand::Set { key, field, value } => {
            db.update(|tx| tx.h_set(&key, &field, value))?;
            Ok(json!(null))
        }
        HashCommand::Get { key, field } => Ok(bytes_to_json(db.view(|tx| tx.h_get(&key, &field))?)),
        HashCommand::GetAll { key } => {
            let pairs = db.view(|tx| tx.h_get_all(&key))?;
            Ok(json!(pairs.into_iter().map(|(f, v)| (f, bytes_to_json(v))).collect::<Vec<_>>()))
        }
        HashCommand::Exists { key, field } => Ok(json!(db.view(|tx| tx.h_exists(&key, &field))?)),
        HashCommand::Del { key, fields } => Ok(json!(db.update(|tx| tx.h_del(&key, fields))?)),
        HashCommand::IncrBy { key, field, delta } => Ok(json!(db.update(|tx| tx.h_incr_by(&key, &field, delta))?)),
        HashCommand::Keys { key } => Ok(json!(db.view(|tx| tx.h_keys(&key))?)),
        HashCommand::Len { key } => Ok(json!(db.view(|tx| tx.h_len(&key))?)),
        HashCommand::Vals { key } => {
            let vals = db.view(|tx| tx.h_vals(&key))?;
            Ok(json!(vals.into_iter().map(bytes_to_json).collect::<Vec<_>>()))
        }
    }
}

// ---- list family --------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ListCommand {
    Push { key: String, values: Vec<String> },
    Pop { key: String, count: usize },
    Index { key: String, index: usize },
    Len { key: String },
    Range { key: String, start: usize, end: usize },
    Insert { key: String, index: usize, value: String },
}

pub fn execute_list(cmd: ListCommand, db: &Database) -> Result<Value, ApiError> {
    match cmd {
        ListCommand::Push { key, values } => {
            let values = values.into_iter().map(String::into_bytes).collect();
            db.update(|tx| tx.l_push(&key, values))?;
            Ok(json!(null))
        }
        ListCommand::Pop { key, count } => {
            let popped = db.update(|tx| tx.l_pop(&key, count))?;
            Ok(json!(popped.into_iter().map(bytes_to_json).collect::<Vec<_>>()))
        }
        ListCommand::Index { key, index } => Ok(bytes_to_json(db.view(|tx| tx.l_index(&key, index))?)),
        ListCommand::Len { key } => Ok(json!(db.view(|tx| tx.l_len(&key))?)),
        ListCommand::Range { key, start, end } => {
            let values = db.view(|tx| tx.l_range(&key, start, end))?;
            Ok(json!(values.into_iter().map(bytes_to_json).collect::<Vec<_>>()))
        }
        ListCommand::Insert { key, index, value } => {
            db.update(|tx| tx.l_insert(&key, index, value))?;
            Ok(json!(null))
        }
    }
}

// ---- set family -----------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SetCommand {
    Add { key: String, members: Vec<ScalarWire> },
    Rem { key: String, members: Vec<ScalarWire> },
    IsMember { key: String, member: ScalarWire },
    Card { key: String },
    Members { key: String },
    RandMember { key: String, count: usize },
    Mismembers { key: String, members: Vec<ScalarWire> },
    Diff { key: String, others: Vec<String> },
    Inter { keys: Vec<String> },
    Union { keys: Vec<String> },
    Pop { key: String, count: usize },
}

fn scalars_to_json(members: Vec<Scalar>) -> Value {
    json!(members.into_iter().map(ScalarWire::from).collect::<Vec<_>>())
}

pub fn execute_set(cmd: SetCommand, db: &Database) -> Result<Value, ApiError> {
    match cmd {
        SetCommand::Add { key, members } => {
            let members = members.into_iter().map(Scalar::from).collect();
            Ok(json!(db.update(|tx| tx.s_add(&key, members))?))
        }
        SetCommand::Rem { key, members } => {
            let members = members.into_iter().map(Scalar::from).collect();
            Ok(json!(db.update(|tx| tx.s_rem(&key, members))?))
        }
        SetCommand::IsMember { key, member } => {
            let member = Scalar::from(member);
            Ok(json!(db.view(|tx| tx.s_is_member(&key, &member))?))
        }
        SetCommand::Card { key } => Ok(json!(db.view(|tx| tx.s_card(&key))?)),
        SetCommand::Members { key } => Ok(scalars_to_json(db.view(|tx| tx.s_members(&key))?)),
        SetCommand::RandMember { key, count } => Ok(scalars_to_json(db.view(|tx| tx.s_rand_member(&key, count))?)),
        SetCommand::Mismembers { key, members } => {
            let members: Vec<Scalar> = members.into_iter().map(Scalar::from).collect();
            Ok(json!(db.view(|tx| tx.s_mismembers(&key, &members))?))
        }
        SetCommand::Diff { key, others } => Ok(scalars_to_json(db.view(|tx| tx.s_diff(&key, &others))?)),
        SetCommand::Inter { keys } => Ok(scalars_to_json(db.view(|tx| tx.s_inter(&keys))?)),
        SetCommand::Union { keys } => Ok(scalars_to_json(db.view(|tx| tx.s_union(&keys))?)),
        SetCommand::Pop { key, count } => Ok(scalars_to_json(db.update(|tx| tx.s_pop(&key, count))?)),
    }
}

// ---- zset family ------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RangeByScoreArgs {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub min_exclusive: bool,
    #[serde(default)]
    pub max_exclusive: bool,
    #[serde(default)]
    pub reverse: bool,
    pub limit: Option<(usize, usize)>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ZSetCommand {
    Add { key: String, members: Vec<(String, f64)> },
    Rem { key: String, members: Vec<String> },
    Card { key: String },
    Score { key: String, member: String },
    Rank { key: String, member: String },
    RevRank { key: String, member: String },
    Range { key: String, start: i64, stop: i64 },
    RangeWithScores { key: String, start: i64, stop: i64 },
    RangeByScore { key: String, args: RangeByScoreArgs },
    IncrBy { key: String, member: String, delta: f64 },
    Diff { key: String, others: Vec<String> },
    DiffCard { key: String, others: Vec<String> },
    DiffStore { dest: String, key: String, others: Vec<String> },
    Inter { keys: Vec<String> },
    InterCard { keys: Vec<String> },
    InterStore { dest: String, keys: Vec<String> },
    Union { keys: Vec<String> },
    UnionCard { keys: Vec<String> },
    UnionStore { dest: String, keys: Vec<String> },
}

pub fn execute_zset(cmd: ZSetCommand, db: &Database) -> Result<Value, ApiError> {
    match cmd {
        ZSetCommand::Add { key, members } => Ok(json!(db.update(|tx| tx.z_add(&key, members))?)),
        ZSetCommand::Rem { key, members } => Ok(json!(db.update(|tx| tx.z_rem(&key, members))?)),
        ZSetCommand::Card { key } => Ok(json!(db.view(|tx| tx.z_card(&key))?)),
        ZSetCommand::Score { key, member } => Ok(json!(db.view(|tx| tx.z_score(&key, &member))?)),
        ZSetCommand::Rank { key, member } => Ok(json!(db.view(|tx| tx.z_rank(&key, &member))?)),
        ZSetCommand::RevRank { key, member } => Ok(json!(db.view(|tx| tx.z_rev_rank(&key, &member))?)),
        ZSetCommand::Range { key, start, stop } => Ok(json!(db.view(|tx| tx.z_range(&key, start, stop))?)),
        ZSetCommand::RangeWithScores { key, start, stop } => {
            Ok(json!(db.view(|tx| tx.z_range_with_scores(&key, start, stop))?))
        }
        ZSetCommand::RangeByScore { key, args } => {
            let min = if args.min_exclusive { ScoreBound::exclusive(args.min) } else { ScoreBound::inclusive(args.min) };
            let max = if args.max_exclusive { ScoreBound::exclusive(args.max) } else { ScoreBound::inclusive(args.max) };
            let opts = ScoreRangeOptions { limit: args.limit, reverse: args.reverse };
            Ok(json!(db.view(|tx| tx.z_range_by_score(&key, min, max, opts))?))
        }
        ZSetCommand::IncrBy { key, member, delta } => Ok(json!(db.update(|tx| tx.z_incr_by(&key, &member, delta))?)),
        ZSetCommand::Diff { key, others } => Ok(json!(db.view(|tx| tx.z_diff(&key, &others))?)),
        ZSetCommand::DiffCard { key, others } => Ok(json!(db.view(|tx| tx.z_diff_card(&key, &others))?)),
        ZSetCommand::DiffStore { dest, key, others } => {
            Ok(json!(db.update(|tx| tx.z_diff_store(&dest, &key, &others))?))
        }
        ZSetCommand::Inter { keys } => Ok(json!(db.view(|tx| tx.z_inter(&keys))?)),
        ZSetCommand::InterCard { keys } => Ok(json!(db.view(|tx| tx.z_inter_card(&keys))?)),
        ZSetCommand::InterStore { dest, keys } => Ok(json!(db.update(|tx| tx.z_inter_store(&dest, &keys))?)),
        ZSetCommand::Union { keys } => Ok(json!(db.view(|tx| tx.z_union(&keys))?)),
        ZSetCommand::UnionCard { keys } => Ok(json!(db.view(|tx| tx.z_union_card(&keys))?)),
        ZSetCommand::UnionStore { dest, keys } => Ok(json!(db.update(|tx| tx.z_union_store(&dest, &keys))?)),
    }
}
