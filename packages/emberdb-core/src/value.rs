//! The tagged value kinds a key can hold.

use serde::{Deserialize, Serialize};

use crate::containers::hash::HashObject;
use crate::containers::list::quicklist::QuickList;
use crate::containers::set::SetObject;
use crate::containers::zset::ZsetObject;

/// A set member or hash field value: either of the two scalar kinds the
/// original dynamically-typed containers could hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scalar {
    Int(i64),
    Str(String),
}

impl Scalar {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Str(s) => s.parse().ok(),
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Scalar::Int(i) => i.to_string(),
            Scalar::Str(s) => s.clone(),
        }
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

/// The kind of value a live key holds. The `StringRef` variant carries no
/// payload: its presence means "consult the string store by this key",
/// keeping the dictionary entry itself cheap regardless of value size.
#[derive(Debug)]
pub enum Value {
    StringRef,
    Hash(HashObject),
    List(QuickList),
    Set(SetObject),
    ZSet(ZsetObject),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::StringRef => "string",
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::ZSet(_) => "zset",
        }
    }
}
