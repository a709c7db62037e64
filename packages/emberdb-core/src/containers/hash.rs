//! Hash object: field -> value mapping for a single key.

use ahash::AHashMap;

#[derive(Debug, Default)]
pub struct HashObject {
    fields: AHashMap<String, Vec<u8>>,
}

impl HashObject {
    pub fn new() -> Self {
        HashObject { fields: AHashMap::new() }
    }

    /// Returns the previous value, if any (mirrors HSET's return contract).
    pub fn set(&mut self, field: &str, value: Vec<u8>) -> Option<Vec<u8>> {
        self.fields.insert(field.to_string(), value)
    }

    pub fn get(&self, field: &str) -> Option<&[u8]> {
        self.fields.get(field).map(|v| v.as_slice())
    }

    pub fn exists(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn del(&mut self, fields: &[String]) -> usize {
        fields.iter().filter(|f| self.fields.remove(*f).is_some()).count()
    }

    pub fn incr_by(&mut self, field: &str, delta: i64) -> Result<i64, String> {
        let current = match self.fields.get(field) {
            Some(bytes) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| format!("hash value is not an integer: {field}"))?,
            None => 0,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| "increment would overflow".to_string())?;
        self.fields.insert(field.to_string(), next.to_string().into_bytes());
        Ok(next)
    }

    pub fn keys(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Vec<u8>> {
        self.fields.values().cloned().collect()
    }

    pub fn all(&self) -> Vec<(String, Vec<u8>)> {
        self.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trip() {
        let mut h = HashObject::new();
        h.set("f", b"v".to_vec());
        assert_eq!(h.get("f"), Some(&b"v"[..]));
    }

    #[test]
    fn set_returns_previous_value() {
        let mut h = HashObject::new();
        assert_eq!(h.set("f", b"1".to_vec()), None);
        assert_eq!(h.set("f", b"2".to_vec()), Some(b"1".to_vec()));
    }

    #[test]
    fn del_counts_removed_fields() {
        let mut h = HashObject::new();
        h.set("a", b"1".to_vec());
        h.set("b", b"2".to_vec());
        let removed = h.del(&["a".to_string(), "missing".to_string()]);
        assert_eq!(removed, 1);
        assert!(!h.exists("a"));
        assert!(h.exists("b"));
    }

    #[test]
    fn incr_by_creates_field_at_zero() {
        let mut h = HashObject::new();
        assert_eq!(h.incr_by("counter", 5).unwrap(), 5);
        assert_eq!(h.incr_by("counter", -2).unwrap(), 3);
    }

    #[test]
    fn incr_by_rejects_non_integer_values() {
        let mut h = HashObject::new();
        h.set("f", b"not-a-number".to_vec());
        assert!(h.incr_by("f", 1).is_err());
    }

    #[test]
    fn keys_values_all_reflect_contents() {
        let mut h = HashObject::new();
        h.set("a", b"1".to_vec());
        h.set("b", b"2".to_vec());
        assert_eq!(h.len(), 2);
        let mut keys = h.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(h.all().len(), 2);
    }
}
