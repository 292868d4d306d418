use super::multi_map::MultiMap;

/// Read-only multi-valued collection produced by the query, cookie and form
/// parsers.
///
/// Once a parser hands it out the collection is an immutable snapshot. Keys
/// compare ASCII-case-insensitively; values keep the order they were found in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringValues {
    map: MultiMap,
}

impl StringValues {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key)
    }

    /// First value for `key`, or `default` when the key is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// All values for `key` in encounter order; empty when absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.map.get_all(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn append(&mut self, key: String, value: String) {
        self.map.append(key, value);
    }

    /// Keep only `value` under `key` (last-seen wins).
    pub(crate) fn replace(&mut self, key: String, value: String) {
        self.map.set(key, vec![value]);
    }
}

impl<K, V> FromIterator<(K, V)> for StringValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = StringValues::new();
        for (key, value) in iter {
            values.append(key.into(), value.into());
        }
        values
    }
}
