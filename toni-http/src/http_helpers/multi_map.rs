//! Ordered, ASCII-case-insensitive multimap shared by [`Headers`] and
//! [`StringValues`].
//!
//! [`Headers`]: super::Headers
//! [`StringValues`]: super::StringValues

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct MultiMap {
    /// Distinct keys in first-seen order, each with a non-empty value list.
    entries: Vec<(String, Vec<String>)>,
    /// Lowercased key -> position in `entries`.
    index: FxHashMap<String, usize>,
}

impl MultiMap {
    pub(crate) fn position(&self, key: &str) -> Option<usize> {
        self.index.get(&key.to_ascii_lowercase()).copied()
    }

    pub(crate) fn get_all(&self, key: &str) -> &[String] {
        match self.position(key) {
            Some(idx) => &self.entries[idx].1,
            None => &[],
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub(crate) fn append(&mut self, key: String, value: String) {
        match self.position(&key) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.push_entry(key, vec![value]),
        }
    }

    /// Replaces every value under `key`. An empty list removes the key so no
    /// entry ever holds zero values.
    pub(crate) fn set(&mut self, key: String, values: Vec<String>) {
        if values.is_empty() {
            self.remove(&key);
            return;
        }

        match self.position(&key) {
            Some(idx) => self.entries[idx].1 = values,
            None => self.push_entry(key, values),
        }
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let idx = self.index.remove(&key.to_ascii_lowercase())?;
        let (_, values) = self.entries.remove(idx);

        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }

        Some(values)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_entry(&mut self, key: String, values: Vec<String>) {
        self.index.insert(key.to_ascii_lowercase(), self.entries.len());
        self.entries.push((key, values));
    }
}

// Equality ignores key spelling differences the index already folds away.
impl PartialEq for MultiMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(key, values)| other.get_all(key) == values.as_slice())
    }
}

impl Eq for MultiMap {}
