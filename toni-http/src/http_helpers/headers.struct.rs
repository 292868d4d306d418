use super::multi_map::MultiMap;

/// Request header dictionary.
///
/// Keys compare ASCII-case-insensitively for every operation. Each key holds
/// an ordered, non-empty list of values exactly as they arrived on the wire;
/// multiple values are never joined implicitly, callers choose their own join
/// policy. Iteration follows first-insertion order of distinct keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    map: MultiMap,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the first value of a header (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name)
    }

    /// Get every value of a header, empty when the header is absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.map.get_all(name)
    }

    /// Check if a header exists
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains(name)
    }

    /// Replace all values of a header.
    ///
    /// Setting an empty sequence removes the header.
    pub fn set<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.map.set(name.into(), values);
    }

    /// Add one more value to a header, creating it if needed.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.append(name.into(), value.into());
    }

    /// Remove a header, returning its values if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.map.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.map.iter()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.append(name, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        headers.extend(iter);
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_headers() -> Headers {
        Headers::from_iter([
            ("Content-Type", "application/json"),
            ("Accept", "text/html"),
            ("accept", "application/xml"),
        ])
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let headers = create_test_headers();

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.get("X-Custom"), None);
    }

    #[test]
    fn test_values_are_not_joined() {
        let headers = create_test_headers();

        assert_eq!(headers.get_all("Accept"), ["text/html", "application/xml"]);
        assert_eq!(headers.get("accept"), Some("text/html"));
        assert!(headers.get_all("missing").is_empty());
    }

    #[test]
    fn test_set_replaces_and_empty_set_removes() {
        let mut headers = create_test_headers();

        headers.set("ACCEPT", ["*/*"]);
        assert_eq!(headers.get_all("accept"), ["*/*"]);

        headers.set("accept", Vec::<String>::new());
        assert!(!headers.contains("Accept"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut headers = create_test_headers();

        let removed = headers.remove("content-type").unwrap();
        assert_eq!(removed, vec!["application/json".to_string()]);
        assert!(headers.remove("content-type").is_none());
    }

    #[test]
    fn test_iteration_order_is_stable() {
        let mut headers = create_test_headers();
        headers.append("X-Request-Id", "abc");

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Content-Type", "Accept", "X-Request-Id"]);
    }
}
