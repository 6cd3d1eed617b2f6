//! Case-insensitive multi-value header container.
//!
//! Header names are lowercased on insertion; values keep their insertion
//! order, including across duplicate names. Iteration via [`HeaderMap::entries`]
//! is deterministic: names appear in first-insertion order, and a multi-valued
//! header appears once per value.

/// A case-insensitive, multi-value header map with deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    // Small maps; linear scans beat hashing at typical header counts.
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`. The name is lowercased; repeated names
    /// accumulate values in insertion order.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Append a value under `name` if it is present; `None` is skipped and
    /// never appears in [`entries`](Self::entries).
    pub fn insert_opt(&mut self, name: impl AsRef<str>, value: Option<String>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    /// Append every value in `values` under `name`.
    pub fn insert_all<I, V>(&mut self, name: impl AsRef<str>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.insert(name.as_ref(), value);
        }
    }

    /// Whether any value is present under `name` (case-insensitive).
    pub fn has(&self, name: impl AsRef<str>) -> bool {
        let name = name.as_ref().to_ascii_lowercase();
        self.entries.iter().any(|(n, _)| *n == name)
    }

    /// The first value under `name`, if any.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// All values under `name`, in insertion order.
    pub fn get_all(&self, name: impl AsRef<str>) -> &[String] {
        let name = name.as_ref().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over `(name, value)` pairs in insertion order. Multi-valued
    /// headers yield one pair per value; names are lowercased.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values.iter().map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no headers at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String> + AsRef<str>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name.as_ref(), value);
        }
        map
    }
}
