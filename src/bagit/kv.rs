/// Insertion-ordered multimap used for parsed tag files and manifests (§3). Keys may repeat;
/// `keys()` returns each distinct key once, in the order it was first inserted.
#[derive(Debug, Clone, Default)]
pub struct KeyValueCollection {
    entries: Vec<(String, String)>,
}

impl KeyValueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.push((key.into(), value.into()));
    }

    /// The first value associated with `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values associated with `key`, in insertion order.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct keys, in first-insertion order.
    pub fn keys(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for (k, _) in &self.entries {
            if !seen.iter().any(|s: &&str| *s == k.as_str()) {
                seen.push(k.as_str());
            }
        }
        seen
    }

    /// All `(key, value)` pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_and_repeats() {
        let mut kv = KeyValueCollection::new();
        kv.add("Source-Organization", "SFU");
        kv.add("Contact-Name", "Alice");
        kv.add("Source-Organization", "York");

        assert_eq!(Some("SFU"), kv.first("Source-Organization"));
        assert_eq!(vec!["SFU", "York"], kv.all("Source-Organization"));
        assert_eq!(
            vec!["Source-Organization", "Contact-Name"],
            kv.keys()
        );
        assert_eq!(None, kv.first("Missing"));
    }
}
