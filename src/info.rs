//! Introspection trees.
//!
//! Every component can describe itself as an [`InfoStructure`]: an ordered list
//! of key/value pairs plus named child structures. Debuggers and consoles render
//! these without knowing the component's concrete type.

use std::fmt;

/// A key/value description of a component with nested children.
///
/// # Examples
///
/// ```
/// use lib8bit::InfoStructure;
///
/// let timer = InfoStructure::new().with("value", 0x1234).with("counting", true);
/// let chip = InfoStructure::new().with("name", "CIA1").with_child("timer A", timer);
///
/// assert_eq!(chip.get("name"), Some("CIA1"));
/// assert_eq!(chip.child("timer A").and_then(|t| t.get("value")), Some("4660"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfoStructure {
    entries: Vec<(String, String)>,
    children: Vec<(String, InfoStructure)>,
}

impl InfoStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.add(key, value);
        self
    }

    /// Adds a child structure, builder style.
    pub fn with_child(mut self, name: impl Into<String>, child: InfoStructure) -> Self {
        self.add_child(name, child);
        self
    }

    /// Adds or replaces an entry.
    pub fn add(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn add_child(&mut self, name: impl Into<String>, child: InfoStructure) {
        self.children.push((name.into(), child));
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up a child by name.
    pub fn child(&self, name: &str) -> Option<&InfoStructure> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &InfoStructure)> {
        self.children.iter().map(|(n, c)| (n.as_str(), c))
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        for (k, v) in &self.entries {
            writeln!(f, "{}{}: {}", pad, k, v)?;
        }
        for (name, child) in &self.children {
            writeln!(f, "{}{}:", pad, name)?;
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for InfoStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_existing_key() {
        let mut info = InfoStructure::new().with("pc", "$0000");
        info.add("pc", "$8000");
        assert_eq!(info.get("pc"), Some("$8000"));
        assert_eq!(info.entries().count(), 1);
    }

    #[test]
    fn test_display_nests_children() {
        let info = InfoStructure::new()
            .with("name", "cpu")
            .with_child("flags", InfoStructure::new().with("C", 1));
        assert_eq!(info.to_string(), "name: cpu\nflags:\n  C: 1\n");
    }
}
