//! Substitution table applied to every template of one manifest.

use std::collections::BTreeMap;

/// Flat name -> value table consumed by the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenTable {
    tokens: BTreeMap<String, String>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a token.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.tokens.insert(name.into(), value.to_string());
    }

    /// Insert a token only when a value is present.
    pub fn insert_opt(&mut self, name: impl Into<String>, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    /// Merge another table in; its values win.
    pub fn extend(&mut self, other: TokenTable) {
        self.tokens.extend(other.tokens);
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for TokenTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = TokenTable::new();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}
