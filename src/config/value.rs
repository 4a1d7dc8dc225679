//! Option values shared by the node configuration and the protocol parameters.

use serde::{Deserialize, Serialize};

/// A composed option value, serialized without any tagging so the JSON
/// documents read exactly like hand-written node and protocol configs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Declared without a default and never supplied
    Null,
    Int(i64),
    Str(String),
    List(Vec<String>),
    /// Multi-field entries, one inner list per occurrence
    Table(Vec<Vec<String>>),
}

impl OptionValue {
    pub fn as_table(&self) -> Option<&[Vec<String>]> {
        match self {
            OptionValue::Table(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Scalar or list value read from a YAML overrides file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Bool(bool),
    Number(i64),
    String(String),
    List(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization() {
        assert_eq!(serde_json::to_string(&OptionValue::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&OptionValue::Int(8)).unwrap(), "8");
        assert_eq!(
            serde_json::to_string(&OptionValue::List(vec!["10".into(), "20".into()])).unwrap(),
            r#"["10","20"]"#
        );
        assert_eq!(
            serde_json::to_string(&OptionValue::Table(vec![vec!["edpk".into(), "1".into()]])).unwrap(),
            r#"[["edpk","1"]]"#
        );
    }

    #[test]
    fn test_override_value_parsing() {
        let parsed: std::collections::BTreeMap<String, OverrideValue> = serde_yaml::from_str(
            "blocks-per-cycle: 16\ntokens-per-roll: \"100\"\ntime-between-blocks: [\"1\", \"2\"]\n",
        )
        .unwrap();
        assert_eq!(parsed["blocks-per-cycle"], OverrideValue::Number(16));
        assert_eq!(parsed["tokens-per-roll"], OverrideValue::String("100".into()));
        assert_eq!(
            parsed["time-between-blocks"],
            OverrideValue::List(vec!["1".into(), "2".into()])
        );
    }
}
