//! Protocol parameters composer.
//!
//! Every recognized option carries a typed default, so composing an empty
//! token sequence yields a complete parameters document. The
//! `bootstrap-accounts` option is repeatable and multi-field: each
//! occurrence adds one `(public key, mutez, ...)` row.

use super::options::{
    apply_override, apply_value, push_row, split_flag, take_fields, take_value, DefaultValue,
    OptionKind, OptionSpec,
};
use super::value::{OptionValue, OverrideValue};
use super::ComposeError;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

pub const BOOTSTRAP_ACCOUNTS: &str = "bootstrap-accounts";

/// Parameter values read from an overrides file, keyed by option name
pub type ParameterOverrides = BTreeMap<String, OverrideValue>;

const PARAMETER_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(BOOTSTRAP_ACCOUNTS, OptionKind::Table, DefaultValue::None),
    OptionSpec::new("preserved-cycles", OptionKind::Int, DefaultValue::Int(2)),
    OptionSpec::new("blocks-per-cycle", OptionKind::Int, DefaultValue::Int(8)),
    OptionSpec::new("blocks-per-commitment", OptionKind::Int, DefaultValue::Int(4)),
    OptionSpec::new("blocks-per-roll-snapshot", OptionKind::Int, DefaultValue::Int(4)),
    OptionSpec::new("blocks-per-voting-period", OptionKind::Int, DefaultValue::Int(64)),
    OptionSpec::new("time-between-blocks", OptionKind::List, DefaultValue::List(&["10", "20"])),
    OptionSpec::new("endorsers-per-block", OptionKind::Int, DefaultValue::Int(32)),
    OptionSpec::new("hard-gas-limit-per-operation", OptionKind::Str, DefaultValue::Str("800000")),
    OptionSpec::new("hard-gas-limit-per-block", OptionKind::Str, DefaultValue::Str("8000000")),
    OptionSpec::new("proof-of-work-threshold", OptionKind::Str, DefaultValue::Str("0")),
    OptionSpec::new("tokens-per-roll", OptionKind::Str, DefaultValue::Str("8000000000")),
    OptionSpec::new("michelson-maximum-type-size", OptionKind::Int, DefaultValue::Int(1000)),
    OptionSpec::new("seed-nonce-revelation-tip", OptionKind::Str, DefaultValue::Str("125000")),
    OptionSpec::new("origination-size", OptionKind::Int, DefaultValue::Int(257)),
    OptionSpec::new("block-security-deposit", OptionKind::Str, DefaultValue::Str("512000000")),
    OptionSpec::new("endorsement-security-deposit", OptionKind::Str, DefaultValue::Str("64000000")),
    OptionSpec::new("endorsement-reward", OptionKind::List, DefaultValue::List(&["2000000"])),
    OptionSpec::new("cost-per-byte", OptionKind::Str, DefaultValue::Str("1000")),
    OptionSpec::new("hard-storage-limit-per-operation", OptionKind::Str, DefaultValue::Str("60000")),
    OptionSpec::new("test-chain-duration", OptionKind::Str, DefaultValue::Str("1966080")),
    OptionSpec::new("quorum-min", OptionKind::Int, DefaultValue::Int(2000)),
    OptionSpec::new("quorum-max", OptionKind::Int, DefaultValue::Int(7000)),
    OptionSpec::new("min-proposal-quorum", OptionKind::Int, DefaultValue::Int(500)),
    OptionSpec::new("initial-endorsers", OptionKind::Int, DefaultValue::Int(1)),
    OptionSpec::new("delay-per-missing-endorsement", OptionKind::Str, DefaultValue::Str("1")),
    OptionSpec::new("baking-reward-per-endorsement", OptionKind::List, DefaultValue::List(&["200000"])),
];

/// Flat protocol parameters, keyed by option name in hyphen form.
///
/// Serializes with the protocol's own field names (`preserved_cycles`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ParametersRecord {
    values: BTreeMap<String, OptionValue>,
}

impl ParametersRecord {
    fn defaults() -> Self {
        let values = PARAMETER_OPTIONS
            .iter()
            .map(|spec| (spec.flag.to_string(), spec.default.to_value()))
            .collect();
        Self { values }
    }

    pub fn get(&self, option: &str) -> Option<&OptionValue> {
        self.values.get(option)
    }

    /// Rows supplied through `--bootstrap-accounts`, empty when none were.
    pub fn bootstrap_accounts(&self) -> &[Vec<String>] {
        self.get(BOOTSTRAP_ACCOUNTS)
            .and_then(OptionValue::as_table)
            .unwrap_or(&[])
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for ParametersRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (option, value) in &self.values {
            map.serialize_entry(&option.replace('-', "_"), value)?;
        }
        map.end()
    }
}

fn find_option(name: &str) -> Option<&'static OptionSpec> {
    PARAMETER_OPTIONS.iter().find(|spec| spec.flag == name)
}

/// Compose protocol parameters from a flat option sequence.
pub fn compose_parameters<S: AsRef<str>>(
    tokens: &[S],
) -> std::result::Result<ParametersRecord, ComposeError> {
    compose_parameters_with(&ParameterOverrides::new(), tokens)
}

/// Compose protocol parameters, applying `overrides` on top of the defaults
/// before the option sequence.
pub fn compose_parameters_with<S: AsRef<str>>(
    overrides: &ParameterOverrides,
    tokens: &[S],
) -> std::result::Result<ParametersRecord, ComposeError> {
    let mut record = ParametersRecord::defaults();

    for (name, value) in overrides {
        let spec = find_option(&name.replace('_', "-"))
            .ok_or_else(|| ComposeError::UnknownOption(name.clone()))?;
        let slot = record.values.entry(spec.flag.to_string()).or_insert(OptionValue::Null);
        apply_override(spec, value, slot)?;
    }

    let mut cursor = 0;
    while let Some(token) = tokens.get(cursor).map(AsRef::as_ref) {
        let (flag, inline) =
            split_flag(token).ok_or_else(|| ComposeError::UnknownOption(token.to_string()))?;
        let spec = find_option(flag).ok_or_else(|| ComposeError::UnknownOption(token.to_string()))?;
        cursor += 1;

        let slot = record.values.entry(spec.flag.to_string()).or_insert(OptionValue::Null);
        if spec.kind == OptionKind::Table {
            let row = take_fields(spec.flag, inline, tokens, &mut cursor)?;
            push_row(slot, row);
        } else {
            let raw = take_value(spec.flag, inline, tokens, &mut cursor)?;
            apply_value(spec, raw, slot)?;
        }
    }

    Ok(record)
}

/// Load a YAML file of parameter overrides.
pub fn load_overrides(path: &Path) -> Result<ParameterOverrides> {
    info!("Loading protocol parameter overrides from: {:?}", path);

    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open parameters file '{}'", path.display()))?;
    let overrides: ParameterOverrides = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse parameters file '{}'", path.display()))?;

    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_input_yields_defaults() {
        let tokens: [&str; 0] = [];
        let record = compose_parameters(&tokens).unwrap();

        assert_eq!(record.get("preserved-cycles"), Some(&OptionValue::Int(2)));
        assert_eq!(record.get("blocks-per-cycle"), Some(&OptionValue::Int(8)));
        assert_eq!(record.get("origination-size"), Some(&OptionValue::Int(257)));
        assert_eq!(record.get("tokens-per-roll"), Some(&OptionValue::Str("8000000000".into())));
        assert_eq!(
            record.get("time-between-blocks"),
            Some(&OptionValue::List(vec!["10".into(), "20".into()]))
        );
        assert_eq!(record.get(BOOTSTRAP_ACCOUNTS), Some(&OptionValue::Null));
        assert!(record.bootstrap_accounts().is_empty());

        for spec in PARAMETER_OPTIONS {
            assert_eq!(record.get(spec.flag), Some(&spec.default.to_value()), "{}", spec.flag);
        }
    }

    #[test]
    fn test_bootstrap_accounts_accumulate() {
        let record = compose_parameters(&[
            "--bootstrap-accounts", "edpkA", "4000000000000",
            "--preserved-cycles", "3",
            "--bootstrap-accounts", "edpkB", "100", "delegate",
        ])
        .unwrap();

        assert_eq!(
            record.bootstrap_accounts(),
            &[
                vec!["edpkA".to_string(), "4000000000000".to_string()],
                vec!["edpkB".to_string(), "100".to_string(), "delegate".to_string()],
            ]
        );
        assert_eq!(record.get("preserved-cycles"), Some(&OptionValue::Int(3)));
    }

    #[test]
    fn test_json_uses_protocol_field_names() {
        let record = compose_parameters(&["--bootstrap-accounts", "edpkA", "1"]).unwrap();
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(json["preserved_cycles"], 2);
        assert_eq!(json["bootstrap_accounts"], serde_json::json!([["edpkA", "1"]]));
        assert_eq!(json["endorsement_reward"], serde_json::json!(["2000000"]));
        assert!(json.get("preserved-cycles").is_none());
    }

    #[test]
    fn test_unknown_option_fails() {
        let err = compose_parameters(&["--no-such-thing", "1"]).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownOption(ref o) if o == "--no-such-thing"));

        let err = compose_parameters(&["stray"]).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownOption(_)));
    }

    #[test]
    fn test_typed_values() {
        let record = compose_parameters(&[
            "--blocks-per-cycle=16",
            "--time-between-blocks", "1",
            "--time-between-blocks", "2",
            "--cost-per-byte", "250",
        ])
        .unwrap();
        assert_eq!(record.get("blocks-per-cycle"), Some(&OptionValue::Int(16)));
        assert_eq!(
            record.get("time-between-blocks"),
            Some(&OptionValue::List(vec!["2".into()]))
        );
        assert_eq!(record.get("cost-per-byte"), Some(&OptionValue::Str("250".into())));

        let err = compose_parameters(&["--quorum-min", "lots"]).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidValue { .. }));
    }

    #[test]
    fn test_bootstrap_accounts_requires_fields() {
        let err = compose_parameters(&["--bootstrap-accounts", "--quorum-min", "1"]).unwrap_err();
        assert!(matches!(err, ComposeError::MissingValue { .. }));
    }

    #[test]
    fn test_non_repeatable_lists_keep_last_value() {
        let record = compose_parameters(&[
            "--endorsement-reward", "1",
            "--endorsement-reward", "2",
            "--baking-reward-per-endorsement=3",
        ])
        .unwrap();
        assert_eq!(record.get("endorsement-reward"), Some(&OptionValue::List(vec!["2".into()])));
        assert_eq!(
            record.get("baking-reward-per-endorsement"),
            Some(&OptionValue::List(vec!["3".into()]))
        );
    }

    #[test]
    fn test_overrides_apply_before_tokens() {
        let mut overrides = ParameterOverrides::new();
        overrides.insert("blocks_per_cycle".to_string(), OverrideValue::Number(16));
        overrides.insert("time-between-blocks".to_string(), OverrideValue::List(vec!["5".into(), "5".into()]));
        overrides.insert("preserved-cycles".to_string(), OverrideValue::Number(5));

        let record = compose_parameters_with(
            &overrides,
            &["--preserved-cycles", "3", "--bootstrap-accounts", "edpkA", "1"],
        )
        .unwrap();
        assert_eq!(record.get("blocks-per-cycle"), Some(&OptionValue::Int(16)));
        assert_eq!(
            record.get("time-between-blocks"),
            Some(&OptionValue::List(vec!["5".into(), "5".into()]))
        );
        assert_eq!(record.get("preserved-cycles"), Some(&OptionValue::Int(3)));
        assert_eq!(record.bootstrap_accounts(), &[vec!["edpkA".to_string(), "1".to_string()]]);
    }

    #[test]
    fn test_unknown_override_fails() {
        let mut overrides = ParameterOverrides::new();
        overrides.insert("no_such_thing".to_string(), OverrideValue::Bool(true));
        let tokens: [&str; 0] = [];
        let err = compose_parameters_with(&overrides, &tokens).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownOption(ref o) if o == "no_such_thing"));
    }

    #[test]
    fn test_load_overrides() {
        let yaml = r#"
blocks_per_cycle: 16
time-between-blocks: ["5", "5"]
tokens-per-roll: "100"
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let overrides = load_overrides(temp_file.path()).unwrap();
        let tokens: [&str; 0] = [];
        let record = compose_parameters_with(&overrides, &tokens).unwrap();
        assert_eq!(record.get("blocks-per-cycle"), Some(&OptionValue::Int(16)));
        assert_eq!(
            record.get("time-between-blocks"),
            Some(&OptionValue::List(vec!["5".into(), "5".into()]))
        );
        assert_eq!(record.get("tokens-per-roll"), Some(&OptionValue::Str("100".into())));
    }
}
