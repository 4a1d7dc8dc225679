//! Option tables and the flat-token helpers both composers share.

use super::value::{OptionValue, OverrideValue};
use super::ComposeError;

/// How occurrences of an option combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Single string, last occurrence wins
    Str,
    /// Single integer, last occurrence wins
    Int,
    /// List set whole by each occurrence, last one wins
    List,
    /// Every occurrence appends after the default list
    Repeated,
    /// Every occurrence supplies one multi-field row
    Table,
}

/// Default value of a declared option.
#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    None,
    Str(&'static str),
    Int(i64),
    List(&'static [&'static str]),
}

impl DefaultValue {
    pub fn to_value(self) -> OptionValue {
        match self {
            DefaultValue::None => OptionValue::Null,
            DefaultValue::Str(s) => OptionValue::Str(s.to_string()),
            DefaultValue::Int(n) => OptionValue::Int(n),
            DefaultValue::List(items) => {
                OptionValue::List(items.iter().map(|s| s.to_string()).collect())
            }
        }
    }
}

/// One declared option: its flag, destination name, kind and default.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub flag: &'static str,
    pub kind: OptionKind,
    pub default: DefaultValue,
}

impl OptionSpec {
    pub const fn new(flag: &'static str, kind: OptionKind, default: DefaultValue) -> Self {
        Self { flag, kind, default }
    }

    /// Destination name, the flag with hyphens turned into underscores.
    pub fn dest(&self) -> String {
        self.flag.replace('-', "_")
    }
}

/// Split `--name` or `--name=value` into its name and inline value.
/// Returns `None` for tokens that are not options.
pub fn split_flag(token: &str) -> Option<(&str, Option<&str>)> {
    let body = token.strip_prefix("--")?;
    if body.is_empty() {
        return None;
    }
    match body.split_once('=') {
        Some((name, value)) => Some((name, Some(value))),
        None => Some((body, None)),
    }
}

/// Take the single value of an option, either inline or from the next token.
pub fn take_value<S: AsRef<str>>(
    flag: &str,
    inline: Option<&str>,
    tokens: &[S],
    cursor: &mut usize,
) -> Result<String, ComposeError> {
    if let Some(value) = inline {
        return Ok(value.to_string());
    }
    match tokens.get(*cursor).map(AsRef::as_ref) {
        Some(value) if !value.starts_with("--") => {
            *cursor += 1;
            Ok(value.to_string())
        }
        _ => Err(ComposeError::MissingValue { option: flag.to_string() }),
    }
}

/// Take every field of a multi-field option up to the next `--option`.
pub fn take_fields<S: AsRef<str>>(
    flag: &str,
    inline: Option<&str>,
    tokens: &[S],
    cursor: &mut usize,
) -> Result<Vec<String>, ComposeError> {
    let mut fields: Vec<String> = inline.map(str::to_string).into_iter().collect();
    while let Some(value) = tokens.get(*cursor).map(AsRef::as_ref) {
        if value.starts_with("--") {
            break;
        }
        fields.push(value.to_string());
        *cursor += 1;
    }
    if fields.is_empty() {
        return Err(ComposeError::MissingValue { option: flag.to_string() });
    }
    Ok(fields)
}

/// Fold one raw occurrence into the slot holding the option's current value.
pub fn apply_value(spec: &OptionSpec, raw: String, slot: &mut OptionValue) -> Result<(), ComposeError> {
    match spec.kind {
        OptionKind::Str => *slot = OptionValue::Str(raw),
        OptionKind::Int => *slot = OptionValue::Int(parse_int(spec, &raw)?),
        OptionKind::List => *slot = OptionValue::List(vec![raw]),
        OptionKind::Repeated => match slot {
            OptionValue::List(items) => items.push(raw),
            _ => *slot = OptionValue::List(vec![raw]),
        },
        OptionKind::Table => {
            return Err(ComposeError::InvalidValue {
                option: spec.flag.to_string(),
                value: raw,
                reason: "expects a list of fields".to_string(),
            })
        }
    }
    Ok(())
}

/// Append one row to a multi-field option.
pub fn push_row(slot: &mut OptionValue, row: Vec<String>) {
    match slot {
        OptionValue::Table(rows) => rows.push(row),
        _ => *slot = OptionValue::Table(vec![row]),
    }
}

/// Store a value read from an overrides file.
///
/// Scalars go through [`apply_value`]. A list replaces a list option whole,
/// and becomes one row of a multi-field option.
pub fn apply_override(spec: &OptionSpec, value: &OverrideValue, slot: &mut OptionValue) -> Result<(), ComposeError> {
    match value {
        OverrideValue::Bool(b) => apply_value(spec, b.to_string(), slot),
        OverrideValue::Number(n) => apply_value(spec, n.to_string(), slot),
        OverrideValue::String(s) => apply_value(spec, s.clone(), slot),
        OverrideValue::List(items) => match spec.kind {
            OptionKind::List | OptionKind::Repeated => {
                *slot = OptionValue::List(items.clone());
                Ok(())
            }
            OptionKind::Table if !items.is_empty() => {
                push_row(slot, items.clone());
                Ok(())
            }
            _ => Err(ComposeError::InvalidValue {
                option: spec.flag.to_string(),
                value: format!("{:?}", items),
                reason: "expects a single value".to_string(),
            }),
        },
    }
}

fn parse_int(spec: &OptionSpec, raw: &str) -> Result<i64, ComposeError> {
    raw.parse::<i64>().map_err(|e| ComposeError::InvalidValue {
        option: spec.flag.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
