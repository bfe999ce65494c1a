use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?\s*|\s*```$").expect("valid code fence regex"));

/// A guideline breach reported by the model, tied to a file and line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub file: String,
    #[serde(deserialize_with = "line_number")]
    pub line: u64,
    #[serde(default, deserialize_with = "optional_line_number")]
    pub start_line: Option<u64>,
    #[serde(default, deserialize_with = "optional_line_number")]
    pub end_line: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub guideline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(default)]
    pub suggestion_code: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub side: DiffSide,
}

/// Which version of the diff a comment anchor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffSide {
    #[serde(alias = "left", alias = "Left")]
    Left,
    #[default]
    #[serde(alias = "right", alias = "Right")]
    Right,
}

impl DiffSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffSide::Left => "LEFT",
            DiffSide::Right => "RIGHT",
        }
    }
}

impl ViolationRecord {
    /// Last line of the commented range.
    pub fn anchor_line(&self) -> u64 {
        self.end_line.unwrap_or(self.line)
    }

    /// First line of a multi-line range, if the record describes one.
    pub fn range_start(&self) -> Option<u64> {
        self.start_line.filter(|start| *start < self.anchor_line())
    }

    /// Comment body: guideline, explanation, then the suggested code.
    pub fn comment_body(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.guideline,
            self.explanation,
            wrap_suggestion_code(self.suggestion_code.as_deref())
        )
    }
}

/// Fence code as a GitHub suggestion block; empty input gives an empty string.
pub fn wrap_suggestion_code(code: Option<&str>) -> String {
    match code {
        Some(code) if !code.is_empty() => format!("```suggestion\n{}\n```", code),
        _ => String::new(),
    }
}

/// Parse the model's answer into violation records.
///
/// Never fails: an answer that is not the expected JSON yields no records,
/// and individual entries that don't fit the record shape are skipped.
pub fn extract_violations(review: &str) -> Vec<ViolationRecord> {
    let cleaned = CODE_FENCE.replace_all(review.trim(), "");

    let payload: serde_json::Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            warn!("Error parsing review JSON: {}", e);
            return Vec::new();
        }
    };

    let Some(object) = payload.as_object() else {
        warn!("Review JSON is not an object; ignoring it");
        return Vec::new();
    };

    let entries = match object.get("violations") {
        None | Some(serde_json::Value::Null) => return Vec::new(),
        Some(serde_json::Value::Array(entries)) => entries,
        Some(other) => {
            warn!("Expected `violations` to be an array, got: {}", other);
            return Vec::new();
        }
    };

    let mut violations = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match ViolationRecord::deserialize(entry) {
            Ok(record) => violations.push(record),
            Err(e) => warn!("Skipping violation #{}: {} ({})", index, e, entry),
        }
    }
    debug!("Extracted {} violations", violations.len());
    violations
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Float(f64),
    Text(String),
}

impl NumberOrText {
    fn into_line<E: serde::de::Error>(self) -> Result<Option<u64>, E> {
        match self {
            NumberOrText::Number(0) => Ok(None),
            NumberOrText::Number(n) => Ok(Some(n)),
            NumberOrText::Float(f) if f == 0.0 => Ok(None),
            NumberOrText::Float(f) if f > 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                Ok(Some(f as u64))
            }
            NumberOrText::Float(f) => Err(E::custom(format!("invalid line number: {}", f))),
            NumberOrText::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                match text.parse::<u64>() {
                    Ok(0) => Ok(None),
                    Ok(n) => Ok(Some(n)),
                    Err(_) => Err(E::custom(format!("invalid line number: {:?}", text))),
                }
            }
        }
    }
}

fn line_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrText::deserialize(deserializer)?
        .into_line::<D::Error>()?
        .ok_or_else(|| serde::de::Error::custom("line number must be positive"))
}

fn optional_line_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.into_line(),
        None => Ok(None),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
