// SPDX-License-Identifier: MIT

//! Structured model replies
//!
//! Generation roles that return more than free text answer with a JSON
//! object whose fields carry markdown. The helpers here build the format
//! instructions from a schema and read the reply back.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adk::error::ProcureError;

/// A markdown field a model may answer either as one string or as a list
/// of lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TextBlock {
    Text(String),
    Lines(Vec<String>),
}

impl TextBlock {
    pub fn to_text(&self) -> String {
        match self {
            TextBlock::Text(s) => s.clone(),
            TextBlock::Lines(lines) => lines.join("\n"),
        }
    }
}

/// Instructions asking for a single JSON object shaped like `T`
pub fn format_instructions<T: JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Respond with a single JSON object that conforms to the JSON schema below. \
         Do not add any text before or after the object.\n\n```json\n{}\n```",
        schema
    )
}

/// Remove a surrounding markdown code fence, if any
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a reply as JSON
pub fn parse_json(reply: &str) -> Result<Value, ProcureError> {
    serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| ProcureError::data_format(format!("reply is not valid JSON: {}", e)))
}

/// Parse a reply into `T`
pub fn parse_as<T: DeserializeOwned>(reply: &str) -> Result<T, ProcureError> {
    serde_json::from_str(strip_code_fence(reply)).map_err(|e| {
        ProcureError::data_format(format!(
            "reply does not match the expected structure: {}",
            e
        ))
    })
}

/// Read a markdown field from a JSON reply.
///
/// `path` uses dot notation. Non-string values are rendered as text.
pub fn markdown_field(reply: &str, path: &str) -> Result<String, ProcureError> {
    let json = parse_json(reply)?;
    let value = extract_json_path(&json, path)
        .ok_or_else(|| ProcureError::data_format(format!("reply has no '{}' field", path)))?;
    Ok(value_to_text(&value))
}

/// Like `markdown_field`, but falls back to the raw reply when it is not
/// the expected JSON
pub fn markdown_field_or_raw(reply: &str, path: &str) -> String {
    match markdown_field(reply, path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Using raw reply for '{}': {}", path, e);
            reply.trim().to_string()
        }
    }
}

/// Convert a JSON value to readable text
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            // A lone wrapper key carries the text itself
            if obj.len() == 1 {
                if let Some(v) = obj
                    .get("result")
                    .or(obj.get("answer"))
                    .or(obj.get("response"))
                {
                    return value_to_text(v);
                }
            }
            obj.iter()
                .map(|(k, v)| format!("**{}**: {}", k, value_to_text(v)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Value::Array(arr) => arr
            .iter()
            .map(|v| format!("- {}", value_to_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
    }
}

/// Extract a value from JSON using a simple dot-notation path
pub fn extract_json_path(json: &Value, path: &str) -> Option<Value> {
    let mut current = json;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current.clone())
}

/// Normalise generated text into a markdown bullet list.
///
/// Blank lines are dropped and lines that are not already bullets get a
/// `- ` prefix.
pub fn format_as_list(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.starts_with(['*', '-', '•']) {
                line.to_string()
            } else {
                format!("- {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Draft {
        /// The contract in markdown
        contract: String,
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn test_parse_as_typed_reply() {
        let draft: Draft = parse_as("```json\n{\"contract\": \"# MSA\"}\n```").unwrap();
        assert_eq!(draft.contract, "# MSA");
    }

    #[test]
    fn test_non_json_is_data_format_error() {
        let err = parse_as::<Draft>("Here is your contract!").unwrap_err();
        assert!(matches!(err, ProcureError::DataFormat(_)));
    }

    #[test]
    fn test_markdown_field() {
        let reply = r###"{"pricing_risk_report": "## Risks", "extra": 1}"###;
        assert_eq!(markdown_field(reply, "pricing_risk_report").unwrap(), "## Risks");
        assert!(markdown_field(reply, "missing").is_err());
    }

    #[test]
    fn test_markdown_field_or_raw_falls_back() {
        assert_eq!(
            markdown_field_or_raw("  ## Plain markdown\n", "pricing_risk_report"),
            "## Plain markdown"
        );
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!({"result": "done"})), "done");
        assert_eq!(value_to_text(&json!(["a", "b"])), "- a\n- b");
        assert_eq!(value_to_text(&json!({"x": 1})), "**x**: 1");
        assert_eq!(value_to_text(&Value::Null), "");
    }

    #[test]
    fn test_extract_json_path() {
        let value = json!({"forecast": {"Compute": {"Q1": "+3%"}}});
        assert_eq!(
            extract_json_path(&value, "forecast.Compute.Q1"),
            Some(json!("+3%"))
        );
        assert_eq!(extract_json_path(&value, "forecast.Storage"), None);
    }

    #[test]
    fn test_format_as_list() {
        let text = "Missing SLA penalties\n\n  - Already a bullet\n* Star bullet\n• Dot bullet\n";
        assert_eq!(
            format_as_list(text),
            "- Missing SLA penalties\n- Already a bullet\n* Star bullet\n• Dot bullet"
        );
    }

    #[test]
    fn test_text_block_accepts_string_or_list() {
        let single: TextBlock = serde_json::from_value(json!("one")).unwrap();
        let many: TextBlock = serde_json::from_value(json!(["one", "two"])).unwrap();
        assert_eq!(single.to_text(), "one");
        assert_eq!(many.to_text(), "one\ntwo");
    }

    #[test]
    fn test_format_instructions_embed_schema() {
        let text = format_instructions::<Draft>();
        assert!(text.contains("\"contract\""));
        assert!(text.contains("```json"));
    }
}
