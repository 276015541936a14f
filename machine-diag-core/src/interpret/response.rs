//! Tolerant interpretation of the diagnostic server's reply.
//!
//! `interpret` is total: whatever text arrives, the caller gets a
//! `DiagnosticResult`. An HTML page yields a server-error result, anything
//! undecodable yields a parse-error result.

use serde_json::{Map, Value};

use crate::models::config::ResponseProfile;
use crate::models::diagnostic_result::DiagnosticResult;
use crate::models::error::DiagnosticError;

/// Keys searched for the label, in precedence order.
pub const LABEL_KEYS: [&str; 5] = ["prediction", "label", "class", "result", "status"];

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const SERVER_ERROR_LABEL: &str = "Server Error";
pub const SERVER_ERROR_HINT: &str = "Check URL";
pub const PARSE_ERROR_LABEL: &str = "Parse Error";

/// Interpret a 200 response body under the given server profile.
pub fn interpret(raw: &str, profile: ResponseProfile) -> DiagnosticResult {
    if raw.trim().starts_with('<') {
        log::warn!("Diagnostic server returned an HTML page instead of JSON");
        return DiagnosticResult {
            label: SERVER_ERROR_LABEL.into(),
            confidence_display: SERVER_ERROR_HINT.into(),
            raw: raw.to_string(),
            score: None,
            error: Some(DiagnosticError::ServerError { status: 200 }),
        };
    }

    let parsed = match profile {
        ResponseProfile::Tolerant => interpret_tolerant(raw),
        ResponseProfile::Legacy => interpret_legacy(raw),
    };

    parsed.unwrap_or_else(|reason| {
        log::warn!("Could not interpret diagnostic response: {}", reason);
        DiagnosticResult {
            label: PARSE_ERROR_LABEL.into(),
            confidence_display: String::new(),
            raw: raw.to_string(),
            score: None,
            error: Some(DiagnosticError::ParseError(reason)),
        }
    })
}

fn interpret_tolerant(raw: &str) -> Result<DiagnosticResult, String> {
    let object = parse_object(raw)?;

    let label = LABEL_KEYS
        .iter()
        .find_map(|key| object.get(*key).map(|value| label_text(key, value)))
        .transpose()?
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

    let confidence = match object.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().map(fraction_to_percent).unwrap_or_default(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };

    Ok(DiagnosticResult::diagnosed(capitalize_first(&label), confidence, raw))
}

fn interpret_legacy(raw: &str) -> Result<DiagnosticResult, String> {
    let object = parse_object(raw)?;

    let label = object
        .get("label")
        .and_then(Value::as_str)
        .ok_or("missing string `label`")?;
    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or("missing numeric `confidence`")?;
    let score = object.get("score").and_then(Value::as_f64);

    let mut result = DiagnosticResult::diagnosed(
        capitalize_first(label),
        format!("{}%", confidence.trunc() as i64),
        raw,
    );
    result.score = score;
    Ok(result)
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// Scalars become text; containers and null are not labels.
fn label_text(key: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("`{}` is {}, not a label", key, type_name(other))),
    }
}

/// `0.873` → `"87.3%"`.
fn fraction_to_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Uppercase the first character, leave the rest untouched.
fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tolerant(raw: &str) -> DiagnosticResult {
        interpret(raw, ResponseProfile::Tolerant)
    }

    #[test]
    fn confidence_fraction_renders_one_decimal() {
        assert_eq!(tolerant(r#"{"label":"normal","confidence":0.873}"#).confidence_display, "87.3%");
        assert_eq!(tolerant(r#"{"label":"normal","confidence":1.0}"#).confidence_display, "100.0%");
        assert_eq!(tolerant(r#"{"label":"normal","confidence":1}"#).confidence_display, "100.0%");
        assert_eq!(tolerant(r#"{"label":"normal","confidence":0}"#).confidence_display, "0.0%");
    }

    #[test]
    fn confidence_string_passes_through() {
        assert_eq!(tolerant(r#"{"label":"normal","confidence":"92%"}"#).confidence_display, "92%");
    }

    #[test]
    fn missing_or_odd_confidence_is_empty() {
        assert_eq!(tolerant(r#"{"label":"normal"}"#).confidence_display, "");
        assert_eq!(tolerant(r#"{"label":"normal","confidence":null}"#).confidence_display, "");
        assert_eq!(tolerant(r#"{"label":"normal","confidence":true}"#).confidence_display, "");
    }

    #[test]
    fn label_key_precedence() {
        let r = tolerant(r#"{"class":"fault","label":"normal"}"#);
        assert_eq!(r.label, "Normal");
        assert!(r.is_success());

        let r = tolerant(r#"{"status":"success","message":"Audio received","prediction":"demo_mode"}"#);
        assert_eq!(r.label, "Demo_mode");

        assert_eq!(tolerant(r#"{"result":"bearing wear","status":"ok"}"#).label, "Bearing wear");
    }

    #[test]
    fn no_label_key_is_unknown() {
        let r = tolerant(r#"{"error":"Model not loaded"}"#);
        assert_eq!(r.label, "Unknown");
        assert!(r.is_success());
    }

    #[test]
    fn only_first_character_changes() {
        assert_eq!(tolerant(r#"{"label":"fAULT"}"#).label, "FAULT");
        assert_eq!(tolerant(r#"{"label":"élan"}"#).label, "Élan");
        assert_eq!(tolerant(r#"{"label":""}"#).label, "");
        assert_eq!(tolerant(r#"{"label":"ilk"}"#).label, "Ilk");
    }

    #[test]
    fn html_never_reaches_json_parser() {
        let r = tolerant("  \n<!DOCTYPE html><html>{\"label\":\"normal\"}</html>");
        assert_eq!(r.label, "Server Error");
        assert_eq!(r.confidence_display, "Check URL");
        assert_eq!(r.error, Some(DiagnosticError::ServerError { status: 200 }));

        let r = interpret("<html>", ResponseProfile::Legacy);
        assert_eq!(r.label, "Server Error");
    }

    #[test]
    fn malformed_input_is_parse_error() {
        for raw in ["", "not json", "{\"label\":", "[1,2]", "\"normal\"", r#"{"label":{"a":1}}"#, r#"{"label":null}"#] {
            let r = tolerant(raw);
            assert_eq!(r.label, "Parse Error", "input {:?}", raw);
            assert!(r.confidence_display.is_empty());
            assert_eq!(r.raw, raw);
            assert!(matches!(r.error, Some(DiagnosticError::ParseError(_))));
        }
    }

    #[test]
    fn scalar_labels_are_stringified() {
        assert_eq!(tolerant(r#"{"class":1}"#).label, "1");
        assert_eq!(tolerant(r#"{"result":true}"#).label, "True");
    }

    #[test]
    fn raw_text_is_preserved() {
        let raw = r#"{"label":"normal","confidence":0.5,"extra":[1]}"#;
        assert_eq!(tolerant(raw).raw, raw);
    }

    #[test]
    fn legacy_profile_reads_integer_percentage() {
        let raw = r#"{"label":"FAULT DETECTED","confidence":93.7,"score":0.937,"is_fault":true}"#;
        let r = interpret(raw, ResponseProfile::Legacy);
        assert_eq!(r.label, "FAULT DETECTED");
        assert_eq!(r.confidence_display, "93%");
        assert_eq!(r.score, Some(0.937));
        assert_eq!(r.verdict(), crate::models::diagnostic_result::Verdict::Fault);
    }

    #[test]
    fn legacy_profile_requires_label_and_confidence() {
        let r = interpret(r#"{"prediction":"normal","confidence":0.9}"#, ResponseProfile::Legacy);
        assert_eq!(r.label, "Parse Error");
        let r = interpret(r#"{"label":"NORMAL","confidence":"90%"}"#, ResponseProfile::Legacy);
        assert_eq!(r.label, "Parse Error");
    }
}
