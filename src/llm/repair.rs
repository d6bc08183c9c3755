//! Best-effort repair of almost-JSON model replies.
//!
//! Models occasionally emit bare values such as `"founded": 9th century`.
//! Strict parsing is tried first; only on failure are bare values containing
//! letters quoted, and finally the reply is stripped of code fences and read
//! as JSON5 (unquoted keys, single quotes, comments, trailing commas).

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, Result};

// Bare value terminated by `,`, `}` or `]` on the same line.
static BARE_BEFORE_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#":\s*([^,}\]"\[\{\s][^,}\]"\n]*)([,}\]])"#).expect("valid bare value regex")
});

// Bare value ending a line, followed by a closing bracket on the next one.
static BARE_AT_LINE_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#":\s*([^,}\]"\[\{\s][^,}\]"\n]*?)[ \t\r]*\n(\s*[}\]])"#)
        .expect("valid line-end value regex")
});

/// Parses a model reply, repairing common defects when strict parsing fails.
pub fn parse_json_response(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    let fixed = quote_bare_values(text);
    match serde_json::from_str(&fixed) {
        Ok(value) => {
            debug!("model reply needed bare-value repair");
            Ok(value)
        }
        // JSON5 reads the untouched reply first: quoting can mangle single-quoted strings.
        Err(_) => parse_lenient(text)
            .or_else(|_| parse_lenient(&fixed))
            .map_err(|err| AppError::ParseError(format!("model returned malformed JSON: {}", err))),
    }
}

fn parse_lenient(text: &str) -> std::result::Result<Value, json5::Error> {
    let value = json5::from_str(strip_wrapping(text))?;
    debug!("model reply needed lenient parsing");
    Ok(value)
}

/// Wraps unquoted values that contain at least one ASCII letter in quotes.
pub fn quote_bare_values(text: &str) -> String {
    let pass_one = BARE_BEFORE_DELIMITER.replace_all(text, |caps: &Captures| {
        let value = &caps[1];
        if has_letter(value) {
            format!(": \"{}\"{}", value.trim_end(), &caps[2])
        } else {
            caps[0].to_string()
        }
    });
    let pass_two = BARE_AT_LINE_END.replace_all(&pass_one, |caps: &Captures| {
        let value = &caps[1];
        if has_letter(value) {
            format!(": \"{}\"\n{}", value, &caps[2])
        } else {
            caps[0].to_string()
        }
    });
    pass_two.into_owned()
}

fn has_letter(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_alphabetic())
}

/// Strips Markdown code fences and any prose around the outermost brackets.
fn strip_wrapping(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.split_once('\n').map(|(_, after)| after).unwrap_or("");
        body = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }

    let start = body.find(['{', '[']);
    let end = body.rfind(['}', ']']);
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            body = &body[start..=end];
        }
    }
    body
}
