//! Language prompt helpers and Markdown rendering into a restricted HTML subset.

use markdown::{to_html_with_options, Options as MarkdownOptions};
use scraper::{ElementRef, Html};
use serde_json::Value;

/// Tags that survive sanitization. Attributes are never kept.
pub const ALLOWED_TAGS: &[&str] = &["p", "strong", "em", "b", "i", "ul", "ol", "li", "br"];

/// Elements whose text content is dropped together with the tag.
const DROPPED_CONTENT_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// Languages the AI can be asked to answer in, as `(code, display name)`.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh", "Chinese (Simplified)"),
    ("hi", "Hindi"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("ar", "Arabic"),
    ("bn", "Bengali"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("de", "German"),
    ("ko", "Korean"),
    ("vi", "Vietnamese"),
    ("it", "Italian"),
    ("tr", "Turkish"),
    ("pl", "Polish"),
    ("nl", "Dutch"),
    ("th", "Thai"),
    ("id", "Indonesian"),
    ("sv", "Swedish"),
];

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, name)| *name)
}

/// Prompt suffix asking the model to answer in the user's language.
///
/// English and unknown codes need no instruction and yield an empty string.
pub fn get_language_instruction(language_code: &str) -> String {
    if language_code == "en" {
        return String::new();
    }
    match language_name(language_code) {
        Some(name) => format!(
            "\n\nIMPORTANT: The user input may be in {name}. Interpret it in that language and respond with all text content (items, descriptions, property values) in {name}. Property keys should remain in English snake_case."
        ),
        None => String::new(),
    }
}

fn markdown_options() -> MarkdownOptions {
    let mut options = MarkdownOptions::default();
    // Raw HTML is passed through so the sanitizer can strip it tag by tag.
    options.compile.allow_dangerous_html = true;
    options
}

/// Converts Markdown to sanitized HTML.
///
/// With `inline` set, one wrapping `<p>` element is removed so the result can
/// sit inside a list item or table cell.
pub fn render_markdown(text: Option<&str>, inline: bool) -> String {
    let Some(text) = text else {
        return String::new();
    };
    if text.is_empty() {
        return String::new();
    }
    let options = markdown_options();
    let html = to_html_with_options(text, &options).unwrap_or_else(|_| text.to_string());
    let clean = sanitize_html(&html);
    let clean = clean.trim();
    if inline {
        if let Some(inner) = clean
            .strip_prefix("<p>")
            .and_then(|rest| rest.strip_suffix("</p>"))
        {
            return inner.to_string();
        }
    }
    clean.to_string()
}

/// Re-emits `html` keeping only [`ALLOWED_TAGS`], without attributes.
/// Text content of stripped tags is kept and escaped.
pub fn sanitize_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(fragment.root_element(), &mut out);
    out
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            write_element(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            escape_text(text, out);
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if DROPPED_CONTENT_TAGS.contains(&name) {
        return;
    }
    if !ALLOWED_TAGS.contains(&name) {
        write_children(element, out);
        return;
    }
    out.push('<');
    out.push_str(name);
    out.push('>');
    if name == "br" {
        return;
    }
    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Renders a JSON scalar the way it would be shown to a user: strings as-is,
/// null as empty, anything else through its JSON text.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Renders one property value, keeping its shape: strings stay strings, lists
/// stay lists, other JSON values are returned untouched.
pub fn render_property_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(render_markdown(Some(&text), true)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| Value::String(render_markdown(value_text(item).as_deref(), true)))
                .collect(),
        ),
        other => other,
    }
}

/// Applies Markdown rendering to `description` and every entry of
/// `properties` in a model detail result, in place.
pub fn render_markdown_in_result(result: &mut Value) {
    let Some(object) = result.as_object_mut() else {
        return;
    };
    if let Some(description) = object.get_mut("description") {
        let rendered = render_markdown(value_text(description).as_deref(), false);
        *description = Value::String(rendered);
    }
    if let Some(Value::Object(properties)) = object.get_mut("properties") {
        for value in properties.values_mut() {
            *value = render_property_value(value.take());
        }
    }
}
