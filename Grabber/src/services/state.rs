//! Embedded-state extraction.
//!
//! Server-rendered pages hydrate their client with a JSON blob, either
//! assigned to a global (`window.__INITIAL_STATE__ = {...}`) or placed in a
//! `<script id="...">` element. This module finds that blob and parses it.
//!
//! The blob is cut out with a bracket scanner that understands string
//! literals, then lightly repaired: raw control characters inside strings are
//! escaped and bare `undefined` becomes `null`. Input that is already valid
//! JSON is passed through unchanged.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};

const SNIPPET_CHARS: usize = 200;

/// Where a page keeps its embedded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLocator {
    /// `variable = {...}` inside any script
    Assignment { variable: &'static str },
    /// Text of `<script id="id">`, optionally percent-encoded
    ScriptId { id: &'static str, url_encoded: bool },
}

impl StateLocator {
    fn describe(&self) -> String {
        match self {
            StateLocator::Assignment { variable } => format!("assignment to {variable}"),
            StateLocator::ScriptId { id, .. } => format!("script#{id}"),
        }
    }
}

/// Locate and parse the embedded state described by `locator`.
pub fn extract_state(html: &str, locator: &StateLocator) -> Result<Value> {
    let raw = match locator {
        StateLocator::Assignment { variable } => find_assignment(html, variable)?.to_string(),
        StateLocator::ScriptId { id, url_encoded } => find_script_text(html, id, *url_encoded)?,
    };
    parse_state(&raw, &locator.describe())
}

/// Try several locators in order and return the first state that parses.
pub fn extract_first(html: &str, locators: &[StateLocator]) -> Result<Value> {
    let mut last_error = None;
    for locator in locators {
        match extract_state(html, locator) {
            Ok(value) => {
                log::debug!("Embedded state found via {}", locator.describe());
                return Ok(value);
            }
            Err(e) => {
                log::debug!("No state via {}: {}", locator.describe(), e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| AppError::parse("page", "no state locators given")))
}

/// Parse a raw state substring after repairing JS-isms.
pub fn parse_state(raw: &str, context: &str) -> Result<Value> {
    let repaired = sanitize(raw.trim());
    serde_json::from_str(&repaired).map_err(|e| {
        let snippet: String = raw.chars().take(SNIPPET_CHARS).collect();
        log::warn!("Embedded state from {} is not valid JSON: {} ({}...)", context, e, snippet);
        AppError::parse(context, e)
    })
}

/// Return the JSON object/array assigned to `variable`.
fn find_assignment<'a>(html: &'a str, variable: &str) -> Result<&'a str> {
    for (start, _) in html.match_indices(variable) {
        let Some(rest) = html[start + variable.len()..]
            .trim_start()
            .strip_prefix('=')
            .filter(|rest| !rest.starts_with('='))
        else {
            continue;
        };
        let rest = rest.trim_start();
        if !rest.starts_with(['{', '[']) {
            continue;
        }
        return match value_end(rest) {
            Some(end) => Ok(&rest[..end]),
            None => Err(AppError::parse(
                variable,
                "embedded state is truncated or unbalanced",
            )),
        };
    }

    Err(AppError::parse(
        variable,
        "no JSON assignment found in page",
    ))
}

/// Return the text of the `<script>` element with the given id.
fn find_script_text(html: &str, id: &str, url_encoded: bool) -> Result<String> {
    let selector = Selector::parse(&format!(r#"script[id="{id}"]"#))
        .map_err(|e| AppError::parse(id, format!("{e:?}")))?;
    let document = Html::parse_document(html);

    let text: String = document
        .select(&selector)
        .next()
        .ok_or_else(|| AppError::parse(id, "script element not found"))?
        .text()
        .collect();

    if text.trim().is_empty() {
        return Err(AppError::parse(id, "script element is empty"));
    }

    if url_encoded {
        urlencoding::decode(text.trim())
            .map(|decoded| decoded.into_owned())
            .map_err(|e| AppError::parse(id, e))
    } else {
        Ok(text)
    }
}

/// Byte length of the JSON value at the start of `s`, or `None` when the
/// brackets never balance.
fn value_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Repair a JS object literal that is almost JSON.
fn sanitize(raw: &str) -> String {
    const UNDEFINED: &str = "undefined";

    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        let width = c.len_utf8();

        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else if c == '\\' {
                escaped = true;
                out.push(c);
            } else if c == '"' {
                in_string = false;
                out.push(c);
            } else if (c as u32) < 0x20 {
                push_escaped(&mut out, c);
            } else {
                out.push(c);
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if rest.starts_with(UNDEFINED)
            && !out.ends_with(is_ident)
            && !rest[UNDEFINED.len()..].starts_with(is_ident)
        {
            out.push_str("null");
            rest = &rest[UNDEFINED.len()..];
            continue;
        } else if (c as u32) < 0x20 && !matches!(c, '\n' | '\r' | '\t') {
            // stray control character between tokens
        } else {
            out.push(c);
        }

        rest = &rest[width..];
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        other => out.push_str(&format!("\\u{:04x}", other as u32)),
    }
}
