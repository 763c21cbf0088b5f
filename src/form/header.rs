//! Part header rendering.

use anyhow::{Context, Result, bail};
use reqwest::header::{HeaderName, HeaderValue};
use std::fmt::Write;

const SUPERSEDED: [&str; 3] = ["content-disposition", "content-type", "content-location"];

/// Renders `name="value"` with HTML5 form escaping. Non-ASCII is left as UTF-8.
pub(crate) fn format_param(name: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => escaped.push_str("%22"),
            '\\' => escaped.push_str("\\\\"),
            '\u{1b}' => escaped.push(ch),
            c if (c as u32) < 0x20 => {
                let _ = write!(escaped, "%{:02X}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    format!("{}=\"{}\"", name, escaped)
}

/// Writes the header block of one part, including the blank line ending it.
///
/// Caller-supplied header names and values must be valid HTTP header text;
/// anything that could break the part framing (CR, LF and other controls)
/// is rejected before a byte is written.
pub(crate) fn render_part_headers(
    out: &mut Vec<u8>,
    name: &str,
    filename: Option<&str>,
    content_type: Option<&str>,
    extra: &[(String, String)],
) -> Result<()> {
    let content_type = content_type.filter(|ct| !ct.is_empty());
    if let Some(content_type) = content_type {
        check_value("Content-Type", content_type)?;
    }
    let extra: Vec<&(String, String)> = extra
        .iter()
        .filter(|(key, value)| {
            !value.is_empty() && !SUPERSEDED.contains(&key.to_ascii_lowercase().as_str())
        })
        .collect();
    for (key, value) in &extra {
        HeaderName::from_bytes(key.as_bytes())
            .with_context(|| format!("Invalid part header name {:?}", key))?;
        check_value(key, value)?;
    }

    let mut disposition = format!("form-data; {}", format_param("name", name));
    if let Some(filename) = filename {
        disposition.push_str("; ");
        disposition.push_str(&format_param("filename", filename));
    }
    push_header(out, "Content-Disposition", &disposition);

    if let Some(content_type) = content_type {
        push_header(out, "Content-Type", content_type);
    }
    for (key, value) in extra {
        push_header(out, key, value);
    }

    out.extend_from_slice(b"\r\n");
    Ok(())
}

fn check_value(key: &str, value: &str) -> Result<()> {
    if HeaderValue::from_bytes(value.as_bytes()).is_err() {
        bail!("Invalid value for part header {}: {:?}", key, value);
    }
    Ok(())
}

fn push_header(out: &mut Vec<u8>, key: &str, value: &str) {
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}
