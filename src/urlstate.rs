//! Pure helpers for reading and rewriting the page's URL state.
//!
//! Everything here works on plain strings (`location.search`,
//! `location.pathname`, `<base href>`) so the logic stays testable off
//! the browser. The binary owns the actual `Location`/`History` calls.

/// Decode a percent-encoded query component; `+` counts as a space.
///
/// Malformed escapes are passed through untouched rather than rejected —
/// a garbled category name should fail to resolve, not break the page.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match (
                hex_val(bytes.get(i + 1).copied()),
                hex_val(bytes.get(i + 2).copied()),
            ) {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(byte: Option<u8>) -> Option<u8> {
    match byte {
        Some(b @ b'0'..=b'9') => Some(b - b'0'),
        Some(b @ b'a'..=b'f') => Some(b - b'a' + 10),
        Some(b @ b'A'..=b'F') => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Extract and decode one query parameter from a `location.search`
/// string (with or without the leading `?`).
///
/// A valueless flag like `?refresh` yields `Some("")`.
pub fn query_param(search: &str, name: &str) -> Option<String> {
    let search = search.strip_prefix('?').unwrap_or(search);
    for pair in search.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (key, value),
            None => (pair, ""),
        };
        if percent_decode(key) == name {
            return Some(percent_decode(value));
        }
    }
    None
}

/// Whether the named parameter is present at all, with or without a value.
pub fn has_param(search: &str, name: &str) -> bool {
    query_param(search, name).is_some()
}

/// Rebuild the query string without the named parameter. The surviving
/// pairs keep their original encoding byte for byte.
pub fn strip_param(search: &str, name: &str) -> String {
    let trimmed = search.strip_prefix('?').unwrap_or(search);
    let kept: Vec<&str> = trimmed
        .split('&')
        .filter(|pair| {
            if pair.is_empty() {
                return false;
            }
            let key = pair.split_once('=').map(|(key, _)| key).unwrap_or(pair);
            percent_decode(key) != name
        })
        .collect();
    if kept.is_empty() {
        String::new()
    } else {
        format!("?{}", kept.join("&"))
    }
}

/// The path component of an absolute or relative URL string.
pub fn url_pathname(url: &str) -> &str {
    let after_scheme = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => return url.split(['?', '#']).next().unwrap_or(url),
    };
    match after_scheme.find('/') {
        Some(idx) => {
            let path = &after_scheme[idx..];
            path.split(['?', '#']).next().unwrap_or(path)
        }
        None => "/",
    }
}

/// Work out the site base path the data directory hangs off of.
///
/// A `<base>` tag is authoritative when present; otherwise the current
/// pathname is checked for a `/{site_root}/` prefix (the site is served
/// under that prefix on the hosted docs, and at `/` in local previews).
pub fn detect_base_path(base_href: Option<&str>, pathname: &str, site_root: &str) -> String {
    if let Some(href) = base_href {
        return url_pathname(href).to_string();
    }
    let mut parts = pathname.split('/');
    let first = parts.nth(1).unwrap_or("");
    if first == site_root && parts.next().is_some() {
        return format!("/{}/", site_root);
    }
    String::new()
}
