use sha2::{Digest, Sha256};
use url::Url;

const MAX_COMPONENT_LEN: usize = 120;

/// Windows-safe single path component. Returns `None` when nothing usable
/// remains after cleaning, e.g. for `..` or an all-punctuation name.
pub fn safe_component(input: &str) -> Option<String> {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if trimmed.is_empty() {
        return None;
    }

    let mut name = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if name.len() + c.len_utf8() > MAX_COMPONENT_LEN {
            break;
        }
        name.push(c);
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    Some(name)
}

/// Local filename for an image URL: the last path segment without query
/// string, or `image-<hash>` when the URL path ends in a slash.
pub fn image_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(safe_component)
        .unwrap_or_else(|| format!("image-{}", short_hash(url.as_str())))
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
