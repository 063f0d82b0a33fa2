use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(.+)$").expect("extension regex"));

/// Removes anything that looks like a tag (`<a href="..">text</a>` -> `text`).
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Everything after the first dot of an image name (`media/image2.jpg` -> `jpg`).
pub fn image_extension(image_name: &str) -> Option<&str> {
    EXTENSION_RE
        .captures(image_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|ext| !ext.is_empty())
}

pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
            c if c.is_control() => out.push('_'),
            _ => out.push(ch),
        }
    }
    out
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
