use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Upper bound on the slug part of a filename, in bytes.
pub const MAX_SLUG_BYTES: usize = 100;

/// Deterministic `{date}-{slug}.md` for a page.
///
/// The slug comes from the title. Without a usable title it comes from the URL
/// and carries a short hash of the full URL, so distinct pages never collide.
pub fn markdown_filename(title: Option<&str>, url: &str, date: NaiveDate) -> String {
    let slug = title
        .map(slugify)
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| url_slug(url));
    format!("{}-{slug}.md", date.format("%Y-%m-%d"))
}

/// Lowercase alphanumeric runs joined by `-`, bounded to [`MAX_SLUG_BYTES`].
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    truncate_on_char_boundary(&mut slug, MAX_SLUG_BYTES);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn url_slug(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let hash = short_hash(url);
    let mut slug = slugify(without_scheme);
    truncate_on_char_boundary(&mut slug, MAX_SLUG_BYTES - hash.len() - 1);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        return hash;
    }
    format!("{slug}-{hash}")
}

fn truncate_on_char_boundary(value: &mut String, max_bytes: usize) {
    if value.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}

/// First eight hex digits of the SHA-256 of `input`.
pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
