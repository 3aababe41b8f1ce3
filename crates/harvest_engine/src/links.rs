use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;
use url::Url;

/// Absolute form of `reference` against `base`.
///
/// Fragment-only, query-only and `javascript:` references do not point at a
/// separate resource and resolve to `None`.
pub fn resolve_url(reference: &str, base: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with('?') || lower.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.join(trimmed).ok()
}

/// Raw `src` values of every `<img>` in an HTML fragment, in document order
/// and without repeats.
pub fn image_sources(fragment: &str) -> Vec<String> {
    let document = Html::parse_fragment(fragment);
    let mut sources = Vec::new();
    visit(document.tree.root(), &mut sources);
    sources
}

fn visit(node: NodeRef<'_, Node>, sources: &mut Vec<String>) {
    for child in node.children() {
        if let Node::Element(element) = child.value() {
            if element.name().eq_ignore_ascii_case("img") {
                if let Some(src) = element.attr("src").map(str::trim) {
                    if !src.is_empty() && !sources.iter().any(|s| s == src) {
                        sources.push(src.to_string());
                    }
                }
            }
            visit(child, sources);
        }
    }
}
