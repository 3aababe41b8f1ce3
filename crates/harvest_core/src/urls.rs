/// Split a line-oriented URL file into entries.
///
/// Surrounding whitespace is trimmed and blank lines are dropped. Order and
/// duplicates are preserved; deduplication is the ledger's job.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
