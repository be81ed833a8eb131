/// Parse a newline-delimited account list.
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
/// Order is preserved and duplicates are kept, callers decide what a repeat means.
pub fn parse_account_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}
