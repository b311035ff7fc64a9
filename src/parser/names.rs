/// Return the identifier without surrounding quotes (`"x"`, `` `x` `` or `[x]`).
pub fn unquote_identifier(ident: &str) -> Option<&str> {
    ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| ident.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .or_else(|| ident.strip_prefix('[').and_then(|s| s.strip_suffix(']')))
}

/// Normalize one identifier part.
///
/// Quoted identifiers keep their exact spelling; unquoted identifiers are
/// case-insensitive in SQL and are lowercased.
pub fn normalize_identifier(ident: &str) -> String {
    let ident = ident.trim();
    match unquote_identifier(ident) {
        Some(quoted) => quoted.to_string(),
        None => ident.to_ascii_lowercase(),
    }
}

/// Split a potentially qualified name on dots that are not inside quotes.
///
/// Handles dots inside quoted identifiers, e.g. `"my.schema"."table.name"`.
pub fn split_qualified_name(name: &str) -> Vec<&str> {
    let mut closing: Option<char> = None;
    let mut start = 0usize;
    let mut parts: Vec<&str> = Vec::new();

    for (idx, ch) in name.char_indices() {
        match (closing, ch) {
            (Some(end), _) if ch == end => closing = None,
            (Some(_), _) => {}
            (None, '"') => closing = Some('"'),
            (None, '`') => closing = Some('`'),
            (None, '[') => closing = Some(']'),
            (None, '.') => {
                parts.push(name[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(name[start..].trim());
    parts
}

/// Normalize every part of a qualified name and join them with `.`.
///
/// Examples:
/// - `"City.CountryCode"` -> `"city.countrycode"`
/// - `"\"Public\".users"` -> `"Public.users"`
pub fn normalize_qualified_name(name: &str) -> String {
    split_qualified_name(name)
        .into_iter()
        .map(normalize_identifier)
        .collect::<Vec<_>>()
        .join(".")
}
