use std::borrow::Cow;

/// Truncates a string to at most `max_chars` Unicode scalar values.
///
/// Counts `char`s, not bytes or display columns, and never appends an
/// ellipsis. Returns `Cow::Borrowed` when the input already fits.
///
/// # Examples
///
/// ```
/// use wsj_relay::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Markets rally", 7), "Markets");
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("日本株", 2), "日本");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((byte_end, _)) => Cow::Owned(s[..byte_end].to_string()),
        None => Cow::Borrowed(s),
    }
}

/// Trims surrounding whitespace and returns `None` if nothing is left.
pub fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}
