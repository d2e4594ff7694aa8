use std::borrow::Cow;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Convert DOS line endings to Unix ones and drop a leading byte-order mark.
///
/// Only `\r\n` pairs are rewritten; a lone `\r` is kept as-is.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    let body = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);

    if body.contains("\r\n") {
        Cow::Owned(body.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(body)
    }
}

pub fn has_dos_line_endings(text: &str) -> bool {
    text.contains("\r\n")
}
