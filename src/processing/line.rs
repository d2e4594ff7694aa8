use crate::models::line_segment::LineSegment;
use once_cell::sync::Lazy;
use regex::Regex;

/// `/**` not immediately closed (`/**/` is left alone)
static DOUBLED_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*\*([^/]|$)").expect("doubled opener regex"));

static PADDED_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\* {2,}").expect("padded opener regex"));

static PADDED_CLOSER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" {2,}\*/").expect("padded closer regex"));

/// Split a line on `"` into alternating unquoted and quoted segments.
///
/// A line with N quote characters yields N + 1 segments. Quote parity is
/// line-local: an odd count leaves the tail of the line in the quoted state.
pub fn split_segments(line: &str) -> impl Iterator<Item = LineSegment<'_>> {
    line.split('"').enumerate().map(|(index, text)| {
        if index % 2 == 0 {
            LineSegment::Unquoted(text)
        } else {
            LineSegment::Quoted(text)
        }
    })
}

/// Rewrite a trailing `//` comment as `/* ... */` and tidy block-comment
/// delimiters, leaving string literal contents untouched.
///
/// The transformation is total and idempotent. An empty `/**/` is kept as is
/// rather than collapsed to `/* /`.
pub fn normalize_line(line: &str) -> String {
    if !line.contains('/') {
        return line.to_string();
    }

    let mut output = String::with_capacity(line.len() + 3);
    for (index, segment) in split_segments(line).enumerate() {
        if index > 0 {
            output.push('"');
        }
        match segment {
            LineSegment::Quoted(text) => output.push_str(text),
            LineSegment::Unquoted(text) => output.push_str(&normalize_unquoted(text)),
        }
    }
    output
}

fn normalize_unquoted(text: &str) -> String {
    let wrapped = wrap_line_comment(text);
    let text = wrapped.as_deref().unwrap_or(text);

    if !text.contains('*') {
        return text.to_string();
    }

    let text = DOUBLED_OPENER.replace_all(text, "/* $1");
    let text = PADDED_OPENER.replace_all(&text, "/* ");
    PADDED_CLOSER.replace_all(&text, " */").into_owned()
}

/// Everything from the first `//` to the end of the segment becomes the body
/// of a block comment. Segments that already open a block comment are skipped.
fn wrap_line_comment(text: &str) -> Option<String> {
    if text.contains("/*") {
        return None;
    }
    let marker = text.find("//")?;

    let body = text[marker + 2..].trim_end();
    let mut wrapped = String::with_capacity(text.len() + 3);
    wrapped.push_str(&text[..marker]);
    wrapped.push_str("/*");
    wrapped.push_str(body);
    wrapped.push_str(" */");
    Some(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TRICKY_LINES: &[&str] = &[
        "",
        "int x = 1; // set x",
        "int x = 1; //set x   ",
        "//",
        "//   ",
        "/// doc comment",
        "a // b // c",
        "a // b */ c",
        "// /** nested opener",
        "/* already block */",
        "/*   comment   */",
        "/**bad spacing**/",
        "/**/",
        "/***/",
        "/****  x  ****/",
        "/**/**x",
        "x = 1; /*  trailing",
        "   */",
        "foo(); // say \"hi\"",
        "printf(\"// not a comment\"); // real one",
        "const char* s = \"http://example.com\";",
        "s = \"unterminated // stays",
        "\"\" // after empty literal",
        "a *//b",
        "a /* b */ // c",
    ];

    #[test]
    fn test_line_comment_is_wrapped() {
        assert_eq!(normalize_line("int x = 1; // set x"), "int x = 1; /* set x */");
    }

    #[test]
    fn test_trailing_whitespace_is_trimmed_before_closing() {
        assert_eq!(normalize_line("y++;   //bump   "), "y++;   /*bump */");
        assert_eq!(normalize_line("//"), "/* */");
        assert_eq!(normalize_line("//   "), "/* */");
    }

    #[test]
    fn test_only_first_marker_is_rewritten() {
        assert_eq!(normalize_line("a // b // c"), "a /* b // c */");
    }

    #[test]
    fn test_quoted_comment_markers_are_preserved() {
        let line = "const char* s = \"http://example.com\";";
        assert_eq!(normalize_line(line), line);

        assert_eq!(
            normalize_line("printf(\"// not a comment\"); // real one"),
            "printf(\"// not a comment\"); /* real one */"
        );
    }

    #[test]
    fn test_odd_quote_count_leaves_tail_quoted() {
        let line = "s = \"unterminated // stays";
        assert_eq!(normalize_line(line), line);
    }

    #[test]
    fn test_quote_inside_line_comment_splits_the_comment() {
        // Known limitation: only the text up to the quote is treated as the body.
        assert_eq!(normalize_line("foo(); // say \"hi\""), "foo(); /* say */\"hi\"");
    }

    #[test]
    fn test_empty_literal_passes_through() {
        assert_eq!(normalize_line("s = \"\";"), "s = \"\";");
        assert_eq!(
            normalize_line("\"\" // after empty literal"),
            "\"\" /* after empty literal */"
        );
    }

    #[test]
    fn test_block_comments_are_not_rewrapped() {
        assert_eq!(normalize_line("/* already block */"), "/* already block */");
        assert_eq!(normalize_line("a /* b */ // c"), "a /* b */ // c");
    }

    #[test]
    fn test_delimiter_spacing_is_collapsed() {
        assert_eq!(normalize_line("/*   comment   */"), "/* comment */");
        assert_eq!(normalize_line("x = 1; /*  trailing"), "x = 1; /* trailing");
        assert_eq!(normalize_line("   */"), " */");
    }

    #[test]
    fn test_doubled_opener_is_collapsed() {
        assert_eq!(normalize_line("/**bad spacing**/"), "/* bad spacing**/");
        assert_eq!(normalize_line("/** doc */"), "/* doc */");
        assert_eq!(normalize_line("/***/"), "/* */");
    }

    #[test]
    fn test_empty_block_comment_is_left_intact() {
        assert_eq!(normalize_line("/**/"), "/**/");
        assert_eq!(normalize_line("int f(/**/);"), "int f(/**/);");
    }

    #[test]
    fn test_lines_without_comments_are_unchanged() {
        for line in ["", "int main(void) {", "  return a / b * c;", "x = \"*\";"] {
            assert_eq!(normalize_line(line), line);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for line in TRICKY_LINES {
            let once = normalize_line(line);
            let twice = normalize_line(&once);
            assert_eq!(twice, once, "not idempotent for {line:?}");
        }
    }

    #[test]
    fn test_quote_count_is_preserved() {
        for line in TRICKY_LINES {
            let normalized = normalize_line(line);
            assert_eq!(
                normalized.matches('"').count(),
                line.matches('"').count(),
                "quote count changed for {line:?}"
            );
        }
    }

    #[test]
    fn test_quoted_segments_are_verbatim() {
        for line in TRICKY_LINES {
            let normalized = normalize_line(line);
            let before: Vec<_> = split_segments(line).filter(|s| s.is_quoted()).collect();
            let after: Vec<_> = split_segments(&normalized)
                .filter(|s| s.is_quoted())
                .collect();
            assert_eq!(after, before, "quoted text changed for {line:?}");
        }
    }

    #[test]
    fn test_split_segments_round_trips() {
        let line = "a \"b\" c \"\" d \"e";
        let segments: Vec<_> = split_segments(line).collect();
        assert_eq!(segments.len(), line.matches('"').count() + 1);
        assert_eq!(segments[0], LineSegment::Unquoted("a "));
        assert_eq!(segments[1], LineSegment::Quoted("b"));
        assert_eq!(segments[3], LineSegment::Quoted(""));
        assert_eq!(segments[5], LineSegment::Quoted("e"));

        let rebuilt: Vec<&str> = segments.iter().map(|s| s.text()).collect();
        assert_eq!(rebuilt.join("\""), line);
    }
}
