/// A piece of a line delimited by `"` characters.
///
/// Splitting on `"` yields segments that strictly alternate between code that
/// lies outside a string literal and the contents of a string literal, starting
/// with code. Escaped quotes are not recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSegment<'a> {
    /// Text outside any string literal; comment rewriting applies here
    Unquoted(&'a str),
    /// Contents of a string literal, passed through verbatim
    Quoted(&'a str),
}

impl<'a> LineSegment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            LineSegment::Unquoted(text) | LineSegment::Quoted(text) => text,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, LineSegment::Quoted(_))
    }
}
