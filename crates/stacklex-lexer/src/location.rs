use std::fmt;
use std::sync::Arc;

/// A position in source text.
///
/// `offset` counts bytes, `line` and `column` are 1-based and count
/// characters, so a multi-byte character advances `column` by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub source: Arc<str>,
}

impl Location {
    pub fn new(offset: usize, line: usize, column: usize, source: impl Into<Arc<str>>) -> Self {
        Self {
            offset,
            line,
            column,
            source: source.into(),
        }
    }

    /// The location of the first byte of `source`.
    pub fn start(source: impl Into<Arc<str>>) -> Self {
        Self::new(0, 1, 1, source)
    }

    /// The location just past `span`, which must begin at `self`.
    pub fn advance(&self, span: &str) -> Location {
        let mut line = self.line;
        let mut column = self.column;
        for c in span.chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Location {
            offset: self.offset + span.len(),
            line,
            column,
            source: Arc::clone(&self.source),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.source.is_empty() {
            write!(f, "{}:", self.source)?;
        }
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The text of the line containing byte `offset`, without its newline.
pub(crate) fn line_at(source: &str, offset: usize) -> &str {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    source[start..end].trim_end_matches('\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_start() {
        let loc = Location::start("a.js");
        assert_eq!((loc.offset, loc.line, loc.column), (0, 1, 1));
    }

    #[test]
    fn test_advance_same_line() {
        let loc = Location::start("").advance("abc");
        assert_eq!((loc.offset, loc.line, loc.column), (3, 1, 4));
    }

    #[test]
    fn test_advance_across_newlines() {
        let loc = Location::start("").advance("ab\ncd\ne");
        assert_eq!((loc.offset, loc.line, loc.column), (7, 3, 2));
    }

    #[test]
    fn test_advance_multibyte_counts_chars() {
        let loc = Location::start("").advance("héllo");
        assert_eq!(loc.offset, 6);
        assert_eq!(loc.column, 6);
    }

    #[test]
    fn test_advance_keeps_source() {
        let loc = Location::start("main.c").advance("x\n");
        assert_eq!(&*loc.source, "main.c");
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::new(28, 10, 3, "file.txt").to_string(), "file.txt:10:3");
        assert_eq!(Location::new(0, 1, 1, "").to_string(), "1:1");
    }

    #[test]
    fn test_line_at() {
        let src = "one\ntwo\r\nthree";
        assert_eq!(line_at(src, 0), "one");
        assert_eq!(line_at(src, 5), "two");
        assert_eq!(line_at(src, 9), "three");
        assert_eq!(line_at(src, 100), "three");
    }
}
