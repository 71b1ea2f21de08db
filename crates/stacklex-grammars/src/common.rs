//! Rule fragments shared by the grammar adapters.

use stacklex_lexer::{RuleSpec, TokenKind};

pub(crate) const COMMENT: &str = "COMMENT";

/// Horizontal whitespace and line breaks, eligible in `code` states.
pub(crate) fn trivia(code: &[&str]) -> Vec<RuleSpec> {
    vec![
        RuleSpec::regex("whitespace", r"[ \t\x0B\x0C\x{A0}\x{FEFF}]+", TokenKind::Whitespace)
            .within(code),
        RuleSpec::regex("newline", r"\r\n|[\n\r\x{2028}\x{2029}]", TokenKind::Newline)
            .within(code),
    ]
}

/// `// ...` up to the end of the line.
pub(crate) fn line_comment(code: &[&str]) -> RuleSpec {
    RuleSpec::regex("line-comment", r"//[^\n\r\x{2028}\x{2029}]*", TokenKind::Comment).within(code)
}

/// `/* ... */` scanned through the `COMMENT` state, so end of input inside a
/// comment reports the opening `/*`.
pub(crate) fn block_comment(code: &[&str]) -> Vec<RuleSpec> {
    vec![
        RuleSpec::literal("comment-open", "/*", TokenKind::Comment)
            .within(code)
            .push(COMMENT),
        RuleSpec::regex("comment-body", r"<COMMENT>(?:[^*]|\*+[^*/])+", TokenKind::Comment),
        RuleSpec::regex("comment-close", r"\*+/", TokenKind::Comment)
            .within(&[COMMENT])
            .pop(),
    ]
}
