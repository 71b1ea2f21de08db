//! C-like grammar: C11 plus the handful of C++ punctuators that show up in
//! headers (`::`, `.*`, `->*`).

use stacklex_lexer::{LexerOptions, MatchPolicy, RuleSpec, RuleTable, TableError, TokenKind};

use crate::common;

pub const EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "hpp"];

const CODE: &[&str] = &["DEFAULT"];

pub const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic",
    "_Bool", "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert",
    "_Thread_local",
];

pub const PUNCTUATORS: &[&str] = &[
    "{", "}", "(", ")", "[", "]", ";", ",", ".", "...", "->", "?", ":", "::", ".*", "->*",
    "++", "--", "&", "*", "+", "-", "~", "!", "/", "%", "<<", ">>", "<", ">", "<=", ">=",
    "==", "!=", "^", "|", "&&", "||", "=", "*=", "/=", "%=", "+=", "-=", "<<=", ">>=",
    "&=", "^=", "|=",
];

pub(crate) fn table() -> Result<RuleTable, TableError> {
    RuleTable::builder("DEFAULT")
        .state(common::COMMENT)
        .define("encoding", "u8|u|U|L")
        .define("suffix", "[uUlLfF]*")
        .define("digits", "[0-9](?:'?[0-9])*")
        .define("hexdigits", "[0-9a-fA-F](?:'?[0-9a-fA-F])*")
        .define("dqchar", r#"[^"\\\n\r]|\\(?:\r\n|[\s\S])"#)
        .define("quoted", r#""(?:{dqchar})*"|'(?:[^'\\\n\r]|\\[^\n\r])*'"#)
        .rules(common::trivia(CODE))
        .rule(RuleSpec::regex("line-continuation", r"\\(?:\r\n|[\n\r])", TokenKind::Whitespace))
        .rule(common::line_comment(CODE))
        .rules(common::block_comment(CODE))
        .rule(RuleSpec::regex(
            "preprocessor",
            r"#[ \t]*\w*(?:{quoted}|[^\n\r\\/]|\\(?:\r\n|[\n\r])|\\[^\n\r]|/[^/*\n\r])*",
            TokenKind::Preprocessor,
        ))
        .rule(RuleSpec::regex(
            "number",
            r"(?:0[xX](?:{hexdigits})?(?:\.(?:{hexdigits})?)?(?:[pP][+-]?{digits})?|0[bB][01](?:'?[01])*|(?:{digits}(?:\.(?:{digits})?)?|\.{digits})(?:[eE][+-]?{digits})?){suffix}",
            TokenKind::Number,
        ))
        .rule(RuleSpec::regex(
            "char",
            r"(?:{encoding})?'(?:[^'\\\n\r]|\\[^\n\r])+'",
            TokenKind::Char,
        ))
        .rule(RuleSpec::regex(
            "string",
            r#"(?:{encoding})?"(?:{dqchar})*""#,
            TokenKind::String,
        ))
        .rule(
            RuleSpec::regex("string", r#"(?:{encoding})?"(?:{dqchar})*"#, TokenKind::String)
                .unterminated(),
        )
        .rule(RuleSpec::regex("identifier", "[A-Za-z_][A-Za-z0-9_]*", TokenKind::Identifier))
        .punctuators(PUNCTUATORS)
        .keywords(KEYWORDS)
        .build()
}

pub fn options() -> LexerOptions {
    LexerOptions {
        policy: MatchPolicy::Longest,
        ..LexerOptions::default()
    }
}
