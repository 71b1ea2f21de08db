//! ECMAScript-like grammar.
//!
//! States:
//! - `DEFAULT`: ordinary code
//! - `TEMPLATE`: inside a backtick template literal
//! - `INTERPOLATION`: inside `${ ... }`, balanced, ends at its own `}`
//! - `COMMENT`: inside `/* ... */`
//! - `REGEXP`: entered by a driver that has peeked a `/` or `/=` where an
//!   operand is expected; scans the whole literal, slashes and flags
//!   included, then pops

use stacklex_lexer::{LexerOptions, RuleSpec, RuleTable, TableError, TokenKind};

use crate::common;

pub const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts"];

pub const TEMPLATE: &str = "TEMPLATE";
pub const INTERPOLATION: &str = "INTERPOLATION";
pub const REGEXP: &str = "REGEXP";

const CODE: &[&str] = &["DEFAULT", INTERPOLATION];

/// States where trivia and comments may precede the next token.
const SPACED: &[&str] = &["DEFAULT", INTERPOLATION, REGEXP];

pub const KEYWORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

pub const PUNCTUATORS: &[&str] = &[
    "{", "}", "(", ")", "[", "]", ";", ",", ".", "...", "?", ":", "=>",
    "<", ">", "<=", ">=", "==", "!=", "===", "!==",
    "+", "-", "*", "/", "%", "**", "++", "--",
    "<<", ">>", ">>>", "&", "|", "^", "!", "~", "&&", "||", "??",
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=",
    "&=", "|=", "^=", "&&=", "||=", "??=",
];

pub(crate) fn table() -> Result<RuleTable, TableError> {
    RuleTable::builder("DEFAULT")
        .state(TEMPLATE)
        .balanced_state(INTERPOLATION)
        .state(common::COMMENT)
        .state(REGEXP)
        .define("idstart", r"[\p{L}\p{Nl}_$]|\\u[0-9a-fA-F]{4}")
        .define("idpart", r"[\p{L}\p{Nl}\p{Mn}\p{Mc}\p{Nd}\p{Pc}_$\x{200C}\x{200D}]|\\u[0-9a-fA-F]{4}")
        .define("digits", "[0-9](?:_?[0-9])*")
        .define("exponent", "[eE][+-]?{digits}")
        .define("dqchar", r#"[^"\\\n\r]|\\(?:\r\n|[\s\S])"#)
        .define("sqchar", r"[^'\\\n\r]|\\(?:\r\n|[\s\S])")
        .define("reclass", r"\[(?:[^\]\\\n\r]|\\[^\n\r])*\]")
        .rules(common::trivia(SPACED))
        .rule(common::line_comment(SPACED))
        .rules(common::block_comment(SPACED))
        .rule(
            RuleSpec::regex(
                "number",
                r"0[xX][0-9a-fA-F](?:_?[0-9a-fA-F])*n?|0[oO][0-7](?:_?[0-7])*n?|0[bB][01](?:_?[01])*n?|{digits}n|(?:{digits}(?:\.(?:{digits})?)?|\.{digits})(?:{exponent})?",
                TokenKind::Number,
            )
            .within(CODE),
        )
        .rule(
            RuleSpec::regex(
                "string",
                r#""(?:{dqchar})*"|'(?:{sqchar})*'"#,
                TokenKind::String,
            )
            .within(CODE),
        )
        .rule(
            RuleSpec::regex("string", r#""(?:{dqchar})*|'(?:{sqchar})*"#, TokenKind::String)
                .within(CODE)
                .unterminated(),
        )
        .rule(RuleSpec::regex("identifier", "#?(?:{idstart})(?:{idpart})*", TokenKind::Identifier).within(CODE))
        .rule(
            RuleSpec::literal("template-open", "`", TokenKind::TemplateDelimiter)
                .within(CODE)
                .push(TEMPLATE),
        )
        .rule(
            RuleSpec::literal("template-close", "`", TokenKind::TemplateDelimiter)
                .within(&[TEMPLATE])
                .pop(),
        )
        .rule(
            RuleSpec::regex(
                "template-text",
                r"(?:[^`\\$]|\\[\s\S]|\$(?:[^{`\\$]|\\[\s\S]))+",
                TokenKind::TemplateText,
            )
            .within(&[TEMPLATE]),
        )
        .rule(RuleSpec::literal("template-dollar", "$", TokenKind::TemplateText).within(&[TEMPLATE]))
        .rule(
            RuleSpec::literal("interpolation-open", "${", TokenKind::InterpolationStart)
                .within(&[TEMPLATE])
                .push(INTERPOLATION),
        )
        .rule(
            RuleSpec::regex(
                "regexp-body",
                r"/(?:[^*/\\\[\n\r]|\\[^\n\r]|{reclass})(?:[^/\\\[\n\r]|\\[^\n\r]|{reclass})*/[A-Za-z]*",
                TokenKind::Regexp,
            )
            .within(&[REGEXP])
            .pop(),
        )
        .rule(RuleSpec::scan("?.", optional_chain, TokenKind::Punctuator).within(CODE))
        .punctuators_within(PUNCTUATORS, CODE)
        .keywords(KEYWORDS)
        .build()
}

/// `?.` unless a decimal digit follows: `a?.5:1` is a conditional.
fn optional_chain(rest: &str) -> Option<usize> {
    let after = rest.strip_prefix("?.")?;
    (!after.starts_with(|c: char| c.is_ascii_digit())).then_some(2)
}

pub fn options() -> LexerOptions {
    LexerOptions::default()
}
