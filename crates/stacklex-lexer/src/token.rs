use std::fmt;
use std::sync::Arc;

use crate::location::Location;
use crate::rule::RuleId;

/// Token classification shared by every grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TokenKind {
    // Trivia
    Whitespace,
    Newline,
    Comment,

    // Words
    Identifier,
    Keyword,
    Punctuator,

    // Literals
    Number,
    String,
    Char,
    Regexp,

    // Templates and embedded regions
    TemplateDelimiter,
    TemplateText,
    InterpolationStart,
    InterpolationEnd,

    // Grammar-description and preprocessor words
    Preprocessor,
    Nonterminal,
    Directive,
    CharClass,
    ActionCode,

    /// Produced only by tables that opt into tolerant lexing.
    Error,
}

impl TokenKind {
    pub const ALL: [TokenKind; 20] = [
        TokenKind::Whitespace,
        TokenKind::Newline,
        TokenKind::Comment,
        TokenKind::Identifier,
        TokenKind::Keyword,
        TokenKind::Punctuator,
        TokenKind::Number,
        TokenKind::String,
        TokenKind::Char,
        TokenKind::Regexp,
        TokenKind::TemplateDelimiter,
        TokenKind::TemplateText,
        TokenKind::InterpolationStart,
        TokenKind::InterpolationEnd,
        TokenKind::Preprocessor,
        TokenKind::Nonterminal,
        TokenKind::Directive,
        TokenKind::CharClass,
        TokenKind::ActionCode,
        TokenKind::Error,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Newline => "newline",
            TokenKind::Comment => "comment",
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::Punctuator => "punctuator",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Char => "char",
            TokenKind::Regexp => "regexp",
            TokenKind::TemplateDelimiter => "template-delimiter",
            TokenKind::TemplateText => "template-text",
            TokenKind::InterpolationStart => "interpolation-start",
            TokenKind::InterpolationEnd => "interpolation-end",
            TokenKind::Preprocessor => "preprocessor",
            TokenKind::Nonterminal => "nonterminal",
            TokenKind::Directive => "directive",
            TokenKind::CharClass => "char-class",
            TokenKind::ActionCode => "action-code",
            TokenKind::Error => "error",
        }
    }

    /// Look a kind up by its [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<TokenKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of token kinds, used as the skip mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KindSet(u32);

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);

    /// Whitespace, newlines and comments.
    pub const TRIVIA: KindSet = KindSet(
        (1 << TokenKind::Whitespace as u32)
            | (1 << TokenKind::Newline as u32)
            | (1 << TokenKind::Comment as u32),
    );

    pub fn of(kinds: &[TokenKind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |set, &k| set.with(k))
    }

    pub fn with(self, kind: TokenKind) -> Self {
        KindSet(self.0 | kind.bit())
    }

    pub fn without(self, kind: TokenKind) -> Self {
        KindSet(self.0 & !kind.bit())
    }

    pub fn contains(self, kind: TokenKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = TokenKind> {
        TokenKind::ALL.into_iter().filter(move |&k| self.contains(k))
    }
}

/// A token produced by one scan step.
///
/// The lexeme is an owned copy, so tokens outlive the lexer session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Token {
    pub kind: TokenKind,
    /// The rule that matched.
    pub rule: RuleId,
    pub lexeme: String,
    pub byte_length: usize,
    /// Location of the first byte of the lexeme.
    pub loc: Location,
    /// Name of the state that was on top when the token matched.
    pub state: Arc<str>,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Byte offset just past the lexeme.
    pub fn end_offset(&self) -> usize {
        self.loc.offset + self.byte_length
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.loc, self.kind, self.lexeme)
    }
}
