//! stacklex lexer engine
//!
//! A generic, state-stack driven scanner. Grammars are described as rule
//! tables: ordered `(pattern, kind, state mask, transition)` entries. The
//! engine pulls one token at a time, picks the longest eligible match, tracks
//! line/column locations and balances brackets inside interpolation states.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use stacklex_lexer::{Lexer, RuleSpec, RuleTable, TokenKind};
//!
//! let table = RuleTable::builder("DEFAULT")
//!     .rule(RuleSpec::regex("ws", r"[ \t\n]+", TokenKind::Whitespace))
//!     .rule(RuleSpec::regex("ident", r"[a-z]+", TokenKind::Identifier))
//!     .punctuators(&["=", ";"])
//!     .build()
//!     .unwrap();
//!
//! let tokens = Lexer::tokenize("a = b;", "demo", Arc::new(table)).unwrap();
//! assert_eq!(tokens.len(), 4);
//! assert_eq!(tokens[1].kind, TokenKind::Punctuator);
//! ```

pub mod balancer;
pub mod location;
pub mod rule;
pub mod scanner;
pub mod state;
pub mod token;

pub use balancer::Balancer;
pub use location::Location;
pub use rule::{
    Match, MatchPolicy, Matcher, Pattern, Rule, RuleId, RuleSpec, RuleTable, RuleTableBuilder,
    ScanFn, StateDef, StateId, StateMask, Transition,
};
pub use scanner::{Lexer, LexerOptions, ScanObserver, ScanView, Signal};
pub use state::{StateStack, StateUnderflow};
pub use token::{KindSet, Token, TokenKind};

use std::fmt;

/// Category of a fatal scan failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ErrorKind {
    /// No eligible rule matches at the current offset.
    NoRuleMatched,
    /// End of input inside a pushed state or an open bracket.
    UnterminatedConstruct,
    /// A closing bracket does not match the innermost opener.
    BalancerMismatch,
    /// A pop was attempted with only the bottom state left.
    StateUnderflow,
    /// A driver asked for a state the rule table does not declare.
    UnknownState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoRuleMatched => "no rule matched",
            ErrorKind::UnterminatedConstruct => "unterminated construct",
            ErrorKind::BalancerMismatch => "bracket mismatch",
            ErrorKind::StateUnderflow => "state underflow",
            ErrorKind::UnknownState => "unknown state",
        };
        f.write_str(name)
    }
}

/// Scan error with the location of the failure.
///
/// Every `SyntaxError` terminates the lexer session that produced it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Syntax error at {location}: {kind}: {message}")]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub location: Location,
    pub message: String,
}

impl SyntaxError {
    pub fn new(kind: ErrorKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            message: message.into(),
        }
    }

    /// Render the offending source line with a caret under the error column.
    pub fn caret(&self, source: &str) -> String {
        let line = location::line_at(source, self.location.offset);
        let pad = " ".repeat(self.location.column.saturating_sub(1));
        format!("{line}\n{pad}^")
    }
}

/// Error building a rule table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("rule `{rule}` has an invalid pattern: {source}")]
    InvalidPattern { rule: String, source: regex::Error },

    #[error("unknown state `{0}`")]
    UnknownState(String),

    #[error("too many states: a rule table holds at most {max}")]
    TooManyStates { max: usize },

    #[error("rule `{0}` has an empty literal pattern")]
    EmptyLiteral(String),

    #[error("definition `{0}` expands into itself")]
    DefinitionCycle(String),
}
