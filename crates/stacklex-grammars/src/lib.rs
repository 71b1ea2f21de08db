//! stacklex grammars
//!
//! Rule tables for the languages stacklex ships with, and the selection of a
//! grammar by name or file extension. Every grammar runs on the same engine;
//! only its rule table and options differ.
//!
//! # Example
//!
//! ```
//! use stacklex_grammars::Grammar;
//! use stacklex_lexer::TokenKind;
//!
//! let grammar = Grammar::from_extension("js").unwrap();
//! let tokens = grammar.tokenize("let x = `a${b}`;", "demo.js").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Keyword);
//! ```

pub mod bnf;
pub mod c;
mod common;
pub mod ecmascript;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use stacklex_lexer::{Lexer, LexerOptions, RuleTable, SyntaxError, TableError, Token};
use tracing::{debug, warn};

/// Error selecting a grammar or scanning with it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarError {
    #[error("unknown grammar `{0}`")]
    Unknown(String),

    #[error("invalid {grammar} rule table: {source}")]
    Table {
        grammar: Grammar,
        source: TableError,
    },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// The supported grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Ecmascript,
    C,
    Bnf,
}

type CachedTable = LazyLock<Result<Arc<RuleTable>, TableError>>;

static ECMASCRIPT: CachedTable = LazyLock::new(|| build(Grammar::Ecmascript, ecmascript::table));
static C: CachedTable = LazyLock::new(|| build(Grammar::C, c::table));
static BNF: CachedTable = LazyLock::new(|| build(Grammar::Bnf, bnf::table));

fn build(
    grammar: Grammar,
    table: fn() -> Result<RuleTable, TableError>,
) -> Result<Arc<RuleTable>, TableError> {
    debug!(%grammar, "building rule table");
    table().map(Arc::new).inspect_err(|err| {
        warn!(%grammar, error = %err, "rule table rejected");
    })
}

impl Grammar {
    pub const ALL: [Grammar; 3] = [Grammar::Ecmascript, Grammar::C, Grammar::Bnf];

    pub fn name(self) -> &'static str {
        match self {
            Grammar::Ecmascript => "ecmascript",
            Grammar::C => "c",
            Grammar::Bnf => "bnf",
        }
    }

    /// File extensions (without the dot) handled by this grammar.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Grammar::Ecmascript => ecmascript::EXTENSIONS,
            Grammar::C => c::EXTENSIONS,
            Grammar::Bnf => bnf::EXTENSIONS,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Grammar> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|g| g.extensions().contains(&ext.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Grammar> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// The grammar's rule table, built once per process.
    pub fn table(self) -> Result<Arc<RuleTable>, GrammarError> {
        let cached = match self {
            Grammar::Ecmascript => &ECMASCRIPT,
            Grammar::C => &C,
            Grammar::Bnf => &BNF,
        };
        match &**cached {
            Ok(table) => Ok(Arc::clone(table)),
            Err(source) => Err(GrammarError::Table {
                grammar: self,
                source: source.clone(),
            }),
        }
    }

    pub fn options(self) -> LexerOptions {
        match self {
            Grammar::Ecmascript => ecmascript::options(),
            Grammar::C => c::options(),
            Grammar::Bnf => bnf::options(),
        }
    }

    /// Start a lexer session over `source`.
    pub fn lexer<'a>(
        self,
        source: &'a str,
        name: impl Into<Arc<str>>,
    ) -> Result<Lexer<'a>, GrammarError> {
        Ok(Lexer::with_options(source, name, self.table()?, self.options()))
    }

    /// Tokenize the whole of `source`.
    pub fn tokenize(
        self,
        source: &str,
        name: impl Into<Arc<str>>,
    ) -> Result<Vec<Token>, GrammarError> {
        let mut lexer = self.lexer(source, name)?;
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    /// Accepts a grammar name or one of its extensions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|g| g.name() == lower)
            .or_else(|| Self::from_extension(&lower))
            .ok_or_else(|| GrammarError::Unknown(s.to_string()))
    }
}
