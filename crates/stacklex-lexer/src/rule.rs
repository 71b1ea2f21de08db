//! Rule tables and rule matching.
//!
//! A rule table is an ordered list of rules. Each rule names a pattern, the
//! token kind it produces, the states in which it is eligible and an optional
//! state transition. Table order is the rule priority.
//!
//! Regex patterns may reference named definitions as `{name}`, and may be
//! restricted to one state with a `<STATE>` prefix:
//!
//! ```
//! use stacklex_lexer::{RuleSpec, RuleTable, TokenKind};
//!
//! let table = RuleTable::builder("DEFAULT")
//!     .state("COMMENT")
//!     .define("digit", "[0-9]")
//!     .rule(RuleSpec::regex("number", "{digit}+", TokenKind::Number))
//!     .rule(RuleSpec::literal("open", "/*", TokenKind::Comment).push("COMMENT"))
//!     .rule(RuleSpec::regex("body", "<COMMENT>[^*]+", TokenKind::Comment))
//!     .rule(RuleSpec::literal("close", "*/", TokenKind::Comment).within(&["COMMENT"]).pop())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(table.rules().len(), 4);
//! assert_eq!(table.states().len(), 2);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::token::TokenKind;
use crate::TableError;

/// Maximum number of states in one rule table (one bit per state in a mask).
pub const MAX_STATES: usize = 64;

/// Definitions may nest, but not deeper than this.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Index of a state inside its rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u8);

impl StateId {
    /// The bottom state every session starts in.
    pub const INITIAL: StateId = StateId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bitmask of the states in which a rule is eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct StateMask(u64);

impl StateMask {
    pub const NONE: StateMask = StateMask(0);
    pub const ALL: StateMask = StateMask(u64::MAX);

    pub fn of(state: StateId) -> Self {
        StateMask(1 << state.0)
    }

    pub fn with(self, state: StateId) -> Self {
        StateMask(self.0 | (1 << state.0))
    }

    pub fn contains(self, state: StateId) -> bool {
        self.0 & (1 << state.0) != 0
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

/// Index of a rule inside its rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RuleId(u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// State change applied after a rule's token is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    #[default]
    None,
    Push(StateId),
    Pop,
}

/// How competing rule matches are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Longest match wins; ties go to literals, then to table order.
    #[default]
    Longest,
    /// The first eligible rule that matches wins.
    First,
}

/// Something that can recognize a prefix of `text` starting at `offset`.
///
/// Returns the matched length in bytes. A zero-length match counts as no match.
pub trait Matcher {
    fn try_match(&self, text: &str, offset: usize) -> Option<usize>;
}

impl Matcher for str {
    fn try_match(&self, text: &str, offset: usize) -> Option<usize> {
        let rest = text.get(offset..)?;
        (!self.is_empty() && rest.starts_with(self)).then_some(self.len())
    }
}

impl Matcher for Regex {
    fn try_match(&self, text: &str, offset: usize) -> Option<usize> {
        let rest = text.get(offset..)?;
        self.find(rest)
            .filter(|m| m.start() == 0 && m.end() > 0)
            .map(|m| m.end())
    }
}

/// A hand-written recognizer: receives the rest of the input, returns the
/// matched byte length.
pub type ScanFn = fn(&str) -> Option<usize>;

impl Matcher for ScanFn {
    fn try_match(&self, text: &str, offset: usize) -> Option<usize> {
        let rest = text.get(offset..)?;
        self(rest).filter(|&n| n > 0 && n <= rest.len() && rest.is_char_boundary(n))
    }
}

/// A compiled rule pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
    Scan(ScanFn),
}

impl Pattern {
    pub fn is_literal(&self) -> bool {
        matches!(self, Pattern::Literal(_))
    }
}

impl Matcher for Pattern {
    fn try_match(&self, text: &str, offset: usize) -> Option<usize> {
        match self {
            Pattern::Literal(s) => s.as_str().try_match(text, offset),
            Pattern::Regex(re) => re.try_match(text, offset),
            Pattern::Scan(f) => f.try_match(text, offset),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(s) => write!(f, "{s:?}"),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
            Pattern::Scan(_) => f.write_str("<scan>"),
        }
    }
}

/// One entry of a rule table.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub pattern: Pattern,
    pub kind: TokenKind,
    pub mask: StateMask,
    pub transition: Transition,
    /// A match reports an unterminated construct instead of producing a token.
    pub unterminated: bool,
    /// The pattern as written, before definition expansion.
    pub source: String,
}

/// A state declared by a rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDef {
    pub name: Arc<str>,
    /// Balanced states track `{ [ (` nesting; a `}` at depth zero leaves them.
    pub balanced: bool,
}

/// The winning rule of one scan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub rule: RuleId,
    pub len: usize,
}

/// An immutable, shareable set of rules for one grammar.
#[derive(Debug, Clone)]
pub struct RuleTable {
    states: Vec<StateDef>,
    rules: Vec<Rule>,
    keywords: HashSet<String>,
}

impl RuleTable {
    /// Start a table whose bottom state is `initial`.
    pub fn builder(initial: &str) -> RuleTableBuilder {
        RuleTableBuilder::new(initial)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The rule with the given id. Ids are only valid for the table that issued them.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    /// The first rule named `name`.
    pub fn find_rule(&self, name: &str) -> Option<RuleId> {
        self.rules
            .iter()
            .position(|rule| rule.name == name)
            .map(|i| RuleId(i as u32))
    }

    /// Rule names in table order. Punctuator rules are named after their text.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn states(&self) -> &[StateDef] {
        &self.states
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| &*s.name == name)
            .map(|i| StateId(i as u8))
    }

    pub fn state_name(&self, id: StateId) -> &Arc<str> {
        &self.states[id.index()].name
    }

    pub fn is_balanced(&self, id: StateId) -> bool {
        self.states[id.index()].balanced
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Rules eligible in `state`, in table order.
    pub fn eligible(&self, state: StateId) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.mask.contains(state))
            .map(|(i, rule)| (RuleId(i as u32), rule))
    }

    /// Select the rule that matches at `offset` in `state`.
    pub fn find_match(
        &self,
        text: &str,
        offset: usize,
        state: StateId,
        policy: MatchPolicy,
    ) -> Option<Match> {
        let mut best: Option<(Match, bool)> = None;

        for (id, rule) in self.eligible(state) {
            let Some(len) = rule.pattern.try_match(text, offset) else {
                continue;
            };
            let candidate = Match { rule: id, len };
            if policy == MatchPolicy::First {
                return Some(candidate);
            }
            let literal = rule.pattern.is_literal();
            let better = match best {
                None => true,
                Some((current, current_literal)) => {
                    len > current.len || (len == current.len && literal && !current_literal)
                }
            };
            if better {
                best = Some((candidate, literal));
            }
        }

        best.map(|(m, _)| m)
    }

    /// Token kind for a lexeme matched by `rule`. Identifiers equal to a
    /// keyword become keywords.
    pub fn classify(&self, rule: &Rule, lexeme: &str) -> TokenKind {
        if rule.kind == TokenKind::Identifier && self.is_keyword(lexeme) {
            TokenKind::Keyword
        } else {
            rule.kind
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Literal(String),
    Regex(String),
    Scan(ScanFn),
}

#[derive(Debug, Clone)]
enum States {
    Initial,
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone)]
enum Target {
    None,
    Push(String),
    Pop,
}

/// An unresolved rule, as handed to [`RuleTableBuilder::rule`].
#[derive(Debug, Clone)]
pub struct RuleSpec {
    name: String,
    source: Source,
    kind: TokenKind,
    states: States,
    target: Target,
    unterminated: bool,
}

impl RuleSpec {
    fn new(name: &str, source: Source, kind: TokenKind) -> Self {
        Self {
            name: name.to_string(),
            source,
            kind,
            states: States::Initial,
            target: Target::None,
            unterminated: false,
        }
    }

    pub fn literal(name: &str, text: &str, kind: TokenKind) -> Self {
        Self::new(name, Source::Literal(text.to_string()), kind)
    }

    pub fn regex(name: &str, pattern: &str, kind: TokenKind) -> Self {
        Self::new(name, Source::Regex(pattern.to_string()), kind)
    }

    pub fn scan(name: &str, scan: ScanFn, kind: TokenKind) -> Self {
        Self::new(name, Source::Scan(scan), kind)
    }

    /// Make the rule eligible in the named states only.
    pub fn within(mut self, states: &[&str]) -> Self {
        self.states = States::Named(states.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Make the rule eligible in every state.
    pub fn everywhere(mut self) -> Self {
        self.states = States::All;
        self
    }

    pub fn push(mut self, state: &str) -> Self {
        self.target = Target::Push(state.to_string());
        self
    }

    pub fn pop(mut self) -> Self {
        self.target = Target::Pop;
        self
    }

    /// Mark the rule as recognizing the unclosed form of a construct, such as
    /// a string literal cut off by a line break or end of input.
    pub fn unterminated(mut self) -> Self {
        self.unterminated = true;
        self
    }
}

/// Collects states, definitions and rules, then compiles them into a [`RuleTable`].
#[derive(Debug, Clone)]
pub struct RuleTableBuilder {
    states: Vec<StateDef>,
    defines: HashMap<String, String>,
    specs: Vec<RuleSpec>,
    keywords: HashSet<String>,
}

impl RuleTableBuilder {
    pub fn new(initial: &str) -> Self {
        Self {
            states: vec![StateDef {
                name: initial.into(),
                balanced: false,
            }],
            defines: HashMap::new(),
            specs: Vec::new(),
            keywords: HashSet::new(),
        }
    }

    pub fn state(mut self, name: &str) -> Self {
        self.declare(name, false);
        self
    }

    /// Declare a state whose brackets are balanced, ending at a `}` at depth zero.
    pub fn balanced_state(mut self, name: &str) -> Self {
        self.declare(name, true);
        self
    }

    /// Name a regex fragment that patterns can reference as `{name}`.
    pub fn define(mut self, name: &str, pattern: &str) -> Self {
        self.defines.insert(name.to_string(), pattern.to_string());
        self
    }

    pub fn rule(mut self, spec: RuleSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn rules(mut self, specs: impl IntoIterator<Item = RuleSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    /// Add one literal `Punctuator` rule per entry, eligible in the initial state.
    pub fn punctuators(self, puncts: &[&str]) -> Self {
        let initial = self.states[0].name.to_string();
        self.punctuators_within(puncts, &[initial.as_str()])
    }

    /// Add one literal `Punctuator` rule per entry, eligible in `states`.
    pub fn punctuators_within(mut self, puncts: &[&str], states: &[&str]) -> Self {
        for p in puncts {
            self.specs
                .push(RuleSpec::literal(p, p, TokenKind::Punctuator).within(states));
        }
        self
    }

    /// Identifiers equal to one of `words` are reported as keywords.
    pub fn keywords(mut self, words: &[&str]) -> Self {
        self.keywords.extend(words.iter().map(|w| w.to_string()));
        self
    }

    pub fn build(mut self) -> Result<RuleTable, TableError> {
        // `<STATE>` prefixes declare their state before masks are resolved.
        let mut prefixed = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let prefix = match &spec.source {
                Source::Regex(p) => parse_state_prefix(p).map(|(state, _)| state.to_string()),
                _ => None,
            };
            prefixed.push(prefix);
        }
        for state in prefixed.iter().flatten() {
            self.declare(state, false);
        }

        if self.states.len() > MAX_STATES {
            return Err(TableError::TooManyStates { max: MAX_STATES });
        }

        let mut rules = Vec::with_capacity(self.specs.len());
        for (spec, prefix) in self.specs.iter().zip(&prefixed) {
            rules.push(self.compile(spec, prefix.as_deref())?);
        }

        debug!(
            states = self.states.len(),
            rules = rules.len(),
            keywords = self.keywords.len(),
            "rule table built"
        );

        Ok(RuleTable {
            states: self.states,
            rules,
            keywords: self.keywords,
        })
    }

    fn declare(&mut self, name: &str, balanced: bool) {
        match self.states.iter_mut().find(|s| &*s.name == name) {
            Some(state) => state.balanced |= balanced,
            None => self.states.push(StateDef {
                name: name.into(),
                balanced,
            }),
        }
    }

    fn lookup(&self, name: &str) -> Result<StateId, TableError> {
        self.states
            .iter()
            .position(|s| &*s.name == name)
            .map(|i| StateId(i as u8))
            .ok_or_else(|| TableError::UnknownState(name.to_string()))
    }

    fn compile(&self, spec: &RuleSpec, prefix: Option<&str>) -> Result<Rule, TableError> {
        let mask = match (&spec.states, prefix) {
            (States::Named(names), _) => names.iter().try_fold(StateMask::NONE, |mask, name| {
                self.lookup(name).map(|id| mask.with(id))
            })?,
            (States::All, _) => StateMask::ALL,
            (States::Initial, Some(state)) => StateMask::of(self.lookup(state)?),
            (States::Initial, None) => StateMask::of(StateId::INITIAL),
        };

        let transition = match &spec.target {
            Target::None => Transition::None,
            Target::Push(state) => Transition::Push(self.lookup(state)?),
            Target::Pop => Transition::Pop,
        };

        let (pattern, source) = match &spec.source {
            Source::Literal(text) => {
                if text.is_empty() {
                    return Err(TableError::EmptyLiteral(spec.name.clone()));
                }
                (Pattern::Literal(text.clone()), text.clone())
            }
            Source::Regex(written) => {
                let body = parse_state_prefix(written).map_or(written.as_str(), |(_, rest)| rest);
                let expanded = expand(&self.defines, body, 0)?;
                let regex = Regex::new(&format!(r"\A(?:{expanded})")).map_err(|source| {
                    TableError::InvalidPattern {
                        rule: spec.name.clone(),
                        source,
                    }
                })?;
                (Pattern::Regex(regex), written.clone())
            }
            Source::Scan(f) => (Pattern::Scan(*f), String::from("<scan>")),
        };

        Ok(Rule {
            name: spec.name.clone(),
            pattern,
            kind: spec.kind,
            mask,
            transition,
            unterminated: spec.unterminated,
            source,
        })
    }
}

/// Split `<NAME>rest` into `("NAME", "rest")`.
fn parse_state_prefix(pattern: &str) -> Option<(&str, &str)> {
    let inner = pattern.strip_prefix('<')?;
    let end = inner.find('>')?;
    let name = &inner[..end];
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| (name, &inner[end + 1..]))
}

/// Replace `{name}` references to definitions. Anything else in braces
/// (repetition counts, escaped braces) is kept verbatim.
fn expand(
    defines: &HashMap<String, String>,
    pattern: &str,
    depth: usize,
) -> Result<String, TableError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '\\' {
            let escaped = rest[1..].chars().next().map_or(0, char::len_utf8);
            out.push_str(&rest[..1 + escaped]);
            rest = &rest[1 + escaped..];
            continue;
        }
        if c == '{' {
            if let Some(end) = rest.find('}') {
                let name = &rest[1..end];
                if let Some(definition) = defines.get(name) {
                    if depth >= MAX_EXPANSION_DEPTH {
                        return Err(TableError::DefinitionCycle(name.to_string()));
                    }
                    out.push_str("(?:");
                    out.push_str(&expand(defines, definition, depth + 1)?);
                    out.push(')');
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident_rule() -> RuleSpec {
        RuleSpec::regex("identifier", "[A-Za-z_][A-Za-z0-9_]*", TokenKind::Identifier)
    }

    fn winner(table: &RuleTable, text: &str) -> Option<(String, usize)> {
        table
            .find_match(text, 0, StateId::INITIAL, MatchPolicy::Longest)
            .map(|m| (table.rule(m.rule).name.clone(), m.len))
    }

    #[test]
    fn test_longest_match_shift_operators() {
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::literal("GT", ">", TokenKind::Punctuator))
            .rule(RuleSpec::literal("SHR", ">>", TokenKind::Punctuator))
            .rule(RuleSpec::literal("USHR", ">>>", TokenKind::Punctuator))
            .build()
            .unwrap();
        assert_eq!(winner(&table, ">>>x"), Some(("USHR".into(), 3)));
        assert_eq!(winner(&table, ">>x"), Some(("SHR".into(), 2)));
    }

    #[test]
    fn test_longest_match_enumerates_all_rules() {
        let table = RuleTable::builder("DEFAULT")
            .punctuators(&[">", ">=", ">>", ">>=", ">>>", ">>>="])
            .build()
            .unwrap();
        assert_eq!(winner(&table, ">>>=1"), Some((">>>=".into(), 4)));
    }

    #[test]
    fn test_keyword_literal_loses_to_longer_identifier() {
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::literal("return", "return", TokenKind::Keyword))
            .rule(ident_rule())
            .build()
            .unwrap();
        assert_eq!(winner(&table, "returning"), Some(("identifier".into(), 9)));
    }

    #[test]
    fn test_literal_wins_equal_length_over_regex() {
        // Literal listed after the regex still wins the tie.
        let table = RuleTable::builder("DEFAULT")
            .rule(ident_rule())
            .rule(RuleSpec::literal("return", "return", TokenKind::Keyword))
            .build()
            .unwrap();
        assert_eq!(winner(&table, "return x"), Some(("return".into(), 6)));
    }

    #[test]
    fn test_equal_length_regexes_keep_table_order() {
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::regex("first", "[a-z]+", TokenKind::Identifier))
            .rule(RuleSpec::regex("second", "[a-z0-9]+", TokenKind::Identifier))
            .build()
            .unwrap();
        assert_eq!(winner(&table, "abc "), Some(("first".into(), 3)));
    }

    #[test]
    fn test_first_policy_stops_at_first_match() {
        let table = RuleTable::builder("DEFAULT")
            .punctuators(&[">", ">>"])
            .build()
            .unwrap();
        let m = table
            .find_match(">>", 0, StateId::INITIAL, MatchPolicy::First)
            .unwrap();
        assert_eq!(table.rule(m.rule).name, ">");
        assert_eq!(m.len, 1);
    }

    #[test]
    fn test_keyword_set_classification() {
        let table = RuleTable::builder("DEFAULT")
            .rule(ident_rule())
            .keywords(&["return"])
            .build()
            .unwrap();
        let rule = &table.rules()[0];
        assert_eq!(table.classify(rule, "return"), TokenKind::Keyword);
        assert_eq!(table.classify(rule, "returning"), TokenKind::Identifier);
    }

    #[test]
    fn test_eligibility_follows_state_mask() {
        let table = RuleTable::builder("DEFAULT")
            .state("STRING")
            .rule(RuleSpec::regex("word", "[a-z]+", TokenKind::Identifier))
            .rule(RuleSpec::regex("text", "[^\"]+", TokenKind::String).within(&["STRING"]))
            .build()
            .unwrap();
        let string = table.state_id("STRING").unwrap();
        let names: Vec<_> = table.eligible(string).map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(names, vec!["text"]);
        assert!(table
            .find_match("abc", 0, string, MatchPolicy::Longest)
            .is_some_and(|m| m.len == 3));
        assert!(table
            .find_match("\"", 0, StateId::INITIAL, MatchPolicy::Longest)
            .is_none());
    }

    #[test]
    fn test_everywhere_mask() {
        let table = RuleTable::builder("A")
            .state("B")
            .rule(RuleSpec::literal("x", "x", TokenKind::Identifier).everywhere())
            .build()
            .unwrap();
        let b = table.state_id("B").unwrap();
        assert_eq!(table.eligible(b).count(), 1);
    }

    #[test]
    fn test_matches_at_offset() {
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::regex("num", "[0-9]+", TokenKind::Number))
            .build()
            .unwrap();
        let m = table
            .find_match("ab123", 2, StateId::INITIAL, MatchPolicy::Longest)
            .unwrap();
        assert_eq!(m.len, 3);
        assert!(table
            .find_match("ab123", 1, StateId::INITIAL, MatchPolicy::Longest)
            .is_none());
    }

    #[test]
    fn test_find_rule_by_name() {
        let table = RuleTable::builder("DEFAULT")
            .rule(ident_rule())
            .punctuators(&["(", ")"])
            .build()
            .unwrap();
        assert_eq!(table.find_rule(")").map(RuleId::index), Some(2));
        assert_eq!(table.find_rule("identifier").map(RuleId::index), Some(0));
        assert_eq!(table.find_rule("number"), None);
        assert_eq!(table.rule_names().collect::<Vec<_>>(), vec!["identifier", "(", ")"]);
    }

    #[test]
    fn test_unterminated_flag_is_compiled() {
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::regex("string", r#""[^"\n]*""#, TokenKind::String))
            .rule(RuleSpec::regex("open-string", r#""[^"\n]*"#, TokenKind::String).unterminated())
            .build()
            .unwrap();
        assert!(!table.rules()[0].unterminated);
        assert!(table.rules()[1].unterminated);
        assert_eq!(winner(&table, "\"ab\" x"), Some(("string".into(), 4)));
        assert_eq!(winner(&table, "\"ab"), Some(("open-string".into(), 3)));
    }

    #[test]
    fn test_empty_regex_match_is_no_match() {
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::regex("maybe", "[0-9]*", TokenKind::Number))
            .build()
            .unwrap();
        assert_eq!(winner(&table, "abc"), None);
    }

    #[test]
    fn test_definition_expansion() {
        let table = RuleTable::builder("DEFAULT")
            .define("digit", "[0-9]")
            .define("int", "{digit}+")
            .rule(RuleSpec::regex("float", r"{int}\.{int}", TokenKind::Number))
            .build()
            .unwrap();
        assert_eq!(winner(&table, "12.50;"), Some(("float".into(), 5)));
        assert_eq!(table.rules()[0].source, r"{int}\.{int}");
    }

    #[test]
    fn test_expand_keeps_repetition_and_escapes() {
        let defines = HashMap::from([("x".to_string(), "a".to_string())]);
        assert_eq!(expand(&defines, "b{2,3}", 0).unwrap(), "b{2,3}");
        assert_eq!(expand(&defines, r"\{x}", 0).unwrap(), r"\{x}");
        assert_eq!(expand(&defines, "{x}{x}", 0).unwrap(), "(?:a)(?:a)");
    }

    #[test]
    fn test_definition_cycle_is_rejected() {
        let err = RuleTable::builder("DEFAULT")
            .define("a", "{b}")
            .define("b", "{a}")
            .rule(RuleSpec::regex("loop", "{a}", TokenKind::Identifier))
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::DefinitionCycle(_)));
    }

    #[test]
    fn test_state_prefix_declares_state() {
        let table = RuleTable::builder("INITIAL")
            .rule(RuleSpec::regex("body", "<COMMENT>[^*]+", TokenKind::Comment))
            .build()
            .unwrap();
        let comment = table.state_id("COMMENT").unwrap();
        assert!(table.rules()[0].mask.contains(comment));
        assert!(!table.rules()[0].mask.contains(StateId::INITIAL));
        assert!(table
            .find_match("abc*/", 0, comment, MatchPolicy::Longest)
            .is_some_and(|m| m.len == 3));
    }

    #[test]
    fn test_parse_state_prefix() {
        assert_eq!(parse_state_prefix("<STR>[^\"]+"), Some(("STR", "[^\"]+")));
        assert_eq!(parse_state_prefix("<>x"), None);
        assert_eq!(parse_state_prefix("<a-b>x"), None);
        assert_eq!(parse_state_prefix("abc"), None);
    }

    #[test]
    fn test_unknown_state_in_mask() {
        let err = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::literal("x", "x", TokenKind::Identifier).within(&["NOPE"]))
            .build()
            .unwrap_err();
        assert_eq!(err, TableError::UnknownState("NOPE".into()));
    }

    #[test]
    fn test_unknown_push_target() {
        let err = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::literal("q", "\"", TokenKind::String).push("STRING"))
            .build()
            .unwrap_err();
        assert_eq!(err, TableError::UnknownState("STRING".into()));
    }

    #[test]
    fn test_invalid_regex() {
        let err = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::regex("broken", "[a-", TokenKind::Identifier))
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::InvalidPattern { ref rule, .. } if rule == "broken"));
    }

    #[test]
    fn test_empty_literal() {
        let err = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::literal("nothing", "", TokenKind::Punctuator))
            .build()
            .unwrap_err();
        assert_eq!(err, TableError::EmptyLiteral("nothing".into()));
    }

    #[test]
    fn test_too_many_states() {
        let mut builder = RuleTable::builder("S0");
        for i in 1..=MAX_STATES {
            builder = builder.state(&format!("S{i}"));
        }
        assert_eq!(
            builder.build().unwrap_err(),
            TableError::TooManyStates { max: MAX_STATES }
        );
    }

    #[test]
    fn test_scan_pattern() {
        fn digits(rest: &str) -> Option<usize> {
            let n = rest.bytes().take_while(u8::is_ascii_digit).count();
            (n > 0).then_some(n)
        }
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::scan("digits", digits, TokenKind::Number))
            .build()
            .unwrap();
        assert_eq!(winner(&table, "4096 "), Some(("digits".into(), 4)));
        assert_eq!(table.rules()[0].pattern.to_string(), "<scan>");
    }

    #[test]
    fn test_balanced_state_flag() {
        let table = RuleTable::builder("DEFAULT")
            .state("TEMPLATE")
            .balanced_state("INTERPOLATION")
            .build()
            .unwrap();
        assert!(!table.is_balanced(table.state_id("TEMPLATE").unwrap()));
        assert!(table.is_balanced(table.state_id("INTERPOLATION").unwrap()));
        assert_eq!(&**table.state_name(StateId::INITIAL), "DEFAULT");
    }

    #[test]
    fn test_pattern_display() {
        let table = RuleTable::builder("DEFAULT")
            .rule(RuleSpec::literal("arrow", "=>", TokenKind::Punctuator))
            .rule(RuleSpec::regex("num", "[0-9]+", TokenKind::Number))
            .build()
            .unwrap();
        assert_eq!(table.rules()[0].pattern.to_string(), "\"=>\"");
        assert_eq!(table.rules()[1].pattern.to_string(), r"/\A(?:[0-9]+)/");
    }
}
