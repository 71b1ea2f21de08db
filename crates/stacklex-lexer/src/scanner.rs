use std::sync::Arc;

use tracing::{debug, trace};

use crate::balancer::Balancer;
use crate::location::{self, Location};
use crate::rule::{MatchPolicy, RuleTable, StateId, Transition};
use crate::state::{StateStack, StateUnderflow};
use crate::token::{KindSet, Token, TokenKind};
use crate::{ErrorKind, SyntaxError};

/// Per-session scan configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerOptions {
    /// Kinds consumed internally and hidden from the token stream.
    pub skip: KindSet,
    pub policy: MatchPolicy,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            skip: KindSet::TRIVIA,
            policy: MatchPolicy::Longest,
        }
    }
}

/// What an observer asks of the lexer after seeing a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    /// Stop the token iterator until [`Lexer::resume`] is called.
    Pause,
}

/// Read-only view of a lexer session, handed to observers.
pub struct ScanView<'a> {
    source: &'a str,
    table: &'a RuleTable,
    loc: &'a Location,
    states: &'a StateStack,
    balancer_depth: usize,
}

impl<'a> ScanView<'a> {
    /// Location just past the last produced token.
    pub fn location(&self) -> &'a Location {
        self.loc
    }

    pub fn offset(&self) -> usize {
        self.loc.offset
    }

    pub fn top_state(&self) -> &'a str {
        self.table.state_name(self.states.top())
    }

    pub fn state_depth(&self) -> usize {
        self.states.depth()
    }

    /// Open brackets in the innermost balanced state.
    pub fn balancer_depth(&self) -> usize {
        self.balancer_depth
    }

    pub fn current_line(&self) -> &'a str {
        location::line_at(self.source, self.loc.offset)
    }
}

/// Hook invoked after every token the lexer hands to its consumer.
pub trait ScanObserver {
    fn on_token(&mut self, view: &ScanView<'_>, token: &Token) -> Signal;
}

impl<F> ScanObserver for F
where
    F: FnMut(&ScanView<'_>, &Token) -> Signal,
{
    fn on_token(&mut self, view: &ScanView<'_>, token: &Token) -> Signal {
        self(view, token)
    }
}

/// A lexer session over one source buffer.
///
/// Tokens are pulled one at a time with [`next_token`](Lexer::next_token) or
/// through the `Iterator` impl. The rule table decides what matches in which
/// state; the session owns the cursor, the state stack and one bracket
/// balancer per open balanced state.
///
/// Any error ends the session: later calls return the same error.
pub struct Lexer<'a> {
    source: &'a str,
    table: Arc<RuleTable>,
    options: LexerOptions,
    loc: Location,
    states: StateStack,
    balancers: Vec<Balancer>,
    observer: Option<Box<dyn ScanObserver + 'a>>,
    paused: bool,
    finished: bool,
    failure: Option<SyntaxError>,
}

impl<'a> Lexer<'a> {
    /// Create a session for `source`; `name` labels locations in diagnostics.
    pub fn new(source: &'a str, name: impl Into<Arc<str>>, table: Arc<RuleTable>) -> Self {
        Self::with_options(source, name, table, LexerOptions::default())
    }

    pub fn with_options(
        source: &'a str,
        name: impl Into<Arc<str>>,
        table: Arc<RuleTable>,
        options: LexerOptions,
    ) -> Self {
        let loc = Location::start(name);
        Self {
            source,
            table,
            options,
            states: StateStack::new(StateId::INITIAL, loc.clone()),
            loc,
            balancers: Vec::new(),
            observer: None,
            paused: false,
            finished: false,
            failure: None,
        }
    }

    /// Tokenize the whole source into a vector of visible tokens.
    pub fn tokenize(
        source: &str,
        name: impl Into<Arc<str>>,
        table: Arc<RuleTable>,
    ) -> Result<Vec<Token>, SyntaxError> {
        let mut lexer = Lexer::new(source, name, table);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    pub fn options(&self) -> LexerOptions {
        self.options
    }

    pub fn set_skip(&mut self, skip: KindSet) {
        self.options.skip = skip;
    }

    pub fn set_policy(&mut self, policy: MatchPolicy) {
        self.options.policy = policy;
    }

    pub fn set_observer(&mut self, observer: impl ScanObserver + 'a) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn table(&self) -> &Arc<RuleTable> {
        &self.table
    }

    /// Location of the next unscanned byte.
    pub fn location(&self) -> &Location {
        &self.loc
    }

    pub fn offset(&self) -> usize {
        self.loc.offset
    }

    pub fn top_state(&self) -> &str {
        self.table.state_name(self.states.top())
    }

    pub fn top_state_id(&self) -> StateId {
        self.states.top()
    }

    /// Number of states pushed above the initial state.
    pub fn state_depth(&self) -> usize {
        self.states.depth()
    }

    pub fn balancer_depth(&self) -> usize {
        self.balancers.last().map_or(0, Balancer::depth)
    }

    /// The text of the line containing the cursor.
    pub fn current_line(&self) -> &'a str {
        location::line_at(self.source, self.loc.offset)
    }

    /// True once end of input has been reached without error.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn view(&self) -> ScanView<'_> {
        ScanView {
            source: self.source,
            table: &self.table,
            loc: &self.loc,
            states: &self.states,
            balancer_depth: self.balancer_depth(),
        }
    }

    /// Enter `state` on behalf of an external driver.
    pub fn push_state(&mut self, state: &str) -> Result<(), SyntaxError> {
        let id = self.table.state_id(state).ok_or_else(|| {
            SyntaxError::new(
                ErrorKind::UnknownState,
                self.loc.clone(),
                format!("the rule table has no state `{state}`"),
            )
        })?;
        self.enter(id, self.loc.clone());
        Ok(())
    }

    /// Leave the innermost state on behalf of an external driver.
    pub fn pop_state(&mut self) -> Result<Arc<str>, SyntaxError> {
        let id = self.leave()?;
        Ok(Arc::clone(self.table.state_name(id)))
    }

    /// Produce the next visible token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        loop {
            let token = match self.step() {
                Ok(Some(token)) => token,
                Ok(None) => return Ok(None),
                Err(err) => {
                    debug!(error = %err, "scan session failed");
                    self.failure = Some(err.clone());
                    return Err(err);
                }
            };
            if self.options.skip.contains(token.kind) {
                continue;
            }
            self.notify(&token);
            return Ok(Some(token));
        }
    }

    /// The token [`next_token`](Lexer::next_token) would return, without
    /// consuming it. Location, state stack and balancers are left untouched
    /// and the observer is not called.
    ///
    /// An error found while peeking does not end the session; the next call
    /// to `next_token` reports it.
    pub fn peek(&mut self) -> Result<Option<Token>, SyntaxError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let saved = (
            self.loc.clone(),
            self.states.clone(),
            self.balancers.clone(),
            self.finished,
        );
        let peeked = loop {
            match self.step() {
                Ok(Some(token)) if self.options.skip.contains(token.kind) => continue,
                other => break other,
            }
        };
        (self.loc, self.states, self.balancers, self.finished) = saved;
        peeked
    }

    /// One scan step: match, advance, transition. Skip kinds are returned too.
    fn step(&mut self) -> Result<Option<Token>, SyntaxError> {
        let source = self.source;
        let offset = self.loc.offset;

        if offset >= source.len() {
            if self.states.depth() > 0 {
                return Err(self.unterminated());
            }
            if !self.finished {
                self.finished = true;
                debug!(source = %self.loc.source, bytes = offset, "end of input");
            }
            return Ok(None);
        }

        let state = self.states.top();
        let Some(found) = self
            .table
            .find_match(source, offset, state, self.options.policy)
        else {
            return Err(self.no_match(state));
        };

        let lexeme = &source[offset..offset + found.len];
        let rule = self.table.rule(found.rule);
        if rule.unterminated {
            return Err(SyntaxError::new(
                ErrorKind::UnterminatedConstruct,
                self.loc.clone(),
                format!("unterminated {}", rule.name),
            ));
        }
        let mut kind = self.table.classify(rule, lexeme);
        let mut transition = rule.transition;

        let start = self.loc.clone();
        if kind == TokenKind::Punctuator
            && self.table.is_balanced(state)
            && self.balance(lexeme, &start)?
        {
            kind = TokenKind::InterpolationEnd;
            transition = Transition::Pop;
        }

        self.loc = start.advance(lexeme);
        let token = Token {
            kind,
            rule: found.rule,
            lexeme: lexeme.to_string(),
            byte_length: found.len,
            loc: start,
            state: Arc::clone(self.table.state_name(state)),
        };
        trace!(kind = %token.kind, lexeme, state = %token.state, at = %token.loc, "token");

        self.apply(transition, &token.loc)?;
        Ok(Some(token))
    }

    /// Feed a punctuator to the active balancer. Returns true when it is the
    /// `}` that ends the balanced state.
    fn balance(&mut self, lexeme: &str, at: &Location) -> Result<bool, SyntaxError> {
        let mut chars = lexeme.chars();
        let (Some(bracket), None) = (chars.next(), chars.next()) else {
            return Ok(false);
        };
        let Some(balancer) = self.balancers.last_mut() else {
            return Ok(false);
        };

        if Balancer::is_opener(bracket) {
            balancer.open(bracket, at.clone());
            return Ok(false);
        }
        if !Balancer::is_closer(bracket) {
            return Ok(false);
        }
        if bracket == '}' && balancer.depth() == 0 {
            return Ok(true);
        }

        balancer.close(bracket).map(|()| false).map_err(|mismatch| {
            match mismatch.open {
                Some((open, opened_at)) => SyntaxError::new(
                    ErrorKind::BalancerMismatch,
                    opened_at,
                    format!("unclosed `{open}`: found `{}` at {at}", mismatch.found),
                ),
                None => SyntaxError::new(
                    ErrorKind::BalancerMismatch,
                    at.clone(),
                    format!("`{}` has no matching opener", mismatch.found),
                ),
            }
        })
    }

    fn apply(&mut self, transition: Transition, at: &Location) -> Result<(), SyntaxError> {
        match transition {
            Transition::None => Ok(()),
            Transition::Push(state) => {
                self.enter(state, at.clone());
                Ok(())
            }
            Transition::Pop => self.leave().map(|_| ()),
        }
    }

    fn enter(&mut self, state: StateId, at: Location) {
        self.states.push(state, at);
        if self.table.is_balanced(state) {
            self.balancers.push(Balancer::new());
        }
        trace!(state = %self.table.state_name(state), depth = self.states.depth(), "push state");
    }

    fn leave(&mut self) -> Result<StateId, SyntaxError> {
        let state = self.states.pop().map_err(|StateUnderflow| {
            SyntaxError::new(
                ErrorKind::StateUnderflow,
                self.loc.clone(),
                format!(
                    "cannot pop `{}`: it is the bottom state",
                    self.table.state_name(self.states.top())
                ),
            )
        })?;
        if self.table.is_balanced(state) {
            self.balancers.pop();
        }
        trace!(state = %self.table.state_name(state), depth = self.states.depth(), "pop state");
        Ok(state)
    }

    fn unterminated(&self) -> SyntaxError {
        let state = self.states.top();
        let name = self.table.state_name(state);
        if self.table.is_balanced(state) {
            if let Some((open, at)) = self.balancers.last().and_then(Balancer::innermost) {
                return SyntaxError::new(
                    ErrorKind::UnterminatedConstruct,
                    at.clone(),
                    format!("unclosed `{open}` in {name} at end of input"),
                );
            }
        }
        SyntaxError::new(
            ErrorKind::UnterminatedConstruct,
            self.states.opened_at().clone(),
            format!("unterminated {name} at end of input"),
        )
    }

    fn no_match(&self, state: StateId) -> SyntaxError {
        let found = self.source[self.loc.offset..]
            .chars()
            .next()
            .unwrap_or_default();
        SyntaxError::new(
            ErrorKind::NoRuleMatched,
            self.loc.clone(),
            format!(
                "unexpected {found:?} in state {}",
                self.table.state_name(state)
            ),
        )
    }

    fn notify(&mut self, token: &Token) {
        let Some(mut observer) = self.observer.take() else {
            return;
        };
        let signal = observer.on_token(&self.view(), token);
        self.observer = Some(observer);
        if signal == Signal::Pause {
            self.paused = true;
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.paused || self.failure.is_some() {
            return None;
        }
        self.next_token().transpose()
    }
}
