//! Bracket balancing for interpolation-like states.
//!
//! One balancer exists per entered balanced state. It records every open
//! `{`, `[` and `(` so that a `}` at depth zero can be told apart from the
//! closing brace of a nested block or object literal.

use crate::location::Location;

/// A closing bracket that does not match the innermost opener.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub found: char,
    /// The unmatched opener and where it was opened, if any bracket was open.
    pub open: Option<(char, Location)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balancer {
    open: Vec<(char, Location)>,
}

impl Balancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_opener(c: char) -> bool {
        matches!(c, '{' | '[' | '(')
    }

    pub fn is_closer(c: char) -> bool {
        matches!(c, '}' | ']' | ')')
    }

    /// The closer that matches `open`.
    pub fn closer_for(open: char) -> Option<char> {
        match open {
            '{' => Some('}'),
            '[' => Some(']'),
            '(' => Some(')'),
            _ => None,
        }
    }

    pub fn open(&mut self, bracket: char, at: Location) {
        self.open.push((bracket, at));
    }

    pub fn close(&mut self, bracket: char) -> Result<(), Mismatch> {
        let matched = self
            .open
            .last()
            .is_some_and(|&(open, _)| Self::closer_for(open) == Some(bracket));
        if !matched {
            return Err(Mismatch {
                found: bracket,
                open: self.open.last().cloned(),
            });
        }
        self.open.pop();
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// The innermost unclosed bracket.
    pub fn innermost(&self) -> Option<&(char, Location)> {
        self.open.last()
    }
}
