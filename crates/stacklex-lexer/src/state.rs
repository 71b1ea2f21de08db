use crate::location::Location;
use crate::rule::StateId;

/// Attempted to pop the bottom state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("state stack underflow: the bottom state cannot be popped")]
pub struct StateUnderflow;

#[derive(Debug, Clone, PartialEq)]
struct Frame {
    state: StateId,
    opened_at: Location,
}

/// Stack of active lexer states. The innermost state governs which rules apply.
///
/// The bottom frame is a sentinel and is never popped, so the stack is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct StateStack {
    frames: Vec<Frame>,
}

impl StateStack {
    pub fn new(bottom: StateId, at: Location) -> Self {
        Self {
            frames: vec![Frame {
                state: bottom,
                opened_at: at,
            }],
        }
    }

    pub fn push(&mut self, state: StateId, at: Location) {
        self.frames.push(Frame {
            state,
            opened_at: at,
        });
    }

    pub fn pop(&mut self) -> Result<StateId, StateUnderflow> {
        if self.frames.len() == 1 {
            return Err(StateUnderflow);
        }
        self.frames.pop().map(|f| f.state).ok_or(StateUnderflow)
    }

    pub fn top(&self) -> StateId {
        self.innermost().state
    }

    /// Number of states pushed above the bottom state.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Where the innermost state was entered.
    pub fn opened_at(&self) -> &Location {
        &self.innermost().opened_at
    }

    /// States from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.frames.iter().map(|f| f.state)
    }

    fn innermost(&self) -> &Frame {
        self.frames.last().expect("state stack never empty")
    }
}
