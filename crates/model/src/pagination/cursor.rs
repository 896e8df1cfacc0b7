use serde::{Deserialize, Serialize};

/// Continuation token for a vendor listing. Each vendor uses exactly one
/// variant besides `Initial`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub enum PageCursor {
    /// First request, no continuation yet.
    #[default]
    Initial,

    /// Opaque server-issued cursor string (`next_cursor`).
    Token(String),

    /// Row offset computed client-side (`LIMIT .. OFFSET ..`).
    Offset { offset: usize },

    /// Numeric `start` value returned by the server as `next`.
    Start { start: u64 },
}

impl PageCursor {
    /// A continuation that would restart or stall the listing is no
    /// continuation at all.
    pub fn is_terminal(&self) -> bool {
        match self {
            PageCursor::Initial => true,
            PageCursor::Token(token) => token.is_empty(),
            PageCursor::Offset { .. } => false,
            PageCursor::Start { start } => *start == 0,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            PageCursor::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            PageCursor::Offset { offset } => *offset,
            _ => 0,
        }
    }

    pub fn start(&self) -> u64 {
        match self {
            PageCursor::Start { start } => *start,
            _ => 0,
        }
    }
}
