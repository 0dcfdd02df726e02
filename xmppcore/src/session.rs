use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Connection lifecycle of a client session.
///
/// ```text
/// Closed ──connect──▶ Connecting ──online──▶ Online
///   ▲                     │                    │
///   └──────failed─────────┘◀──────closed───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Online,
    #[default]
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Connecting => "connecting",
            SessionState::Online => "online",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Closed, Connecting) | (Connecting, Online) | (Connecting, Closed) | (Online, Closed)
        )
    }

    /// Validates and applies a transition, returning the previous state.
    pub fn transition(&mut self, next: SessionState) -> Result<SessionState, SessionError> {
        if !self.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        Ok(std::mem::replace(self, next))
    }

    pub fn is_online(self) -> bool {
        self == SessionState::Online
    }
}
