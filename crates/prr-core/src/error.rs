//! Error types for the network core.
//!
//! One enum covers every refusal the registry and terminals can produce.
//! Target-unavailability errors are kept apart from generic invalid-state
//! errors so callers can report a distinct reason for each refusal.
//!
//! Every error is returned before any mutation happens: an `Err` always means
//! the network is exactly as it was before the call.

use thiserror::Error;

use crate::{communication::CommunicationId, state::TerminalState};

/// Errors that can occur while operating on the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Malformed key, self-friending, unknown terminal type, bad payment
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A client with this key is already registered
    #[error("duplicate client key: {0}")]
    DuplicateClientKey(String),

    /// A terminal with this key is already registered
    #[error("duplicate terminal key: {0}")]
    DuplicateTerminalKey(String),

    /// No client with this key exists
    #[error("unknown client key: {0}")]
    UnknownClientKey(String),

    /// No terminal with this key exists
    #[error("unknown terminal key: {0}")]
    UnknownTerminalKey(String),

    /// No communication with this id exists
    #[error("unknown communication: {0}")]
    UnknownCommunication(CommunicationId),

    /// Communication id already recorded on this terminal
    #[error("communication {id} already registered on terminal {terminal}")]
    DuplicateCommunication {
        /// Terminal that already holds the id
        terminal: String,
        /// Offending communication id
        id: CommunicationId,
    },

    /// Operation is illegal in the terminal's current state
    #[error("invalid state transition: cannot {operation} from {state}")]
    InvalidState {
        /// State of the terminal when the operation was attempted
        state: TerminalState,
        /// Operation that was attempted
        operation: String,
    },

    /// Destination terminal is switched off
    #[error("destination terminal {0} is off")]
    TargetOff(String),

    /// Destination terminal is already in an interactive communication
    #[error("destination terminal {0} is busy")]
    TargetBusy(String),

    /// Destination terminal does not accept interactive communications
    #[error("destination terminal {0} is silent")]
    TargetSilent(String),

    /// Origin terminal cannot produce this kind of communication
    #[error("terminal {terminal} does not support {kind} communications")]
    UnsupportedAtOrigin {
        /// Origin terminal key
        terminal: String,
        /// Communication kind name
        kind: &'static str,
    },

    /// Destination terminal cannot take this kind of communication
    #[error("destination terminal {terminal} does not support {kind} communications")]
    UnsupportedAtDestination {
        /// Destination terminal key
        terminal: String,
        /// Communication kind name
        kind: &'static str,
    },

    /// A thread panicked while holding the shared network lock
    #[error("network lock poisoned")]
    LockPoisoned,
}

impl NetworkError {
    /// Returns true if the destination refused the communication because of
    /// its current state.
    ///
    /// These refusals are transient: the same call may succeed once the
    /// destination changes state.
    pub fn is_target_unavailable(&self) -> bool {
        matches!(self, Self::TargetOff(_) | Self::TargetBusy(_) | Self::TargetSilent(_))
    }

    /// Returns true if the error names a client, terminal or communication
    /// that does not exist.
    pub fn is_unknown_key(&self) -> bool {
        matches!(
            self,
            Self::UnknownClientKey(_) | Self::UnknownTerminalKey(_) | Self::UnknownCommunication(_)
        )
    }

    pub(crate) fn invalid_state(state: TerminalState, operation: &str) -> Self {
        Self::InvalidState { state, operation: operation.to_string() }
    }
}
