//! Operations for model-based testing.
//!
//! Operations represent every command a caller can issue against the
//! network. They are generated randomly (proptest or a seeded
//! [`arbitrary::Unstructured`]) and applied to both the model and the real
//! registry.

use arbitrary::Arbitrary;
use prr_core::NetworkError;

/// Terminal slot. Mapped onto a small fixed key space so operations collide
/// often enough to be interesting.
pub type TerminalSlot = u8;

/// Client slot, taken modulo the number of clients.
pub type ClientSlot = u8;

/// Number of distinct terminal keys operations can address.
pub const TERMINAL_SLOTS: u8 = 12;

/// Terminal key for a slot: `9100NN`.
pub fn terminal_key(slot: TerminalSlot) -> String {
    format!("9100{:02}", slot % TERMINAL_SLOTS)
}

/// Client key for a client index.
pub fn client_key(index: usize) -> String {
    format!("C{index}")
}

/// Operations that can be applied to the network.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Register a terminal for a client.
    RegisterTerminal {
        /// Terminal to register
        terminal: TerminalSlot,
        /// Owning client
        client: ClientSlot,
        /// FANCY when true, BASIC otherwise
        fancy: bool,
    },

    /// Add a friend.
    AddFriend {
        /// Terminal whose friend set changes
        terminal: TerminalSlot,
        /// Friend to add
        friend: TerminalSlot,
    },

    /// Remove a friend.
    RemoveFriend {
        /// Terminal whose friend set changes
        terminal: TerminalSlot,
        /// Friend to remove
        friend: TerminalSlot,
    },

    /// Switch a terminal off.
    TurnOff {
        /// Target terminal
        terminal: TerminalSlot,
    },

    /// Make a terminal idle.
    SetIdle {
        /// Target terminal
        terminal: TerminalSlot,
    },

    /// Mark a terminal busy.
    SetBusy {
        /// Target terminal
        terminal: TerminalSlot,
    },

    /// Make a terminal silent.
    SetSilent {
        /// Target terminal
        terminal: TerminalSlot,
    },

    /// Start a voice or video call.
    StartCall {
        /// Caller
        origin: TerminalSlot,
        /// Callee
        destination: TerminalSlot,
        /// Video when true, voice otherwise
        video: bool,
    },

    /// Send a text message.
    SendText {
        /// Sender
        origin: TerminalSlot,
        /// Recipient
        destination: TerminalSlot,
        /// Message length hint, taken modulo 32
        len: u8,
    },

    /// End the call a terminal takes part in.
    EndCall {
        /// Terminal issuing the end
        terminal: TerminalSlot,
        /// Reported duration in units
        duration: u8,
    },

    /// Pay for a communication.
    Pay {
        /// Paying terminal
        terminal: TerminalSlot,
        /// Communication index, mapped to an id in `1..=32`
        communication: u8,
    },
}

impl Operation {
    /// Text body for a [`Operation::SendText`] length hint.
    pub fn message(len: u8) -> String {
        "x".repeat(usize::from(len % 32))
    }

    /// Communication id for a [`Operation::Pay`] index.
    pub fn communication_id(index: u8) -> u64 {
        u64::from(index % 32) + 1
    }
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded with nothing to report.
    Ok,

    /// Operation succeeded and produced an id or an amount.
    Value(u64),

    /// Operation failed.
    Error(OperationError),
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        !self.is_err()
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl<T> From<Result<T, NetworkError>> for OperationResult
where
    T: Into<Outcome>,
{
    fn from(result: Result<T, NetworkError>) -> Self {
        match result.map(Into::into) {
            Ok(Outcome::Unit) => Self::Ok,
            Ok(Outcome::Value(value)) => Self::Value(value),
            Err(error) => Self::Error(OperationError::from(&error)),
        }
    }
}

/// Success payload of a real network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No payload
    Unit,
    /// Id or amount
    Value(u64),
}

impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl From<u64> for Outcome {
    fn from(value: u64) -> Self {
        Self::Value(value)
    }
}

/// Error classes compared between model and real network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Bad argument: self-reference, duplicate friend, bad payment.
    InvalidArgument,
    /// Key already registered.
    Duplicate,
    /// Client or terminal does not exist.
    UnknownKey,
    /// Communication id does not exist.
    UnknownCommunication,
    /// Illegal in the terminal's current state.
    InvalidState,
    /// Destination is off.
    TargetOff,
    /// Destination is busy.
    TargetBusy,
    /// Destination is silent.
    TargetSilent,
    /// Origin cannot do video.
    UnsupportedAtOrigin,
    /// Destination cannot do video.
    UnsupportedAtDestination,
    /// Anything else; never expected.
    Other,
}

impl From<&NetworkError> for OperationError {
    fn from(error: &NetworkError) -> Self {
        match error {
            NetworkError::InvalidArgument(_) => Self::InvalidArgument,
            NetworkError::DuplicateClientKey(_) | NetworkError::DuplicateTerminalKey(_) => {
                Self::Duplicate
            },
            NetworkError::UnknownClientKey(_) | NetworkError::UnknownTerminalKey(_) => {
                Self::UnknownKey
            },
            NetworkError::UnknownCommunication(_) => Self::UnknownCommunication,
            NetworkError::InvalidState { .. } => Self::InvalidState,
            NetworkError::TargetOff(_) => Self::TargetOff,
            NetworkError::TargetBusy(_) => Self::TargetBusy,
            NetworkError::TargetSilent(_) => Self::TargetSilent,
            NetworkError::UnsupportedAtOrigin { .. } => Self::UnsupportedAtOrigin,
            NetworkError::UnsupportedAtDestination { .. } => Self::UnsupportedAtDestination,
            NetworkError::DuplicateCommunication { .. } | NetworkError::LockPoisoned => {
                Self::Other
            },
        }
    }
}
