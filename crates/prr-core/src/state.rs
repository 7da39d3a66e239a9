//! Terminal operating states.
//!
//! A terminal is always in exactly one [`TerminalState`]. The state is a plain
//! tag: every rule that depends on it is a pure function of the tag, the
//! terminal's ongoing-communication role and the configured [`EndPolicy`].
//! The terminal feeds these functions its own fields and applies the result,
//! so states never hold a reference back to their terminal.
//!
//! # Legality table
//!
//! ```text
//! state   │ can start │ can end current          │ interactive │ text
//! ────────┼───────────┼──────────────────────────┼─────────────┼────────
//! OFF     │ no        │ no                       │ TargetOff   │ TargetOff
//! IDLE    │ yes       │ no                       │ accept→BUSY │ accept
//! BUSY    │ no        │ originator (see policy)  │ TargetBusy  │ accept
//! SILENCE │ no        │ no                       │ TargetSilent│ accept
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Terminal operating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerminalState {
    /// Switched off: refuses everything
    Off,
    /// Available for any communication
    #[default]
    Idle,
    /// Occupied by an interactive communication (or marked busy)
    Busy,
    /// Takes text only
    Silent,
}

/// Who may end an ongoing interactive communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndPolicy {
    /// Only the terminal that started the communication
    #[default]
    OriginatorOnly,
    /// Either participant
    AnyParticipant,
}

/// Side a terminal plays in a communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Started the communication and pays for it
    Origin,
    /// Received the communication
    Destination,
}

/// Kind of incoming communication offered to a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoming {
    /// Voice or video: occupies the terminal
    Interactive,
    /// Fire-and-forget text
    Text,
}

/// Why a terminal refused an incoming communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// Terminal is off
    Off,
    /// Terminal is busy
    Busy,
    /// Terminal is silent
    Silent,
}

impl Refusal {
    /// Convert into the matching target-unavailable error for `terminal`.
    pub fn into_error(self, terminal: &str) -> NetworkError {
        let terminal = terminal.to_string();
        match self {
            Self::Off => NetworkError::TargetOff(terminal),
            Self::Busy => NetworkError::TargetBusy(terminal),
            Self::Silent => NetworkError::TargetSilent(terminal),
        }
    }
}

/// Result of offering an incoming communication to a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reception {
    /// Communication accepted; terminal moves to `next`
    Accept {
        /// State after acceptance
        next: TerminalState,
    },
    /// Communication refused
    Refuse(Refusal),
}

/// Explicit state change requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCommand {
    /// Move to [`TerminalState::Off`]
    TurnOff,
    /// Move to [`TerminalState::Idle`]
    SetIdle,
    /// Move to [`TerminalState::Busy`]
    SetBusy,
    /// Move to [`TerminalState::Silent`]
    SetSilent,
}

impl StateCommand {
    /// State this command moves to.
    pub fn target(self) -> TerminalState {
        match self {
            Self::TurnOff => TerminalState::Off,
            Self::SetIdle => TerminalState::Idle,
            Self::SetBusy => TerminalState::Busy,
            Self::SetSilent => TerminalState::Silent,
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Self::TurnOff => "turn off",
            Self::SetIdle => "set idle",
            Self::SetBusy => "set busy",
            Self::SetSilent => "set silent",
        }
    }
}

impl TerminalState {
    /// Upper-case state name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Idle => "IDLE",
            Self::Busy => "BUSY",
            Self::Silent => "SILENCE",
        }
    }

    /// Whether a terminal in this state may start a new communication.
    pub fn can_start_communication(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether a terminal in this state, holding an ongoing communication in
    /// `role`, may end it.
    pub fn can_end_current_communication(self, role: Option<Role>, policy: EndPolicy) -> bool {
        match (self, role) {
            (Self::Busy, Some(Role::Origin)) => true,
            (Self::Busy, Some(Role::Destination)) => policy == EndPolicy::AnyParticipant,
            _ => false,
        }
    }

    /// Decide whether an incoming communication is accepted.
    pub fn receive(self, incoming: Incoming) -> Reception {
        match (self, incoming) {
            (Self::Off, _) => Reception::Refuse(Refusal::Off),
            (Self::Idle, Incoming::Interactive) => Reception::Accept { next: Self::Busy },
            (Self::Busy, Incoming::Interactive) => Reception::Refuse(Refusal::Busy),
            (Self::Silent, Incoming::Interactive) => Reception::Refuse(Refusal::Silent),
            (state, Incoming::Text) => Reception::Accept { next: state },
        }
    }

    /// Apply an explicit state command.
    ///
    /// Returns the next state. A command targeting the current state is a
    /// no-op and returns `self`.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidState` if the terminal holds an ongoing
    ///   communication and the command would take it out of BUSY
    pub fn apply(self, command: StateCommand, has_ongoing: bool) -> Result<Self, NetworkError> {
        let next = command.target();
        if next == self {
            return Ok(self);
        }

        if has_ongoing {
            debug_assert_eq!(self, Self::Busy);
            return Err(NetworkError::invalid_state(self, command.operation()));
        }

        Ok(next)
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TerminalState; 4] =
        [TerminalState::Off, TerminalState::Idle, TerminalState::Busy, TerminalState::Silent];

    #[test]
    fn only_idle_can_start() {
        for state in ALL {
            assert_eq!(state.can_start_communication(), state == TerminalState::Idle);
        }
    }

    #[test]
    fn only_busy_originator_can_end() {
        let policy = EndPolicy::OriginatorOnly;
        for state in ALL {
            let expected = state == TerminalState::Busy;
            assert_eq!(state.can_end_current_communication(Some(Role::Origin), policy), expected);
            assert!(!state.can_end_current_communication(Some(Role::Destination), policy));
            assert!(!state.can_end_current_communication(None, policy));
        }
    }

    #[test]
    fn any_participant_policy_lets_destination_end() {
        let policy = EndPolicy::AnyParticipant;
        assert!(TerminalState::Busy.can_end_current_communication(Some(Role::Destination), policy));
        assert!(!TerminalState::Busy.can_end_current_communication(None, policy));
        assert!(!TerminalState::Idle.can_end_current_communication(Some(Role::Origin), policy));
    }

    #[test]
    fn reception_table() {
        use Incoming::{Interactive, Text};

        assert_eq!(TerminalState::Off.receive(Interactive), Reception::Refuse(Refusal::Off));
        assert_eq!(TerminalState::Off.receive(Text), Reception::Refuse(Refusal::Off));

        assert_eq!(
            TerminalState::Idle.receive(Interactive),
            Reception::Accept { next: TerminalState::Busy }
        );
        assert_eq!(TerminalState::Idle.receive(Text), Reception::Accept {
            next: TerminalState::Idle
        });

        assert_eq!(TerminalState::Busy.receive(Interactive), Reception::Refuse(Refusal::Busy));
        assert_eq!(TerminalState::Busy.receive(Text), Reception::Accept {
            next: TerminalState::Busy
        });

        assert_eq!(TerminalState::Silent.receive(Interactive), Reception::Refuse(Refusal::Silent));
        assert_eq!(TerminalState::Silent.receive(Text), Reception::Accept {
            next: TerminalState::Silent
        });
    }

    #[test]
    fn same_state_command_is_noop() {
        assert_eq!(TerminalState::Idle.apply(StateCommand::SetIdle, false), Ok(TerminalState::Idle));
        assert_eq!(TerminalState::Busy.apply(StateCommand::SetBusy, true), Ok(TerminalState::Busy));
    }

    #[test]
    fn cannot_leave_busy_with_ongoing() {
        for command in [StateCommand::TurnOff, StateCommand::SetIdle, StateCommand::SetSilent] {
            let result = TerminalState::Busy.apply(command, true);
            assert!(matches!(result, Err(NetworkError::InvalidState { .. })));
        }

        assert_eq!(TerminalState::Busy.apply(StateCommand::SetIdle, false), Ok(TerminalState::Idle));
    }

    #[test]
    fn state_names() {
        let names: Vec<_> = ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["OFF", "IDLE", "BUSY", "SILENCE"]);
    }
}
