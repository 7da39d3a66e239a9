//! Terminal: a single addressable endpoint.
//!
//! The terminal stores only the state tag. Every legality decision is made by
//! the pure functions on [`TerminalState`], fed with this terminal's ongoing
//! role and end policy. Each mutating method validates everything first and
//! only then touches fields, so an `Err` leaves the terminal untouched.
//!
//! # Ongoing slot
//!
//! `ongoing` is set while the terminal takes part in an interactive
//! communication. It is only ever set together with a transition to BUSY and
//! cleared together with a transition to IDLE.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    communication::{Communication, CommunicationId, CommunicationKind},
    error::NetworkError,
    key::{ClientKey, TerminalKey},
    price_table::{Amount, PriceTable},
    state::{EndPolicy, Incoming, Reception, Role, StateCommand, TerminalState},
};

/// Terminal hardware kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminalKind {
    /// Voice and text only
    Basic,
    /// Voice, video and text
    Fancy,
}

impl TerminalKind {
    /// Upper-case type name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "BASIC",
            Self::Fancy => "FANCY",
        }
    }

    /// Whether a terminal of this kind can take part in `kind`.
    pub fn supports(self, kind: &CommunicationKind) -> bool {
        !matches!(kind, CommunicationKind::Video) || self == Self::Fancy
    }
}

impl FromStr for TerminalKind {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BASIC" => Ok(Self::Basic),
            "FANCY" => Ok(Self::Fancy),
            other => Err(NetworkError::InvalidArgument(format!("unknown terminal type: {other:?}"))),
        }
    }
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The interactive communication a terminal is currently part of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ongoing {
    /// Communication id
    pub id: CommunicationId,
    /// Side this terminal plays
    pub role: Role,
}

/// A terminal owned by exactly one client.
#[derive(Debug, Clone)]
pub struct Terminal {
    key: TerminalKey,
    kind: TerminalKind,
    client: ClientKey,
    state: TerminalState,
    end_policy: EndPolicy,
    friends: BTreeSet<TerminalKey>,
    /// Communications this terminal originated
    made: BTreeSet<CommunicationId>,
    /// Communications this terminal received
    received: BTreeSet<CommunicationId>,
    ongoing: Option<Ongoing>,
    active: bool,
    total_paid: Amount,
    debt: Amount,
}

impl Terminal {
    /// Create an idle terminal with no history.
    pub fn new(key: TerminalKey, kind: TerminalKind, client: ClientKey, end_policy: EndPolicy) -> Self {
        Self {
            key,
            kind,
            client,
            state: TerminalState::Idle,
            end_policy,
            friends: BTreeSet::new(),
            made: BTreeSet::new(),
            received: BTreeSet::new(),
            ongoing: None,
            active: false,
            total_paid: 0,
            debt: 0,
        }
    }

    /// Unique terminal key.
    pub fn key(&self) -> &TerminalKey {
        &self.key
    }

    /// Hardware kind.
    pub fn kind(&self) -> TerminalKind {
        self.kind
    }

    /// Upper-case type name ("BASIC" or "FANCY").
    pub fn type_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Key of the owning client.
    pub fn client_key(&self) -> &ClientKey {
        &self.client
    }

    /// Current state.
    pub fn state(&self) -> TerminalState {
        self.state
    }

    /// Upper-case name of the current state.
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Sum of all payments made.
    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }

    /// Outstanding debt.
    pub fn debt(&self) -> Amount {
        self.debt
    }

    /// Payments minus debt.
    pub fn balance(&self) -> i128 {
        i128::from(self.total_paid) - i128::from(self.debt)
    }

    /// Friend keys in key order.
    pub fn friend_keys(&self) -> impl Iterator<Item = &TerminalKey> + '_ {
        self.friends.iter()
    }

    /// Whether `key` is in this terminal's friend set.
    pub fn is_friend(&self, key: &str) -> bool {
        self.friends.contains(key)
    }

    /// Whether the terminal ever took part in a communication.
    pub fn has_activity(&self) -> bool {
        self.active
    }

    /// Whether an interactive communication currently occupies the terminal.
    pub fn has_ongoing_communication(&self) -> bool {
        self.ongoing.is_some()
    }

    /// Current interactive communication, if any.
    pub fn ongoing(&self) -> Option<Ongoing> {
        self.ongoing
    }

    /// Ids of communications this terminal originated, ascending.
    pub fn made_communications(&self) -> impl Iterator<Item = CommunicationId> + '_ {
        self.made.iter().copied()
    }

    /// Ids of communications this terminal received, ascending.
    pub fn received_communications(&self) -> impl Iterator<Item = CommunicationId> + '_ {
        self.received.iter().copied()
    }

    /// Whether the terminal may start a new communication.
    pub fn can_start_communication(&self) -> bool {
        self.state.can_start_communication()
    }

    /// Whether the terminal may end its current interactive communication.
    ///
    /// Under [`EndPolicy::OriginatorOnly`] this is true only for the
    /// terminal that started it.
    pub fn can_end_current_communication(&self) -> bool {
        self.state.can_end_current_communication(self.ongoing.map(|o| o.role), self.end_policy)
    }

    /// Switch the terminal off.
    pub fn turn_off(&mut self) -> Result<(), NetworkError> {
        self.apply(StateCommand::TurnOff)
    }

    /// Make the terminal idle.
    pub fn set_idle(&mut self) -> Result<(), NetworkError> {
        self.apply(StateCommand::SetIdle)
    }

    /// Mark the terminal busy.
    pub fn set_busy(&mut self) -> Result<(), NetworkError> {
        self.apply(StateCommand::SetBusy)
    }

    /// Make the terminal silent.
    pub fn set_silent(&mut self) -> Result<(), NetworkError> {
        self.apply(StateCommand::SetSilent)
    }

    /// Apply an explicit state command.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidState` when leaving BUSY with an ongoing
    ///   communication
    pub fn apply(&mut self, command: StateCommand) -> Result<(), NetworkError> {
        let next = self.state.apply(command, self.has_ongoing_communication())?;
        self.transition(next);
        Ok(())
    }

    /// Check whether an incoming communication would be accepted, without
    /// changing anything.
    ///
    /// # Errors
    ///
    /// - `NetworkError::TargetOff`, `TargetBusy` or `TargetSilent` depending
    ///   on the current state
    pub fn check_reception(&self, incoming: Incoming) -> Result<TerminalState, NetworkError> {
        match self.state.receive(incoming) {
            Reception::Accept { next } => Ok(next),
            Reception::Refuse(refusal) => Err(refusal.into_error(self.key.as_str())),
        }
    }

    /// Record a communication id in this terminal's history.
    ///
    /// # Errors
    ///
    /// - `NetworkError::DuplicateCommunication` if the id is already recorded
    pub fn register_communication(
        &mut self,
        id: CommunicationId,
        role: Role,
    ) -> Result<(), NetworkError> {
        self.check_unregistered(id)?;
        self.record(id, role);
        Ok(())
    }

    /// Start an interactive communication as its originator.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidState` if the terminal cannot start
    /// - `NetworkError::InvalidArgument` if `communication` is not an ongoing
    ///   interactive communication originating here
    /// - `NetworkError::DuplicateCommunication` if its id is already recorded
    pub fn start_interactive_communication(
        &mut self,
        communication: &Communication,
    ) -> Result<(), NetworkError> {
        if !self.can_start_communication() {
            return Err(NetworkError::invalid_state(self.state, "start communication"));
        }
        self.check_interactive(communication, Role::Origin)?;
        self.check_unregistered(communication.id())?;

        self.record(communication.id(), Role::Origin);
        self.ongoing = Some(Ongoing { id: communication.id(), role: Role::Origin });
        self.transition(TerminalState::Busy);
        Ok(())
    }

    /// Accept an interactive communication as its destination.
    ///
    /// # Errors
    ///
    /// - `NetworkError::TargetOff`, `TargetBusy` or `TargetSilent` if the
    ///   current state refuses it
    /// - `NetworkError::InvalidArgument` if `communication` is not an ongoing
    ///   interactive communication addressed here
    /// - `NetworkError::DuplicateCommunication` if its id is already recorded
    pub fn receive_interactive_communication(
        &mut self,
        communication: &Communication,
    ) -> Result<(), NetworkError> {
        let next = self.check_reception(Incoming::Interactive)?;
        self.check_interactive(communication, Role::Destination)?;
        self.check_unregistered(communication.id())?;

        self.record(communication.id(), Role::Destination);
        self.ongoing = Some(Ongoing { id: communication.id(), role: Role::Destination });
        self.transition(next);
        Ok(())
    }

    /// Send a priced text communication. Its cost becomes debt.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if `communication` is not a finished
    ///   text communication originating here, or its cost would overflow the
    ///   account
    /// - `NetworkError::DuplicateCommunication` if its id is already recorded
    pub fn send_text_communication(
        &mut self,
        communication: &Communication,
    ) -> Result<(), NetworkError> {
        self.check_text(communication, Role::Origin)?;
        self.check_unregistered(communication.id())?;

        let debt = self.checked_charge(communication.cost())?;

        self.record(communication.id(), Role::Origin);
        self.debt = debt;
        Ok(())
    }

    /// Receive a text communication. No state transition happens.
    ///
    /// # Errors
    ///
    /// - `NetworkError::TargetOff` if the terminal is off
    /// - `NetworkError::InvalidArgument` if `communication` is not a text
    ///   communication addressed here
    /// - `NetworkError::DuplicateCommunication` if its id is already recorded
    pub fn receive_text_communication(
        &mut self,
        communication: &Communication,
    ) -> Result<(), NetworkError> {
        let next = self.check_reception(Incoming::Text)?;
        debug_assert_eq!(next, self.state);
        self.check_text(communication, Role::Destination)?;
        self.check_unregistered(communication.id())?;

        self.record(communication.id(), Role::Destination);
        Ok(())
    }

    /// End the ongoing interactive communication and charge this terminal.
    ///
    /// Prices `communication` for `duration` units with `prices`, adds the
    /// cost to debt, clears the ongoing slot and returns to IDLE. Returns the
    /// cost.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidState` if the terminal cannot end
    /// - `NetworkError::InvalidArgument` if `communication` is not the one
    ///   this terminal originated and is currently part of, or its cost would
    ///   overflow the account
    pub fn end_ongoing_communication(
        &mut self,
        communication: &mut Communication,
        duration: u64,
        prices: &dyn PriceTable,
        friends: bool,
    ) -> Result<Amount, NetworkError> {
        if !self.can_end_current_communication() {
            return Err(NetworkError::invalid_state(self.state, "end communication"));
        }
        let is_current = self.ongoing.is_some_and(|o| o.id == communication.id());
        if !is_current || communication.origin() != &self.key {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {} is not the one originated by {}",
                communication.id(),
                self.key
            )));
        }

        let mut finished = communication.clone();
        let cost = finished.finish(duration, prices, friends)?;
        let debt = self.checked_charge(cost)?;

        *communication = finished;
        self.debt = debt;
        self.ongoing = None;
        self.transition(TerminalState::Idle);
        Ok(cost)
    }

    /// Leave the interactive communication `id` without being charged.
    ///
    /// Used on the non-paying side when the communication ends.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if `id` is not the ongoing
    ///   communication
    pub fn release_ongoing_communication(&mut self, id: CommunicationId) -> Result<(), NetworkError> {
        if !self.ongoing.is_some_and(|o| o.id == id) {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {id} is not ongoing on {}",
                self.key
            )));
        }

        self.ongoing = None;
        self.transition(TerminalState::Idle);
        Ok(())
    }

    /// Move `amount` from debt to payments. The payment total saturates at
    /// `Amount::MAX`.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if `amount` exceeds the debt
    pub fn pay(&mut self, amount: Amount) -> Result<(), NetworkError> {
        if amount > self.debt {
            return Err(NetworkError::InvalidArgument(format!(
                "payment of {amount} exceeds debt {} on {}",
                self.debt, self.key
            )));
        }

        self.debt -= amount;
        self.total_paid = self.total_paid.saturating_add(amount);
        Ok(())
    }

    /// Add `friend` to the friend set. The relation is one-directional.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if `friend` is this terminal or
    ///   already a friend
    pub fn add_friend(&mut self, friend: &TerminalKey) -> Result<(), NetworkError> {
        if friend == &self.key {
            return Err(NetworkError::InvalidArgument(format!(
                "terminal {} cannot befriend itself",
                self.key
            )));
        }
        if self.friends.contains(friend) {
            return Err(NetworkError::InvalidArgument(format!(
                "{friend} is already a friend of {}",
                self.key
            )));
        }

        self.friends.insert(friend.clone());
        Ok(())
    }

    /// Remove `friend` from the friend set.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if `friend` is not a friend
    pub fn remove_friend(&mut self, friend: &str) -> Result<(), NetworkError> {
        if !self.friends.remove(friend) {
            return Err(NetworkError::InvalidArgument(format!(
                "{friend} is not a friend of {}",
                self.key
            )));
        }
        Ok(())
    }

    /// Debt after charging `cost`.
    fn checked_charge(&self, cost: Amount) -> Result<Amount, NetworkError> {
        self.debt.checked_add(cost).ok_or_else(|| {
            NetworkError::InvalidArgument(format!(
                "charging {cost} would overflow the debt of {}",
                self.key
            ))
        })
    }

    fn check_unregistered(&self, id: CommunicationId) -> Result<(), NetworkError> {
        if self.made.contains(&id) || self.received.contains(&id) {
            return Err(NetworkError::DuplicateCommunication { terminal: self.key.to_string(), id });
        }
        Ok(())
    }

    fn check_endpoint(&self, communication: &Communication, role: Role) -> Result<(), NetworkError> {
        let endpoint = match role {
            Role::Origin => communication.origin(),
            Role::Destination => communication.destination(),
        };
        if endpoint != &self.key {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {} does not involve {} as {role:?}",
                communication.id(),
                self.key
            )));
        }
        Ok(())
    }

    fn check_interactive(
        &self,
        communication: &Communication,
        role: Role,
    ) -> Result<(), NetworkError> {
        self.check_endpoint(communication, role)?;
        if !communication.kind().is_interactive() || !communication.is_ongoing() {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {} is not an ongoing interactive communication",
                communication.id()
            )));
        }
        Ok(())
    }

    fn check_text(&self, communication: &Communication, role: Role) -> Result<(), NetworkError> {
        self.check_endpoint(communication, role)?;
        if communication.kind().is_interactive() {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {} is not a text communication",
                communication.id()
            )));
        }
        if role == Role::Origin && communication.is_ongoing() {
            return Err(NetworkError::InvalidArgument(format!(
                "text communication {} must be priced before sending",
                communication.id()
            )));
        }
        Ok(())
    }

    fn record(&mut self, id: CommunicationId, role: Role) {
        match role {
            Role::Origin => self.made.insert(id),
            Role::Destination => self.received.insert(id),
        };
        self.active = true;
    }

    fn transition(&mut self, next: TerminalState) {
        if next != self.state {
            tracing::debug!(terminal = %self.key, from = %self.state, to = %next, "state transition");
            self.state = next;
        }
        debug_assert!(self.ongoing.is_none() || self.state == TerminalState::Busy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{communication::InteractiveKind, price_table::FlatPriceTable};

    fn key(k: &str) -> TerminalKey {
        TerminalKey::parse(k).unwrap()
    }

    fn terminal(k: &str) -> Terminal {
        Terminal::new(
            key(k),
            TerminalKind::Basic,
            ClientKey::parse("c1").unwrap(),
            EndPolicy::OriginatorOnly,
        )
    }

    fn voice(id: CommunicationId, from: &str, to: &str) -> Communication {
        Communication::interactive(id, key(from), key(to), InteractiveKind::Voice)
    }

    fn priced_text(id: CommunicationId, from: &str, to: &str, message: &str) -> Communication {
        let mut comm = Communication::text(id, key(from), key(to), message.to_string());
        let size = comm.size();
        comm.finish(size, &FlatPriceTable::default(), false).unwrap();
        comm
    }

    #[test]
    fn new_terminal_is_idle_and_inactive() {
        let t = terminal("910000");
        assert_eq!(t.state(), TerminalState::Idle);
        assert_eq!(t.state_name(), "IDLE");
        assert_eq!(t.type_name(), "BASIC");
        assert!(!t.has_activity());
        assert!(!t.has_ongoing_communication());
        assert_eq!(t.debt(), 0);
        assert_eq!(t.total_paid(), 0);
    }

    #[test]
    fn start_then_end_charges_originator() {
        let prices = FlatPriceTable::default();
        let mut origin = terminal("910000");
        let mut comm = voice(1, "910000", "910001");

        origin.start_interactive_communication(&comm).unwrap();
        assert_eq!(origin.state(), TerminalState::Busy);
        assert!(origin.can_end_current_communication());
        assert!(origin.has_activity());
        assert_eq!(origin.ongoing(), Some(Ongoing { id: 1, role: Role::Origin }));

        let cost = origin.end_ongoing_communication(&mut comm, 4, &prices, false).unwrap();
        assert_eq!(cost, 80);
        assert_eq!(origin.debt(), 80);
        assert_eq!(origin.state(), TerminalState::Idle);
        assert!(!origin.has_ongoing_communication());
    }

    #[test]
    fn destination_cannot_end_by_default() {
        let mut destination = terminal("910001");
        let comm = voice(1, "910000", "910001");

        destination.receive_interactive_communication(&comm).unwrap();
        assert_eq!(destination.state(), TerminalState::Busy);
        assert!(!destination.can_end_current_communication());
        assert!(destination.has_activity());
    }

    #[test]
    fn destination_can_end_under_any_participant_policy() {
        let mut destination = Terminal::new(
            key("910001"),
            TerminalKind::Basic,
            ClientKey::parse("c1").unwrap(),
            EndPolicy::AnyParticipant,
        );
        destination.receive_interactive_communication(&voice(1, "910000", "910001")).unwrap();
        assert!(destination.can_end_current_communication());
    }

    #[test]
    fn start_from_non_idle_fails_without_mutation() {
        for command in [StateCommand::TurnOff, StateCommand::SetBusy, StateCommand::SetSilent] {
            let mut t = terminal("910000");
            t.apply(command).unwrap();

            let result = t.start_interactive_communication(&voice(1, "910000", "910001"));
            assert!(matches!(result, Err(NetworkError::InvalidState { .. })));
            assert!(!t.has_activity());
            assert!(!t.has_ongoing_communication());
            assert_eq!(t.made_communications().count(), 0);
        }
    }

    #[test]
    fn receive_interactive_refusals() {
        let comm = voice(1, "910000", "910001");

        let mut off = terminal("910001");
        off.turn_off().unwrap();
        assert_eq!(
            off.receive_interactive_communication(&comm),
            Err(NetworkError::TargetOff("910001".to_string()))
        );

        let mut busy = terminal("910001");
        busy.set_busy().unwrap();
        assert_eq!(
            busy.receive_interactive_communication(&comm),
            Err(NetworkError::TargetBusy("910001".to_string()))
        );

        let mut silent = terminal("910001");
        silent.set_silent().unwrap();
        assert_eq!(
            silent.receive_interactive_communication(&comm),
            Err(NetworkError::TargetSilent("910001".to_string()))
        );
    }

    #[test]
    fn text_reception_only_refused_when_off() {
        let comm = priced_text(1, "910000", "910001", "hello");

        for command in [StateCommand::SetIdle, StateCommand::SetBusy, StateCommand::SetSilent] {
            let mut t = terminal("910001");
            t.apply(command).unwrap();
            let before = t.state();

            t.receive_text_communication(&comm).unwrap();
            assert_eq!(t.state(), before);
            assert_eq!(t.received_communications().collect::<Vec<_>>(), vec![1]);
        }

        let mut off = terminal("910001");
        off.turn_off().unwrap();
        assert_eq!(
            off.receive_text_communication(&comm),
            Err(NetworkError::TargetOff("910001".to_string()))
        );
    }

    #[test]
    fn send_text_adds_cost_to_debt() {
        let mut t = terminal("910000");
        let comm = priced_text(3, "910000", "910001", "hello");

        t.send_text_communication(&comm).unwrap();
        assert_eq!(t.debt(), 5);
        assert_eq!(t.state(), TerminalState::Idle);
        assert!(t.has_activity());
    }

    #[test]
    fn unpriced_text_is_rejected() {
        let mut t = terminal("910000");
        let comm = Communication::text(3, key("910000"), key("910001"), "hello".to_string());
        assert!(matches!(t.send_text_communication(&comm), Err(NetworkError::InvalidArgument(_))));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut t = terminal("910000");
        t.register_communication(7, Role::Origin).unwrap();
        assert_eq!(
            t.register_communication(7, Role::Destination),
            Err(NetworkError::DuplicateCommunication { terminal: "910000".to_string(), id: 7 })
        );
    }

    #[test]
    fn cannot_leave_busy_while_in_call() {
        let mut t = terminal("910000");
        t.start_interactive_communication(&voice(1, "910000", "910001")).unwrap();

        assert!(t.turn_off().is_err());
        assert!(t.set_idle().is_err());
        assert!(t.set_silent().is_err());
        assert!(t.set_busy().is_ok());
        assert_eq!(t.state(), TerminalState::Busy);
    }

    #[test]
    fn set_idle_on_idle_is_noop() {
        let mut t = terminal("910000");
        t.send_text_communication(&priced_text(1, "910000", "910001", "abc")).unwrap();
        let debt = t.debt();

        t.set_idle().unwrap();
        assert_eq!(t.state(), TerminalState::Idle);
        assert_eq!(t.debt(), debt);
        assert_eq!(t.total_paid(), 0);
    }

    #[test]
    fn end_wrong_communication_fails() {
        let prices = FlatPriceTable::default();
        let mut t = terminal("910000");
        t.start_interactive_communication(&voice(1, "910000", "910001")).unwrap();

        let mut other = voice(2, "910000", "910001");
        assert!(matches!(
            t.end_ongoing_communication(&mut other, 1, &prices, false),
            Err(NetworkError::InvalidArgument(_))
        ));
        assert!(t.has_ongoing_communication());
        assert!(other.is_ongoing());
    }

    #[test]
    fn overflowing_end_leaves_call_untouched() {
        let prices = FlatPriceTable::default();
        let mut t = terminal("910000");
        let mut first = voice(1, "910000", "910001");
        t.start_interactive_communication(&first).unwrap();
        assert_eq!(t.end_ongoing_communication(&mut first, u64::MAX, &prices, false), Ok(u64::MAX));

        let mut second = voice(2, "910000", "910001");
        t.start_interactive_communication(&second).unwrap();
        assert!(matches!(
            t.end_ongoing_communication(&mut second, 1, &prices, false),
            Err(NetworkError::InvalidArgument(_))
        ));

        assert!(second.is_ongoing());
        assert_eq!(second.cost(), 0);
        assert_eq!(t.state(), TerminalState::Busy);
        assert_eq!(t.ongoing(), Some(Ongoing { id: 2, role: Role::Origin }));
        assert_eq!(t.debt(), u64::MAX);
    }

    #[test]
    fn release_clears_slot() {
        let mut t = terminal("910001");
        t.receive_interactive_communication(&voice(1, "910000", "910001")).unwrap();

        assert!(t.release_ongoing_communication(2).is_err());
        t.release_ongoing_communication(1).unwrap();
        assert_eq!(t.state(), TerminalState::Idle);
        assert_eq!(t.debt(), 0);
    }

    #[test]
    fn pay_moves_debt_to_paid() {
        let mut t = terminal("910000");
        t.send_text_communication(&priced_text(1, "910000", "910001", "abcdef")).unwrap();

        assert!(t.pay(7).is_err());
        t.pay(6).unwrap();
        assert_eq!(t.debt(), 0);
        assert_eq!(t.total_paid(), 6);
        assert_eq!(t.balance(), 6);
    }

    #[test]
    fn friends_are_irreflexive_and_unique() {
        let mut t = terminal("910000");

        assert!(t.add_friend(&key("910000")).is_err());
        t.add_friend(&key("910002")).unwrap();
        assert!(t.add_friend(&key("910002")).is_err());
        t.add_friend(&key("910001")).unwrap();

        let friends: Vec<&str> = t.friend_keys().map(TerminalKey::as_str).collect();
        assert_eq!(friends, vec!["910001", "910002"]);

        t.remove_friend("910002").unwrap();
        assert!(t.remove_friend("910002").is_err());
        assert!(!t.is_friend("910002"));
    }

    #[test]
    fn kind_parsing_and_support() {
        assert_eq!("BASIC".parse::<TerminalKind>(), Ok(TerminalKind::Basic));
        assert_eq!("FANCY".parse::<TerminalKind>(), Ok(TerminalKind::Fancy));
        assert!("basic".parse::<TerminalKind>().is_err());

        assert!(!TerminalKind::Basic.supports(&CommunicationKind::Video));
        assert!(TerminalKind::Basic.supports(&CommunicationKind::Voice));
        assert!(TerminalKind::Fancy.supports(&CommunicationKind::Video));
    }
}
