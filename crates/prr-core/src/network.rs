//! Network registry.
//!
//! The registry is the single owner of every client, terminal and
//! communication. Terminals never reach each other directly: every
//! cross-terminal operation resolves both ends here, validates the whole
//! operation, and only then mutates either side. An `Err` from any method
//! means nothing changed.
//!
//! All maps are ordered by key, so iteration (and everything built on it,
//! such as snapshots and reports) is deterministic.
//!
//! # Communication flow
//!
//! ```text
//! start_interactive_communication(origin, destination)
//!   ├─ resolve both terminals
//!   ├─ origin.can_start?                 else InvalidState
//!   ├─ kinds support the communication?  else Unsupported*
//!   ├─ destination state accepts?        else Target{Off,Busy,Silent}
//!   └─ allocate id, attach to both, both BUSY
//!
//! end_interactive_communication(terminal, duration)
//!   ├─ terminal.can_end?                 else InvalidState
//!   ├─ originator priced and charged, back to IDLE
//!   └─ peer released, back to IDLE
//! ```

use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    client::Client,
    communication::{Communication, CommunicationId, CommunicationKind, InteractiveKind},
    error::NetworkError,
    key::{ClientKey, TerminalKey},
    price_table::{Amount, FlatPriceTable, PriceTable},
    state::{EndPolicy, Incoming, StateCommand},
    terminal::{Terminal, TerminalKind},
};

/// Network configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Who may end an interactive communication
    pub end_policy: EndPolicy,
    /// Tariff given to clients registered without an explicit one
    pub default_price_table: FlatPriceTable,
}

/// Registry of clients, terminals and communications.
#[derive(Debug)]
pub struct Network {
    config: NetworkConfig,
    clients: BTreeMap<ClientKey, Client>,
    terminals: BTreeMap<TerminalKey, Terminal>,
    communications: BTreeMap<CommunicationId, Communication>,
    next_communication_id: CommunicationId,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

impl Network {
    /// Create an empty network.
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            clients: BTreeMap::new(),
            terminals: BTreeMap::new(),
            communications: BTreeMap::new(),
            next_communication_id: 1,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Register a client with the configured default price table.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the key is blank
    /// - `NetworkError::DuplicateClientKey` if the key is taken
    pub fn register_client(
        &mut self,
        key: &str,
        name: &str,
        tax_id: u64,
    ) -> Result<&Client, NetworkError> {
        let prices = Arc::new(self.config.default_price_table.clone());
        self.register_client_with_price_table(key, name, tax_id, prices)
    }

    /// Register a client with its own price table.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the key is blank
    /// - `NetworkError::DuplicateClientKey` if the key is taken
    pub fn register_client_with_price_table(
        &mut self,
        key: &str,
        name: &str,
        tax_id: u64,
        price_table: Arc<dyn PriceTable>,
    ) -> Result<&Client, NetworkError> {
        let key = ClientKey::parse(key)?;

        match self.clients.entry(key) {
            Entry::Occupied(entry) => Err(NetworkError::DuplicateClientKey(entry.key().to_string())),
            Entry::Vacant(entry) => {
                tracing::debug!(client = %entry.key(), "client registered");
                let client = Client::new(entry.key().clone(), name.to_string(), tax_id, price_table);
                Ok(entry.insert(client))
            },
        }
    }

    /// Register a terminal of type `terminal_type` ("BASIC" or "FANCY") for
    /// an existing client.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the key is malformed or the type
    ///   is unknown
    /// - `NetworkError::UnknownClientKey` if the client does not exist
    /// - `NetworkError::DuplicateTerminalKey` if the key is taken
    pub fn register_terminal(
        &mut self,
        terminal_type: &str,
        key: &str,
        client_key: &str,
    ) -> Result<&Terminal, NetworkError> {
        let key = TerminalKey::parse(key)?;
        let client = self
            .clients
            .get_mut(client_key)
            .ok_or_else(|| NetworkError::UnknownClientKey(client_key.to_string()))?;
        let kind: TerminalKind = terminal_type.parse()?;

        match self.terminals.entry(key) {
            Entry::Occupied(entry) => {
                Err(NetworkError::DuplicateTerminalKey(entry.key().to_string()))
            },
            Entry::Vacant(entry) => {
                tracing::debug!(terminal = %entry.key(), client = %client.key(), %kind, "terminal registered");
                client.add_terminal(entry.key().clone());
                let terminal = Terminal::new(
                    entry.key().clone(),
                    kind,
                    client.key().clone(),
                    self.config.end_policy,
                );
                Ok(entry.insert(terminal))
            },
        }
    }

    /// Look up a client.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownClientKey` if it does not exist
    pub fn client(&self, key: &str) -> Result<&Client, NetworkError> {
        self.clients.get(key).ok_or_else(|| NetworkError::UnknownClientKey(key.to_string()))
    }

    /// Look up a terminal.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownTerminalKey` if it does not exist
    pub fn terminal(&self, key: &str) -> Result<&Terminal, NetworkError> {
        self.terminals.get(key).ok_or_else(|| NetworkError::UnknownTerminalKey(key.to_string()))
    }

    /// Look up a communication.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownCommunication` if it does not exist
    pub fn communication(&self, id: CommunicationId) -> Result<&Communication, NetworkError> {
        self.communications.get(&id).ok_or(NetworkError::UnknownCommunication(id))
    }

    fn terminal_mut(&mut self, key: &str) -> Result<&mut Terminal, NetworkError> {
        self.terminals.get_mut(key).ok_or_else(|| NetworkError::UnknownTerminalKey(key.to_string()))
    }

    /// All clients in key order.
    pub fn clients(&self) -> impl Iterator<Item = &Client> + '_ {
        self.clients.values()
    }

    /// All terminals in key order.
    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals.values()
    }

    /// All communications in id order.
    pub fn communications(&self) -> impl Iterator<Item = &Communication> + '_ {
        self.communications.values()
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of registered terminals.
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// Add `friend_key` to the friends of `terminal_key`.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the keys are equal or they are
    ///   already friends
    /// - `NetworkError::UnknownTerminalKey` if either terminal does not exist
    pub fn add_friend(&mut self, terminal_key: &str, friend_key: &str) -> Result<(), NetworkError> {
        if terminal_key == friend_key {
            return Err(NetworkError::InvalidArgument(format!(
                "terminal {terminal_key} cannot befriend itself"
            )));
        }
        self.terminal(terminal_key)?;
        let friend = self.terminal(friend_key)?.key().clone();

        self.terminal_mut(terminal_key)?.add_friend(&friend)?;
        tracing::debug!(terminal = terminal_key, friend = friend_key, "friend added");
        Ok(())
    }

    /// Remove `friend_key` from the friends of `terminal_key`.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the keys are equal or they are
    ///   not friends
    /// - `NetworkError::UnknownTerminalKey` if either terminal does not exist
    pub fn remove_friend(&mut self, terminal_key: &str, friend_key: &str) -> Result<(), NetworkError> {
        if terminal_key == friend_key {
            return Err(NetworkError::InvalidArgument(format!(
                "terminal {terminal_key} cannot unfriend itself"
            )));
        }
        self.terminal(terminal_key)?;
        self.terminal(friend_key)?;

        self.terminal_mut(terminal_key)?.remove_friend(friend_key)?;
        tracing::debug!(terminal = terminal_key, friend = friend_key, "friend removed");
        Ok(())
    }

    /// Apply an explicit state command to a terminal.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownTerminalKey` if the terminal does not exist
    /// - `NetworkError::InvalidState` when leaving BUSY during a communication
    pub fn apply_state_command(
        &mut self,
        terminal_key: &str,
        command: StateCommand,
    ) -> Result<(), NetworkError> {
        self.terminal_mut(terminal_key)?.apply(command)
    }

    /// Switch a terminal off.
    pub fn turn_off(&mut self, terminal_key: &str) -> Result<(), NetworkError> {
        self.apply_state_command(terminal_key, StateCommand::TurnOff)
    }

    /// Make a terminal idle.
    pub fn set_idle(&mut self, terminal_key: &str) -> Result<(), NetworkError> {
        self.apply_state_command(terminal_key, StateCommand::SetIdle)
    }

    /// Mark a terminal busy.
    pub fn set_busy(&mut self, terminal_key: &str) -> Result<(), NetworkError> {
        self.apply_state_command(terminal_key, StateCommand::SetBusy)
    }

    /// Make a terminal silent.
    pub fn set_silent(&mut self, terminal_key: &str) -> Result<(), NetworkError> {
        self.apply_state_command(terminal_key, StateCommand::SetSilent)
    }

    /// Validate a communication from `origin` to `destination` without
    /// changing anything. Returns both validated keys.
    fn check_dispatch(
        &self,
        origin: &str,
        destination: &str,
        kind: &CommunicationKind,
    ) -> Result<(TerminalKey, TerminalKey), NetworkError> {
        if origin == destination {
            return Err(NetworkError::InvalidArgument(format!(
                "terminal {origin} cannot communicate with itself"
            )));
        }
        let from = self.terminal(origin)?;
        let to = self.terminal(destination)?;

        if !from.can_start_communication() {
            return Err(NetworkError::invalid_state(from.state(), "start communication"));
        }
        if !from.kind().supports(kind) {
            return Err(NetworkError::UnsupportedAtOrigin {
                terminal: origin.to_string(),
                kind: kind.name(),
            });
        }
        if !to.kind().supports(kind) {
            return Err(NetworkError::UnsupportedAtDestination {
                terminal: destination.to_string(),
                kind: kind.name(),
            });
        }

        let incoming = if kind.is_interactive() { Incoming::Interactive } else { Incoming::Text };
        to.check_reception(incoming)?;

        Ok((from.key().clone(), to.key().clone()))
    }

    fn price_table_of(&self, terminal: &Terminal) -> Result<Arc<dyn PriceTable>, NetworkError> {
        let client = self.client(terminal.client_key().as_str())?;
        Ok(client.shared_price_table())
    }

    /// Start an interactive communication. Both terminals become BUSY.
    ///
    /// Returns the new communication id.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if origin and destination are equal
    /// - `NetworkError::UnknownTerminalKey` if either terminal does not exist
    /// - `NetworkError::InvalidState` if the origin cannot start
    /// - `NetworkError::UnsupportedAtOrigin` / `UnsupportedAtDestination` for
    ///   video on a BASIC terminal
    /// - `NetworkError::TargetOff` / `TargetBusy` / `TargetSilent` if the
    ///   destination refuses
    pub fn start_interactive_communication(
        &mut self,
        origin: &str,
        destination: &str,
        kind: InteractiveKind,
    ) -> Result<CommunicationId, NetworkError> {
        let (from, to) = self.check_dispatch(origin, destination, &kind.into()).inspect_err(|error| {
            tracing::debug!(origin, destination, %error, "interactive communication refused");
        })?;

        let id = self.next_communication_id;
        let communication = Communication::interactive(id, from, to, kind);

        self.terminal_mut(origin)?.start_interactive_communication(&communication)?;
        self.terminal_mut(destination)?.receive_interactive_communication(&communication)?;
        self.communications.insert(id, communication);
        self.next_communication_id += 1;

        tracing::info!(id, origin, destination, ?kind, "interactive communication started");
        Ok(id)
    }

    /// Send a text communication. It is priced immediately with the origin
    /// client's table and charged to the origin.
    ///
    /// Returns the new communication id.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if origin and destination are equal
    /// - `NetworkError::UnknownTerminalKey` if either terminal does not exist
    /// - `NetworkError::InvalidState` if the origin cannot start
    /// - `NetworkError::TargetOff` if the destination is off
    pub fn send_text_communication(
        &mut self,
        origin: &str,
        destination: &str,
        message: &str,
    ) -> Result<CommunicationId, NetworkError> {
        let kind = CommunicationKind::Text { message: message.to_string() };
        let (from, to) = self.check_dispatch(origin, destination, &kind).inspect_err(|error| {
            tracing::debug!(origin, destination, %error, "text communication refused");
        })?;

        let sender = self.terminal(origin)?;
        let friends = sender.is_friend(destination);
        let prices = self.price_table_of(sender)?;

        let id = self.next_communication_id;
        let mut communication = Communication::text(id, from, to, message.to_string());
        let size = communication.size();
        let cost = communication.finish(size, prices.as_ref(), friends)?;

        self.terminal_mut(origin)?.send_text_communication(&communication)?;
        self.terminal_mut(destination)?.receive_text_communication(&communication)?;
        self.communications.insert(id, communication);
        self.next_communication_id += 1;

        tracing::info!(id, origin, destination, cost, "text communication sent");
        Ok(id)
    }

    /// End the interactive communication `terminal_key` is part of.
    ///
    /// The originator is charged and both sides return to IDLE in one step.
    /// Returns the cost.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownTerminalKey` if the terminal does not exist
    /// - `NetworkError::InvalidState` if the terminal cannot end (not busy,
    ///   no ongoing communication, or not the originator under
    ///   [`EndPolicy::OriginatorOnly`])
    pub fn end_interactive_communication(
        &mut self,
        terminal_key: &str,
        duration: u64,
    ) -> Result<Amount, NetworkError> {
        let caller = self.terminal(terminal_key)?;
        let ongoing = match caller.ongoing() {
            Some(ongoing) if caller.can_end_current_communication() => ongoing,
            _ => return Err(NetworkError::invalid_state(caller.state(), "end communication")),
        };

        let communication = self.communication(ongoing.id)?;
        let origin_key = communication.origin().clone();
        let destination_key = communication.destination().clone();

        let origin = self.terminal(origin_key.as_str())?;
        let friends = origin.is_friend(destination_key.as_str());
        let prices = self.price_table_of(origin)?;

        let peer_holds_it = self
            .terminal(destination_key.as_str())?
            .ongoing()
            .is_some_and(|o| o.id == ongoing.id);
        if !peer_holds_it {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {} is not ongoing on {destination_key}",
                ongoing.id
            )));
        }

        let communication = self
            .communications
            .get_mut(&ongoing.id)
            .ok_or(NetworkError::UnknownCommunication(ongoing.id))?;
        let origin = self
            .terminals
            .get_mut(origin_key.as_str())
            .ok_or_else(|| NetworkError::UnknownTerminalKey(origin_key.to_string()))?;
        let cost = origin.end_ongoing_communication(communication, duration, prices.as_ref(), friends)?;

        self.terminal_mut(destination_key.as_str())?.release_ongoing_communication(ongoing.id)?;

        tracing::info!(id = ongoing.id, ended_by = terminal_key, duration, cost, "interactive communication ended");
        Ok(cost)
    }

    /// Pay for a finished communication made by `terminal_key`.
    ///
    /// Returns the amount paid.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownTerminalKey` / `UnknownCommunication` if
    ///   either does not exist
    /// - `NetworkError::InvalidArgument` if the communication was not made by
    ///   this terminal, is still ongoing, or is already paid
    pub fn pay_communication(
        &mut self,
        terminal_key: &str,
        id: CommunicationId,
    ) -> Result<Amount, NetworkError> {
        self.terminal(terminal_key)?;
        let communication = self.communication(id)?;

        if communication.origin().as_str() != terminal_key {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {id} was not made by {terminal_key}"
            )));
        }
        if communication.is_ongoing() {
            return Err(NetworkError::InvalidArgument(format!("communication {id} is ongoing")));
        }
        if communication.is_paid() {
            return Err(NetworkError::InvalidArgument(format!("communication {id} is already paid")));
        }
        let cost = communication.cost();

        self.terminal_mut(terminal_key)?.pay(cost)?;
        if let Some(communication) = self.communications.get_mut(&id) {
            communication.mark_paid();
        }

        tracing::debug!(terminal = terminal_key, id, cost, "communication paid");
        Ok(cost)
    }

    /// Terminals that never took part in a communication, in key order.
    pub fn unused_terminals(&self) -> Vec<&Terminal> {
        self.terminals().filter(|t| !t.has_activity()).collect()
    }

    /// Terminals whose payments exceed their debt, in key order.
    pub fn terminals_with_positive_balance(&self) -> Vec<&Terminal> {
        self.terminals().filter(|t| t.balance() > 0).collect()
    }

    fn client_terminals(&self, client_key: &str) -> Result<Vec<&Terminal>, NetworkError> {
        let client = self.client(client_key)?;
        Ok(client.terminal_keys().filter_map(|k| self.terminals.get(k)).collect())
    }

    /// Sum of payments over a client's terminals, saturating at
    /// `Amount::MAX`.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownClientKey` if the client does not exist
    pub fn client_payments(&self, client_key: &str) -> Result<Amount, NetworkError> {
        let terminals = self.client_terminals(client_key)?;
        Ok(terminals.iter().map(|t| t.total_paid()).fold(0, Amount::saturating_add))
    }

    /// Sum of debts over a client's terminals, saturating at `Amount::MAX`.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownClientKey` if the client does not exist
    pub fn client_debts(&self, client_key: &str) -> Result<Amount, NetworkError> {
        let terminals = self.client_terminals(client_key)?;
        Ok(terminals.iter().map(|t| t.debt()).fold(0, Amount::saturating_add))
    }

    /// Sum of payments over every terminal, saturating at `Amount::MAX`.
    pub fn global_payments(&self) -> Amount {
        self.terminals().map(Terminal::total_paid).fold(0, Amount::saturating_add)
    }

    /// Sum of debts over every terminal, saturating at `Amount::MAX`.
    pub fn global_debts(&self) -> Amount {
        self.terminals().map(Terminal::debt).fold(0, Amount::saturating_add)
    }

    /// Communications made by a client's terminals, in id order.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownClientKey` if the client does not exist
    pub fn communications_made_by_client(
        &self,
        client_key: &str,
    ) -> Result<Vec<&Communication>, NetworkError> {
        let terminals = self.client_terminals(client_key)?;
        Ok(self.collect_communications(terminals.into_iter().flat_map(|t| t.made_communications())))
    }

    /// Communications received by a client's terminals, in id order.
    ///
    /// # Errors
    ///
    /// - `NetworkError::UnknownClientKey` if the client does not exist
    pub fn communications_received_by_client(
        &self,
        client_key: &str,
    ) -> Result<Vec<&Communication>, NetworkError> {
        let terminals = self.client_terminals(client_key)?;
        Ok(self.collect_communications(terminals.into_iter().flat_map(|t| t.received_communications())))
    }

    fn collect_communications(
        &self,
        ids: impl Iterator<Item = CommunicationId>,
    ) -> Vec<&Communication> {
        let mut ids: Vec<_> = ids.collect();
        ids.sort_unstable();
        ids.dedup();
        ids.iter().filter_map(|id| self.communications.get(id)).collect()
    }
}
