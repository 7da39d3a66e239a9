//! Real registry wrapper that mirrors [`ModelWorld`]'s interface.
//!
//! [`ModelWorld`]: crate::ModelWorld

use prr_core::{InteractiveKind, Network, NetworkConfig, NetworkError, NetworkSnapshot};

use crate::model::{ObservableState, Operation, OperationResult, client_key, terminal_key};

/// A [`Network`] driven by [`Operation`]s.
#[derive(Debug)]
pub struct NetworkWorld {
    network: Network,
    num_clients: usize,
}

impl NetworkWorld {
    /// Create a network with clients `C0..C{num_clients - 1}` and no
    /// terminals.
    ///
    /// # Errors
    ///
    /// Returns the registry error if a client cannot be registered.
    pub fn new(num_clients: usize, config: NetworkConfig) -> Result<Self, NetworkError> {
        let num_clients = num_clients.max(1);
        let mut network = Network::new(config);
        for index in 0..num_clients {
            let key = client_key(index);
            network.register_client(&key, &format!("Client {index}"), 500_000_000 + index as u64)?;
        }

        Ok(Self { network, num_clients })
    }

    /// The wrapped registry.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let net = &mut self.network;
        match *op {
            Operation::RegisterTerminal { terminal, client, fancy } => {
                let kind = if fancy { "FANCY" } else { "BASIC" };
                let client = client_key(usize::from(client) % self.num_clients);
                net.register_terminal(kind, &terminal_key(terminal), &client).map(|_| ()).into()
            },
            Operation::AddFriend { terminal, friend } => {
                net.add_friend(&terminal_key(terminal), &terminal_key(friend)).into()
            },
            Operation::RemoveFriend { terminal, friend } => {
                net.remove_friend(&terminal_key(terminal), &terminal_key(friend)).into()
            },
            Operation::TurnOff { terminal } => net.turn_off(&terminal_key(terminal)).into(),
            Operation::SetIdle { terminal } => net.set_idle(&terminal_key(terminal)).into(),
            Operation::SetBusy { terminal } => net.set_busy(&terminal_key(terminal)).into(),
            Operation::SetSilent { terminal } => net.set_silent(&terminal_key(terminal)).into(),
            Operation::StartCall { origin, destination, video } => {
                let kind = if video { InteractiveKind::Video } else { InteractiveKind::Voice };
                net.start_interactive_communication(
                    &terminal_key(origin),
                    &terminal_key(destination),
                    kind,
                )
                .into()
            },
            Operation::SendText { origin, destination, len } => net
                .send_text_communication(
                    &terminal_key(origin),
                    &terminal_key(destination),
                    &Operation::message(len),
                )
                .into(),
            Operation::EndCall { terminal, duration } => {
                net.end_interactive_communication(&terminal_key(terminal), u64::from(duration))
                    .into()
            },
            Operation::Pay { terminal, communication } => net
                .pay_communication(&terminal_key(terminal), Operation::communication_id(communication))
                .into(),
        }
    }

    /// Snapshot of the registry.
    pub fn snapshot(&self) -> NetworkSnapshot {
        self.network.snapshot()
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState::from(&self.snapshot())
    }
}
