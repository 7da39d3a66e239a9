//! Read-only traversal and snapshots.
//!
//! A [`Visitor`] computes something from each terminal or client it is
//! handed without being able to change them. [`visit_all`] drives a visitor
//! over any collection of [`Visitable`] items, keeping those that satisfy a
//! predicate, in the collection's iteration order. Registry collections
//! iterate in key order, so the output order is deterministic.
//!
//! [`SnapshotVisitor`] is the visitor the rest of the workspace relies on: it
//! turns live entities into plain serializable records, which the
//! simulation harness checks invariants against and reports render from.

use serde::Serialize;

use crate::{
    client::Client,
    communication::{Communication, CommunicationId},
    network::Network,
    price_table::Amount,
    state::{Role, TerminalState},
    terminal::Terminal,
};

/// Computes an output from terminals and clients.
pub trait Visitor {
    /// Value produced per visited entity.
    type Output;

    /// Visit a terminal.
    fn visit_terminal(&mut self, terminal: &Terminal) -> Self::Output;

    /// Visit a client.
    fn visit_client(&mut self, client: &Client) -> Self::Output;
}

/// An entity a [`Visitor`] can be applied to.
pub trait Visitable {
    /// Dispatch to the matching `visit_*` method.
    fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output;
}

impl Visitable for Terminal {
    fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_terminal(self)
    }
}

impl Visitable for Client {
    fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_client(self)
    }
}

/// Apply `visitor` to every item of `collection` matching `predicate`.
///
/// Outputs are returned in iteration order.
pub fn visit_all<'a, T, V, P>(
    visitor: &mut V,
    collection: impl IntoIterator<Item = &'a T>,
    predicate: P,
) -> Vec<V::Output>
where
    T: Visitable + 'a,
    V: Visitor,
    P: Fn(&T) -> bool,
{
    collection.into_iter().filter(|item| predicate(item)).map(|item| item.accept(visitor)).collect()
}

/// Observable state of one terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalSnapshot {
    /// Terminal key
    pub key: String,
    /// "BASIC" or "FANCY"
    pub kind: &'static str,
    /// Owning client key
    pub client: String,
    /// Current state
    pub state: TerminalState,
    /// Sum of payments
    pub total_paid: Amount,
    /// Outstanding debt
    pub debt: Amount,
    /// Friend keys, sorted
    pub friends: Vec<String>,
    /// Whether the terminal ever took part in a communication
    pub active: bool,
    /// Id of the interactive communication in progress
    pub ongoing: Option<CommunicationId>,
    /// Role in the communication in progress
    pub ongoing_role: Option<Role>,
    /// Ids of communications made, ascending
    pub made: Vec<CommunicationId>,
    /// Ids of communications received, ascending
    pub received: Vec<CommunicationId>,
}

/// Observable state of one client, with totals over its terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSnapshot {
    /// Client key
    pub key: String,
    /// Display name
    pub name: String,
    /// Tax identifier
    pub tax_id: u64,
    /// Owned terminal keys, sorted
    pub terminals: Vec<String>,
    /// Sum of payments over owned terminals
    pub payments: Amount,
    /// Sum of debts over owned terminals
    pub debts: Amount,
}

/// Observable state of one communication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommunicationSnapshot {
    /// Communication id
    pub id: CommunicationId,
    /// Originating terminal key
    pub origin: String,
    /// Destination terminal key
    pub destination: String,
    /// "TEXT", "VOICE" or "VIDEO"
    pub kind: &'static str,
    /// "ONGOING" or "FINISHED"
    pub status: &'static str,
    /// Characters or duration units
    pub size: u64,
    /// Final cost, zero while ongoing
    pub cost: Amount,
    /// Whether it has been paid
    pub paid: bool,
}

impl From<&Communication> for CommunicationSnapshot {
    fn from(communication: &Communication) -> Self {
        Self {
            id: communication.id(),
            origin: communication.origin().to_string(),
            destination: communication.destination().to_string(),
            kind: communication.kind().name(),
            status: communication.status().name(),
            size: communication.size(),
            cost: communication.cost(),
            paid: communication.is_paid(),
        }
    }
}

/// Output of [`SnapshotVisitor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntitySnapshot {
    /// A visited terminal
    Terminal(TerminalSnapshot),
    /// A visited client
    Client(ClientSnapshot),
}

impl EntitySnapshot {
    /// The terminal snapshot, if this is one.
    pub fn into_terminal(self) -> Option<TerminalSnapshot> {
        match self {
            Self::Terminal(snapshot) => Some(snapshot),
            Self::Client(_) => None,
        }
    }

    /// The client snapshot, if this is one.
    pub fn into_client(self) -> Option<ClientSnapshot> {
        match self {
            Self::Client(snapshot) => Some(snapshot),
            Self::Terminal(_) => None,
        }
    }
}

/// Builds snapshots. Client totals are resolved through `network`.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotVisitor<'a> {
    network: &'a Network,
}

impl<'a> SnapshotVisitor<'a> {
    /// Visitor resolving client totals against `network`.
    pub fn new(network: &'a Network) -> Self {
        Self { network }
    }
}

impl Visitor for SnapshotVisitor<'_> {
    type Output = EntitySnapshot;

    fn visit_terminal(&mut self, terminal: &Terminal) -> EntitySnapshot {
        let ongoing = terminal.ongoing();
        EntitySnapshot::Terminal(TerminalSnapshot {
            key: terminal.key().to_string(),
            kind: terminal.type_name(),
            client: terminal.client_key().to_string(),
            state: terminal.state(),
            total_paid: terminal.total_paid(),
            debt: terminal.debt(),
            friends: terminal.friend_keys().map(ToString::to_string).collect(),
            active: terminal.has_activity(),
            ongoing: ongoing.map(|o| o.id),
            ongoing_role: ongoing.map(|o| o.role),
            made: terminal.made_communications().collect(),
            received: terminal.received_communications().collect(),
        })
    }

    fn visit_client(&mut self, client: &Client) -> EntitySnapshot {
        let owned: Vec<&Terminal> = client
            .terminal_keys()
            .filter_map(|k| self.network.terminal(k.as_str()).ok())
            .collect();
        EntitySnapshot::Client(ClientSnapshot {
            key: client.key().to_string(),
            name: client.name().to_string(),
            tax_id: client.tax_id(),
            terminals: client.terminal_keys().map(ToString::to_string).collect(),
            payments: owned.iter().map(|t| t.total_paid()).fold(0, Amount::saturating_add),
            debts: owned.iter().map(|t| t.debt()).fold(0, Amount::saturating_add),
        })
    }
}

/// Point-in-time copy of everything observable in a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkSnapshot {
    /// Clients in key order
    pub clients: Vec<ClientSnapshot>,
    /// Terminals in key order
    pub terminals: Vec<TerminalSnapshot>,
    /// Communications in id order
    pub communications: Vec<CommunicationSnapshot>,
}

impl NetworkSnapshot {
    /// Terminal with `key`, if present.
    pub fn terminal(&self, key: &str) -> Option<&TerminalSnapshot> {
        self.terminals.iter().find(|t| t.key == key)
    }

    /// Communication with `id`, if present.
    pub fn communication(&self, id: CommunicationId) -> Option<&CommunicationSnapshot> {
        self.communications.iter().find(|c| c.id == id)
    }

    /// Sum of payments over every terminal.
    pub fn global_payments(&self) -> Amount {
        self.terminals.iter().map(|t| t.total_paid).fold(0, Amount::saturating_add)
    }

    /// Sum of debts over every terminal.
    pub fn global_debts(&self) -> Amount {
        self.terminals.iter().map(|t| t.debt).fold(0, Amount::saturating_add)
    }
}

impl Network {
    /// Snapshot every client, terminal and communication.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let mut visitor = SnapshotVisitor::new(self);
        let clients = visit_all(&mut visitor, self.clients(), |_| true)
            .into_iter()
            .filter_map(EntitySnapshot::into_client)
            .collect();
        let terminals = visit_all(&mut visitor, self.terminals(), |_| true)
            .into_iter()
            .filter_map(EntitySnapshot::into_terminal)
            .collect();

        NetworkSnapshot {
            clients,
            terminals,
            communications: self.communications().map(CommunicationSnapshot::from).collect(),
        }
    }
}
