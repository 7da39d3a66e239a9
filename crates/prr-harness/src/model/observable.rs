//! Observable state for oracle comparison.
//!
//! The subset of network state both the model and the real registry can
//! produce. Compared after every step of a model-based run.

use prr_core::{NetworkSnapshot, TerminalState};

/// One terminal, as both sides report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTerminal {
    /// Terminal key
    pub key: String,
    /// Owning client key
    pub client: String,
    /// Current state
    pub state: TerminalState,
    /// Outstanding debt
    pub debt: u64,
    /// Sum of payments
    pub paid: u64,
    /// Friend keys, sorted
    pub friends: Vec<String>,
    /// Ever took part in a communication
    pub active: bool,
    /// Call in progress
    pub ongoing: Option<u64>,
}

/// One communication, as both sides report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedCommunication {
    /// Communication id
    pub id: u64,
    /// Originating terminal key
    pub origin: String,
    /// Destination terminal key
    pub destination: String,
    /// Priced and closed
    pub finished: bool,
    /// Final cost
    pub cost: u64,
    /// Paid by the originator
    pub paid: bool,
}

/// Observable state, ordered by key and id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableState {
    /// Registered terminals in key order
    pub terminals: Vec<ObservedTerminal>,
    /// Communications in id order
    pub communications: Vec<ObservedCommunication>,
}

impl From<&NetworkSnapshot> for ObservableState {
    fn from(snapshot: &NetworkSnapshot) -> Self {
        let terminals = snapshot
            .terminals
            .iter()
            .map(|t| ObservedTerminal {
                key: t.key.clone(),
                client: t.client.clone(),
                state: t.state,
                debt: t.debt,
                paid: t.total_paid,
                friends: t.friends.clone(),
                active: t.active,
                ongoing: t.ongoing,
            })
            .collect();

        let communications = snapshot
            .communications
            .iter()
            .map(|c| ObservedCommunication {
                id: c.id,
                origin: c.origin.clone(),
                destination: c.destination.clone(),
                finished: c.status == "FINISHED",
                cost: c.cost,
                paid: c.paid,
            })
            .collect();

        Self { terminals, communications }
    }
}
