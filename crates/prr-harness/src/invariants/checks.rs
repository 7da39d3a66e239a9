//! Standard invariant checks.
//!
//! These invariants capture properties of the network that must hold after
//! every operation, whether it succeeded or was refused.

use std::collections::HashMap;

use prr_core::{
    CommunicationSnapshot, NetworkSnapshot, Role, TerminalSnapshot, TerminalState,
};

use super::{Invariant, InvariantResult};

fn terminals_by_key(state: &NetworkSnapshot) -> HashMap<&str, &TerminalSnapshot> {
    state.terminals.iter().map(|t| (t.key.as_str(), t)).collect()
}

fn communications_by_id(state: &NetworkSnapshot) -> HashMap<u64, &CommunicationSnapshot> {
    state.communications.iter().map(|c| (c.id, c)).collect()
}

/// A terminal holding a call is BUSY.
///
/// The ongoing id and role are set and cleared together, and only ever while
/// the terminal is BUSY. An ongoing slot on any other state means a
/// transition left the slot dangling.
pub struct OngoingImpliesBusy;

impl Invariant for OngoingImpliesBusy {
    fn name(&self) -> &'static str {
        "OngoingImpliesBusy"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        for t in &state.terminals {
            if t.ongoing.is_some() != t.ongoing_role.is_some() {
                return Err(self.violation(format!(
                    "terminal {}: ongoing {:?} with role {:?}",
                    t.key, t.ongoing, t.ongoing_role
                )));
            }
            if t.ongoing.is_some() && t.state != TerminalState::Busy {
                return Err(self.violation(format!(
                    "terminal {}: holds call {:?} while {}",
                    t.key, t.ongoing, t.state
                )));
            }
        }
        Ok(())
    }
}

/// Every ongoing communication is held by exactly its two endpoints.
///
/// Origin holds it as originator and destination as receiver; no terminal
/// holds a communication that is finished, unknown, or a text.
pub struct OngoingPairsConsistent;

impl Invariant for OngoingPairsConsistent {
    fn name(&self) -> &'static str {
        "OngoingPairsConsistent"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        let terminals = terminals_by_key(state);
        let communications = communications_by_id(state);

        for c in state.communications.iter().filter(|c| c.status == "ONGOING") {
            if c.kind == "TEXT" {
                return Err(self.violation(format!("text communication {} is ongoing", c.id)));
            }
            for (key, role) in [(&c.origin, Role::Origin), (&c.destination, Role::Destination)] {
                let held = terminals
                    .get(key.as_str())
                    .is_some_and(|t| t.ongoing == Some(c.id) && t.ongoing_role == Some(role));
                if !held {
                    return Err(self.violation(format!(
                        "communication {} is ongoing but {key} does not hold it as {role:?}",
                        c.id
                    )));
                }
            }
        }

        for t in &state.terminals {
            let Some(id) = t.ongoing else { continue };
            match communications.get(&id) {
                Some(c) if c.status == "ONGOING" => {},
                Some(c) => {
                    return Err(self.violation(format!(
                        "terminal {} holds communication {id} which is {}",
                        t.key, c.status
                    )));
                },
                None => {
                    return Err(self.violation(format!(
                        "terminal {} holds unknown communication {id}",
                        t.key
                    )));
                },
            }
        }
        Ok(())
    }
}

/// Terminal histories match the communication records.
///
/// An id is in a terminal's made set iff the terminal originated it, and in
/// its received set iff it was the destination. Activity is exactly "has any
/// history".
pub struct HistoryConsistency;

impl Invariant for HistoryConsistency {
    fn name(&self) -> &'static str {
        "HistoryConsistency"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        let terminals = terminals_by_key(state);
        let communications = communications_by_id(state);

        for c in &state.communications {
            let made = terminals.get(c.origin.as_str()).is_some_and(|t| t.made.contains(&c.id));
            let received =
                terminals.get(c.destination.as_str()).is_some_and(|t| t.received.contains(&c.id));
            if !made || !received {
                return Err(self.violation(format!(
                    "communication {} {}->{} missing from history (made={made}, received={received})",
                    c.id, c.origin, c.destination
                )));
            }
        }

        for t in &state.terminals {
            let misfiled = t
                .made
                .iter()
                .find(|id| communications.get(*id).is_none_or(|c| c.origin != t.key))
                .or_else(|| {
                    t.received
                        .iter()
                        .find(|id| communications.get(*id).is_none_or(|c| c.destination != t.key))
                });
            if let Some(id) = misfiled {
                return Err(self.violation(format!(
                    "terminal {} lists communication {id} it did not take part in",
                    t.key
                )));
            }

            let has_history = !t.made.is_empty() || !t.received.is_empty();
            if t.active != has_history {
                return Err(self.violation(format!(
                    "terminal {}: active={} but history has {} entries",
                    t.key,
                    t.active,
                    t.made.len() + t.received.len()
                )));
            }
        }
        Ok(())
    }
}

/// Debt and payments add up to the costs of finished communications.
///
/// For every terminal, debt plus payments equals the cost of everything it
/// originated and finished, and payments equal the cost of what it paid.
/// Only finished communications can be paid.
pub struct AccountingConsistency;

impl Invariant for AccountingConsistency {
    fn name(&self) -> &'static str {
        "AccountingConsistency"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        if let Some(c) = state.communications.iter().find(|c| c.paid && c.status != "FINISHED") {
            return Err(self.violation(format!("communication {} paid while {}", c.id, c.status)));
        }

        let mut charged: HashMap<&str, u64> = HashMap::new();
        let mut paid: HashMap<&str, u64> = HashMap::new();
        for c in state.communications.iter().filter(|c| c.status == "FINISHED") {
            let total = charged.entry(c.origin.as_str()).or_default();
            *total = total.saturating_add(c.cost);
            if c.paid {
                let total = paid.entry(c.origin.as_str()).or_default();
                *total = total.saturating_add(c.cost);
            }
        }

        for t in &state.terminals {
            let charged = charged.get(t.key.as_str()).copied().unwrap_or(0);
            let paid = paid.get(t.key.as_str()).copied().unwrap_or(0);
            if t.debt.saturating_add(t.total_paid) != charged || t.total_paid != paid {
                return Err(self.violation(format!(
                    "terminal {}: debt {} + paid {} vs charged {charged}, paid records {paid}",
                    t.key, t.debt, t.total_paid
                )));
            }
        }
        Ok(())
    }
}

/// Clients and terminals reference each other consistently.
///
/// Every terminal's client lists it, every listed terminal points back, and
/// client totals are the sums over their terminals.
pub struct ClientOwnership;

impl Invariant for ClientOwnership {
    fn name(&self) -> &'static str {
        "ClientOwnership"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        let terminals = terminals_by_key(state);

        for t in &state.terminals {
            let listed = state.clients.iter().any(|c| c.key == t.client && c.terminals.contains(&t.key));
            if !listed {
                return Err(self.violation(format!(
                    "terminal {} not listed by its client {}",
                    t.key, t.client
                )));
            }
        }

        for c in &state.clients {
            let mut payments: u64 = 0;
            let mut debts: u64 = 0;
            for key in &c.terminals {
                match terminals.get(key.as_str()) {
                    Some(t) if t.client == c.key => {
                        payments = payments.saturating_add(t.total_paid);
                        debts = debts.saturating_add(t.debt);
                    },
                    _ => {
                        return Err(self.violation(format!(
                            "client {} lists terminal {key} it does not own",
                            c.key
                        )));
                    },
                }
            }
            if payments != c.payments || debts != c.debts {
                return Err(self.violation(format!(
                    "client {}: totals {}/{} but terminals sum to {payments}/{debts}",
                    c.key, c.payments, c.debts
                )));
            }
        }
        Ok(())
    }
}

/// Listings are strictly ordered and ids are dense.
///
/// Clients, terminals, owned terminals and friend lists are strictly
/// ascending by key; communication ids run `1..=n`; nobody befriends
/// itself.
pub struct SortedKeys;

impl SortedKeys {
    fn strictly_ascending<T: Ord>(items: &[T]) -> bool {
        items.windows(2).all(|w| w[0] < w[1])
    }
}

impl Invariant for SortedKeys {
    fn name(&self) -> &'static str {
        "SortedKeys"
    }

    fn check(&self, state: &NetworkSnapshot) -> InvariantResult {
        let client_keys: Vec<_> = state.clients.iter().map(|c| c.key.as_str()).collect();
        if !Self::strictly_ascending(&client_keys) {
            return Err(self.violation(format!("clients out of order: {client_keys:?}")));
        }

        let terminal_keys: Vec<_> = state.terminals.iter().map(|t| t.key.as_str()).collect();
        if !Self::strictly_ascending(&terminal_keys) {
            return Err(self.violation(format!("terminals out of order: {terminal_keys:?}")));
        }

        for (expected, c) in (1u64..).zip(&state.communications) {
            if c.id != expected {
                return Err(self.violation(format!(
                    "communication id {} at position {expected}",
                    c.id
                )));
            }
        }

        for c in &state.clients {
            if !Self::strictly_ascending(&c.terminals) {
                return Err(self.violation(format!("client {} terminals out of order", c.key)));
            }
        }
        for t in &state.terminals {
            if !Self::strictly_ascending(&t.friends) || t.friends.contains(&t.key) {
                return Err(self.violation(format!(
                    "terminal {} has malformed friends {:?}",
                    t.key, t.friends
                )));
            }
            if !Self::strictly_ascending(&t.made) || !Self::strictly_ascending(&t.received) {
                return Err(self.violation(format!("terminal {} history out of order", t.key)));
            }
        }
        Ok(())
    }
}
