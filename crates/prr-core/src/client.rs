//! Clients: the owners of terminals.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    key::{ClientKey, TerminalKey},
    price_table::PriceTable,
};

/// A registered client.
///
/// Key, name and tax id are fixed at registration. The only field the
/// registry changes afterwards is the set of owned terminals, which only
/// grows.
#[derive(Debug, Clone)]
pub struct Client {
    key: ClientKey,
    name: String,
    tax_id: u64,
    price_table: Arc<dyn PriceTable>,
    terminals: BTreeSet<TerminalKey>,
}

impl Client {
    pub(crate) fn new(
        key: ClientKey,
        name: String,
        tax_id: u64,
        price_table: Arc<dyn PriceTable>,
    ) -> Self {
        Self { key, name, tax_id, price_table, terminals: BTreeSet::new() }
    }

    /// Unique client key.
    pub fn key(&self) -> &ClientKey {
        &self.key
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tax identifier.
    pub fn tax_id(&self) -> u64 {
        self.tax_id
    }

    /// Tariff applied to communications made by this client's terminals.
    pub fn price_table(&self) -> &dyn PriceTable {
        self.price_table.as_ref()
    }

    pub(crate) fn shared_price_table(&self) -> Arc<dyn PriceTable> {
        Arc::clone(&self.price_table)
    }

    /// Keys of the terminals this client owns, in key order.
    pub fn terminal_keys(&self) -> impl Iterator<Item = &TerminalKey> + '_ {
        self.terminals.iter()
    }

    /// Number of owned terminals.
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// Whether this client owns `terminal`.
    pub fn owns(&self, terminal: &str) -> bool {
        self.terminals.contains(terminal)
    }

    pub(crate) fn add_terminal(&mut self, terminal: TerminalKey) {
        let inserted = self.terminals.insert(terminal);
        debug_assert!(inserted, "registry checks terminal uniqueness first");
    }
}
