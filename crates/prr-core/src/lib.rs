//! Core of the PRR telecommunications model.
//!
//! Clients own terminals, terminals exchange interactive (voice, video) and
//! text communications, and every terminal accrues debt according to its
//! client's price table. All logic here is synchronous and free of I/O:
//! callers drive the [`Network`] registry and get back either a value or a
//! [`NetworkError`] describing why nothing changed.
//!
//! # Components
//!
//! - [`TerminalState`]: closed set of operating states and the pure legality
//!   rules attached to each one
//! - [`Terminal`]: a single endpoint, its friends, history and accumulators
//! - [`Communication`]: record of one exchange between two terminals
//! - [`Network`]: the registry that owns clients, terminals and
//!   communications and dispatches cross-terminal operations
//! - [`SharedNetwork`]: the registry behind a single lock for concurrent use
//! - [`Visitor`]: read-only traversal used to build [`NetworkSnapshot`]s

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod communication;
mod error;
mod key;
mod network;
mod price_table;
mod shared;
mod state;
mod terminal;
mod visitor;

pub use client::Client;
pub use communication::{
    Communication, CommunicationId, CommunicationKind, CommunicationStatus, InteractiveKind,
};
pub use error::NetworkError;
pub use key::{ClientKey, TERMINAL_KEY_LEN, TerminalKey};
pub use network::{Network, NetworkConfig};
pub use price_table::{Amount, FlatPriceTable, PriceTable};
pub use shared::SharedNetwork;
pub use state::{EndPolicy, Incoming, Reception, Refusal, Role, StateCommand, TerminalState};
pub use terminal::{Ongoing, Terminal, TerminalKind};
pub use visitor::{
    ClientSnapshot, CommunicationSnapshot, EntitySnapshot, NetworkSnapshot, SnapshotVisitor,
    TerminalSnapshot, Visitable, Visitor, visit_all,
};
