//! Deterministic simulation harness for the PRR network.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the network
//! rules. Operations are applied to both the model and the real registry
//! (wrapped by [`NetworkWorld`]), and their results and observable states
//! are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after every
//! operation against a [`prr_core::NetworkSnapshot`]. Use
//! [`InvariantRegistry::standard()`] for the full set.
//!
//! # Simulation
//!
//! [`SimDriver`] combines both: a seeded operation stream, lockstep
//! application, and invariant checks after every step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod network_world;
pub mod sim_driver;

pub use invariants::{
    AccountingConsistency, ClientOwnership, HistoryConsistency, Invariant, InvariantRegistry,
    InvariantResult, OngoingImpliesBusy, OngoingPairsConsistent, SortedKeys, Violation,
};
pub use model::{
    ClientSlot, ModelWorld, ObservableState, Operation, OperationError, OperationResult,
    TERMINAL_SLOTS, TerminalSlot, client_key, terminal_key,
};
pub use network_world::NetworkWorld;
pub use sim_driver::{SimConfig, SimDriver, SimError, SimReport};
