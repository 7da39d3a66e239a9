//! Model-based testing.
//!
//! [`ModelWorld`] is a reference implementation of the network rules. The
//! same [`Operation`] sequence is applied to the model and to the real
//! registry (through [`NetworkWorld`](crate::NetworkWorld)); results and
//! [`ObservableState`] must agree after every step.

mod observable;
mod operation;
mod world;

pub use observable::{ObservableState, ObservedCommunication, ObservedTerminal};
pub use operation::{
    ClientSlot, Operation, OperationError, OperationResult, Outcome, TERMINAL_SLOTS,
    TerminalSlot, client_key, terminal_key,
};
pub use world::{ModelCommunication, ModelTerminal, ModelWorld};
