//! Thread-safe handle to a [`Network`].

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    communication::{CommunicationId, InteractiveKind},
    error::NetworkError,
    network::{Network, NetworkConfig},
    price_table::Amount,
    visitor::NetworkSnapshot,
};

/// A [`Network`] behind one lock.
///
/// Every operation takes the lock for its whole duration, so the
/// check-then-act sequences inside the registry are atomic with respect to
/// other handles. Two threads starting a communication towards the same idle
/// terminal cannot both succeed. Clones share the same network.
///
/// A poisoned lock surfaces as [`NetworkError::LockPoisoned`] instead of a
/// panic.
#[derive(Debug, Clone, Default)]
pub struct SharedNetwork {
    inner: Arc<Mutex<Network>>,
}

impl SharedNetwork {
    /// Wrap an existing network.
    pub fn new(network: Network) -> Self {
        Self { inner: Arc::new(Mutex::new(network)) }
    }

    /// Create an empty shared network using `config`.
    pub fn with_config(config: NetworkConfig) -> Self {
        Self::new(Network::new(config))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Network>, NetworkError> {
        self.inner.lock().map_err(|_| NetworkError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the network.
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut Network) -> Result<R, NetworkError>,
    ) -> Result<R, NetworkError> {
        let mut network = self.lock()?;
        f(&mut *network)
    }

    /// Run a read-only `f` against the network.
    pub fn read<R>(&self, f: impl FnOnce(&Network) -> R) -> Result<R, NetworkError> {
        let network = self.lock()?;
        Ok(f(&*network))
    }

    /// See [`Network::start_interactive_communication`].
    pub fn start_interactive_communication(
        &self,
        origin: &str,
        destination: &str,
        kind: InteractiveKind,
    ) -> Result<CommunicationId, NetworkError> {
        self.with(|net| net.start_interactive_communication(origin, destination, kind))
    }

    /// See [`Network::send_text_communication`].
    pub fn send_text_communication(
        &self,
        origin: &str,
        destination: &str,
        message: &str,
    ) -> Result<CommunicationId, NetworkError> {
        self.with(|net| net.send_text_communication(origin, destination, message))
    }

    /// See [`Network::end_interactive_communication`].
    pub fn end_interactive_communication(
        &self,
        terminal: &str,
        duration: u64,
    ) -> Result<Amount, NetworkError> {
        self.with(|net| net.end_interactive_communication(terminal, duration))
    }

    /// See [`Network::pay_communication`].
    pub fn pay_communication(
        &self,
        terminal: &str,
        id: CommunicationId,
    ) -> Result<Amount, NetworkError> {
        self.with(|net| net.pay_communication(terminal, id))
    }

    /// Consistent snapshot taken under the lock.
    pub fn snapshot(&self) -> Result<NetworkSnapshot, NetworkError> {
        self.read(Network::snapshot)
    }
}
