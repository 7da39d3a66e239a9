//! Seeded simulation driver.
//!
//! `SimDriver` generates operations from a ChaCha stream seeded by the
//! configuration, applies each one to the [`ModelWorld`] and to the real
//! registry, and stops at the first divergence or invariant violation. The
//! same seed always produces the same operation sequence and report.

use arbitrary::{Arbitrary, Unstructured};
use prr_core::{EndPolicy, NetworkConfig, NetworkError};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    invariants::{InvariantRegistry, Violation},
    model::{ModelWorld, ObservableState, Operation, OperationResult, TERMINAL_SLOTS},
    network_world::NetworkWorld,
};

/// Bytes of entropy drawn per generated operation.
const OPERATION_ENTROPY: usize = 32;

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed
    pub seed: u64,
    /// Number of clients
    pub clients: usize,
    /// Terminals registered before the first step, capped at the slot count
    pub terminals: u8,
    /// Number of generated operations
    pub steps: usize,
    /// Who may end a call
    pub end_policy: EndPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { seed: 0, clients: 3, terminals: 6, steps: 1_000, end_policy: EndPolicy::default() }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimReport {
    /// Seed the run used
    pub seed: u64,
    /// Operations applied, setup excluded
    pub steps: usize,
    /// Operations that succeeded
    pub succeeded: usize,
    /// Operations refused with an error
    pub refused: usize,
    /// Terminals registered at the end
    pub terminals: usize,
    /// Communications created
    pub communications: usize,
    /// Sum of terminal payments
    pub global_payments: u64,
    /// Sum of terminal debts
    pub global_debts: u64,
}

/// Simulation failures.
#[derive(Debug, Error)]
pub enum SimError {
    /// Initial registration failed
    #[error("setup failed: {0}")]
    Setup(#[from] NetworkError),

    /// Random operation could not be generated
    #[error("operation generation failed: {0}")]
    Generate(#[from] arbitrary::Error),

    /// Model and registry returned different results
    #[error("step {step}: {operation:?} returned {real:?}, model expected {model:?}")]
    Divergence {
        /// Step index
        step: usize,
        /// Operation applied
        operation: Operation,
        /// Model result
        model: OperationResult,
        /// Registry result
        real: OperationResult,
    },

    /// Results agreed but observable state did not
    #[error("step {step}: state diverged after {operation:?}")]
    StateMismatch {
        /// Step index
        step: usize,
        /// Operation applied
        operation: Operation,
        /// Model state
        model: Box<ObservableState>,
        /// Registry state
        real: Box<ObservableState>,
    },

    /// An invariant failed on the registry snapshot
    #[error("step {step}: invariants violated after {operation:?}: {}", join(.violations))]
    InvariantViolated {
        /// Step index
        step: usize,
        /// Operation applied
        operation: Operation,
        /// Every violation found
        violations: Vec<Violation>,
    },
}

fn join(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Drives model and registry in lockstep.
#[derive(Debug)]
pub struct SimDriver {
    config: SimConfig,
    rng: ChaCha8Rng,
    model: ModelWorld,
    world: NetworkWorld,
    invariants: InvariantRegistry,
    report: SimReport,
}

impl SimDriver {
    /// Build both worlds and register the initial terminals.
    ///
    /// Terminal `i` belongs to client `i % clients`; odd slots are FANCY.
    ///
    /// # Errors
    ///
    /// Any failure while setting up, including a divergence during initial
    /// registration.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let network_config = NetworkConfig { end_policy: config.end_policy, ..NetworkConfig::default() };
        let mut driver = Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            model: ModelWorld::new(config.clients, config.end_policy),
            world: NetworkWorld::new(config.clients, network_config)?,
            invariants: InvariantRegistry::standard(),
            report: SimReport { seed: config.seed, ..SimReport::default() },
            config,
        };

        for terminal in 0..driver.config.terminals.min(TERMINAL_SLOTS) {
            let op = Operation::RegisterTerminal { terminal, client: terminal, fancy: terminal % 2 == 1 };
            driver.check(0, &op)?;
        }

        tracing::debug!(
            seed = driver.config.seed,
            clients = driver.model.num_clients(),
            terminals = driver.world.network().terminal_count(),
            "simulation initialized"
        );
        Ok(driver)
    }

    /// Current model.
    pub fn model(&self) -> &ModelWorld {
        &self.model
    }

    /// Current registry wrapper.
    pub fn world(&self) -> &NetworkWorld {
        &self.world
    }

    /// Draw the next operation from the seeded stream.
    ///
    /// # Errors
    ///
    /// `SimError::Generate` if the entropy cannot form an operation.
    pub fn next_operation(&mut self) -> Result<Operation, SimError> {
        let mut entropy = [0u8; OPERATION_ENTROPY];
        self.rng.fill_bytes(&mut entropy);
        let mut unstructured = Unstructured::new(&entropy);
        Ok(Operation::arbitrary(&mut unstructured)?)
    }

    /// Apply one operation to both sides and verify them.
    ///
    /// # Errors
    ///
    /// `SimError::Divergence`, `StateMismatch` or `InvariantViolated`.
    pub fn step(&mut self, op: &Operation) -> Result<OperationResult, SimError> {
        self.report.steps += 1;
        let result = self.check(self.report.steps, op)?;
        if result.is_ok() {
            self.report.succeeded += 1;
        } else {
            self.report.refused += 1;
        }
        Ok(result)
    }

    fn check(&mut self, step: usize, op: &Operation) -> Result<OperationResult, SimError> {
        let model = self.model.apply(op);
        let real = self.world.apply(op);
        tracing::trace!(step, ?op, ?real, "operation applied");

        if model != real {
            return Err(SimError::Divergence { step, operation: op.clone(), model, real });
        }

        let snapshot = self.world.snapshot();
        let expected = self.model.observable_state();
        let observed = ObservableState::from(&snapshot);
        if expected != observed {
            return Err(SimError::StateMismatch {
                step,
                operation: op.clone(),
                model: Box::new(expected),
                real: Box::new(observed),
            });
        }

        self.invariants.check_all(&snapshot).map_err(|violations| {
            SimError::InvariantViolated { step, operation: op.clone(), violations }
        })?;

        Ok(real)
    }

    /// Run the configured number of steps.
    ///
    /// # Errors
    ///
    /// The first failure encountered.
    pub fn run(mut self) -> Result<SimReport, SimError> {
        for _ in 0..self.config.steps {
            let op = self.next_operation()?;
            self.step(&op)?;
        }

        let network = self.world.network();
        let report = SimReport {
            terminals: network.terminal_count(),
            communications: network.communications().count(),
            global_payments: network.global_payments(),
            global_debts: network.global_debts(),
            ..self.report
        };

        tracing::info!(
            seed = report.seed,
            steps = report.steps,
            succeeded = report.succeeded,
            refused = report.refused,
            communications = report.communications,
            "simulation finished"
        );
        Ok(report)
    }
}
