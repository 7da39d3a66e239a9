//! Model world: the reference network.
//!
//! A deliberately plain re-statement of the network rules over slots and
//! vectors. It shares no logic with `prr-core`; it is the oracle the real
//! registry is verified against, so every check here runs in the same order
//! as the registry's own validation.

use std::collections::BTreeSet;

use prr_core::{EndPolicy, FlatPriceTable, TerminalState};

use super::{
    observable::{ObservableState, ObservedCommunication, ObservedTerminal},
    operation::{
        ClientSlot, Operation, OperationError, OperationResult, TERMINAL_SLOTS, TerminalSlot,
        client_key, terminal_key,
    },
};

/// Terminal as the model sees it.
#[derive(Debug, Clone)]
pub struct ModelTerminal {
    /// Owning client index
    pub client: usize,
    /// FANCY terminal
    pub fancy: bool,
    /// Current state
    pub state: TerminalState,
    /// Friend slots
    pub friends: BTreeSet<TerminalSlot>,
    /// Call in progress: (id, originated here)
    pub ongoing: Option<(u64, bool)>,
    /// Ever took part in a communication
    pub active: bool,
    /// Outstanding debt
    pub debt: u64,
    /// Sum of payments
    pub paid: u64,
}

/// Communication as the model sees it.
#[derive(Debug, Clone)]
pub struct ModelCommunication {
    /// Originating slot
    pub origin: TerminalSlot,
    /// Destination slot
    pub destination: TerminalSlot,
    /// Video call
    pub video: bool,
    /// Text message
    pub text: bool,
    /// Priced and closed
    pub finished: bool,
    /// Final cost
    pub cost: u64,
    /// Paid by the originator
    pub paid: bool,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    num_clients: usize,
    policy: EndPolicy,
    prices: FlatPriceTable,
    terminals: Vec<Option<ModelTerminal>>,
    /// Indexed by id - 1
    communications: Vec<ModelCommunication>,
}

type Step<T> = Result<T, OperationError>;

impl ModelWorld {
    /// Create a model with `num_clients` clients, no terminals and the
    /// default tariff.
    pub fn new(num_clients: usize, policy: EndPolicy) -> Self {
        Self {
            num_clients: num_clients.max(1),
            policy,
            prices: FlatPriceTable::default(),
            terminals: vec![None; usize::from(TERMINAL_SLOTS)],
            communications: Vec::new(),
        }
    }

    /// Number of clients.
    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// Client index a [`ClientSlot`] resolves to.
    pub fn client_index(&self, slot: ClientSlot) -> usize {
        usize::from(slot) % self.num_clients
    }

    /// Terminal in `slot`, if registered.
    pub fn terminal(&self, slot: TerminalSlot) -> Option<&ModelTerminal> {
        self.terminals.get(Self::index(slot)).and_then(Option::as_ref)
    }

    /// Number of communications created so far.
    pub fn communication_count(&self) -> usize {
        self.communications.len()
    }

    fn index(slot: TerminalSlot) -> usize {
        usize::from(slot % TERMINAL_SLOTS)
    }

    fn same(a: TerminalSlot, b: TerminalSlot) -> bool {
        Self::index(a) == Self::index(b)
    }

    fn get(&self, slot: TerminalSlot) -> Step<&ModelTerminal> {
        self.terminal(slot).ok_or(OperationError::UnknownKey)
    }

    fn get_mut(&mut self, slot: TerminalSlot) -> Step<&mut ModelTerminal> {
        self.terminals
            .get_mut(Self::index(slot))
            .and_then(Option::as_mut)
            .ok_or(OperationError::UnknownKey)
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real registry's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let step = match *op {
            Operation::RegisterTerminal { terminal, client, fancy } => {
                self.register_terminal(terminal, client, fancy)
            },
            Operation::AddFriend { terminal, friend } => self.add_friend(terminal, friend),
            Operation::RemoveFriend { terminal, friend } => self.remove_friend(terminal, friend),
            Operation::TurnOff { terminal } => self.set_state(terminal, TerminalState::Off),
            Operation::SetIdle { terminal } => self.set_state(terminal, TerminalState::Idle),
            Operation::SetBusy { terminal } => self.set_state(terminal, TerminalState::Busy),
            Operation::SetSilent { terminal } => self.set_state(terminal, TerminalState::Silent),
            Operation::StartCall { origin, destination, video } => {
                self.start_call(origin, destination, video).map(Some)
            },
            Operation::SendText { origin, destination, len } => {
                self.send_text(origin, destination, len).map(Some)
            },
            Operation::EndCall { terminal, duration } => {
                self.end_call(terminal, u64::from(duration)).map(Some)
            },
            Operation::Pay { terminal, communication } => {
                self.pay(terminal, Operation::communication_id(communication)).map(Some)
            },
        };

        match step {
            Ok(None) => OperationResult::Ok,
            Ok(Some(value)) => OperationResult::Value(value),
            Err(error) => OperationResult::Error(error),
        }
    }

    fn register_terminal(
        &mut self,
        terminal: TerminalSlot,
        client: ClientSlot,
        fancy: bool,
    ) -> Step<Option<u64>> {
        let client = self.client_index(client);
        let slot = &mut self.terminals[Self::index(terminal)];
        if slot.is_some() {
            return Err(OperationError::Duplicate);
        }

        *slot = Some(ModelTerminal {
            client,
            fancy,
            state: TerminalState::Idle,
            friends: BTreeSet::new(),
            ongoing: None,
            active: false,
            debt: 0,
            paid: 0,
        });
        Ok(None)
    }

    fn add_friend(&mut self, terminal: TerminalSlot, friend: TerminalSlot) -> Step<Option<u64>> {
        if Self::same(terminal, friend) {
            return Err(OperationError::InvalidArgument);
        }
        self.get(terminal)?;
        self.get(friend)?;

        let friends = &mut self.get_mut(terminal)?.friends;
        if !friends.insert(friend % TERMINAL_SLOTS) {
            return Err(OperationError::InvalidArgument);
        }
        Ok(None)
    }

    fn remove_friend(&mut self, terminal: TerminalSlot, friend: TerminalSlot) -> Step<Option<u64>> {
        if Self::same(terminal, friend) {
            return Err(OperationError::InvalidArgument);
        }
        self.get(terminal)?;
        self.get(friend)?;

        let friends = &mut self.get_mut(terminal)?.friends;
        if !friends.remove(&(friend % TERMINAL_SLOTS)) {
            return Err(OperationError::InvalidArgument);
        }
        Ok(None)
    }

    fn set_state(&mut self, terminal: TerminalSlot, target: TerminalState) -> Step<Option<u64>> {
        let t = self.get_mut(terminal)?;
        if t.state == target {
            return Ok(None);
        }
        if t.ongoing.is_some() {
            return Err(OperationError::InvalidState);
        }

        t.state = target;
        Ok(None)
    }

    /// Checks shared by calls and texts, in registry order.
    fn check_dispatch(
        &self,
        origin: TerminalSlot,
        destination: TerminalSlot,
        video: bool,
        text: bool,
    ) -> Step<()> {
        if Self::same(origin, destination) {
            return Err(OperationError::InvalidArgument);
        }
        let from = self.get(origin)?;
        let to = self.get(destination)?;

        if from.state != TerminalState::Idle {
            return Err(OperationError::InvalidState);
        }
        if video && !from.fancy {
            return Err(OperationError::UnsupportedAtOrigin);
        }
        if video && !to.fancy {
            return Err(OperationError::UnsupportedAtDestination);
        }

        match to.state {
            TerminalState::Off => Err(OperationError::TargetOff),
            _ if text => Ok(()),
            TerminalState::Idle => Ok(()),
            TerminalState::Busy => Err(OperationError::TargetBusy),
            TerminalState::Silent => Err(OperationError::TargetSilent),
        }
    }

    fn next_id(&self) -> u64 {
        self.communications.len() as u64 + 1
    }

    fn start_call(&mut self, origin: TerminalSlot, destination: TerminalSlot, video: bool) -> Step<u64> {
        self.check_dispatch(origin, destination, video, false)?;
        let id = self.next_id();

        for (slot, originated) in [(origin, true), (destination, false)] {
            let t = self.get_mut(slot)?;
            t.ongoing = Some((id, originated));
            t.state = TerminalState::Busy;
            t.active = true;
        }

        self.communications.push(ModelCommunication {
            origin: origin % TERMINAL_SLOTS,
            destination: destination % TERMINAL_SLOTS,
            video,
            text: false,
            finished: false,
            cost: 0,
            paid: false,
        });
        Ok(id)
    }

    fn send_text(&mut self, origin: TerminalSlot, destination: TerminalSlot, len: u8) -> Step<u64> {
        self.check_dispatch(origin, destination, false, true)?;
        let id = self.next_id();
        let cost =
            (Operation::message(len).chars().count() as u64).saturating_mul(self.prices.text_per_char);
        let debt = self.get(origin)?.debt.checked_add(cost).ok_or(OperationError::InvalidArgument)?;

        let sender = self.get_mut(origin)?;
        sender.active = true;
        sender.debt = debt;
        self.get_mut(destination)?.active = true;

        self.communications.push(ModelCommunication {
            origin: origin % TERMINAL_SLOTS,
            destination: destination % TERMINAL_SLOTS,
            video: false,
            text: true,
            finished: true,
            cost,
            paid: false,
        });
        Ok(id)
    }

    fn end_call(&mut self, terminal: TerminalSlot, duration: u64) -> Step<u64> {
        let caller = self.get(terminal)?;
        let id = match caller.ongoing {
            Some((id, originated))
                if caller.state == TerminalState::Busy
                    && (originated || self.policy == EndPolicy::AnyParticipant) =>
            {
                id
            },
            _ => return Err(OperationError::InvalidState),
        };

        let index = usize::try_from(id - 1).map_err(|_| OperationError::Other)?;
        let comm = self.communications.get(index).ok_or(OperationError::Other)?;
        let (origin, destination, video) = (comm.origin, comm.destination, comm.video);

        let friends = self.get(origin)?.friends.contains(&destination);
        let rate = if video { self.prices.video_per_unit } else { self.prices.voice_per_unit };
        let mut cost = duration.saturating_mul(rate);
        if friends {
            let keep = 100 - u64::from(self.prices.friend_discount_percent.min(100));
            cost = cost.saturating_mul(keep) / 100;
        }
        let debt = self.get(origin)?.debt.checked_add(cost).ok_or(OperationError::InvalidArgument)?;

        self.get_mut(origin)?.debt = debt;
        for slot in [origin, destination] {
            let t = self.get_mut(slot)?;
            t.ongoing = None;
            t.state = TerminalState::Idle;
        }

        let comm = &mut self.communications[index];
        comm.finished = true;
        comm.cost = cost;
        Ok(cost)
    }

    fn pay(&mut self, terminal: TerminalSlot, id: u64) -> Step<u64> {
        self.get(terminal)?;
        let index = usize::try_from(id - 1).map_err(|_| OperationError::Other)?;
        let comm = self.communications.get(index).ok_or(OperationError::UnknownCommunication)?;

        if !Self::same(comm.origin, terminal) || !comm.finished || comm.paid {
            return Err(OperationError::InvalidArgument);
        }
        let cost = comm.cost;

        let t = self.get_mut(terminal)?;
        t.debt -= cost;
        t.paid = t.paid.saturating_add(cost);
        self.communications[index].paid = true;
        Ok(cost)
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let terminals = (0..TERMINAL_SLOTS)
            .filter_map(|slot| {
                let t = self.terminal(slot)?;
                Some(ObservedTerminal {
                    key: terminal_key(slot),
                    client: client_key(t.client),
                    state: t.state,
                    debt: t.debt,
                    paid: t.paid,
                    friends: t.friends.iter().map(|f| terminal_key(*f)).collect(),
                    active: t.active,
                    ongoing: t.ongoing.map(|(id, _)| id),
                })
            })
            .collect();

        let communications = self
            .communications
            .iter()
            .zip(1u64..)
            .map(|(c, id)| ObservedCommunication {
                id,
                origin: terminal_key(c.origin),
                destination: terminal_key(c.destination),
                finished: c.finished,
                cost: c.cost,
                paid: c.paid,
            })
            .collect();

        ObservableState { terminals, communications }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> ModelWorld {
        let mut world = ModelWorld::new(2, EndPolicy::OriginatorOnly);
        for terminal in 0..3 {
            let op = Operation::RegisterTerminal { terminal, client: terminal, fancy: terminal == 2 };
            assert!(world.apply(&op).is_ok());
        }
        world
    }

    #[test]
    fn call_lifecycle() {
        let mut world = world();

        let start = world.apply(&Operation::StartCall { origin: 0, destination: 1, video: false });
        assert_eq!(start, OperationResult::Value(1));
        assert_eq!(world.terminal(1).map(|t| t.state), Some(TerminalState::Busy));

        let early = world.apply(&Operation::EndCall { terminal: 1, duration: 3 });
        assert_eq!(early, OperationResult::Error(OperationError::InvalidState));

        let end = world.apply(&Operation::EndCall { terminal: 0, duration: 3 });
        assert_eq!(end, OperationResult::Value(60));
        assert_eq!(world.terminal(0).map(|t| t.debt), Some(60));

        let pay = world.apply(&Operation::Pay { terminal: 0, communication: 0 });
        assert_eq!(pay, OperationResult::Value(60));
        assert_eq!(world.terminal(0).map(|t| (t.debt, t.paid)), Some((0, 60)));
    }

    #[test]
    fn video_needs_fancy() {
        let mut world = world();
        let result = world.apply(&Operation::StartCall { origin: 2, destination: 0, video: true });
        assert_eq!(result, OperationResult::Error(OperationError::UnsupportedAtDestination));
    }

    #[test]
    fn slot_aliases_are_the_same_terminal() {
        let mut world = world();
        let result = world.apply(&Operation::AddFriend { terminal: 0, friend: TERMINAL_SLOTS });
        assert_eq!(result, OperationResult::Error(OperationError::InvalidArgument));
    }
}
