//! Communication records.
//!
//! A communication is created by the registry when a terminal starts or sends
//! one. Text communications are priced and finished on creation. Interactive
//! ones stay [`CommunicationStatus::Ongoing`] until an end command prices them
//! with the duration the caller reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::NetworkError,
    key::TerminalKey,
    price_table::{Amount, PriceTable},
};

/// Communication identifier, unique across the network.
///
/// Allocated in strictly increasing order starting at 1, so ids are also
/// strictly increasing within every terminal's history.
pub type CommunicationId = u64;

/// Kind of an interactive communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractiveKind {
    /// Voice call, supported by every terminal
    Voice,
    /// Video call, FANCY terminals only
    Video,
}

/// What was exchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationKind {
    /// Text message
    Text {
        /// Message body
        message: String,
    },
    /// Voice call
    Voice,
    /// Video call
    Video,
}

impl CommunicationKind {
    /// Upper-case kind name used in reports and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "TEXT",
            Self::Voice => "VOICE",
            Self::Video => "VIDEO",
        }
    }

    /// Whether this kind occupies both endpoints while it lasts.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }
}

impl From<InteractiveKind> for CommunicationKind {
    fn from(kind: InteractiveKind) -> Self {
        match kind {
            InteractiveKind::Voice => Self::Voice,
            InteractiveKind::Video => Self::Video,
        }
    }
}

impl fmt::Display for CommunicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle status of a communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommunicationStatus {
    /// Interactive communication still occupying its endpoints
    Ongoing,
    /// Priced and closed
    Finished,
}

impl CommunicationStatus {
    /// Upper-case status name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ongoing => "ONGOING",
            Self::Finished => "FINISHED",
        }
    }
}

/// Record of one exchange between two terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    id: CommunicationId,
    origin: TerminalKey,
    destination: TerminalKey,
    kind: CommunicationKind,
    status: CommunicationStatus,
    /// Characters for text, duration units for interactive
    size: u64,
    cost: Amount,
    paid: bool,
}

impl Communication {
    /// Create an ongoing interactive communication.
    pub fn interactive(
        id: CommunicationId,
        origin: TerminalKey,
        destination: TerminalKey,
        kind: InteractiveKind,
    ) -> Self {
        Self {
            id,
            origin,
            destination,
            kind: kind.into(),
            status: CommunicationStatus::Ongoing,
            size: 0,
            cost: 0,
            paid: false,
        }
    }

    /// Create an unpriced text communication. Its size is the number of
    /// characters in `message`.
    pub fn text(
        id: CommunicationId,
        origin: TerminalKey,
        destination: TerminalKey,
        message: String,
    ) -> Self {
        let size = message.chars().count() as u64;
        Self {
            id,
            origin,
            destination,
            kind: CommunicationKind::Text { message },
            status: CommunicationStatus::Ongoing,
            size,
            cost: 0,
            paid: false,
        }
    }

    /// Network-unique id.
    pub fn id(&self) -> CommunicationId {
        self.id
    }

    /// Terminal that started the communication.
    pub fn origin(&self) -> &TerminalKey {
        &self.origin
    }

    /// Terminal that received the communication.
    pub fn destination(&self) -> &TerminalKey {
        &self.destination
    }

    /// What was exchanged.
    pub fn kind(&self) -> &CommunicationKind {
        &self.kind
    }

    /// Current status.
    pub fn status(&self) -> CommunicationStatus {
        self.status
    }

    /// Whether the communication still occupies its endpoints.
    pub fn is_ongoing(&self) -> bool {
        self.status == CommunicationStatus::Ongoing
    }

    /// Characters for text, duration units for finished interactive
    /// communications, zero while ongoing.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Final cost. Zero until finished.
    pub fn cost(&self) -> Amount {
        self.cost
    }

    /// Whether the originator has paid for it.
    pub fn is_paid(&self) -> bool {
        self.paid
    }

    /// Price and close the communication.
    ///
    /// For text the size is already known and `size` must match it. Returns
    /// the cost the price table computed.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the communication is already
    ///   finished, or `size` disagrees with a text message's length
    pub fn finish(
        &mut self,
        size: u64,
        prices: &dyn PriceTable,
        friends: bool,
    ) -> Result<Amount, NetworkError> {
        if self.status == CommunicationStatus::Finished {
            return Err(NetworkError::InvalidArgument(format!(
                "communication {} is already finished",
                self.id
            )));
        }

        if !self.kind.is_interactive() && size != self.size {
            return Err(NetworkError::InvalidArgument(format!(
                "text communication {} has size {}, not {size}",
                self.id, self.size
            )));
        }

        self.size = size;
        self.cost = prices.cost_of(self, friends);
        self.status = CommunicationStatus::Finished;

        Ok(self.cost)
    }

    pub(crate) fn mark_paid(&mut self) {
        debug_assert_eq!(self.status, CommunicationStatus::Finished);
        self.paid = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_table::FlatPriceTable;

    fn key(k: &str) -> TerminalKey {
        TerminalKey::parse(k).unwrap()
    }

    #[test]
    fn text_size_counts_characters() {
        let comm = Communication::text(1, key("910000"), key("910001"), "olá".to_string());
        assert_eq!(comm.size(), 3);
        assert!(comm.is_ongoing());
        assert_eq!(comm.kind().name(), "TEXT");
    }

    #[test]
    fn finish_prices_and_closes() {
        let prices = FlatPriceTable::default();
        let mut comm =
            Communication::interactive(4, key("910000"), key("910001"), InteractiveKind::Voice);

        let cost = comm.finish(3, &prices, false).unwrap();
        assert_eq!(cost, 3 * prices.voice_per_unit);
        assert_eq!(comm.cost(), cost);
        assert_eq!(comm.size(), 3);
        assert_eq!(comm.status(), CommunicationStatus::Finished);
    }

    #[test]
    fn finish_twice_fails() {
        let prices = FlatPriceTable::default();
        let mut comm =
            Communication::interactive(4, key("910000"), key("910001"), InteractiveKind::Video);

        comm.finish(1, &prices, false).unwrap();
        assert!(matches!(comm.finish(1, &prices, false), Err(NetworkError::InvalidArgument(_))));
    }

    #[test]
    fn text_size_must_match() {
        let prices = FlatPriceTable::default();
        let mut comm = Communication::text(1, key("910000"), key("910001"), "hi".to_string());

        assert!(comm.finish(5, &prices, false).is_err());
        assert!(comm.finish(2, &prices, false).is_ok());
    }
}
