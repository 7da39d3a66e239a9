//! Price tables.
//!
//! The core only needs one thing from a tariff: the cost of a finished
//! communication. [`PriceTable`] is that seam. [`FlatPriceTable`] is the
//! configurable table every client gets unless registered with another one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::communication::{Communication, CommunicationKind};

/// Monetary amount. Costs, payments and debts are never negative.
pub type Amount = u64;

/// Client-scoped cost function.
///
/// Called exactly once per communication, when it is finished. The result is
/// taken as authoritative.
pub trait PriceTable: fmt::Debug + Send + Sync {
    /// Cost of `communication`, whose size is already final. `friends` is
    /// true when the destination is a friend of the origin terminal.
    fn cost_of(&self, communication: &Communication, friends: bool) -> Amount;
}

/// Linear tariff: a rate per character or duration unit, with a percentage
/// discount on interactive communications between friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatPriceTable {
    /// Cost per text character
    pub text_per_char: Amount,
    /// Cost per voice duration unit
    pub voice_per_unit: Amount,
    /// Cost per video duration unit
    pub video_per_unit: Amount,
    /// Discount (0-100) on voice and video between friends
    pub friend_discount_percent: u8,
}

impl Default for FlatPriceTable {
    fn default() -> Self {
        Self { text_per_char: 1, voice_per_unit: 20, video_per_unit: 30, friend_discount_percent: 50 }
    }
}

impl FlatPriceTable {
    fn discounted(&self, base: Amount, friends: bool) -> Amount {
        if !friends {
            return base;
        }

        let keep = 100 - Amount::from(self.friend_discount_percent.min(100));
        base.saturating_mul(keep) / 100
    }
}

impl PriceTable for FlatPriceTable {
    fn cost_of(&self, communication: &Communication, friends: bool) -> Amount {
        let size = communication.size();
        match communication.kind() {
            CommunicationKind::Text { .. } => size.saturating_mul(self.text_per_char),
            CommunicationKind::Voice => {
                self.discounted(size.saturating_mul(self.voice_per_unit), friends)
            },
            CommunicationKind::Video => {
                self.discounted(size.saturating_mul(self.video_per_unit), friends)
            },
        }
    }
}
