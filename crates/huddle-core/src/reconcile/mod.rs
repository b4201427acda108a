//! Optimistic-update reconciliation.
//!
//! Local actions insert placeholders immediately; authoritative rows arrive
//! later, either as the direct response to the mutation or through the
//! realtime change feed (in either order, possibly more than once). The
//! types here merge both sources so that every logical event is rendered
//! exactly once.

mod likes;
mod list;
mod tally;

use std::fmt::Debug;
use std::hash::Hash;

use crate::models::{ProfileSummary, TempId, UserId};

pub use likes::{LikeAction, LikeLedger, LikeRequest, LikeResult};
pub use list::{EntryStatus, ListOrder, OptimisticList, Placeholder, Row};
pub use tally::IdTally;

/// A confirmed record that can stand in for an optimistic placeholder.
pub trait Reconcilable: Clone {
    type Id: Clone + Eq + Hash + Debug;

    /// Server-assigned identifier
    fn id(&self) -> &Self::Id;

    /// Account that created the record
    fn author(&self) -> &UserId;

    /// Text used to correlate with a placeholder when no temp id is echoed
    fn content(&self) -> &str;

    /// Temp id echoed back by the server, if the sender supplied one
    fn client_ref(&self) -> Option<TempId> {
        None
    }

    /// Joined author details, when the row carries them
    fn profile(&self) -> Option<&ProfileSummary> {
        None
    }

    /// Carry over author details known locally but missing from the row
    fn adopt_profile(&mut self, _profile: &ProfileSummary) {}
}

/// What a reconciliation step did to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A placeholder was swapped for the confirmed row at `index`
    Replaced { temp_id: TempId, index: usize },
    /// A new row was inserted at `index`
    Inserted { index: usize },
    /// An existing confirmed row was refreshed in place
    Updated { index: usize },
    /// A placeholder was dropped because its row is already rendered
    Collapsed { temp_id: TempId },
    /// A row was removed
    Removed,
    /// The event was already applied
    Duplicate,
    /// Nothing to apply the event to
    Ignored,
}

impl Outcome {
    /// Whether the rendered list changed.
    #[must_use]
    pub const fn changed(&self) -> bool {
        !matches!(self, Self::Duplicate | Self::Ignored)
    }
}
