//! # Crafting Events
//!
//! Buffered by the engine and drained by consumers (audit log, client
//! notifications). Events are only appended by operations that succeed.

use crate::recipe::{AccountId, ActiveCraftId, RecipeId, RequestId};

/// Something observable that happened inside the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CraftingEvent {
    /// A recipe definition was stored.
    RecipeUpdated {
        /// Recipe id.
        recipe_id: RecipeId,
        /// Cached randomness flag.
        needs_randomness: bool,
    },
    /// A recipe was enabled or disabled.
    RecipeEnabledChanged {
        /// Recipe id.
        recipe_id: RecipeId,
        /// New flag.
        enabled: bool,
    },
    /// A craft started.
    CraftStarted {
        /// Crafting account.
        account: AccountId,
        /// Recipe id.
        recipe_id: RecipeId,
        /// New craft id.
        active_craft_id: ActiveCraftId,
        /// Batch size.
        craft_amount: u8,
    },
    /// A probabilistic craft is waiting on the randomness authority.
    RandomnessRequested {
        /// Correlation id.
        request_id: RequestId,
        /// Waiting craft.
        active_craft_id: ActiveCraftId,
    },
    /// A craft settled.
    CraftCompleted {
        /// Crafting account.
        account: AccountId,
        /// Recipe id.
        recipe_id: RecipeId,
        /// Settled craft.
        active_craft_id: ActiveCraftId,
        /// Successful units.
        num_success: u8,
        /// Batch size.
        craft_amount: u8,
        /// `success_xp * num_success`.
        xp_earned: u64,
    },
    /// A randomness delivery matched no pending request.
    RandomnessIgnored {
        /// The unmatched id.
        request_id: RequestId,
    },
}

impl CraftingEvent {
    /// The craft this event concerns, if any.
    #[must_use]
    pub const fn active_craft_id(&self) -> Option<ActiveCraftId> {
        match self {
            Self::CraftStarted { active_craft_id, .. }
            | Self::RandomnessRequested { active_craft_id, .. }
            | Self::CraftCompleted { active_craft_id, .. } => Some(*active_craft_id),
            Self::RecipeUpdated { .. }
            | Self::RecipeEnabledChanged { .. }
            | Self::RandomnessIgnored { .. } => None,
        }
    }
}
