//! # Crafting Error Types
//!
//! All errors that can occur in the crafting engine.
//!
//! Every error is a whole-operation failure: the engine guarantees that an
//! operation returning `Err` left no trace in engine state or in any
//! collaborator.

use thiserror::Error;

use crate::collaborators::Capability;
use crate::recipe::{AccountId, ActiveCraftId, CallerId, ContractId, RecipeId, TokenId, TokenKind};

/// Coarse classification of a [`CraftingError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing capability, ownership mismatch, wrong caller.
    Authorization,
    /// Malformed recipe, length/amount/kind mismatch, unknown ids.
    Validation,
    /// Recipe disabled or ineligible, craft already settled, paused.
    State,
    /// Insufficient balance or quantity.
    Resource,
    /// Invalid configuration file.
    Config,
}

/// Errors that can occur in the crafting engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CraftingError {
    /// Caller lacks the capability required by the operation.
    #[error("caller {caller} is missing capability {capability:?}")]
    MissingCapability {
        /// The capability that was required.
        capability: Capability,
        /// The caller that was rejected.
        caller: CallerId,
    },

    /// A supplied unique asset is not owned by the crafting account.
    #[error("input {index}: token {contract}/{token_id} is not owned by account {account}")]
    NotOwner {
        /// Positional input index.
        index: usize,
        /// Contract of the supplied token.
        contract: ContractId,
        /// Id of the supplied token.
        token_id: TokenId,
        /// The crafting account.
        account: AccountId,
    },

    /// The caller does not map to any account.
    #[error("caller {0} does not resolve to an account")]
    UnknownCaller(CallerId),

    /// Recipe definitions must carry at least one input.
    #[error("recipe {0} has no inputs")]
    EmptyInputs(RecipeId),

    /// Recipe definitions must carry at least one loot entry.
    #[error("recipe {0} has no loots")]
    EmptyLoots(RecipeId),

    /// A recipe input is malformed.
    #[error("recipe {recipe_id} input {index}: {reason}")]
    InvalidRecipeInput {
        /// The recipe being authored.
        recipe_id: RecipeId,
        /// Positional input index.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A basis-point value exceeded 10000.
    #[error("probability {0} is out of range (0-10000)")]
    InvalidBasisPoints(u32),

    /// The requirement engine rejected the requirement list.
    #[error("invalid requirements: {0}")]
    InvalidRequirements(String),

    /// The loot engine rejected the loot table.
    #[error("invalid loot table: {0}")]
    InvalidLootTable(String),

    /// No recipe was ever defined under this id.
    #[error("recipe not found: {0}")]
    RecipeNotFound(RecipeId),

    /// Supplied input list length differs from the recipe's input list.
    #[error("recipe expects {expected} inputs, got {actual}")]
    InputCountMismatch {
        /// Number of recipe inputs.
        expected: usize,
        /// Number of supplied inputs.
        actual: usize,
    },

    /// Craft amount outside `1..=max_craft_amount`.
    #[error("craft amount {amount} is outside 1..={max}")]
    InvalidCraftAmount {
        /// Requested batch size.
        amount: u8,
        /// Configured maximum batch size.
        max: u8,
    },

    /// Supplied token kind differs from the recipe input kind.
    #[error("input {index}: expected {expected:?}, got {actual:?}")]
    TokenKindMismatch {
        /// Positional input index.
        index: usize,
        /// Kind required by the recipe.
        expected: TokenKind,
        /// Kind supplied by the caller.
        actual: TokenKind,
    },

    /// Supplied contract differs from the contract pinned on the recipe.
    #[error("input {index}: expected contract {expected}, got {actual}")]
    ContractMismatch {
        /// Positional input index.
        index: usize,
        /// Pinned contract.
        expected: ContractId,
        /// Supplied contract.
        actual: ContractId,
    },

    /// Supplied token id differs from the token id pinned on the recipe.
    #[error("input {index}: expected token id {expected}, got {actual}")]
    TokenIdMismatch {
        /// Positional input index.
        index: usize,
        /// Pinned token id.
        expected: TokenId,
        /// Supplied token id.
        actual: TokenId,
    },

    /// Supplied amount differs from `definition amount * craft amount`.
    #[error("input {index}: expected amount {expected}, got {actual}")]
    AmountMismatch {
        /// Positional input index.
        index: usize,
        /// Amount required for this batch.
        expected: u64,
        /// Amount supplied.
        actual: u64,
    },

    /// A trait check on the recipe input failed for the supplied token.
    #[error("input {index}: trait check {trait_id} failed")]
    TraitCheckFailed {
        /// Positional input index.
        index: usize,
        /// The trait that failed.
        trait_id: u32,
    },

    /// Arithmetic overflow in amount or XP math.
    #[error("arithmetic overflow in crafting calculation")]
    ArithmeticOverflow,

    /// Crafting is globally paused.
    #[error("crafting is paused")]
    Paused,

    /// Recipe is disabled, on cooldown, capped or requirements are unmet.
    #[error("recipe {recipe_id} is not available to account {account}")]
    RecipeNotAvailable {
        /// The crafting account.
        account: AccountId,
        /// The requested recipe.
        recipe_id: RecipeId,
    },

    /// The active craft id was never allocated.
    #[error("active craft not found: {0}")]
    ActiveCraftNotFound(ActiveCraftId),

    /// The active craft has already been settled.
    #[error("active craft {0} is already completed")]
    AlreadyCompleted(ActiveCraftId),

    /// A unique asset is already held by another reservation.
    #[error("input {index}: token {contract}/{token_id} is already reserved")]
    AlreadyReserved {
        /// Positional input index.
        index: usize,
        /// Contract of the supplied token.
        contract: ContractId,
        /// Id of the supplied token.
        token_id: TokenId,
    },

    /// A nested call re-entered the engine while an operation was running.
    #[error("re-entrant call into the crafting engine")]
    Reentrant,

    /// Not enough unreserved balance to cover an input.
    #[error("insufficient balance: need {required} of {contract}/{token_id}, have {available}")]
    InsufficientBalance {
        /// Contract of the token.
        contract: ContractId,
        /// Id of the token.
        token_id: TokenId,
        /// The amount required.
        required: u64,
        /// The amount available.
        available: u64,
    },

    /// A collaborator refused a reservation, burn or mint.
    #[error("collaborator failure: {0}")]
    Collaborator(String),

    /// Invalid configuration file or recipe book.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CraftingError {
    /// Returns the coarse classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCapability { .. } | Self::NotOwner { .. } | Self::UnknownCaller(_) => {
                ErrorKind::Authorization
            }
            Self::EmptyInputs(_)
            | Self::EmptyLoots(_)
            | Self::InvalidRecipeInput { .. }
            | Self::InvalidBasisPoints(_)
            | Self::InvalidRequirements(_)
            | Self::InvalidLootTable(_)
            | Self::RecipeNotFound(_)
            | Self::InputCountMismatch { .. }
            | Self::InvalidCraftAmount { .. }
            | Self::TokenKindMismatch { .. }
            | Self::ContractMismatch { .. }
            | Self::TokenIdMismatch { .. }
            | Self::AmountMismatch { .. }
            | Self::TraitCheckFailed { .. }
            | Self::ArithmeticOverflow
            | Self::ActiveCraftNotFound(_) => ErrorKind::Validation,
            Self::Paused
            | Self::RecipeNotAvailable { .. }
            | Self::AlreadyCompleted(_)
            | Self::AlreadyReserved { .. }
            | Self::Reentrant => ErrorKind::State,
            Self::InsufficientBalance { .. } | Self::Collaborator(_) => ErrorKind::Resource,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}

/// Result type for crafting operations.
pub type CraftingResult<T> = Result<T, CraftingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = CraftingError::MissingCapability {
            capability: Capability::RecipeManager,
            caller: 7,
        };
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(CraftingError::RecipeNotFound(3).kind(), ErrorKind::Validation);
        assert_eq!(CraftingError::Paused.kind(), ErrorKind::State);
        assert_eq!(
            CraftingError::InsufficientBalance {
                contract: 1,
                token_id: 0,
                required: 10,
                available: 2,
            }
            .kind(),
            ErrorKind::Resource
        );
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = CraftingError::InputCountMismatch { expected: 2, actual: 1 };
        assert_eq!(err.to_string(), "recipe expects 2 inputs, got 1");
    }
}
