//! # Recipe Data Model
//!
//! Recipes are operator-defined templates: positional inputs, account
//! requirements, a loot table and the probabilities that decide how a
//! batch settles. Everything here is plain data with serde support so
//! recipes can be authored in TOML recipe books.
//!
//! ## Example
//!
//! ```rust,ignore
//! let recipe = RecipeDefinition::new(
//!     vec![
//!         RecipeInput::currency(GOLD, 10),
//!         RecipeInput::stackable(HERBS, POTION_BASE, 2)
//!             .with_burn_probabilities(BasisPoints::new(5000)?, BasisPoints::MAX),
//!     ],
//!     vec![LootEntry::stackable(POTIONS, HEALING, 1)],
//! )
//! .with_success_probability(BasisPoints::new(7500)?);
//! ```

use serde::{Deserialize, Serialize};

use crate::basis_points::BasisPoints;

/// Logical player account.
pub type AccountId = u64;

/// Raw caller identity, resolved to an [`AccountId`] or checked for capabilities.
pub type CallerId = u64;

/// Token contract identifier.
pub type ContractId = u32;

/// Token identifier within a contract. Currency uses 0.
pub type TokenId = u64;

/// Unique identifier for a recipe.
pub type RecipeId = u32;

/// Unique identifier for an active craft. Allocated from 1 upwards.
pub type ActiveCraftId = u64;

/// Randomness request identifier issued by the randomness authority.
pub type RequestId = u64;

/// Reservation handle issued by the reservation engine. 0 = no reservation.
pub type ReservationHandle = u64;

const fn default_true() -> bool {
    true
}

const fn always() -> BasisPoints {
    BasisPoints::MAX
}

/// The kind of token a recipe input accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Fungible currency. Burned at craft start.
    Currency,
    /// Unique asset. Reserved for the duration of the craft.
    UniqueAsset,
    /// Stackable item. Burned at start if consumable, otherwise reserved.
    StackableItem,
}

/// A concrete token: kind, contract and id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRef {
    /// Token kind.
    pub kind: TokenKind,
    /// Token contract.
    pub contract: ContractId,
    /// Token id (0 for currency).
    #[serde(default)]
    pub token_id: TokenId,
}

impl TokenRef {
    /// A currency token.
    #[inline]
    #[must_use]
    pub const fn currency(contract: ContractId) -> Self {
        Self { kind: TokenKind::Currency, contract, token_id: 0 }
    }

    /// A unique asset.
    #[inline]
    #[must_use]
    pub const fn unique_asset(contract: ContractId, token_id: TokenId) -> Self {
        Self { kind: TokenKind::UniqueAsset, contract, token_id }
    }

    /// A stackable item.
    #[inline]
    #[must_use]
    pub const fn stackable(contract: ContractId, token_id: TokenId) -> Self {
        Self { kind: TokenKind::StackableItem, contract, token_id }
    }
}

/// One positional input supplied by the player when starting a craft.
///
/// A slot whose recipe input is not `required` may be skipped by
/// supplying an amount of 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftInput {
    /// The supplied token.
    pub token: TokenRef,
    /// The supplied amount (`definition amount * craft amount`, or 1 for unique assets).
    pub amount: u64,
}

impl CraftInput {
    /// Creates a craft input.
    #[inline]
    #[must_use]
    pub const fn new(token: TokenRef, amount: u64) -> Self {
        Self { token, amount }
    }

    /// A skipped optional slot.
    #[inline]
    #[must_use]
    pub const fn skipped(token: TokenRef) -> Self {
        Self { token, amount: 0 }
    }

    /// Returns true if this slot was skipped.
    #[inline]
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.amount == 0
    }
}

/// Comparison performed by a trait check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitCheckOp {
    /// Trait value equals `value`.
    Equal,
    /// Trait value differs from `value`.
    NotEqual,
    /// Trait value is strictly greater than `value`.
    GreaterThan,
    /// Trait value is strictly less than `value`.
    LessThan,
    /// Trait is present on the token.
    HasTrait,
    /// Trait is absent from the token.
    NotHasTrait,
}

/// A trait condition a supplied token must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitCheck {
    /// The trait to inspect.
    pub trait_id: u32,
    /// The comparison.
    pub op: TraitCheckOp,
    /// Operand for comparisons.
    #[serde(default)]
    pub value: i64,
}

impl TraitCheck {
    /// Creates a trait check.
    #[inline]
    #[must_use]
    pub const fn new(trait_id: u32, op: TraitCheckOp, value: i64) -> Self {
        Self { trait_id, op, value }
    }
}

/// An account requirement. Opaque to the engine; interpreted by the
/// requirement engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRequirement {
    /// Requirement type understood by the requirement engine.
    pub requirement_id: u32,
    /// Requirement parameters.
    #[serde(default)]
    pub params: Vec<i64>,
}

/// What a loot entry grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootKind {
    /// Minted currency.
    Currency,
    /// A freshly minted unique asset.
    UniqueAsset,
    /// Minted stackable items.
    StackableItem,
    /// Another loot table, evaluated by the loot engine.
    LootTable,
}

/// One entry of a recipe's loot table. Opaque to the engine; validated
/// and granted by the loot engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootEntry {
    /// What is granted.
    pub kind: LootKind,
    /// Contract (or loot table id for `LootTable`).
    pub contract: ContractId,
    /// Token id.
    #[serde(default)]
    pub token_id: TokenId,
    /// Amount granted.
    pub amount: u64,
    /// Selection weight. 0 means the entry is always granted.
    #[serde(default)]
    pub weight: u32,
}

impl LootEntry {
    /// A guaranteed stackable item drop.
    #[inline]
    #[must_use]
    pub const fn stackable(contract: ContractId, token_id: TokenId, amount: u64) -> Self {
        Self { kind: LootKind::StackableItem, contract, token_id, amount, weight: 0 }
    }

    /// A guaranteed currency drop.
    #[inline]
    #[must_use]
    pub const fn currency(contract: ContractId, amount: u64) -> Self {
        Self { kind: LootKind::Currency, contract, token_id: 0, amount, weight: 0 }
    }

    /// Sets the selection weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// One positional input of a recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeInput {
    /// Accepted token kind.
    pub kind: TokenKind,
    /// Pinned contract, if any.
    #[serde(default)]
    pub contract: Option<ContractId>,
    /// Pinned token id, if any.
    #[serde(default)]
    pub token_id: Option<TokenId>,
    /// Amount required per craft unit (1 for unique assets).
    pub amount: u64,
    /// Trait conditions the supplied token must satisfy.
    #[serde(default)]
    pub trait_checks: Vec<TraitCheck>,
    /// Whether the slot must be filled.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Burn at craft start (stackable items only; currency always burns).
    #[serde(default)]
    pub consumable: bool,
    /// Per-unit burn chance on a successful unit (reserved stackables only).
    #[serde(default)]
    pub success_burn_probability: BasisPoints,
    /// Per-unit burn chance on a failed unit (reserved stackables only).
    #[serde(default)]
    pub failure_burn_probability: BasisPoints,
    /// Share of the craft's XP granted to the input token.
    #[serde(default)]
    pub xp_earned_percent: BasisPoints,
}

impl RecipeInput {
    fn base(kind: TokenKind, contract: Option<ContractId>, token_id: Option<TokenId>, amount: u64) -> Self {
        Self {
            kind,
            contract,
            token_id,
            amount,
            trait_checks: Vec::new(),
            required: true,
            consumable: false,
            success_burn_probability: BasisPoints::ZERO,
            failure_burn_probability: BasisPoints::ZERO,
            xp_earned_percent: BasisPoints::ZERO,
        }
    }

    /// A currency input pinned to `contract`.
    #[must_use]
    pub fn currency(contract: ContractId, amount: u64) -> Self {
        let mut input = Self::base(TokenKind::Currency, Some(contract), Some(0), amount);
        input.consumable = true;
        input
    }

    /// A unique asset input from `contract` (any token id).
    #[must_use]
    pub fn unique_asset(contract: ContractId) -> Self {
        Self::base(TokenKind::UniqueAsset, Some(contract), None, 1)
    }

    /// A stackable item input pinned to `contract`/`token_id`.
    #[must_use]
    pub fn stackable(contract: ContractId, token_id: TokenId, amount: u64) -> Self {
        Self::base(TokenKind::StackableItem, Some(contract), Some(token_id), amount)
    }

    /// Marks the input as burned at craft start.
    #[must_use]
    pub fn consumable(mut self) -> Self {
        self.consumable = true;
        self
    }

    /// Marks the slot as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the post-outcome burn probabilities.
    #[must_use]
    pub fn with_burn_probabilities(mut self, on_success: BasisPoints, on_failure: BasisPoints) -> Self {
        self.success_burn_probability = on_success;
        self.failure_burn_probability = on_failure;
        self
    }

    /// Sets the XP share granted to the input token.
    #[must_use]
    pub fn with_xp_share(mut self, share: BasisPoints) -> Self {
        self.xp_earned_percent = share;
        self
    }

    /// Adds a trait check.
    #[must_use]
    pub fn with_trait_check(mut self, check: TraitCheck) -> Self {
        self.trait_checks.push(check);
        self
    }

    /// True for a stackable item that is reserved at start and whose units
    /// are burned (then partially minted back) after the outcome is known.
    ///
    /// This is distinct from `consumable`, which burns at craft start.
    #[inline]
    #[must_use]
    pub fn burns_on_outcome(&self) -> bool {
        self.kind == TokenKind::StackableItem
            && !self.consumable
            && (!self.success_burn_probability.is_zero() || !self.failure_burn_probability.is_zero())
    }

    /// True if either burn probability is strictly between 0% and 100%.
    #[inline]
    #[must_use]
    pub fn has_uncertain_burn(&self) -> bool {
        self.success_burn_probability.is_uncertain() || self.failure_burn_probability.is_uncertain()
    }
}

/// A complete recipe definition. Overwritten wholesale on update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    /// Whether the recipe can currently be crafted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Account requirements checked at craft time.
    #[serde(default)]
    pub requirements: Vec<AccountRequirement>,
    /// Positional inputs.
    pub inputs: Vec<RecipeInput>,
    /// Loot table granted once per successful unit.
    pub loots: Vec<LootEntry>,
    /// Per-unit success probability.
    #[serde(default = "always")]
    pub base_success_probability: BasisPoints,
    /// Seconds between completions (0 = no cooldown).
    #[serde(default)]
    pub cooldown_seconds: u64,
    /// XP per successful unit.
    #[serde(default)]
    pub success_xp: u64,
    /// Maximum completed units per account (0 = unlimited).
    #[serde(default)]
    pub max_completions: u32,
}

impl RecipeDefinition {
    /// Creates an enabled, always-succeeding recipe with no requirements,
    /// cooldown, XP or completion cap.
    #[must_use]
    pub fn new(inputs: Vec<RecipeInput>, loots: Vec<LootEntry>) -> Self {
        Self {
            enabled: true,
            requirements: Vec::new(),
            inputs,
            loots,
            base_success_probability: BasisPoints::MAX,
            cooldown_seconds: 0,
            success_xp: 0,
            max_completions: 0,
        }
    }

    /// Sets the per-unit success probability.
    #[must_use]
    pub const fn with_success_probability(mut self, probability: BasisPoints) -> Self {
        self.base_success_probability = probability;
        self
    }

    /// Sets the cooldown.
    #[must_use]
    pub const fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    /// Sets XP awarded per successful unit.
    #[must_use]
    pub const fn with_success_xp(mut self, xp: u64) -> Self {
        self.success_xp = xp;
        self
    }

    /// Sets the completion cap.
    #[must_use]
    pub const fn with_max_completions(mut self, max: u32) -> Self {
        self.max_completions = max;
        self
    }

    /// Sets the account requirements.
    #[must_use]
    pub fn with_requirements(mut self, requirements: Vec<AccountRequirement>) -> Self {
        self.requirements = requirements;
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
