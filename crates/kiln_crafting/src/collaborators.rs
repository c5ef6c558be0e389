//! # Collaborator Interfaces
//!
//! The crafting engine owns recipes, active crafts and pending randomness
//! requests. Everything else (identity, authorization, attributes,
//! requirements, loot, reservations, token balances, leveling, randomness,
//! time) belongs to another system and is reached through the narrow
//! traits in this module.
//!
//! All traits take `&self` and are `Send + Sync`: collaborators are shared
//! services and synchronize internally, the same way the economy services
//! guard their state with `parking_lot` locks.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CraftingResult;
use crate::probability::RandomWord;
use crate::recipe::{
    AccountId, AccountRequirement, CallerId, ContractId, LootEntry, RequestId, ReservationHandle,
    TokenId, TokenRef, TraitCheck,
};

/// Capabilities checked by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// May author and toggle recipes.
    RecipeManager,
    /// May deliver random words.
    RandomnessAuthority,
}

/// Maps a raw caller identity to the logical account it acts for.
pub trait IdentityResolver: Send + Sync {
    /// Resolves the account for `caller`.
    ///
    /// # Errors
    ///
    /// Returns an authorization error if the caller maps to no account.
    fn resolve(&self, caller: CallerId) -> CraftingResult<AccountId>;
}

/// Capability-set authorization.
pub trait AccessControl: Send + Sync {
    /// Returns true if `caller` holds `capability`.
    fn has_capability(&self, capability: Capability, caller: CallerId) -> bool;
}

/// Global pause switch.
pub trait PauseGate: Send + Sync {
    /// Returns true while the game is paused.
    fn is_paused(&self) -> bool;
}

/// Typed attribute storage, queried for trait checks.
pub trait AttributeStore: Send + Sync {
    /// Returns true if the token satisfies `check`.
    fn check_trait(&self, contract: ContractId, token_id: TokenId, check: &TraitCheck) -> bool;
}

/// Requirement evaluation.
pub trait RequirementEngine: Send + Sync {
    /// Validates the shape of a requirement list at authoring time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequirements` if any requirement is malformed.
    fn validate_requirements(&self, requirements: &[AccountRequirement]) -> CraftingResult<()>;

    /// Returns true if `account` meets every requirement.
    fn check_requirements(&self, account: AccountId, requirements: &[AccountRequirement]) -> bool;
}

/// Loot table evaluation and granting.
pub trait LootEngine: Send + Sync {
    /// Validates a loot table and reports whether granting it is probabilistic.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLootTable` if the table is malformed.
    fn validate_loots(&self, loots: &[LootEntry]) -> CraftingResult<bool>;

    /// Grants a deterministic loot table once.
    ///
    /// # Errors
    ///
    /// Propagates mint failures.
    fn grant_loot(&self, account: AccountId, loots: &[LootEntry]) -> CraftingResult<()>;

    /// Grants a loot table once, resolving any randomness from `seed`.
    ///
    /// # Errors
    ///
    /// Propagates mint failures.
    fn grant_loot_with_seed(&self, account: AccountId, loots: &[LootEntry], seed: RandomWord) -> CraftingResult<()>;
}

/// Currency, stackable and unique token balances with burn and mint.
pub trait TokenLedger: Send + Sync {
    /// Balance of `token` held by `account` (0 or 1 for unique assets).
    fn balance_of(&self, account: AccountId, token: TokenRef) -> u64;

    /// Owner of a unique asset.
    fn owner_of(&self, contract: ContractId, token_id: TokenId) -> Option<AccountId>;

    /// Burns `amount` of `token` from `account`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if the account holds less than `amount`.
    fn burn(&self, account: AccountId, token: TokenRef, amount: u64) -> CraftingResult<()>;

    /// Mints `amount` of `token` to `account`.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the balance would overflow.
    fn mint(&self, account: AccountId, token: TokenRef, amount: u64) -> CraftingResult<()>;
}

/// Asset reservation (locking).
pub trait ReservationEngine: Send + Sync {
    /// Returns true if a unique asset is held by any reservation.
    fn is_reserved(&self, contract: ContractId, token_id: TokenId) -> bool;

    /// Quantity of a stackable item `account` currently has reserved.
    fn reserved_quantity(&self, account: AccountId, contract: ContractId, token_id: TokenId) -> u64;

    /// Reserves a unique asset.
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the asset is already reserved.
    fn reserve_unique(&self, account: AccountId, contract: ContractId, token_id: TokenId) -> CraftingResult<ReservationHandle>;

    /// Reserves `amount` units of a stackable item.
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the reservation cannot be taken.
    fn reserve_quantity(
        &self,
        account: AccountId,
        contract: ContractId,
        token_id: TokenId,
        amount: u64,
    ) -> CraftingResult<ReservationHandle>;

    /// Releases a reservation previously returned by this engine.
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the handle is unknown.
    fn release(&self, account: AccountId, token: TokenRef, handle: ReservationHandle) -> CraftingResult<()>;
}

/// Leveling / XP.
pub trait LevelingEngine: Send + Sync {
    /// Grants XP to a token.
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the token cannot earn XP.
    fn grant_xp(&self, contract: ContractId, token_id: TokenId, amount: u64) -> CraftingResult<()>;
}

/// The external randomness oracle, engine-to-authority half.
///
/// The authority-to-engine half is `CraftingEngine::fulfill_random_words`.
pub trait RandomnessAuthority: Send + Sync {
    /// Requests `count` random words and returns the correlation id the
    /// callback will carry.
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the request cannot be issued.
    fn request_random_words(&self, count: u32) -> CraftingResult<RequestId>;
}

/// Wall-clock seconds used for cooldowns.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now_secs(&self) -> u64;
}

/// [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Every collaborator the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Caller to account mapping.
    pub identity: Arc<dyn IdentityResolver>,
    /// Capability checks.
    pub access: Arc<dyn AccessControl>,
    /// Global pause.
    pub pause: Arc<dyn PauseGate>,
    /// Trait checks.
    pub attributes: Arc<dyn AttributeStore>,
    /// Requirement validation and evaluation.
    pub requirements: Arc<dyn RequirementEngine>,
    /// Loot validation and granting.
    pub loot: Arc<dyn LootEngine>,
    /// Token balances, burn and mint.
    pub ledger: Arc<dyn TokenLedger>,
    /// Asset reservations.
    pub reservations: Arc<dyn ReservationEngine>,
    /// XP grants.
    pub leveling: Arc<dyn LevelingEngine>,
    /// Randomness requests.
    pub randomness: Arc<dyn RandomnessAuthority>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
