//! # In-Memory Collaborators
//!
//! Self-contained implementations of every collaborator trait, backed by
//! `parking_lot` locks. Used by the test suites and benchmarks, and handy
//! for embedding the engine in a single-process server.
//!
//! [`InMemoryWorld`] wires one of each together:
//!
//! ```rust,ignore
//! let world = InMemoryWorld::new(42);
//! world.access.grant(Capability::RecipeManager, ADMIN);
//! world.ledger.credit(ALICE, TokenRef::currency(GOLD), 1_000);
//!
//! let mut engine = CraftingEngine::new(EngineConfig::default(), world.collaborators())?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::collaborators::{
    AccessControl, AttributeStore, Capability, Clock, Collaborators, IdentityResolver,
    LevelingEngine, LootEngine, PauseGate, RandomnessAuthority, RequirementEngine,
    ReservationEngine, TokenLedger,
};
use crate::error::{CraftingError, CraftingResult};
use crate::probability::RandomWord;
use crate::recipe::{
    AccountId, AccountRequirement, CallerId, ContractId, LootEntry, LootKind, RequestId,
    ReservationHandle, TokenId, TokenKind, TokenRef, TraitCheck, TraitCheckOp,
};

// =============================================================================
// LEDGER
// =============================================================================

/// A recorded ledger mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerOp {
    /// Tokens destroyed.
    Burn {
        /// Holder.
        account: AccountId,
        /// Token.
        token: TokenRef,
        /// Amount.
        amount: u64,
    },
    /// Tokens created.
    Mint {
        /// Recipient.
        account: AccountId,
        /// Token.
        token: TokenRef,
        /// Amount.
        amount: u64,
    },
}

/// Balances for fungible tokens and ownership for unique assets.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<(AccountId, TokenRef), u64>>,
    owners: RwLock<HashMap<(ContractId, TokenId), AccountId>>,
    history: Mutex<Vec<LedgerOp>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fungible balance without recording history.
    pub fn credit(&self, account: AccountId, token: TokenRef, amount: u64) {
        let mut balances = self.balances.write();
        let balance = balances.entry((account, token)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Assigns a unique asset to `account`.
    pub fn set_owner(&self, contract: ContractId, token_id: TokenId, account: AccountId) {
        self.owners.write().insert((contract, token_id), account);
    }

    /// Every burn and mint so far, in order.
    #[must_use]
    pub fn history(&self) -> Vec<LedgerOp> {
        self.history.lock().clone()
    }

    /// Total balance of every fungible token, summed over all accounts.
    #[must_use]
    pub fn total_supply(&self, token: TokenRef) -> u64 {
        self.balances
            .read()
            .iter()
            .filter(|((_, t), _)| *t == token)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, account: AccountId, token: TokenRef) -> u64 {
        match token.kind {
            TokenKind::UniqueAsset => {
                u64::from(self.owner_of(token.contract, token.token_id) == Some(account))
            }
            TokenKind::Currency | TokenKind::StackableItem => {
                self.balances.read().get(&(account, token)).copied().unwrap_or(0)
            }
        }
    }

    fn owner_of(&self, contract: ContractId, token_id: TokenId) -> Option<AccountId> {
        self.owners.read().get(&(contract, token_id)).copied()
    }

    fn burn(&self, account: AccountId, token: TokenRef, amount: u64) -> CraftingResult<()> {
        let insufficient = |available| CraftingError::InsufficientBalance {
            contract: token.contract,
            token_id: token.token_id,
            required: amount,
            available,
        };

        match token.kind {
            TokenKind::UniqueAsset => {
                let mut owners = self.owners.write();
                let key = (token.contract, token.token_id);
                if amount != 1 || owners.get(&key) != Some(&account) {
                    return Err(insufficient(0));
                }
                owners.remove(&key);
            }
            TokenKind::Currency | TokenKind::StackableItem => {
                let mut balances = self.balances.write();
                let balance = balances.entry((account, token)).or_insert(0);
                if *balance < amount {
                    return Err(insufficient(*balance));
                }
                *balance -= amount;
            }
        }

        self.history.lock().push(LedgerOp::Burn { account, token, amount });
        Ok(())
    }

    fn mint(&self, account: AccountId, token: TokenRef, amount: u64) -> CraftingResult<()> {
        match token.kind {
            TokenKind::UniqueAsset => {
                self.owners.write().insert((token.contract, token.token_id), account);
            }
            TokenKind::Currency | TokenKind::StackableItem => {
                let mut balances = self.balances.write();
                let balance = balances.entry((account, token)).or_insert(0);
                *balance = balance.checked_add(amount).ok_or(CraftingError::ArithmeticOverflow)?;
            }
        }

        self.history.lock().push(LedgerOp::Mint { account, token, amount });
        Ok(())
    }
}

// =============================================================================
// RESERVATIONS
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct QuantityHold {
    account: AccountId,
    contract: ContractId,
    token_id: TokenId,
    amount: u64,
}

/// Reservation engine with failure injection.
#[derive(Debug)]
pub struct InMemoryReservations {
    next_handle: AtomicU64,
    unique: RwLock<HashMap<(ContractId, TokenId), ReservationHandle>>,
    quantities: RwLock<HashMap<ReservationHandle, QuantityHold>>,
    failing: AtomicBool,
}

impl Default for InMemoryReservations {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReservations {
    /// Creates an engine with no reservations. Handles start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            unique: RwLock::new(HashMap::new()),
            quantities: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent reserve call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of reservations currently held.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.unique.read().len() + self.quantities.read().len()
    }

    fn allocate(&self) -> CraftingResult<ReservationHandle> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CraftingError::Collaborator("reservation engine unavailable".to_string()));
        }
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }
}

impl ReservationEngine for InMemoryReservations {
    fn is_reserved(&self, contract: ContractId, token_id: TokenId) -> bool {
        self.unique.read().contains_key(&(contract, token_id))
    }

    fn reserved_quantity(&self, account: AccountId, contract: ContractId, token_id: TokenId) -> u64 {
        self.quantities
            .read()
            .values()
            .filter(|h| h.account == account && h.contract == contract && h.token_id == token_id)
            .map(|h| h.amount)
            .sum()
    }

    fn reserve_unique(&self, _account: AccountId, contract: ContractId, token_id: TokenId) -> CraftingResult<ReservationHandle> {
        let mut unique = self.unique.write();
        if unique.contains_key(&(contract, token_id)) {
            return Err(CraftingError::Collaborator(format!(
                "token {contract}/{token_id} is already reserved"
            )));
        }
        let handle = self.allocate()?;
        unique.insert((contract, token_id), handle);
        Ok(handle)
    }

    fn reserve_quantity(
        &self,
        account: AccountId,
        contract: ContractId,
        token_id: TokenId,
        amount: u64,
    ) -> CraftingResult<ReservationHandle> {
        let handle = self.allocate()?;
        self.quantities.write().insert(
            handle,
            QuantityHold { account, contract, token_id, amount },
        );
        Ok(handle)
    }

    fn release(&self, account: AccountId, token: TokenRef, handle: ReservationHandle) -> CraftingResult<()> {
        let released = match token.kind {
            TokenKind::UniqueAsset => {
                let mut unique = self.unique.write();
                let key = (token.contract, token.token_id);
                if unique.get(&key) == Some(&handle) {
                    unique.remove(&key);
                    true
                } else {
                    false
                }
            }
            TokenKind::Currency | TokenKind::StackableItem => {
                let mut quantities = self.quantities.write();
                match quantities.get(&handle) {
                    Some(hold) if hold.account == account => {
                        quantities.remove(&handle);
                        true
                    }
                    _ => false,
                }
            }
        };

        if released {
            Ok(())
        } else {
            Err(CraftingError::Collaborator(format!("unknown reservation handle {handle}")))
        }
    }
}

// =============================================================================
// ATTRIBUTES, REQUIREMENTS, LEVELING
// =============================================================================

/// Integer trait values per token.
#[derive(Debug, Default)]
pub struct InMemoryAttributes {
    traits: RwLock<HashMap<(ContractId, TokenId, u32), i64>>,
}

impl InMemoryAttributes {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a trait value on a token.
    pub fn set_trait(&self, contract: ContractId, token_id: TokenId, trait_id: u32, value: i64) {
        self.traits.write().insert((contract, token_id, trait_id), value);
    }
}

impl AttributeStore for InMemoryAttributes {
    fn check_trait(&self, contract: ContractId, token_id: TokenId, check: &TraitCheck) -> bool {
        let value = self.traits.read().get(&(contract, token_id, check.trait_id)).copied();
        match (check.op, value) {
            (TraitCheckOp::HasTrait, v) => v.is_some(),
            (TraitCheckOp::NotHasTrait, v) => v.is_none(),
            (_, None) => false,
            (TraitCheckOp::Equal, Some(v)) => v == check.value,
            (TraitCheckOp::NotEqual, Some(v)) => v != check.value,
            (TraitCheckOp::GreaterThan, Some(v)) => v > check.value,
            (TraitCheckOp::LessThan, Some(v)) => v < check.value,
        }
    }
}

/// Requirement engine where every account qualifies unless blocked.
///
/// Requirement id 0 is reserved and rejected at authoring time.
#[derive(Debug, Default)]
pub struct InMemoryRequirements {
    blocked: RwLock<HashSet<AccountId>>,
}

impl InMemoryRequirements {
    /// Creates an engine with no blocked accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `account` fail every non-empty requirement list.
    pub fn block(&self, account: AccountId) {
        self.blocked.write().insert(account);
    }

    /// Lifts a block.
    pub fn unblock(&self, account: AccountId) {
        self.blocked.write().remove(&account);
    }
}

impl RequirementEngine for InMemoryRequirements {
    fn validate_requirements(&self, requirements: &[AccountRequirement]) -> CraftingResult<()> {
        match requirements.iter().find(|r| r.requirement_id == 0) {
            Some(_) => Err(CraftingError::InvalidRequirements(
                "requirement id 0 is reserved".to_string(),
            )),
            None => Ok(()),
        }
    }

    fn check_requirements(&self, account: AccountId, requirements: &[AccountRequirement]) -> bool {
        requirements.is_empty() || !self.blocked.read().contains(&account)
    }
}

/// XP totals per token.
#[derive(Debug, Default)]
pub struct InMemoryLeveling {
    xp: RwLock<HashMap<(ContractId, TokenId), u64>>,
}

impl InMemoryLeveling {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// XP accumulated by a token.
    #[must_use]
    pub fn xp_of(&self, contract: ContractId, token_id: TokenId) -> u64 {
        self.xp.read().get(&(contract, token_id)).copied().unwrap_or(0)
    }
}

impl LevelingEngine for InMemoryLeveling {
    fn grant_xp(&self, contract: ContractId, token_id: TokenId, amount: u64) -> CraftingResult<()> {
        let mut xp = self.xp.write();
        let total = xp.entry((contract, token_id)).or_insert(0);
        *total = total.checked_add(amount).ok_or(CraftingError::ArithmeticOverflow)?;
        Ok(())
    }
}

// =============================================================================
// LOOT
// =============================================================================

/// One recorded loot grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LootGrant {
    /// Recipient.
    pub account: AccountId,
    /// Seed the grant was resolved from, `None` for deterministic grants.
    pub seed: Option<RandomWord>,
}

/// Loot engine that mints into an [`InMemoryLedger`].
///
/// Entries with weight 0 are always granted. If any entry carries a
/// weight, exactly one weighted entry is also picked per seeded grant,
/// which makes the table probabilistic.
#[derive(Debug)]
pub struct InMemoryLoot {
    ledger: Arc<InMemoryLedger>,
    grants: Mutex<Vec<LootGrant>>,
    failing: AtomicBool,
}

impl InMemoryLoot {
    /// Creates a loot engine minting into `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self {
            ledger,
            grants: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent grant fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every grant so far, in order.
    #[must_use]
    pub fn grants(&self) -> Vec<LootGrant> {
        self.grants.lock().clone()
    }

    fn mint_entry(&self, account: AccountId, entry: &LootEntry) -> CraftingResult<()> {
        let token = match entry.kind {
            LootKind::Currency => TokenRef::currency(entry.contract),
            LootKind::UniqueAsset => TokenRef::unique_asset(entry.contract, entry.token_id),
            LootKind::StackableItem => TokenRef::stackable(entry.contract, entry.token_id),
            // Nested tables are resolved by the owning loot service
            LootKind::LootTable => return Ok(()),
        };
        self.ledger.mint(account, token, entry.amount)
    }

    fn grant(&self, account: AccountId, loots: &[LootEntry], seed: Option<RandomWord>) -> CraftingResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CraftingError::Collaborator("loot engine unavailable".to_string()));
        }
        for entry in loots.iter().filter(|e| e.weight == 0) {
            self.mint_entry(account, entry)?;
        }

        if let Some(seed) = seed {
            let total: u128 = loots.iter().map(|e| u128::from(e.weight)).sum();
            if total > 0 {
                let mut pick = seed % total;
                for entry in loots.iter().filter(|e| e.weight > 0) {
                    let weight = u128::from(entry.weight);
                    if pick < weight {
                        self.mint_entry(account, entry)?;
                        break;
                    }
                    pick -= weight;
                }
            }
        }

        self.grants.lock().push(LootGrant { account, seed });
        Ok(())
    }
}

impl LootEngine for InMemoryLoot {
    fn validate_loots(&self, loots: &[LootEntry]) -> CraftingResult<bool> {
        if let Some(entry) = loots.iter().find(|e| e.amount == 0) {
            return Err(CraftingError::InvalidLootTable(format!(
                "entry for contract {} grants nothing",
                entry.contract
            )));
        }
        Ok(loots.iter().any(|e| e.weight > 0))
    }

    fn grant_loot(&self, account: AccountId, loots: &[LootEntry]) -> CraftingResult<()> {
        self.grant(account, loots, None)
    }

    fn grant_loot_with_seed(&self, account: AccountId, loots: &[LootEntry], seed: RandomWord) -> CraftingResult<()> {
        self.grant(account, loots, Some(seed))
    }
}

// =============================================================================
// RANDOMNESS, ACCESS, PAUSE, IDENTITY, CLOCK
// =============================================================================

/// Randomness authority that records requests and produces words from a
/// seeded ChaCha stream for tests to deliver.
#[derive(Debug)]
pub struct InMemoryRandomness {
    next_request: AtomicU64,
    requests: Mutex<Vec<(RequestId, u32)>>,
    rng: Mutex<ChaCha8Rng>,
}

impl InMemoryRandomness {
    /// Creates an authority whose words are derived from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            next_request: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Every `(request_id, word_count)` issued so far.
    #[must_use]
    pub fn requests(&self) -> Vec<(RequestId, u32)> {
        self.requests.lock().clone()
    }

    /// The most recent request id.
    #[must_use]
    pub fn last_request(&self) -> Option<RequestId> {
        self.requests.lock().last().map(|(id, _)| *id)
    }

    /// Draws the next random word.
    #[must_use]
    pub fn next_word(&self) -> RandomWord {
        self.rng.lock().gen::<u128>()
    }
}

impl RandomnessAuthority for InMemoryRandomness {
    fn request_random_words(&self, count: u32) -> CraftingResult<RequestId> {
        let id = self.next_request.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((id, count));
        Ok(id)
    }
}

/// Capability grants.
#[derive(Debug, Default)]
pub struct InMemoryAccess {
    grants: RwLock<HashSet<(Capability, CallerId)>>,
}

impl InMemoryAccess {
    /// Creates an access list with no grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `capability` to `caller`.
    pub fn grant(&self, capability: Capability, caller: CallerId) {
        self.grants.write().insert((capability, caller));
    }

    /// Revokes `capability` from `caller`.
    pub fn revoke(&self, capability: Capability, caller: CallerId) {
        self.grants.write().remove(&(capability, caller));
    }
}

impl AccessControl for InMemoryAccess {
    fn has_capability(&self, capability: Capability, caller: CallerId) -> bool {
        self.grants.read().contains(&(capability, caller))
    }
}

/// Pause switch.
#[derive(Debug, Default)]
pub struct InMemoryPause {
    paused: AtomicBool,
}

impl InMemoryPause {
    /// Creates an unpaused switch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause flag.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}

impl PauseGate for InMemoryPause {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Caller to account mapping.
///
/// Explicit links win. Unlinked callers act as themselves unless the
/// resolver is strict, in which case they are rejected.
#[derive(Debug, Default)]
pub struct InMemoryIdentity {
    links: RwLock<HashMap<CallerId, AccountId>>,
    strict: bool,
}

impl InMemoryIdentity {
    /// Creates a passthrough resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver that rejects unlinked callers.
    #[must_use]
    pub fn strict() -> Self {
        Self { links: RwLock::new(HashMap::new()), strict: true }
    }

    /// Makes `caller` act for `account`.
    pub fn link(&self, caller: CallerId, account: AccountId) {
        self.links.write().insert(caller, account);
    }
}

impl IdentityResolver for InMemoryIdentity {
    fn resolve(&self, caller: CallerId) -> CraftingResult<AccountId> {
        match self.links.read().get(&caller) {
            Some(account) => Ok(*account),
            None if self.strict => Err(CraftingError::UnknownCaller(caller)),
            None => Ok(caller),
        }
    }
}

/// Settable clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    /// Sets the time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the time forward.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// =============================================================================
// WORLD
// =============================================================================

/// One of every in-memory collaborator, sharing a single ledger.
#[derive(Debug, Clone)]
pub struct InMemoryWorld {
    /// Caller mapping.
    pub identity: Arc<InMemoryIdentity>,
    /// Capability grants.
    pub access: Arc<InMemoryAccess>,
    /// Pause switch.
    pub pause: Arc<InMemoryPause>,
    /// Trait values.
    pub attributes: Arc<InMemoryAttributes>,
    /// Requirement engine.
    pub requirements: Arc<InMemoryRequirements>,
    /// Loot engine, minting into `ledger`.
    pub loot: Arc<InMemoryLoot>,
    /// Balances and ownership.
    pub ledger: Arc<InMemoryLedger>,
    /// Reservations.
    pub reservations: Arc<InMemoryReservations>,
    /// XP.
    pub leveling: Arc<InMemoryLeveling>,
    /// Randomness authority.
    pub randomness: Arc<InMemoryRandomness>,
    /// Clock, starting at 1000.
    pub clock: Arc<ManualClock>,
}

impl InMemoryWorld {
    /// Creates a world whose random words derive from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        Self {
            identity: Arc::new(InMemoryIdentity::new()),
            access: Arc::new(InMemoryAccess::new()),
            pause: Arc::new(InMemoryPause::new()),
            attributes: Arc::new(InMemoryAttributes::new()),
            requirements: Arc::new(InMemoryRequirements::new()),
            loot: Arc::new(InMemoryLoot::new(Arc::clone(&ledger))),
            ledger,
            reservations: Arc::new(InMemoryReservations::new()),
            leveling: Arc::new(InMemoryLeveling::new()),
            randomness: Arc::new(InMemoryRandomness::new(seed)),
            clock: Arc::new(ManualClock::new(1_000)),
        }
    }

    /// Type-erased handles for the engine.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            identity: self.identity.clone(),
            access: self.access.clone(),
            pause: self.pause.clone(),
            attributes: self.attributes.clone(),
            requirements: self.requirements.clone(),
            loot: self.loot.clone(),
            ledger: self.ledger.clone(),
            reservations: self.reservations.clone(),
            leveling: self.leveling.clone(),
            randomness: self.randomness.clone(),
            clock: self.clock.clone(),
        }
    }
}
