//! # Crafting Engine
//!
//! **The single engine context.** Owns the recipe registry, every active
//! craft and the pending randomness requests, and drives them through the
//! collaborators.
//!
//! ## Craft Flow
//!
//! ```text
//! craft() ──> pause / identity / amount / eligibility
//!                │
//!                ▼
//!         take inputs (validate, then burn / reserve)
//!                │
//!        ┌───────┴────────────────┐
//!        │ deterministic          │ needs randomness
//!        ▼                        ▼
//!    settle now            request words, park craft
//!                                 │
//!                                 ▼
//!                   fulfill_random_words() ──> settle once
//! ```
//!
//! Every `&mut self` method is one atomic unit. Validation, including the
//! arithmetic of the eventual settlement, happens before any collaborator is
//! asked to change anything. A settlement that fails before its first effect
//! is rolled back, so the `Err` return leaves no trace. A collaborator that
//! fails partway through a settlement leaves its earlier effects in place
//! and the craft IN_PROGRESS. Wrap the engine in [`crate::shared::SharedCraftingEngine`]
//! to share it across threads.

use crate::active::{ActiveCraft, ActiveCraftStore};
use crate::collaborators::{Capability, Collaborators};
use crate::config::EngineConfig;
use crate::correlator::{PendingRandomnessRequest, RandomnessCorrelator};
use crate::eligibility::is_recipe_available;
use crate::error::{CraftingError, CraftingResult};
use crate::events::CraftingEvent;
use crate::probability::{weighted_coin_flip_batch, RandomWord};
use crate::recipe::{
    AccountId, ActiveCraftId, CallerId, CraftInput, RecipeDefinition, RecipeId, RequestId,
};
use crate::registry::{RecipeBook, RecipeRegistry};
use crate::settlement::{self, SettlementFailure, SettlementReport};

/// The crafting engine.
#[derive(Debug)]
pub struct CraftingEngine {
    config: EngineConfig,
    collaborators: Collaborators,
    registry: RecipeRegistry,
    crafts: ActiveCraftStore,
    correlator: RandomnessCorrelator,
    events: Vec<CraftingEvent>,
}

impl CraftingEngine {
    /// Creates an engine with no recipes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration is invalid.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> CraftingResult<Self> {
        config.validate()?;
        let events = Vec::with_capacity(config.event_buffer_capacity);
        Ok(Self {
            config,
            collaborators,
            registry: RecipeRegistry::new(),
            crafts: ActiveCraftStore::new(),
            correlator: RandomnessCorrelator::new(),
            events,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn require(&self, capability: Capability, caller: CallerId) -> CraftingResult<()> {
        if self.collaborators.access.has_capability(capability, caller) {
            Ok(())
        } else {
            Err(CraftingError::MissingCapability { capability, caller })
        }
    }

    // ========================================================================
    // Recipe administration
    // ========================================================================

    /// Validates and stores a recipe, replacing any previous definition.
    ///
    /// Returns the cached `needs_randomness` flag.
    ///
    /// # Errors
    ///
    /// - `MissingCapability` without [`Capability::RecipeManager`]
    /// - any validation error from [`RecipeRegistry::validate`]
    pub fn set_recipe_definition(
        &mut self,
        caller: CallerId,
        recipe_id: RecipeId,
        definition: RecipeDefinition,
    ) -> CraftingResult<bool> {
        self.require(Capability::RecipeManager, caller)?;

        let needs_randomness = self.registry.set_definition(
            recipe_id,
            definition,
            self.collaborators.requirements.as_ref(),
            self.collaborators.loot.as_ref(),
        )?;

        tracing::info!(
            "Recipe {} defined (needs_randomness={})",
            recipe_id,
            needs_randomness
        );
        self.events.push(CraftingEvent::RecipeUpdated { recipe_id, needs_randomness });

        Ok(needs_randomness)
    }

    /// Enables or disables an existing recipe.
    ///
    /// # Errors
    ///
    /// - `MissingCapability` without [`Capability::RecipeManager`]
    /// - `RecipeNotFound` if the recipe was never defined
    pub fn set_recipe_enabled(&mut self, caller: CallerId, recipe_id: RecipeId, enabled: bool) -> CraftingResult<()> {
        self.require(Capability::RecipeManager, caller)?;
        self.registry.set_enabled(recipe_id, enabled)?;

        tracing::info!("Recipe {} enabled={}", recipe_id, enabled);
        self.events.push(CraftingEvent::RecipeEnabledChanged { recipe_id, enabled });

        Ok(())
    }

    /// Applies every entry of a recipe book. Either every entry is stored
    /// or none is.
    ///
    /// Returns the number of recipes applied.
    ///
    /// # Errors
    ///
    /// - `MissingCapability` without [`Capability::RecipeManager`]
    /// - the first validation error of any entry
    pub fn load_recipe_book(&mut self, caller: CallerId, book: &RecipeBook) -> CraftingResult<usize> {
        self.require(Capability::RecipeManager, caller)?;

        let flags = book
            .recipes
            .iter()
            .map(|entry| {
                RecipeRegistry::validate(
                    entry.recipe_id,
                    &entry.definition,
                    self.collaborators.requirements.as_ref(),
                    self.collaborators.loot.as_ref(),
                )
            })
            .collect::<CraftingResult<Vec<bool>>>()?;

        for (entry, needs_randomness) in book.recipes.iter().zip(flags) {
            self.registry.store(entry.recipe_id, entry.definition.clone(), needs_randomness);
            self.events.push(CraftingEvent::RecipeUpdated {
                recipe_id: entry.recipe_id,
                needs_randomness,
            });
        }

        tracing::info!("Recipe book loaded: {} recipes", book.recipes.len());
        Ok(book.recipes.len())
    }

    // ========================================================================
    // Crafting
    // ========================================================================

    /// Returns true if `account` may currently craft `recipe_id`.
    ///
    /// Unknown recipes are never available.
    #[must_use]
    pub fn is_recipe_available(&self, account: AccountId, recipe_id: RecipeId) -> bool {
        self.registry.definition(recipe_id).is_some_and(|definition| {
            is_recipe_available(
                definition,
                account,
                recipe_id,
                &self.crafts,
                self.collaborators.requirements.as_ref(),
                self.collaborators.clock.now_secs(),
            )
        })
    }

    /// Starts a craft of `craft_amount` units.
    ///
    /// Deterministic recipes settle before this returns. Probabilistic
    /// recipes issue a randomness request and stay IN_PROGRESS until
    /// [`CraftingEngine::fulfill_random_words`] delivers it.
    ///
    /// # Errors
    ///
    /// - `Paused` while the game is paused
    /// - `UnknownCaller` if the caller maps to no account
    /// - `RecipeNotFound`, `InvalidCraftAmount`, `RecipeNotAvailable`
    /// - any input validation or collaborator error from taking the inputs
    pub fn craft(
        &mut self,
        caller: CallerId,
        recipe_id: RecipeId,
        inputs: &[CraftInput],
        craft_amount: u8,
    ) -> CraftingResult<ActiveCraftId> {
        if self.collaborators.pause.is_paused() {
            return Err(CraftingError::Paused);
        }
        let account = self.collaborators.identity.resolve(caller)?;

        let recipe = self
            .registry
            .get(recipe_id)
            .ok_or(CraftingError::RecipeNotFound(recipe_id))?;

        if craft_amount == 0 || craft_amount > self.config.max_craft_amount {
            return Err(CraftingError::InvalidCraftAmount {
                amount: craft_amount,
                max: self.config.max_craft_amount,
            });
        }

        let now = self.collaborators.clock.now_secs();
        if !is_recipe_available(
            &recipe.definition,
            account,
            recipe_id,
            &self.crafts,
            self.collaborators.requirements.as_ref(),
            now,
        ) {
            return Err(CraftingError::RecipeNotAvailable { account, recipe_id });
        }
        settlement::check_settlement_bounds(&recipe.definition, craft_amount)?;
        self.crafts.check_completion(account, recipe_id, craft_amount)?;

        let reserved = settlement::take_inputs(
            account,
            &recipe.definition,
            inputs,
            craft_amount,
            &self.collaborators,
        )?;

        let request_id = if recipe.needs_randomness {
            match self.request_randomness() {
                Ok(request_id) => Some(request_id),
                Err(err) => {
                    tracing::warn!("Randomness request for recipe {} failed: {}", recipe_id, err);
                    settlement::return_inputs(account, &reserved, &self.collaborators);
                    return Err(err);
                }
            }
        } else {
            None
        };

        let active_craft_id = match self.crafts.start(account, recipe_id, reserved.clone(), craft_amount, now) {
            Ok(id) => id,
            Err(err) => {
                settlement::return_inputs(account, &reserved, &self.collaborators);
                return Err(err);
            }
        };

        tracing::info!(
            "Craft {} started: account={} recipe={} amount={}",
            active_craft_id,
            account,
            recipe_id,
            craft_amount
        );
        self.events.push(CraftingEvent::CraftStarted {
            account,
            recipe_id,
            active_craft_id,
            craft_amount,
        });

        match request_id {
            Some(request_id) => {
                self.correlator.register(
                    request_id,
                    PendingRandomnessRequest { account, active_craft_id },
                );
                tracing::debug!(
                    "Craft {} waiting on randomness request {}",
                    active_craft_id,
                    request_id
                );
                self.events.push(CraftingEvent::RandomnessRequested {
                    request_id,
                    active_craft_id,
                });
            }
            None => {
                if let Err(failure) = self.settle(active_craft_id, false, craft_amount, 0) {
                    if failure.effects_applied == 0 {
                        self.roll_back_start(active_craft_id);
                    }
                    return Err(failure.error);
                }
            }
        }

        Ok(active_craft_id)
    }

    /// Undoes a craft start whose settlement failed before any effect.
    fn roll_back_start(&mut self, active_craft_id: ActiveCraftId) {
        match self.crafts.discard(active_craft_id) {
            Ok(craft) => settlement::return_inputs(craft.account, &craft.reserved, &self.collaborators),
            Err(err) => tracing::warn!("Cannot roll back craft {}: {}", active_craft_id, err),
        }
        if matches!(
            self.events.last(),
            Some(CraftingEvent::CraftStarted { active_craft_id: id, .. }) if *id == active_craft_id
        ) {
            self.events.pop();
        }
        tracing::debug!("Craft {} rolled back", active_craft_id);
    }

    fn request_randomness(&self) -> CraftingResult<RequestId> {
        let request_id = self
            .collaborators
            .randomness
            .request_random_words(self.config.random_words_per_request)?;

        if self.correlator.get(request_id).is_some() {
            return Err(CraftingError::Collaborator(format!(
                "randomness request id {request_id} is already outstanding"
            )));
        }
        Ok(request_id)
    }

    /// Delivers random words for a pending request and settles its craft.
    ///
    /// Returns `None` when the request id is unknown or was already
    /// delivered; such deliveries change nothing.
    ///
    /// A call carrying no words is malformed and fails like any other
    /// rejected call, so the pending record stays for a proper delivery.
    /// The record is also restored when settlement fails before its first
    /// effect. Once an effect went through, the record is gone for good.
    ///
    /// # Errors
    ///
    /// - `MissingCapability` without [`Capability::RandomnessAuthority`]
    /// - `Collaborator` if no word was delivered
    /// - `ArithmeticOverflow` and collaborator errors raised during settlement
    pub fn fulfill_random_words(
        &mut self,
        caller: CallerId,
        request_id: RequestId,
        words: &[RandomWord],
    ) -> CraftingResult<Option<SettlementReport>> {
        self.require(Capability::RandomnessAuthority, caller)?;
        let Some(&word) = words.first() else {
            return Err(CraftingError::Collaborator(format!(
                "randomness request {request_id} delivered no words"
            )));
        };

        let Some(pending) = self.correlator.take(request_id) else {
            tracing::warn!("Ignoring randomness for unknown request {}", request_id);
            self.events.push(CraftingEvent::RandomnessIgnored { request_id });
            return Ok(None);
        };

        let (recipe_id, craft_amount) = match self.crafts.in_progress(pending.active_craft_id) {
            Ok(craft) => (craft.recipe_id, craft.craft_amount),
            Err(err) => {
                tracing::warn!("Ignoring randomness for request {}: {}", request_id, err);
                self.events.push(CraftingEvent::RandomnessIgnored { request_id });
                return Ok(None);
            }
        };

        let outcome = self
            .registry
            .definition(recipe_id)
            .map(|definition| weighted_coin_flip_batch(word, definition.base_success_probability, craft_amount));
        let settled = match outcome {
            Some((num_success, next_seed)) => self.settle(pending.active_craft_id, true, num_success, next_seed),
            None => Err(SettlementFailure::before_effects(CraftingError::RecipeNotFound(recipe_id))),
        };

        match settled {
            Ok(report) => Ok(Some(report)),
            Err(failure) => {
                if failure.effects_applied == 0 {
                    tracing::warn!(
                        "Settlement for request {} failed before any effect, keeping it pending: {}",
                        request_id,
                        failure.error
                    );
                    self.correlator.register(request_id, pending);
                }
                Err(failure.error)
            }
        }
    }

    /// Settles an IN_PROGRESS craft and records its completion.
    ///
    /// Everything that can fail without a collaborator is checked before
    /// the first effect.
    fn settle(
        &mut self,
        active_craft_id: ActiveCraftId,
        seeded: bool,
        num_success: u8,
        seed: RandomWord,
    ) -> Result<SettlementReport, SettlementFailure> {
        let craft = self
            .crafts
            .in_progress(active_craft_id)
            .map_err(SettlementFailure::before_effects)?;
        let (account, recipe_id, craft_amount) = (craft.account, craft.recipe_id, craft.craft_amount);
        let definition = self
            .registry
            .definition(recipe_id)
            .ok_or(CraftingError::RecipeNotFound(recipe_id))
            .map_err(SettlementFailure::before_effects)?;

        let plan = settlement::plan_settlement(craft, definition, seeded, num_success, seed)
            .map_err(SettlementFailure::before_effects)?;
        self.crafts
            .check_completion(account, recipe_id, num_success)
            .map_err(SettlementFailure::before_effects)?;

        let report = settlement::execute_settlement(account, &plan, &self.collaborators).map_err(|failure| {
            tracing::error!(
                "Settlement of craft {} failed after {} of {} effects: {}",
                active_craft_id,
                failure.effects_applied,
                plan.effect_count(),
                failure.error
            );
            failure
        })?;

        self.crafts
            .complete(active_craft_id, num_success, self.collaborators.clock.now_secs())
            .map_err(|error| SettlementFailure {
                error,
                effects_applied: plan.effect_count(),
            })?;

        tracing::info!(
            "Craft {} settled: {}/{} succeeded, {} xp",
            active_craft_id,
            num_success,
            craft_amount,
            report.xp_earned
        );
        self.events.push(CraftingEvent::CraftCompleted {
            account,
            recipe_id,
            active_craft_id,
            num_success,
            craft_amount,
            xp_earned: report.xp_earned,
        });

        Ok(report)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// A stored recipe definition.
    #[must_use]
    pub fn recipe_definition(&self, recipe_id: RecipeId) -> Option<&RecipeDefinition> {
        self.registry.definition(recipe_id)
    }

    /// Cached randomness flag of a stored recipe.
    #[must_use]
    pub fn recipe_needs_randomness(&self, recipe_id: RecipeId) -> Option<bool> {
        self.registry.needs_randomness(recipe_id)
    }

    /// A craft record, in any state.
    #[must_use]
    pub fn active_craft(&self, active_craft_id: ActiveCraftId) -> Option<&ActiveCraft> {
        self.crafts.get(active_craft_id)
    }

    /// IN_PROGRESS crafts of `account`, ascending.
    #[must_use]
    pub fn active_crafts_for(&self, account: AccountId) -> Vec<ActiveCraftId> {
        self.crafts.active_crafts_for(account)
    }

    /// Completed units of `recipe_id` for `account`.
    #[must_use]
    pub fn completions(&self, account: AccountId, recipe_id: RecipeId) -> u32 {
        self.crafts.completions(account, recipe_id)
    }

    /// Last settlement time of `recipe_id` for `account` (0 if never).
    #[must_use]
    pub fn last_completion_time(&self, account: AccountId, recipe_id: RecipeId) -> u64 {
        self.crafts.last_completion_time(account, recipe_id)
    }

    /// An outstanding randomness request.
    #[must_use]
    pub fn pending_request(&self, request_id: RequestId) -> Option<&PendingRandomnessRequest> {
        self.correlator.get(request_id)
    }

    /// Number of outstanding randomness requests.
    #[must_use]
    pub fn pending_request_count(&self) -> usize {
        self.correlator.len()
    }

    /// The id the next craft will receive.
    #[must_use]
    pub const fn next_active_craft_id(&self) -> ActiveCraftId {
        self.crafts.next_id()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Takes every buffered event.
    pub fn drain_events(&mut self) -> Vec<CraftingEvent> {
        std::mem::replace(
            &mut self.events,
            Vec::with_capacity(self.config.event_buffer_capacity),
        )
    }

    /// Number of buffered events.
    #[must_use]
    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }
}

#[cfg(all(test, feature = "test-util"))]
mod tests {
    use super::*;
    use crate::active::CraftStatus;
    use crate::basis_points::BasisPoints;
    use crate::collaborators::TokenLedger;
    use crate::in_memory::InMemoryWorld;
    use crate::recipe::{LootEntry, RecipeInput, TokenRef};

    const ADMIN: CallerId = 1_000;
    const ORACLE: CallerId = 2_000;
    const ALICE: AccountId = 1;
    const GOLD: u32 = 1;

    fn setup() -> (InMemoryWorld, CraftingEngine) {
        let world = InMemoryWorld::new(3);
        world.access.grant(Capability::RecipeManager, ADMIN);
        world.access.grant(Capability::RandomnessAuthority, ORACLE);
        world.ledger.credit(ALICE, TokenRef::currency(GOLD), 1_000);
        let engine = CraftingEngine::new(EngineConfig::default(), world.collaborators()).unwrap();
        (world, engine)
    }

    fn recipe() -> RecipeDefinition {
        RecipeDefinition::new(vec![RecipeInput::currency(GOLD, 10)], vec![LootEntry::stackable(2, 5, 1)])
    }

    fn gold(amount: u64) -> [CraftInput; 1] {
        [CraftInput::new(TokenRef::currency(GOLD), amount)]
    }

    #[test]
    fn test_admin_paths_fail_closed() {
        let (_world, mut engine) = setup();

        assert_eq!(
            engine.set_recipe_definition(ALICE, 1, recipe()),
            Err(CraftingError::MissingCapability { capability: Capability::RecipeManager, caller: ALICE })
        );
        assert!(engine.recipe_definition(1).is_none());

        engine.set_recipe_definition(ADMIN, 1, recipe()).unwrap();
        assert!(engine.set_recipe_enabled(ALICE, 1, false).is_err());
        assert!(engine.recipe_definition(1).unwrap().enabled);
    }

    #[test]
    fn test_deterministic_craft_settles_inline() {
        let (_world, mut engine) = setup();
        engine.set_recipe_definition(ADMIN, 1, recipe()).unwrap();

        let id = engine.craft(ALICE, 1, &gold(30), 3).unwrap();

        assert_eq!(id, 1);
        assert_eq!(engine.active_craft(id).unwrap().status, CraftStatus::Completed);
        assert_eq!(engine.completions(ALICE, 1), 3);
        assert_eq!(engine.pending_request_count(), 0);
        assert_eq!(engine.next_active_craft_id(), 2);
    }

    #[test]
    fn test_zero_probability_deterministic_recipe_settles_every_unit() {
        let (world, mut engine) = setup();
        engine
            .set_recipe_definition(ADMIN, 1, recipe().with_success_probability(BasisPoints::ZERO))
            .unwrap();
        assert_eq!(engine.recipe_needs_randomness(1), Some(false));

        let id = engine.craft(ALICE, 1, &gold(30), 3).unwrap();

        assert_eq!(engine.active_craft(id).unwrap().num_success, Some(3));
        assert_eq!(engine.completions(ALICE, 1), 3);
        assert_eq!(world.loot.grants().len(), 3);
        assert_eq!(engine.last_completion_time(ALICE, 1), 1_000);
    }

    #[test]
    fn test_overflowing_settlement_is_rejected_before_any_effect() {
        let (world, mut engine) = setup();
        engine
            .set_recipe_definition(ADMIN, 1, recipe().with_success_xp(u64::MAX))
            .unwrap();
        engine.drain_events();

        assert_eq!(engine.craft(ALICE, 1, &gold(20), 2), Err(CraftingError::ArithmeticOverflow));

        assert!(world.ledger.history().is_empty());
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::currency(GOLD)), 1_000);
        assert!(world.loot.grants().is_empty());
        assert!(engine.active_crafts_for(ALICE).is_empty());
        assert_eq!(engine.next_active_craft_id(), 1);
        assert_eq!(engine.pending_event_count(), 0);

        // A single unit still fits
        assert!(engine.craft(ALICE, 1, &gold(10), 1).is_ok());
    }

    #[test]
    fn test_failed_sync_settlement_is_rolled_back() {
        let (world, mut engine) = setup();
        engine.set_recipe_definition(ADMIN, 1, recipe()).unwrap();
        engine.drain_events();
        world.loot.set_failing(true);

        let err = engine.craft(ALICE, 1, &gold(20), 2).unwrap_err();

        assert!(matches!(err, CraftingError::Collaborator(_)));
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::currency(GOLD)), 1_000);
        assert!(engine.active_craft(1).is_none());
        assert!(engine.active_crafts_for(ALICE).is_empty());
        assert_eq!(engine.next_active_craft_id(), 1);
        assert_eq!(engine.completions(ALICE, 1), 0);
        assert_eq!(engine.pending_event_count(), 0);
    }

    #[test]
    fn test_craft_amount_bounds() {
        let (_world, mut engine) = setup();
        engine.set_recipe_definition(ADMIN, 1, recipe()).unwrap();

        assert_eq!(
            engine.craft(ALICE, 1, &gold(0), 0),
            Err(CraftingError::InvalidCraftAmount { amount: 0, max: 255 })
        );
        assert_eq!(engine.craft(ALICE, 9, &gold(10), 1), Err(CraftingError::RecipeNotFound(9)));
    }

    #[test]
    fn test_paused() {
        let (world, mut engine) = setup();
        engine.set_recipe_definition(ADMIN, 1, recipe()).unwrap();
        world.pause.set_paused(true);

        assert_eq!(engine.craft(ALICE, 1, &gold(10), 1), Err(CraftingError::Paused));
        assert_eq!(engine.next_active_craft_id(), 1);
    }

    #[test]
    fn test_events_are_buffered() {
        let (_world, mut engine) = setup();
        engine.set_recipe_definition(ADMIN, 1, recipe()).unwrap();
        engine.craft(ALICE, 1, &gold(10), 1).unwrap();

        assert_eq!(engine.pending_event_count(), 3);
        let events = engine.drain_events();
        assert!(matches!(events[0], CraftingEvent::RecipeUpdated { recipe_id: 1, needs_randomness: false }));
        assert!(matches!(events[1], CraftingEvent::CraftStarted { active_craft_id: 1, .. }));
        assert!(matches!(events[2], CraftingEvent::CraftCompleted { num_success: 1, .. }));
        assert_eq!(engine.pending_event_count(), 0);
    }

    #[test]
    fn test_callback_requires_authority() {
        let (world, mut engine) = setup();
        engine
            .set_recipe_definition(ADMIN, 1, recipe().with_success_probability(BasisPoints::new(5_000).unwrap()))
            .unwrap();
        engine.craft(ALICE, 1, &gold(10), 1).unwrap();
        let request_id = world.randomness.last_request().unwrap();

        let err = engine.fulfill_random_words(ALICE, request_id, &[7]).unwrap_err();
        assert!(matches!(err, CraftingError::MissingCapability { .. }));
        assert!(engine.pending_request(request_id).is_some());

        assert!(engine.fulfill_random_words(ORACLE, request_id, &[]).is_err());
        assert!(engine.pending_request(request_id).is_some());

        // A proper delivery still settles the craft
        assert!(engine.fulfill_random_words(ORACLE, request_id, &[7]).unwrap().is_some());
        assert!(engine.pending_request(request_id).is_none());
        assert_eq!(engine.active_craft(1).unwrap().status, CraftStatus::Completed);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let world = InMemoryWorld::new(0);
        let config = EngineConfig { max_craft_amount: 0, ..EngineConfig::default() };
        assert!(matches!(
            CraftingEngine::new(config, world.collaborators()),
            Err(CraftingError::InvalidConfig(_))
        ));
    }
}
