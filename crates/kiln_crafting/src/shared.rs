//! # Shared Engine Handle
//!
//! Serialises access to one [`CraftingEngine`] across threads and guards
//! against re-entry from inside an operation.
//!
//! Calls from different threads queue on a `parking_lot::ReentrantMutex`,
//! so each operation runs as one atomic unit. A collaborator that calls
//! back into the engine on the same thread (a token hook, a loot grant
//! that triggers another craft) re-acquires the mutex, finds the engine
//! already borrowed and gets [`CraftingError::Reentrant`] instead of a
//! deadlock or a half-applied operation.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::engine::CraftingEngine;
use crate::error::{CraftingError, CraftingResult};
use crate::events::CraftingEvent;
use crate::probability::RandomWord;
use crate::recipe::{AccountId, ActiveCraftId, CallerId, CraftInput, RecipeDefinition, RecipeId, RequestId};
use crate::registry::RecipeBook;
use crate::settlement::SettlementReport;

/// Cloneable, thread-safe handle to a [`CraftingEngine`].
#[derive(Clone, Debug)]
pub struct SharedCraftingEngine {
    inner: Arc<ReentrantMutex<RefCell<CraftingEngine>>>,
}

impl SharedCraftingEngine {
    /// Wraps an engine.
    #[must_use]
    pub fn new(engine: CraftingEngine) -> Self {
        Self { inner: Arc::new(ReentrantMutex::new(RefCell::new(engine))) }
    }

    /// Runs `f` with exclusive access to the engine.
    ///
    /// # Errors
    ///
    /// Returns `Reentrant` if called from inside another operation on the
    /// same thread, otherwise whatever `f` returns.
    pub fn with<R>(&self, f: impl FnOnce(&mut CraftingEngine) -> CraftingResult<R>) -> CraftingResult<R> {
        let guard = self.inner.lock();
        let mut engine = guard.try_borrow_mut().map_err(|_| CraftingError::Reentrant)?;
        f(&mut *engine)
    }

    /// Runs `f` with shared access to the engine.
    ///
    /// # Errors
    ///
    /// Returns `Reentrant` if called from inside a mutating operation on
    /// the same thread.
    pub fn read<R>(&self, f: impl FnOnce(&CraftingEngine) -> R) -> CraftingResult<R> {
        let guard = self.inner.lock();
        let engine = guard.try_borrow().map_err(|_| CraftingError::Reentrant)?;
        Ok(f(&*engine))
    }

    /// See [`CraftingEngine::set_recipe_definition`].
    ///
    /// # Errors
    ///
    /// `Reentrant`, or the engine's error.
    pub fn set_recipe_definition(
        &self,
        caller: CallerId,
        recipe_id: RecipeId,
        definition: RecipeDefinition,
    ) -> CraftingResult<bool> {
        self.with(|engine| engine.set_recipe_definition(caller, recipe_id, definition))
    }

    /// See [`CraftingEngine::set_recipe_enabled`].
    ///
    /// # Errors
    ///
    /// `Reentrant`, or the engine's error.
    pub fn set_recipe_enabled(&self, caller: CallerId, recipe_id: RecipeId, enabled: bool) -> CraftingResult<()> {
        self.with(|engine| engine.set_recipe_enabled(caller, recipe_id, enabled))
    }

    /// See [`CraftingEngine::load_recipe_book`].
    ///
    /// # Errors
    ///
    /// `Reentrant`, or the engine's error.
    pub fn load_recipe_book(&self, caller: CallerId, book: &RecipeBook) -> CraftingResult<usize> {
        self.with(|engine| engine.load_recipe_book(caller, book))
    }

    /// See [`CraftingEngine::craft`].
    ///
    /// # Errors
    ///
    /// `Reentrant`, or the engine's error.
    pub fn craft(
        &self,
        caller: CallerId,
        recipe_id: RecipeId,
        inputs: &[CraftInput],
        craft_amount: u8,
    ) -> CraftingResult<ActiveCraftId> {
        self.with(|engine| engine.craft(caller, recipe_id, inputs, craft_amount))
    }

    /// See [`CraftingEngine::fulfill_random_words`].
    ///
    /// # Errors
    ///
    /// `Reentrant`, or the engine's error.
    pub fn fulfill_random_words(
        &self,
        caller: CallerId,
        request_id: RequestId,
        words: &[RandomWord],
    ) -> CraftingResult<Option<SettlementReport>> {
        self.with(|engine| engine.fulfill_random_words(caller, request_id, words))
    }

    /// See [`CraftingEngine::is_recipe_available`].
    ///
    /// # Errors
    ///
    /// `Reentrant` from inside another operation.
    pub fn is_recipe_available(&self, account: AccountId, recipe_id: RecipeId) -> CraftingResult<bool> {
        self.read(|engine| engine.is_recipe_available(account, recipe_id))
    }

    /// See [`CraftingEngine::drain_events`].
    ///
    /// # Errors
    ///
    /// `Reentrant` from inside another operation.
    pub fn drain_events(&self) -> CraftingResult<Vec<CraftingEvent>> {
        self.with(|engine| Ok(engine.drain_events()))
    }
}

#[cfg(all(test, feature = "test-util"))]
mod tests {
    use super::*;
    use crate::collaborators::{Capability, LootEngine};
    use crate::config::EngineConfig;
    use crate::in_memory::InMemoryWorld;
    use crate::recipe::{LootEntry, RecipeInput, TokenRef};
    use parking_lot::Mutex;
    use std::sync::OnceLock;

    const ADMIN: CallerId = 1_000;
    const ALICE: AccountId = 1;
    const GOLD: u32 = 1;

    /// Loot engine that tries to start another craft while granting.
    struct ReenteringLoot {
        engine: OnceLock<SharedCraftingEngine>,
        observed: Mutex<Vec<CraftingResult<ActiveCraftId>>>,
    }

    impl LootEngine for ReenteringLoot {
        fn validate_loots(&self, _loots: &[LootEntry]) -> CraftingResult<bool> {
            Ok(false)
        }

        fn grant_loot(&self, account: AccountId, _loots: &[LootEntry]) -> CraftingResult<()> {
            if let Some(engine) = self.engine.get() {
                let inputs = [CraftInput::new(TokenRef::currency(GOLD), 10)];
                self.observed.lock().push(engine.craft(account, 1, &inputs, 1));
            }
            Ok(())
        }

        fn grant_loot_with_seed(&self, account: AccountId, loots: &[LootEntry], _seed: RandomWord) -> CraftingResult<()> {
            self.grant_loot(account, loots)
        }
    }

    fn recipe() -> RecipeDefinition {
        RecipeDefinition::new(vec![RecipeInput::currency(GOLD, 10)], vec![LootEntry::stackable(2, 5, 1)])
    }

    #[test]
    fn test_nested_call_is_rejected() {
        let world = InMemoryWorld::new(1);
        world.access.grant(Capability::RecipeManager, ADMIN);
        world.ledger.credit(ALICE, TokenRef::currency(GOLD), 100);

        let loot = Arc::new(ReenteringLoot { engine: OnceLock::new(), observed: Mutex::new(Vec::new()) });
        let mut collaborators = world.collaborators();
        collaborators.loot = loot.clone();

        let shared = SharedCraftingEngine::new(CraftingEngine::new(EngineConfig::default(), collaborators).unwrap());
        let _ = loot.engine.set(shared.clone());

        shared.set_recipe_definition(ADMIN, 1, recipe()).unwrap();
        let id = shared.craft(ALICE, 1, &[CraftInput::new(TokenRef::currency(GOLD), 10)], 1).unwrap();

        assert_eq!(id, 1);
        assert_eq!(*loot.observed.lock(), vec![Err(CraftingError::Reentrant)]);
        // Only the outer craft burned anything
        assert_eq!(shared.read(|e| e.next_active_craft_id()).unwrap(), 2);
        assert_eq!(world.ledger.history().len(), 1);
    }

    #[test]
    fn test_threads_serialise() {
        let world = InMemoryWorld::new(1);
        world.access.grant(Capability::RecipeManager, ADMIN);
        for account in 1..=8 {
            world.ledger.credit(account, TokenRef::currency(GOLD), 100);
        }

        let shared = SharedCraftingEngine::new(CraftingEngine::new(EngineConfig::default(), world.collaborators()).unwrap());
        shared.set_recipe_definition(ADMIN, 1, recipe()).unwrap();

        let handles: Vec<_> = (1..=8u64)
            .map(|account| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        shared
                            .craft(account, 1, &[CraftInput::new(TokenRef::currency(GOLD), 10)], 1)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared
            .read(|engine| {
                assert_eq!(engine.next_active_craft_id(), 41);
                for account in 1..=8 {
                    assert_eq!(engine.completions(account, 1), 5);
                }
            })
            .unwrap();
    }
}
