//! # Active-Craft State Machine
//!
//! Owns every craft instance and the per-account bookkeeping.
//!
//! ## States
//!
//! - **UNDEFINED**: never allocated (the default for unknown ids).
//! - **IN_PROGRESS**: inputs burned or reserved, waiting for settlement.
//! - **COMPLETED**: settled. Terminal; never reverses.
//!
//! Craft records are never deleted, they are retained for audit. An id is
//! in exactly one account's active set, and only while IN_PROGRESS.

use std::collections::{BTreeSet, HashMap};

use crate::error::{CraftingError, CraftingResult};
use crate::recipe::{AccountId, ActiveCraftId, RecipeId, ReservationHandle, TokenRef};

/// Lifecycle of an active craft.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CraftStatus {
    /// Never allocated.
    #[default]
    Undefined,
    /// Waiting for settlement.
    InProgress,
    /// Settled.
    Completed,
}

/// The concrete token taken for one recipe input at craft start.
///
/// `handle` is 0 when the input was burned rather than reserved, and
/// `amount` is 0 for a skipped optional slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservedToken {
    /// The supplied token.
    pub token: TokenRef,
    /// Amount burned or reserved for the whole batch.
    pub amount: u64,
    /// Reservation handle, 0 if nothing was reserved.
    pub handle: ReservationHandle,
}

impl ReservedToken {
    /// Returns true if a reservation is held for this input.
    #[inline]
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        self.handle != 0
    }

    /// Returns true if the slot was skipped.
    #[inline]
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.amount == 0
    }
}

/// One execution of a recipe for one account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveCraft {
    /// Craft id.
    pub id: ActiveCraftId,
    /// Lifecycle state.
    pub status: CraftStatus,
    /// Owning account.
    pub account: AccountId,
    /// Recipe crafted.
    pub recipe_id: RecipeId,
    /// Per-input records, positionally matching the recipe inputs.
    pub reserved: Vec<ReservedToken>,
    /// Batch size (1-255).
    pub craft_amount: u8,
    /// Start time (unix seconds).
    pub started_at: u64,
    /// Successful units, once settled.
    pub num_success: Option<u8>,
    /// Settlement time, once settled.
    pub completed_at: Option<u64>,
}

/// Per-account bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountData {
    /// Crafts currently IN_PROGRESS.
    pub active_crafts: BTreeSet<ActiveCraftId>,
    /// Completed units per recipe.
    pub completions: HashMap<RecipeId, u32>,
    /// Last settlement time per recipe.
    pub last_completion_time: HashMap<RecipeId, u64>,
}

/// All crafts and all account bookkeeping.
#[derive(Debug)]
pub struct ActiveCraftStore {
    crafts: HashMap<ActiveCraftId, ActiveCraft>,
    accounts: HashMap<AccountId, AccountData>,
    next_id: ActiveCraftId,
}

impl Default for ActiveCraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveCraftStore {
    /// Creates an empty store. The first craft gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            crafts: HashMap::new(),
            accounts: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocates a new IN_PROGRESS craft and adds it to the account's active set.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the id space is exhausted.
    pub fn start(
        &mut self,
        account: AccountId,
        recipe_id: RecipeId,
        reserved: Vec<ReservedToken>,
        craft_amount: u8,
        now: u64,
    ) -> CraftingResult<ActiveCraftId> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(CraftingError::ArithmeticOverflow)?;

        self.crafts.insert(
            id,
            ActiveCraft {
                id,
                status: CraftStatus::InProgress,
                account,
                recipe_id,
                reserved,
                craft_amount,
                started_at: now,
                num_success: None,
                completed_at: None,
            },
        );
        self.accounts.entry(account).or_default().active_crafts.insert(id);

        Ok(id)
    }

    /// Gets a craft by id.
    #[must_use]
    pub fn get(&self, id: ActiveCraftId) -> Option<&ActiveCraft> {
        self.crafts.get(&id)
    }

    /// Status of a craft; `Undefined` for unknown ids.
    #[must_use]
    pub fn status(&self, id: ActiveCraftId) -> CraftStatus {
        self.crafts.get(&id).map_or(CraftStatus::Undefined, |c| c.status)
    }

    /// Gets a craft that is still waiting for settlement.
    ///
    /// # Errors
    ///
    /// - `ActiveCraftNotFound` for an unknown id
    /// - `AlreadyCompleted` for a settled craft
    pub fn in_progress(&self, id: ActiveCraftId) -> CraftingResult<&ActiveCraft> {
        let craft = self.crafts.get(&id).ok_or(CraftingError::ActiveCraftNotFound(id))?;
        match craft.status {
            CraftStatus::InProgress => Ok(craft),
            CraftStatus::Completed => Err(CraftingError::AlreadyCompleted(id)),
            CraftStatus::Undefined => Err(CraftingError::ActiveCraftNotFound(id)),
        }
    }

    /// Transitions IN_PROGRESS -> COMPLETED and records the outcome.
    ///
    /// Adds `num_success` to the account's completion counter, removes the
    /// craft from the active set and stamps the completion time, even when
    /// `num_success` is 0.
    ///
    /// # Errors
    ///
    /// - `ActiveCraftNotFound` / `AlreadyCompleted` if not IN_PROGRESS
    /// - `ArithmeticOverflow` if the completion counter would overflow
    pub fn complete(&mut self, id: ActiveCraftId, num_success: u8, now: u64) -> CraftingResult<()> {
        let craft = self.in_progress(id)?;
        let (account, recipe_id) = (craft.account, craft.recipe_id);
        let completions = self.completions_after(account, recipe_id, num_success)?;

        let data = self.accounts.entry(account).or_default();
        data.completions.insert(recipe_id, completions);
        data.last_completion_time.insert(recipe_id, now);
        data.active_crafts.remove(&id);

        if let Some(craft) = self.crafts.get_mut(&id) {
            craft.status = CraftStatus::Completed;
            craft.num_success = Some(num_success);
            craft.completed_at = Some(now);
        }

        tracing::debug!(
            "Active craft {} completed: {} units of recipe {} for account {}",
            id,
            num_success,
            recipe_id,
            account
        );

        Ok(())
    }

    /// Checks that `num_success` more completions of `recipe_id` fit the
    /// account's counter.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the counter would wrap.
    pub fn check_completion(&self, account: AccountId, recipe_id: RecipeId, num_success: u8) -> CraftingResult<()> {
        self.completions_after(account, recipe_id, num_success).map(|_| ())
    }

    fn completions_after(&self, account: AccountId, recipe_id: RecipeId, num_success: u8) -> CraftingResult<u32> {
        self.completions(account, recipe_id)
            .checked_add(u32::from(num_success))
            .ok_or(CraftingError::ArithmeticOverflow)
    }

    /// Forgets an IN_PROGRESS craft whose start is being rolled back.
    ///
    /// The id is handed out again if it was the latest one.
    ///
    /// # Errors
    ///
    /// Returns `ActiveCraftNotFound` or `AlreadyCompleted`.
    pub fn discard(&mut self, id: ActiveCraftId) -> CraftingResult<ActiveCraft> {
        self.in_progress(id)?;
        let craft = self.crafts.remove(&id).ok_or(CraftingError::ActiveCraftNotFound(id))?;

        if let Some(data) = self.accounts.get_mut(&craft.account) {
            data.active_crafts.remove(&id);
            if *data == AccountData::default() {
                self.accounts.remove(&craft.account);
            }
        }
        if self.next_id.checked_sub(1) == Some(id) {
            self.next_id = id;
        }

        tracing::debug!("Active craft {} discarded", id);
        Ok(craft)
    }

    /// Bookkeeping for an account, if it ever crafted.
    #[must_use]
    pub fn account(&self, account: AccountId) -> Option<&AccountData> {
        self.accounts.get(&account)
    }

    /// Completed units of `recipe_id` for `account`.
    #[must_use]
    pub fn completions(&self, account: AccountId, recipe_id: RecipeId) -> u32 {
        self.accounts
            .get(&account)
            .and_then(|a| a.completions.get(&recipe_id))
            .copied()
            .unwrap_or(0)
    }

    /// Last settlement time of `recipe_id` for `account` (0 if never).
    #[must_use]
    pub fn last_completion_time(&self, account: AccountId, recipe_id: RecipeId) -> u64 {
        self.accounts
            .get(&account)
            .and_then(|a| a.last_completion_time.get(&recipe_id))
            .copied()
            .unwrap_or(0)
    }

    /// Crafts currently IN_PROGRESS for `account`, ascending.
    #[must_use]
    pub fn active_crafts_for(&self, account: AccountId) -> Vec<ActiveCraftId> {
        self.accounts
            .get(&account)
            .map(|a| a.active_crafts.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The id the next craft will receive.
    #[must_use]
    pub const fn next_id(&self) -> ActiveCraftId {
        self.next_id
    }

    /// Total crafts ever started.
    #[must_use]
    pub fn len(&self) -> usize {
        self.crafts.len()
    }

    /// Returns true if no craft was ever started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.crafts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: AccountId = 1;
    const BOB: AccountId = 2;

    fn reserved() -> Vec<ReservedToken> {
        vec![ReservedToken {
            token: TokenRef::currency(1),
            amount: 10,
            handle: 0,
        }]
    }

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let mut store = ActiveCraftStore::new();
        assert_eq!(store.status(1), CraftStatus::Undefined);

        let a = store.start(ALICE, 1, reserved(), 1, 100).unwrap();
        let b = store.start(BOB, 1, reserved(), 1, 100).unwrap();
        let c = store.start(ALICE, 2, reserved(), 1, 100).unwrap();

        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(store.next_id(), 4);
        assert_eq!(store.active_crafts_for(ALICE), vec![1, 3]);
        assert_eq!(store.active_crafts_for(BOB), vec![2]);
    }

    #[test]
    fn test_complete_updates_bookkeeping() {
        let mut store = ActiveCraftStore::new();
        let id = store.start(ALICE, 9, reserved(), 3, 100).unwrap();

        store.complete(id, 3, 250).unwrap();

        let craft = store.get(id).unwrap();
        assert_eq!(craft.status, CraftStatus::Completed);
        assert_eq!(craft.num_success, Some(3));
        assert_eq!(craft.completed_at, Some(250));
        assert_eq!(store.completions(ALICE, 9), 3);
        assert_eq!(store.last_completion_time(ALICE, 9), 250);
        assert!(store.active_crafts_for(ALICE).is_empty());
    }

    #[test]
    fn test_failed_batch_still_stamps_cooldown() {
        let mut store = ActiveCraftStore::new();
        let id = store.start(ALICE, 9, reserved(), 2, 100).unwrap();

        store.complete(id, 0, 300).unwrap();

        assert_eq!(store.completions(ALICE, 9), 0);
        assert_eq!(store.last_completion_time(ALICE, 9), 300);
        assert_eq!(store.status(id), CraftStatus::Completed);
    }

    #[test]
    fn test_completion_happens_once() {
        let mut store = ActiveCraftStore::new();
        let id = store.start(ALICE, 9, reserved(), 1, 100).unwrap();

        store.complete(id, 1, 200).unwrap();
        assert_eq!(store.complete(id, 1, 300), Err(CraftingError::AlreadyCompleted(id)));

        // Nothing moved on the second attempt
        assert_eq!(store.completions(ALICE, 9), 1);
        assert_eq!(store.last_completion_time(ALICE, 9), 200);
    }

    #[test]
    fn test_unknown_craft() {
        let mut store = ActiveCraftStore::new();
        assert_eq!(store.complete(42, 1, 0), Err(CraftingError::ActiveCraftNotFound(42)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_completed_crafts_are_retained() {
        let mut store = ActiveCraftStore::new();
        let id = store.start(ALICE, 9, reserved(), 1, 100).unwrap();
        store.complete(id, 1, 200).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().reserved, reserved());
    }

    #[test]
    fn test_discard_rolls_back_start() {
        let mut store = ActiveCraftStore::new();
        let first = store.start(ALICE, 9, reserved(), 1, 100).unwrap();
        let second = store.start(BOB, 9, reserved(), 1, 100).unwrap();

        let craft = store.discard(second).unwrap();

        assert_eq!(craft.account, BOB);
        assert_eq!(store.status(second), CraftStatus::Undefined);
        assert!(store.account(BOB).is_none());
        assert_eq!(store.next_id(), second);
        assert_eq!(store.active_crafts_for(ALICE), vec![first]);

        store.complete(first, 1, 200).unwrap();
        assert_eq!(store.discard(first), Err(CraftingError::AlreadyCompleted(first)));
    }

    #[test]
    fn test_completion_counter_overflow() {
        let mut store = ActiveCraftStore::new();
        let id = store.start(ALICE, 9, reserved(), 2, 100).unwrap();
        store
            .accounts
            .entry(ALICE)
            .or_default()
            .completions
            .insert(9, u32::MAX - 1);

        assert_eq!(store.check_completion(ALICE, 9, 1), Ok(()));
        assert_eq!(store.check_completion(ALICE, 9, 2), Err(CraftingError::ArithmeticOverflow));
        assert_eq!(store.complete(id, 2, 200), Err(CraftingError::ArithmeticOverflow));
        assert_eq!(store.status(id), CraftStatus::InProgress);
    }
}
