//! # Input Reservation & Settlement
//!
//! **Both ends of a craft's effect on the outside world.**
//!
//! ## Craft Start
//!
//! Runs in two passes. The validation pass checks every supplied input
//! against its recipe slot and against the collaborators, and touches
//! nothing. The effect pass then burns or reserves each input:
//!
//! | Kind                      | Effect at start      |
//! |---------------------------|----------------------|
//! | Currency                  | burned               |
//! | Unique asset              | reserved             |
//! | Stackable, consumable     | burned               |
//! | Stackable, not consumable | quantity reserved    |
//!
//! If a collaborator refuses an effect partway through, every effect
//! already applied is undone (reservations released, burns re-minted)
//! before the error is returned.
//!
//! ## Settlement
//!
//! Planned first, with every seed and amount resolved, then executed:
//!
//! 1. One loot grant per successful unit, each with its own chained seed
//! 2. Every reservation is released
//! 3. Reserved stackables with burn probabilities are burned in full and
//!    the surviving units minted back
//! 4. XP shares are granted to the input tokens

use std::collections::{HashMap, HashSet};

use crate::active::{ActiveCraft, ReservedToken};
use crate::collaborators::Collaborators;
use crate::error::{CraftingError, CraftingResult};
use crate::probability::{next_random_word, weighted_coin_flip_batch, RandomWord};
use crate::recipe::{
    AccountId, CraftInput, LootEntry, RecipeDefinition, RecipeInput, ReservationHandle, TokenKind, TokenRef,
};

/// What a settlement did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettlementReport {
    /// Successful units.
    pub num_success: u8,
    /// `success_xp * num_success`.
    pub xp_earned: u64,
    /// Loot table grants performed.
    pub loot_grants: u32,
}

/// Effect planned for one input by the validation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Planned {
    Skip(TokenRef),
    Burn(TokenRef, u64),
    ReserveUnique(TokenRef),
    ReserveQuantity(TokenRef, u64),
}

// =============================================================================
// CRAFT START
// =============================================================================

/// Validates the supplied inputs, then burns or reserves them.
///
/// Returns one [`ReservedToken`] per recipe input, in positional order.
///
/// # Errors
///
/// Any validation error leaves the world untouched. A collaborator failure
/// during the effect pass is returned after compensation.
pub fn take_inputs(
    account: AccountId,
    definition: &RecipeDefinition,
    inputs: &[CraftInput],
    craft_amount: u8,
    collaborators: &Collaborators,
) -> CraftingResult<Vec<ReservedToken>> {
    if inputs.len() != definition.inputs.len() {
        return Err(CraftingError::InputCountMismatch {
            expected: definition.inputs.len(),
            actual: inputs.len(),
        });
    }

    let plan = validate_inputs(account, definition, inputs, craft_amount, collaborators)?;
    apply_plan(account, &plan, collaborators)
}

fn validate_inputs(
    account: AccountId,
    definition: &RecipeDefinition,
    inputs: &[CraftInput],
    craft_amount: u8,
    collaborators: &Collaborators,
) -> CraftingResult<Vec<Planned>> {
    let mut plan = Vec::with_capacity(inputs.len());
    // Cumulative demand per fungible token, so two slots cannot spend the same balance
    let mut demand: HashMap<TokenRef, u64> = HashMap::new();
    let mut claimed_assets: HashSet<TokenRef> = HashSet::new();

    for (index, (slot, supplied)) in definition.inputs.iter().zip(inputs).enumerate() {
        let token = supplied.token;
        let required = required_amount(slot, craft_amount)?;

        if supplied.is_skipped() && !slot.required {
            plan.push(Planned::Skip(token));
            continue;
        }

        check_shape(index, slot, supplied, required)?;

        match token.kind {
            TokenKind::UniqueAsset => {
                if collaborators.ledger.owner_of(token.contract, token.token_id) != Some(account) {
                    return Err(CraftingError::NotOwner {
                        index,
                        contract: token.contract,
                        token_id: token.token_id,
                        account,
                    });
                }
                if collaborators.reservations.is_reserved(token.contract, token.token_id)
                    || !claimed_assets.insert(token)
                {
                    return Err(CraftingError::AlreadyReserved {
                        index,
                        contract: token.contract,
                        token_id: token.token_id,
                    });
                }
            }
            TokenKind::Currency | TokenKind::StackableItem => {
                let mut available = collaborators.ledger.balance_of(account, token);
                if token.kind == TokenKind::StackableItem {
                    let reserved = collaborators
                        .reservations
                        .reserved_quantity(account, token.contract, token.token_id);
                    available = available.saturating_sub(reserved);
                }

                let total = demand.entry(token).or_insert(0);
                *total = total.checked_add(required).ok_or(CraftingError::ArithmeticOverflow)?;
                if *total > available {
                    return Err(CraftingError::InsufficientBalance {
                        contract: token.contract,
                        token_id: token.token_id,
                        required: *total,
                        available,
                    });
                }
            }
        }

        for check in &slot.trait_checks {
            if !collaborators.attributes.check_trait(token.contract, token.token_id, check) {
                return Err(CraftingError::TraitCheckFailed { index, trait_id: check.trait_id });
            }
        }

        plan.push(match token.kind {
            TokenKind::Currency => Planned::Burn(token, required),
            TokenKind::UniqueAsset => Planned::ReserveUnique(token),
            TokenKind::StackableItem if slot.consumable => Planned::Burn(token, required),
            TokenKind::StackableItem => Planned::ReserveQuantity(token, required),
        });
    }

    Ok(plan)
}

/// Amount a slot takes for the whole batch. Unique assets never scale.
fn required_amount(slot: &RecipeInput, craft_amount: u8) -> CraftingResult<u64> {
    match slot.kind {
        TokenKind::UniqueAsset => Ok(1),
        TokenKind::Currency | TokenKind::StackableItem => slot
            .amount
            .checked_mul(u64::from(craft_amount))
            .ok_or(CraftingError::ArithmeticOverflow),
    }
}

fn check_shape(index: usize, slot: &RecipeInput, supplied: &CraftInput, required: u64) -> CraftingResult<()> {
    let token = supplied.token;

    if token.kind != slot.kind {
        return Err(CraftingError::TokenKindMismatch {
            index,
            expected: slot.kind,
            actual: token.kind,
        });
    }
    if let Some(expected) = slot.contract {
        if expected != token.contract {
            return Err(CraftingError::ContractMismatch {
                index,
                expected,
                actual: token.contract,
            });
        }
    }
    if let Some(expected) = slot.token_id {
        if expected != token.token_id {
            return Err(CraftingError::TokenIdMismatch {
                index,
                expected,
                actual: token.token_id,
            });
        }
    }
    if supplied.amount != required {
        return Err(CraftingError::AmountMismatch {
            index,
            expected: required,
            actual: supplied.amount,
        });
    }
    Ok(())
}

fn apply_plan(
    account: AccountId,
    plan: &[Planned],
    collaborators: &Collaborators,
) -> CraftingResult<Vec<ReservedToken>> {
    let mut taken: Vec<ReservedToken> = Vec::with_capacity(plan.len());

    for step in plan {
        let result = match *step {
            Planned::Skip(token) => Ok(ReservedToken { token, amount: 0, handle: 0 }),
            Planned::Burn(token, amount) => collaborators
                .ledger
                .burn(account, token, amount)
                .map(|()| ReservedToken { token, amount, handle: 0 }),
            Planned::ReserveUnique(token) => collaborators
                .reservations
                .reserve_unique(account, token.contract, token.token_id)
                .map(|handle| ReservedToken { token, amount: 1, handle }),
            Planned::ReserveQuantity(token, amount) => collaborators
                .reservations
                .reserve_quantity(account, token.contract, token.token_id, amount)
                .map(|handle| ReservedToken { token, amount, handle }),
        };

        match result {
            Ok(record) => {
                tracing::debug!(
                    "Input {}/{} taken: amount={} handle={}",
                    record.token.contract,
                    record.token.token_id,
                    record.amount,
                    record.handle
                );
                taken.push(record);
            }
            Err(err) => {
                tracing::warn!(
                    "Input effect failed after {} of {} inputs, compensating: {}",
                    taken.len(),
                    plan.len(),
                    err
                );
                return_inputs(account, &taken, collaborators);
                return Err(err);
            }
        }
    }

    Ok(taken)
}

/// Undoes start effects in reverse order: releases reservations and
/// re-mints burns.
pub(crate) fn return_inputs(account: AccountId, taken: &[ReservedToken], collaborators: &Collaborators) {
    for record in taken.iter().rev() {
        let undone = if record.is_reserved() {
            collaborators.reservations.release(account, record.token, record.handle)
        } else if record.is_skipped() {
            Ok(())
        } else {
            collaborators.ledger.mint(account, record.token, record.amount)
        };

        if let Err(err) = undone {
            tracing::warn!(
                "Compensation for {}/{} failed: {}",
                record.token.contract,
                record.token.token_id,
                err
            );
        }
    }
}

// =============================================================================
// SETTLEMENT
// =============================================================================

/// One input's part of a settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct InputSettlement {
    token: TokenRef,
    /// Reservation to release, 0 if none.
    handle: ReservationHandle,
    /// Units burned in full, then the amount minted back.
    burn: Option<(u64, u64)>,
    xp_share: u64,
}

/// Every effect of a settlement, resolved before the first one runs.
///
/// Planning covers all seed derivation and arithmetic, so executing a
/// plan can only stop on a collaborator failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    seeded: bool,
    loots: Vec<LootEntry>,
    loot_seeds: Vec<RandomWord>,
    inputs: Vec<InputSettlement>,
    report: SettlementReport,
}

impl SettlementPlan {
    /// What executing the plan reports.
    #[must_use]
    pub const fn report(&self) -> SettlementReport {
        self.report
    }

    /// Number of collaborator calls the plan makes.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        let per_input: usize = self
            .inputs
            .iter()
            .map(|step| {
                usize::from(step.handle != 0)
                    + step.burn.map_or(0, |(_, refund)| 1 + usize::from(refund > 0))
                    + usize::from(step.xp_share > 0)
            })
            .sum();
        self.loot_seeds.len() + per_input
    }
}

/// A settlement that stopped on a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementFailure {
    /// What went wrong.
    pub error: CraftingError,
    /// Collaborator calls that went through before it.
    pub effects_applied: usize,
}

impl SettlementFailure {
    /// A failure raised before any effect.
    #[must_use]
    pub fn before_effects(error: CraftingError) -> Self {
        Self { error, effects_applied: 0 }
    }
}

/// Checks that settling `craft_amount` units of `definition` cannot
/// overflow, whatever the outcome.
///
/// Every settlement quantity grows with the success count, so checking the
/// all-success batch covers every outcome.
///
/// # Errors
///
/// Returns `ArithmeticOverflow` if the XP, an XP share or a refund would not fit.
pub fn check_settlement_bounds(definition: &RecipeDefinition, craft_amount: u8) -> CraftingResult<()> {
    let max_xp = definition
        .success_xp
        .checked_mul(u64::from(craft_amount))
        .ok_or(CraftingError::ArithmeticOverflow)?;

    for slot in &definition.inputs {
        slot.xp_earned_percent.apply_floor(max_xp)?;
        if slot.burns_on_outcome() {
            slot.amount
                .checked_mul(u64::from(craft_amount))
                .ok_or(CraftingError::ArithmeticOverflow)?;
        }
    }
    Ok(())
}

/// Resolves every effect of settling `craft` without performing any.
///
/// `seed` feeds the per-unit loot rolls and then the post-outcome burn
/// rolls. Unseeded plans grant loot without a seed.
///
/// # Errors
///
/// Returns `ArithmeticOverflow`; nothing has happened when it does.
pub fn plan_settlement(
    craft: &ActiveCraft,
    definition: &RecipeDefinition,
    seeded: bool,
    num_success: u8,
    seed: RandomWord,
) -> CraftingResult<SettlementPlan> {
    let mut seed = seed;

    let mut loot_seeds = Vec::with_capacity(usize::from(num_success));
    for _ in 0..num_success {
        seed = next_random_word(seed);
        loot_seeds.push(seed);
    }

    let xp_earned = definition
        .success_xp
        .checked_mul(u64::from(num_success))
        .ok_or(CraftingError::ArithmeticOverflow)?;

    let mut inputs = Vec::with_capacity(craft.reserved.len());
    for (index, record) in craft.reserved.iter().enumerate() {
        let mut step = InputSettlement {
            token: record.token,
            handle: record.handle,
            burn: None,
            xp_share: 0,
        };

        // The definition may have been replaced since the craft started
        let slot = definition.inputs.get(index).filter(|_| !record.is_skipped());
        if let Some(slot) = slot {
            if slot.burns_on_outcome() && record.is_reserved() {
                let (burn, next) = plan_outcome_burn(slot, record, craft.craft_amount, num_success, seed)?;
                step.burn = Some(burn);
                seed = next;
            }
            step.xp_share = slot.xp_earned_percent.apply_floor(xp_earned)?;
        }
        inputs.push(step);
    }

    Ok(SettlementPlan {
        seeded,
        loots: definition.loots.clone(),
        loot_seeds,
        inputs,
        report: SettlementReport {
            num_success,
            xp_earned,
            loot_grants: u32::from(num_success),
        },
    })
}

/// Rolls the burns of a reserved stackable. The whole reservation is
/// burned and the surviving units minted back.
fn plan_outcome_burn(
    slot: &RecipeInput,
    record: &ReservedToken,
    craft_amount: u8,
    num_success: u8,
    seed: RandomWord,
) -> CraftingResult<((u64, u64), RandomWord)> {
    let num_fail = craft_amount.saturating_sub(num_success);
    let (success_burns, seed) = weighted_coin_flip_batch(seed, slot.success_burn_probability, num_success);
    let (fail_burns, seed) = weighted_coin_flip_batch(seed, slot.failure_burn_probability, num_fail);

    let kept = craft_amount.saturating_sub(success_burns).saturating_sub(fail_burns);
    let refund = u64::from(kept)
        .checked_mul(slot.amount)
        .ok_or(CraftingError::ArithmeticOverflow)?;

    tracing::debug!(
        "Post-outcome burn on {}/{}: {} + {} units burned, {} minted back",
        record.token.contract,
        record.token.token_id,
        success_burns,
        fail_burns,
        refund
    );

    Ok(((record.amount, refund), seed))
}

/// Performs a planned settlement: loot grants first, then per input the
/// release, the outcome burn and the XP share.
///
/// # Errors
///
/// Stops at the first collaborator failure and reports how many effects
/// already went through.
pub fn execute_settlement(
    account: AccountId,
    plan: &SettlementPlan,
    collaborators: &Collaborators,
) -> Result<SettlementReport, SettlementFailure> {
    let mut applied = 0;

    for &seed in &plan.loot_seeds {
        let granted = if plan.seeded {
            collaborators.loot.grant_loot_with_seed(account, &plan.loots, seed)
        } else {
            collaborators.loot.grant_loot(account, &plan.loots)
        };
        track(&mut applied, granted)?;
    }

    for step in &plan.inputs {
        if step.handle != 0 {
            track(&mut applied, collaborators.reservations.release(account, step.token, step.handle))?;
        }
        if let Some((burned, refund)) = step.burn {
            track(&mut applied, collaborators.ledger.burn(account, step.token, burned))?;
            if refund > 0 {
                track(&mut applied, collaborators.ledger.mint(account, step.token, refund))?;
            }
        }
        if step.xp_share > 0 {
            track(
                &mut applied,
                collaborators
                    .leveling
                    .grant_xp(step.token.contract, step.token.token_id, step.xp_share),
            )?;
        }
    }

    Ok(plan.report)
}

fn track(applied: &mut usize, result: CraftingResult<()>) -> Result<(), SettlementFailure> {
    match result {
        Ok(()) => {
            *applied += 1;
            Ok(())
        }
        Err(error) => Err(SettlementFailure { error, effects_applied: *applied }),
    }
}

/// Plans and executes a settlement in one step.
///
/// Bookkeeping on the craft itself is left to the caller.
///
/// # Errors
///
/// Propagates `ArithmeticOverflow` from planning and collaborator failures
/// from execution.
pub fn settle(
    craft: &ActiveCraft,
    definition: &RecipeDefinition,
    seeded: bool,
    num_success: u8,
    seed: RandomWord,
    collaborators: &Collaborators,
) -> CraftingResult<SettlementReport> {
    let plan = plan_settlement(craft, definition, seeded, num_success, seed)?;
    execute_settlement(craft.account, &plan, collaborators).map_err(|failure| failure.error)
}

#[cfg(all(test, feature = "test-util"))]
mod tests {
    use super::*;
    use crate::active::CraftStatus;
    use crate::basis_points::BasisPoints;
    use crate::collaborators::{ReservationEngine, TokenLedger};
    use crate::in_memory::InMemoryWorld;
    use crate::recipe::{TraitCheck, TraitCheckOp};

    const ALICE: AccountId = 1;
    const GOLD: u32 = 1;
    const HERBS: u32 = 4;
    const SWORDS: u32 = 3;
    const POTIONS: u32 = 2;

    fn world() -> InMemoryWorld {
        let world = InMemoryWorld::new(7);
        world.ledger.credit(ALICE, TokenRef::currency(GOLD), 100);
        world.ledger.credit(ALICE, TokenRef::stackable(HERBS, 1), 10);
        world.ledger.set_owner(SWORDS, 11, ALICE);
        world
    }

    fn craft_of(reserved: Vec<ReservedToken>, craft_amount: u8) -> ActiveCraft {
        ActiveCraft {
            id: 1,
            status: CraftStatus::InProgress,
            account: ALICE,
            recipe_id: 1,
            reserved,
            craft_amount,
            started_at: 0,
            num_success: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_take_inputs_burns_and_reserves() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![
                RecipeInput::currency(GOLD, 10),
                RecipeInput::unique_asset(SWORDS),
                RecipeInput::stackable(HERBS, 1, 2),
            ],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let inputs = [
            CraftInput::new(TokenRef::currency(GOLD), 30),
            CraftInput::new(TokenRef::unique_asset(SWORDS, 11), 1),
            CraftInput::new(TokenRef::stackable(HERBS, 1), 6),
        ];

        let taken = take_inputs(ALICE, &recipe, &inputs, 3, &world.collaborators()).unwrap();

        assert_eq!(taken.len(), 3);
        assert_eq!(taken[0].handle, 0);
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::currency(GOLD)), 70);
        assert!(world.reservations.is_reserved(SWORDS, 11));
        assert_eq!(world.reservations.reserved_quantity(ALICE, HERBS, 1), 6);
        // Reserved stackables stay in the wallet
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::stackable(HERBS, 1)), 10);
    }

    #[test]
    fn test_shape_errors() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::stackable(HERBS, 1, 2)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let collaborators = world.collaborators();

        let err = take_inputs(ALICE, &recipe, &[], 1, &collaborators).unwrap_err();
        assert_eq!(err, CraftingError::InputCountMismatch { expected: 1, actual: 0 });

        let wrong_kind = [CraftInput::new(TokenRef::currency(GOLD), 2)];
        assert!(matches!(
            take_inputs(ALICE, &recipe, &wrong_kind, 1, &collaborators),
            Err(CraftingError::TokenKindMismatch { index: 0, .. })
        ));

        let wrong_id = [CraftInput::new(TokenRef::stackable(HERBS, 2), 2)];
        assert!(matches!(
            take_inputs(ALICE, &recipe, &wrong_id, 1, &collaborators),
            Err(CraftingError::TokenIdMismatch { expected: 1, actual: 2, .. })
        ));

        let wrong_amount = [CraftInput::new(TokenRef::stackable(HERBS, 1), 2)];
        assert_eq!(
            take_inputs(ALICE, &recipe, &wrong_amount, 2, &collaborators),
            Err(CraftingError::AmountMismatch { index: 0, expected: 4, actual: 2 })
        );
    }

    #[test]
    fn test_cumulative_demand_is_checked() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::currency(GOLD, 60), RecipeInput::currency(GOLD, 60)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let inputs = [
            CraftInput::new(TokenRef::currency(GOLD), 60),
            CraftInput::new(TokenRef::currency(GOLD), 60),
        ];

        let err = take_inputs(ALICE, &recipe, &inputs, 1, &world.collaborators()).unwrap_err();
        assert!(matches!(err, CraftingError::InsufficientBalance { required: 120, available: 100, .. }));
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::currency(GOLD)), 100);
    }

    #[test]
    fn test_trait_failure_leaves_nothing_behind() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![
                RecipeInput::currency(GOLD, 10),
                RecipeInput::unique_asset(SWORDS)
                    .with_trait_check(TraitCheck::new(100, TraitCheckOp::GreaterThan, 3)),
            ],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        world.attributes.set_trait(SWORDS, 11, 100, 2);
        let inputs = [
            CraftInput::new(TokenRef::currency(GOLD), 10),
            CraftInput::new(TokenRef::unique_asset(SWORDS, 11), 1),
        ];

        let err = take_inputs(ALICE, &recipe, &inputs, 1, &world.collaborators()).unwrap_err();

        assert_eq!(err, CraftingError::TraitCheckFailed { index: 1, trait_id: 100 });
        assert_eq!(world.reservations.active_count(), 0);
        assert!(world.ledger.history().is_empty());
    }

    #[test]
    fn test_not_owner() {
        let world = world();
        world.ledger.set_owner(SWORDS, 12, 99);
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::unique_asset(SWORDS)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let inputs = [CraftInput::new(TokenRef::unique_asset(SWORDS, 12), 1)];

        assert!(matches!(
            take_inputs(ALICE, &recipe, &inputs, 1, &world.collaborators()),
            Err(CraftingError::NotOwner { index: 0, token_id: 12, .. })
        ));
    }

    #[test]
    fn test_failed_effect_is_compensated() {
        let world = world();
        world.reservations.set_failing(true);
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::currency(GOLD, 10), RecipeInput::stackable(HERBS, 1, 2)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let inputs = [
            CraftInput::new(TokenRef::currency(GOLD), 10),
            CraftInput::new(TokenRef::stackable(HERBS, 1), 2),
        ];

        let err = take_inputs(ALICE, &recipe, &inputs, 1, &world.collaborators()).unwrap_err();

        assert!(matches!(err, CraftingError::Collaborator(_)));
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::currency(GOLD)), 100);
        assert_eq!(world.reservations.active_count(), 0);
    }

    #[test]
    fn test_optional_slot_can_be_skipped() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::currency(GOLD, 10), RecipeInput::stackable(HERBS, 1, 1).optional()],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let inputs = [
            CraftInput::new(TokenRef::currency(GOLD), 10),
            CraftInput::skipped(TokenRef::stackable(HERBS, 1)),
        ];

        let taken = take_inputs(ALICE, &recipe, &inputs, 1, &world.collaborators()).unwrap();
        assert!(taken[1].is_skipped());
        assert_eq!(world.reservations.active_count(), 0);
    }

    #[test]
    fn test_settle_releases_and_grants() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![
                RecipeInput::unique_asset(SWORDS).with_xp_share(BasisPoints::new(2_500).unwrap()),
                RecipeInput::stackable(HERBS, 1, 2),
            ],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        )
        .with_success_xp(10);
        let inputs = [
            CraftInput::new(TokenRef::unique_asset(SWORDS, 11), 1),
            CraftInput::new(TokenRef::stackable(HERBS, 1), 4),
        ];
        let collaborators = world.collaborators();
        let taken = take_inputs(ALICE, &recipe, &inputs, 2, &collaborators).unwrap();

        let report = settle(&craft_of(taken, 2), &recipe, false, 2, 0, &collaborators).unwrap();

        assert_eq!(report, SettlementReport { num_success: 2, xp_earned: 20, loot_grants: 2 });
        assert_eq!(world.reservations.active_count(), 0);
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::stackable(POTIONS, 1)), 2);
        // floor(20 * 25%)
        assert_eq!(world.leveling.xp_of(SWORDS, 11), 5);
        assert_eq!(world.loot.grants().len(), 2);
        assert!(world.loot.grants().iter().all(|g| g.seed.is_none()));
    }

    #[test]
    fn test_settle_certain_burns() {
        let world = world();
        // Always burned on success, never on failure
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::stackable(HERBS, 1, 2)
                .with_burn_probabilities(BasisPoints::MAX, BasisPoints::ZERO)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let inputs = [CraftInput::new(TokenRef::stackable(HERBS, 1), 6)];
        let collaborators = world.collaborators();
        let taken = take_inputs(ALICE, &recipe, &inputs, 3, &collaborators).unwrap();

        settle(&craft_of(taken, 3), &recipe, false, 1, 0, &collaborators).unwrap();

        // One success burned, two failures kept: 10 - 6 + 2*2
        assert_eq!(world.ledger.balance_of(ALICE, TokenRef::stackable(HERBS, 1)), 8);
        assert_eq!(world.reservations.active_count(), 0);
    }

    #[test]
    fn test_zero_success_grants_nothing() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::unique_asset(SWORDS).with_xp_share(BasisPoints::MAX)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        )
        .with_success_xp(50);
        let inputs = [CraftInput::new(TokenRef::unique_asset(SWORDS, 11), 1)];
        let collaborators = world.collaborators();
        let taken = take_inputs(ALICE, &recipe, &inputs, 1, &collaborators).unwrap();

        let report = settle(&craft_of(taken, 1), &recipe, true, 0, 42, &collaborators).unwrap();

        assert_eq!(report.xp_earned, 0);
        assert!(world.loot.grants().is_empty());
        assert_eq!(world.leveling.xp_of(SWORDS, 11), 0);
        assert!(!world.reservations.is_reserved(SWORDS, 11));
    }

    #[test]
    fn test_settlement_bounds() {
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::currency(GOLD, 10)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        )
        .with_success_xp(u64::MAX);

        assert_eq!(check_settlement_bounds(&recipe, 1), Ok(()));
        assert_eq!(check_settlement_bounds(&recipe, 2), Err(CraftingError::ArithmeticOverflow));

        // A share multiplies the XP by up to 10000 before dividing
        let shared = RecipeDefinition::new(
            vec![RecipeInput::unique_asset(SWORDS).with_xp_share(BasisPoints::MAX)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        )
        .with_success_xp(u64::MAX / 10_000);
        assert_eq!(check_settlement_bounds(&shared, 1), Ok(()));
        assert_eq!(check_settlement_bounds(&shared, 2), Err(CraftingError::ArithmeticOverflow));
    }

    #[test]
    fn test_planning_has_no_effects() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![
                RecipeInput::unique_asset(SWORDS).with_xp_share(BasisPoints::MAX),
                RecipeInput::stackable(HERBS, 1, 2)
                    .with_burn_probabilities(BasisPoints::MAX, BasisPoints::ZERO),
            ],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        )
        .with_success_xp(5);
        let inputs = [
            CraftInput::new(TokenRef::unique_asset(SWORDS, 11), 1),
            CraftInput::new(TokenRef::stackable(HERBS, 1), 4),
        ];
        let collaborators = world.collaborators();
        let craft = craft_of(take_inputs(ALICE, &recipe, &inputs, 2, &collaborators).unwrap(), 2);
        let history = world.ledger.history();

        let plan = plan_settlement(&craft, &recipe, false, 1, 0).unwrap();

        assert_eq!(plan.report(), SettlementReport { num_success: 1, xp_earned: 5, loot_grants: 1 });
        // 1 loot grant, 2 releases, burn + refund, 1 xp grant
        assert_eq!(plan.effect_count(), 6);
        assert_eq!(world.ledger.history(), history);
        assert_eq!(world.reservations.active_count(), 2);
        assert!(world.loot.grants().is_empty());
    }

    #[test]
    fn test_failed_loot_stops_before_any_effect() {
        let world = world();
        let recipe = RecipeDefinition::new(
            vec![RecipeInput::unique_asset(SWORDS)],
            vec![LootEntry::stackable(POTIONS, 1, 1)],
        );
        let inputs = [CraftInput::new(TokenRef::unique_asset(SWORDS, 11), 1)];
        let collaborators = world.collaborators();
        let craft = craft_of(take_inputs(ALICE, &recipe, &inputs, 1, &collaborators).unwrap(), 1);
        let plan = plan_settlement(&craft, &recipe, false, 1, 0).unwrap();

        world.loot.set_failing(true);
        let failure = execute_settlement(ALICE, &plan, &collaborators).unwrap_err();

        assert_eq!(failure.effects_applied, 0);
        assert!(matches!(failure.error, CraftingError::Collaborator(_)));
        assert!(world.reservations.is_reserved(SWORDS, 11));
    }
}
