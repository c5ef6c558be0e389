//! # Eligibility Checker
//!
//! One availability predicate over four conditions, evaluated in order:
//!
//! 1. The recipe is enabled
//! 2. The account meets every requirement
//! 3. The completion cap is not exhausted (`max_completions == 0` means no cap)
//! 4. The cooldown has elapsed (`cooldown_seconds == 0` means no cooldown)

use crate::active::ActiveCraftStore;
use crate::collaborators::RequirementEngine;
use crate::recipe::{AccountId, RecipeDefinition, RecipeId};

/// Returns true if `account` may craft `recipe_id` at time `now`.
#[must_use]
pub fn is_recipe_available(
    definition: &RecipeDefinition,
    account: AccountId,
    recipe_id: RecipeId,
    store: &ActiveCraftStore,
    requirements: &dyn RequirementEngine,
    now: u64,
) -> bool {
    if !definition.enabled {
        return false;
    }

    if !requirements.check_requirements(account, &definition.requirements) {
        return false;
    }

    if definition.max_completions != 0
        && store.completions(account, recipe_id) >= definition.max_completions
    {
        return false;
    }

    definition.cooldown_seconds == 0
        || now >= store
            .last_completion_time(account, recipe_id)
            .saturating_add(definition.cooldown_seconds)
}
