//! # Recipe Registry
//!
//! Validates and stores recipe definitions. Each stored recipe carries a
//! cached `needs_randomness` flag so craft start knows, without
//! re-inspecting the definition, whether it settles synchronously or waits
//! for the randomness authority.
//!
//! A recipe needs randomness when any of these hold:
//!
//! 1. The loot table itself is probabilistic (reported by the loot engine)
//! 2. The base success probability is strictly between 0% and 100%
//! 3. Any input burn probability is strictly between 0% and 100%
//!
//! Recipe books let operators author many recipes in one TOML file:
//!
//! ```toml
//! [[recipes]]
//! recipe_id = 1
//!
//! [recipes.definition]
//! base_success_probability = 7500
//!
//! [[recipes.definition.inputs]]
//! kind = "currency"
//! contract = 1
//! amount = 10
//! consumable = true
//!
//! [[recipes.definition.loots]]
//! kind = "stackable_item"
//! contract = 2
//! token_id = 5
//! amount = 1
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collaborators::{LootEngine, RequirementEngine};
use crate::error::{CraftingError, CraftingResult};
use crate::recipe::{RecipeDefinition, RecipeId, RecipeInput, TokenKind};

/// A stored recipe and its cached randomness flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredRecipe {
    /// The definition exactly as it was set.
    pub definition: RecipeDefinition,
    /// Whether crafting this recipe waits for the randomness authority.
    pub needs_randomness: bool,
}

/// All recipes indexed by id.
#[derive(Debug, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<RecipeId, RegisteredRecipe>,
}

impl RecipeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a definition, replacing any previous one.
    ///
    /// Returns the computed `needs_randomness` flag. Nothing is stored if
    /// validation fails.
    ///
    /// # Errors
    ///
    /// See [`RecipeRegistry::validate`].
    pub fn set_definition(
        &mut self,
        recipe_id: RecipeId,
        definition: RecipeDefinition,
        requirements: &dyn RequirementEngine,
        loot: &dyn LootEngine,
    ) -> CraftingResult<bool> {
        let needs_randomness = Self::validate(recipe_id, &definition, requirements, loot)?;
        self.store(recipe_id, definition, needs_randomness);
        Ok(needs_randomness)
    }

    /// Validates a definition without storing it and returns its
    /// `needs_randomness` flag.
    ///
    /// # Errors
    ///
    /// - `EmptyInputs` / `EmptyLoots` for an empty input or loot list
    /// - `InvalidRecipeInput` for a malformed input
    /// - `InvalidRequirements` / `InvalidLootTable` from the collaborators
    pub fn validate(
        recipe_id: RecipeId,
        definition: &RecipeDefinition,
        requirements: &dyn RequirementEngine,
        loot: &dyn LootEngine,
    ) -> CraftingResult<bool> {
        if definition.inputs.is_empty() {
            return Err(CraftingError::EmptyInputs(recipe_id));
        }
        if definition.loots.is_empty() {
            return Err(CraftingError::EmptyLoots(recipe_id));
        }
        for (index, input) in definition.inputs.iter().enumerate() {
            validate_input(recipe_id, index, input)?;
        }

        requirements.validate_requirements(&definition.requirements)?;
        let loot_is_probabilistic = loot.validate_loots(&definition.loots)?;

        Ok(needs_randomness(definition, loot_is_probabilistic))
    }

    /// Stores an already validated definition.
    pub(crate) fn store(&mut self, recipe_id: RecipeId, definition: RecipeDefinition, needs_randomness: bool) {
        let replaced = self
            .recipes
            .insert(recipe_id, RegisteredRecipe { definition, needs_randomness })
            .is_some();
        tracing::debug!(recipe_id, needs_randomness, replaced, "recipe stored");
    }

    /// Toggles availability of an existing recipe.
    ///
    /// # Errors
    ///
    /// Returns `RecipeNotFound` if the recipe was never defined.
    pub fn set_enabled(&mut self, recipe_id: RecipeId, enabled: bool) -> CraftingResult<()> {
        let recipe = self
            .recipes
            .get_mut(&recipe_id)
            .ok_or(CraftingError::RecipeNotFound(recipe_id))?;
        recipe.definition.enabled = enabled;
        Ok(())
    }

    /// Gets a stored recipe.
    #[must_use]
    pub fn get(&self, recipe_id: RecipeId) -> Option<&RegisteredRecipe> {
        self.recipes.get(&recipe_id)
    }

    /// Gets a stored definition.
    #[must_use]
    pub fn definition(&self, recipe_id: RecipeId) -> Option<&RecipeDefinition> {
        self.recipes.get(&recipe_id).map(|r| &r.definition)
    }

    /// Cached randomness flag for a stored recipe.
    #[must_use]
    pub fn needs_randomness(&self, recipe_id: RecipeId) -> Option<bool> {
        self.recipes.get(&recipe_id).map(|r| r.needs_randomness)
    }

    /// Returns the number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Returns true if no recipe is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Computes whether a definition depends on external randomness.
#[must_use]
pub fn needs_randomness(definition: &RecipeDefinition, loot_is_probabilistic: bool) -> bool {
    loot_is_probabilistic
        || definition.base_success_probability.is_uncertain()
        || definition.inputs.iter().any(RecipeInput::has_uncertain_burn)
}

fn validate_input(recipe_id: RecipeId, index: usize, input: &RecipeInput) -> CraftingResult<()> {
    let invalid = |reason: &str| CraftingError::InvalidRecipeInput {
        recipe_id,
        index,
        reason: reason.to_string(),
    };

    if input.amount == 0 {
        return Err(invalid("amount must be at least 1"));
    }
    if input.kind == TokenKind::UniqueAsset && input.amount != 1 {
        return Err(invalid("unique asset inputs take exactly 1 token"));
    }
    if input.kind == TokenKind::Currency && !input.required {
        return Err(invalid("currency inputs cannot be optional"));
    }
    Ok(())
}

/// A TOML file of recipe definitions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBook {
    /// Entries in file order.
    #[serde(default)]
    pub recipes: Vec<RecipeBookEntry>,
}

/// One recipe in a [`RecipeBook`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBookEntry {
    /// Id the recipe is stored under.
    pub recipe_id: RecipeId,
    /// The full definition.
    pub definition: RecipeDefinition,
}

impl RecipeBook {
    /// Parses a recipe book.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on parse failure, including out-of-range
    /// probabilities.
    pub fn from_toml_str(source: &str) -> CraftingResult<Self> {
        toml::from_str(source).map_err(|e| CraftingError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a recipe book file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> CraftingResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| CraftingError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Serializes the book back to TOML.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if serialization fails.
    pub fn to_toml_string(&self) -> CraftingResult<String> {
        toml::to_string(self).map_err(|e| CraftingError::InvalidConfig(e.to_string()))
    }
}
