//! Integration test for the shipped configuration files.

use std::path::PathBuf;

use kiln_crafting::in_memory::InMemoryWorld;
use kiln_crafting::{Capability, CraftingEngine, EngineConfig, RecipeBook, TokenKind, TraitCheckOp};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

#[test]
fn test_engine_config_file() {
    let config = EngineConfig::from_file(data_path("kiln.toml")).unwrap();

    assert_eq!(config.max_craft_amount, 64);
    assert_eq!(config.random_words_per_request, 1);
    assert_eq!(config.event_buffer_capacity, 4096);
}

#[test]
fn test_recipe_book_file() {
    let book = RecipeBook::from_file(data_path("recipes.toml")).unwrap();
    assert_eq!(book.recipes.len(), 2);

    let infusion = &book.recipes[1].definition;
    assert_eq!(infusion.base_success_probability.get(), 7_500);
    assert_eq!(infusion.inputs[0].kind, TokenKind::UniqueAsset);
    assert_eq!(infusion.inputs[0].trait_checks[0].op, TraitCheckOp::GreaterThan);
    assert!(infusion.inputs[1].burns_on_outcome());
}

#[test]
fn test_shipped_recipes_load_into_engine() {
    let world = InMemoryWorld::new(0);
    world.access.grant(Capability::RecipeManager, 1);
    let config = EngineConfig::from_file(data_path("kiln.toml")).unwrap();
    let mut engine = CraftingEngine::new(config, world.collaborators()).unwrap();

    let book = RecipeBook::from_file(data_path("recipes.toml")).unwrap();
    assert_eq!(engine.load_recipe_book(1, &book), Ok(2));

    assert_eq!(engine.recipe_needs_randomness(1), Some(false));
    assert_eq!(engine.recipe_needs_randomness(2), Some(true));
}
