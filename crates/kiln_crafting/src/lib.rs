//! # KILN Crafting Engine
//!
//! Converts player-supplied inputs into probabilistic rewards under
//! operator-defined recipes.
//!
//! ## Design Principles
//!
//! 1. **Zero floating point** - Every probability and share is basis points (0-10000)
//! 2. **Exactly-once settlement** - A craft completes through one path, once
//! 3. **All-or-nothing operations** - A failed call leaves no trace
//! 4. **External configuration** - Engine tunables and recipe books live in TOML files
//!
//! ## Features
//!
//! - `test-util` (default) - In-memory collaborators in [`in_memory`], with a
//!   seeded ChaCha randomness authority. Embedders with their own
//!   collaborators can turn it off, which also drops `rand`.
//!
//! ## Two Settlement Paths
//!
//! Deterministic recipes settle inside [`CraftingEngine::craft`]. Recipes
//! whose outcome depends on chance issue a randomness request and settle
//! when the authority calls [`CraftingEngine::fulfill_random_words`].
//! Duplicate or late deliveries are ignored.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kiln_crafting::{CraftingEngine, EngineConfig, RecipeBook};
//!
//! let mut engine = CraftingEngine::new(EngineConfig::from_file("kiln.toml")?, collaborators)?;
//! engine.load_recipe_book(ADMIN, &RecipeBook::from_file("recipes.toml")?)?;
//!
//! let craft_id = engine.craft(player, recipe_id, &inputs, 3)?;
//! for event in engine.drain_events() {
//!     audit.record(event);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod active;
pub mod basis_points;
pub mod collaborators;
pub mod config;
pub mod correlator;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod events;
#[cfg(feature = "test-util")]
pub mod in_memory;
pub mod probability;
pub mod recipe;
pub mod registry;
pub mod settlement;
pub mod shared;

pub use active::{AccountData, ActiveCraft, ActiveCraftStore, CraftStatus, ReservedToken};
pub use basis_points::{BasisPoints, BASIS_POINTS_DENOMINATOR};
pub use collaborators::{
    AccessControl, AttributeStore, Capability, Clock, Collaborators, IdentityResolver,
    LevelingEngine, LootEngine, PauseGate, RandomnessAuthority, RequirementEngine,
    ReservationEngine, SystemClock, TokenLedger,
};
pub use config::EngineConfig;
pub use correlator::{PendingRandomnessRequest, RandomnessCorrelator};
pub use engine::CraftingEngine;
pub use error::{CraftingError, CraftingResult, ErrorKind};
pub use events::CraftingEvent;
pub use probability::{next_random_word, weighted_coin_flip_batch, RandomWord};
pub use recipe::{
    AccountId, AccountRequirement, ActiveCraftId, CallerId, ContractId, CraftInput, LootEntry,
    LootKind, RecipeDefinition, RecipeId, RecipeInput, RequestId, ReservationHandle, TokenId,
    TokenKind, TokenRef, TraitCheck, TraitCheckOp,
};
pub use registry::{RecipeBook, RecipeBookEntry, RecipeRegistry, RegisteredRecipe};
pub use settlement::{SettlementFailure, SettlementPlan, SettlementReport};
pub use shared::SharedCraftingEngine;
