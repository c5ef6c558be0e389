//! # Probability Resolver
//!
//! **Batched weighted coin flips over a single random word**
//!
//! A probabilistic craft receives one random word from the randomness
//! authority. Everything that happens afterwards (the batch success roll,
//! one loot roll per success, per-input burn rolls) is derived from that
//! word deterministically, so a settlement can be replayed from the word
//! alone.
//!
//! ## Derivation Contract
//!
//! ```text
//! word_0 = next(seed)
//! trial i reads 32-bit lane (i % 4) of word_(i / 4)
//! success  <=> lane % 10000 < probability
//! next_seed = next(last word used)
//! ```
//!
//! `next` is SipHash-2-4 (128-bit output) under fixed keys: a one-way step,
//! so earlier rolls cannot be recovered from a later seed. The number of
//! derivation steps depends only on the number of trials, never on the
//! probability, which lets 0% and 100% short-circuit without changing
//! `next_seed`.

use std::hash::Hasher;

use siphasher::sip128::{Hasher128, SipHasher24};

use crate::basis_points::{BasisPoints, BASIS_POINTS_DENOMINATOR};

/// A random word as delivered by the randomness authority.
pub type RandomWord = u128;

/// Fixed SipHash keys for seed derivation.
const DERIVATION_KEYS: (u64, u64) = (0x6B69_6C6E_5F73_6565, 0x645F_6465_7269_7665);

/// Number of 32-bit lanes in one random word.
const LANES_PER_WORD: u8 = 4;

/// Width of one lane in bits.
const LANE_BITS: u32 = 32;

/// Advances a seed by one one-way derivation step.
///
/// Used to decorrelate sequential loot rolls from probability rolls.
#[inline]
#[must_use]
pub fn next_random_word(seed: RandomWord) -> RandomWord {
    let mut hasher = SipHasher24::new_with_keys(DERIVATION_KEYS.0, DERIVATION_KEYS.1);
    hasher.write(&seed.to_le_bytes());
    let hash = hasher.finish128();
    (u128::from(hash.h1) << 64) | u128::from(hash.h2)
}

/// Runs `trials` independent Bernoulli trials with success probability
/// `probability`, all derived from `seed`.
///
/// Returns `(success_count, next_seed)`.
///
/// 0% and 100% never inspect the lanes but still perform the same number
/// of derivation steps, so `next_seed` is identical for every probability.
#[must_use]
pub fn weighted_coin_flip_batch(
    seed: RandomWord,
    probability: BasisPoints,
    trials: u8,
) -> (u8, RandomWord) {
    let mut word = next_random_word(seed);

    if probability.is_zero() || probability.is_certain() {
        for _ in 1..words_for(trials) {
            word = next_random_word(word);
        }
        let successes = if probability.is_certain() { trials } else { 0 };
        return (successes, next_random_word(word));
    }

    let threshold = u128::from(probability.get());
    let modulus = u128::from(BASIS_POINTS_DENOMINATOR);
    let mut successes = 0u8;

    for trial in 0..trials {
        let lane = trial % LANES_PER_WORD;
        if lane == 0 && trial > 0 {
            word = next_random_word(word);
        }
        let roll = (word >> (u32::from(lane) * LANE_BITS)) & 0xFFFF_FFFF;
        if roll % modulus < threshold {
            successes += 1;
        }
    }

    (successes, next_random_word(word))
}

/// Number of words a batch of `trials` consumes (at least one).
#[inline]
const fn words_for(trials: u8) -> u8 {
    if trials == 0 {
        1
    } else {
        trials.div_ceil(LANES_PER_WORD)
    }
}
