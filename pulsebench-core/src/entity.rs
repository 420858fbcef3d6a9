// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Synthetic entity written by the database fan-out.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Document;

/// Oldest age a synthetic entity can have.
pub const MAX_AGE: u8 = 100;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Dennis", "Edsger", "Frances", "Grace", "Ken", "Leslie",
    "Linus", "Margaret", "Niklaus", "Radia", "Tim", "Yukihiro",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Dijkstra", "Hamilton", "Hopper", "Kernighan", "Lamport", "Liskov", "Lovelace",
    "Matsumoto", "Perlman", "Ritchie", "Shannon", "Thompson", "Torvalds", "Turing", "Wirth",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticEntity {
    pub id: Uuid,
    pub name: String,
    pub age: u8,
}

impl SyntheticEntity {
    /// A fresh entity with a random full name and an age in `0..=MAX_AGE`.
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Ada");
        let last = LAST_NAMES.choose(rng).copied().unwrap_or("Lovelace");
        Self {
            id: Uuid::new_v4(),
            name: format!("{} {}", first, last),
            age: rng.gen_range(0..=MAX_AGE),
        }
    }
}

impl Document for SyntheticEntity {
    const COLLECTION: &'static str = "entities";
}
