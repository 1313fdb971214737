//! Question Selection
//!
//! Realises a practice plan from a pool of candidate questions. Draws are
//! without replacement and use only the caller's RNG.
//!
//! Fill order per category: preferred format, then any other format of
//! the same category. Whatever is still missing after every category has
//! been served is backfilled from the rest of the pool.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::allocation::PracticePlan;
use crate::types::{Category, QuestionFormat};

/// Deterministic RNG for reproducible selections
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionRef {
    pub id: i64,
    pub category: Category,
    pub format: QuestionFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    PreferredFormat,
    OtherFormat,
    GeneralPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedQuestion {
    pub question: QuestionRef,
    /// Category slot this question fills
    pub slot: Category,
    pub source: SelectionSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub questions: Vec<SelectedQuestion>,
    /// Slots left empty because the pool ran out
    pub unfilled: u32,
}

impl Selection {
    pub fn ids(&self) -> Vec<i64> {
        self.questions.iter().map(|q| q.question.id).collect()
    }

    pub fn backfilled(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.source == SelectionSource::GeneralPool)
            .count()
    }
}

/// Draw up to `wanted` unused questions matching `accept`
fn draw<R, F>(
    pool: &[QuestionRef],
    used: &mut HashSet<i64>,
    wanted: usize,
    rng: &mut R,
    accept: F,
) -> Vec<QuestionRef>
where
    R: Rng + ?Sized,
    F: Fn(&QuestionRef) -> bool,
{
    if wanted == 0 {
        return Vec::new();
    }
    let mut candidates: Vec<QuestionRef> = pool
        .iter()
        .filter(|q| !used.contains(&q.id) && accept(q))
        .copied()
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(wanted);
    for q in &candidates {
        used.insert(q.id);
    }
    candidates
}

pub fn select_questions<R>(plan: &PracticePlan, pool: &[QuestionRef], rng: &mut R) -> Selection
where
    R: Rng + ?Sized,
{
    let mut used: HashSet<i64> = HashSet::new();
    let mut questions = Vec::new();
    let mut shortfall: Vec<(Category, usize)> = Vec::new();

    for item in plan.items() {
        let mut missing = item.count as usize;

        let preferred = draw(pool, &mut used, missing, rng, |q| {
            q.category == item.category && q.format == item.format
        });
        missing -= preferred.len();
        questions.extend(preferred.into_iter().map(|question| SelectedQuestion {
            question,
            slot: item.category,
            source: SelectionSource::PreferredFormat,
        }));

        let other = draw(pool, &mut used, missing, rng, |q| q.category == item.category);
        missing -= other.len();
        questions.extend(other.into_iter().map(|question| SelectedQuestion {
            question,
            slot: item.category,
            source: SelectionSource::OtherFormat,
        }));

        if missing > 0 {
            shortfall.push((item.category, missing));
        }
    }

    let mut unfilled = 0u32;
    for (slot, missing) in shortfall {
        let backfill = draw(pool, &mut used, missing, rng, |_| true);
        unfilled += (missing - backfill.len()) as u32;
        questions.extend(backfill.into_iter().map(|question| SelectedQuestion {
            question,
            slot,
            source: SelectionSource::GeneralPool,
        }));
    }

    Selection { questions, unfilled }
}
