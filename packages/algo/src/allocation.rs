//! Adaptive Allocator
//!
//! Turns a mistake profile into a per-category question budget.
//!
//! Categories are ranked by mistake count (stable, so ties keep the
//! caller's order). Each rank gets a band from the [`AllocationPolicy`]:
//! an amplification applied to the category's share of mistakes, and
//! `[min, max]` bounds applied after rounding against the budget.
//! Reconciliation then moves single units until the plan sums to the
//! budget exactly:
//! - surplus is added cycling from the most problematic rank down
//! - excess is retracted cycling from the least problematic rank up
//! - each pass first uses band slack, and only ignores the bands when
//!   none is left; counts never go below zero
//!
//! With no mistakes at all the budget is split evenly, remainder to the
//! first categories in list order.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mistakes::MistakeProfile;
use crate::types::{Category, QuestionFormat, DEFAULT_QUESTION_BUDGET};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("category list is empty")]
    NoCategories,
    #[error("category {0} listed more than once")]
    DuplicateCategory(Category),
    #[error("allocation policy has no rank bands")]
    EmptyPolicy,
    #[error("rank band {rank} is invalid: amplification {amplification}, bounds [{min}, {max}]")]
    InvalidBand {
        rank: usize,
        amplification: f64,
        min: u32,
        max: u32,
    },
}

// ==================== Policy ====================

/// Amplification and bounds for one rank position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankBand {
    pub amplification: f64,
    pub min: u32,
    pub max: u32,
}

impl RankBand {
    pub const fn new(amplification: f64, min: u32, max: u32) -> Self {
        Self {
            amplification,
            min,
            max,
        }
    }
}

/// Reference curve, defined for 5 categories and a budget of 20
const REFERENCE_CATEGORIES: f64 = 5.0;
const TOP_BAND: RankBand = RankBand::new(1.3, 5, 8);
const MIDDLE_BAND: RankBand = RankBand::new(1.0, 3, 5);
const BOTTOM_BAND: RankBand = RankBand::new(0.6, 1, 3);
/// Ranks whose relative position is below this are "top"
const TOP_CUTOFF: f64 = 0.4;
/// Ranks whose relative position is below this (and not top) are "middle"
const MIDDLE_CUTOFF: f64 = 0.6;

/// Rank-indexed bands; rank `i` uses `bands[i]`, ranks past the end reuse
/// the last band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    bands: Vec<RankBand>,
}

impl AllocationPolicy {
    pub fn new(bands: Vec<RankBand>) -> Result<Self, AllocationError> {
        if bands.is_empty() {
            return Err(AllocationError::EmptyPolicy);
        }
        for (rank, band) in bands.iter().enumerate() {
            let valid = band.amplification.is_finite() && band.amplification >= 0.0 && band.min <= band.max;
            if !valid {
                return Err(AllocationError::InvalidBand {
                    rank,
                    amplification: band.amplification,
                    min: band.min,
                    max: band.max,
                });
            }
        }
        Ok(Self { bands })
    }

    /// The literal five-rank table for a 20-question test
    pub fn standard() -> Self {
        Self::scaled(Category::ALL.len(), DEFAULT_QUESTION_BUDGET)
    }

    /// Sample the reference curve at each rank's relative position and
    /// scale the bounds by the per-category budget against the reference
    pub fn scaled(category_count: usize, budget: u32) -> Self {
        let n = category_count.max(1);
        let reference_share = f64::from(DEFAULT_QUESTION_BUDGET) / REFERENCE_CATEGORIES;
        let scale = f64::from(budget) / n as f64 / reference_share;

        let bands = (0..n)
            .map(|rank| {
                let position = (rank as f64 + 0.5) / n as f64;
                let base = if position < TOP_CUTOFF {
                    TOP_BAND
                } else if position < MIDDLE_CUTOFF {
                    MIDDLE_BAND
                } else {
                    BOTTOM_BAND
                };
                let min = (f64::from(base.min) * scale).round() as u32;
                let max = ((f64::from(base.max) * scale).round() as u32).max(min);
                RankBand::new(base.amplification, min, max)
            })
            .collect();

        Self { bands }
    }

    pub fn bands(&self) -> &[RankBand] {
        &self.bands
    }

    pub fn band(&self, rank: usize) -> RankBand {
        self.bands
            .get(rank)
            .or_else(|| self.bands.last())
            .copied()
            .unwrap_or(BOTTOM_BAND)
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

// ==================== Plan ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Mistake-weighted allocation
    Weighted,
    /// No mistakes recorded; budget split evenly
    EvenSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    pub category: Category,
    pub mistakes: u32,
    /// Position in the mistake-descending order
    pub rank: usize,
    pub count: u32,
}

/// Target question count per category, in the caller's category order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub mode: AllocationMode,
    pub budget: u32,
    allocations: Vec<CategoryAllocation>,
}

impl AllocationPlan {
    pub fn allocations(&self) -> &[CategoryAllocation] {
        &self.allocations
    }

    pub fn get(&self, category: Category) -> Option<u32> {
        self.allocations
            .iter()
            .find(|a| a.category == category)
            .map(|a| a.count)
    }

    pub fn total(&self) -> u32 {
        self.allocations.iter().map(|a| a.count).sum()
    }

    /// `(category, count)` pairs with a non-zero count
    pub fn non_zero(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        self.allocations
            .iter()
            .filter(|a| a.count > 0)
            .map(|a| (a.category, a.count))
    }

    pub fn counts(&self) -> BTreeMap<Category, u32> {
        self.allocations.iter().map(|a| (a.category, a.count)).collect()
    }

    /// Attach a question format to every category that receives questions
    pub fn with_formats<F>(self, mut format_for: F) -> PracticePlan
    where
        F: FnMut(Category) -> QuestionFormat,
    {
        let formats = self
            .non_zero()
            .map(|(category, _)| (category, format_for(category)))
            .collect();
        PracticePlan {
            allocation: self,
            formats,
        }
    }
}

/// One category's slice of a practice plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCategory {
    pub category: Category,
    pub count: u32,
    pub format: QuestionFormat,
}

/// Allocation plus the preferred format of every non-empty category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticePlan {
    pub allocation: AllocationPlan,
    pub formats: BTreeMap<Category, QuestionFormat>,
}

impl PracticePlan {
    pub fn mode(&self) -> AllocationMode {
        self.allocation.mode
    }

    /// Non-empty categories in plan order
    pub fn items(&self) -> Vec<PlannedCategory> {
        self.allocation
            .non_zero()
            .map(|(category, count)| PlannedCategory {
                category,
                count,
                format: self.formats.get(&category).copied().unwrap_or_default(),
            })
            .collect()
    }
}

// ==================== Allocation ====================

/// Distribute `budget` questions over `categories`.
///
/// Mistakes recorded for categories outside the list are ignored.
pub fn allocate(
    profile: &MistakeProfile,
    budget: u32,
    categories: &[Category],
    policy: &AllocationPolicy,
) -> Result<AllocationPlan, AllocationError> {
    if categories.is_empty() {
        return Err(AllocationError::NoCategories);
    }
    let mut seen = HashSet::with_capacity(categories.len());
    for &category in categories {
        if !seen.insert(category) {
            return Err(AllocationError::DuplicateCategory(category));
        }
    }

    let mistakes: Vec<u32> = categories.iter().map(|&c| profile.count(c)).collect();
    let total: u64 = mistakes.iter().map(|&m| u64::from(m)).sum();

    if total == 0 {
        return Ok(even_split(budget, categories));
    }

    // stable: ties keep list order
    let mut order: Vec<usize> = (0..categories.len()).collect();
    order.sort_by(|&a, &b| mistakes[b].cmp(&mistakes[a]));

    let mut ranks = vec![0usize; categories.len()];
    for (rank, &index) in order.iter().enumerate() {
        ranks[index] = rank;
    }

    let bands: Vec<RankBand> = ranks.iter().map(|&rank| policy.band(rank)).collect();
    let mut counts: Vec<u32> = (0..categories.len())
        .map(|i| {
            let share = f64::from(mistakes[i]) / total as f64;
            let target = (share * bands[i].amplification * f64::from(budget)).round();
            // f64 -> u32 saturates, so the band clamp sees sane values
            (target as u32).clamp(bands[i].min, bands[i].max)
        })
        .collect();

    reconcile(&mut counts, &bands, &order, budget);

    let allocations = categories
        .iter()
        .enumerate()
        .map(|(i, &category)| CategoryAllocation {
            category,
            mistakes: mistakes[i],
            rank: ranks[i],
            count: counts[i],
        })
        .collect();

    Ok(AllocationPlan {
        mode: AllocationMode::Weighted,
        budget,
        allocations,
    })
}

fn even_split(budget: u32, categories: &[Category]) -> AllocationPlan {
    let n = categories.len() as u32;
    let base = budget / n;
    let remainder = (budget % n) as usize;

    let allocations = categories
        .iter()
        .enumerate()
        .map(|(i, &category)| CategoryAllocation {
            category,
            mistakes: 0,
            rank: i,
            count: base + u32::from(i < remainder),
        })
        .collect();

    AllocationPlan {
        mode: AllocationMode::EvenSplit,
        budget,
        allocations,
    }
}

/// Move single units until `counts` sums to `budget`. `order` lists
/// category indices from most to least mistakes.
/// Surplus is added walking down `order`. Excess is retracted walking the
/// opposite way, least-mistaken rank first.
fn reconcile(counts: &mut [u32], bands: &[RankBand], order: &[usize], budget: u32) {
    let sum: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    let budget = u64::from(budget);

    if sum < budget {
        let mut surplus = budget - sum;
        while surplus > 0 {
            let within_bands = distribute(counts, order.iter().copied(), &mut surplus, |i, c| c < bands[i].max);
            if !within_bands {
                distribute(counts, order.iter().copied(), &mut surplus, |_, _| true);
            }
        }
    } else if sum > budget {
        let mut excess = sum - budget;
        while excess > 0 {
            let within_bands = retract(counts, order.iter().rev().copied(), &mut excess, |i, c| c > bands[i].min);
            if !within_bands && !retract(counts, order.iter().rev().copied(), &mut excess, |_, c| c > 0) {
                break;
            }
        }
    }
}

/// One cycle of `+1`s; returns whether any unit moved
fn distribute<I, F>(counts: &mut [u32], cycle: I, remaining: &mut u64, eligible: F) -> bool
where
    I: Iterator<Item = usize>,
    F: Fn(usize, u32) -> bool,
{
    let mut moved = false;
    for i in cycle {
        if *remaining == 0 {
            break;
        }
        if eligible(i, counts[i]) {
            counts[i] += 1;
            *remaining -= 1;
            moved = true;
        }
    }
    moved
}

/// One cycle of `-1`s; returns whether any unit moved
fn retract<I, F>(counts: &mut [u32], cycle: I, remaining: &mut u64, eligible: F) -> bool
where
    I: Iterator<Item = usize>,
    F: Fn(usize, u32) -> bool,
{
    let mut moved = false;
    for i in cycle {
        if *remaining == 0 {
            break;
        }
        if counts[i] > 0 && eligible(i, counts[i]) {
            counts[i] -= 1;
            *remaining -= 1;
            moved = true;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario_profile() -> MistakeProfile {
        MistakeProfile::from_counts([
            (Category::Grammar, 10),
            (Category::Vocabulary, 6),
            (Category::Reading, 3),
            (Category::Listening, 1),
            (Category::Speaking, 0),
        ])
    }

    #[test]
    fn test_standard_policy_matches_reference_table() {
        let policy = AllocationPolicy::standard();
        assert_eq!(
            policy.bands(),
            &[
                RankBand::new(1.3, 5, 8),
                RankBand::new(1.3, 5, 8),
                RankBand::new(1.0, 3, 5),
                RankBand::new(0.6, 1, 3),
                RankBand::new(0.6, 1, 3),
            ]
        );
    }

    #[test]
    fn test_scaled_policy_grows_with_budget() {
        let policy = AllocationPolicy::scaled(5, 40);
        assert_eq!(policy.band(0), RankBand::new(1.3, 10, 16));
        assert_eq!(policy.band(2), RankBand::new(1.0, 6, 10));
        assert_eq!(policy.band(4), RankBand::new(0.6, 2, 6));
        // ranks past the table reuse the last band
        assert_eq!(policy.band(9), policy.band(4));
    }

    #[test]
    fn test_policy_validation() {
        assert_eq!(AllocationPolicy::new(vec![]), Err(AllocationError::EmptyPolicy));
        assert!(matches!(
            AllocationPolicy::new(vec![RankBand::new(1.0, 4, 2)]),
            Err(AllocationError::InvalidBand { rank: 0, .. })
        ));
        assert!(AllocationPolicy::new(vec![RankBand::new(f64::NAN, 0, 2)]).is_err());
        assert!(AllocationPolicy::new(vec![RankBand::new(2.0, 0, 2)]).is_ok());
    }

    #[test]
    fn test_scenario_allocation() {
        let plan = allocate(
            &scenario_profile(),
            20,
            &Category::ALL,
            &AllocationPolicy::standard(),
        )
        .unwrap();

        assert_eq!(plan.mode, AllocationMode::Weighted);
        assert_eq!(plan.total(), 20);
        assert_eq!(plan.get(Category::Grammar), Some(8));
        assert_eq!(plan.get(Category::Vocabulary), Some(7));
        assert_eq!(plan.get(Category::Reading), Some(3));
        assert_eq!(plan.get(Category::Listening), Some(1));
        assert_eq!(plan.get(Category::Speaking), Some(1));

        let grammar = plan.get(Category::Grammar).unwrap();
        let vocabulary = plan.get(Category::Vocabulary).unwrap();
        let reading = plan.get(Category::Reading).unwrap();
        let listening = plan.get(Category::Listening).unwrap();
        assert!(grammar >= vocabulary && vocabulary >= reading && reading >= listening);
        assert!((5..=8).contains(&grammar) && (5..=8).contains(&vocabulary));
        assert!((3..=5).contains(&reading));
        assert!((1..=3).contains(&listening));
    }

    #[test]
    fn test_ranks_follow_mistakes() {
        let plan = allocate(
            &scenario_profile(),
            20,
            &Category::ALL,
            &AllocationPolicy::standard(),
        )
        .unwrap();
        let ranks: Vec<usize> = plan.allocations().iter().map(|a| a.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_ties_keep_caller_order() {
        let profile = MistakeProfile::from_counts([(Category::Reading, 4), (Category::Grammar, 4)]);
        let categories = [Category::Reading, Category::Grammar, Category::Speaking];
        let plan = allocate(&profile, 12, &categories, &AllocationPolicy::scaled(3, 12)).unwrap();
        assert_eq!(plan.allocations()[0].rank, 0);
        assert_eq!(plan.allocations()[1].rank, 1);
        assert_eq!(plan.total(), 12);
    }

    #[test]
    fn test_zero_mistakes_even_split() {
        let plan = allocate(
            &MistakeProfile::default(),
            22,
            &Category::ALL,
            &AllocationPolicy::standard(),
        )
        .unwrap();
        assert_eq!(plan.mode, AllocationMode::EvenSplit);
        let counts: Vec<u32> = plan.allocations().iter().map(|a| a.count).collect();
        assert_eq!(counts, vec![5, 5, 4, 4, 4]);
    }

    #[test]
    fn test_mistakes_outside_list_are_ignored() {
        let profile = MistakeProfile::from_counts([(Category::Speaking, 9)]);
        let plan = allocate(
            &profile,
            10,
            &[Category::Grammar, Category::Reading],
            &AllocationPolicy::scaled(2, 10),
        )
        .unwrap();
        assert_eq!(plan.mode, AllocationMode::EvenSplit);
        assert_eq!(plan.get(Category::Speaking), None);
    }

    #[test]
    fn test_invalid_category_lists() {
        let policy = AllocationPolicy::standard();
        assert_eq!(
            allocate(&scenario_profile(), 20, &[], &policy),
            Err(AllocationError::NoCategories)
        );
        assert_eq!(
            allocate(
                &scenario_profile(),
                20,
                &[Category::Grammar, Category::Grammar],
                &policy
            ),
            Err(AllocationError::DuplicateCategory(Category::Grammar))
        );
    }

    #[test]
    fn test_small_budget_retracts_from_least_mistaken_first() {
        // band minimums alone need 15; the last 10 come off the bottom ranks first
        let plan = allocate(&scenario_profile(), 5, &Category::ALL, &AllocationPolicy::standard()).unwrap();
        assert_eq!(plan.get(Category::Grammar), Some(3));
        assert_eq!(plan.get(Category::Vocabulary), Some(2));
        assert_eq!(plan.get(Category::Reading), Some(0));
        assert_eq!(plan.get(Category::Listening), Some(0));
        assert_eq!(plan.get(Category::Speaking), Some(0));
    }

    #[test]
    fn test_zero_budget_drains_every_band() {
        let plan = allocate(&scenario_profile(), 0, &Category::ALL, &AllocationPolicy::standard()).unwrap();
        assert_eq!(plan.total(), 0);
        assert_eq!(plan.non_zero().count(), 0);
    }

    #[test]
    fn test_practice_plan_only_formats_non_empty_categories() {
        let profile = MistakeProfile::from_counts([(Category::Grammar, 5)]);
        let categories = [Category::Grammar, Category::Vocabulary];
        let policy = AllocationPolicy::new(vec![RankBand::new(1.0, 0, 10)]).unwrap();
        let plan = allocate(&profile, 6, &categories, &policy).unwrap();
        assert_eq!(plan.get(Category::Grammar), Some(6));
        assert_eq!(plan.get(Category::Vocabulary), Some(0));

        let practice = plan.with_formats(|_| QuestionFormat::Matching);
        assert_eq!(practice.formats.len(), 1);
        let items = practice.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, Category::Grammar);
        assert_eq!(items[0].format, QuestionFormat::Matching);
    }

    proptest! {
        #[test]
        fn allocation_is_budget_exact(
            counts in proptest::collection::vec(0u32..60, 5),
            budget in 0u32..120,
            scaled in any::<bool>(),
        ) {
            let profile = MistakeProfile::from_counts(Category::ALL.into_iter().zip(counts));
            let policy = if scaled {
                AllocationPolicy::scaled(Category::ALL.len(), budget)
            } else {
                AllocationPolicy::standard()
            };
            let plan = allocate(&profile, budget, &Category::ALL, &policy).unwrap();
            prop_assert_eq!(plan.total(), budget);
            prop_assert_eq!(plan.allocations().len(), Category::ALL.len());
        }

        #[test]
        fn even_split_differs_by_at_most_one(budget in 0u32..500, n in 1usize..=5) {
            let categories = &Category::ALL[..n];
            let plan = allocate(
                &MistakeProfile::default(),
                budget,
                categories,
                &AllocationPolicy::scaled(n, budget),
            )
            .unwrap();
            let counts: Vec<u32> = plan.allocations().iter().map(|a| a.count).collect();
            let max = *counts.iter().max().unwrap();
            let min = *counts.iter().min().unwrap();
            prop_assert!(max - min <= 1);
            prop_assert_eq!(plan.total(), budget);
        }

        #[test]
        fn bands_hold_when_budget_allows(counts in proptest::collection::vec(1u32..30, 5)) {
            let profile = MistakeProfile::from_counts(Category::ALL.into_iter().zip(counts));
            let policy = AllocationPolicy::standard();
            let plan = allocate(&profile, 20, &Category::ALL, &policy).unwrap();
            for allocation in plan.allocations() {
                let band = policy.band(allocation.rank);
                prop_assert!(allocation.count >= band.min && allocation.count <= band.max);
            }
        }
    }
}
