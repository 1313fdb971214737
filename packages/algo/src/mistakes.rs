//! Mistake Profile
//!
//! Per-category wrong-answer counts derived from graded answers, and the
//! misconception report built on them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AnswerRecord, Category};

/// Wrong answers per category, with the offending question ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MistakeProfile {
    counts: BTreeMap<Category, u32>,
    wrong_questions: BTreeMap<Category, Vec<i64>>,
}

/// A category the learner keeps getting wrong
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Misconception {
    pub category: Category,
    pub mistakes: u32,
    /// Share of all mistakes, 0-100
    pub percentage: f64,
    pub wrong_questions: Vec<i64>,
}

impl MistakeProfile {
    /// Count wrong answers; correct answers are ignored
    pub fn from_answers<'a, I>(answers: I) -> Self
    where
        I: IntoIterator<Item = &'a AnswerRecord>,
    {
        let mut profile = Self::default();
        for answer in answers.into_iter().filter(|a| !a.is_correct) {
            let count = profile.counts.entry(answer.category).or_insert(0);
            *count = count.saturating_add(1);
            profile
                .wrong_questions
                .entry(answer.category)
                .or_default()
                .push(answer.question_id);
        }
        profile
    }

    /// Profile from bare counts, without question ids
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (Category, u32)>,
    {
        let mut profile = Self::default();
        for (category, count) in counts {
            let entry = profile.counts.entry(category).or_insert(0);
            *entry = entry.saturating_add(count);
        }
        profile
    }

    pub fn count(&self, category: Category) -> u32 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<Category, u32> {
        &self.counts
    }

    /// Sum over categories; widened so large per-category counts can't wrap
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&count| u64::from(count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn wrong_questions(&self, category: Category) -> &[i64] {
        self.wrong_questions
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Categories with at least one mistake, most mistakes first
    pub fn misconceptions(&self) -> Vec<Misconception> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }

        let mut report: Vec<Misconception> = self
            .counts
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&category, &count)| Misconception {
                category,
                mistakes: count,
                percentage: f64::from(count) / total as f64 * 100.0,
                wrong_questions: self.wrong_questions(category).to_vec(),
            })
            .collect();

        // stable: equal counts stay in category order
        report.sort_by(|a, b| b.mistakes.cmp(&a.mistakes));
        report
    }
}
