//! Learning Style Tracker
//!
//! Per `(learner, category, format)` statistics and the queries built on
//! them. Everything here is pure: the caller loads the current record,
//! applies an attempt, and persists the result atomically.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    AnswerRecord, Category, QuestionFormat, MIN_ATTEMPTS_FOR_CONFIDENCE, RESPONSE_TIME_CEILING, SPEED_WEIGHT,
    SUCCESS_RATE_WEIGHT,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptError {
    #[error("response time must be a positive number of seconds, got {0}")]
    InvalidResponseTime(f64),
    #[error("learner id must not be empty")]
    EmptyLearnerId,
}

// ==================== Records ====================

/// Identity of a learning preference record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PreferenceKey {
    pub learner_id: String,
    pub category: Category,
    pub format: QuestionFormat,
}

/// One answered question, as fed to the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub learner_id: String,
    pub category: Category,
    pub format: QuestionFormat,
    pub is_correct: bool,
    /// Seconds, strictly positive
    pub response_time: f64,
}

impl Attempt {
    pub fn validate(&self) -> Result<(), AttemptError> {
        if self.learner_id.trim().is_empty() {
            return Err(AttemptError::EmptyLearnerId);
        }
        if !self.response_time.is_finite() || self.response_time <= 0.0 {
            return Err(AttemptError::InvalidResponseTime(self.response_time));
        }
        Ok(())
    }

    pub fn key(&self) -> PreferenceKey {
        PreferenceKey {
            learner_id: self.learner_id.clone(),
            category: self.category,
            format: self.format,
        }
    }
}

impl From<&AnswerRecord> for Attempt {
    fn from(answer: &AnswerRecord) -> Self {
        Self {
            learner_id: answer.learner_id.clone(),
            category: answer.category,
            format: answer.format,
            is_correct: answer.is_correct,
            response_time: answer.response_time,
        }
    }
}

/// Running statistics for one `(learner, category, format)` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPreference {
    pub learner_id: String,
    pub category: Category,
    pub format: QuestionFormat,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    /// Percentage in [0, 100]
    pub success_rate: f64,
    /// Exact running mean of response times, seconds
    pub avg_response_time: f64,
    pub last_updated: DateTime<Utc>,
}

impl LearningPreference {
    /// Record created by the first attempt on a key
    pub fn first(attempt: &Attempt, now: DateTime<Utc>) -> Self {
        let correct = u32::from(attempt.is_correct);
        Self {
            learner_id: attempt.learner_id.clone(),
            category: attempt.category,
            format: attempt.format,
            total_attempts: 1,
            correct_attempts: correct,
            success_rate: f64::from(correct) * 100.0,
            avg_response_time: attempt.response_time,
            last_updated: now,
        }
    }

    /// Fold one more attempt into the running statistics
    pub fn record(&mut self, is_correct: bool, response_time: f64, now: DateTime<Utc>) {
        let new_total = self.total_attempts + 1;
        // incremental form of (avg * n + t) / (n + 1); exact when t == avg
        self.avg_response_time += (response_time - self.avg_response_time) / f64::from(new_total);
        self.total_attempts = new_total;
        if is_correct {
            self.correct_attempts += 1;
        }
        self.success_rate = f64::from(self.correct_attempts) / f64::from(self.total_attempts) * 100.0;
        self.last_updated = now;
    }

    pub fn key(&self) -> PreferenceKey {
        PreferenceKey {
            learner_id: self.learner_id.clone(),
            category: self.category,
            format: self.format,
        }
    }
}

/// Create or update the record for `attempt`'s key
pub fn apply_attempt(
    existing: Option<LearningPreference>,
    attempt: &Attempt,
    now: DateTime<Utc>,
) -> LearningPreference {
    match existing {
        Some(mut pref) => {
            pref.record(attempt.is_correct, attempt.response_time, now);
            pref
        }
        None => LearningPreference::first(attempt, now),
    }
}

/// Order records by category, then by descending success rate
pub fn sort_for_listing(prefs: &mut [LearningPreference]) {
    prefs.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| b.success_rate.total_cmp(&a.success_rate))
            .then_with(|| a.format.cmp(&b.format))
    });
}

// ==================== Queries ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Attempts a record needs before it can be recommended
    pub min_attempts: u32,
    /// Returned when no record qualifies
    pub default_format: QuestionFormat,
    /// Time at or above which the speed component scores zero
    pub response_time_ceiling: f64,
    pub success_weight: f64,
    pub speed_weight: f64,
    /// Categories reported by `recommended_formats`
    pub categories: Vec<Category>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            min_attempts: MIN_ATTEMPTS_FOR_CONFIDENCE,
            default_format: QuestionFormat::default(),
            response_time_ceiling: RESPONSE_TIME_CEILING,
            success_weight: SUCCESS_RATE_WEIGHT,
            speed_weight: SPEED_WEIGHT,
            categories: Category::ALL.to_vec(),
        }
    }
}

/// Higher success first, then faster, then canonical format order
fn compare_candidates(a: &LearningPreference, b: &LearningPreference) -> Ordering {
    b.success_rate
        .total_cmp(&a.success_rate)
        .then_with(|| a.avg_response_time.total_cmp(&b.avg_response_time))
        .then_with(|| a.format.cmp(&b.format))
}

/// Best format for one category of a learner's records; never fails
pub fn best_format(
    prefs: &[LearningPreference],
    category: Category,
    config: &StyleConfig,
) -> QuestionFormat {
    prefs
        .iter()
        .filter(|p| p.category == category && p.total_attempts >= config.min_attempts)
        .min_by(|a, b| compare_candidates(a, b))
        .map(|p| p.format)
        .unwrap_or(config.default_format)
}

/// `best_format` for every configured category
pub fn recommended_formats(
    prefs: &[LearningPreference],
    config: &StyleConfig,
) -> BTreeMap<Category, QuestionFormat> {
    config
        .categories
        .iter()
        .map(|&category| (category, best_format(prefs, category, config)))
        .collect()
}

/// Aggregate statistics of one format across categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatStats {
    pub format: QuestionFormat,
    /// Number of per-category records contributing
    pub records: usize,
    pub total_attempts: u32,
    pub avg_success_rate: f64,
    pub avg_response_time: f64,
    pub composite_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleAnalysis {
    pub best_format: QuestionFormat,
    /// Average success rate of the best format, in [0, 1]
    pub overall_success_rate: f64,
    /// Composite score of the best format
    pub overall_score: f64,
    pub format_stats: Vec<FormatStats>,
    pub recommendations: BTreeMap<Category, QuestionFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StyleSummary {
    InsufficientData,
    Analyzed(StyleAnalysis),
}

impl StyleConfig {
    /// `success_weight * success + speed_weight * speed`, where speed maps
    /// 0s to 100 and the ceiling (or slower) to 0
    pub fn composite_score(&self, avg_success_rate: f64, avg_response_time: f64) -> f64 {
        let ceiling = self.response_time_ceiling.max(f64::MIN_POSITIVE);
        let speed = ((ceiling - avg_response_time) / ceiling * 100.0).clamp(0.0, 100.0);
        self.success_weight * avg_success_rate + self.speed_weight * speed
    }
}

/// Summarise how a learner performs per format
pub fn overall_style(prefs: &[LearningPreference], config: &StyleConfig) -> StyleSummary {
    if prefs.is_empty() {
        return StyleSummary::InsufficientData;
    }

    // (records, attempts, success sum, time sum)
    let mut per_format: BTreeMap<QuestionFormat, (usize, u32, f64, f64)> = BTreeMap::new();
    for p in prefs {
        let entry = per_format.entry(p.format).or_insert((0, 0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += p.total_attempts;
        entry.2 += p.success_rate;
        entry.3 += p.avg_response_time;
    }

    let format_stats: Vec<FormatStats> = per_format
        .into_iter()
        .map(|(format, (records, attempts, success_sum, time_sum))| {
            let n = records as f64;
            let avg_success_rate = success_sum / n;
            let avg_response_time = time_sum / n;
            FormatStats {
                format,
                records,
                total_attempts: attempts,
                avg_success_rate,
                avg_response_time,
                composite_score: config.composite_score(avg_success_rate, avg_response_time),
            }
        })
        .collect();

    let mut best = 0;
    for (i, stats) in format_stats.iter().enumerate().skip(1) {
        if stats.composite_score > format_stats[best].composite_score {
            best = i;
        }
    }
    let winner = &format_stats[best];
    let (best_format, overall_success_rate, overall_score) = (
        winner.format,
        winner.avg_success_rate / 100.0,
        winner.composite_score,
    );

    StyleSummary::Analyzed(StyleAnalysis {
        best_format,
        overall_success_rate,
        overall_score,
        recommendations: recommended_formats(prefs, config),
        format_stats,
    })
}
