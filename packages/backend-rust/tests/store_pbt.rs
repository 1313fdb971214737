//! Property-Based Tests for the preference store
//!
//! - Running mean: N identical attempts keep the response time exactly
//! - Consistency: the store agrees with a pure replay of the same attempts
//! - Counters: correct attempts never exceed total attempts

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use epp_algo::learning_style::apply_attempt;
use epp_algo::{Attempt, Category, LearningPreference, PreferenceKey, QuestionFormat};
use epp_backend_rust::Store;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_category() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn arb_format() -> impl Strategy<Value = QuestionFormat> {
    prop::sample::select(QuestionFormat::ALL.to_vec())
}

fn arb_attempt() -> impl Strategy<Value = Attempt> {
    (
        prop::sample::select(vec!["ana", "ben"]),
        arb_category(),
        arb_format(),
        any::<bool>(),
        (1u32..=400u32).prop_map(|tenths| f64::from(tenths) / 10.0),
    )
        .prop_map(|(learner, category, format, is_correct, response_time)| Attempt {
            learner_id: learner.to_string(),
            category,
            format,
            is_correct,
            response_time,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_identical_attempts_keep_exact_mean(
        n in 1usize..60,
        correct in any::<bool>(),
        response_time in 0.1f64..30.0,
    ) {
        let rt = runtime();
        let store = Store::memory();
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
        let attempt = Attempt {
            learner_id: "solo".to_string(),
            category: Category::Grammar,
            format: QuestionFormat::TrueFalse,
            is_correct: correct,
            response_time,
        };

        let last = rt.block_on(async {
            let mut last = None;
            for _ in 0..n {
                last = Some(store.record_attempt(&attempt, now).await.unwrap());
            }
            last.unwrap()
        });

        prop_assert_eq!(last.total_attempts as usize, n);
        prop_assert_eq!(last.avg_response_time, response_time);
        prop_assert_eq!(last.success_rate, if correct { 100.0 } else { 0.0 });
    }

    #[test]
    fn prop_store_matches_pure_replay(attempts in prop::collection::vec(arb_attempt(), 1..80)) {
        let rt = runtime();
        let store = Store::memory();
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();

        let mut expected: BTreeMap<PreferenceKey, LearningPreference> = BTreeMap::new();
        for attempt in &attempts {
            let previous = expected.remove(&attempt.key());
            expected.insert(attempt.key(), apply_attempt(previous, attempt, now));
        }

        let stored = rt.block_on(async {
            for attempt in &attempts {
                store.record_attempt(attempt, now).await.unwrap();
            }
            let mut all = store.preferences_for("ana").await.unwrap();
            all.extend(store.preferences_for("ben").await.unwrap());
            all
        });

        prop_assert_eq!(stored.len(), expected.len());
        for pref in &stored {
            prop_assert!(pref.correct_attempts <= pref.total_attempts);
            prop_assert_eq!(Some(pref), expected.get(&pref.key()));
        }
    }
}
