use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use epp_algo::learning_style::apply_attempt;
use epp_algo::{AnswerRecord, Attempt, LearningPreference, PreferenceKey};

use super::StoreError;

type Slot = Arc<Mutex<Option<LearningPreference>>>;

/// Process-local store. Each preference key owns its own mutex; the map
/// lock is only held long enough to find or create the slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    preferences: Arc<RwLock<HashMap<PreferenceKey, Slot>>>,
    answers: Arc<RwLock<Vec<(String, AnswerRecord)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: PreferenceKey) -> Slot {
        if let Some(slot) = self.preferences.read().get(&key) {
            return Arc::clone(slot);
        }
        let mut map = self.preferences.write();
        Arc::clone(map.entry(key).or_default())
    }

    pub fn record_attempt(&self, attempt: &Attempt, now: DateTime<Utc>) -> LearningPreference {
        let slot = self.slot(attempt.key());
        let mut current = slot.lock();
        let updated = apply_attempt(current.take(), attempt, now);
        *current = Some(updated.clone());
        updated
    }

    pub fn preferences_for(&self, learner_id: &str) -> Vec<LearningPreference> {
        let slots: Vec<Slot> = self
            .preferences
            .read()
            .iter()
            .filter(|(key, _)| key.learner_id == learner_id)
            .map(|(_, slot)| Arc::clone(slot))
            .collect();

        slots.iter().filter_map(|slot| slot.lock().clone()).collect()
    }

    /// Store a session and fold its answers into the preferences while the
    /// answer log stays write-locked. Rows the SQL CHECKs would refuse
    /// reject the whole session before anything changes.
    pub fn submit_session(
        &self,
        session_id: &str,
        answers: &[AnswerRecord],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let attempts: Vec<Attempt> = answers.iter().map(Attempt::from).collect();
        for attempt in &attempts {
            attempt.validate()?;
        }

        let mut stored = self.answers.write();
        stored.extend(answers.iter().map(|a| (session_id.to_string(), a.clone())));
        for attempt in &attempts {
            self.record_attempt(attempt, now);
        }
        Ok(())
    }

    pub fn session_answers(&self, session_id: &str) -> Vec<AnswerRecord> {
        self.answers
            .read()
            .iter()
            .filter(|(session, _)| session == session_id)
            .map(|(_, answer)| answer.clone())
            .collect()
    }

    pub fn learner_answers(&self, learner_id: &str) -> Vec<AnswerRecord> {
        self.answers
            .read()
            .iter()
            .filter(|(_, answer)| answer.learner_id == learner_id)
            .map(|(_, answer)| answer.clone())
            .collect()
    }
}
