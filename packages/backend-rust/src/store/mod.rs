//! Persistence collaborator for learning preferences and graded answers.
//!
//! `record_attempt` and `submit_session` are the read-modify-write paths.
//! Both backends serialise concurrent updates of the same
//! `(learner, category, format)` key and let different keys proceed in
//! parallel. A session is stored together with its preference updates or
//! not at all. Store errors are surfaced as-is; nothing here retries.

pub mod memory;
pub mod migrate;
pub mod postgres;

use chrono::{DateTime, Utc};
use epp_algo::{AnswerRecord, Attempt, AttemptError, Category, LearningPreference};

pub use memory::MemoryStore;
pub use migrate::MigrationError;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("rejected by store: {0}")]
    Rejected(#[from] AttemptError),
}

#[derive(Debug, Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let store = PgStore::connect(database_url, max_connections).await?;
        migrate::run_migrations(store.pool()).await?;
        Ok(Store::Postgres(store))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Postgres(_) => "postgres",
        }
    }

    /// Atomically fold one attempt into its preference record
    pub async fn record_attempt(
        &self,
        attempt: &Attempt,
        now: DateTime<Utc>,
    ) -> Result<LearningPreference, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.record_attempt(attempt, now)),
            Store::Postgres(store) => store.record_attempt(attempt, now).await,
        }
    }

    /// Every record of a learner, by category then descending success rate
    pub async fn preferences_for(&self, learner_id: &str) -> Result<Vec<LearningPreference>, StoreError> {
        let mut prefs = match self {
            Store::Memory(store) => store.preferences_for(learner_id),
            Store::Postgres(store) => store.preferences_for(learner_id).await?,
        };
        epp_algo::learning_style::sort_for_listing(&mut prefs);
        Ok(prefs)
    }

    pub async fn preferences_for_category(
        &self,
        learner_id: &str,
        category: Category,
    ) -> Result<Vec<LearningPreference>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store
                .preferences_for(learner_id)
                .into_iter()
                .filter(|p| p.category == category)
                .collect()),
            Store::Postgres(store) => store.preferences_for_category(learner_id, category).await,
        }
    }

    /// Persist the graded answers of one test session and fold each into
    /// its preference record, as one unit
    pub async fn submit_session(
        &self,
        session_id: &str,
        answers: &[AnswerRecord],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.submit_session(session_id, answers, now),
            Store::Postgres(store) => store.submit_session(session_id, answers, now).await,
        }
    }

    /// Answers of one session, in insertion order
    pub async fn session_answers(&self, session_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.session_answers(session_id)),
            Store::Postgres(store) => store.session_answers(session_id).await,
        }
    }

    /// Every recorded answer of a learner across sessions, oldest first
    pub async fn learner_answers(&self, learner_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.learner_answers(learner_id)),
            Store::Postgres(store) => store.learner_answers(learner_id).await,
        }
    }
}
