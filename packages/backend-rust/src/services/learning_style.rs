use std::collections::BTreeMap;

use chrono::Utc;

use epp_algo::learning_style;
use epp_algo::{AnswerRecord, Attempt, AttemptError, Category, LearningPreference, QuestionFormat, StyleSummary};

use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LearningStyleError {
    #[error(transparent)]
    Invalid(#[from] AttemptError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn record_attempt(state: &AppState, attempt: Attempt) -> Result<LearningPreference, LearningStyleError> {
    attempt.validate()?;

    let updated = state.store().record_attempt(&attempt, Utc::now()).await.map_err(|err| {
        tracing::error!(learner_id = %attempt.learner_id, error = %err, "failed to record attempt");
        err
    })?;

    tracing::debug!(
        learner_id = %updated.learner_id,
        category = %updated.category,
        format = %updated.format,
        total_attempts = updated.total_attempts,
        "attempt recorded"
    );
    Ok(updated)
}

/// Store a graded test session and fold every answer into the learner's
/// preferences. Answers are validated before anything is written, and the
/// store applies the session as one unit.
pub async fn submit_answers(
    state: &AppState,
    session_id: &str,
    answers: &[AnswerRecord],
) -> Result<(), LearningStyleError> {
    for answer in answers {
        Attempt::from(answer).validate()?;
    }

    state
        .store()
        .submit_session(session_id, answers, Utc::now())
        .await
        .map_err(|err| {
            tracing::error!(session_id, error = %err, "failed to submit answers");
            err
        })?;

    tracing::info!(session_id, answers = answers.len(), "answers submitted");
    Ok(())
}

pub async fn recommended_format(
    state: &AppState,
    learner_id: &str,
    category: Category,
) -> Result<QuestionFormat, LearningStyleError> {
    let prefs = state.store().preferences_for_category(learner_id, category).await?;
    Ok(learning_style::best_format(&prefs, category, state.style()))
}

pub async fn recommended_formats_by_category(
    state: &AppState,
    learner_id: &str,
) -> Result<BTreeMap<Category, QuestionFormat>, LearningStyleError> {
    let prefs = state.store().preferences_for(learner_id).await?;
    Ok(learning_style::recommended_formats(&prefs, state.style()))
}

pub async fn preferences_by_learner(
    state: &AppState,
    learner_id: &str,
) -> Result<Vec<LearningPreference>, LearningStyleError> {
    Ok(state.store().preferences_for(learner_id).await?)
}

pub async fn overall_style(state: &AppState, learner_id: &str) -> Result<StyleSummary, LearningStyleError> {
    let prefs = state.store().preferences_for(learner_id).await?;
    let summary = learning_style::overall_style(&prefs, state.style());
    if let StyleSummary::Analyzed(analysis) = &summary {
        tracing::debug!(learner_id, best_format = %analysis.best_format, "learning style analysed");
    }
    Ok(summary)
}
