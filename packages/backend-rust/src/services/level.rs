use std::time::Instant;

use epp_algo::{FuzzyError, LevelClassification};

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error(transparent)]
    Fuzzy(#[from] FuzzyError),
    #[error("batch classification task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Classify a placement result before the caller's request deadline; an
/// already expired deadline fails without evaluating. Without one, the
/// configured request timeout starts now. Out-of-range inputs are clamped
/// and logged.
pub fn classify_level(
    state: &AppState,
    score: f64,
    avg_response_time: f64,
    deadline: Option<Instant>,
) -> Result<LevelClassification, LevelError> {
    let deadline = deadline.unwrap_or_else(|| state.deadline());
    let result = state
        .classifier()
        .classify_before(score, avg_response_time, Some(deadline));

    match result {
        Ok(classification) => {
            if !classification.clamped_inputs.is_empty() {
                tracing::warn!(
                    score,
                    avg_response_time,
                    clamped = ?classification.clamped_inputs,
                    "classifier inputs clamped to their universe"
                );
            }
            tracing::debug!(
                level = %classification.level,
                proficiency_score = classification.proficiency_score,
                "level classified"
            );
            Ok(classification)
        }
        Err(err) => {
            tracing::error!(score, avg_response_time, error = %err, "level classification failed");
            Err(err.into())
        }
    }
}

/// Classify a whole cohort on the blocking pool
pub async fn classify_cohort(
    state: &AppState,
    inputs: Vec<(f64, f64)>,
) -> Result<Vec<Result<LevelClassification, FuzzyError>>, LevelError> {
    let classifier = state.classifier().clone();
    let count = inputs.len();
    let results = tokio::task::spawn_blocking(move || classifier.classify_batch(&inputs)).await?;

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        tracing::warn!(count, failed, "cohort classification had failures");
    }
    Ok(results)
}
