use epp_algo::{Misconception, MistakeProfile};

use crate::state::AppState;
use crate::store::StoreError;

/// Weak categories of one test session, most mistakes first
pub async fn detect_misconceptions(
    state: &AppState,
    session_id: &str,
) -> Result<Vec<Misconception>, StoreError> {
    let answers = state.store().session_answers(session_id).await?;
    let report = MistakeProfile::from_answers(&answers).misconceptions();
    tracing::debug!(session_id, weak_categories = report.len(), "misconceptions detected");
    Ok(report)
}
