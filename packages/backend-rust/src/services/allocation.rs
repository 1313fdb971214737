use epp_algo::learning_style;
use epp_algo::selection::{select_questions, QuestionRef, Selection};
use epp_algo::{allocate, AllocationError, AllocationMode, AllocationPlan, MistakeProfile, PracticePlan};
use rand::Rng;

use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Allocate the configured budget over the configured categories
pub fn allocate_questions(state: &AppState, profile: &MistakeProfile) -> Result<AllocationPlan, AllocationError> {
    let config = state.config();
    allocate(profile, config.question_budget, &config.categories, state.policy())
}

/// Mistake-weighted plan for the learner's next practice test, built from
/// every answer on record for them, with each category's preferred format
pub async fn practice_plan(state: &AppState, learner_id: &str) -> Result<PracticePlan, PlanError> {
    let answers = state.store().learner_answers(learner_id).await?;
    let profile = MistakeProfile::from_answers(&answers);
    let plan = allocate_questions(state, &profile)?;

    let prefs = state.store().preferences_for(learner_id).await?;
    let style = state.style();
    let practice = plan.with_formats(|category| learning_style::best_format(&prefs, category, style));

    match practice.mode() {
        AllocationMode::Weighted => tracing::info!(
            learner_id,
            answers = answers.len(),
            mistakes = profile.total(),
            "practice plan built"
        ),
        AllocationMode::EvenSplit => tracing::info!(
            learner_id,
            answers = answers.len(),
            "no mistakes recorded, practice plan split evenly"
        ),
    }
    Ok(practice)
}

/// Build a plan and realise it from `pool`
pub async fn build_practice_test<R>(
    state: &AppState,
    learner_id: &str,
    pool: &[QuestionRef],
    rng: &mut R,
) -> Result<(PracticePlan, Selection), PlanError>
where
    R: Rng + ?Sized,
{
    let plan = practice_plan(state, learner_id).await?;
    let selection = select_questions(&plan, pool, rng);

    if selection.unfilled > 0 {
        tracing::warn!(
            learner_id,
            unfilled = selection.unfilled,
            "question pool too small for practice plan"
        );
    } else if selection.backfilled() > 0 {
        tracing::debug!(learner_id, backfilled = selection.backfilled(), "practice test backfilled from general pool");
    }

    Ok((plan, selection))
}
