#![allow(dead_code)]

use epp_algo::{AnswerRecord, Attempt, Category, QuestionFormat};
use epp_backend_rust::{AppState, Config, Store};

pub fn memory_state() -> AppState {
    memory_state_with(Config::default())
}

pub fn memory_state_with(config: Config) -> AppState {
    AppState::with_store(config, Store::memory()).unwrap()
}

pub fn attempt(learner: &str, category: Category, format: QuestionFormat, correct: bool, time: f64) -> Attempt {
    Attempt {
        learner_id: learner.to_string(),
        category,
        format,
        is_correct: correct,
        response_time: time,
    }
}

pub fn answer(learner: &str, question_id: i64, category: Category, is_correct: bool) -> AnswerRecord {
    AnswerRecord {
        learner_id: learner.to_string(),
        question_id,
        category,
        format: QuestionFormat::MultipleChoice,
        is_correct,
        response_time: 6.0,
    }
}

/// Wrong answers per category, numbered from `first_id`
pub fn mistakes(learner: &str, counts: &[(Category, u32)], first_id: i64) -> Vec<AnswerRecord> {
    let mut id = first_id;
    let mut answers = Vec::new();
    for &(category, count) in counts {
        for _ in 0..count {
            answers.push(answer(learner, id, category, false));
            id += 1;
        }
    }
    answers
}
