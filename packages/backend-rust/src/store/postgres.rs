use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use epp_algo::{AnswerRecord, Attempt, Category, LearningPreference, QuestionFormat};

use super::StoreError;

const ANSWER_COLUMNS: &str = r#""learner_id","question_id","category","format","is_correct","response_time""#;
const PREFERENCE_COLUMNS: &str = r#""learner_id","category","format","total_attempts","correct_attempts","success_rate","avg_response_time","last_updated""#;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn record_attempt(
        &self,
        attempt: &Attempt,
        now: DateTime<Utc>,
    ) -> Result<LearningPreference, StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_preference(&mut conn, attempt, now).await
    }

    pub async fn preferences_for(&self, learner_id: &str) -> Result<Vec<LearningPreference>, StoreError> {
        let sql = format!(r#"SELECT {PREFERENCE_COLUMNS} FROM "learning_preferences" WHERE "learner_id" = $1"#);
        let rows = sqlx::query(&sql).bind(learner_id).fetch_all(&self.pool).await?;
        rows.iter().map(map_preference_row).collect()
    }

    pub async fn preferences_for_category(
        &self,
        learner_id: &str,
        category: Category,
    ) -> Result<Vec<LearningPreference>, StoreError> {
        let sql = format!(
            r#"SELECT {PREFERENCE_COLUMNS} FROM "learning_preferences" WHERE "learner_id" = $1 AND "category" = $2"#
        );
        let rows = sqlx::query(&sql)
            .bind(learner_id)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_preference_row).collect()
    }

    /// Answer rows and preference upserts commit together or not at all.
    /// Upserts run in key order so concurrent sessions lock rows in the
    /// same sequence; the sort is stable, so same-key attempts keep their
    /// answer order.
    pub async fn submit_session(
        &self,
        session_id: &str,
        answers: &[AnswerRecord],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if answers.is_empty() {
            return Ok(());
        }

        let mut attempts: Vec<Attempt> = answers.iter().map(Attempt::from).collect();
        attempts.sort_by_key(Attempt::key);

        let mut tx = self.pool.begin().await?;
        for answer in answers {
            insert_answer(&mut tx, session_id, answer).await?;
        }
        for attempt in &attempts {
            upsert_preference(&mut tx, attempt, now).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn session_answers(&self, session_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
        let sql = format!(r#"SELECT {ANSWER_COLUMNS} FROM "answer_records" WHERE "session_id" = $1 ORDER BY "id""#);
        let rows = sqlx::query(&sql).bind(session_id).fetch_all(&self.pool).await?;
        rows.iter().map(map_answer_row).collect()
    }

    pub async fn learner_answers(&self, learner_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
        let sql = format!(r#"SELECT {ANSWER_COLUMNS} FROM "answer_records" WHERE "learner_id" = $1 ORDER BY "id""#);
        let rows = sqlx::query(&sql).bind(learner_id).fetch_all(&self.pool).await?;
        rows.iter().map(map_answer_row).collect()
    }
}

// ==================== Statements ====================

/// Single-statement upsert; the conflicting row stays locked until the
/// surrounding transaction ends, so same-key attempts serialise. The SET
/// clause mirrors `LearningPreference::record`.
async fn upsert_preference(
    conn: &mut PgConnection,
    attempt: &Attempt,
    now: DateTime<Utc>,
) -> Result<LearningPreference, StoreError> {
    let correct = i32::from(attempt.is_correct);
    let sql = format!(
        r#"
        INSERT INTO "learning_preferences" ({PREFERENCE_COLUMNS})
        VALUES ($1, $2, $3, 1, $4, $4::DOUBLE PRECISION * 100.0, $5, $6)
        ON CONFLICT ("learner_id","category","format") DO UPDATE SET
            "total_attempts" = "learning_preferences"."total_attempts" + 1,
            "correct_attempts" = "learning_preferences"."correct_attempts" + EXCLUDED."correct_attempts",
            "success_rate" = ("learning_preferences"."correct_attempts" + EXCLUDED."correct_attempts")::DOUBLE PRECISION
                / ("learning_preferences"."total_attempts" + 1) * 100.0,
            "avg_response_time" = "learning_preferences"."avg_response_time"
                + (EXCLUDED."avg_response_time" - "learning_preferences"."avg_response_time")
                / ("learning_preferences"."total_attempts" + 1),
            "last_updated" = EXCLUDED."last_updated"
        RETURNING {PREFERENCE_COLUMNS}
        "#
    );

    let row = sqlx::query(&sql)
        .bind(&attempt.learner_id)
        .bind(attempt.category.as_str())
        .bind(attempt.format.as_str())
        .bind(correct)
        .bind(attempt.response_time)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    map_preference_row(&row)
}

async fn insert_answer(conn: &mut PgConnection, session_id: &str, answer: &AnswerRecord) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO "answer_records"
            ("session_id","learner_id","question_id","category","format","is_correct","response_time")
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(session_id)
    .bind(&answer.learner_id)
    .bind(answer.question_id)
    .bind(answer.category.as_str())
    .bind(answer.format.as_str())
    .bind(answer.is_correct)
    .bind(answer.response_time)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn parse_category(raw: &str) -> Result<Category, StoreError> {
    Category::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("unknown category '{raw}'")))
}

fn parse_format(raw: &str) -> Result<QuestionFormat, StoreError> {
    QuestionFormat::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("unknown question format '{raw}'")))
}

fn non_negative(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn map_preference_row(row: &PgRow) -> Result<LearningPreference, StoreError> {
    let category: String = row.try_get("category")?;
    let format: String = row.try_get("format")?;
    let total_attempts: i32 = row.try_get("total_attempts")?;
    let correct_attempts: i32 = row.try_get("correct_attempts")?;

    Ok(LearningPreference {
        learner_id: row.try_get("learner_id")?,
        category: parse_category(&category)?,
        format: parse_format(&format)?,
        total_attempts: non_negative(total_attempts, "total_attempts")?,
        correct_attempts: non_negative(correct_attempts, "correct_attempts")?,
        success_rate: row.try_get("success_rate")?,
        avg_response_time: row.try_get("avg_response_time")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn map_answer_row(row: &PgRow) -> Result<AnswerRecord, StoreError> {
    let category: String = row.try_get("category")?;
    let format: String = row.try_get("format")?;

    Ok(AnswerRecord {
        learner_id: row.try_get("learner_id")?,
        question_id: row.try_get("question_id")?,
        category: parse_category(&category)?,
        format: parse_format(&format)?,
        is_correct: row.try_get("is_correct")?,
        response_time: row.try_get("response_time")?,
    })
}
