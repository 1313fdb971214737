use std::time::Duration;

use epp_algo::{AllocationPolicy, Category, QuestionFormat, StyleConfig, DEFAULT_QUESTION_BUDGET, MIN_ATTEMPTS_FOR_CONFIDENCE};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Absent or empty selects the in-memory store
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Deadline handed to the classifier for each request
    pub request_timeout: Duration,
    pub question_budget: u32,
    pub categories: Vec<Category>,
    pub default_format: QuestionFormat,
    pub min_attempts: u32,
    pub file_logs: bool,
    pub log_dir: String,
    /// File name prefix; the rolling appender appends the date
    pub log_file: String,
}

impl Config {
    /// Read `.env` if present, then the process environment
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; missing or unparsable values
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());

        let db_max_connections = parse_or(&lookup, "EPP_DB_MAX_CONNECTIONS", 10u32).max(1);
        let request_timeout_ms = parse_or(&lookup, "EPP_REQUEST_TIMEOUT_MS", 2000u64);
        let question_budget = parse_or(&lookup, "EPP_QUESTION_BUDGET", DEFAULT_QUESTION_BUDGET);
        let min_attempts = parse_or(&lookup, "EPP_MIN_ATTEMPTS", MIN_ATTEMPTS_FOR_CONFIDENCE);

        let categories = lookup("EPP_CATEGORIES")
            .map(|raw| parse_categories(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| Category::ALL.to_vec());

        let default_format = lookup("EPP_DEFAULT_FORMAT")
            .as_deref()
            .and_then(QuestionFormat::parse)
            .unwrap_or_default();

        let file_logs = match lookup("EPP_FILE_LOGS").as_deref() {
            Some("true") | Some("1") => true,
            _ => false,
        };
        let log_dir = lookup("EPP_LOG_DIR").unwrap_or_else(|| "./logs".to_string());
        let log_file = lookup("EPP_LOG_FILE")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "epp-backend.log".to_string());

        Self {
            log_level,
            database_url,
            db_max_connections,
            request_timeout: Duration::from_millis(request_timeout_ms),
            question_budget,
            categories,
            default_format,
            min_attempts,
            file_logs,
            log_dir,
            log_file,
        }
    }

    pub fn style_config(&self) -> StyleConfig {
        StyleConfig {
            min_attempts: self.min_attempts,
            default_format: self.default_format,
            categories: self.categories.clone(),
            ..StyleConfig::default()
        }
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy::scaled(self.categories.len(), self.question_budget)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Comma-separated category names; unknown names and repeats are dropped
fn parse_categories(raw: &str) -> Vec<Category> {
    let mut categories = Vec::new();
    for category in raw.split(',').filter_map(Category::parse) {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}
