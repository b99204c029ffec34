// src/config.rs

use std::{env, fmt, str::FromStr};

use dotenvy::dotenv;

use crate::services::scorer::ScoringPolicy;

/// Seconds a login token stays valid unless `JWT_EXPIRATION` says otherwise.
pub const DEFAULT_JWT_EXPIRATION: u64 = 60 * 60 * 24;
pub const DEFAULT_EXAM_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_EXAM_QUESTION_COUNT: i64 = 50;
/// One week.
pub const MAX_EXAM_DURATION_MINUTES: i64 = 7 * 24 * 60;

/// Raised when an environment variable is missing or cannot be parsed.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Per-attempt exam rules.
#[derive(Debug, Clone, Copy)]
pub struct ExamSettings {
    pub duration_minutes: i64,
    pub question_count: i64,
    pub scoring_policy: ScoringPolicy,
}

impl ExamSettings {
    pub fn check(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_EXAM_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(ConfigError(format!(
                "EXAM_DURATION_MINUTES must be between 1 and {MAX_EXAM_DURATION_MINUTES}"
            )));
        }
        if self.question_count <= 0 {
            return Err(ConfigError("EXAM_QUESTION_COUNT must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            duration_minutes: DEFAULT_EXAM_DURATION_MINUTES,
            question_count: DEFAULT_EXAM_QUESTION_COUNT,
            scoring_policy: ScoringPolicy::Exact,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub log_dir: String,
    pub bind_addr: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_fullname: Option<String>,
    pub exam: ExamSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError("JWT_SECRET must be set".to_string()))?;

        let exam = ExamSettings {
            duration_minutes: parse_var("EXAM_DURATION_MINUTES", DEFAULT_EXAM_DURATION_MINUTES)?,
            question_count: parse_var("EXAM_QUESTION_COUNT", DEFAULT_EXAM_QUESTION_COUNT)?,
            scoring_policy: parse_var("SCORING_POLICY", ScoringPolicy::Exact)?,
        };

        exam.check()?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://exam.db".to_string()),
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION", DEFAULT_JWT_EXPIRATION)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_fullname: env::var("ADMIN_FULLNAME").ok(),
            exam,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_policies() {
        assert_eq!(parse_value::<i64>("N", " 45 ").unwrap(), 45);
        assert_eq!(
            parse_value::<ScoringPolicy>("P", "contains").unwrap(),
            ScoringPolicy::Contains
        );
    }

    #[test]
    fn exam_duration_is_bounded() {
        let with = |duration_minutes: i64| ExamSettings {
            duration_minutes,
            ..ExamSettings::default()
        };

        assert!(ExamSettings::default().check().is_ok());
        assert!(with(MAX_EXAM_DURATION_MINUTES).check().is_ok());
        assert!(with(0).check().is_err());
        assert!(with(MAX_EXAM_DURATION_MINUTES + 1).check().is_err());

        let err = with(300_000_000_000_000).check().unwrap_err();
        assert!(err.to_string().contains("EXAM_DURATION_MINUTES"));
    }

    #[test]
    fn reports_the_offending_variable() {
        let err = parse_value::<u64>("JWT_EXPIRATION", "soon").unwrap_err();
        assert!(err.to_string().contains("JWT_EXPIRATION"));
    }
}
