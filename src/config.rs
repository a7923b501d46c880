use crate::error::{Error, Result};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub public_rps: u32,
    pub review_rps: u32,
    pub passing_threshold_percent: Decimal,
    pub text_grading_policy: TextGradingPolicy,
    pub submit_grace_seconds: i64,
}

/// How free-text questions are graded. The platform stores a reference
/// answer but has no single sensible default for comparing against it,
/// so the policy is an explicit deployment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextGradingPolicy {
    /// Score 0 at submit time and flag the attempt for HR review.
    ManualReview,
    /// Case-insensitive comparison against the reference answer.
    ExactMatch,
    /// Text questions count toward neither total nor max score.
    Exclude,
}

impl TextGradingPolicy {
    pub fn from_env_value(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual_review" => Ok(Self::ManualReview),
            "exact_match" => Ok(Self::ExactMatch),
            "exclude" => Ok(Self::Exclude),
            other => Err(Error::Config(format!(
                "Invalid TEXT_GRADING_POLICY '{}' (expected manual_review, exact_match or exclude)",
                other
            ))),
        }
    }
}

/// Immutable scoring policy handed to the services at construction time.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub passing_threshold: Decimal,
    pub text_policy: TextGradingPolicy,
    pub submit_grace_seconds: i64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            public_rps: get_env_parse_or("PUBLIC_RPS", "50")?,
            review_rps: get_env_parse_or("REVIEW_RPS", "20")?,
            passing_threshold_percent: get_env_parse_or("PASSING_THRESHOLD_PERCENT", "60")?,
            text_grading_policy: TextGradingPolicy::from_env_value(&get_env_or(
                "TEXT_GRADING_POLICY",
                "manual_review",
            ))?,
            submit_grace_seconds: get_env_parse_or("SUBMIT_GRACE_SECONDS", "30")?,
        })
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            passing_threshold: self.passing_threshold_percent,
            text_policy: self.text_grading_policy,
            submit_grace_seconds: self.submit_grace_seconds,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or(name, default)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
