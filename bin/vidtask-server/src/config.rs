//! Server configuration, loaded from environment variables at startup.

use std::str::FromStr;

use vidtask_core::outcome::DEFAULT_FAILURE_RATE;
use vidtask_core::{Outcome, OutcomeGenerator, RunnerStrategy};

/// Runtime configuration for vidtask-server.
///
/// Every field has a default so the server works out-of-the-box without any
/// environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `"memory"` or a sqlx SQLite URL such as `"sqlite://vidtask.db"`.
    pub database_url: String,

    /// How simulations are realised.  Chosen per deployment: `driven` for a
    /// long-lived process, `projected` when the host cannot keep timers alive
    /// between requests.
    pub runner: RunnerStrategy,

    /// Probability that a simulated job fails (default 0.2).
    pub failure_rate: f64,

    /// When set, every job gets this outcome instead of a random draw.
    pub outcome: Option<Outcome>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            database_url: "memory".to_owned(),
            runner: RunnerStrategy::Driven,
            failure_rate: DEFAULT_FAILURE_RATE,
            outcome: None,
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            enable_docs: true,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_or("VIDTASK_BIND", &defaults.bind_address),
            database_url: env_or("VIDTASK_DATABASE_URL", &defaults.database_url),
            runner: parse_env("VIDTASK_RUNNER", defaults.runner),
            failure_rate: parse_env("VIDTASK_FAILURE_RATE", defaults.failure_rate).clamp(0.0, 1.0),
            outcome: std::env::var("VIDTASK_OUTCOME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .and_then(|v| match Outcome::from_str(&v) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        // Tracing is not initialised yet.
                        eprintln!("WARN: ignoring VIDTASK_OUTCOME: {e}");
                        None
                    }
                }),
            log_level: env_or("VIDTASK_LOG", &defaults.log_level),
            log_json: env_flag("VIDTASK_LOG_JSON", defaults.log_json),
            cors_allowed_origins: std::env::var("VIDTASK_CORS_ORIGINS").ok(),
            enable_docs: env_flag("VIDTASK_ENABLE_DOCS", defaults.enable_docs),
        }
    }

    /// The outcome source this deployment should use.
    pub fn outcome_generator(&self) -> OutcomeGenerator {
        match self.outcome {
            Some(outcome) => OutcomeGenerator::fixed(outcome),
            None => OutcomeGenerator::random(self.failure_rate),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;
    use vidtask_core::outcome::OutcomeMode;

    #[test]
    fn defaults_use_driven_runner_and_memory_store() {
        let cfg = Config::default();
        assert_eq!(cfg.runner, RunnerStrategy::Driven);
        assert_eq!(cfg.database_url, "memory");
        assert!(cfg.enable_docs);
    }

    #[test]
    fn pinned_outcome_overrides_failure_rate() {
        let cfg = Config {
            outcome: Some(Outcome::Fail { checkpoint: 2 }),
            failure_rate: 0.0,
            ..Config::default()
        };
        assert_eq!(
            cfg.outcome_generator().mode(),
            OutcomeMode::Fixed(Outcome::Fail { checkpoint: 2 })
        );
    }

    #[test]
    fn random_mode_carries_failure_rate() {
        let cfg = Config { failure_rate: 0.35, ..Config::default() };
        assert_eq!(
            cfg.outcome_generator().mode(),
            OutcomeMode::Random { failure_rate: 0.35 }
        );
    }
}
