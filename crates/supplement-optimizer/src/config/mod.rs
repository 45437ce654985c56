use std::env;
use std::fmt;

use crate::workflows::evaluation::{
    EvaluationPolicy, DEFAULT_MIN_CASE_COUNT, DEFAULT_TARGET_PERCENT,
};
use crate::workflows::optimization::{ContractViolation, EngineSettings, ObjectiveWeights};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the optimizer and its evaluation harness.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub engine: EngineSettings,
    pub evaluation: EvaluationPolicy,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let defaults = EngineSettings::default();
        let combo_size = match env::var("OPTIMIZER_COMBO_SIZE") {
            Ok(raw) => parse_combo_size(&raw)?,
            Err(_) => defaults.combo_size,
        };
        let objective_weights = match env::var("OPTIMIZER_WEIGHTS") {
            Ok(raw) => raw
                .parse::<ObjectiveWeights>()
                .map_err(|source| ConfigError::InvalidWeights { value: raw, source })?,
            Err(_) => defaults.objective_weights,
        };

        let min_case_count = match env::var("EVAL_MIN_CASE_COUNT") {
            Ok(raw) => parse_min_case_count(&raw)?,
            Err(_) => DEFAULT_MIN_CASE_COUNT,
        };
        let target_percent = match env::var("EVAL_TARGET_PERCENT") {
            Ok(raw) => parse_target_percent(&raw)?,
            Err(_) => DEFAULT_TARGET_PERCENT,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            engine: EngineSettings {
                combo_size,
                objective_weights,
            },
            evaluation: EvaluationPolicy {
                min_case_count,
                target_percent,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_combo_size(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidComboSize {
            value: raw.to_string(),
        }),
    }
}

fn parse_min_case_count(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidMinCaseCount {
            value: raw.to_string(),
        }),
    }
}

fn parse_target_percent(raw: &str) -> Result<f64, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && (0.0..=100.0).contains(&value) => Ok(value),
        _ => Err(ConfigError::InvalidTargetPercent {
            value: raw.to_string(),
        }),
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidComboSize {
        value: String,
    },
    InvalidWeights {
        value: String,
        source: ContractViolation,
    },
    InvalidMinCaseCount {
        value: String,
    },
    InvalidTargetPercent {
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidComboSize { value } => {
                write!(f, "OPTIMIZER_COMBO_SIZE must be a positive integer (found '{value}')")
            }
            ConfigError::InvalidWeights { value, source } => write!(
                f,
                "OPTIMIZER_WEIGHTS must be efficacy,risk,cost summing to 1 (found '{value}'): {source}"
            ),
            ConfigError::InvalidMinCaseCount { value } => {
                write!(f, "EVAL_MIN_CASE_COUNT must be a positive integer (found '{value}')")
            }
            ConfigError::InvalidTargetPercent { value } => {
                write!(f, "EVAL_TARGET_PERCENT must be a number between 0 and 100 (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidWeights { source, .. } => Some(source),
            ConfigError::InvalidComboSize { .. }
            | ConfigError::InvalidMinCaseCount { .. }
            | ConfigError::InvalidTargetPercent { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("OPTIMIZER_COMBO_SIZE");
        env::remove_var("OPTIMIZER_WEIGHTS");
        env::remove_var("EVAL_MIN_CASE_COUNT");
        env::remove_var("EVAL_TARGET_PERCENT");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.engine, EngineSettings::default());
        assert_eq!(config.evaluation, EvaluationPolicy::default());
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn reads_engine_and_evaluation_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "CI");
        env::set_var("OPTIMIZER_COMBO_SIZE", "3");
        env::set_var("OPTIMIZER_WEIGHTS", "0.5,0.3,0.2");
        env::set_var("EVAL_MIN_CASE_COUNT", "25");
        env::set_var("EVAL_TARGET_PERCENT", "90.5");

        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.engine.combo_size, 3);
        assert_eq!(config.engine.objective_weights.efficacy, 0.5);
        assert_eq!(config.evaluation.min_case_count, 25);
        assert_eq!(config.evaluation.target_percent, 90.5);
    }

    #[test]
    fn rejects_zero_combo_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("OPTIMIZER_COMBO_SIZE", "0");

        let result = AppConfig::load();
        reset_env();

        match result {
            Err(ConfigError::InvalidComboSize { value }) => assert_eq!(value, "0"),
            other => panic!("expected combo size error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("OPTIMIZER_WEIGHTS", "0.5,0.5,0.5");

        let result = AppConfig::load();
        reset_env();

        match result {
            Err(err @ ConfigError::InvalidWeights { .. }) => {
                assert!(err.to_string().starts_with("OPTIMIZER_WEIGHTS"));
                assert!(std::error::Error::source(&err).is_some());
            }
            other => panic!("expected weights error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_target_percent_above_one_hundred() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("EVAL_TARGET_PERCENT", "120");

        let result = AppConfig::load();
        reset_env();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidTargetPercent { .. })
        ));
    }
}
