use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::evaluation::EvaluationError;
use crate::workflows::optimization::{ContractViolation, OptimizationError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Contract(ContractViolation),
    Optimization(OptimizationError),
    Evaluation(EvaluationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Json(err) => write!(f, "json error: {}", err),
            AppError::Contract(err) => write!(f, "contract violation: {}", err),
            AppError::Optimization(err) => write!(f, "optimization error: {}", err),
            AppError::Evaluation(err) => write!(f, "evaluation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Contract(err) => Some(err),
            AppError::Optimization(err) => Some(err),
            AppError::Evaluation(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ContractViolation> for AppError {
    fn from(value: ContractViolation) -> Self {
        Self::Contract(value)
    }
}

impl From<OptimizationError> for AppError {
    fn from(value: OptimizationError) -> Self {
        Self::Optimization(value)
    }
}

impl From<EvaluationError> for AppError {
    fn from(value: EvaluationError) -> Self {
        Self::Evaluation(value)
    }
}
