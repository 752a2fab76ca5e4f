use bizgraph_models::{EntityKind, TransitionError, WeightError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BizGraphError {
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Data API error: {procedure} - {message}")]
    DataApi { procedure: String, message: String },

    #[error("Invalid {kind} status transition from {from} to {to}")]
    InvalidTransition {
        kind: EntityKind,
        from: String,
        to: String,
    },

    #[error("Cannot create {kind}: no {requires} available")]
    MissingPrerequisite { kind: String, requires: String },

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BizGraphError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn data_api(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataApi {
            procedure: procedure.into(),
            message: message.into(),
        }
    }

    pub fn missing_prerequisite(kind: EntityKind, requires: EntityKind) -> Self {
        Self::MissingPrerequisite {
            kind: kind.plural().to_string(),
            requires: requires.plural().to_string(),
        }
    }

    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::DataApi { .. } => "DATA_API_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::MissingPrerequisite { .. } => "MISSING_PREREQUISITE",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::DataApi { .. } => 502,
            Self::InvalidTransition { .. } => 409,
            Self::MissingPrerequisite { .. } => 422,
            Self::ExternalService { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }
}

pub type BizGraphResult<T> = Result<T, BizGraphError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<BizGraphError> for ErrorResponse {
    fn from(error: BizGraphError) -> Self {
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

impl From<TransitionError> for BizGraphError {
    fn from(error: TransitionError) -> Self {
        Self::InvalidTransition {
            kind: error.kind,
            from: error.from,
            to: error.to,
        }
    }
}

impl From<WeightError> for BizGraphError {
    fn from(error: WeightError) -> Self {
        Self::validation("status_weights", error.to_string())
    }
}

impl From<reqwest::Error> for BizGraphError {
    fn from(error: reqwest::Error) -> Self {
        Self::external_service("HTTP Client", error.to_string())
    }
}

impl From<serde_json::Error> for BizGraphError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}
