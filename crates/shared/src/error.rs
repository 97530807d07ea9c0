use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("record index {index} out of range ({len} records loaded)")]
    RecordNotFound { index: usize, len: usize },
    #[error("component index {index} out of range ({len} components)")]
    ComponentNotFound { index: usize, len: usize },
    #[error("unknown annotation category '{0}'")]
    InvalidCategory(String),
}

impl From<AnnotationError> for ApiError {
    fn from(value: AnnotationError) -> Self {
        let code = match &value {
            AnnotationError::RecordNotFound { .. } | AnnotationError::ComponentNotFound { .. } => {
                ErrorCode::NotFound
            }
            AnnotationError::InvalidCategory(_) => ErrorCode::Validation,
        };
        ApiError::new(code, value.to_string())
    }
}
