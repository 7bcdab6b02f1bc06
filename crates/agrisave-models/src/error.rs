//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}
