use crate::errors::domain::{DomainError, ErrorCode};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorCode {
    ResolutionFailed,
}

impl ErrorCode for IdentityErrorCode {
    fn as_code_str(self) -> &'static str {
        match self {
            Self::ResolutionFailed => "resolution_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityError {
    code: IdentityErrorCode,
    message: String,
}

impl IdentityError {
    pub fn new(code: IdentityErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdentityError {}

impl DomainError for IdentityError {
    fn code_str(&self) -> &'static str {
        self.code.as_code_str()
    }

    fn message(&self) -> &str {
        &self.message
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;
