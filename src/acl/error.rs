use crate::errors::domain::{DomainError, ErrorCode};
use std::fmt;

#[cfg(windows)]
use crate::errors::domain::IoErrorHint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclErrorCode {
    AccessDenied,
    NotFound,
    PrivilegeRequired,
    SharingViolation,
    InvalidPath,
    SnapshotFailed,
    CommitFailed,
}

impl ErrorCode for AclErrorCode {
    fn as_code_str(self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::PrivilegeRequired => "privilege_required",
            Self::SharingViolation => "sharing_violation",
            Self::InvalidPath => "invalid_path",
            Self::SnapshotFailed => "snapshot_failed",
            Self::CommitFailed => "commit_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AclError {
    code: AclErrorCode,
    message: String,
}

impl AclError {
    pub fn new(code: AclErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classify a status returned by one of the named-object security calls.
    #[cfg(windows)]
    pub(crate) fn from_native(
        operation: &str,
        path: &std::path::Path,
        status: u32,
        fallback: AclErrorCode,
    ) -> Self {
        use crate::errors::domain::classify_raw_os_error;

        let code = code_from_hint(classify_raw_os_error(status as i32), fallback);
        Self::new(
            code,
            format!(
                "{operation} failed for {}: Win32 error {status}",
                path.display()
            ),
        )
    }

    /// Classify the thread's last OS error after a failed BOOL-returning call.
    #[cfg(windows)]
    pub(crate) fn from_last_os_error(
        operation: &str,
        path: &std::path::Path,
        fallback: AclErrorCode,
    ) -> Self {
        use crate::errors::domain::classify_io_error;

        let error = std::io::Error::last_os_error();
        let code = code_from_hint(classify_io_error(&error), fallback);
        Self::new(
            code,
            format!("{operation} failed for {}: {error}", path.display()),
        )
    }
}

#[cfg(windows)]
fn code_from_hint(hint: IoErrorHint, fallback: AclErrorCode) -> AclErrorCode {
    match hint {
        IoErrorHint::PermissionDenied => AclErrorCode::AccessDenied,
        IoErrorHint::NotFound => AclErrorCode::NotFound,
        IoErrorHint::PrivilegeNotHeld => AclErrorCode::PrivilegeRequired,
        IoErrorHint::SharingViolation => AclErrorCode::SharingViolation,
        IoErrorHint::InvalidInput => AclErrorCode::InvalidPath,
        IoErrorHint::Other => fallback,
    }
}

impl fmt::Display for AclError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AclError {}

impl DomainError for AclError {
    fn code_str(&self) -> &'static str {
        self.code.as_code_str()
    }

    fn message(&self) -> &str {
        &self.message
    }
}

pub type AclResult<T> = Result<T, AclError>;
