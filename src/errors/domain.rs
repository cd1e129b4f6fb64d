use std::io::ErrorKind;

pub trait ErrorCode {
    #[allow(clippy::wrong_self_convention)]
    fn as_code_str(self) -> &'static str;
}

pub trait DomainError: std::error::Error {
    fn code_str(&self) -> &'static str;
    fn message(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorHint {
    NotFound,
    PermissionDenied,
    PrivilegeNotHeld,
    SharingViolation,
    InvalidInput,
    Other,
}

pub fn classify_io_error(error: &std::io::Error) -> IoErrorHint {
    let from_kind = match error.kind() {
        ErrorKind::NotFound => IoErrorHint::NotFound,
        ErrorKind::PermissionDenied => IoErrorHint::PermissionDenied,
        ErrorKind::InvalidInput => IoErrorHint::InvalidInput,
        _ => IoErrorHint::Other,
    };
    if from_kind != IoErrorHint::Other {
        return from_kind;
    }
    error
        .raw_os_error()
        .map(classify_raw_os_error)
        .unwrap_or(IoErrorHint::Other)
}

pub fn classify_raw_os_error(raw: i32) -> IoErrorHint {
    #[cfg(windows)]
    {
        return match raw {
            5 => IoErrorHint::PermissionDenied, // ERROR_ACCESS_DENIED
            2 | 3 => IoErrorHint::NotFound,     // ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND
            32 => IoErrorHint::SharingViolation, // ERROR_SHARING_VIOLATION
            87 => IoErrorHint::InvalidInput,    // ERROR_INVALID_PARAMETER
            1307 | 1314 => IoErrorHint::PrivilegeNotHeld, // ERROR_INVALID_OWNER | ERROR_PRIVILEGE_NOT_HELD
            _ => IoErrorHint::Other,
        };
    }

    #[cfg(unix)]
    {
        return match raw {
            1 | 13 => IoErrorHint::PermissionDenied, // EPERM | EACCES
            2 => IoErrorHint::NotFound,              // ENOENT
            16 => IoErrorHint::SharingViolation,     // EBUSY
            22 => IoErrorHint::InvalidInput,         // EINVAL
            _ => IoErrorHint::Other,
        };
    }

    #[allow(unreachable_code)]
    IoErrorHint::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification_outranks_raw_codes() {
        let error = std::io::Error::new(ErrorKind::NotFound, "gone");
        assert_eq!(classify_io_error(&error), IoErrorHint::NotFound);
        let error = std::io::Error::new(ErrorKind::PermissionDenied, "blocked");
        assert_eq!(classify_io_error(&error), IoErrorHint::PermissionDenied);
    }

    #[test]
    fn errors_without_usable_codes_fall_back_to_other() {
        let error = std::io::Error::new(ErrorKind::TimedOut, "slow");
        assert_eq!(classify_io_error(&error), IoErrorHint::Other);
    }

    #[cfg(windows)]
    #[test]
    fn windows_raw_codes_map_to_hints() {
        assert_eq!(classify_raw_os_error(5), IoErrorHint::PermissionDenied);
        assert_eq!(classify_raw_os_error(3), IoErrorHint::NotFound);
        assert_eq!(classify_raw_os_error(32), IoErrorHint::SharingViolation);
        assert_eq!(classify_raw_os_error(1314), IoErrorHint::PrivilegeNotHeld);
        assert_eq!(classify_raw_os_error(1307), IoErrorHint::PrivilegeNotHeld);
        assert_eq!(classify_raw_os_error(0), IoErrorHint::Other);
    }

    #[cfg(unix)]
    #[test]
    fn unix_raw_codes_map_to_hints() {
        assert_eq!(classify_raw_os_error(13), IoErrorHint::PermissionDenied);
        assert_eq!(classify_raw_os_error(2), IoErrorHint::NotFound);
        assert_eq!(classify_raw_os_error(16), IoErrorHint::SharingViolation);
        assert_eq!(classify_raw_os_error(0), IoErrorHint::Other);
    }
}
