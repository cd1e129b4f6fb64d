use crate::errors::domain::{DomainError, ErrorCode};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipErrorCode {
    PrivilegeRequired,
    NotFound,
    ResolutionFailed,
    HandleOpenFailed,
    DescriptorBuildFailed,
    OwnerUpdateFailed,
}

impl ErrorCode for OwnershipErrorCode {
    fn as_code_str(self) -> &'static str {
        match self {
            Self::PrivilegeRequired => "privilege_required",
            Self::NotFound => "not_found",
            Self::ResolutionFailed => "resolution_failed",
            Self::HandleOpenFailed => "handle_open_failed",
            Self::DescriptorBuildFailed => "descriptor_build_failed",
            Self::OwnerUpdateFailed => "owner_update_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OwnershipError {
    code: OwnershipErrorCode,
    message: String,
}

impl OwnershipError {
    pub fn new(code: OwnershipErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for OwnershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for OwnershipError {}

impl DomainError for OwnershipError {
    fn code_str(&self) -> &'static str {
        self.code.as_code_str()
    }

    fn message(&self) -> &str {
        &self.message
    }
}

pub type OwnershipResult<T> = Result<T, OwnershipError>;

/// Set the directory's owner and nothing else.
///
/// Opens the directory with WRITE_OWNER before building the descriptor;
/// when that open fails the transfer stops with nothing written.
#[cfg(windows)]
pub(super) fn set_owner(
    path: &std::path::Path,
    owner: &crate::identity::SecurityId,
) -> OwnershipResult<()> {
    use std::ptr;
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::Security::{
        InitializeSecurityDescriptor, SetFileSecurityW, SetSecurityDescriptorOwner,
        OWNER_SECURITY_INFORMATION, SECURITY_DESCRIPTOR,
    };
    use windows_sys::Win32::Storage::FileSystem::{
        CreateFileW, FILE_FLAG_BACKUP_SEMANTICS, FILE_SHARE_DELETE, FILE_SHARE_READ,
        FILE_SHARE_WRITE, OPEN_EXISTING,
    };

    use super::to_wide;
    use crate::errors::domain::{classify_io_error, IoErrorHint};

    const WRITE_OWNER: u32 = 0x0008_0000;
    const SECURITY_DESCRIPTOR_REVISION: u32 = 1;

    struct DirectoryHandle {
        raw: HANDLE,
    }

    impl Drop for DirectoryHandle {
        fn drop(&mut self) {
            if self.raw != INVALID_HANDLE_VALUE && !self.raw.is_null() {
                unsafe {
                    CloseHandle(self.raw);
                }
            }
        }
    }

    let wide = to_wide(path);
    let raw = unsafe {
        CreateFileW(
            wide.as_ptr(),
            WRITE_OWNER,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            ptr::null(),
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS,
            ptr::null_mut(),
        )
    };
    if raw == INVALID_HANDLE_VALUE {
        let error = std::io::Error::last_os_error();
        let code = match classify_io_error(&error) {
            IoErrorHint::PermissionDenied | IoErrorHint::PrivilegeNotHeld => {
                OwnershipErrorCode::PrivilegeRequired
            }
            IoErrorHint::NotFound => OwnershipErrorCode::NotFound,
            _ => OwnershipErrorCode::HandleOpenFailed,
        };
        return Err(OwnershipError::new(
            code,
            format!(
                "Failed to open {} for ownership transfer: {error}",
                path.display()
            ),
        ));
    }
    let _handle = DirectoryHandle { raw };

    let mut descriptor = unsafe { std::mem::zeroed::<SECURITY_DESCRIPTOR>() };
    let descriptor_ptr = &mut descriptor as *mut SECURITY_DESCRIPTOR as *mut core::ffi::c_void;
    let ok = unsafe { InitializeSecurityDescriptor(descriptor_ptr, SECURITY_DESCRIPTOR_REVISION) };
    if ok == 0 {
        return Err(OwnershipError::new(
            OwnershipErrorCode::DescriptorBuildFailed,
            format!(
                "InitializeSecurityDescriptor failed: {}",
                std::io::Error::last_os_error()
            ),
        ));
    }

    let ok = unsafe {
        SetSecurityDescriptorOwner(
            descriptor_ptr,
            owner.as_bytes().as_ptr() as *mut core::ffi::c_void,
            0,
        )
    };
    if ok == 0 {
        return Err(OwnershipError::new(
            OwnershipErrorCode::DescriptorBuildFailed,
            format!(
                "SetSecurityDescriptorOwner failed: {}",
                std::io::Error::last_os_error()
            ),
        ));
    }

    let ok = unsafe { SetFileSecurityW(wide.as_ptr(), OWNER_SECURITY_INFORMATION, descriptor_ptr) };
    if ok == 0 {
        let error = std::io::Error::last_os_error();
        let code = match classify_io_error(&error) {
            IoErrorHint::PrivilegeNotHeld | IoErrorHint::PermissionDenied => {
                OwnershipErrorCode::PrivilegeRequired
            }
            _ => OwnershipErrorCode::OwnerUpdateFailed,
        };
        return Err(OwnershipError::new(
            code,
            format!(
                "SetFileSecurityW failed for {}: {error}",
                path.display()
            ),
        ));
    }

    Ok(())
}
