use std::ptr;

use tracing::warn;
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_NOT_ALL_ASSIGNED, HANDLE, LUID,
};
use windows_sys::Win32::Security::{
    AdjustTokenPrivileges, LookupPrivilegeValueW, LUID_AND_ATTRIBUTES, SE_PRIVILEGE_ENABLED,
    TOKEN_ADJUST_PRIVILEGES, TOKEN_PRIVILEGES, TOKEN_QUERY,
};
use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

/// Token privileges ownership transfer relies on.
pub(super) const OWNERSHIP_PRIVILEGES: [&str; 3] = [
    "SeTakeOwnershipPrivilege",
    "SeRestorePrivilege",
    "SeBackupPrivilege",
];

/// Enables named token privileges for the lifetime of the guard.
///
/// Enabling is best-effort: a privilege absent from the token is logged and
/// skipped, and the caller's operation runs regardless. On drop the guard
/// restores the previous state of every privilege it changed and closes the
/// token.
pub(super) struct PrivilegeGrant {
    token: HANDLE,
    restore: Vec<TOKEN_PRIVILEGES>,
}

impl PrivilegeGrant {
    pub(super) fn acquire(names: &[&str]) -> Self {
        let mut token: HANDLE = ptr::null_mut();
        let ok = unsafe {
            OpenProcessToken(
                GetCurrentProcess(),
                TOKEN_ADJUST_PRIVILEGES | TOKEN_QUERY,
                &mut token,
            )
        };
        if ok == 0 {
            warn!(
                error = %std::io::Error::last_os_error(),
                "failed to open the process token; continuing without extra privileges"
            );
            return Self {
                token: ptr::null_mut(),
                restore: Vec::new(),
            };
        }

        let mut restore = Vec::with_capacity(names.len());
        for name in names {
            match enable_privilege(token, name) {
                // PreviousState is empty when the privilege was already in
                // the requested state, so there is nothing to restore.
                Ok(previous) if previous.PrivilegeCount > 0 => restore.push(previous),
                Ok(_) => {}
                Err(error) => {
                    warn!(privilege = name, %error, "could not enable token privilege");
                }
            }
        }
        Self { token, restore }
    }
}

impl Drop for PrivilegeGrant {
    fn drop(&mut self) {
        if self.token.is_null() {
            return;
        }
        for previous in &self.restore {
            let ok = unsafe {
                AdjustTokenPrivileges(self.token, 0, previous, 0, ptr::null_mut(), ptr::null_mut())
            };
            if ok == 0 {
                warn!(
                    error = %std::io::Error::last_os_error(),
                    "failed to restore a token privilege"
                );
            }
        }
        unsafe {
            CloseHandle(self.token);
        }
    }
}

fn enable_privilege(token: HANDLE, name: &str) -> std::io::Result<TOKEN_PRIVILEGES> {
    let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
    let mut luid = LUID {
        LowPart: 0,
        HighPart: 0,
    };
    let ok = unsafe { LookupPrivilegeValueW(ptr::null(), wide.as_ptr(), &mut luid) };
    if ok == 0 {
        return Err(std::io::Error::last_os_error());
    }

    let state = TOKEN_PRIVILEGES {
        PrivilegeCount: 1,
        Privileges: [LUID_AND_ATTRIBUTES {
            Luid: luid,
            Attributes: SE_PRIVILEGE_ENABLED,
        }],
    };
    let mut previous = TOKEN_PRIVILEGES {
        PrivilegeCount: 0,
        Privileges: [LUID_AND_ATTRIBUTES {
            Luid: LUID {
                LowPart: 0,
                HighPart: 0,
            },
            Attributes: 0,
        }],
    };
    let mut previous_len = 0u32;
    let ok = unsafe {
        AdjustTokenPrivileges(
            token,
            0,
            &state,
            std::mem::size_of::<TOKEN_PRIVILEGES>() as u32,
            &mut previous,
            &mut previous_len,
        )
    };
    if ok == 0 {
        return Err(std::io::Error::last_os_error());
    }
    // AdjustTokenPrivileges reports a privilege missing from the token
    // through the last error even on a successful return.
    let last = unsafe { GetLastError() };
    if last == ERROR_NOT_ALL_ASSIGNED {
        return Err(std::io::Error::from_raw_os_error(last as i32));
    }
    Ok(previous)
}
