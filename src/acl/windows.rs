use std::{path::Path, ptr};

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{LocalFree, ERROR_SUCCESS};
use windows_sys::Win32::Security::Authorization::{
    GetNamedSecurityInfoW, SetEntriesInAclW, SetNamedSecurityInfoW, EXPLICIT_ACCESS_W,
    NO_MULTIPLE_TRUSTEE, REVOKE_ACCESS, SET_ACCESS, SE_FILE_OBJECT, TRUSTEE_IS_SID,
    TRUSTEE_IS_WELL_KNOWN_GROUP, TRUSTEE_W,
};
use windows_sys::Win32::Security::{
    CheckTokenMembership, EqualSid, GetAce, MapGenericMask, ACCESS_ALLOWED_ACE, ACCESS_DENIED_ACE,
    ACE_HEADER, ACL, CONTAINER_INHERIT_ACE, DACL_SECURITY_INFORMATION, GENERIC_MAPPING,
    NO_INHERITANCE, OBJECT_INHERIT_ACE, PSECURITY_DESCRIPTOR,
};
use windows_sys::Win32::Storage::FileSystem::{
    FILE_ALL_ACCESS, FILE_GENERIC_EXECUTE, FILE_GENERIC_READ, FILE_GENERIC_WRITE,
};

use super::ownership::{self, OwnershipError, OwnershipErrorCode, OwnershipResult};
use super::privilege::{PrivilegeGrant, OWNERSHIP_PRIVILEGES};
use super::{
    to_wide, AccessEntry, AclError, AclErrorCode, AclResult, EditAction, SecurityBackend,
    StagedEdit,
};
use crate::identity::{self, IdentityCatalog, WellKnownIdentity};

const ACE_TYPE_ALLOWED: u8 = 0;
const ACE_TYPE_DENIED: u8 = 1;

struct SecurityDescriptor {
    raw: PSECURITY_DESCRIPTOR,
}

impl Drop for SecurityDescriptor {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe {
                LocalFree(self.raw);
            }
        }
    }
}

struct LocalAcl {
    raw: *mut ACL,
}

impl Drop for LocalAcl {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe {
                LocalFree(self.raw as *mut _);
            }
        }
    }
}

/// Live Win32 implementation of the security seam.
pub struct WindowsBackend;

impl SecurityBackend for WindowsBackend {
    fn caller_is_admin(&self) -> bool {
        let admins = match identity::resolve(WellKnownIdentity::Administrators) {
            Ok(sid) => sid,
            Err(error) => {
                warn!(%error, "could not resolve the Administrators identity");
                return false;
            }
        };
        let mut is_member = 0i32;
        let ok = unsafe {
            CheckTokenMembership(
                ptr::null_mut(),
                admins.as_bytes().as_ptr() as *mut core::ffi::c_void,
                &mut is_member,
            )
        };
        if ok == 0 {
            warn!(
                error = %std::io::Error::last_os_error(),
                "CheckTokenMembership failed"
            );
            return false;
        }
        is_member != 0
    }

    fn read_entries(&self, root: &Path) -> AclResult<Vec<AccessEntry>> {
        let catalog = IdentityCatalog::get()
            .map_err(|error| AclError::new(AclErrorCode::SnapshotFailed, error.to_string()))?;
        let (_descriptor, dacl) = fetch_security(root)?;

        // A null DACL grants everyone everything; surface that as explicit
        // full-control allows so the classifier sees the real situation.
        if dacl.is_null() {
            return Ok(WellKnownIdentity::ALL
                .iter()
                .map(|&identity| AccessEntry::new(identity, true, FILE_ALL_ACCESS))
                .collect());
        }

        let mut mapping = GENERIC_MAPPING {
            GenericRead: FILE_GENERIC_READ,
            GenericWrite: FILE_GENERIC_WRITE,
            GenericExecute: FILE_GENERIC_EXECUTE,
            GenericAll: FILE_ALL_ACCESS,
        };

        let count = unsafe { (*dacl).AceCount };
        let mut entries = Vec::new();
        for index in 0..count {
            let mut ace_ptr: *mut core::ffi::c_void = ptr::null_mut();
            let ok = unsafe { GetAce(dacl, index as u32, &mut ace_ptr) };
            if ok == 0 || ace_ptr.is_null() {
                return Err(AclError::from_last_os_error(
                    "GetAce",
                    root,
                    AclErrorCode::SnapshotFailed,
                ));
            }
            let header = unsafe { *(ace_ptr as *const ACE_HEADER) };
            let (allow, mut mask, ace_sid) = match header.AceType {
                t if t == ACE_TYPE_ALLOWED => {
                    let ace = unsafe { &*(ace_ptr as *const ACCESS_ALLOWED_ACE) };
                    (
                        true,
                        ace.Mask,
                        &ace.SidStart as *const u32 as *mut core::ffi::c_void,
                    )
                }
                t if t == ACE_TYPE_DENIED => {
                    let ace = unsafe { &*(ace_ptr as *const ACCESS_DENIED_ACE) };
                    (
                        false,
                        ace.Mask,
                        &ace.SidStart as *const u32 as *mut core::ffi::c_void,
                    )
                }
                _ => continue,
            };
            let Some(identity) = match_catalog_identity(catalog, ace_sid) else {
                continue;
            };
            unsafe {
                MapGenericMask(&mut mask, &mut mapping);
            }
            entries.push(AccessEntry::new(identity, allow, mask));
        }
        Ok(entries)
    }

    fn commit(&self, root: &Path, edits: &[StagedEdit]) -> AclResult<()> {
        let catalog = IdentityCatalog::get()
            .map_err(|error| AclError::new(AclErrorCode::CommitFailed, error.to_string()))?;
        let (_descriptor, dacl) = fetch_security(root)?;

        let mut explicit: Vec<EXPLICIT_ACCESS_W> = Vec::with_capacity(edits.len());
        for edit in edits {
            let sid = catalog.sid(edit.identity);
            let trustee = trustee_for_sid(sid.as_bytes().as_ptr() as *mut core::ffi::c_void);
            explicit.push(match edit.action {
                EditAction::Revoke => EXPLICIT_ACCESS_W {
                    grfAccessPermissions: 0,
                    grfAccessMode: REVOKE_ACCESS,
                    grfInheritance: NO_INHERITANCE,
                    Trustee: trustee,
                },
                EditAction::Grant => EXPLICIT_ACCESS_W {
                    grfAccessPermissions: edit.mask,
                    grfAccessMode: SET_ACCESS,
                    grfInheritance: CONTAINER_INHERIT_ACE | OBJECT_INHERIT_ACE,
                    Trustee: trustee,
                },
            });
        }

        let mut new_acl: *mut ACL = ptr::null_mut();
        let status =
            unsafe { SetEntriesInAclW(explicit.len() as u32, explicit.as_ptr(), dacl, &mut new_acl) };
        if status != ERROR_SUCCESS {
            return Err(AclError::from_native(
                "SetEntriesInAclW",
                root,
                status,
                AclErrorCode::CommitFailed,
            ));
        }
        let _new_acl_guard = LocalAcl { raw: new_acl };

        let mut wide = to_wide(root);
        let status = unsafe {
            SetNamedSecurityInfoW(
                wide.as_mut_ptr(),
                SE_FILE_OBJECT,
                DACL_SECURITY_INFORMATION,
                ptr::null_mut(),
                ptr::null_mut(),
                new_acl,
                ptr::null_mut(),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(AclError::from_native(
                "SetNamedSecurityInfoW",
                root,
                status,
                AclErrorCode::CommitFailed,
            ));
        }

        debug!(path = %root.display(), edits = edits.len(), "access control list rewritten");
        Ok(())
    }

    fn transfer_ownership(
        &self,
        root: &Path,
        new_owner: WellKnownIdentity,
    ) -> OwnershipResult<()> {
        let owner_sid = identity::resolve(new_owner).map_err(|error| {
            OwnershipError::new(OwnershipErrorCode::ResolutionFailed, error.to_string())
        })?;
        let _grant = PrivilegeGrant::acquire(&OWNERSHIP_PRIVILEGES);
        ownership::set_owner(root, owner_sid)?;
        debug!(
            path = %root.display(),
            owner = new_owner.display_name(),
            "directory owner replaced"
        );
        Ok(())
    }
}

fn fetch_security(path: &Path) -> AclResult<(SecurityDescriptor, *mut ACL)> {
    let mut sd: PSECURITY_DESCRIPTOR = ptr::null_mut();
    let mut dacl: *mut ACL = ptr::null_mut();

    let mut wide = to_wide(path);
    let status = unsafe {
        GetNamedSecurityInfoW(
            wide.as_mut_ptr(),
            SE_FILE_OBJECT,
            DACL_SECURITY_INFORMATION,
            ptr::null_mut(),
            ptr::null_mut(),
            &mut dacl,
            ptr::null_mut(),
            &mut sd,
        )
    };
    if status != ERROR_SUCCESS {
        return Err(AclError::from_native(
            "GetNamedSecurityInfoW",
            path,
            status,
            AclErrorCode::SnapshotFailed,
        ));
    }

    Ok((SecurityDescriptor { raw: sd }, dacl))
}

fn match_catalog_identity(
    catalog: &IdentityCatalog,
    ace_sid: *mut core::ffi::c_void,
) -> Option<WellKnownIdentity> {
    WellKnownIdentity::ALL.into_iter().find(|&identity| {
        let sid = catalog.sid(identity);
        unsafe { EqualSid(sid.as_bytes().as_ptr() as *mut core::ffi::c_void, ace_sid) != 0 }
    })
}

fn trustee_for_sid(sid: *mut core::ffi::c_void) -> TRUSTEE_W {
    TRUSTEE_W {
        pMultipleTrustee: ptr::null_mut(),
        MultipleTrusteeOperation: NO_MULTIPLE_TRUSTEE,
        TrusteeForm: TRUSTEE_IS_SID,
        TrusteeType: TRUSTEE_IS_WELL_KNOWN_GROUP,
        ptstrName: sid as *mut u16,
    }
}
