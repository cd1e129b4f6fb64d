use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::acl::{AccessEntry, SecurityBackend, SimplifiedRight};
use crate::identity::WellKnownIdentity;


/// Display state of one volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLabel {
    NotEligible,
    NotManageable,
    Unprotected,
    Protected,
}

impl ProtectionLabel {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::NotEligible => "not eligible",
            Self::NotManageable => "not manageable",
            Self::Unprotected => "unprotected",
            Self::Protected => "protected",
        }
    }
}

/// Derived protection state for one volume root. Recomputed from the live
/// ACL on every call and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeClassification {
    pub is_fixed_ntfs: bool,
    pub is_system_volume: bool,
    pub is_selectable: bool,
    pub is_manageable: bool,
    pub is_protected: bool,
    pub label: ProtectionLabel,
}

/// Derive the protection state of a volume root.
///
/// `is_fixed_ntfs` is the volume lister's verdict; everything else comes
/// from the environment. A failed ACL read leaves the volume selectable but
/// not manageable, with the protection bit held at false.
pub fn classify(
    backend: &dyn SecurityBackend,
    root: &Path,
    is_fixed_ntfs: bool,
) -> VolumeClassification {
    let is_system_volume = is_system_root(root);
    let is_selectable = is_fixed_ntfs && !is_system_volume;
    if !is_selectable {
        return VolumeClassification {
            is_fixed_ntfs,
            is_system_volume,
            is_selectable,
            is_manageable: false,
            is_protected: false,
            label: ProtectionLabel::NotEligible,
        };
    }

    match backend.read_entries(root) {
        Ok(entries) => {
            let is_manageable = has_admin_and_system_full_control(&entries);
            let is_protected = is_manageable && write_access_locked_down(&entries);
            let label = if !is_manageable {
                ProtectionLabel::NotManageable
            } else if is_protected {
                ProtectionLabel::Protected
            } else {
                ProtectionLabel::Unprotected
            };
            VolumeClassification {
                is_fixed_ntfs,
                is_system_volume,
                is_selectable,
                is_manageable,
                is_protected,
                label,
            }
        }
        Err(error) => {
            debug!(
                path = %root.display(),
                %error,
                "ACL read failed; treating volume as not manageable"
            );
            VolumeClassification {
                is_fixed_ntfs,
                is_system_volume,
                is_selectable,
                is_manageable: false,
                is_protected: false,
                label: ProtectionLabel::NotManageable,
            }
        }
    }
}

/// Administrators and SYSTEM must each hold a FullControl allow before any
/// rewrite is attempted on the volume.
pub fn has_admin_and_system_full_control(entries: &[AccessEntry]) -> bool {
    has_full_allow(entries, WellKnownIdentity::Administrators)
        && has_full_allow(entries, WellKnownIdentity::System)
}

fn has_full_allow(entries: &[AccessEntry], identity: WellKnownIdentity) -> bool {
    entries.iter().any(|entry| {
        entry.identity == identity
            && entry.allow
            && entry.right == Some(SimplifiedRight::FullControl)
    })
}

/// Protected means Users hold no allow at all and Authenticated Users hold
/// nothing classified Write or above. Zero Authenticated Users entries
/// count as locked down.
fn write_access_locked_down(entries: &[AccessEntry]) -> bool {
    let users_allowed = entries
        .iter()
        .any(|entry| entry.identity == WellKnownIdentity::Users && entry.allow);
    let authenticated_writable = entries.iter().any(|entry| {
        entry.identity == WellKnownIdentity::AuthenticatedUsers
            && entry.allow
            && matches!(
                entry.right,
                Some(
                    SimplifiedRight::Write
                        | SimplifiedRight::Modify
                        | SimplifiedRight::FullControl
                )
            )
    });
    !users_allowed && !authenticated_writable
}

/// Case-insensitive comparison of the root against the SystemDrive
/// environment value, trailing separators ignored.
pub fn is_system_root(root: &Path) -> bool {
    let Ok(system_drive) = std::env::var("SystemDrive") else {
        return false;
    };
    let root_text = root.to_string_lossy();
    root_text
        .trim_end_matches(['\\', '/'])
        .eq_ignore_ascii_case(system_drive.trim_end_matches(['\\', '/']))
}
