use crate::identity::WellKnownIdentity;

mod backend;
mod error;
#[cfg(test)]
pub mod memory;
mod ownership;
#[cfg(windows)]
mod privilege;
#[cfg(test)]
mod tests;
#[cfg(windows)]
mod windows;

pub use backend::{EditAction, SecurityBackend, StagedEdit};
pub use error::{AclError, AclErrorCode, AclResult};
pub use ownership::{OwnershipError, OwnershipErrorCode, OwnershipResult};
#[cfg(windows)]
pub use windows::WindowsBackend;

/// Directory access masks with generic bits already mapped, matching what
/// `MapGenericMask` produces under the standard file mapping.
pub mod rights {
    pub const READ: u32 = 0x0012_0089;
    pub const READ_EXECUTE: u32 = 0x0012_00A9;
    pub const WRITE: u32 = 0x0012_0116;
    pub const DELETE: u32 = 0x0001_0000;
    pub const MODIFY: u32 = READ_EXECUTE | WRITE | DELETE;
    pub const FULL_CONTROL: u32 = 0x001F_01FF;
    pub const LIST_DIRECTORY: u32 = 0x0000_0001;
}

/// Simplified permission classes in ascending strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimplifiedRight {
    Read,
    ReadExecute,
    Write,
    Modify,
    FullControl,
}

/// Classify a mapped access mask as the strongest class whose bits the mask
/// fully contains. Masks covering none of the classes stay unclassified.
pub fn classify_mask(mask: u32) -> Option<SimplifiedRight> {
    const ORDERED: [(u32, SimplifiedRight); 5] = [
        (rights::FULL_CONTROL, SimplifiedRight::FullControl),
        (rights::MODIFY, SimplifiedRight::Modify),
        (rights::WRITE, SimplifiedRight::Write),
        (rights::READ_EXECUTE, SimplifiedRight::ReadExecute),
        (rights::READ, SimplifiedRight::Read),
    ];
    ORDERED
        .iter()
        .find(|(bits, _)| mask & bits == *bits)
        .map(|(_, right)| *right)
}

/// One ACL entry for a catalog identity, reduced to the parts the
/// classifier needs. Rebuilt from the live ACL on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    pub identity: WellKnownIdentity,
    pub allow: bool,
    pub right: Option<SimplifiedRight>,
    pub raw_mask: u32,
}

impl AccessEntry {
    pub fn new(identity: WellKnownIdentity, allow: bool, raw_mask: u32) -> Self {
        Self {
            identity,
            allow,
            right: classify_mask(raw_mask),
            raw_mask,
        }
    }
}

#[cfg(windows)]
pub(crate) fn to_wide(path: &std::path::Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;

    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}
