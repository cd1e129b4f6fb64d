use std::path::Path;

use super::{AccessEntry, AclResult, OwnershipResult};
use crate::identity::WellKnownIdentity;

/// What one staged edit does to the trustee's existing entries at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Remove every existing Allow and Deny entry for the identity.
    Revoke,
    /// Replace the identity's entries with one inheritable Allow entry.
    Grant,
}

/// One element of the edit list applied in a single ACL rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedEdit {
    pub action: EditAction,
    pub identity: WellKnownIdentity,
    pub mask: u32,
}

impl StagedEdit {
    pub fn revoke(identity: WellKnownIdentity) -> Self {
        Self {
            action: EditAction::Revoke,
            identity,
            mask: 0,
        }
    }

    pub fn grant(identity: WellKnownIdentity, mask: u32) -> Self {
        Self {
            action: EditAction::Grant,
            identity,
            mask,
        }
    }
}

/// Seam between the protection engine and the operating system.
///
/// The live implementation talks to the Win32 security APIs; tests
/// substitute an in-memory table that mirrors the same revoke/set commit
/// semantics. Callers serialize operations per path; implementations are
/// otherwise free to be called from any thread.
pub trait SecurityBackend: Send + Sync {
    /// Whether the calling token is a member of the Administrators group.
    fn caller_is_admin(&self) -> bool;

    /// Read the directory's ACL as simplified entries, inherited and
    /// explicit alike, keeping catalog identities only.
    fn read_entries(&self, root: &Path) -> AclResult<Vec<AccessEntry>>;

    /// Apply the staged edits in one native ACL rewrite.
    fn commit(&self, root: &Path, edits: &[StagedEdit]) -> AclResult<()>;

    /// Make `new_owner` the owner of the directory. Leaves the DACL alone.
    fn transfer_ownership(
        &self,
        root: &Path,
        new_owner: WellKnownIdentity,
    ) -> OwnershipResult<()>;
}
