use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{
    AccessEntry, AclError, AclErrorCode, AclResult, EditAction, OwnershipError,
    OwnershipErrorCode, OwnershipResult, SecurityBackend, StagedEdit,
};
use crate::identity::WellKnownIdentity;

/// In-memory stand-in for the Win32 security surface.
///
/// Commits mirror the semantics of the native rewrite: a revoke drops every
/// entry the trustee holds, a grant replaces the trustee's entries with one
/// Allow entry. Failure switches let tests drive the refusal paths without
/// a Windows host.
pub struct MemoryBackend {
    volumes: Mutex<HashMap<PathBuf, VolumeState>>,
    admin: AtomicBool,
    fail_reads: AtomicBool,
    fail_commits: AtomicBool,
    fail_ownership: AtomicBool,
}

#[derive(Default, Clone)]
struct VolumeState {
    entries: Vec<StoredEntry>,
    owner: Option<WellKnownIdentity>,
}

#[derive(Clone, Copy)]
struct StoredEntry {
    identity: WellKnownIdentity,
    allow: bool,
    mask: u32,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            volumes: Mutex::new(HashMap::new()),
            admin: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            fail_commits: AtomicBool::new(false),
            fail_ownership: AtomicBool::new(false),
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a volume with the given `(identity, allow, mask)` entries.
    pub fn seed(&self, root: impl Into<PathBuf>, entries: &[(WellKnownIdentity, bool, u32)]) {
        let state = VolumeState {
            entries: entries
                .iter()
                .map(|&(identity, allow, mask)| StoredEntry {
                    identity,
                    allow,
                    mask,
                })
                .collect(),
            owner: None,
        };
        self.volumes
            .lock()
            .expect("volume table lock")
            .insert(root.into(), state);
    }

    pub fn set_admin(&self, is_admin: bool) {
        self.admin.store(is_admin, Ordering::Relaxed);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_ownership(&self, fail: bool) {
        self.fail_ownership.store(fail, Ordering::Relaxed);
    }

    /// Current `(identity, allow, mask)` rows for assertions.
    pub fn entries_of(&self, root: &Path) -> Vec<(WellKnownIdentity, bool, u32)> {
        self.volumes
            .lock()
            .expect("volume table lock")
            .get(root)
            .map(|state| {
                state
                    .entries
                    .iter()
                    .map(|entry| (entry.identity, entry.allow, entry.mask))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn owner_of(&self, root: &Path) -> Option<WellKnownIdentity> {
        self.volumes
            .lock()
            .expect("volume table lock")
            .get(root)
            .and_then(|state| state.owner)
    }
}

impl SecurityBackend for MemoryBackend {
    fn caller_is_admin(&self) -> bool {
        self.admin.load(Ordering::Relaxed)
    }

    fn read_entries(&self, root: &Path) -> AclResult<Vec<AccessEntry>> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(AclError::new(
                AclErrorCode::SnapshotFailed,
                format!("simulated snapshot failure for {}", root.display()),
            ));
        }
        let volumes = self.volumes.lock().expect("volume table lock");
        let state = volumes.get(root).ok_or_else(|| {
            AclError::new(
                AclErrorCode::NotFound,
                format!("no security descriptor for {}", root.display()),
            )
        })?;
        Ok(state
            .entries
            .iter()
            .map(|entry| AccessEntry::new(entry.identity, entry.allow, entry.mask))
            .collect())
    }

    fn commit(&self, root: &Path, edits: &[StagedEdit]) -> AclResult<()> {
        if self.fail_commits.load(Ordering::Relaxed) {
            return Err(AclError::new(
                AclErrorCode::CommitFailed,
                format!("simulated commit failure for {}", root.display()),
            ));
        }
        let mut volumes = self.volumes.lock().expect("volume table lock");
        let state = volumes.get_mut(root).ok_or_else(|| {
            AclError::new(
                AclErrorCode::NotFound,
                format!("no security descriptor for {}", root.display()),
            )
        })?;
        for edit in edits {
            state
                .entries
                .retain(|entry| entry.identity != edit.identity);
            if edit.action == EditAction::Grant {
                state.entries.push(StoredEntry {
                    identity: edit.identity,
                    allow: true,
                    mask: edit.mask,
                });
            }
        }
        Ok(())
    }

    fn transfer_ownership(
        &self,
        root: &Path,
        new_owner: WellKnownIdentity,
    ) -> OwnershipResult<()> {
        if self.fail_ownership.load(Ordering::Relaxed) {
            return Err(OwnershipError::new(
                OwnershipErrorCode::PrivilegeRequired,
                format!("simulated ownership refusal for {}", root.display()),
            ));
        }
        let mut volumes = self.volumes.lock().expect("volume table lock");
        let state = volumes.get_mut(root).ok_or_else(|| {
            OwnershipError::new(
                OwnershipErrorCode::NotFound,
                format!("no security descriptor for {}", root.display()),
            )
        })?;
        state.owner = Some(new_owner);
        Ok(())
    }
}
