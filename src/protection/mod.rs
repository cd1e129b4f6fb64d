use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::acl::{rights, SecurityBackend, StagedEdit};
use crate::classify::has_admin_and_system_full_control;
use crate::errors::domain::DomainError;
use crate::identity::{IdentityCatalog, WellKnownIdentity};
use crate::progress::{CancelFlag, ProgressSink};


/// Mutating operation a batch runs per volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    Protect,
    Unprotect,
}

/// Aggregate outcome of a batch run. Volumes skipped after a cancellation
/// request count as neither attempted nor succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub attempted: usize,
    pub succeeded: usize,
}

impl BatchOutcome {
    pub fn all_attempted_succeeded(&self) -> bool {
        self.succeeded == self.attempted
    }

    pub fn cancelled(&self) -> bool {
        self.attempted < self.total
    }
}

/// Run one operation over the volumes in order. A failed volume never stops
/// the batch; already-committed volumes stay committed when a later one
/// fails or the run is cancelled.
pub fn run_batch(
    backend: &dyn SecurityBackend,
    operation: BatchOperation,
    roots: &[PathBuf],
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        total: roots.len(),
        attempted: 0,
        succeeded: 0,
    };
    for root in roots {
        if cancel.is_cancelled() {
            sink.report("Cancellation requested; stopping before the next volume");
            warn!(
                remaining = roots.len() - outcome.attempted,
                "batch cancelled"
            );
            break;
        }
        outcome.attempted += 1;
        let ok = match operation {
            BatchOperation::Protect => protect(backend, root, sink, cancel),
            BatchOperation::Unprotect => unprotect(backend, root, sink, cancel),
        };
        if ok {
            outcome.succeeded += 1;
        }
    }
    outcome
}

/// Rewrite the volume's rules so Users and Authenticated Users can read but
/// not write. Returns false (with a progress line) on any refusal; nothing
/// is changed unless the single commit goes through.
pub fn protect(
    backend: &dyn SecurityBackend,
    root: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> bool {
    rewrite_rules(backend, root, sink, cancel, TargetRules::Protected)
}

/// Rewrite the volume's rules back to the standard writable layout.
pub fn unprotect(
    backend: &dyn SecurityBackend,
    root: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> bool {
    rewrite_rules(backend, root, sink, cancel, TargetRules::Unprotected)
}

/// Take ownership of the volume for Administrators and re-assert the
/// Administrators/SYSTEM full-control grants. Users and Authenticated Users
/// entries are left exactly as found. An ownership failure aborts before
/// any ACL change.
pub fn make_manageable(
    backend: &dyn SecurityBackend,
    root: &Path,
    sink: &dyn ProgressSink,
) -> bool {
    sink.report("Checking administrative rights");
    if !ensure_admin(backend, sink) {
        return false;
    }
    if !ensure_identities(sink) {
        return false;
    }

    sink.report(&format!("Taking ownership of {}", root.display()));
    if let Err(error) = backend.transfer_ownership(root, WellKnownIdentity::Administrators) {
        sink.report(&format!("Could not take ownership: {error}"));
        warn!(
            path = %root.display(),
            code = error.code_str(),
            %error,
            "ownership transfer failed; leaving access rules untouched"
        );
        return false;
    }

    sink.report("Restoring administrator and system access");
    let edits = [
        StagedEdit::grant(WellKnownIdentity::Administrators, rights::FULL_CONTROL),
        StagedEdit::grant(WellKnownIdentity::System, rights::FULL_CONTROL),
    ];
    sink.report("Committing access control list");
    if let Err(error) = backend.commit(root, &edits) {
        sink.report(&format!("Failed to apply access rules: {error}"));
        warn!(path = %root.display(), code = error.code_str(), %error, "ACL commit failed");
        return false;
    }

    sink.report(&format!("Volume {} can now be managed", root.display()));
    info!(path = %root.display(), "volume made manageable");
    true
}

enum TargetRules {
    Protected,
    Unprotected,
}

fn rewrite_rules(
    backend: &dyn SecurityBackend,
    root: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
    target: TargetRules,
) -> bool {
    sink.report("Checking administrative rights");
    if !ensure_admin(backend, sink) {
        return false;
    }
    if !ensure_identities(sink) {
        return false;
    }

    sink.report(&format!(
        "Reading current access rules for {}",
        root.display()
    ));
    let entries = match backend.read_entries(root) {
        Ok(entries) => entries,
        Err(error) => {
            sink.report(&format!("Could not read the access control list: {error}"));
            warn!(path = %root.display(), code = error.code_str(), %error, "ACL read failed");
            return false;
        }
    };

    if !has_admin_and_system_full_control(&entries) {
        sink.report(
            "Administrators and SYSTEM do not both hold full control; make the volume manageable first",
        );
        warn!(
            path = %root.display(),
            "volume is not manageable; refusing to rewrite rules"
        );
        return false;
    }

    // All edits are staged first and applied in one rewrite, a full replace
    // for the two user identities so stale stacked rules cannot linger.
    let mut edits = Vec::with_capacity(6);
    sink.report("Removing grants for Users and Authenticated Users");
    edits.push(StagedEdit::revoke(WellKnownIdentity::Users));
    edits.push(StagedEdit::revoke(WellKnownIdentity::AuthenticatedUsers));

    match target {
        TargetRules::Protected => {
            sink.report("Applying read-only access rules");
            edits.push(StagedEdit::grant(
                WellKnownIdentity::AuthenticatedUsers,
                rights::READ_EXECUTE | rights::LIST_DIRECTORY | rights::READ,
            ));
        }
        TargetRules::Unprotected => {
            sink.report("Restoring standard write access rules");
            edits.push(StagedEdit::grant(
                WellKnownIdentity::Users,
                rights::READ_EXECUTE | rights::LIST_DIRECTORY | rights::READ,
            ));
            edits.push(StagedEdit::grant(
                WellKnownIdentity::AuthenticatedUsers,
                rights::MODIFY | rights::WRITE,
            ));
        }
    }

    sink.report("Restoring administrator and system access");
    edits.push(StagedEdit::grant(
        WellKnownIdentity::Administrators,
        rights::FULL_CONTROL,
    ));
    edits.push(StagedEdit::grant(
        WellKnownIdentity::System,
        rights::FULL_CONTROL,
    ));

    if cancel.is_cancelled() {
        sink.report("Cancellation requested; no changes were committed");
        return false;
    }

    sink.report("Committing access control list");
    if let Err(error) = backend.commit(root, &edits) {
        sink.report(&format!("Failed to apply access rules: {error}"));
        warn!(path = %root.display(), code = error.code_str(), %error, "ACL commit failed");
        return false;
    }

    match target {
        TargetRules::Protected => {
            sink.report(&format!("Write protection enabled for {}", root.display()));
            info!(path = %root.display(), "volume protected");
        }
        TargetRules::Unprotected => {
            sink.report(&format!("Write access restored for {}", root.display()));
            info!(path = %root.display(), "volume unprotected");
        }
    }
    true
}

fn ensure_admin(backend: &dyn SecurityBackend, sink: &dyn ProgressSink) -> bool {
    if backend.caller_is_admin() {
        return true;
    }
    sink.report("Administrator rights are required; nothing was changed");
    warn!("caller does not hold administrator rights");
    false
}

fn ensure_identities(sink: &dyn ProgressSink) -> bool {
    match IdentityCatalog::get() {
        Ok(_) => true,
        Err(error) => {
            sink.report(&format!("Could not resolve built-in identities: {error}"));
            warn!(code = error.code_str(), %error, "identity resolution failed");
            false
        }
    }
}
