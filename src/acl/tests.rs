use std::path::PathBuf;

use super::memory::MemoryBackend;
use super::{classify_mask, rights, EditAction, SecurityBackend, SimplifiedRight, StagedEdit};
use crate::identity::WellKnownIdentity;

fn volume() -> PathBuf {
    PathBuf::from("D:\\")
}

#[test]
fn masks_classify_as_their_own_class() {
    assert_eq!(classify_mask(rights::READ), Some(SimplifiedRight::Read));
    assert_eq!(
        classify_mask(rights::READ_EXECUTE),
        Some(SimplifiedRight::ReadExecute)
    );
    assert_eq!(classify_mask(rights::WRITE), Some(SimplifiedRight::Write));
    assert_eq!(classify_mask(rights::MODIFY), Some(SimplifiedRight::Modify));
    assert_eq!(
        classify_mask(rights::FULL_CONTROL),
        Some(SimplifiedRight::FullControl)
    );
}

#[test]
fn overlapping_mask_classifies_as_highest_class() {
    // Modify contains Write and ReadExecute; the strongest match wins.
    assert_eq!(
        classify_mask(rights::MODIFY | rights::READ),
        Some(SimplifiedRight::Modify)
    );
    assert_eq!(
        classify_mask(rights::FULL_CONTROL | 0x0100_0000), // extra SACL bit
        Some(SimplifiedRight::FullControl)
    );
}

#[test]
fn unmatched_mask_stays_unclassified() {
    assert_eq!(classify_mask(0), None);
    assert_eq!(classify_mask(rights::DELETE), None);
    assert_eq!(classify_mask(rights::LIST_DIRECTORY), None);
}

#[test]
fn right_classes_are_ordered_by_strength() {
    assert!(SimplifiedRight::Read < SimplifiedRight::ReadExecute);
    assert!(SimplifiedRight::ReadExecute < SimplifiedRight::Write);
    assert!(SimplifiedRight::Write < SimplifiedRight::Modify);
    assert!(SimplifiedRight::Modify < SimplifiedRight::FullControl);
}

#[test]
fn protect_target_mask_stays_below_write() {
    let mask = rights::READ_EXECUTE | rights::LIST_DIRECTORY | rights::READ;
    assert_eq!(classify_mask(mask), Some(SimplifiedRight::ReadExecute));
}

#[test]
fn modify_contains_its_component_classes() {
    assert_eq!(rights::MODIFY & rights::WRITE, rights::WRITE);
    assert_eq!(rights::MODIFY & rights::READ_EXECUTE, rights::READ_EXECUTE);
    assert_eq!(rights::MODIFY & rights::DELETE, rights::DELETE);
    assert_eq!(rights::FULL_CONTROL & rights::MODIFY, rights::MODIFY);
}

#[test]
fn staged_edit_constructors_carry_the_action() {
    let revoke = StagedEdit::revoke(WellKnownIdentity::Users);
    assert_eq!(revoke.action, EditAction::Revoke);
    assert_eq!(revoke.mask, 0);

    let grant = StagedEdit::grant(WellKnownIdentity::System, rights::FULL_CONTROL);
    assert_eq!(grant.action, EditAction::Grant);
    assert_eq!(grant.mask, rights::FULL_CONTROL);
}

#[test]
fn commit_revoke_drops_allow_and_deny_alike() {
    let backend = MemoryBackend::new();
    let root = volume();
    backend.seed(
        &root,
        &[
            (WellKnownIdentity::Users, true, rights::MODIFY),
            (WellKnownIdentity::Users, false, rights::WRITE),
            (WellKnownIdentity::System, true, rights::FULL_CONTROL),
        ],
    );

    backend
        .commit(&root, &[StagedEdit::revoke(WellKnownIdentity::Users)])
        .unwrap();

    let remaining = backend.entries_of(&root);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].0, WellKnownIdentity::System);
}

#[test]
fn commit_grant_replaces_existing_entries_for_the_trustee() {
    let backend = MemoryBackend::new();
    let root = volume();
    backend.seed(
        &root,
        &[
            (WellKnownIdentity::AuthenticatedUsers, true, rights::MODIFY),
            (WellKnownIdentity::AuthenticatedUsers, false, rights::WRITE),
        ],
    );

    backend
        .commit(
            &root,
            &[StagedEdit::grant(
                WellKnownIdentity::AuthenticatedUsers,
                rights::READ_EXECUTE,
            )],
        )
        .unwrap();

    let remaining = backend.entries_of(&root);
    assert_eq!(remaining.len(), 1); // no stacked duplicates
    assert_eq!(
        remaining[0],
        (WellKnownIdentity::AuthenticatedUsers, true, rights::READ_EXECUTE)
    );
}

#[test]
fn read_entries_reports_missing_volume_as_not_found() {
    use crate::errors::domain::DomainError;

    let backend = MemoryBackend::new();
    let error = backend.read_entries(&volume()).unwrap_err();
    assert_eq!(error.code_str(), "not_found");
}

#[test]
fn transfer_ownership_leaves_entries_untouched() {
    let backend = MemoryBackend::new();
    let root = volume();
    backend.seed(&root, &[(WellKnownIdentity::Users, true, rights::MODIFY)]);

    backend
        .transfer_ownership(&root, WellKnownIdentity::Administrators)
        .unwrap();

    assert_eq!(backend.owner_of(&root), Some(WellKnownIdentity::Administrators));
    assert_eq!(
        backend.entries_of(&root),
        vec![(WellKnownIdentity::Users, true, rights::MODIFY)]
    );
}

#[test]
fn read_entries_classifies_each_row() {
    let backend = MemoryBackend::new();
    let root = volume();
    backend.seed(
        &root,
        &[
            (WellKnownIdentity::Users, true, rights::READ_EXECUTE),
            (WellKnownIdentity::Administrators, true, rights::FULL_CONTROL),
        ],
    );

    let entries = backend.read_entries(&root).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].right, Some(SimplifiedRight::ReadExecute));
    assert!(entries[0].allow);
    assert_eq!(entries[1].right, Some(SimplifiedRight::FullControl));
}
