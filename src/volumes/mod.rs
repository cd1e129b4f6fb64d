use serde::Serialize;

#[cfg(windows)]
mod windows;

/// Category a drive root reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKind {
    Fixed,
    Removable,
    Remote,
    CdRom,
    RamDisk,
    Unknown,
}

impl VolumeKind {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Removable => "removable",
            Self::Remote => "remote",
            Self::CdRom => "cd-rom",
            Self::RamDisk => "ram disk",
            Self::Unknown => "unknown",
        }
    }
}

/// One mounted volume as the lister saw it. Sizes are best-effort and stay
/// zero when the volume does not answer.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeInfo {
    pub root: String,
    pub label: String,
    pub filesystem: String,
    pub kind: VolumeKind,
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl VolumeInfo {
    /// The eligibility fact the classifier consumes: a fixed drive carrying
    /// NTFS.
    pub fn is_fixed_ntfs(&self) -> bool {
        self.kind == VolumeKind::Fixed && self.filesystem.eq_ignore_ascii_case("NTFS")
    }
}

/// Enumerate mounted volumes. Non-Windows hosts see none.
pub fn list() -> Vec<VolumeInfo> {
    #[cfg(windows)]
    {
        return windows::list_volumes();
    }

    #[cfg(not(windows))]
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(kind: VolumeKind, filesystem: &str) -> VolumeInfo {
        VolumeInfo {
            root: "D:\\".to_string(),
            label: "Data".to_string(),
            filesystem: filesystem.to_string(),
            kind,
            total_bytes: 0,
            free_bytes: 0,
        }
    }

    #[test]
    fn fixed_ntfs_volume_is_eligible() {
        assert!(volume(VolumeKind::Fixed, "NTFS").is_fixed_ntfs());
        assert!(volume(VolumeKind::Fixed, "ntfs").is_fixed_ntfs());
    }

    #[test]
    fn other_kinds_and_filesystems_are_not_eligible() {
        assert!(!volume(VolumeKind::Removable, "NTFS").is_fixed_ntfs());
        assert!(!volume(VolumeKind::Remote, "NTFS").is_fixed_ntfs());
        assert!(!volume(VolumeKind::Fixed, "FAT32").is_fixed_ntfs());
        assert!(!volume(VolumeKind::Fixed, "exFAT").is_fixed_ntfs());
        assert!(!volume(VolumeKind::Fixed, "").is_fixed_ntfs());
    }
}
