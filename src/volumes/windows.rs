use std::ffi::OsString;
use std::iter;
use std::os::windows::ffi::OsStringExt;
use std::ptr;

use tracing::debug;
use windows_sys::Win32::Storage::FileSystem::{
    GetDiskFreeSpaceExW, GetDriveTypeW, GetLogicalDriveStringsW, GetVolumeInformationW,
};
use windows_sys::Win32::System::WindowsProgramming::{
    DRIVE_CDROM, DRIVE_FIXED, DRIVE_RAMDISK, DRIVE_REMOTE, DRIVE_REMOVABLE,
};

use super::{VolumeInfo, VolumeKind};

pub(super) fn list_volumes() -> Vec<VolumeInfo> {
    // First call reports the required length in WCHARs including nulls.
    let len = unsafe { GetLogicalDriveStringsW(0, ptr::null_mut()) };
    if len == 0 {
        return Vec::new();
    }
    let mut buffer = vec![0u16; (len as usize) + 1];
    let got = unsafe { GetLogicalDriveStringsW(buffer.len() as u32, buffer.as_mut_ptr()) };
    if got == 0 {
        return Vec::new();
    }

    let mut volumes = Vec::new();
    let mut start = 0;
    for index in 0..buffer.len() {
        if buffer[index] != 0 {
            continue;
        }
        if index == start {
            start += 1;
            continue;
        }
        let root = OsString::from_wide(&buffer[start..index])
            .to_string_lossy()
            .into_owned();
        start = index + 1;
        if root.is_empty() {
            continue;
        }

        let root_w: Vec<u16> = root.encode_utf16().chain(iter::once(0)).collect();
        let kind = match unsafe { GetDriveTypeW(root_w.as_ptr()) } {
            DRIVE_FIXED => VolumeKind::Fixed,
            DRIVE_REMOVABLE => VolumeKind::Removable,
            DRIVE_REMOTE => VolumeKind::Remote,
            DRIVE_CDROM => VolumeKind::CdRom,
            DRIVE_RAMDISK => VolumeKind::RamDisk,
            _ => VolumeKind::Unknown,
        };

        let mut volume_name = vec![0u16; 260];
        let mut filesystem_name = vec![0u16; 260];
        let info_ok = unsafe {
            GetVolumeInformationW(
                root_w.as_ptr(),
                volume_name.as_mut_ptr(),
                volume_name.len() as u32,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                filesystem_name.as_mut_ptr(),
                filesystem_name.len() as u32,
            )
        };
        let label = if info_ok != 0 {
            utf16_to_string(&volume_name).unwrap_or_else(|| root.clone())
        } else {
            root.clone()
        };
        let filesystem = if info_ok != 0 {
            utf16_to_string(&filesystem_name).unwrap_or_default()
        } else {
            String::new()
        };

        let (total_bytes, free_bytes) = disk_space(&root_w);

        volumes.push(VolumeInfo {
            root,
            label,
            filesystem,
            kind,
            total_bytes,
            free_bytes,
        });
    }

    debug!(count = volumes.len(), "volumes enumerated");
    volumes
}

fn disk_space(root_w: &[u16]) -> (u64, u64) {
    let mut free_to_caller = 0u64;
    let mut total = 0u64;
    let mut free = 0u64;
    let ok =
        unsafe { GetDiskFreeSpaceExW(root_w.as_ptr(), &mut free_to_caller, &mut total, &mut free) };
    if ok == 0 {
        return (0, 0);
    }
    (total, free)
}

fn utf16_to_string(buffer: &[u16]) -> Option<String> {
    let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf16_lossy(&buffer[..end]))
}
