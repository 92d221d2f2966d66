//! Windows-specific disk type detection using sysinfo WMI

use super::DriveType;
use super::network::{is_network_fs, is_network_mount};
use log::debug;
use std::path::Path;
use sysinfo::Disks;

/// Matches drive letters or UNC mounts against `path`, then leans on `sysinfo`'s WMI-backed
/// disk kind — the only platform of the three where that query itself can legitimately fail
/// or come back `Unknown` for a perfectly normal NVMe drive, so unlike Linux/macOS this one
/// doesn't attempt a kernel-level rotational fallback and just takes the conservative cap.
pub fn detect(path: &Path) -> DriveType {
    let disks = Disks::new_with_refreshed_list();
    let path_str = path.to_string_lossy();
    let normalized = path_str.replace('/', "\\");
    let disk = disks
        .iter()
        .filter(|d| {
            let mount = d.mount_point().to_string_lossy();
            path_str.starts_with(mount.as_ref()) || normalized.starts_with(&mount.replace('/', "\\"))
        })
        .max_by_key(|d| d.mount_point().to_string_lossy().len());

    match disk {
        Some(disk) => {
            let fs_type = disk.file_system().to_string_lossy();
            let mount_point = disk.mount_point().to_string_lossy();
            debug!(
                "{}: mount={mount_point}, fs={fs_type}, kind={:?}",
                path.display(),
                disk.kind()
            );

            if is_network_fs(&fs_type) || is_network_mount(&mount_point) {
                return DriveType::Network;
            }

            match disk.kind() {
                sysinfo::DiskKind::HDD => DriveType::HDD,
                sysinfo::DiskKind::SSD => DriveType::SSD,
                sysinfo::DiskKind::Unknown(_) => DriveType::Unknown,
            }
        }
        None => {
            debug!("no mounted disk matched {}", path.display());
            DriveType::Unknown
        }
    }
}
