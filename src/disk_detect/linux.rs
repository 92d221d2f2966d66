//! Linux-specific disk type detection using sysinfo and /sys/block

use super::DriveType;
use super::network::is_network_fs;
use log::debug;
use std::path::Path;
use sysinfo::{Disk, Disks};

/// Mount the catalog's scan root sits under decides how many worker threads the
/// stage executor gets (`consts::WorkerThreadLimits`): no disk match falls through
/// to `Unknown`'s conservative cap rather than assuming a fast SSD.
pub fn detect(path: &Path) -> DriveType {
    let disks = Disks::new_with_refreshed_list();
    let path_str = path.to_string_lossy();
    let disk = disks
        .iter()
        .filter(|d| path_str.starts_with(d.mount_point().to_string_lossy().as_ref()))
        .max_by_key(|d| d.mount_point().to_string_lossy().len());

    match disk {
        Some(disk) => resolve_drive_type(path, disk),
        None => {
            debug!("no mounted disk matched {}", path.display());
            DriveType::Unknown
        }
    }
}

fn resolve_drive_type(path: &Path, disk: &Disk) -> DriveType {
    let fs_type = disk.file_system().to_string_lossy();
    debug!(
        "{}: mount={}, fs={}, kind={:?}",
        path.display(),
        disk.mount_point().display(),
        fs_type,
        disk.kind()
    );

    if is_network_fs(&fs_type) {
        return DriveType::Network;
    }

    match disk.kind() {
        sysinfo::DiskKind::HDD => DriveType::HDD,
        sysinfo::DiskKind::SSD => DriveType::SSD,
        // sysinfo can't classify every block device (dm-crypt, zram); fall back to the
        // kernel's own rotational flag rather than guessing SSD for an unknown HDD.
        sysinfo::DiskKind::Unknown(_) => read_rotational_from_sys(disk).unwrap_or(DriveType::Unknown),
    }
}

/// Read /sys/block/{device}/queue/rotational to distinguish HDD (1) vs SSD (0).
fn read_rotational_from_sys(disk: &Disk) -> Option<DriveType> {
    let name = disk.name().to_str()?;
    let dev_name = name.strip_prefix("/dev/")?;
    // Strip partition: sda1 -> sda, nvme0n1p1 -> nvme0n1
    let base_dev = if dev_name.starts_with("nvme") {
        dev_name.split('p').next().unwrap_or(dev_name)
    } else {
        dev_name.trim_end_matches(char::is_numeric)
    };

    let sys_path = format!("/sys/block/{base_dev}/queue/rotational");
    let rotational = std::fs::read_to_string(&sys_path).ok()?;
    Some(if rotational.trim() == "1" {
        DriveType::HDD
    } else {
        DriveType::SSD
    })
}
