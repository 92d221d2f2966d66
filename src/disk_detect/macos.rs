//! macOS-specific disk type detection using statfs

use super::DriveType;
use super::network::is_network_fs;
use log::debug;
use std::ffi::CString;
use std::mem::MaybeUninit;
use std::path::Path;
use sysinfo::Disks;

/// `statfs` catches SMB/NFS/AFP mounts before they ever reach the `sysinfo` fallback,
/// since this crate cares only about whether a scan root needs the network worker cap
/// (`consts::WorkerThreadLimits::network_max`), not the finer HDD/SSD split on a local disk.
pub fn detect(path: &Path) -> DriveType {
    if let Ok(path_cstr) = CString::new(path.to_string_lossy().as_bytes()) {
        unsafe {
            let mut stat: MaybeUninit<libc::statfs> = MaybeUninit::uninit();
            if libc::statfs(path_cstr.as_ptr(), stat.as_mut_ptr()) == 0 {
                let stat = stat.assume_init();
                let fs_type =
                    std::ffi::CStr::from_ptr(stat.f_fstypename.as_ptr()).to_string_lossy();
                if is_network_fs(&fs_type) {
                    debug!("{}: network fs via statfs ({fs_type})", path.display());
                    return DriveType::Network;
                }
            }
        }
    }

    let disks = Disks::new_with_refreshed_list();
    let path_str = path.to_string_lossy();
    let disk = disks
        .iter()
        .filter(|d| {
            let mount = d.mount_point().to_string_lossy();
            path_str.starts_with(mount.as_ref())
        })
        .max_by_key(|d| d.mount_point().to_string_lossy().len());

    match disk {
        Some(disk) => {
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
                sysinfo::DiskKind::Unknown(_) => DriveType::Unknown,
            }
        }
        None => {
            debug!("no mounted disk matched {}", path.display());
            DriveType::Unknown
        }
    }
}
