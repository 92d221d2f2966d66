//! Filesystem-type and mount-point heuristics feeding `DriveType::Network`, which caps
//! worker parallelism at `consts::WorkerThreadLimits::network_max` regardless of what the
//! underlying disk is (§5) — a network mount is the slow leg no matter how fast its backing
//! store is.

const NETWORK_FS_MARKERS: &[&str] = &["nfs", "smb", "cifs", "smbfs", "afp", "afpfs", "webdav"];

#[inline]
pub(crate) fn is_network_fs(fs_type: &str) -> bool {
    let fs = fs_type.to_lowercase();
    NETWORK_FS_MARKERS.iter().any(|marker| fs.contains(marker))
}

/// UNC paths (`\\host\share`) don't always surface as a recognizable `fs_type`, so the
/// mount string itself is checked too.
#[inline]
#[allow(dead_code)]
pub(crate) fn is_network_mount(mount: &str) -> bool {
    mount.starts_with("\\\\") || mount.starts_with("//")
}
