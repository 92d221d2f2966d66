//! Performance probing for network mounts: a short random-I/O test classifies the remote
//! disk as HDD- or SSD-backed, and a latency sample picks a worker count accordingly.
//! Probed fresh each run — the catalog schema carries only `scans` and `files` (§3), so
//! nothing about this probe is persisted between invocations.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::Path;
use std::time::Instant;

use crate::consts::WorkerThreadLimits;

use super::DriveType;

const PROBE_DIR_NAME: &str = ".filecat-probe";

struct ProbeConsts;

impl ProbeConsts {
    pub const NUM_FILES: usize = 50;
    pub const FILE_SIZE: usize = 1024;
    pub const IOPS_HDD_THRESHOLD: f64 = 150.0;
    pub const NUM_LATENCY_SAMPLES: usize = 20;
    pub const LATENCY_HIGH_MS: f64 = 10.0;
    pub const LATENCY_MED_MS: f64 = 5.0;
}

struct DiskTypeInfo {
    drive_type: String,
    random_iops: f64,
}

struct NetworkInfo {
    latency_ms: f64,
}

/// Probe a network mount and return `(worker_count, use_parallel_walk)`. Non-network drives
/// never reach this function; callers already resolved worker counts for SSD/HDD/Unknown.
pub fn detect_optimal_workers(path: &Path, base_drive_type: DriveType) -> Result<(usize, bool)> {
    if !base_drive_type.is_network() {
        let workers = base_drive_type.worker_threads(rayon::current_num_threads());
        return Ok((workers, false));
    }

    log::info!("probing remote disk type for {}", path.display());
    let disk_type_info = probe_disk_type(path)?;

    log::debug!("measuring current network latency");
    let network_info = measure_network_latency(path)?;

    let workers = calculate_workers(&disk_type_info, &network_info);
    let use_parallel_walk = disk_type_info.drive_type.contains("SSD");

    log::debug!(
        "drive: {}, network latency: {:.1}ms, workers: {}",
        disk_type_info.drive_type,
        network_info.latency_ms,
        workers
    );

    Ok((workers, use_parallel_walk))
}

fn probe_disk_type(base_path: &Path) -> Result<DiskTypeInfo> {
    let probe_dir = base_path.join(PROBE_DIR_NAME);
    fs::create_dir_all(&probe_dir).context("create probe directory")?;

    let data = vec![0u8; ProbeConsts::FILE_SIZE];
    let mut files = Vec::new();

    let start = Instant::now();
    for i in 0..ProbeConsts::NUM_FILES {
        let file_path = probe_dir.join(format!("test_{i}.dat"));
        let mut file = File::create(&file_path)?;
        file.write_all(&data)?;
        let _ = file.sync_all();
        files.push(file_path);
    }
    let create_time = start.elapsed();

    let start = Instant::now();
    for file_path in &files {
        let _ = fs::read(file_path)?;
    }
    let read_time = start.elapsed();

    fs::remove_dir_all(&probe_dir).ok();

    let total_ops = (ProbeConsts::NUM_FILES * 2) as f64;
    let total_time_secs = (create_time + read_time).as_secs_f64();
    let iops = total_ops / total_time_secs;

    let drive_type = if iops < ProbeConsts::IOPS_HDD_THRESHOLD {
        "Network+HDD"
    } else {
        "Network+SSD"
    };

    log::debug!(
        "disk probe: {} files in {:.2}s = {:.0} iops -> {drive_type}",
        ProbeConsts::NUM_FILES * 2,
        total_time_secs,
        iops,
    );

    Ok(DiskTypeInfo {
        drive_type: drive_type.to_string(),
        random_iops: iops,
    })
}

fn measure_network_latency(path: &Path) -> Result<NetworkInfo> {
    let start = Instant::now();
    for _ in 0..ProbeConsts::NUM_LATENCY_SAMPLES {
        let _ = fs::metadata(path)?;
    }
    let elapsed = start.elapsed();
    let avg_latency_ms = elapsed.as_secs_f64() * 1000.0 / ProbeConsts::NUM_LATENCY_SAMPLES as f64;
    log::debug!("network latency: {avg_latency_ms:.2}ms avg");
    Ok(NetworkInfo {
        latency_ms: avg_latency_ms,
    })
}

/// Decision matrix: HDD+high latency -> floor; HDD+low -> hdd_max; SSD+high -> hdd_max; SSD+low -> network_max.
fn calculate_workers(disk_type: &DiskTypeInfo, network: &NetworkInfo) -> usize {
    let limits = WorkerThreadLimits::current();
    let is_hdd = DriveType::from_disk_type_str(&disk_type.drive_type).is_hdd();
    let latency = network.latency_ms;
    let _ = disk_type.random_iops;

    match (is_hdd, latency) {
        (true, l) if l > ProbeConsts::LATENCY_HIGH_MS => limits.floor,
        (true, l) if l > ProbeConsts::LATENCY_MED_MS => limits.hdd_max.saturating_sub(1),
        (true, _) => limits.hdd_max,
        (false, l) if l > ProbeConsts::LATENCY_HIGH_MS => limits.hdd_max,
        (false, l) if l > ProbeConsts::LATENCY_MED_MS => limits.unknown_max,
        (false, _) => limits.network_max,
    }
}
