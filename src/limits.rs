use crate::constants::{
    LARGE_IMAGE_THRESHOLD_MIB, MAX_BATCH_MEMORY_MIB, MAX_CONCURRENT_LARGE_IMAGES,
    MIN_AVAILABLE_MEMORY_MIB,
};
use crate::error::{CompressionError, Result};
use crate::formats::ImageKind;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

/// Estimates memory needed to decode an image of `size` encoded bytes.
///
/// Decoded rasters are typically several times larger than the compressed
/// file, more so for efficient formats.
pub fn estimate_decoded_memory_mib(size: u64, mime_type: &str) -> f64 {
    let size_mib = size as f64 / (1024.0 * 1024.0);
    let multiplier = match ImageKind::from_mime(mime_type) {
        Some(ImageKind::Jpeg) => 4.0,
        Some(ImageKind::Png) => 3.0,
        Some(ImageKind::WebP) => 3.5,
        Some(ImageKind::Bmp) | Some(ImageKind::Tiff) => 1.2,
        Some(ImageKind::Gif) => 2.0,
        None => 3.0,
    };
    size_mib * multiplier
}

/// Picks how many images may be compressed at once.
///
/// # Arguments
/// * `estimates_mib` - Per-item decoded memory estimates
/// * `requested` - Caller's upper bound; defaults to the number of CPUs
///
/// # Returns
/// * `Ok(n)` with `n >= 1`
/// * `Err(CompressionError::BatchMemoryLimitExceeded)` - the batch is too large overall
/// * `Err(CompressionError::InsufficientMemory)` - the host cannot hold the batch
pub fn plan_parallelism(estimates_mib: &[f64], requested: Option<usize>) -> Result<usize> {
    let available_mib = available_memory_mib();
    plan_parallelism_with(estimates_mib, requested, available_mib)
}

pub(crate) fn plan_parallelism_with(
    estimates_mib: &[f64],
    requested: Option<usize>,
    available_mib: u64,
) -> Result<usize> {
    let total_mib: f64 = estimates_mib.iter().sum();
    let total_mib_u64 = total_mib.ceil() as u64;
    if total_mib_u64 > MAX_BATCH_MEMORY_MIB {
        return Err(CompressionError::BatchMemoryLimitExceeded(
            total_mib_u64,
            MAX_BATCH_MEMORY_MIB,
        ));
    }

    // Only the largest images in flight at once have to fit
    let peak_mib = estimates_mib
        .iter()
        .copied()
        .fold(0.0_f64, f64::max)
        .ceil() as u64;
    if peak_mib + MIN_AVAILABLE_MEMORY_MIB > available_mib {
        return Err(CompressionError::InsufficientMemory(peak_mib, available_mib));
    }

    let baseline = requested
        .unwrap_or_else(num_cpus::get)
        .min(estimates_mib.len())
        .max(1);

    let large_count = estimates_mib
        .iter()
        .filter(|&&mib| mib > LARGE_IMAGE_THRESHOLD_MIB)
        .count();
    let large_cap = if large_count > 0 {
        MAX_CONCURRENT_LARGE_IMAGES
    } else {
        baseline
    };

    let avg_mib = if estimates_mib.is_empty() {
        1
    } else {
        ((total_mib / estimates_mib.len() as f64).ceil() as u64).max(1)
    };
    let mem_cap = (available_mib.saturating_sub(MIN_AVAILABLE_MEMORY_MIB) / avg_mib)
        .clamp(1, baseline as u64) as usize;

    Ok(baseline.min(large_cap).min(mem_cap).max(1))
}

fn available_memory_mib() -> u64 {
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::new()));
    sys.refresh_memory();
    sys.available_memory() / (1024 * 1024)
}
