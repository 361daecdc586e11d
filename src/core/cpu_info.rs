// src/core/cpu_info.rs

use log::{info, warn};

use crate::core::parameters::CACHE_BLOCK_SIZE;

pub struct CpuInfo;

impl CpuInfo {
    pub fn l1_cache_size() -> Option<usize> {
        cache_size::l1_cache_size()
    }

    pub fn l2_cache_size() -> Option<usize> {
        cache_size::l2_cache_size()
    }

    /// The small-prime passes assume one sieve block stays cache resident.
    pub fn log_cache_fit() {
        let l1 = Self::l1_cache_size().unwrap_or(0);
        let l2 = Self::l2_cache_size().unwrap_or(0);
        info!("L1 cache: {} bytes, L2 cache: {} bytes", l1, l2);
        if l2 > 0 && CACHE_BLOCK_SIZE > l2 {
            warn!(
                "sieve block of {} bytes exceeds L2 ({} bytes); expect slow sieving",
                CACHE_BLOCK_SIZE, l2
            );
        }
    }
}
