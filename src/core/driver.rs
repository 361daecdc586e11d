// src/core/driver.rs
//
// Top level sequencing: screen trivial inputs, build the sieve context,
// collect relations, solve, and divide the multiplier back out.

use log::info;
use num::{BigInt, Integer};

use crate::config::SimpqsConfig;
use crate::core::cpu_info::CpuInfo;
use crate::core::error::SimpqsError;
use crate::core::sieve_context::SieveContext;
use crate::core::temp_files::TempFiles;
use crate::matrix::solve;
use crate::relation_sieve::collector::{collect_relations, CollectOutcome};

/// Factor a composite n of at least 40 decimal digits. Returns the
/// non-trivial divisors the dependencies produced; an empty list means no
/// dependency led out of the trivial square roots.
pub fn factor(n: &BigInt, config: &SimpqsConfig) -> Result<Vec<BigInt>, SimpqsError> {
    // cheap screens the sieve itself cannot handle
    if n.is_even() {
        info!("input is even");
        return Ok(vec![BigInt::from(2)]);
    }
    let root = n.sqrt();
    if &(&root * &root) == n {
        info!("input is a perfect square");
        return Ok(vec![root]);
    }

    let ctx = SieveContext::new(n)?;
    CpuInfo::log_cache_fit();

    let files = match &config.tmp_dir {
        Some(dir) => TempFiles::in_dir(dir),
        None => TempFiles::new(),
    };

    let result = run_sieve(&ctx, &files, config.seed);
    if config.cleanup {
        files.remove_all();
    }
    result
}

fn run_sieve(
    ctx: &SieveContext,
    files: &TempFiles,
    seed: u64,
) -> Result<Vec<BigInt>, SimpqsError> {
    match collect_relations(ctx, files, seed)? {
        CollectOutcome::EarlyFactor(f) => {
            debug_assert!(ctx.n.mod_floor(&f) == BigInt::from(0));
            Ok(vec![f])
        }
        CollectOutcome::Ready { fulls, combined } => {
            info!("solving with {} + {} relations", fulls, combined);
            solve::solve(ctx, files)
        }
    }
}
