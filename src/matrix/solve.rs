// src/matrix/solve.rs
//
// Matrix assembly and the square root / GCD step. Relations are read back
// from the merged streams, parity-checked against X^2 = +-prod(p^e) mod kN,
// reduced, and the GF(2) kernel turned into congruences of squares. The
// kernel search returns up to 64 dependencies as per-column bit masks, the
// same contract a block Lanczos solver would satisfy.

use std::io::BufRead;

use log::{debug, info};
use num::{BigInt, Integer, One, Zero};

use crate::core::error::SimpqsError;
use crate::core::sieve_context::SieveContext;
use crate::core::temp_files::TempFiles;
use crate::matrix::gf2::Gf2Matrix;
use crate::relation_sieve::lp_store::LpStore;
use crate::relation_sieve::relation::Relation;

struct MatrixColumn {
    x: BigInt,
    /// factor base indices with multiplicity
    prime_indices: Vec<u32>,
}

/// Read verified relations, solve the parity system and return every
/// non-trivial divisor of n the dependencies produce.
pub fn solve(ctx: &SieveContext, files: &TempFiles) -> Result<Vec<BigInt>, SimpqsError> {
    let store = LpStore::new(files, ctx.params.num_primes);
    let mut columns: Vec<MatrixColumn> = Vec::new();
    let mut parities: Vec<Vec<u32>> = Vec::new();

    for base in ["frels", "flprels"] {
        let reader = store.reader(base)?;
        read_columns(ctx, reader, &mut columns, &mut parities)?;
        if columns.len() >= ctx.params.rel_sought {
            break;
        }
    }
    info!("{} verified relations for the matrix step", columns.len());
    if columns.is_empty() {
        return Ok(vec![]);
    }

    let null_masks = kernel_masks(ctx, &columns, &parities);
    let dependencies = null_masks.iter().fold(0u64, |acc, m| acc | m);
    info!("{} nullspace vectors found", dependencies.count_ones());

    let factors = extract_factors(ctx, &columns, &null_masks);
    Ok(factors)
}

fn read_columns<R: BufRead>(
    ctx: &SieveContext,
    reader: R,
    columns: &mut Vec<MatrixColumn>,
    parities: &mut Vec<Vec<u32>>,
) -> Result<(), SimpqsError> {
    for line in reader.lines() {
        if columns.len() >= ctx.params.rel_sought {
            break;
        }
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let rel = Relation::parse(&line)?;

        let mut prime_indices = Vec::new();
        let mut odd_indices = Vec::new();
        for &(e, idx) in &rel.pairs {
            if idx as usize >= ctx.params.num_primes {
                return Err(SimpqsError::RelationFormat(line.clone()));
            }
            for _ in 0..e {
                prime_indices.push(idx);
            }
            if e % 2 == 1 {
                odd_indices.push(idx);
            }
        }

        if !verify_congruence(ctx, &rel.x, &prime_indices) {
            debug!("discarding relation failing X^2 = prod check");
            continue;
        }

        columns.push(MatrixColumn {
            x: rel.x,
            prime_indices,
        });
        parities.push(odd_indices);
    }
    Ok(())
}

/// X^2 = +-prod(p_i) (mod kN); the sieve does not track the sign of Q, so
/// either sign passes and wrong-sign dependencies simply fail the GCD.
fn verify_congruence(ctx: &SieveContext, x: &BigInt, prime_indices: &[u32]) -> bool {
    let mut prod = BigInt::one();
    for (count, &idx) in prime_indices.iter().enumerate() {
        prod *= BigInt::from(ctx.factor_base.primes[idx as usize]);
        if count % 30 == 0 {
            prod = prod.mod_floor(&ctx.kn);
        }
    }
    prod = prod.mod_floor(&ctx.kn);
    let x_sq = (x * x).mod_floor(&ctx.kn);
    if x_sq == prod {
        return true;
    }
    (x_sq + prod).mod_floor(&ctx.kn).is_zero()
}

/// Build the parity matrix and return the kernel as per-column 64-bit masks:
/// bit l of mask i says column i belongs to dependency l.
fn kernel_masks(ctx: &SieveContext, columns: &[MatrixColumn], parities: &[Vec<u32>]) -> Vec<u64> {
    let num_cols = columns.len();

    // drop columns holding the only occurrence of some prime; they can
    // never participate in a dependency
    let mut alive = vec![true; num_cols];
    let mut row_count = vec![0u32; ctx.params.num_primes];
    for odd in parities {
        for &idx in odd {
            row_count[idx as usize] += 1;
        }
    }
    loop {
        let mut changed = false;
        for (col, odd) in parities.iter().enumerate() {
            if alive[col] && odd.iter().any(|&idx| row_count[idx as usize] == 1) {
                alive[col] = false;
                for &idx in odd {
                    row_count[idx as usize] -= 1;
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    let kept: Vec<usize> = (0..num_cols).filter(|&c| alive[c]).collect();
    debug!(
        "matrix reduced from {} to {} columns",
        num_cols,
        kept.len()
    );
    if kept.is_empty() {
        return vec![0u64; num_cols];
    }

    let mut matrix = Gf2Matrix::identity_augmented(kept.len(), ctx.params.num_primes);
    for (row, &col) in kept.iter().enumerate() {
        for &idx in &parities[col] {
            matrix.flip_left(row, idx as usize);
        }
    }

    let rank = matrix.gauss_reduce();
    let num_deps = (matrix.num_rows() - rank).min(64);

    let mut masks = vec![0u64; num_cols];
    for l in 0..num_deps {
        for (row, &col) in kept.iter().enumerate() {
            if matrix.get_right(rank + l, row) {
                masks[col] |= 1u64 << l;
            }
        }
    }
    masks
}

fn extract_factors(ctx: &SieveContext, columns: &[MatrixColumn], masks: &[u64]) -> Vec<BigInt> {
    // factors of n are wanted, not of kN
    let n = &ctx.n;
    let dependency_bits = masks.iter().fold(0u64, |acc, m| acc | m);
    let mut factors: Vec<BigInt> = Vec::new();

    for l in 0..64 {
        if dependency_bits & (1u64 << l) == 0 {
            continue;
        }
        let mut y = BigInt::one();
        let mut prime_count = vec![0u64; ctx.params.num_primes];
        let mut steps = 0usize;
        for (col, column) in columns.iter().enumerate() {
            if masks[col] & (1u64 << l) != 0 {
                y *= &column.x;
                for &idx in &column.prime_indices {
                    prime_count[idx as usize] += 1;
                }
                steps += 1;
                if steps % 30 == 0 {
                    y = y.mod_floor(n);
                }
            }
        }
        y = y.mod_floor(n);

        let mut x = BigInt::one();
        for (idx, &count) in prime_count.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let p = BigInt::from(ctx.factor_base.primes[idx]);
            x *= p.modpow(&BigInt::from(count / 2), n);
            x = x.mod_floor(n);
        }

        let g = (y - x).gcd(n);
        if !g.is_one() && &g != n && !factors.contains(&g) {
            factors.push(g);
        }
    }
    factors
}
