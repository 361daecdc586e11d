// src/relation_sieve/sieve.rs
//
// Segmented logarithmic sieve. Large primes (by factor base index) stride
// the whole interval once per polynomial; small and medium primes run per
// cache block with their cursors carried across blocks. Root corrections for
// the current Gray-code flip are applied here, exactly once per prime, by
// the regime that owns it.

use crate::core::parameters::{CACHE_BLOCK_SIZE, MEDIUM_PRIME, SOLN_SENTINEL};
use crate::core::sieve_context::SieveContext;
use crate::relation_sieve::poly::PolyGroup;

pub struct Sieve {
    /// Byte accumulator of interval length plus a sentinel word; the 255
    /// byte past the end stops the evaluator scan without bound checks.
    pub accumulator: Vec<u8>,
    /// Per-prime hit masks for the flag-only regime.
    pub flags: Vec<u8>,
    offsets: Vec<usize>,
    offsets2: Vec<usize>,
    interval: usize,
}

impl Sieve {
    pub fn new(ctx: &SieveContext) -> Sieve {
        let interval = ctx.params.interval();
        Sieve {
            accumulator: vec![0u8; interval + 8],
            flags: vec![0u8; ctx.params.num_primes],
            offsets: vec![0usize; ctx.params.num_primes],
            offsets2: vec![0usize; ctx.params.num_primes],
            interval,
        }
    }

    /// Sieve the full interval for the group's current sibling polynomial.
    /// Applies the pending root correction to soln1/soln2 as it goes, so the
    /// arrays are fully up to date for the evaluator afterwards.
    pub fn run(&mut self, ctx: &SieveContext, group: &mut PolyGroup) {
        let PolyGroup {
            ref mut soln1,
            ref mut soln2,
            ref ainv2b,
            poly_add,
            corr_index,
            ..
        } = *group;
        let corr = &ainv2b[corr_index];

        self.large_prime_pass(ctx, soln1, soln2, poly_add, corr);

        let blocks = self.interval / CACHE_BLOCK_SIZE;
        let remainder = self.interval % CACHE_BLOCK_SIZE;
        self.block_pass(ctx, 0, CACHE_BLOCK_SIZE.min(self.interval), true, soln1, soln2, poly_add, corr);
        for rep in 1..blocks {
            self.block_pass(ctx, rep * CACHE_BLOCK_SIZE, CACHE_BLOCK_SIZE, false, soln1, soln2, poly_add, corr);
        }
        if remainder > 0 && blocks > 0 {
            self.block_pass(ctx, blocks * CACHE_BLOCK_SIZE, remainder, false, soln1, soln2, poly_add, corr);
        }
    }

    /// Regimes 3 and 4: one stride over the whole interval, resetting the
    /// accumulator and flags first.
    #[allow(clippy::too_many_arguments)]
    fn large_prime_pass(
        &mut self,
        ctx: &SieveContext,
        soln1: &mut [u32],
        soln2: &mut [u32],
        poly_add: bool,
        corr: &[u32],
    ) {
        let end = self.interval;
        self.accumulator[..end].fill(0);
        self.accumulator[end] = 255; // sentinel
        self.flags.fill(0);

        let primes = &ctx.factor_base.primes;
        let sizes = &ctx.factor_base.sizes;

        for idx in ctx.params.mid_prime..ctx.params.second_prime {
            if soln2[idx] == SOLN_SENTINEL {
                continue;
            }
            let p = primes[idx] as usize;
            Self::correct(&mut soln1[idx], &mut soln2[idx], p as u32, poly_add, corr[idx]);
            let size = sizes[idx];
            let mut pos = soln1[idx] as usize;
            let mut pos2 = soln2[idx] as usize;
            while pos < end && pos2 < end {
                self.accumulator[pos] = self.accumulator[pos].wrapping_add(size);
                pos += p;
                self.accumulator[pos2] = self.accumulator[pos2].wrapping_add(size);
                pos2 += p;
            }
            if pos2 < end {
                self.accumulator[pos2] = self.accumulator[pos2].wrapping_add(size);
            }
            if pos < end {
                self.accumulator[pos] = self.accumulator[pos].wrapping_add(size);
            }
        }

        for idx in ctx.params.second_prime..ctx.params.num_primes {
            if soln2[idx] == SOLN_SENTINEL {
                continue;
            }
            let p = primes[idx] as usize;
            Self::correct(&mut soln1[idx], &mut soln2[idx], p as u32, poly_add, corr[idx]);
            let size = sizes[idx];
            let mut pos = soln1[idx] as usize;
            while pos < end {
                self.flags[idx] |= 1u8 << (pos & 7);
                self.accumulator[pos] = self.accumulator[pos].wrapping_add(size);
                pos += p;
            }
            let mut pos2 = soln2[idx] as usize;
            while pos2 < end {
                self.flags[idx] |= 1u8 << (pos2 & 7);
                self.accumulator[pos2] = self.accumulator[pos2].wrapping_add(size);
                pos2 += p;
            }
        }
    }

    /// Regimes 1 and 2 over one cache block. On the first block the cursors
    /// start from the (corrected) roots; later blocks resume saved cursors.
    #[allow(clippy::too_many_arguments)]
    fn block_pass(
        &mut self,
        ctx: &SieveContext,
        block_start: usize,
        block_len: usize,
        first: bool,
        soln1: &mut [u32],
        soln2: &mut [u32],
        poly_add: bool,
        corr: &[u32],
    ) {
        let primes = &ctx.factor_base.primes;
        let sizes = &ctx.factor_base.sizes;
        let end = block_start + block_len;

        if first {
            // the untouched leading primes still track the polynomial
            for idx in 1..ctx.params.first_prime {
                if soln2[idx] == SOLN_SENTINEL {
                    continue;
                }
                let p = primes[idx] as u32;
                Self::correct(&mut soln1[idx], &mut soln2[idx], p, poly_add, corr[idx]);
            }
        }

        let medium_bound = MEDIUM_PRIME.min(ctx.params.mid_prime);

        for idx in ctx.params.first_prime..medium_bound {
            if soln2[idx] == SOLN_SENTINEL {
                continue;
            }
            let p = primes[idx] as usize;
            let size = sizes[idx];
            let (mut pos, diff) = if first {
                Self::correct(&mut soln1[idx], &mut soln2[idx], p as u32, poly_add, corr[idx]);
                let pos = soln1[idx] as usize;
                (pos, soln2[idx] as isize - pos as isize)
            } else {
                let pos = self.offsets[idx];
                (pos, self.offsets2[idx] as isize - pos as isize)
            };

            let bound = end.saturating_sub(4 * p);
            while pos < bound {
                self.bump2(pos, diff, size);
                pos += p;
                self.bump2(pos, diff, size);
                pos += p;
                self.bump2(pos, diff, size);
                pos += p;
                self.bump2(pos, diff, size);
                pos += p;
            }
            while pos < end && (pos as isize + diff) < end as isize {
                self.bump2(pos, diff, size);
                pos += p;
            }
            let mut pos2 = (pos as isize + diff) as usize;
            if pos2 < end {
                self.accumulator[pos2] = self.accumulator[pos2].wrapping_add(size);
                pos2 += p;
            }
            if pos < end {
                self.accumulator[pos] = self.accumulator[pos].wrapping_add(size);
                pos += p;
            }
            self.offsets[idx] = pos;
            self.offsets2[idx] = pos2;
        }

        for idx in medium_bound..ctx.params.mid_prime {
            if soln2[idx] == SOLN_SENTINEL {
                continue;
            }
            let p = primes[idx] as usize;
            let size = sizes[idx];
            let (mut pos, diff) = if first {
                Self::correct(&mut soln1[idx], &mut soln2[idx], p as u32, poly_add, corr[idx]);
                let pos = soln1[idx] as usize;
                (pos, soln2[idx] as isize - pos as isize)
            } else {
                let pos = self.offsets[idx];
                (pos, self.offsets2[idx] as isize - pos as isize)
            };

            let bound = end.saturating_sub(2 * p);
            while pos < bound {
                self.bump2(pos, diff, size);
                pos += p;
                self.bump2(pos, diff, size);
                pos += p;
            }
            let mut pos2 = (pos as isize + diff) as usize;
            while pos < end && pos2 < end {
                self.accumulator[pos] = self.accumulator[pos].wrapping_add(size);
                pos += p;
                self.accumulator[pos2] = self.accumulator[pos2].wrapping_add(size);
                pos2 += p;
            }
            if pos2 < end {
                self.accumulator[pos2] = self.accumulator[pos2].wrapping_add(size);
                pos2 += p;
            }
            if pos < end {
                self.accumulator[pos] = self.accumulator[pos].wrapping_add(size);
                pos += p;
            }
            self.offsets[idx] = pos;
            self.offsets2[idx] = pos2;
        }
    }

    #[inline]
    fn bump2(&mut self, pos: usize, diff: isize, size: u8) {
        self.accumulator[pos] = self.accumulator[pos].wrapping_add(size);
        let pos2 = (pos as isize + diff) as usize;
        self.accumulator[pos2] = self.accumulator[pos2].wrapping_add(size);
    }

    /// Shift a root pair by the flip correction and reduce below p.
    #[inline]
    fn correct(soln1: &mut u32, soln2: &mut u32, p: u32, poly_add: bool, corr: u32) {
        let correction = if poly_add { p - corr } else { corr };
        *soln1 += correction;
        while *soln1 >= p {
            *soln1 -= p;
        }
        *soln2 += correction;
        while *soln2 >= p {
            *soln2 -= p;
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;
    use std::str::FromStr;

    #[test]
    fn test_accumulator_matches_direct_count() {
        // Every sieved byte must equal the sum of the size contributions of
        // the factor base primes whose roots hit that position.
        let n = BigInt::from_str("10000000000000000016800000000000000005031").unwrap();
        let ctx = crate::core::sieve_context::SieveContext::new(&n).unwrap();
        let mut group = PolyGroup::new(&ctx, 17);
        group.advance(&ctx);
        let mut sieve = Sieve::new(&ctx);
        sieve.run(&ctx, &mut group);

        // after run() the soln arrays are corrected, so recompute expectations
        for &i in &[0usize, 1, 517, 63999, 40000, 12345] {
            let mut expected = 0u8;
            for idx in ctx.params.first_prime..ctx.params.num_primes {
                if group.soln2[idx] == crate::core::parameters::SOLN_SENTINEL {
                    continue;
                }
                let p = ctx.factor_base.primes[idx] as usize;
                if i % p == group.soln1[idx] as usize % p {
                    expected = expected.wrapping_add(ctx.factor_base.sizes[idx]);
                }
                if i % p == group.soln2[idx] as usize % p {
                    expected = expected.wrapping_add(ctx.factor_base.sizes[idx]);
                }
            }
            assert_eq!(sieve.accumulator[i], expected, "position {}", i);
        }
    }

    #[test]
    fn test_sentinel_planted() {
        let n = BigInt::from_str("10000000000000000016800000000000000005031").unwrap();
        let ctx = crate::core::sieve_context::SieveContext::new(&n).unwrap();
        let mut group = PolyGroup::new(&ctx, 19);
        group.advance(&ctx);
        let mut sieve = Sieve::new(&ctx);
        sieve.run(&ctx, &mut group);
        assert_eq!(sieve.accumulator[sieve.interval()], 255);
    }

    #[test]
    fn test_flags_mark_hits() {
        // 64-digit parameters have 6500 primes, so the flag regime covers
        // indices 6000..6500; a composite input is all the sieve needs.
        let n = BigInt::from_str(
            "7000000000000000000000000000000000000000000000000000000000000063",
        )
        .unwrap();
        let ctx = crate::core::sieve_context::SieveContext::new(&n).unwrap();
        assert!(ctx.params.second_prime < ctx.params.num_primes);
        let mut group = PolyGroup::new(&ctx, 23);
        group.advance(&ctx);
        let mut sieve = Sieve::new(&ctx);
        sieve.run(&ctx, &mut group);
        let mut hits = 0;
        for idx in ctx.params.second_prime..ctx.params.num_primes {
            let pos = group.soln1[idx] as usize;
            if pos < sieve.interval() {
                assert_ne!(sieve.flags[idx] & (1 << (pos & 7)), 0, "index {}", idx);
                hits += 1;
            }
        }
        assert!(hits > 0);
    }
}
