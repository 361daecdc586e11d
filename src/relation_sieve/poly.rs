// src/relation_sieve/poly.rs
//
// Self-initialising polynomial generation. One A = p_1*...*p_s drawn from
// the middle of the factor base yields 2^(s-1) - 1 sieved polynomials
// Q(x) = A x^2 + 2 B x + C, stepped by Gray-code sign flips of the B-terms
// so that switching costs one addition per factor base prime.
//
// B-term construction follows Contini (1997): for each prime p | A,
// gamma = sqrt(kN) * (A/p)^-1 mod p (sign-normalised), B_j = (A/p) * gamma,
// so that B = sum B_j satisfies B^2 = kN (mod A).

use log::debug;
use num::{BigInt, Integer, ToPrimitive};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::parameters::SOLN_SENTINEL;
use crate::core::sieve_context::SieveContext;
use crate::integer_math::mod_inverse::ModInverse;

pub struct PolyGroup {
    /// Number of prime factors of A.
    pub s: usize,
    /// Factor base index the aind offsets are relative to.
    pub min: usize,
    span: usize,
    /// floor(sqrt(2 kN)) / Mdiv2; A is kept close to this.
    a_target: BigInt,

    pub a: BigInt,
    pub b: BigInt,
    pub c: BigInt,
    /// Offsets of the A factors, relative to `min`.
    pub aind: Vec<usize>,
    b_terms: Vec<BigInt>,
    /// (A/p) mod p for each A factor.
    a_mod_p: Vec<u64>,

    /// ainv2b[j][i] = 2 * B_j * A^-1 mod p_i; row j corrects the roots when
    /// B-term j flips sign.
    pub ainv2b: Vec<Vec<u32>>,
    /// Roots of Q(x - Mdiv2) mod p_i, maintained incrementally.
    pub soln1: Vec<u32>,
    pub soln2: Vec<u32>,

    /// Sibling counter, 0 .. 2^(s-1) - 1. Sibling 0 is scaffolding only.
    pub poly_index: usize,
    /// Direction of the last flip: true when B grew.
    pub poly_add: bool,
    /// Which ainv2b row the sieve must apply for the last flip.
    pub corr_index: usize,

    rng: ChaCha8Rng,
}

impl PolyGroup {
    pub fn new(ctx: &SieveContext, seed: u64) -> PolyGroup {
        let num_primes = ctx.params.num_primes;
        let s = (ctx.kn.bits() / 28 + 1) as usize;

        // Target leading coefficient: A near sqrt(2 kN) / Mdiv2 keeps |Q|
        // balanced across the interval.
        let a_target = (&ctx.kn * 2u32).sqrt() / BigInt::from(ctx.params.mdiv2 as u64);
        let per_factor_target = a_target.nth_root(s as u32);

        let mut fact = 0i64;
        while (fact as usize) < num_primes - 1
            && per_factor_target >= BigInt::from(ctx.factor_base.primes[fact as usize])
        {
            fact += 1;
        }
        let span = (num_primes / s / s / 2).max(2 * s);
        let mut min = fact - span as i64 / 2;
        if min < 1 {
            min = 1;
        }
        while (fact * fact) / min - min < span as i64 && min > 1 {
            min -= 1;
        }
        debug!(
            "A selection: s = {}, fact = {}, min = {}, span = {}",
            s, fact, min, span
        );

        let mut group = PolyGroup {
            s,
            min: min as usize,
            span,
            a_target,
            a: BigInt::from(1),
            b: BigInt::from(0),
            c: BigInt::from(0),
            aind: Vec::with_capacity(s),
            b_terms: Vec::with_capacity(s),
            a_mod_p: vec![0; s],
            ainv2b: vec![vec![0u32; num_primes]; s],
            soln1: vec![0u32; num_primes],
            soln2: vec![0u32; num_primes],
            poly_index: 0,
            poly_add: false,
            corr_index: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        group.draw_a(ctx);
        group.init_for_a(ctx);
        group
    }

    /// Number of sieved siblings per A.
    pub fn siblings_per_a(&self) -> usize {
        (1usize << (self.s - 1)) - 1
    }

    /// Step to the next sibling, drawing a fresh A when the Gray code is
    /// exhausted. After this call `poly_add`/`corr_index` describe the root
    /// correction the sieve has to apply.
    pub fn advance(&mut self, ctx: &SieveContext) {
        if self.poly_index + 1 >= 1usize << (self.s - 1) {
            self.draw_a(ctx);
            self.init_for_a(ctx);
        }
        self.next_sibling(ctx);
    }

    /// X = A x + B, so that X^2 = A Q(x) + kN.
    pub fn x_value(&self, x: i64) -> BigInt {
        &self.a * BigInt::from(x) + &self.b
    }

    /// Q(x) = A x^2 + 2 B x + C.
    pub fn evaluate(&self, x: i64) -> BigInt {
        let xb = BigInt::from(x);
        (&self.a * &xb + &self.b * 2u32) * &xb + &self.c
    }

    /// Pick s factor base indices whose product lands near the target. The
    /// first s-1 come in pseudo-random pairs balanced around the geometric
    /// mean; the last is chosen deterministically to close the gap.
    fn draw_a(&mut self, ctx: &SieveContext) {
        let fb = &ctx.factor_base.primes;
        let span = self.span as i64;
        let min = self.min as i64;
        let max_offset = ctx.params.num_primes as i64 - min - 1;

        self.aind.clear();
        self.a = BigInt::from(1);

        let mut i = 0;
        while i < self.s - 1 {
            let mut ran = span / 2 + self.rng.gen_range(0..span / 2) as i64;
            ran = self.probe_free(ran, max_offset);
            self.aind.push(ran as usize);
            self.a *= BigInt::from(fb[(ran + min) as usize]);
            i += 1;
            if i < self.s - 1 {
                let mid = min + span / 2;
                let mut ran2 = (mid * mid) / (ran + min) - self.rng.gen_range(0..10) as i64 - min;
                ran2 = self.probe_free(ran2, max_offset);
                self.aind.push(ran2 as usize);
                self.a *= BigInt::from(fb[(ran2 + min) as usize]);
                i += 1;
            }
        }

        // Final factor: first prime above target / A-so-far.
        let remainder = &self.a_target / &self.a;
        let mut fact = 1i64;
        while (fact as usize) < ctx.params.num_primes - 1
            && remainder >= BigInt::from(fb[fact as usize])
        {
            fact += 1;
        }
        let mut fact = fact - min;
        if fact < 0 {
            fact = 0;
        }
        fact = self.probe_free(fact - 1, max_offset);
        self.aind.push(fact as usize);
        self.a *= BigInt::from(fb[(fact + min) as usize]);

        debug!(
            "A = {} from factors {:?}",
            self.a,
            self.aind
                .iter()
                .map(|&off| fb[off + self.min])
                .collect::<Vec<_>>()
        );
    }

    /// Linear probe upward from ran+1 until the offset is unused and in range.
    fn probe_free(&self, mut ran: i64, max_offset: i64) -> i64 {
        if ran < -1 {
            ran = -1;
        }
        if ran >= max_offset {
            ran = -1;
        }
        loop {
            ran += 1;
            if ran >= max_offset {
                ran = 0;
            }
            if !self.aind.iter().any(|&x| x as i64 == ran) {
                return ran;
            }
        }
    }

    /// Compute the B-terms for the current A and initialise the per-prime
    /// root and correction tables (sibling 0 state).
    fn init_for_a(&mut self, ctx: &SieveContext) {
        let fb = &ctx.factor_base;
        let mdiv2 = ctx.params.mdiv2 as u64;

        self.b_terms.clear();
        for j in 0..self.s {
            let idx = self.aind[j] + self.min;
            let p = fb.primes[idx];
            let a_div_p = &self.a / BigInt::from(p);
            let amodp = a_div_p.mod_floor(&BigInt::from(p)).to_u64().unwrap();
            self.a_mod_p[j] = amodp;
            let mut gamma =
                ModInverse::invert(amodp, p) as u128 * fb.sqrts[idx] as u128 % p as u128;
            if gamma > (p / 2) as u128 {
                gamma = p as u128 - gamma;
            }
            self.b_terms.push(a_div_p * BigInt::from(gamma as u64));
        }

        self.b = BigInt::from(0);
        for t in &self.b_terms {
            self.b += t;
        }

        for i in 0..ctx.params.num_primes {
            let p = fb.primes[i];
            if p <= 1 {
                for j in 0..self.s {
                    self.ainv2b[j][i] = 0;
                }
                self.soln1[i] = 0;
                self.soln2[i] = 0;
                continue;
            }
            let pb = BigInt::from(p);
            let ainv = ModInverse::invert(self.a.mod_floor(&pb).to_u64().unwrap(), p);
            for j in 0..self.s {
                let bj = self.b_terms[j].mod_floor(&pb).to_u64().unwrap();
                self.ainv2b[j][i] = (bj as u128 * 2 * ainv as u128 % p as u128) as u32;
            }
            let b_mod_p = self.b.mod_floor(&pb).to_u64().unwrap();
            let r = fb.sqrts[i];
            let soln1 = ((r + p - b_mod_p) as u128 * ainv as u128 + mdiv2 as u128) % p as u128;
            let soln2 = ((p - r) as u128 * 2 * ainv as u128) % p as u128 + soln1;
            self.soln1[i] = soln1 as u32;
            self.soln2[i] = soln2 as u32;
        }
        for j in 0..self.s {
            self.soln2[self.aind[j] + self.min] = SOLN_SENTINEL;
        }

        self.poly_index = 0;
        self.compute_c(ctx);
    }

    fn next_sibling(&mut self, ctx: &SieveContext) {
        let polyindex = self.poly_index + 1;
        let j = polyindex.trailing_zeros() as usize;
        let poly_add = (polyindex >> j) & 2 != 0;
        if poly_add {
            self.b += &self.b_terms[j] * 2u32;
        } else {
            self.b -= &self.b_terms[j] * 2u32;
        }
        self.poly_add = poly_add;
        self.corr_index = j;
        self.poly_index = polyindex;

        // The incremental update is wrong modulo the factors of A (A^-1 does
        // not exist there); rebuild their single root from B mod p^2.
        for jj in 0..self.s {
            let idx = self.aind[jj] + self.min;
            let p = ctx.factor_base.primes[idx];
            let p2 = p * p;
            let p2b = BigInt::from(p2);
            let d = ctx.kn.mod_floor(&p2b).to_u64().unwrap();
            let b_mod_p2 = self.b.mod_floor(&p2b).to_u64().unwrap();
            // the linear residue of Q mod p is 2Bx + C, hence the inverse of
            // 2 * B * (A/p)
            let t = (b_mod_p2 as u128 * 2 % p as u128 * self.a_mod_p[jj] as u128 % p as u128)
                as u64;
            let u1 = ModInverse::invert(t, p);
            let b_sq = (b_mod_p2 as u128 * b_mod_p2 as u128 % p2 as u128) as u64;
            // (kN - B^2) mod p^2 is divisible by p; its quotient gives the
            // lifted root offset.
            let v = (d + p2 - b_sq) % p2;
            let w = v / p;
            let soln1 =
                (w as u128 * u1 as u128 + ctx.params.mdiv2 as u128 + p as u128) % p as u128;
            self.soln1[idx] = soln1 as u32;
            self.soln2[idx] = SOLN_SENTINEL;
        }

        self.compute_c(ctx);
    }

    fn compute_c(&mut self, ctx: &SieveContext) {
        // exact by construction: A | B^2 - kN
        self.c = (&self.b * &self.b - &ctx.kn) / &self.a;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::{Signed, Zero};
    use std::str::FromStr;

    fn test_context() -> SieveContext {
        let n = BigInt::from_str("10000000000000000016800000000000000005031").unwrap();
        SieveContext::new(&n).unwrap()
    }

    #[test]
    fn test_b_squared_congruent_kn_mod_a() {
        let ctx = test_context();
        let group = PolyGroup::new(&ctx, 1);
        let b_sq = (&group.b * &group.b).mod_floor(&group.a);
        assert_eq!(b_sq, ctx.kn.mod_floor(&group.a));
    }

    #[test]
    fn test_a_is_product_of_aind_primes() {
        let ctx = test_context();
        let group = PolyGroup::new(&ctx, 7);
        let mut prod = BigInt::from(1);
        for &off in &group.aind {
            prod *= BigInt::from(ctx.factor_base.primes[off + group.min]);
        }
        assert_eq!(prod, group.a);
        // all offsets distinct
        let mut seen = group.aind.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), group.s);
    }

    #[test]
    fn test_polynomial_identity() {
        // A * Q(x) = (A x + B)^2 - kN for every sibling
        let ctx = test_context();
        let mut group = PolyGroup::new(&ctx, 3);
        for _ in 0..8 {
            group.advance(&ctx);
            for x in [-31000i64, -1, 0, 1, 999, 31999] {
                let q = group.evaluate(x);
                let xv = group.x_value(x);
                assert_eq!(&group.a * &q, &xv * &xv - &ctx.kn);
            }
        }
    }

    #[test]
    fn test_c_exactness() {
        let ctx = test_context();
        let mut group = PolyGroup::new(&ctx, 3);
        group.advance(&ctx);
        assert_eq!(&group.a * &group.c, &group.b * &group.b - &ctx.kn);
    }

    #[test]
    fn test_soln_are_roots() {
        let ctx = test_context();
        let mut group = PolyGroup::new(&ctx, 5);
        let mdiv2 = ctx.params.mdiv2 as i64;
        for _ in 0..4 {
            group.advance(&ctx);
            // after a flip the stored roots are stale until the sieve applies
            // the correction; apply it here the same way the sieve does.
            let corr = group.ainv2b[group.corr_index].clone();
            for i in 1..ctx.params.num_primes {
                let p = ctx.factor_base.primes[i];
                if group.soln2[i] != SOLN_SENTINEL {
                    let correction = if group.poly_add {
                        p as u32 - corr[i]
                    } else {
                        corr[i]
                    };
                    group.soln1[i] = (group.soln1[i] + correction) % p as u32;
                    group.soln2[i] = (group.soln2[i] + correction) % p as u32;
                }
            }
            for i in (1..ctx.params.num_primes).step_by(97) {
                let p = ctx.factor_base.primes[i];
                let s1 = group.soln1[i] as i64;
                let q1 = group.evaluate(s1 - mdiv2);
                assert!(
                    q1.mod_floor(&BigInt::from(p)).is_zero(),
                    "soln1 not a root mod {}",
                    p
                );
                if group.soln2[i] != SOLN_SENTINEL {
                    let s2 = group.soln2[i] as i64;
                    let q2 = group.evaluate(s2 - mdiv2);
                    assert!(
                        q2.mod_floor(&BigInt::from(p)).is_zero(),
                        "soln2 not a root mod {}",
                        p
                    );
                }
            }
            // A-prime roots are rebuilt directly and need no correction
            for jj in 0..group.s {
                let idx = group.aind[jj] + group.min;
                let p = ctx.factor_base.primes[idx];
                let s1 = group.soln1[idx] as i64;
                let q1 = group.evaluate(s1 - mdiv2);
                assert!(q1.mod_floor(&BigInt::from(p)).is_zero());
            }
        }
    }

    #[test]
    fn test_gray_code_covers_all_sign_patterns() {
        // Walking all siblings must produce 2^(s-1) distinct |B| values that
        // together realise every sign assignment of the B-terms (up to the
        // global sign).
        let ctx = test_context();
        let mut group = PolyGroup::new(&ctx, 11);
        let mut seen = vec![group.b.abs()];
        for _ in 0..group.siblings_per_a() {
            group.advance(&ctx);
            seen.push(group.b.abs());
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 1 << (group.s - 1));
    }

    #[test]
    fn test_fresh_a_after_exhaustion() {
        let ctx = test_context();
        let mut group = PolyGroup::new(&ctx, 13);
        let first_a = group.a.clone();
        for _ in 0..group.siblings_per_a() {
            group.advance(&ctx);
            assert_eq!(group.a, first_a);
        }
        group.advance(&ctx);
        assert_ne!(group.a, first_a);
        assert_eq!(group.poly_index, 1);
    }
}
