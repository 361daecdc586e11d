// src/relation_sieve/evaluator.rs
//
// Scans the sieve accumulator for candidate positions and trial divides
// Q(x) over the factor base. Primes below first_prime are always tried;
// the sieved ranges are only tried where the position matches a stored
// root, and the flagged range additionally requires the per-prime hit bit.

use std::io::Write;

use num::{BigInt, Integer, Signed, ToPrimitive, Zero};

use crate::core::error::SimpqsError;
use crate::core::parameters::{SIEVE_MASK, SOLN_SENTINEL};
use crate::core::sieve_context::SieveContext;
use crate::relation_sieve::poly::PolyGroup;
use crate::relation_sieve::relation::{PartialRelation, Relation};
use crate::relation_sieve::sieve::Sieve;

#[derive(Debug, Default, Clone, Copy)]
pub struct EvaluatedCounts {
    pub fulls: usize,
    pub partials: usize,
}

/// Residuals at or below this are considered fully factored.
const FULL_RESIDUE_BOUND: u64 = 1000;

pub fn evaluate_sieve<W1: Write, W2: Write>(
    ctx: &SieveContext,
    group: &PolyGroup,
    sieve: &mut Sieve,
    rels: &mut W1,
    lpnew: &mut W2,
) -> Result<EvaluatedCounts, SimpqsError> {
    let interval = sieve.interval();
    let threshold = ctx.params.threshold;
    let mut counts = EvaluatedCounts::default();

    let words = interval / 8;
    for w in 0..words {
        let chunk: [u8; 8] = sieve.accumulator[w * 8..w * 8 + 8].try_into().unwrap();
        if u64::from_ne_bytes(chunk) & SIEVE_MASK == 0 {
            continue;
        }
        for b in 0..8 {
            let i = w * 8 + b;
            if sieve.accumulator[i] >= threshold {
                evaluate_candidate(ctx, group, sieve, i, rels, lpnew, &mut counts)?;
            }
        }
    }
    Ok(counts)
}

#[allow(clippy::too_many_arguments)]
fn evaluate_candidate<W1: Write, W2: Write>(
    ctx: &SieveContext,
    group: &PolyGroup,
    sieve: &mut Sieve,
    i: usize,
    rels: &mut W1,
    lpnew: &mut W2,
    counts: &mut EvaluatedCounts,
) -> Result<(), SimpqsError> {
    let fb = &ctx.factor_base;
    let params = &ctx.params;

    let x = i as i64 - params.mdiv2 as i64;
    let x_value = group.x_value(x);
    let mut res = group.evaluate(x);
    if res.is_zero() {
        return Ok(());
    }
    let bits = (res.bits() as u32).saturating_sub(params.error_bits as u32);

    // Small primes are cheap enough to try unconditionally.
    let mut small_exponents = vec![0u32; params.first_prime];
    let mut extra: u32 = 0;
    if fb.primes[0] != 1 {
        let e = remove_factor(&mut res, fb.primes[0]);
        small_exponents[0] = e;
        if e > 0 {
            extra += fb.sizes[0] as u32;
        }
    }
    let e2 = remove_factor(&mut res, fb.primes[1]);
    small_exponents[1] = e2;
    extra += e2;

    for k in 2..params.first_prime {
        let p = fb.primes[k];
        let modp = i as u64 % p;
        if group.soln2[k] != SOLN_SENTINEL {
            if modp == group.soln1[k] as u64 || modp == group.soln2[k] as u64 {
                let e = remove_factor(&mut res, p);
                extra += fb.sizes[k] as u32;
                small_exponents[k] = e;
            }
        } else {
            let e = remove_factor(&mut res, p);
            if e > 0 {
                extra += fb.sizes[k] as u32;
            }
            small_exponents[k] = e;
        }
    }

    sieve.accumulator[i] = sieve.accumulator[i].wrapping_add((extra & 0xFF) as u8);
    if (sieve.accumulator[i] as u32) < bits {
        return Ok(());
    }

    // Sieved primes: only try where the position matches a root.
    let hit_bit = 1u8 << (i & 7);
    let mut factors: Vec<(u32, u32)> = Vec::with_capacity(32);
    let mut k = params.first_prime;
    while k < params.second_prime && extra < sieve.accumulator[i] as u32 {
        let p = fb.primes[k];
        let modp = i as u64 % p;
        if group.soln2[k] != SOLN_SENTINEL {
            if modp == group.soln1[k] as u64 || modp == group.soln2[k] as u64 {
                let e = remove_factor(&mut res, p);
                extra += fb.sizes[k] as u32;
                if e > 0 {
                    factors.push((e, k as u32));
                }
            }
        } else {
            // factors of A are never sieved, so they do not count toward the
            // early stop
            let e = remove_factor(&mut res, p);
            if e > 0 {
                factors.push((e, k as u32));
            }
        }
        k += 1;
    }
    let mut k = params.second_prime;
    while k < params.num_primes && extra < sieve.accumulator[i] as u32 {
        if sieve.flags[k] & hit_bit != 0 {
            let p = fb.primes[k];
            let modp = i as u64 % p;
            if modp == group.soln1[k] as u64 || modp == group.soln2[k] as u64 {
                let e = remove_factor(&mut res, p);
                extra += fb.sizes[k] as u32;
                if e > 0 {
                    factors.push((e, k as u32));
                }
            }
        }
        k += 1;
    }

    // Residual classification on |res|; the matrix step tolerates the sign.
    let res_mag = res.abs();
    if res_mag <= BigInt::from(FULL_RESIDUE_BOUND) {
        let rel = Relation {
            x: x_value,
            pairs: assemble_pairs(group, &small_exponents, &factors),
        };
        writeln!(rels, "{}", rel.to_line()).map_err(SimpqsError::Io)?;
        counts.fulls += 1;
    } else if res_mag < BigInt::from(params.large_prime) {
        let partial = PartialRelation {
            q: res_mag.to_u64().unwrap(),
            relation: Relation {
                x: x_value,
                pairs: assemble_pairs(group, &small_exponents, &factors),
            },
        };
        writeln!(lpnew, "{}", partial.to_line()).map_err(SimpqsError::Io)?;
        counts.partials += 1;
    }
    Ok(())
}

/// Exponent pairs in stream order: always-tried primes, sieved hits, then
/// one entry per factor of A.
fn assemble_pairs(
    group: &PolyGroup,
    small_exponents: &[u32],
    factors: &[(u32, u32)],
) -> Vec<(u32, u32)> {
    let mut pairs = Vec::with_capacity(small_exponents.len() + factors.len() + group.s);
    for (k, &e) in small_exponents.iter().enumerate() {
        if e > 0 {
            pairs.push((e, k as u32));
        }
    }
    pairs.extend_from_slice(factors);
    for j in 0..group.s {
        pairs.push((1, (group.aind[j] + group.min) as u32));
    }
    pairs
}

fn remove_factor(res: &mut BigInt, p: u64) -> u32 {
    if p <= 1 {
        return 0;
    }
    let pb = BigInt::from(p);
    let mut e = 0u32;
    loop {
        let (q, r) = res.div_rem(&pb);
        if r.is_zero() {
            *res = q;
            e += 1;
        } else {
            return e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_remove_factor() {
        let mut v = BigInt::from(3 * 3 * 7 * 11);
        assert_eq!(remove_factor(&mut v, 3), 2);
        assert_eq!(remove_factor(&mut v, 5), 0);
        assert_eq!(remove_factor(&mut v, 7), 1);
        assert_eq!(v, BigInt::from(11));

        let mut neg = BigInt::from(-12);
        assert_eq!(remove_factor(&mut neg, 2), 2);
        assert_eq!(neg, BigInt::from(-3));
    }

    #[test]
    fn test_relations_satisfy_congruence() {
        // Every emitted full relation must satisfy X^2 = +-prod(p_i^e_i)
        // modulo kN; every partial the same with the large prime included.
        let n = BigInt::from_str("10000000000000000016800000000000000005031").unwrap();
        let ctx = SieveContext::new(&n).unwrap();
        let mut group = PolyGroup::new(&ctx, 29);
        let mut sieve = Sieve::new(&ctx);

        let mut rels: Vec<u8> = Vec::new();
        let mut lpnew: Vec<u8> = Vec::new();
        let mut total = EvaluatedCounts::default();
        for _ in 0..12 {
            group.advance(&ctx);
            sieve.run(&ctx, &mut group);
            let c = evaluate_sieve(&ctx, &group, &mut sieve, &mut rels, &mut lpnew).unwrap();
            total.fulls += c.fulls;
            total.partials += c.partials;
        }
        // with 41-digit parameters a dozen polynomials reliably yield output
        assert!(
            total.fulls + total.partials > 0,
            "no candidates survived trial division"
        );

        let check = |x: &BigInt, pairs: &[(u32, u32)], q: u64| {
            let mut prod = BigInt::from(q);
            for &(e, idx) in pairs {
                let p = BigInt::from(ctx.factor_base.primes[idx as usize]);
                prod = prod * p.modpow(&BigInt::from(e), &ctx.kn);
                prod = prod.mod_floor(&ctx.kn);
            }
            let x_sq = (x * x).mod_floor(&ctx.kn);
            let sum = (&x_sq + &prod).mod_floor(&ctx.kn);
            assert!(
                x_sq == prod || sum.is_zero(),
                "congruence failed for X = {}",
                x
            );
        };

        for line in String::from_utf8(rels).unwrap().lines() {
            let rel = Relation::parse(line).unwrap();
            check(&rel.x, &rel.pairs, 1);
        }
        for line in String::from_utf8(lpnew).unwrap().lines() {
            let partial = PartialRelation::parse(line).unwrap();
            assert!(partial.q > FULL_RESIDUE_BOUND);
            assert!(partial.q < ctx.params.large_prime);
            check(&partial.relation.x, &partial.relation.pairs, partial.q);
        }
    }
}
