// src/core/multiplier.rs
//
// Knuth-Schroeppel multiplier selection. A good k makes kN a square modulo
// many small primes, which then join the factor base and hit the sieving
// interval often.

use log::debug;
use num::{BigInt, Integer, ToPrimitive};

use crate::integer_math::legendre::Legendre;
use crate::integer_math::prime_factory::SMALL_PRIMES;

pub const MULTIPLIERS: [u64; 15] = [1, 2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43];

const LN2_OVER_2: f64 = 0.34657359;

/// Score every candidate multiplier and return the best one.
pub fn knuth_schroeppel(n: &BigInt) -> u64 {
    let n_mod_8 = n.mod_floor(&BigInt::from(8)).to_u64().unwrap();

    let mut scores = [0f64; MULTIPLIERS.len()];
    for (i, &k) in MULTIPLIERS.iter().enumerate() {
        let kn_mod_8 = (n_mod_8 * k) % 8;
        scores[i] = LN2_OVER_2;
        if kn_mod_8 == 1 {
            scores[i] *= 4.0;
        }
        if kn_mod_8 == 5 {
            scores[i] *= 2.0;
        }
        scores[i] -= (k as f64).ln() / 2.0;
    }

    for &p in SMALL_PRIMES.iter().filter(|&&p| p > 2) {
        let log_p_div_p = (p as f64).ln() / p as f64;
        let kron_n = Legendre::symbol_bigint(n, p);
        for (i, &k) in MULTIPLIERS.iter().enumerate() {
            match kron_n * Legendre::symbol(k, p) {
                0 => scores[i] += log_p_div_p,
                1 => scores[i] += 2.0 * log_p_div_p,
                _ => (),
            }
        }
    }

    let mut best = 1u64;
    let mut best_score = f64::MIN;
    for (i, &k) in MULTIPLIERS.iter().enumerate() {
        if scores[i] > best_score {
            best_score = scores[i];
            best = k;
        }
    }
    debug!("multiplier k = {} (score {:.4})", best, best_score);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_multiplier_in_candidate_set() {
        let n = BigInt::from_str("10000000000000000016800000000000000005031").unwrap();
        let k = knuth_schroeppel(&n);
        assert!(MULTIPLIERS.contains(&k));
    }

    #[test]
    fn test_multiplier_mod_8_preference() {
        // kN = 1 (mod 8) gets the largest base score, so for an n that is
        // already 1 mod 8 a small k = 1 (mod 8) scoring well is expected
        // to beat large multipliers.
        let n = BigInt::from_str("10000000000000000000000000000000000000081").unwrap();
        assert_eq!(n.mod_floor(&BigInt::from(8)), BigInt::from(1));
        let k = knuth_schroeppel(&n);
        let kn = BigInt::from(k) * &n;
        // the winner never makes kN = 2, 3, 6, 7 mod 8 worse than n itself
        let kn_mod_8 = kn.mod_floor(&BigInt::from(8)).to_u64().unwrap();
        assert!(kn_mod_8 % 2 == 1 || k == 2);
    }

    #[test]
    fn test_multiplier_with_small_factor() {
        // 43 divides n: scoring must still complete and return a candidate.
        let base = BigInt::from_str("1000000000000000000000000000000000000007").unwrap();
        let n = base * 43;
        let k = knuth_schroeppel(&n);
        assert!(MULTIPLIERS.contains(&k));
    }
}
