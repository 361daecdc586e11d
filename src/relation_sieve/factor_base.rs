// src/relation_sieve/factor_base.rs

use log::{debug, info};
use num::BigInt;

use crate::core::parameters::LOG_FUDGE;
use crate::integer_math::legendre::Legendre;
use crate::integer_math::prime_factory::PrimeFactory;
use crate::integer_math::tonelli_shanks::TonelliShanks;

/// The factor base: entry 0 is the multiplier, entry 1 is two (unless the
/// multiplier is), then the odd primes p with (kN/p) = 1 in ascending order.
/// `sizes` holds the rounded bit length of each prime and `sqrts` a square
/// root of kN modulo it (entries 0 and 1 are placeholders).
pub struct FactorBase {
    pub primes: Vec<u64>,
    pub sizes: Vec<u8>,
    pub sqrts: Vec<u64>,
}

impl FactorBase {
    pub fn build(kn: &BigInt, num_primes: usize, multiplier: u64) -> FactorBase {
        let mut primes = Vec::with_capacity(num_primes);
        primes.push(multiplier);
        if multiplier != 2 {
            primes.push(2);
        }
        let mut p = 3u64;
        while primes.len() < num_primes {
            if Legendre::symbol_bigint(kn, p) == 1 {
                primes.push(p);
            }
            p = PrimeFactory::next_prime(p);
        }
        info!(
            "{} primes in factor base, largest {}",
            primes.len(),
            primes.last().unwrap()
        );

        let sizes = primes
            .iter()
            .map(|&p| {
                if p <= 1 {
                    0
                } else {
                    ((p as f64).log2() - LOG_FUDGE + 0.5).floor() as u8
                }
            })
            .collect();

        let mut sqrts = vec![0u64; primes.len()];
        for (i, &p) in primes.iter().enumerate().skip(1) {
            sqrts[i] = TonelliShanks::sqrt_mod_bigint(kn, p).unwrap_or(0);
        }
        debug!("square roots of kN computed for {} primes", sqrts.len() - 1);

        FactorBase {
            primes,
            sizes,
            sqrts,
        }
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }
}
