// src/core/sieve_context.rs

use log::info;
use num::BigInt;

use crate::core::error::SimpqsError;
use crate::core::multiplier::knuth_schroeppel;
use crate::core::parameters::{SieveParameters, MIN_DIGITS};
use crate::relation_sieve::factor_base::FactorBase;

/// Everything the polynomial generator, sieve and evaluator share for one
/// factorisation: the input, the multiplier-adjusted target, the tuning
/// parameters and the factor base with its precomputed data.
pub struct SieveContext {
    /// The number the caller wants factored.
    pub n: BigInt,
    /// multiplier * n; the sieve works modulo this.
    pub kn: BigInt,
    pub multiplier: u64,
    pub decimal_digits: usize,
    pub params: SieveParameters,
    pub factor_base: FactorBase,
}

impl SieveContext {
    pub fn new(n: &BigInt) -> Result<SieveContext, SimpqsError> {
        let decimal_digits = n.to_string().len();
        if decimal_digits < MIN_DIGITS {
            return Err(SimpqsError::InputTooSmall(decimal_digits));
        }

        let multiplier = knuth_schroeppel(n);
        let kn = n * BigInt::from(multiplier);
        info!("using multiplier {}", multiplier);

        let params = SieveParameters::from_decimal_digits(decimal_digits);
        info!(
            "{} digits: {} primes, interval {}, large prime cutoff {}",
            decimal_digits,
            params.num_primes,
            params.interval(),
            params.large_prime
        );

        let factor_base = FactorBase::build(&kn, params.num_primes, multiplier);

        Ok(SieveContext {
            n: n.clone(),
            kn,
            multiplier,
            decimal_digits,
            params,
            factor_base,
        })
    }
}
