// src/integer_math/prime_factory.rs

use lazy_static::lazy_static;

lazy_static! {
    /// Shared table of the odd primes below 10000, used by the multiplier
    /// scorer and as trial divisors elsewhere.
    pub static ref SMALL_PRIMES: Vec<u64> = PrimeFactory::primes_below(10000);
}

pub struct PrimeFactory;

impl PrimeFactory {
    /// All primes below the limit, by a plain sieve of Eratosthenes.
    pub fn primes_below(limit: u64) -> Vec<u64> {
        if limit < 3 {
            return vec![];
        }
        let limit = limit as usize;
        let mut composite = vec![false; limit];
        let mut primes = Vec::new();
        for i in 2..limit {
            if !composite[i] {
                primes.push(i as u64);
                let mut j = i * i;
                while j < limit {
                    composite[j] = true;
                    j += i;
                }
            }
        }
        primes
    }

    /// Deterministic Miller-Rabin for u64 inputs.
    pub fn is_prime(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        for p in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
            if n == p {
                return true;
            }
            if n % p == 0 {
                return false;
            }
        }
        let mut d = n - 1;
        let mut s = 0u32;
        while d % 2 == 0 {
            d /= 2;
            s += 1;
        }
        // these bases decide primality for all n < 2^64
        'witness: for a in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
            let mut x = Self::pow_mod(a, d, n);
            if x == 1 || x == n - 1 {
                continue;
            }
            for _ in 1..s {
                x = ((x as u128 * x as u128) % n as u128) as u64;
                if x == n - 1 {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }

    /// The smallest prime strictly greater than n.
    pub fn next_prime(n: u64) -> u64 {
        if n < 2 {
            return 2;
        }
        let mut candidate = if n % 2 == 0 { n + 1 } else { n + 2 };
        while !Self::is_prime(candidate) {
            candidate += 2;
        }
        candidate
    }

    fn pow_mod(base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result: u64 = 1;
        let mut base = (base % m) as u128;
        let m = m as u128;
        while exp > 0 {
            if exp & 1 == 1 {
                result = ((result as u128 * base) % m) as u64;
            }
            base = (base * base) % m;
            exp >>= 1;
        }
        result
    }
}
