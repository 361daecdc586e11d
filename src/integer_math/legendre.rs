// src/integer_math/legendre.rs

use num::{BigInt, Integer, ToPrimitive};

pub struct Legendre;

impl Legendre {
    /// Legendre symbol (a/p) for an odd prime p: 1 for a quadratic residue,
    /// -1 for a non-residue, 0 when p divides a. Euler's criterion.
    pub fn symbol(a: u64, p: u64) -> i32 {
        let a = a % p;
        if a == 0 {
            return 0;
        }
        if Self::pow_mod(a, (p - 1) / 2, p) == 1 {
            1
        } else {
            -1
        }
    }

    /// (n/p) for a bignum n and an odd prime p.
    pub fn symbol_bigint(n: &BigInt, p: u64) -> i32 {
        let r = n.mod_floor(&BigInt::from(p)).to_u64().unwrap();
        Self::symbol(r, p)
    }

    /// base^exp mod m on machine words.
    pub fn pow_mod(base: u64, mut exp: u64, m: u64) -> u64 {
        if m == 1 {
            return 0;
        }
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
