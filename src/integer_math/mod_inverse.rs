// src/integer_math/mod_inverse.rs

use num::{BigInt, Integer, One, Signed, Zero};

pub struct ModInverse;

impl ModInverse {
    /// a^-1 mod p on machine words via the extended Euclidean algorithm.
    /// Returns 0 when no inverse exists (gcd(a, p) != 1).
    pub fn invert(a: u64, p: u64) -> u64 {
        if p <= 1 {
            return 0;
        }
        let (mut u1, mut u3) = (1i64, (a % p) as i64);
        let (mut v1, mut v3) = (0i64, p as i64);
        while v3 != 0 {
            let quot = u3 / v3;
            let t1 = u1 - quot * v1;
            let t3 = u3 - quot * v3;
            u1 = v1;
            u3 = v3;
            v1 = t1;
            v3 = t3;
        }
        if u3 != 1 {
            return 0;
        }
        if u1 < 0 {
            u1 += p as i64;
        }
        u1 as u64
    }

    /// a^-1 mod m for bignums; None when gcd(a, m) != 1.
    pub fn invert_bigint(a: &BigInt, m: &BigInt) -> Option<BigInt> {
        if m.is_one() {
            return Some(BigInt::zero());
        }
        let (gcd, x, _) = Self::extended_gcd(&a.mod_floor(m), m);
        if !gcd.is_one() {
            return None;
        }
        let result = if x.is_negative() { x + m } else { x };
        Some(result.mod_floor(m))
    }

    /// Returns (gcd, x, y) such that a*x + b*y = gcd.
    pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
        if a.is_zero() {
            return (b.clone(), BigInt::zero(), BigInt::one());
        }
        let (gcd, x1, y1) = Self::extended_gcd(&b.mod_floor(a), a);
        let x = &y1 - (b / a) * &x1;
        (gcd, x, x1)
    }
}
