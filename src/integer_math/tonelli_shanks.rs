// src/integer_math/tonelli_shanks.rs
//
// Tonelli-Shanks square roots modulo a prime. Every factor base prime p
// satisfies (kN/p) = 1, so the None branch only fires on bad input.

use num::{BigInt, Integer, ToPrimitive};

use crate::integer_math::legendre::Legendre;

pub struct TonelliShanks;

impl TonelliShanks {
    /// A square root of a modulo the prime p, or None when a is a non-residue.
    pub fn sqrt_mod(a: u64, p: u64) -> Option<u64> {
        if p == 2 {
            return Some(a & 1);
        }
        let a = a % p;
        if a == 0 {
            return Some(0);
        }
        if Legendre::symbol(a, p) != 1 {
            return None;
        }
        if p % 4 == 3 {
            return Some(Legendre::pow_mod(a, (p + 1) / 4, p));
        }

        // p = 1 (mod 4): write p - 1 = q * 2^s with q odd
        let mut q = p - 1;
        let mut s = 0u32;
        while q % 2 == 0 {
            q /= 2;
            s += 1;
        }
        let mut z = 2u64;
        while Legendre::symbol(z, p) != -1 {
            z += 1;
        }

        let mut m = s;
        let mut c = Legendre::pow_mod(z, q, p);
        let mut t = Legendre::pow_mod(a, q, p);
        let mut r = Legendre::pow_mod(a, (q + 1) / 2, p);

        while t != 1 {
            // order of t is 2^i with 0 < i < m
            let mut i = 0u32;
            let mut t2 = t;
            while t2 != 1 {
                t2 = Self::mul_mod(t2, t2, p);
                i += 1;
                if i == m {
                    return None;
                }
            }
            let b = Legendre::pow_mod(c, 1u64 << (m - i - 1), p);
            m = i;
            c = Self::mul_mod(b, b, p);
            t = Self::mul_mod(t, c, p);
            r = Self::mul_mod(r, b, p);
        }
        Some(r)
    }

    /// Square root of n mod p for bignum n.
    pub fn sqrt_mod_bigint(n: &BigInt, p: u64) -> Option<u64> {
        let r = n.mod_floor(&BigInt::from(p)).to_u64().unwrap();
        Self::sqrt_mod(r, p)
    }

    fn mul_mod(x: u64, y: u64, p: u64) -> u64 {
        ((x as u128 * y as u128) % p as u128) as u64
    }
}
