// Integration tests for the quadratic sieve pipeline
use num::{BigInt, Integer, One, Zero};
use simpqs::{factor, SimpqsConfig};
use std::str::FromStr;

fn test_config(tag: &str) -> SimpqsConfig {
    let dir = std::env::temp_dir().join(format!("simpqs-e2e-{}-{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    SimpqsConfig {
        tmp_dir: Some(dir.to_string_lossy().into_owned()),
        ..SimpqsConfig::default()
    }
}

#[test]
fn test_factor_41_digit_semiprime() {
    // 10^40 + 168*10^20 + 5031 = (10^20 + 39) * (10^20 + 129)
    let n = BigInt::from_str("10000000000000000016800000000000000005031").unwrap();
    let factors = factor(&n, &test_config("41")).expect("sieve failed");

    assert!(!factors.is_empty(), "no factor found");
    for f in &factors {
        assert!(f > &BigInt::one());
        assert!(f < &n);
        assert!(n.mod_floor(f).is_zero(), "{} does not divide n", f);
    }
    // with both prime factors known, every divisor is one of them
    let p = BigInt::from_str("100000000000000000039").unwrap();
    let q = BigInt::from_str("100000000000000000129").unwrap();
    for f in &factors {
        assert!(f == &p || f == &q);
    }
}

#[test]
fn test_factor_perfect_square_input() {
    // p^2 for a 21-digit p: must come back as p via the square screen
    let p = BigInt::from_str("1000000000000000000117").unwrap();
    let n = &p * &p;
    let factors = factor(&n, &test_config("square")).unwrap();
    assert_eq!(factors, vec![p]);
}

#[test]
#[ignore] // takes minutes in a test profile
fn test_factor_42_digit_number() {
    let n = BigInt::from_str("628343462775940766740025939587872832856351").unwrap();
    let factors = factor(&n, &test_config("42")).expect("sieve failed");
    assert!(!factors.is_empty());
    for f in &factors {
        assert!(f > &BigInt::one() && f < &n);
        assert!(n.mod_floor(f).is_zero());
    }
}

#[test]
#[ignore] // takes minutes in a test profile
fn test_factor_48_digit_number() {
    let n = BigInt::from_str("924749938828041082847054913126284372335960469233").unwrap();
    let factors = factor(&n, &test_config("48")).expect("sieve failed");
    assert!(!factors.is_empty());
    for f in &factors {
        assert!(f > &BigInt::one() && f < &n);
        assert!(n.mod_floor(f).is_zero());
    }
}

#[test]
#[ignore] // takes minutes in a test profile
fn test_factor_with_multiplier_candidate_divisor() {
    // 43 divides n and 43 is a multiplier candidate; the run must still
    // produce valid divisors (often through the large prime combiner
    // tripping over gcd(q, kN))
    let p = BigInt::from_str("100000000000000000039").unwrap();
    let q = BigInt::from_str("100000000000000000129").unwrap();
    let n = BigInt::from(43u32) * &p * &q;
    let factors = factor(&n, &test_config("mult")).expect("sieve failed");
    assert!(!factors.is_empty());
    for f in &factors {
        assert!(f > &BigInt::one() && f < &n);
        assert!(n.mod_floor(f).is_zero());
    }
}
