// src/core/parameters.rs
//
// Digit-indexed tuning tables for the sieve. Rows cover 40 to 91 decimal
// digits; larger inputs fall back to formulas.

/// Cache block for the small-prime sieve passes. Should stay below L2.
pub const CACHE_BLOCK_SIZE: usize = 64000;
/// Factor base index below which the two-cursor loop is unrolled x4.
pub const MEDIUM_PRIME: usize = 900;
/// Factor base index cap for flag-assisted sieving.
pub const SECOND_PRIME: usize = 6000;
/// Factor base index cap for the cache-blocked passes.
pub const MID_PRIME: usize = 1500;
/// Subtracted from log2(p) before rounding the per-prime byte size.
pub const LOG_FUDGE: f64 = 0.15;
/// Smallest input the sieve accepts, in decimal digits.
pub const MIN_DIGITS: usize = 40;
/// Candidate bytes are at least 64; one mask test covers 8 accumulator bytes.
pub const SIEVE_MASK: u64 = 0xC0C0_C0C0_C0C0_C0C0;
/// soln2 marker for the primes dividing A.
pub const SOLN_SENTINEL: u32 = 0xFFFF_FFFF;

// Large prime cutoffs
const LARGE_PRIMES: [u64; 52] = [
    250000, 300000, 370000, 440000, 510000, 580000, 650000, 720000, 790000, 8600000, // 40-49
    930000, 1000000, 1700000, 2400000, 3100000, 3800000, 4500000, 5200000, 5900000, 6600000, // 50-59
    7300000, 8000000, 8900000, 10000000, 11300000, 12800000, 14500000, 16300000, 18100000, 20000000, // 60-69
    22000000, 24000000, 27000000, 32000000, 39000000, // 70-74
    53000000, 65000000, 75000000, 87000000, 100000000, // 75-79
    114000000, 130000000, 150000000, 172000000, 195000000, // 80-84
    220000000, 250000000, 300000000, 350000000, 400000000, // 85-89
    450000000, 500000000, // 90-91
];

// Number of primes in the factor base
const PRIMES_NO: [usize; 52] = [
    1500, 1500, 1600, 1700, 1750, 1800, 1900, 2000, 2050, 2100, // 40-49
    2150, 2200, 2250, 2300, 2400, 2500, 2600, 2700, 2800, 2900, // 50-59
    3000, 3150, 5500, 6000, 6500, 7000, 7500, 8000, 8500, 9000, // 60-69
    9500, 10000, 11500, 13000, 15000, // 70-74
    17000, 24000, 27000, 30000, 37000, // 75-79
    45000, 47000, 53000, 57000, 58000, // 80-84
    59000, 60000, 64000, 68000, 72000, // 85-89
    76000, 80000, // 90-91
];

// First factor base index actually sieved with
const FIRST_PRIMES: [usize; 52] = [
    8, 8, 8, 8, 8, 8, 8, 8, 8, 8, // 40-49
    9, 8, 9, 9, 9, 9, 10, 10, 10, 10, // 50-59
    10, 10, 11, 11, 12, 12, 13, 14, 15, 17, // 60-69
    19, 21, 22, 22, 23, // 70-74
    24, 25, 25, 26, 26, // 75-79
    27, 27, 27, 27, 28, // 80-84
    28, 28, 28, 29, 29, // 85-89
    29, 29, // 90-91
];

// Allowed accumulated rounding error of the byte logs
const ERROR_AMOUNTS: [u8; 52] = [
    16, 17, 17, 18, 18, 19, 19, 19, 20, 20, // 40-49
    21, 21, 21, 22, 22, 22, 23, 23, 23, 24, // 50-59
    24, 24, 25, 25, 25, 25, 26, 26, 26, 26, // 60-69
    27, 27, 28, 28, 29, // 70-74
    29, 30, 30, 30, 31, // 75-79
    31, 31, 31, 32, 32, // 80-84
    32, 32, 32, 33, 33, // 85-89
    33, 33, // 90-91
];

// Accumulator value a byte must reach to be trial divided
const THRESHOLDS: [u8; 52] = [
    66, 67, 67, 68, 68, 68, 69, 69, 69, 69, // 40-49
    70, 70, 70, 71, 71, 71, 72, 72, 73, 73, // 50-59
    74, 74, 75, 75, 76, 76, 77, 77, 78, 79, // 60-69
    80, 81, 82, 83, 84, // 70-74
    85, 86, 87, 88, 89, // 75-79
    91, 92, 93, 93, 94, // 80-84
    95, 96, 97, 98, 100, // 85-89
    101, 102, // 90-91
];

// Half the sieve interval length
const SIEVE_SIZES: [usize; 52] = [
    32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, // 40-49
    32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, // 50-59
    32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, 32000, // 60-69
    32000, 32000, 64000, 64000, 64000, // 70-74
    96000, 96000, 96000, 128000, 128000, // 75-79
    160000, 160000, 160000, 160000, 160000, // 80-84
    192000, 192000, 192000, 192000, 192000, // 85-89
    192000, 192000, // 90-91
];

/// Tuning parameters for one factorisation, resolved from the size of N.
#[derive(Clone, Debug)]
pub struct SieveParameters {
    pub num_primes: usize,
    pub mdiv2: usize,
    pub large_prime: u64,
    pub first_prime: usize,
    pub error_bits: u8,
    pub threshold: u8,
    pub second_prime: usize,
    pub mid_prime: usize,
    pub rel_sought: usize,
}

impl SieveParameters {
    pub fn from_decimal_digits(decimal_digits: usize) -> Self {
        let (num_primes, mut mdiv2, large_prime, first_prime, error_bits, threshold) =
            if decimal_digits <= 91 {
                let idx = decimal_digits.max(MIN_DIGITS) - MIN_DIGITS;
                (
                    PRIMES_NO[idx],
                    SIEVE_SIZES[idx],
                    LARGE_PRIMES[idx],
                    FIRST_PRIMES[idx],
                    ERROR_AMOUNTS[idx],
                    THRESHOLDS[idx],
                )
            } else {
                // all bets are off
                (
                    64000,
                    192000,
                    64000 * 10 * decimal_digits as u64,
                    30,
                    (decimal_digits / 4 + 2) as u8,
                    (43 + (7 * decimal_digits) / 10) as u8,
                )
            };
        if mdiv2 * 2 < CACHE_BLOCK_SIZE {
            mdiv2 = CACHE_BLOCK_SIZE / 2;
        }
        SieveParameters {
            num_primes,
            mdiv2,
            large_prime,
            first_prime,
            error_bits,
            threshold,
            second_prime: num_primes.min(SECOND_PRIME),
            mid_prime: num_primes.min(MID_PRIME),
            rel_sought: num_primes + 64,
        }
    }

    /// Full sieve interval length.
    pub fn interval(&self) -> usize {
        self.mdiv2 * 2
    }
}
