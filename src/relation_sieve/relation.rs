// src/relation_sieve/relation.rs
//
// On-disk relation format, one ASCII line each:
//   full:    "X : e1 i1 e2 i2 ... 0"
//   partial: "q @ X : e1 i1 e2 i2 ... 0"
// where X is the (possibly negative) decimal value with X^2 = A*Q(x) + kN,
// the pairs are exponent / factor-base-index, and q is the residual large
// prime. The exponent list is 0-terminated like the C stdio original it
// stays compatible with.

use num::BigInt;
use std::fmt::Write as FmtWrite;
use std::str::FromStr;

use crate::core::error::SimpqsError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub x: BigInt,
    /// (exponent, factor base index) pairs, every exponent > 0.
    pub pairs: Vec<(u32, u32)>,
}

impl Relation {
    pub fn to_line(&self) -> String {
        let mut line = format!("{} :", self.x);
        for &(e, i) in &self.pairs {
            let _ = write!(line, " {} {}", e, i);
        }
        line.push_str(" 0");
        line
    }

    pub fn parse(line: &str) -> Result<Relation, SimpqsError> {
        let (x_part, exps) = line
            .split_once(':')
            .ok_or_else(|| SimpqsError::RelationFormat(line.to_string()))?;
        let x = BigInt::from_str(x_part.trim())
            .map_err(|_| SimpqsError::RelationFormat(line.to_string()))?;
        let pairs = parse_pairs(exps).ok_or_else(|| SimpqsError::RelationFormat(line.to_string()))?;
        Ok(Relation { x, pairs })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialRelation {
    pub q: u64,
    pub relation: Relation,
}

impl PartialRelation {
    pub fn to_line(&self) -> String {
        format!("{} @ {}", self.q, self.relation.to_line())
    }

    pub fn parse(line: &str) -> Result<PartialRelation, SimpqsError> {
        let (q_part, rest) = line
            .split_once('@')
            .ok_or_else(|| SimpqsError::RelationFormat(line.to_string()))?;
        let q = q_part
            .trim()
            .parse::<u64>()
            .map_err(|_| SimpqsError::RelationFormat(line.to_string()))?;
        Ok(PartialRelation {
            q,
            relation: Relation::parse(rest)?,
        })
    }
}

/// The sort and merge key of a relation line: the leading decimal integer
/// (the large prime of a partial, the X value of a full relation). X values
/// too large for the key saturate, with the full line as tie-break wherever
/// the key is used for ordering.
pub fn line_key(line: &str) -> i64 {
    let end = line
        .find(|c: char| !(c.is_ascii_digit() || c == '-'))
        .unwrap_or(line.len());
    match line[..end].parse::<i64>() {
        Ok(v) => v,
        Err(_) if line.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    }
}

fn parse_pairs(s: &str) -> Option<Vec<(u32, u32)>> {
    let mut pairs = Vec::new();
    let mut tokens = s.split_ascii_whitespace();
    loop {
        let e = tokens.next()?.parse::<u32>().ok()?;
        if e == 0 {
            return Some(pairs);
        }
        let i = tokens.next()?.parse::<u32>().ok()?;
        pairs.push((e, i));
    }
}
