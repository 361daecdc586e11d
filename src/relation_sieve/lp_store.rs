// src/relation_sieve/lp_store.rs
//
// File-based large prime bookkeeping, adapted from the Pari/GP mpqs merge
// scheme: relation streams are kept sorted by their leading integer (the
// large prime q for partials, X for full relations), merged line-at-a-time,
// and q-groups of two or more partials are routed to a combination stream
// that synthesises full relations via q^-1 mod N.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};

use log::debug;
use num::{BigInt, Integer, Signed};

use crate::core::error::SimpqsError;
use crate::core::temp_files::TempFiles;
use crate::integer_math::mod_inverse::ModInverse;
use crate::relation_sieve::relation::{line_key, PartialRelation};

/// Buffered one-line lookahead over a relation stream; empty lines are
/// skipped so a trailing newline never yields a phantom entry.
struct LineStream<R: BufRead> {
    lines: Lines<R>,
    peeked: Option<String>,
}

impl<R: BufRead> LineStream<R> {
    fn new(reader: R) -> Result<LineStream<R>, SimpqsError> {
        let mut stream = LineStream {
            lines: reader.lines(),
            peeked: None,
        };
        stream.advance()?;
        Ok(stream)
    }

    fn peek(&self) -> Option<&String> {
        self.peeked.as_ref()
    }

    /// Returns the current line and pulls the next one into the lookahead.
    fn advance(&mut self) -> Result<Option<String>, SimpqsError> {
        let current = self.peeked.take();
        self.peeked = loop {
            match self.lines.next() {
                None => break None,
                Some(Ok(line)) if line.is_empty() => continue,
                Some(Ok(line)) => break Some(line),
                Some(Err(e)) => return Err(e.into()),
            }
        };
        Ok(current)
    }
}

pub struct LpStore<'a> {
    files: &'a TempFiles,
    num_primes: usize,
}

impl<'a> LpStore<'a> {
    pub fn new(files: &'a TempFiles, num_primes: usize) -> LpStore<'a> {
        LpStore { files, num_primes }
    }

    /// Sort a relation file in place by its leading integer, discarding
    /// exact duplicate lines. Returns the number of lines kept.
    pub fn sort_file(&self, base: &str) -> Result<usize, SimpqsError> {
        let reader = BufReader::new(self.files.open(base)?);
        let mut lines: Vec<String> = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines.sort_by(|a, b| line_key(a).cmp(&line_key(b)).then_with(|| a.cmp(b)));
        lines.dedup();

        let mut out = BufWriter::new(self.files.create(base)?);
        for line in &lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(lines.len())
    }

    /// Merge the sorted `new_base` stream into the sorted `rel_base` stream,
    /// replacing `rel_base` with the result via `tmp_base`.
    ///
    /// With `comb` = None (full relation mode) the result keeps every
    /// distinct line and the returned count is the total size of the merged
    /// stream. With `comb` = Some the result keeps one line per q; every
    /// q-group with further members gets its head plus those members copied
    /// to the combination stream, and the returned count is the number of
    /// combinable lines routed there.
    pub fn merge_sorted<W: Write>(
        &self,
        rel_base: &str,
        new_base: &str,
        tmp_base: &str,
        mut comb: Option<&mut W>,
    ) -> Result<usize, SimpqsError> {
        let mut rel = LineStream::new(BufReader::new(self.files.open(rel_base)?))?;
        let mut new = LineStream::new(BufReader::new(self.files.open(new_base)?))?;

        let mut out = BufWriter::new(self.files.create(tmp_base)?);
        let mut count = 0usize;

        loop {
            let take_rel = match (rel.peek(), new.peek()) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(r), Some(n)) => line_key(r) < line_key(n),
            };

            if take_rel {
                let line = rel.advance()?.unwrap();
                writeln!(out, "{}", line)?;
                if comb.is_none() {
                    count += 1;
                }
                continue;
            }

            // group keyed by the next new line
            let head_key = line_key(new.peek().unwrap());
            let rel_head = if rel.peek().map(|r| line_key(r) == head_key).unwrap_or(false) {
                rel.advance()?
            } else {
                None
            };
            let head = match rel_head {
                Some(line) => line,
                None => new.advance()?.unwrap(),
            };

            let mut members: Vec<String> = Vec::new();
            while new.peek().map(|n| line_key(n) == head_key).unwrap_or(false) {
                let line = new.advance()?.unwrap();
                if line != head {
                    members.push(line);
                }
            }

            match &mut comb {
                Some(comb) => {
                    // partial mode: one line per q survives, groups combine
                    writeln!(out, "{}", head)?;
                    if !members.is_empty() {
                        writeln!(comb, "{}", head)?;
                        for m in &members {
                            writeln!(comb, "{}", m)?;
                        }
                        count += members.len();
                    }
                }
                None => {
                    writeln!(out, "{}", head)?;
                    for m in &members {
                        writeln!(out, "{}", m)?;
                    }
                    count += 1 + members.len();
                }
            }
        }

        out.flush()?;
        drop(out);
        self.files.rename(tmp_base, rel_base)?;
        Ok(count)
    }

    /// Open a relation stream as a buffered reader.
    pub fn reader(&self, base: &str) -> Result<BufReader<File>, SimpqsError> {
        Ok(BufReader::new(self.files.open(base)?))
    }

    /// Combine the q-groups in the combination stream into synthesised full
    /// relations: each member pairs with its group head as
    /// X = Y1 * Y2 * q^-1 (mod N), exponent vectors added pointwise.
    /// A non-invertible q either exposes a factor of N (returned) or has
    /// gcd(q, N) = N, in which case the group is dropped.
    pub fn combine_large_primes<R: BufRead, W: Write>(
        &self,
        comb: R,
        fnew: &mut W,
        n: &BigInt,
    ) -> Result<(usize, Option<BigInt>), SimpqsError> {
        let mut count = 0usize;
        let mut head: Option<(PartialRelation, BigInt)> = None;

        for line in comb.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let entry = PartialRelation::parse(&line)?;

            let start_group = match &head {
                Some((h, _)) => h.q != entry.q,
                None => true,
            };
            if start_group {
                let q_big = BigInt::from(entry.q);
                match ModInverse::invert_bigint(&q_big, n) {
                    Some(inv) => head = Some((entry, inv)),
                    None => {
                        let g = q_big.gcd(n);
                        if &g == n {
                            // useless group; the next line with this q gets
                            // retried as a fresh head candidate
                            head = None;
                        } else {
                            debug!("large prime {} shares a factor with N", entry.q);
                            return Ok((count, Some(g)));
                        }
                    }
                }
                continue;
            }

            let (h, inv_q) = head.as_ref().unwrap();
            let y1 = &h.relation.x;
            let y2 = &entry.relation.x;
            if y1.abs() == y2.abs() {
                continue;
            }

            let mut new_y = (y1 * y2).mod_floor(n);
            new_y = (new_y * inv_q).mod_floor(n);
            let flipped = n - &new_y;
            if flipped.abs() < new_y.abs() {
                new_y = flipped;
            }

            let mut exponents = vec![0u64; self.num_primes];
            for &(e, idx) in h.relation.pairs.iter().chain(entry.relation.pairs.iter()) {
                exponents[idx as usize] += e as u64;
            }

            let mut out_line = format!("{} :", new_y);
            for (idx, &e) in exponents.iter().enumerate() {
                if e > 0 {
                    out_line.push_str(&format!(" {} {}", e, idx));
                }
            }
            out_line.push_str(" 0");
            writeln!(fnew, "{}", out_line)?;
            count += 1;
        }

        Ok((count, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::Zero;
    use std::fs;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn scratch(tag: &str) -> (TempFiles, PathBuf) {
        let dir = std::env::temp_dir().join(format!("simpqs-lp-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        (TempFiles::in_dir(&dir), dir)
    }

    fn write_lines(files: &TempFiles, base: &str, lines: &[&str]) {
        let mut f = files.create(base).unwrap();
        for l in lines {
            writeln!(f, "{}", l).unwrap();
        }
    }

    fn read_lines(files: &TempFiles, base: &str) -> Vec<String> {
        BufReader::new(files.open(base).unwrap())
            .lines()
            .map(|l| l.unwrap())
            .collect()
    }

    #[test]
    fn test_sort_is_idempotent_and_dedups() {
        let (files, dir) = scratch("sort");
        let store = LpStore::new(&files, 10);
        write_lines(
            &files,
            "lpnew",
            &[
                "5009 @ 77 : 1 2 0",
                "1201 @ 55 : 1 1 0",
                "5009 @ 77 : 1 2 0",
                "1201 @ 99 : 2 3 0",
            ],
        );
        let count = store.sort_file("lpnew").unwrap();
        assert_eq!(count, 3);
        let first = read_lines(&files, "lpnew");
        let keys: Vec<i64> = first.iter().map(|l| line_key(l)).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        let count2 = store.sort_file("lpnew").unwrap();
        assert_eq!(count2, 3);
        assert_eq!(read_lines(&files, "lpnew"), first);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_sort_handles_oversized_keys() {
        let (files, dir) = scratch("bigkeys");
        let store = LpStore::new(&files, 10);
        write_lines(
            &files,
            "rels",
            &[
                "123456789012345678901234567890 : 1 2 0",
                "-123456789012345678901234567890 : 1 3 0",
                "42 : 1 1 0",
            ],
        );
        let count = store.sort_file("rels").unwrap();
        assert_eq!(count, 3);
        let lines = read_lines(&files, "rels");
        assert!(lines[0].starts_with('-'));
        assert!(lines[1].starts_with("42"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_merge_full_mode_counts_everything() {
        let (files, dir) = scratch("mergefull");
        let store = LpStore::new(&files, 10);
        write_lines(&files, "frels", &["11 : 1 1 0", "33 : 1 3 0"]);
        write_lines(&files, "rels", &["22 : 1 2 0", "33 : 1 3 0", "44 : 1 4 0"]);
        let total = store
            .merge_sorted::<std::io::Sink>("frels", "rels", "tmp2", None)
            .unwrap();
        // the duplicate "33" line is dropped
        assert_eq!(total, 4);
        let merged = read_lines(&files, "frels");
        assert_eq!(merged.len(), 4);
        let keys: Vec<i64> = merged.iter().map(|l| line_key(l)).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_merge_lp_mode_routes_groups() {
        let (files, dir) = scratch("mergelp");
        let store = LpStore::new(&files, 10);
        // lprels already holds q = 1201; lpnew brings another 1201 and a
        // pair of 7001s plus a singleton
        write_lines(&files, "lprels", &["1201 @ 55 : 1 1 0"]);
        write_lines(
            &files,
            "lpnew",
            &[
                "1201 @ 99 : 2 3 0",
                "3001 @ 11 : 1 2 0",
                "7001 @ 21 : 1 4 0",
                "7001 @ 31 : 1 5 0",
            ],
        );
        let mut comb: Vec<u8> = Vec::new();
        let combinable = store
            .merge_sorted("lprels", "lpnew", "tmp", Some(&mut comb))
            .unwrap();
        assert_eq!(combinable, 2);

        // merged stream keeps one line per q
        let merged = read_lines(&files, "lprels");
        let qs: Vec<i64> = merged.iter().map(|l| line_key(l)).collect();
        assert_eq!(qs, vec![1201, 3001, 7001]);

        // comb holds head + member for both groups
        let comb = String::from_utf8(comb).unwrap();
        let comb_lines: Vec<&str> = comb.lines().collect();
        assert_eq!(comb_lines.len(), 4);
        assert_eq!(line_key(comb_lines[0]), 1201);
        assert_eq!(line_key(comb_lines[1]), 1201);
        assert_eq!(line_key(comb_lines[2]), 7001);
        assert_eq!(line_key(comb_lines[3]), 7001);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_merge_preserves_totality() {
        // lines in = lines out, minus exact duplicates; members move to comb
        let (files, dir) = scratch("total");
        let store = LpStore::new(&files, 10);
        write_lines(
            &files,
            "lprels",
            &["100 @ 1 : 1 1 0", "300 @ 3 : 1 3 0", "500 @ 5 : 1 5 0"],
        );
        write_lines(
            &files,
            "lpnew",
            &["100 @ 2 : 1 2 0", "200 @ 2 : 1 2 0", "500 @ 5 : 1 5 0"],
        );
        let mut comb: Vec<u8> = Vec::new();
        store
            .merge_sorted("lprels", "lpnew", "tmp", Some(&mut comb))
            .unwrap();
        let merged = read_lines(&files, "lprels").len();
        let comb_total = String::from_utf8(comb).unwrap().lines().count();
        // 6 lines in: 4 survive in lprels, the 100-group member moved to comb
        // (its head is duplicated there), one exact duplicate dropped
        assert_eq!(merged, 4);
        assert_eq!(comb_total, 2);
        assert_eq!(merged + (comb_total - 1) + 1, 6);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_combine_large_primes() {
        let (files, dir) = scratch("combine");
        let n = BigInt::from_str("100000000000000000039").unwrap() * BigInt::from(3u32);
        let store = LpStore::new(&files, 8);

        // fabricate a q-group: q = 1048583, Y1 = 1234567, Y2 = 7654321
        let q: u64 = 1048583;
        let comb_text = format!(
            "{} @ 1234567 : 1 2 2 5 0\n{} @ 7654321 : 1 2 1 3 0\n",
            q, q
        );
        let mut fnew: Vec<u8> = Vec::new();
        let (count, factor) = store
            .combine_large_primes(BufReader::new(comb_text.as_bytes()), &mut fnew, &n)
            .unwrap();
        assert_eq!(count, 1);
        assert!(factor.is_none());

        let out = String::from_utf8(fnew).unwrap();
        let rel = crate::relation_sieve::relation::Relation::parse(out.trim()).unwrap();
        // exponents added pointwise: index 2 -> 2, index 3 -> 1, index 5 -> 2
        assert_eq!(rel.pairs, vec![(2, 2), (1, 3), (2, 5)]);

        // X = Y1 * Y2 * q^-1 (mod n), possibly folded to n - X
        let y1 = BigInt::from(1234567u64);
        let y2 = BigInt::from(7654321u64);
        let inv = ModInverse::invert_bigint(&BigInt::from(q), &n).unwrap();
        let expect = (&y1 * &y2 * inv).mod_floor(&n);
        let folded = &n - &expect;
        assert!(rel.x == expect || rel.x == folded);
        // and X^2 = (Y1 Y2)^2 / q^2 (mod n)
        let lhs = (&rel.x * &rel.x).mod_floor(&n);
        let rhs = (&y1 * &y1 * &y2 * &y2).mod_floor(&n);
        let q2inv = ModInverse::invert_bigint(&(BigInt::from(q) * BigInt::from(q)), &n).unwrap();
        assert_eq!(lhs, (rhs * q2inv).mod_floor(&n));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_combine_detects_factor() {
        let (files, dir) = scratch("combinefactor");
        // N divisible by q = 1009
        let p = BigInt::from_str("100000000000000000039").unwrap();
        let n = &p * BigInt::from(1009u32);
        let store = LpStore::new(&files, 8);
        let comb_text = "1009 @ 11 : 1 2 0\n1009 @ 13 : 1 3 0\n";
        let mut fnew: Vec<u8> = Vec::new();
        let (_, factor) = store
            .combine_large_primes(BufReader::new(comb_text.as_bytes()), &mut fnew, &n)
            .unwrap();
        let g = factor.expect("factor expected");
        assert_eq!(g, BigInt::from(1009u32));
        assert!(n.mod_floor(&g).is_zero());
        let _ = fs::remove_dir_all(dir);
    }
}
