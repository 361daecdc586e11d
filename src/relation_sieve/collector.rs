// src/relation_sieve/collector.rs
//
// Drives polynomial generation, sieving and evaluation until enough
// relations are banked on disk, flushing the fresh streams through the
// sort / merge / combine cycle at a growing cutoff.

use std::io::{BufWriter, Write};

use log::{debug, info};
use num::{BigInt, Integer, One};

use crate::core::error::SimpqsError;
use crate::core::sieve_context::SieveContext;
use crate::core::temp_files::TempFiles;
use crate::relation_sieve::evaluator::evaluate_sieve;
use crate::relation_sieve::lp_store::LpStore;
use crate::relation_sieve::poly::PolyGroup;
use crate::relation_sieve::sieve::Sieve;

pub enum CollectOutcome {
    /// Enough relations are in frels/flprels for the matrix step.
    Ready { fulls: usize, combined: usize },
    /// A factor fell out of the large prime combination early.
    EarlyFactor(BigInt),
}

pub fn collect_relations(
    ctx: &SieveContext,
    files: &TempFiles,
    seed: u64,
) -> Result<CollectOutcome, SimpqsError> {
    let store = LpStore::new(files, ctx.params.num_primes);
    let rel_sought = ctx.params.rel_sought;

    // seed the persistent streams so the first merge has something to read
    for base in ["lprels", "frels", "fnew", "flprels"] {
        files.create(base)?;
    }
    let mut lpnew = BufWriter::new(files.create("lpnew")?);
    let mut rels = BufWriter::new(files.create("rels")?);

    let mut group = PolyGroup::new(ctx, seed);
    let mut sieve = Sieve::new(ctx);

    let mut rels_found = 0usize;
    let mut combined = 0usize;
    let mut potential = 0usize;
    let mut partials = 0usize;
    let mut curves = 0usize;

    let mut next_cutoff = (rel_sought - 1) / 40 + 1;
    let mut next_inc = next_cutoff;

    while rels_found + combined < rel_sought {
        group.advance(ctx);
        curves += 1;
        if curves % 20 == 0 {
            debug!("{} polynomials sieved", curves);
        }

        sieve.run(ctx, &mut group);
        let counts = evaluate_sieve(ctx, &group, &mut sieve, &mut rels, &mut lpnew)?;
        potential += counts.fulls;
        partials += counts.partials;

        if 2 * potential >= next_cutoff {
            lpnew.flush()?;
            rels.flush()?;

            store.sort_file("lpnew")?;
            let mut comb = BufWriter::new(files.create("comb")?);
            store.merge_sorted("lprels", "lpnew", "tmp", Some(&mut comb))?;
            comb.flush()?;
            drop(comb);
            lpnew = BufWriter::new(files.create("lpnew")?);

            store.sort_file("rels")?;
            rels_found = store.merge_sorted::<std::io::Sink>("frels", "rels", "tmp2", None)?;
            rels = BufWriter::new(files.create("rels")?);

            let comb_reader = store.reader("comb")?;
            let mut fnew = BufWriter::new(files.create("fnew")?);
            let (_, factor) = store.combine_large_primes(comb_reader, &mut fnew, &ctx.kn)?;
            fnew.flush()?;
            drop(fnew);

            if let Some(g) = factor {
                // g divides kN; strip the multiplier's share
                let f = g.gcd(&ctx.n);
                if !f.is_one() && f != ctx.n {
                    info!("factor found during large prime combination");
                    return Ok(CollectOutcome::EarlyFactor(f));
                }
            }

            store.sort_file("fnew")?;
            combined = store.merge_sorted::<std::io::Sink>("flprels", "fnew", "tmp3", None)?;

            info!(
                "{} full relations, {} combined relations ({} partials so far, {} wanted)",
                rels_found, combined, partials, rel_sought
            );

            if next_cutoff < rel_sought && next_cutoff + next_inc / 2 >= rel_sought {
                next_inc /= 2;
            }
            next_cutoff += next_inc.max(1);
        }
    }

    info!(
        "sieving done: {} polynomials, {} fulls, {} combined",
        curves, rels_found, combined
    );
    Ok(CollectOutcome::Ready {
        fulls: rels_found,
        combined,
    })
}
