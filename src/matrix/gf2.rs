// src/matrix/gf2.rs
//
// Bit-packed GF(2) matrix with an identity block appended to each row, so
// that rows reduced to zero on the left carry their dependency combination
// on the right. Row operations work on raw 64-bit words.

use bitvec::prelude::*;

pub struct Gf2Matrix {
    rows: Vec<BitVec<u64, Lsb0>>,
    left_cols: usize,
}

impl Gf2Matrix {
    /// num_rows rows of left_cols value bits, each followed by an identity
    /// bit marking its own index.
    pub fn identity_augmented(num_rows: usize, left_cols: usize) -> Gf2Matrix {
        let total = left_cols + num_rows;
        let mut rows = Vec::with_capacity(num_rows);
        for i in 0..num_rows {
            let mut row = bitvec![u64, Lsb0; 0; total];
            row.set(left_cols + i, true);
            rows.push(row);
        }
        Gf2Matrix { rows, left_cols }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn set_left(&mut self, row: usize, col: usize, value: bool) {
        self.rows[row].set(col, value);
    }

    pub fn flip_left(&mut self, row: usize, col: usize) {
        let v = self.rows[row][col];
        self.rows[row].set(col, !v);
    }

    pub fn get_left(&self, row: usize, col: usize) -> bool {
        self.rows[row][col]
    }

    pub fn get_right(&self, row: usize, col: usize) -> bool {
        self.rows[row][self.left_cols + col]
    }

    fn xor_rows(&mut self, source: usize, dest: usize) {
        debug_assert_ne!(source, dest);
        let (src, dst) = if source < dest {
            let (a, b) = self.rows.split_at_mut(dest);
            (&a[source], &mut b[0])
        } else {
            let (a, b) = self.rows.split_at_mut(source);
            (&b[0], &mut a[dest])
        };
        let src_words = src.as_raw_slice();
        for (d, s) in dst.as_raw_mut_slice().iter_mut().zip(src_words.iter()) {
            *d ^= *s;
        }
    }

    /// Row-reduce the left block, processing columns from high to low like
    /// the classic augmented-Gauss kernel search. Returns the rank; rows
    /// from rank onwards are zero on the left and their right blocks are
    /// kernel combinations.
    pub fn gauss_reduce(&mut self) -> usize {
        let num_rows = self.rows.len();
        let mut row_upto = 0usize;
        for icol in (0..self.left_cols).rev() {
            let mut irow = row_upto;
            while irow < num_rows && !self.rows[irow][icol] {
                irow += 1;
            }
            if irow < num_rows {
                self.rows.swap(row_upto, irow);
                for check in row_upto + 1..num_rows {
                    if self.rows[check][icol] {
                        self.xor_rows(row_upto, check);
                    }
                }
                row_upto += 1;
            }
        }
        row_upto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_of_singular_system() {
        // rows: r0 = (1,1,0), r1 = (0,1,1), r2 = (1,0,1) = r0 + r1
        let mut m = Gf2Matrix::identity_augmented(3, 3);
        m.set_left(0, 0, true);
        m.set_left(0, 1, true);
        m.set_left(1, 1, true);
        m.set_left(1, 2, true);
        m.set_left(2, 0, true);
        m.set_left(2, 2, true);

        let rank = m.gauss_reduce();
        assert_eq!(rank, 2);

        // the single kernel row must combine all three original rows
        let deps: Vec<usize> = (0..3).filter(|&i| m.get_right(2, i)).collect();
        assert_eq!(deps, vec![0, 1, 2]);
        // and the left part of that row is zero
        for c in 0..3 {
            assert!(!m.get_left(2, c));
        }
    }

    #[test]
    fn test_full_rank_has_empty_kernel() {
        let mut m = Gf2Matrix::identity_augmented(2, 2);
        m.set_left(0, 0, true);
        m.set_left(1, 1, true);
        assert_eq!(m.gauss_reduce(), 2);
    }

    #[test]
    fn test_xor_rows_via_reduction() {
        // two identical rows: second reduces to zero, right block = {0,1}
        let mut m = Gf2Matrix::identity_augmented(2, 4);
        for c in [0, 2, 3] {
            m.set_left(0, c, true);
            m.set_left(1, c, true);
        }
        let rank = m.gauss_reduce();
        assert_eq!(rank, 1);
        assert!(m.get_right(1, 0));
        assert!(m.get_right(1, 1));
        for c in 0..4 {
            assert!(!m.get_left(1, c));
        }
    }
}
