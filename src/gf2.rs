//! Sparse GF(2) linear algebra: vectors, matrices stored column-wise as
//! sets of row indices, and a null-space solver for the exponent-parity
//! matrices produced by sieve factorisation.

use std::collections::BTreeSet;

/// A GF(2) vector: its dimension and the set of indices holding a 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gf2Vector {
    dim: usize,
    support: BTreeSet<usize>,
}

impl Gf2Vector {
    /// Checked constructor: every support index must lie below `dim`.
    pub fn new(dim: usize, support: BTreeSet<usize>) -> Option<Self> {
        if support.iter().any(|&i| i >= dim) {
            return None;
        }
        Some(Self { dim, support })
    }

    pub fn zero(dim: usize) -> Self {
        Self {
            dim,
            support: BTreeSet::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_zero(&self) -> bool {
        self.support.is_empty()
    }

    pub fn support(&self) -> &BTreeSet<usize> {
        &self.support
    }
}

/// XOR b into a (symmetric difference of supports).
fn sym_diff(a: &mut BTreeSet<usize>, b: &BTreeSet<usize>) {
    for &i in b {
        if !a.remove(&i) {
            a.insert(i);
        }
    }
}

/// A sparse matrix over GF(2): a fixed-length vector of columns, each the
/// set of row indices where the bit is 1. The row dimension is carried
/// alongside so that only matching vector/matrix pairs multiply.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    rows: usize,
    cols: Vec<BTreeSet<usize>>,
}

impl SparseMatrix {
    /// Checked constructor: every row index in every column must lie
    /// below `rows`.
    pub fn from_columns(rows: usize, cols: Vec<BTreeSet<usize>>) -> Option<Self> {
        if cols.iter().any(|c| c.iter().any(|&r| r >= rows)) {
            return None;
        }
        Some(Self { rows, cols })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    /// Matrix-vector product. The vector indexes columns, the result
    /// indexes rows; None if the dimensions do not pair up.
    pub fn mul(&self, v: &Gf2Vector) -> Option<Gf2Vector> {
        if v.dim() != self.cols.len() {
            return None;
        }
        let mut out = BTreeSet::new();
        for &j in v.support() {
            sym_diff(&mut out, &self.cols[j]);
        }
        Some(Gf2Vector {
            dim: self.rows,
            support: out,
        })
    }

    /// A basis of the right kernel: vectors v with Mv = 0, each expressed
    /// as a set of column indices.
    ///
    /// Columns are eliminated left to right; each column that reduces to
    /// zero yields the combination of original columns that produced it.
    /// When the column count exceeds the number of distinct rows carrying
    /// odd weight, the basis is guaranteed nonempty.
    pub fn null_space(&self) -> Vec<Gf2Vector> {
        let n = self.cols.len();
        let mut work: Vec<BTreeSet<usize>> = self.cols.clone();
        // combo[j] tracks which original columns were XORed into column j
        let mut combo: Vec<BTreeSet<usize>> = (0..n).map(|j| BTreeSet::from([j])).collect();
        let mut pivot_of_row: Vec<Option<usize>> = vec![None; self.rows];

        let mut basis = Vec::new();
        for j in 0..n {
            loop {
                let Some(&r) = work[j].iter().next() else {
                    // Column vanished: combo[j] is a kernel vector.
                    let v = Gf2Vector::new(n, combo[j].clone())
                        .expect("combination indexes original columns");
                    basis.push(v);
                    break;
                };
                match pivot_of_row[r] {
                    Some(pivot) => {
                        let (pw, pc) = (work[pivot].clone(), combo[pivot].clone());
                        sym_diff(&mut work[j], &pw);
                        sym_diff(&mut combo[j], &pc);
                    }
                    None => {
                        pivot_of_row[r] = Some(j);
                        break;
                    }
                }
            }
        }
        basis
    }

    /// One nonzero kernel vector, selected deterministically by `seed`,
    /// or None when the kernel is trivial.
    pub fn null_vector(&self, seed: u64) -> Option<Gf2Vector> {
        let basis = self.null_space();
        if basis.is_empty() {
            return None;
        }
        let pick = (seed % basis.len() as u64) as usize;
        Some(basis[pick].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(rows: usize, cols: &[&[usize]]) -> SparseMatrix {
        let cols = cols
            .iter()
            .map(|c| c.iter().copied().collect::<BTreeSet<_>>())
            .collect();
        SparseMatrix::from_columns(rows, cols).expect("valid test matrix")
    }

    #[test]
    fn test_constructor_rejects_bad_rows() {
        let cols = vec![BTreeSet::from([3usize])];
        assert!(SparseMatrix::from_columns(3, cols).is_none());
    }

    #[test]
    fn test_mul_dimension_pairing() {
        let m = mat(2, &[&[0], &[1]]);
        let v = Gf2Vector::new(3, BTreeSet::from([0])).unwrap();
        assert!(m.mul(&v).is_none(), "mismatched dims must not multiply");
    }

    #[test]
    fn test_duplicate_columns_dependency() {
        let m = mat(3, &[&[0, 2], &[0, 2], &[1]]);
        let basis = m.null_space();
        assert_eq!(basis.len(), 1);
        assert_eq!(
            basis[0].support().iter().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );
        let prod = m.mul(&basis[0]).unwrap();
        assert!(prod.is_zero());
    }

    #[test]
    fn test_three_way_dependency() {
        // col0 ^ col1 = col2
        let m = mat(3, &[&[0, 1], &[1, 2], &[0, 2]]);
        let basis = m.null_space();
        assert_eq!(basis.len(), 1);
        assert_eq!(basis[0].support().len(), 3);
        assert!(m.mul(&basis[0]).unwrap().is_zero());
    }

    #[test]
    fn test_independent_columns_have_no_kernel() {
        let m = mat(3, &[&[0], &[1], &[2]]);
        assert!(m.null_space().is_empty());
        assert!(m.null_vector(7).is_none());
    }

    #[test]
    fn test_overdetermined_kernel_dimension() {
        // 5 columns over 3 rows: kernel dimension at least 2
        let m = mat(3, &[&[0, 2], &[1, 2], &[0, 1], &[0], &[1]]);
        let basis = m.null_space();
        assert!(basis.len() >= 2, "5 cols over 3 rows, got {}", basis.len());
        for v in &basis {
            assert!(!v.is_zero());
            assert!(m.mul(v).unwrap().is_zero());
        }
    }

    #[test]
    fn test_zero_column_is_kernel_vector() {
        let m = mat(2, &[&[0], &[], &[1]]);
        let basis = m.null_space();
        assert_eq!(basis.len(), 1);
        assert_eq!(
            basis[0].support().iter().copied().collect::<Vec<_>>(),
            vec![1]
        );
    }

    #[test]
    fn test_null_vector_deterministic() {
        let m = mat(3, &[&[0, 2], &[1, 2], &[0, 1], &[0], &[1]]);
        let a = m.null_vector(5).unwrap();
        let b = m.null_vector(5).unwrap();
        assert_eq!(a, b);
    }
}
