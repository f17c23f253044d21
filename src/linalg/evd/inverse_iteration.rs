//! Eigenvectors of a symmetric tridiagonal matrix by inverse iteration.

use super::Stevx2Params;
use crate::{Mat, RealField};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// `LU` factorization with partial pivoting of the shifted tridiagonal matrix `T - shift I`.
///
/// `U` has two super-diagonals. Row interchanges are recorded in `pivoted`: `pivoted[i]` is true
/// when rows `i` and `i + 1` were swapped.
#[derive(Clone, Debug)]
pub struct TridiagonalLu<T> {
    pub diag: Vec<T>,
    pub lower: Vec<T>,
    pub upper: Vec<T>,
    pub upper2: Vec<T>,
    pub pivoted: Vec<bool>,
}

impl<T: RealField> TridiagonalLu<T> {
    /// Factors `T - shift I`. Pivots with a magnitude smaller than `tol` are replaced by `±tol`.
    pub fn new(diag: &[T], offd: &[T], shift: T, tol: T) -> Self {
        let n = diag.len();
        let mut d: Vec<T> = diag.iter().map(|&x| x.tsl_sub(shift)).collect();
        let mut dl = offd.to_vec();
        let mut du = offd.to_vec();
        let mut du2 = vec![T::tsl_zero(); n.saturating_sub(2)];
        let mut pivoted = vec![false; n.saturating_sub(1)];

        for i in 0..n.saturating_sub(1) {
            if d[i].tsl_abs() >= dl[i].tsl_abs() {
                if d[i] != T::tsl_zero() {
                    let fact = dl[i].tsl_div(d[i]);
                    dl[i] = fact;
                    d[i + 1] = d[i + 1].tsl_sub(fact.tsl_mul(du[i]));
                }
            } else {
                let fact = d[i].tsl_div(dl[i]);
                d[i] = dl[i];
                dl[i] = fact;
                let temp = du[i];
                du[i] = d[i + 1];
                d[i + 1] = temp.tsl_sub(fact.tsl_mul(d[i + 1]));
                if i + 2 < n {
                    du2[i] = du[i + 1];
                    du[i + 1] = fact.tsl_neg().tsl_mul(du[i + 1]);
                }
                pivoted[i] = true;
            }
        }

        for d in &mut d {
            if d.tsl_abs() < tol {
                *d = if *d >= T::tsl_zero() { tol } else { tol.tsl_neg() };
            }
        }

        Self {
            diag: d,
            lower: dl,
            upper: du,
            upper2: du2,
            pivoted,
        }
    }

    /// Solves `(T - shift I) x = rhs` in place.
    pub fn solve_in_place(&self, rhs: &mut [T]) {
        let n = self.diag.len();
        if n == 0 {
            return;
        }
        let b = rhs;

        for i in 0..n - 1 {
            if !self.pivoted[i] {
                b[i + 1] = b[i + 1].tsl_sub(self.lower[i].tsl_mul(b[i]));
            } else {
                let temp = b[i];
                b[i] = b[i + 1];
                b[i + 1] = temp.tsl_sub(self.lower[i].tsl_mul(b[i]));
            }
        }

        b[n - 1] = b[n - 1].tsl_div(self.diag[n - 1]);
        if n > 1 {
            b[n - 2] = b[n - 2]
                .tsl_sub(self.upper[n - 2].tsl_mul(b[n - 1]))
                .tsl_div(self.diag[n - 2]);
        }
        for i in (0..n.saturating_sub(2)).rev() {
            b[i] = b[i]
                .tsl_sub(self.upper[i].tsl_mul(b[i + 1]))
                .tsl_sub(self.upper2[i].tsl_mul(b[i + 2]))
                .tsl_div(self.diag[i]);
        }
    }
}

fn normalize<T: RealField>(x: &mut [T]) {
    let norm = crate::linalg::blas::norm_l2(crate::MatRef::from_column_major_slice(x, x.len(), 1));
    if norm == T::tsl_zero() {
        return;
    }
    let inv = norm.tsl_inv();
    for x in x {
        *x = x.tsl_mul(inv);
    }
}

/// Returns the 1-norm of the tridiagonal matrix.
pub fn one_norm<T: RealField>(diag: &[T], offd: &[T]) -> T {
    let n = diag.len();
    let mut norm = T::tsl_zero();
    for i in 0..n {
        let mut sum = diag[i].tsl_abs();
        if i > 0 {
            sum = sum.tsl_add(offd[i - 1].tsl_abs());
        }
        if i + 1 < n {
            sum = sum.tsl_add(offd[i].tsl_abs());
        }
        norm = norm.tsl_max(sum);
    }
    norm
}

/// Computes one unit eigenvector for each of the ascending, distinct eigenvalues `values`.
///
/// Vectors of eigenvalues in the same cluster are orthogonalized against each other with
/// modified Gram-Schmidt after every solve.
pub fn eigenvectors<T: RealField>(
    diag: &[T],
    offd: &[T],
    values: &[T],
    params: Stevx2Params,
) -> Mat<T> {
    let n = diag.len();
    let k = values.len();
    let mut vectors = Mat::<T>::zeros(n, k);
    if n == 0 || k == 0 {
        return vectors;
    }

    let onenrm = one_norm(diag, offd);
    let ortol = T::tsl_from_f64(params.cluster_tolerance).tsl_mul(onenrm);
    let tol = T::tsl_epsilon().tsl_mul(onenrm);

    let mut cluster_start = 0;
    let mut b = vec![T::tsl_zero(); n];
    for j in 0..k {
        let lambda = values[j];
        if j > 0 && lambda.tsl_sub(values[j - 1]) >= ortol {
            cluster_start = j;
        }

        let lu = TridiagonalLu::new(diag, offd, lambda, tol);

        let mut rng = StdRng::seed_from_u64(j as u64);
        for x in b.iter_mut() {
            *x = T::tsl_from_f64(rng.gen_range(-1.0..1.0));
        }

        for _ in 0..params.inverse_iterations {
            normalize(&mut b);
            lu.solve_in_place(&mut b);

            let prev = vectors.as_ref();
            for p in cluster_start..j {
                let q = prev.col(p);
                let mut dot = T::tsl_zero();
                for i in 0..n {
                    dot = dot.tsl_add(b[i].tsl_mul(q.read(i, 0)));
                }
                for i in 0..n {
                    b[i] = b[i].tsl_sub(dot.tsl_mul(q.read(i, 0)));
                }
            }
        }
        normalize(&mut b);

        let mut col = vectors.as_mut().col_mut(j);
        for i in 0..n {
            col.write(i, 0, b[i]);
        }
    }

    vectors
}
