//! Sturm sequence counts and bisection.

use super::Range;
use crate::{
    utils::thread::{for_each_raw, Ptr},
    Parallelism, RealField,
};

/// Smallest magnitude allowed for a pivot of the `LDL^T` factorization used by the Sturm count.
pub fn pivot_min<T: RealField>(offd: &[T]) -> T {
    let max_e2 = offd
        .iter()
        .fold(T::tsl_one(), |acc, &e| acc.tsl_max(e.tsl_abs2()));
    T::tsl_safe_min().tsl_mul(max_e2)
}

/// Returns the number of eigenvalues of the tridiagonal matrix that are less than or equal to
/// `x`.
///
/// `offd2` holds the squares of the off-diagonal elements.
pub fn sturm_count<T: RealField>(diag: &[T], offd2: &[T], x: T, pivmin: T) -> usize {
    let mut count = 0usize;
    let mut t = diag[0].tsl_sub(x);
    if t.tsl_abs() < pivmin {
        t = pivmin.tsl_neg();
    }
    if t <= T::tsl_zero() {
        count += 1;
    }
    for i in 1..diag.len() {
        t = diag[i].tsl_sub(offd2[i - 1].tsl_div(t)).tsl_sub(x);
        if t.tsl_abs() < pivmin {
            t = pivmin.tsl_neg();
        }
        if t <= T::tsl_zero() {
            count += 1;
        }
    }
    count
}

/// Gershgorin interval containing the whole spectrum, widened to absorb the rounding errors of
/// the Sturm count.
pub fn gershgorin_bounds<T: RealField>(diag: &[T], offd: &[T], pivmin: T) -> (T, T) {
    let n = diag.len();
    let mut lower = T::tsl_max_value();
    let mut upper = T::tsl_max_value().tsl_neg();
    for i in 0..n {
        let mut radius = T::tsl_zero();
        if i > 0 {
            radius = radius.tsl_add(offd[i - 1].tsl_abs());
        }
        if i + 1 < n {
            radius = radius.tsl_add(offd[i].tsl_abs());
        }
        lower = lower.tsl_min(diag[i].tsl_sub(radius));
        upper = upper.tsl_max(diag[i].tsl_add(radius));
    }

    let tnorm = lower.tsl_abs().tsl_max(upper.tsl_abs());
    let pad = T::tsl_from_f64(2.1)
        .tsl_mul(T::tsl_from_usize(n))
        .tsl_mul(T::tsl_epsilon())
        .tsl_mul(tnorm)
        .tsl_add(T::tsl_from_f64(4.2).tsl_mul(pivmin));
    (lower.tsl_sub(pad), upper.tsl_add(pad))
}

/// Returns the 0-based half-open range of eigenvalue indices selected by `range`.
pub fn index_range<T: RealField>(range: Range<T>, diag: &[T], offd: &[T]) -> (usize, usize) {
    match range {
        Range::Index { il, iu } => (il - 1, iu),
        Range::Value { vl, vu } => {
            let offd2: Vec<T> = offd.iter().map(|e| e.tsl_abs2()).collect();
            let pivmin = pivot_min(offd);
            (
                sturm_count(diag, &offd2, vl, pivmin),
                sturm_count(diag, &offd2, vu, pivmin),
            )
        }
    }
}

/// Computes the `j`-th eigenvalue (0-based) by bisection of the bracket `(lo, hi]`, which must
/// satisfy `count(lo) <= j < count(hi)`.
///
/// Stops once `lo` and `hi` are adjacent floating point numbers, and returns `hi`.
pub fn bisect<T: RealField>(diag: &[T], offd2: &[T], j: usize, lo: T, hi: T, pivmin: T) -> T {
    let half = T::tsl_from_f64(0.5);
    let mut lo = lo;
    let mut hi = hi;
    loop {
        let mid = lo.tsl_add(hi.tsl_sub(lo).tsl_mul(half));
        if !(lo < mid && mid < hi) {
            break;
        }
        if sturm_count(diag, offd2, mid, pivmin) > j {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi
}

/// Computes the eigenvalues with 0-based indices in `lo..hi`, in ascending order.
pub fn eigenvalues<T: RealField>(
    range: Range<T>,
    diag: &[T],
    offd: &[T],
    lo: usize,
    hi: usize,
    parallelism: Parallelism,
) -> Vec<T> {
    let count = hi - lo;
    if count == 0 {
        return Vec::new();
    }

    let offd2: Vec<T> = offd.iter().map(|e| e.tsl_abs2()).collect();
    let pivmin = pivot_min(offd);
    let (gl, gu) = gershgorin_bounds(diag, offd, pivmin);
    let (left, right) = match range {
        Range::Index { .. } => (gl, gu),
        Range::Value { vl, vu } => (vl, vu.tsl_min(gu)),
    };

    let mut values = vec![T::tsl_zero(); count];
    let out = Ptr(values.as_mut_ptr());
    for_each_raw(
        count,
        |idx| {
            let value = bisect(diag, &offd2, lo + idx, left, right, pivmin);
            let out = out;
            // SAFETY: every index is written by exactly one task, and `values` outlives them.
            unsafe { *out.0.add(idx) = value };
        },
        parallelism,
    );
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_of_diagonal_matrix() {
        let diag = [3.0f64, -1.0, 2.0, 0.5];
        let offd2 = [0.0f64; 3];
        let pivmin = pivot_min(&[0.0f64; 3]);
        assert_eq!(sturm_count(&diag, &offd2, -2.0, pivmin), 0);
        assert_eq!(sturm_count(&diag, &offd2, -1.0, pivmin), 1);
        assert_eq!(sturm_count(&diag, &offd2, 1.0, pivmin), 2);
        assert_eq!(sturm_count(&diag, &offd2, 10.0, pivmin), 4);
    }

    #[test]
    fn bisection_reaches_adjacent_floats() {
        // [[2, 1], [1, 2]] has eigenvalues 1 and 3
        let diag = [2.0f64, 2.0];
        let offd = [1.0f64];
        let pivmin = pivot_min(&offd);
        let (gl, gu) = gershgorin_bounds(&diag, &offd, pivmin);
        assert!(all_lt(gl, 1.0, 3.0, gu));

        let vals = eigenvalues(
            Range::Index { il: 1, iu: 2 },
            &diag,
            &offd,
            0,
            2,
            Parallelism::None,
        );
        assert!((vals[0] - 1.0).abs() <= 2.0 * f64::EPSILON);
        assert!((vals[1] - 3.0).abs() <= 4.0 * f64::EPSILON);
    }

    fn all_lt(a: f64, b: f64, c: f64, d: f64) -> bool {
        a < b && b < c && c < d
    }
}
