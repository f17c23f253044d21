//! Selected eigenvalues and eigenvectors of a real symmetric tridiagonal matrix.
//!
//! The matrix is given by its diagonal `diag` of length $n$ and its off-diagonal `offd` of length
//! $n - 1$. Eigenvalues are selected either by a half-open interval of values $(v_l, v_u]$, or
//! by a range of indices $[i_l, i_u]$ (1-relative, in ascending order).
//!
//! Each selected eigenvalue is computed independently by bisection on the Sturm sequence count,
//! until its bracket is made of two adjacent floating point numbers. Eigenvalues that are equal
//! to working precision are reported once, together with their multiplicity. One unit
//! eigenvector is then computed for each distinct eigenvalue by inverse iteration.

use crate::{Mat, Parallelism, RealField, TileError};

pub mod bisection;
pub mod inverse_iteration;

/// What [`stevx2`] should compute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Job {
    /// Only the number of eigenvalues in the range.
    Count,
    /// The distinct eigenvalues in the range, with their multiplicities.
    Values,
    /// The distinct eigenvalues with their multiplicities, and one eigenvector for each of them.
    Vectors,
}

/// Selection of the eigenvalues.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Range<T> {
    /// Eigenvalues in the half-open interval `(vl, vu]`.
    Value { vl: T, vu: T },
    /// Eigenvalues with 1-relative indices in `il..=iu`, in ascending order.
    Index { il: usize, iu: usize },
}

/// Tridiagonal eigensolver tuning parameters.
#[derive(Copy, Clone, Debug)]
pub struct Stevx2Params {
    /// Number of inverse iteration steps per eigenvector.
    pub inverse_iterations: usize,
    /// Two consecutive eigenvalues closer than `cluster_tolerance * |T|_1` belong to the same
    /// cluster, and their eigenvectors are explicitly orthogonalized.
    pub cluster_tolerance: f64,
}

impl Default for Stevx2Params {
    #[inline]
    fn default() -> Self {
        Self {
            inverse_iterations: 3,
            cluster_tolerance: 1e-3,
        }
    }
}

/// Output of [`stevx2`].
#[derive(Clone, Debug)]
pub struct Stevx2<T: RealField> {
    /// Number of eigenvalues in the range, counting multiplicities.
    pub count: usize,
    /// Distinct eigenvalues, in ascending order. Empty for [`Job::Count`].
    pub values: Vec<T>,
    /// Multiplicity of each distinct eigenvalue.
    pub multiplicities: Vec<usize>,
    /// `n×values.len()` matrix whose columns are unit eigenvectors. Only computed for
    /// [`Job::Vectors`].
    pub vectors: Option<Mat<T>>,
}

fn check_input<T: RealField>(diag: &[T], offd: &[T], range: Range<T>) -> Result<(), TileError> {
    let n = diag.len();
    if offd.len() + 1 < n {
        return Err(TileError::InvalidArgument { arg: "offd" });
    }
    match range {
        Range::Value { vl, vu } => {
            if !(vl < vu) {
                return Err(TileError::InvalidArgument { arg: "vu" });
            }
        }
        Range::Index { il, iu } => {
            if il == 0 || il > iu + 1 || iu > n {
                return Err(TileError::InvalidArgument { arg: "il" });
            }
        }
    }
    Ok(())
}

/// Returns the number of eigenvalues of the tridiagonal matrix that lie in `range`, counting
/// multiplicities.
pub fn stevx2_count<T: RealField>(
    range: Range<T>,
    diag: &[T],
    offd: &[T],
) -> Result<usize, TileError> {
    check_input(diag, offd, range)?;
    let n = diag.len();
    if n == 0 {
        return Ok(0);
    }
    let offd = &offd[..n - 1];
    let (lo, hi) = bisection::index_range(range, diag, offd);
    Ok(hi - lo)
}

/// Computes the eigenvalues of the tridiagonal matrix that lie in `range` and, depending on
/// `job`, the corresponding eigenvectors.
///
/// Bisection of independent eigenvalues runs under `parallelism`.
pub fn stevx2<T: RealField>(
    job: Job,
    range: Range<T>,
    diag: &[T],
    offd: &[T],
    parallelism: Parallelism,
    params: Stevx2Params,
) -> Result<Stevx2<T>, TileError> {
    check_input(diag, offd, range)?;
    let n = diag.len();
    if n == 0 {
        return Ok(Stevx2 {
            count: 0,
            values: Vec::new(),
            multiplicities: Vec::new(),
            vectors: (job == Job::Vectors).then(|| Mat::from_fn(0, 0, |_, _| T::tsl_zero())),
        });
    }
    let offd = &offd[..n - 1];

    let (lo, hi) = bisection::index_range(range, diag, offd);
    let count = hi - lo;
    if job == Job::Count {
        return Ok(Stevx2 {
            count,
            values: Vec::new(),
            multiplicities: Vec::new(),
            vectors: None,
        });
    }

    let all = bisection::eigenvalues(range, diag, offd, lo, hi, parallelism);

    let mut values = Vec::<T>::new();
    let mut multiplicities = Vec::<usize>::new();
    for value in all {
        match values.last() {
            Some(&last) if last == value => {
                if let Some(mult) = multiplicities.last_mut() {
                    *mult += 1;
                }
            }
            _ => {
                values.push(value);
                multiplicities.push(1);
            }
        }
    }
    log::debug!(
        target: "tessel",
        "stevx2: {count} eigenvalues, {} distinct, in index range {lo}..{hi}",
        values.len(),
    );

    let vectors = if job == Job::Vectors {
        Some(inverse_iteration::eigenvectors(diag, offd, &values, params))
    } else {
        None
    };

    Ok(Stevx2 {
        count,
        values,
        multiplicities,
        vectors,
    })
}
