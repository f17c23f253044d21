//! Validation of [`stevx2`](crate::linalg::evd::stevx2) on the Kahan tridiagonal matrix.
//!
//! The Kahan matrix of order $n$ has a diagonal alternating between $x$ and $-x$, and all its
//! off-diagonal elements equal to one. Its eigenvalues are known in closed form:
//! $\pm\sqrt{x^2 + 4\cos^2(\pi k / (n + 1))}$ for $k = 1, \dots, n/2$, and zero when $n$ is odd.
//! For small $x$ they cluster tightly near $\pm 2$, which makes the matrix a demanding test for
//! bisection and inverse iteration.

use crate::{
    linalg::{
        blas,
        evd::{stevx2, stevx2_count, Job, Range, Stevx2Params},
    },
    utils::bit_length,
    MatRef, Parallelism, RealField, TileError,
};
use std::time::{Duration, Instant};

/// Kahan tridiagonal matrix together with its exact spectrum.
#[derive(Clone, Debug)]
pub struct Kahan<T> {
    pub diag: Vec<T>,
    pub offd: Vec<T>,
    /// Exact eigenvalues, in ascending order.
    pub eigenvalues: Vec<T>,
}

/// Builds the Kahan matrix of order `n` with diagonal magnitude `x`.
pub fn kahan_matrix<T: RealField>(n: usize, x: T) -> Kahan<T> {
    let diag = (0..n)
        .map(|i| if i % 2 == 0 { x } else { x.tsl_neg() })
        .collect();
    let offd = vec![T::tsl_one(); n.saturating_sub(1)];

    let mut eigenvalues = vec![T::tsl_zero(); n];
    let x2 = x.tsl_mul(x);
    let four = T::tsl_from_usize(4);
    let step = T::tsl_pi().tsl_div(T::tsl_from_usize(n + 1));
    for k in 1..=n / 2 {
        let c = T::tsl_from_usize(k).tsl_mul(step).tsl_cos();
        let ev = x2.tsl_add(four.tsl_mul(c).tsl_mul(c)).tsl_sqrt();
        eigenvalues[k - 1] = ev.tsl_neg();
        eigenvalues[n - k] = ev;
    }

    Kahan {
        diag,
        offd,
        eigenvalues,
    }
}

/// Parameters of [`run_stevx2`].
#[derive(Copy, Clone, Debug)]
pub struct StevxParams<T> {
    /// Order of the matrix.
    pub m: usize,
    /// Magnitude of the diagonal.
    pub x: T,
    /// The eigenvalues in `(vl, vu]` are computed.
    pub vl: T,
    pub vu: T,
    pub parallelism: Parallelism,
    pub solver: Stevx2Params,
}

impl<T: RealField> Default for StevxParams<T> {
    fn default() -> Self {
        Self {
            m: 1000,
            x: T::tsl_from_f64(1e-5),
            vl: T::tsl_from_f64(1.5),
            vu: T::tsl_from_f64(2.01),
            parallelism: Parallelism::None,
            solver: Stevx2Params::default(),
        }
    }
}

/// Result of [`run_stevx2`].
#[derive(Copy, Clone, Debug)]
pub struct StevxOutcome<T> {
    /// Number of eigenvalues in the requested range.
    pub count: usize,
    /// Wall time spent in the eigensolver.
    pub time: Duration,
    /// Absolute error of the worst eigenvalue if the eigenvalue check failed, otherwise the worst
    /// eigenvector error.
    pub error: T,
    pub success: bool,
}

// y = A x, for the symmetric tridiagonal A
fn tridiag_mul<T: RealField>(diag: &[T], offd: &[T], x: MatRef<'_, T>) -> Vec<T> {
    let n = diag.len();
    (0..n)
        .map(|i| {
            let mut acc = diag[i].tsl_mul(x.read(i, 0));
            if i > 0 {
                acc = acc.tsl_add(offd[i - 1].tsl_mul(x.read(i - 1, 0)));
            }
            if i + 1 < n {
                acc = acc.tsl_add(offd[i].tsl_mul(x.read(i + 1, 0)));
            }
            acc
        })
        .collect()
}

/// Returns `| ‖A v / λ‖₂ − ‖v‖₂ |`.
pub fn eigenvector_error<T: RealField>(diag: &[T], offd: &[T], v: MatRef<'_, T>, lambda: T) -> T {
    let av = tridiag_mul(diag, offd, v);
    let av = MatRef::from_column_major_slice(&av, av.len(), 1);
    let lhs = blas::norm_l2(av).tsl_div(lambda.tsl_abs());
    lhs.tsl_sub(blas::norm_l2(v)).tsl_abs()
}

/// Computes the eigenvalues in `(vl, vu]` of the Kahan matrix described by `params`, with their
/// eigenvectors, and checks them against the exact spectrum.
///
/// The eigenvalue check passes when every computed eigenvalue is within three units in the last
/// place of the exact one. Only then are the eigenvectors checked, which passes when
/// [`eigenvector_error`] stays below `2·bit_length(m)·ε` for all of them.
///
/// Failing checks are reported through [`StevxOutcome::success`]. Errors are returned only for
/// invalid parameters, including a range that contains no eigenvalue.
pub fn run_stevx2<T: RealField>(params: &StevxParams<T>) -> Result<StevxOutcome<T>, TileError> {
    let m = params.m;
    let Kahan {
        diag,
        offd,
        eigenvalues,
    } = kahan_matrix(m, params.x);
    let range = Range::Value {
        vl: params.vl,
        vu: params.vu,
    };

    let count = stevx2_count(range, &diag, &offd)?;
    if count == 0 {
        log::error!(
            target: "tessel",
            "run_stevx2: no eigenvalue in ({:e}, {:e}]",
            params.vl.tsl_to_f64(),
            params.vu.tsl_to_f64(),
        );
        return Err(TileError::InvalidArgument { arg: "vu" });
    }

    let start = Instant::now();
    let result = stevx2(
        Job::Vectors,
        range,
        &diag,
        &offd,
        params.parallelism,
        params.solver,
    )?;
    let time = start.elapsed();
    log::info!(
        target: "tessel",
        "run_stevx2: m = {m}, {count} eigenvalues ({} distinct) in {time:?}",
        result.values.len(),
    );

    // exact eigenvalues are consumed in order, once per unit of multiplicity
    let first = eigenvalues.partition_point(|&ev| ev <= params.vl);
    let mut exact = eigenvalues[first..].iter();
    let mut worst = T::tsl_zero();
    let mut worst_ulp = T::tsl_zero();
    'outer: for (&value, &mult) in result.values.iter().zip(&result.multiplicities) {
        for _ in 0..mult {
            let Some(&ev) = exact.next() else {
                break 'outer;
            };
            let ulp = ev.tsl_ulp();
            let err = value.tsl_sub(ev).tsl_abs().tsl_div(ulp);
            if err > worst {
                worst = err;
                worst_ulp = ulp;
            }
        }
    }
    let max_mult = result.multiplicities.iter().copied().max().unwrap_or(0);
    log::debug!(
        target: "tessel",
        "run_stevx2: worst eigenvalue error {:.3} ulp, largest multiplicity {max_mult}",
        worst.tsl_to_f64(),
    );

    if !(worst < T::tsl_from_usize(3)) {
        return Ok(StevxOutcome {
            count,
            time,
            error: worst.tsl_mul(worst_ulp),
            success: false,
        });
    }

    let mut worst_vec = T::tsl_zero();
    if let Some(vectors) = &result.vectors {
        for (j, &value) in result.values.iter().enumerate() {
            let err = eigenvector_error(&diag, &offd, vectors.as_ref().col(j), value);
            worst_vec = worst_vec.tsl_max(err);
        }
    }
    let eps = T::tsl_epsilon();
    let bound = T::tsl_from_usize(2 * bit_length(m)).tsl_mul(eps);
    log::debug!(
        target: "tessel",
        "run_stevx2: worst eigenvector error {:.3} eps, bound {} eps",
        worst_vec.tsl_div(eps).tsl_to_f64(),
        2 * bit_length(m),
    );

    Ok(StevxOutcome {
        count,
        time,
        error: worst_vec,
        success: worst_vec <= bound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kahan_spectrum_order_8() {
        let kahan = kahan_matrix(8, 1e-5f64);
        let reference = [
            1.8793852415984214,
            1.5320888862705913,
            1.0000000000500002,
            0.3472963554778301,
        ];

        let ev = &kahan.eigenvalues;
        for i in 0..8 {
            assert!(ev[i] == -ev[7 - i]);
            assert!(-2.0 < ev[i] && ev[i] < 2.0);
        }
        for (k, &r) in reference.iter().enumerate() {
            assert!((ev[k] + r).abs() <= 1e-12 * r);
            assert!((ev[7 - k] - r).abs() <= 1e-12 * r);
        }
        assert!(kahan.diag == [1e-5, -1e-5, 1e-5, -1e-5, 1e-5, -1e-5, 1e-5, -1e-5]);
        assert!(kahan.offd == [1.0; 7]);
    }

    #[test]
    fn odd_order_has_zero_eigenvalue() {
        let kahan = kahan_matrix(7, 1e-3f64);
        assert!(kahan.eigenvalues[3] == 0.0);
        assert!(kahan.eigenvalues.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn small_problem_passes() {
        let params = StevxParams {
            m: 100,
            ..StevxParams::<f64>::default()
        };
        let outcome = run_stevx2(&params).unwrap();
        assert!(outcome.count >= 1);
        assert!(outcome.success);
        assert!(outcome.error <= 14.0 * f64::EPSILON);
    }

    #[test]
    fn empty_range_is_rejected() {
        let params = StevxParams {
            m: 50,
            vl: 3.0,
            vu: 4.0,
            ..StevxParams::<f64>::default()
        };
        assert!(run_stevx2(&params).unwrap_err() == TileError::InvalidArgument { arg: "vu" });
    }
}
