//! Tile kernels.
//!
//! Each kernel operates on one or two tiles given as slices with a leading dimension, validates
//! its arguments before touching any of them, and returns [`TileError::InvalidArgument`] naming
//! the first offending argument. Kernels that need workspace take a [`PodStack`] whose size is
//! given by the matching `*_req` function.
//!
//! The `*_in_place` variants operate on matrix views and assume valid shapes.
//!
//! [`PodStack`]: dyn_stack::PodStack

use crate::{mat::column_major_span, TileError};

pub mod gelqt;
pub mod lacpy_band;
pub mod task;
pub mod tslqt;
pub mod tsmlq;
pub mod unmlq;

pub use gelqt::{gelqt, gelqt_req};
pub use lacpy_band::{lacpy_band_to_tile, lacpy_tile_to_band};
pub use tslqt::{tslqt, tslqt_req};
pub use tsmlq::{tsmlq, tsmlq_req};
pub use unmlq::{unmlq, unmlq_req};

#[inline]
pub(crate) fn check_ld(ld: usize, nrows: usize, arg: &'static str) -> Result<(), TileError> {
    if ld < Ord::max(1, nrows) {
        Err(TileError::InvalidArgument { arg })
    } else {
        Ok(())
    }
}

#[inline]
pub(crate) fn check_len(
    len: usize,
    nrows: usize,
    ncols: usize,
    ld: usize,
    arg: &'static str,
) -> Result<(), TileError> {
    if column_major_span(nrows, ncols, ld) > len {
        Err(TileError::InvalidArgument { arg })
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::{c64, linalg::blas::matmul, ComplexField, Conj, Mat, MatRef};
    use rand::prelude::*;
    use std::cell::RefCell;

    thread_local! {
        static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
    }

    pub trait Random: ComplexField {
        fn random() -> Self;
    }

    impl Random for f64 {
        fn random() -> Self {
            RNG.with(|rng| rng.borrow_mut().gen())
        }
    }

    impl Random for f32 {
        fn random() -> Self {
            RNG.with(|rng| rng.borrow_mut().gen())
        }
    }

    impl Random for c64 {
        fn random() -> Self {
            RNG.with(|rng| {
                let mut rng = rng.borrow_mut();
                c64::new(rng.gen(), rng.gen())
            })
        }
    }

    pub fn random_mat<E: Random>(nrows: usize, ncols: usize) -> Mat<E> {
        Mat::from_fn(nrows, ncols, |_, _| E::random())
    }

    pub fn max_abs_diff<E: ComplexField>(a: MatRef<'_, E>, b: MatRef<'_, E>) -> f64 {
        assert_eq!((a.nrows(), a.ncols()), (b.nrows(), b.ncols()));
        let mut max = 0.0f64;
        for j in 0..a.ncols() {
            for i in 0..a.nrows() {
                let d = a.read(i, j).tsl_sub(b.read(i, j)).tsl_abs();
                max = max.max(crate::RealField::tsl_to_f64(d));
            }
        }
        max
    }

    /// Returns `a * b`.
    pub fn mul<E: ComplexField>(a: MatRef<'_, E>, b: MatRef<'_, E>) -> Mat<E> {
        let mut out = Mat::zeros(a.nrows(), b.ncols());
        matmul(out.as_mut(), a, Conj::No, b, Conj::No, None, E::tsl_one());
        out
    }

    /// Returns `a^H * b`.
    pub fn adjoint_mul<E: ComplexField>(a: MatRef<'_, E>, b: MatRef<'_, E>) -> Mat<E> {
        let mut out = Mat::zeros(a.ncols(), b.ncols());
        matmul(out.as_mut(), a.transpose(), Conj::Yes, b, Conj::No, None, E::tsl_one());
        out
    }
}
