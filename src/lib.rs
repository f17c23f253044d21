//! `tessel` implements tiled dense linear algebra kernels on top of a small set of BLAS/LAPACK
//! style primitives, and schedules them as tasks with declared data dependencies.
//!
//! A matrix is described by a [`desc::TileDesc`], which partitions it into `mb×nb` tiles and
//! knows how to address each of them, for dense as well as band storage. Tile kernels
//! ([`kernel`]) operate on one or two tiles at a time. Each kernel has a task wrapper
//! ([`kernel::task`]) that declares which memory ranges it reads and writes, so that the
//! [`sched::TaskGraph`] can run independent kernels concurrently while keeping conflicting
//! ones in submission order.
//!
//! Failures are tracked per logical operation through a [`sched::Sequence`]: once a task of a
//! sequence fails, the remaining tasks of that sequence are skipped.
//!
//! # Example
//! ```
//! use tessel::{compute, desc::{Layout, TileDesc}, Config, Uplo};
//!
//! // 6×6 matrix with one sub-diagonal and two super-diagonals, in LAPACK band storage starting
//! // at the diagonal of the first column.
//! let (n, kl, ku) = (6, 1, 2);
//! let ld = kl + ku + 1;
//! let band: Vec<f64> = (0..ld * n).map(|x| x as f64).collect();
//!
//! let src = TileDesc::band(Uplo::General, n, n, 2, 2, kl, ku, Layout::Lapack { ld }).unwrap();
//! let dst = TileDesc::band(Uplo::General, n, n, 2, 2, kl, ku, Layout::Tile).unwrap();
//! let mut tiles = vec![0.0; dst.required_len()];
//!
//! compute::pb2desc_sync(Config::default(), &band, src, &mut tiles, dst).unwrap();
//!
//! let mut back = band.clone();
//! compute::desc2pb_sync(Config::default(), &tiles, dst, &mut back, src).unwrap();
//! assert_eq!(back, band);
//! ```

#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

use equator::assert;

#[cfg(test)]
macro_rules! make_stack {
    ($req: expr) => {
        ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
    };
}

pub mod mat;
pub mod utils;

pub mod linalg;

pub mod desc;
pub mod kernel;
pub mod sched;

pub mod compute;
pub mod testing;

pub use dyn_stack;
pub use reborrow;

pub use mat::{Mat, MatMut, MatRef};
pub use tessel_entity::{c32, c64, ComplexField, RealField};

/// Shape of a matrix, or which triangular part of it is stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Uplo {
    /// Both triangular parts are stored.
    General,
    /// Only the upper triangular part is stored.
    Upper,
    /// Only the lower triangular part is stored.
    Lower,
}

/// Whether a matrix should be implicitly conjugated when read or not.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Conj {
    /// Do conjugate.
    Yes,
    /// Do not conjugate.
    No,
}

/// Parallelism strategy that can be passed to the task graph and to the eigensolver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// No parallelism.
    ///
    /// The code is executed sequentially on the same thread that calls a function
    /// and passes this argument.
    None,
    /// Rayon parallelism. Only avaialble with the `rayon` feature.
    ///
    /// The code is possibly executed in parallel on the current thread, as well as the currently
    /// active rayon thread pool.
    ///
    /// The contained value represents a hint about the number of threads an implementation should
    /// use, but there is no way to guarantee how many or which threads will be used.
    ///
    /// A value of `0` treated as equivalent to `rayon::current_num_threads()`.
    #[cfg(feature = "rayon")]
    Rayon(usize),
}

/// Whether drivers may pick their own inner blocking size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tuning {
    /// The inner blocking size is derived from the tile size.
    Enabled,
    /// The inner blocking size stored in [`Config::ib`] is used as is.
    Disabled,
}

/// Configuration scope for a tiled operation.
///
/// Passed explicitly to every driver entry point; there is no process-wide state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub parallelism: Parallelism,
    pub tuning: Tuning,
    /// Inner blocking size used when tuning is disabled.
    pub ib: usize,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            #[cfg(feature = "rayon")]
            parallelism: Parallelism::Rayon(0),
            #[cfg(not(feature = "rayon"))]
            parallelism: Parallelism::None,
            tuning: Tuning::Enabled,
            ib: 32,
        }
    }
}

impl Config {
    /// Sequential configuration with tuning disabled and the given inner blocking size.
    #[inline]
    pub fn sequential(ib: usize) -> Self {
        Self {
            parallelism: Parallelism::None,
            tuning: Tuning::Disabled,
            ib,
        }
    }

    /// Inner blocking size to use for tiles of size `nb`.
    #[inline]
    pub fn inner_blocksize(&self, nb: usize) -> usize {
        match self.tuning {
            Tuning::Enabled => recommended_inner_blocksize(nb),
            Tuning::Disabled => Ord::min(self.ib, nb),
        }
    }
}

/// Inner blocking size that works well for tiles of size `nb`.
#[inline]
pub fn recommended_inner_blocksize(nb: usize) -> usize {
    if nb <= 8 {
        nb
    } else {
        (nb / 4).clamp(8, 64)
    }
}

/// Errors reported by the tile kernels, the drivers and the scheduler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum TileError {
    /// A dimension, stride or buffer length is invalid.
    InvalidArgument { arg: &'static str },
    /// A tile index lies outside the tile grid, or outside the stored band.
    InvalidIndex { m: usize, n: usize },
    /// Scratch memory could not be obtained.
    OutOfMemory,
    /// A previous task of the same sequence failed.
    Sequence,
    /// A numerical check exceeded its acceptance bound.
    NumericThreshold,
}

impl core::fmt::Display for TileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            TileError::InvalidArgument { arg } => write!(f, "illegal value of {arg}"),
            TileError::InvalidIndex { m, n } => write!(f, "tile ({m}, {n}) is not addressable"),
            TileError::OutOfMemory => f.write_str("scratch allocation failed"),
            TileError::Sequence => f.write_str("sequence already failed"),
            TileError::NumericThreshold => f.write_str("error exceeds acceptance threshold"),
        }
    }
}

impl std::error::Error for TileError {}

/// Reports `err` on the diagnostic channel with the calling function and source location.
#[track_caller]
#[inline(never)]
pub(crate) fn report(func: &'static str, err: TileError) {
    let loc = core::panic::Location::caller();
    log::error!(target: "tessel", "{func}: {err} ({}:{})", loc.file(), loc.line());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;

    #[test]
    fn tuning_picks_inner_blocksize() {
        let tuned = Config::default();
        assert!(tuned.inner_blocksize(256) == 64);
        assert!(tuned.inner_blocksize(4) == 4);

        let fixed = Config::sequential(5);
        assert!(fixed.inner_blocksize(256) == 5);
        assert!(fixed.inner_blocksize(3) == 3);
    }

    #[test]
    fn error_messages() {
        let err = TileError::InvalidArgument { arg: "lda2" };
        assert!(err.to_string() == "illegal value of lda2");
        let err = TileError::InvalidIndex { m: 3, n: 1 };
        assert!(err.to_string() == "tile (3, 1) is not addressable");
    }
}
