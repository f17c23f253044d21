//! Linear algebra building blocks used by the tile kernels.
//!
//! The [`blas`] module provides level 1, 2 and 3 operations, [`householder`] generates
//! elementary reflectors and applies block reflectors, and [`evd`] contains the symmetric
//! tridiagonal eigensolver.

use crate::{mat::MatMut, ComplexField};
use dyn_stack::{PodStack, SizeOverflow, StackReq};

pub mod blas;
pub mod evd;
pub mod householder;

/// Returns the stack requirements for creating a temporary matrix with the given dimensions.
#[inline]
pub fn temp_mat_req<E: ComplexField>(nrows: usize, ncols: usize) -> Result<StackReq, SizeOverflow> {
    let size = nrows.checked_mul(ncols).ok_or(SizeOverflow)?;
    StackReq::try_new::<E>(size)
}

/// Creates a temporary contiguous matrix with the given dimensions, borrowing its memory from
/// `stack`.
///
/// The contents of the matrix are unspecified.
#[track_caller]
#[inline]
pub fn temp_mat_uninit<E: ComplexField>(
    nrows: usize,
    ncols: usize,
    stack: PodStack<'_>,
) -> (MatMut<'_, E>, PodStack<'_>) {
    let (alloc, stack) = stack.make_raw::<E>(nrows * ncols);
    (
        MatMut::from_column_major_slice_mut(alloc, nrows, ncols),
        stack,
    )
}

/// Creates a temporary contiguous matrix with the given dimensions, filled with zeros.
#[track_caller]
#[inline]
pub fn temp_mat_zeroed<E: ComplexField>(
    nrows: usize,
    ncols: usize,
    stack: PodStack<'_>,
) -> (MatMut<'_, E>, PodStack<'_>) {
    let (mut mat, stack) = temp_mat_uninit::<E>(nrows, ncols, stack);
    mat.fill_zero();
    (mat, stack)
}
