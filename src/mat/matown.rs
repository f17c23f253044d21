use super::*;
use crate::{assert, ComplexField};

/// Heap allocated column-major matrix with a contiguous layout.
///
/// Used by the drivers and the validation harness to own their arrays. Kernels only ever see
/// [`MatRef`] and [`MatMut`] views.
#[derive(Clone, PartialEq)]
pub struct Mat<E> {
    data: Vec<E>,
    nrows: usize,
    ncols: usize,
}

impl<E: Copy> Mat<E> {
    /// Returns a matrix of dimensions `(nrows, ncols)`, whose entries are given by `f(i, j)`.
    pub fn from_fn(nrows: usize, ncols: usize, mut f: impl FnMut(usize, usize) -> E) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Returns the number of rows of the matrix.
    #[inline(always)]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline(always)]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the column-major storage of the matrix.
    #[inline]
    pub fn as_slice(&self) -> &[E] {
        &self.data
    }

    /// Returns the column-major storage of the matrix.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [E] {
        &mut self.data
    }

    /// Returns a view over the matrix.
    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, E> {
        MatRef::from_column_major_slice(&self.data, self.nrows, self.ncols)
    }

    /// Returns a mutable view over the matrix.
    #[inline]
    pub fn as_mut(&mut self) -> MatMut<'_, E> {
        MatMut::from_column_major_slice_mut(&mut self.data, self.nrows, self.ncols)
    }

    /// Reads the value of the element at the given indices.
    #[inline]
    #[track_caller]
    pub fn read(&self, row: usize, col: usize) -> E {
        self.as_ref().read(row, col)
    }

    /// Writes the value to the element at the given indices.
    #[inline]
    #[track_caller]
    pub fn write(&mut self, row: usize, col: usize, value: E) {
        self.as_mut().write(row, col, value)
    }
}

impl<E: ComplexField> Mat<E> {
    /// Returns a matrix of dimensions `(nrows, ncols)` filled with zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::from_fn(nrows, ncols, |_, _| E::tsl_zero())
    }

    /// Returns a matrix of dimensions `(nrows, ncols)` with ones on the diagonal and zeros
    /// elsewhere.
    pub fn identity(nrows: usize, ncols: usize) -> Self {
        Self::from_fn(nrows, ncols, |i, j| {
            if i == j {
                E::tsl_one()
            } else {
                E::tsl_zero()
            }
        })
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for Mat<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.as_ref().fmt(f)
    }
}
