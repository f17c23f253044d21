use super::*;
use crate::{assert, ComplexField};
use reborrow::*;

/// Mutable view over a matrix, similar to a mutable reference to a strided [prim@slice].
///
/// # Note
///
/// Unlike a slice, the data pointed to by `MatMut<'_, E>` is allowed to be partially or fully
/// uninitialized under certain conditions. In this case, care must be taken to not perform any
/// operations that read the uninitialized values, or form references to them, either directly
/// through [`MatMut::read`], or indirectly through any of the numerical library routines, unless
/// it is explicitly permitted.
#[repr(C)]
pub struct MatMut<'a, E> {
    pub(super) inner: MatImpl<E>,
    pub(super) __marker: PhantomData<&'a mut E>,
}

unsafe impl<E: Sync> Sync for MatMut<'_, E> {}
unsafe impl<E: Send> Send for MatMut<'_, E> {}

impl<'short, E> Reborrow<'short> for MatMut<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        MatRef {
            inner: self.inner,
            __marker: PhantomData,
        }
    }
}

impl<'short, E> ReborrowMut<'short> for MatMut<'_, E> {
    type Target = MatMut<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        MatMut {
            inner: self.inner,
            __marker: PhantomData,
        }
    }
}

impl<'a, E> IntoConst for MatMut<'a, E> {
    type Target = MatRef<'a, E>;

    #[inline]
    fn into_const(self) -> Self::Target {
        MatRef {
            inner: self.inner,
            __marker: PhantomData,
        }
    }
}

impl<'a, E: Copy> MatMut<'a, E> {
    /// Creates a `MatMut` from pointers to the matrix data, dimensions, and strides.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are violated:
    /// * For each matrix unit, the entire memory region addressed by the matrix must be contained
    /// within a single allocation, accessible in its entirety by the corresponding pointer in
    /// `ptr`.
    /// * `ptr` must be non null and properly aligned.
    /// * The memory region addressed by the matrix must not be accessed through any other view
    /// for the duration of the lifetime `'a`.
    /// * Two distinct indices of the view must not address the same element.
    #[inline(always)]
    pub unsafe fn from_raw_parts_mut(
        ptr: *mut E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            inner: MatImpl {
                ptr: NonNull::new_unchecked(ptr),
                nrows,
                ncols,
                row_stride,
                col_stride,
            },
            __marker: PhantomData,
        }
    }

    /// Creates a `MatMut` from slice views over the matrix data, and the matrix dimensions.
    /// The data is interpreted in a column-major format.
    ///
    /// # Panics
    /// The function panics if `nrows * ncols != slice.len()`.
    #[inline]
    #[track_caller]
    pub fn from_column_major_slice_mut(slice: &'a mut [E], nrows: usize, ncols: usize) -> Self {
        assert!(nrows.checked_mul(ncols) == Some(slice.len()));
        Self::from_column_major_slice_with_stride_mut(slice, nrows, ncols, nrows)
    }

    /// Creates a `MatMut` from slice views over the matrix data, the matrix dimensions, and the
    /// distance between two consecutive columns.
    ///
    /// # Panics
    /// The function panics if `col_stride < nrows`, or if the slice is too short to hold the
    /// last column.
    #[inline]
    #[track_caller]
    pub fn from_column_major_slice_with_stride_mut(
        slice: &'a mut [E],
        nrows: usize,
        ncols: usize,
        col_stride: usize,
    ) -> Self {
        check_column_major_slice(slice.len(), nrows, ncols, col_stride);
        unsafe {
            Self::from_raw_parts_mut(slice.as_mut_ptr(), nrows, ncols, 1, col_stride as isize)
        }
    }

    /// Returns the number of rows of the matrix.
    #[inline(always)]
    pub fn nrows(&self) -> usize {
        self.inner.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline(always)]
    pub fn ncols(&self) -> usize {
        self.inner.ncols
    }

    /// Returns the number of rows and columns of the matrix.
    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        (self.inner.nrows, self.inner.ncols)
    }

    /// Returns the row stride of the matrix, specified in number of elements, not in bytes.
    #[inline(always)]
    pub fn row_stride(&self) -> isize {
        self.inner.row_stride
    }

    /// Returns the column stride of the matrix, specified in number of elements, not in bytes.
    #[inline(always)]
    pub fn col_stride(&self) -> isize {
        self.inner.col_stride
    }

    /// Returns pointer to the matrix data.
    #[inline(always)]
    pub fn as_ptr_mut(self) -> *mut E {
        self.inner.ptr.as_ptr()
    }

    /// Reads the value of the element at the given indices.
    ///
    /// # Panics
    /// The function panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn read(&self, row: usize, col: usize) -> E {
        self.rb().read(row, col)
    }

    /// Writes the value to the element at the given indices.
    ///
    /// # Panics
    /// The function panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn write(&mut self, row: usize, col: usize, value: E) {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.write_unchecked(row, col, value) }
    }

    /// Writes the value to the element at the given indices, with no bound checks.
    ///
    /// # Safety
    /// `row < self.nrows()` and `col < self.ncols()`.
    #[inline(always)]
    pub unsafe fn write_unchecked(&mut self, row: usize, col: usize, value: E) {
        *self.inner.ptr_at(row, col) = value;
    }

    /// Copies the values from `other` into `self`.
    ///
    /// # Panics
    /// The function panics if `self` and `other` do not have the same shape.
    #[track_caller]
    pub fn copy_from(&mut self, other: MatRef<'_, E>) {
        assert!(all(self.nrows() == other.nrows(), self.ncols() == other.ncols()));
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { self.write_unchecked(i, j, other.read_unchecked(i, j)) };
            }
        }
    }

    /// Fills the elements of `self` with `constant`.
    pub fn fill(&mut self, constant: E) {
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { self.write_unchecked(i, j, constant) };
            }
        }
    }

    /// Returns a view over the submatrix starting at indices `(row_start, col_start)`, with
    /// dimensions `(nrows, ncols)`.
    #[inline]
    #[track_caller]
    pub fn submatrix_mut(
        self,
        row_start: usize,
        col_start: usize,
        nrows: usize,
        ncols: usize,
    ) -> Self {
        assert!(all(
            row_start <= self.nrows(),
            col_start <= self.ncols(),
            nrows <= self.nrows() - row_start,
            ncols <= self.ncols() - col_start,
        ));
        Self {
            inner: self.inner.submatrix(row_start, col_start, nrows, ncols),
            __marker: PhantomData,
        }
    }

    /// Splits the matrix horizontally at the given row into two parts and returns them in the
    /// order top, bottom.
    #[inline]
    #[track_caller]
    pub fn split_at_row_mut(self, row: usize) -> (Self, Self) {
        assert!(row <= self.nrows());
        let (nrows, ncols) = self.shape();
        let inner = self.inner;
        (
            Self {
                inner: inner.submatrix(0, 0, row, ncols),
                __marker: PhantomData,
            },
            Self {
                inner: inner.submatrix(row, 0, nrows - row, ncols),
                __marker: PhantomData,
            },
        )
    }

    /// Splits the matrix vertically at the given column into two parts and returns them in the
    /// order left, right.
    #[inline]
    #[track_caller]
    pub fn split_at_col_mut(self, col: usize) -> (Self, Self) {
        assert!(col <= self.ncols());
        let (nrows, ncols) = self.shape();
        let inner = self.inner;
        (
            Self {
                inner: inner.submatrix(0, 0, nrows, col),
                __marker: PhantomData,
            },
            Self {
                inner: inner.submatrix(0, col, nrows, ncols - col),
                __marker: PhantomData,
            },
        )
    }

    /// Returns the `col`-th column as an `nrows×1` view.
    #[inline]
    #[track_caller]
    pub fn col_mut(self, col: usize) -> Self {
        assert!(col < self.ncols());
        let nrows = self.nrows();
        self.submatrix_mut(0, col, nrows, 1)
    }

    /// Returns the `row`-th row as a `1×ncols` view.
    #[inline]
    #[track_caller]
    pub fn row_mut(self, row: usize) -> Self {
        assert!(row < self.nrows());
        let ncols = self.ncols();
        self.submatrix_mut(row, 0, 1, ncols)
    }

    /// Returns a view over the transpose of `self`.
    #[inline(always)]
    pub fn transpose_mut(self) -> Self {
        Self {
            inner: self.inner.transpose(),
            __marker: PhantomData,
        }
    }
}

impl<E: ComplexField> MatMut<'_, E> {
    /// Fills the elements of `self` with zeros.
    #[inline]
    pub fn fill_zero(&mut self) {
        self.fill(E::tsl_zero());
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for MatMut<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.rb().fmt(f)
    }
}
