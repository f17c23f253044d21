use super::*;
use crate::assert;
use reborrow::*;

/// Immutable view over a matrix, similar to an immutable reference to a strided
/// [prim@slice].
///
/// # Note
///
/// Unlike a slice, the data pointed to by `MatRef<'_, E>` is allowed to be partially or fully
/// uninitialized under certain conditions. In this case, care must be taken to not perform any
/// operations that read the uninitialized values.
#[repr(C)]
pub struct MatRef<'a, E> {
    pub(super) inner: MatImpl<E>,
    pub(super) __marker: PhantomData<&'a E>,
}

unsafe impl<E: Sync> Sync for MatRef<'_, E> {}
unsafe impl<E: Sync> Send for MatRef<'_, E> {}

impl<E> Copy for MatRef<'_, E> {}
impl<E> Clone for MatRef<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'short, E> Reborrow<'short> for MatRef<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        *self
    }
}

impl<'short, E> ReborrowMut<'short> for MatRef<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        *self
    }
}

impl<E> IntoConst for MatRef<'_, E> {
    type Target = Self;

    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}

impl<'a, E: Copy> MatRef<'a, E> {
    /// Creates a `MatRef` from pointers to the matrix data, dimensions, and strides.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are violated:
    /// * For each matrix unit, the entire memory region addressed by the matrix must be contained
    /// within a single allocation, accessible in its entirety by the corresponding pointer in
    /// `ptr`.
    /// * `ptr` must be non null and properly aligned.
    /// * For the duration of the lifetime `'a`, the memory region addressed by the matrix must not
    /// be written to by any other view.
    #[inline(always)]
    pub unsafe fn from_raw_parts(
        ptr: *const E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            inner: MatImpl {
                ptr: NonNull::new_unchecked(ptr as *mut E),
                nrows,
                ncols,
                row_stride,
                col_stride,
            },
            __marker: marker(),
        }
    }

    /// Creates a `MatRef` from slice views over the matrix data, and the matrix dimensions.
    /// The data is interpreted in a column-major format, so that the first chunk of `nrows`
    /// values from the slices goes in the first column of the matrix, the second chunk of `nrows`
    /// values goes in the second column, and so on.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `nrows * ncols == slice.len()`
    #[inline]
    #[track_caller]
    pub fn from_column_major_slice(slice: &'a [E], nrows: usize, ncols: usize) -> Self {
        assert!(nrows.checked_mul(ncols) == Some(slice.len()));
        Self::from_column_major_slice_with_stride(slice, nrows, ncols, nrows)
    }

    /// Creates a `MatRef` from slice views over the matrix data, the matrix dimensions, and the
    /// distance between two consecutive columns.
    ///
    /// # Panics
    /// The function panics if `col_stride < nrows`, or if the slice is too short to hold the
    /// last column.
    #[inline]
    #[track_caller]
    pub fn from_column_major_slice_with_stride(
        slice: &'a [E],
        nrows: usize,
        ncols: usize,
        col_stride: usize,
    ) -> Self {
        check_column_major_slice(slice.len(), nrows, ncols, col_stride);
        unsafe { Self::from_raw_parts(slice.as_ptr(), nrows, ncols, 1, col_stride as isize) }
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
    pub fn as_ptr(self) -> *const E {
        self.inner.ptr.as_ptr()
    }

    /// Reads the value of the element at the given indices.
    ///
    /// # Panics
    /// The function panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn read(&self, row: usize, col: usize) -> E {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.read_unchecked(row, col) }
    }

    /// Reads the value of the element at the given indices, with no bound checks.
    ///
    /// # Safety
    /// `row < self.nrows()` and `col < self.ncols()`.
    #[inline(always)]
    pub unsafe fn read_unchecked(&self, row: usize, col: usize) -> E {
        *self.inner.ptr_at(row, col)
    }

    /// Returns a view over the submatrix starting at indices `(row_start, col_start)`, with
    /// dimensions `(nrows, ncols)`.
    #[inline]
    #[track_caller]
    pub fn submatrix(self, row_start: usize, col_start: usize, nrows: usize, ncols: usize) -> Self {
        assert!(all(
            row_start <= self.nrows(),
            col_start <= self.ncols(),
            nrows <= self.nrows() - row_start,
            ncols <= self.ncols() - col_start,
        ));
        Self {
            inner: self.inner.submatrix(row_start, col_start, nrows, ncols),
            __marker: marker(),
        }
    }

    /// Splits the matrix horizontally at the given row into two parts and returns them in the
    /// order top, bottom.
    #[inline]
    #[track_caller]
    pub fn split_at_row(self, row: usize) -> (Self, Self) {
        assert!(row <= self.nrows());
        let ncols = self.ncols();
        (
            self.submatrix(0, 0, row, ncols),
            self.submatrix(row, 0, self.nrows() - row, ncols),
        )
    }

    /// Splits the matrix vertically at the given column into two parts and returns them in the
    /// order left, right.
    #[inline]
    #[track_caller]
    pub fn split_at_col(self, col: usize) -> (Self, Self) {
        assert!(col <= self.ncols());
        let nrows = self.nrows();
        (
            self.submatrix(0, 0, nrows, col),
            self.submatrix(0, col, nrows, self.ncols() - col),
        )
    }

    /// Returns the `col`-th column as an `nrows×1` view.
    #[inline]
    #[track_caller]
    pub fn col(self, col: usize) -> Self {
        assert!(col < self.ncols());
        self.submatrix(0, col, self.nrows(), 1)
    }

    /// Returns the `row`-th row as a `1×ncols` view.
    #[inline]
    #[track_caller]
    pub fn row(self, row: usize) -> Self {
        assert!(row < self.nrows());
        self.submatrix(row, 0, 1, self.ncols())
    }

    /// Returns a view over the transpose of `self`.
    #[inline(always)]
    pub fn transpose(self) -> Self {
        Self {
            inner: self.inner.transpose(),
            __marker: marker(),
        }
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for MatRef<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct DebugRow<'a, T: Copy + core::fmt::Debug>(MatRef<'a, T>);

        impl<T: Copy + core::fmt::Debug> core::fmt::Debug for DebugRow<'_, T> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut j = 0;
                f.debug_list()
                    .entries(core::iter::from_fn(|| {
                        let ret = if j < self.0.ncols() {
                            Some(self.0.read(0, j))
                        } else {
                            None
                        };
                        j += 1;
                        ret
                    }))
                    .finish()
            }
        }

        let mut i = 0;
        f.debug_list()
            .entries(core::iter::from_fn(|| {
                let ret = if i < self.nrows() {
                    Some(DebugRow(self.row(i)))
                } else {
                    None
                };
                i += 1;
                ret
            }))
            .finish()
    }
}
