//! Column-major matrix views and owned matrices.
//!
//! [`MatRef`] and [`MatMut`] are thin views made of a pointer, a shape and a pair of strides. They
//! behave like `&[E]` and `&mut [E]`: a [`MatMut`] can be reborrowed with
//! [`ReborrowMut::rb_mut`](reborrow::ReborrowMut::rb_mut) and converted to a [`MatRef`] with
//! [`Reborrow::rb`](reborrow::Reborrow::rb) or
//! [`IntoConst::into_const`](reborrow::IntoConst::into_const).
//!
//! Vectors are represented as views with a single column; [`MatRef::row`] returns a `1×n`
//! view that can be turned into an `n×1` one with [`MatRef::transpose`].

use core::{marker::PhantomData, ptr::NonNull};

mod matmut;
mod matown;
mod matref;

pub use matmut::MatMut;
pub use matown::Mat;
pub use matref::MatRef;

#[repr(C)]
struct MatImpl<E> {
    ptr: NonNull<E>,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
}

impl<E> Copy for MatImpl<E> {}
impl<E> Clone for MatImpl<E> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> MatImpl<E> {
    #[inline(always)]
    fn offset(&self, row: usize, col: usize) -> isize {
        (row as isize)
            .wrapping_mul(self.row_stride)
            .wrapping_add((col as isize).wrapping_mul(self.col_stride))
    }

    #[inline(always)]
    fn ptr_at(&self, row: usize, col: usize) -> *mut E {
        self.ptr.as_ptr().wrapping_offset(self.offset(row, col))
    }

    #[inline(always)]
    fn submatrix(self, row: usize, col: usize, nrows: usize, ncols: usize) -> Self {
        Self {
            // SAFETY: `wrapping_offset` never yields a null pointer from a non null base within
            // the same allocation, and views of zero size never dereference it.
            ptr: unsafe { NonNull::new_unchecked(self.ptr_at(row, col)) },
            nrows,
            ncols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
        }
    }

    #[inline(always)]
    fn transpose(self) -> Self {
        Self {
            ptr: self.ptr,
            nrows: self.ncols,
            ncols: self.nrows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
        }
    }
}

/// Number of elements spanned by a column-major `nrows×ncols` block with leading dimension
/// `col_stride`, from its first to its last element.
#[inline]
pub fn column_major_span(nrows: usize, ncols: usize, col_stride: usize) -> usize {
    if nrows == 0 || ncols == 0 {
        0
    } else {
        (ncols - 1) * col_stride + nrows
    }
}

#[inline]
#[track_caller]
fn check_column_major_slice(len: usize, nrows: usize, ncols: usize, col_stride: usize) {
    crate::assert!(all(
        col_stride >= nrows,
        column_major_span(nrows, ncols, col_stride) <= len,
    ));
}

#[inline(always)]
fn marker<'a, E>() -> PhantomData<&'a E> {
    PhantomData
}
