//! Application of the reflectors produced by [`gelqt`](super::gelqt) to another tile.

use super::{check_len, check_ld};
use crate::{
    assert,
    linalg::householder::{
        apply_block_householder_on_the_right, apply_block_householder_on_the_right_req,
    },
    ComplexField, MatMut, MatRef, TileError,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for applying the reflectors to `m`
/// rows, with inner blocking size `ib`.
pub fn unmlq_req<E: ComplexField>(m: usize, ib: usize) -> Result<StackReq, SizeOverflow> {
    apply_block_householder_on_the_right_req::<E>(m, ib)
}

/// Computes `C = C Q^H`, where `Q` is given by the `k` reflectors stored in the strictly upper
/// part of `basis` (`k×n`) and by the block reflector factors stored in `factor` (`ib×k`).
#[track_caller]
pub fn unmlq_in_place<E: ComplexField>(
    c: MatMut<'_, E>,
    basis: MatRef<'_, E>,
    factor: MatRef<'_, E>,
    ib: usize,
    stack: PodStack<'_>,
) {
    let mut c = c;
    let mut stack = stack;
    let m = c.nrows();
    let n = c.ncols();
    let k = basis.nrows();
    assert!(all(
        basis.ncols() == n,
        k <= n,
        factor.ncols() == k,
        ib > 0,
        factor.nrows() >= Ord::min(ib, k),
    ));

    let mut i = 0;
    while i < k {
        let kb = Ord::min(ib, k - i);
        apply_block_householder_on_the_right(
            c.rb_mut().submatrix_mut(0, i, m, n - i),
            basis.submatrix(i, i, kb, n - i),
            factor.submatrix(0, i, kb, kb),
            stack.rb_mut(),
        );
        i += kb;
    }
}

/// Applies the adjoint of the orthogonal factor computed by [`gelqt`](super::gelqt) from the
/// right to the `m×n` tile stored in `c`.
///
/// `a` holds the `k` reflectors row-wise and `t` the `ib×k` block reflector factors. `ib` is
/// clipped to `k`. Returns without accessing any data when `m`, `n`, `k` or `ib` is zero.
pub fn unmlq<E: ComplexField>(
    m: usize,
    n: usize,
    k: usize,
    ib: usize,
    a: &[E],
    lda: usize,
    t: &[E],
    ldt: usize,
    c: &mut [E],
    ldc: usize,
    stack: PodStack<'_>,
) -> Result<(), TileError> {
    if k > n {
        return Err(TileError::InvalidArgument { arg: "k" });
    }
    check_ld(lda, k, "lda")?;
    let ib = Ord::min(ib, k);
    check_ld(ldt, ib, "ldt")?;
    check_ld(ldc, m, "ldc")?;

    if m == 0 || n == 0 || k == 0 || ib == 0 {
        return Ok(());
    }

    check_len(a.len(), k, n, lda, "a")?;
    check_len(t.len(), ib, k, ldt, "t")?;
    check_len(c.len(), m, n, ldc, "c")?;

    unmlq_in_place(
        MatMut::from_column_major_slice_with_stride_mut(c, m, n, ldc),
        MatRef::from_column_major_slice_with_stride(a, k, n, lda),
        MatRef::from_column_major_slice_with_stride(t, ib, k, ldt),
        ib,
        stack,
    );
    Ok(())
}
