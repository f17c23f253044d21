//! Application of the reflectors produced by [`tslqt`](super::tslqt) to a coupled pair of
//! tiles.

use super::{check_len, check_ld};
use crate::{
    assert,
    linalg::householder::{
        apply_block_householder_on_the_right_req, apply_coupled_block_householder_on_the_right,
    },
    ComplexField, MatMut, MatRef, TileError,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for applying the reflectors to `m`
/// rows, with inner blocking size `ib`.
pub fn tsmlq_req<E: ComplexField>(m: usize, ib: usize) -> Result<StackReq, SizeOverflow> {
    apply_block_householder_on_the_right_req::<E>(m, ib)
}

/// Computes `[B1 B2] = [B1 B2] Q^H`, where `Q` is given by the `k` reflectors stored row-wise in
/// `basis` and the block reflector factors stored in `factor`, as produced by
/// [`tslqt_in_place`](super::tslqt::tslqt_in_place).
///
/// `b1` is `m×k`, `b2` is `m×n`, `basis` is `k×n` and `factor` is `ib×k`.
#[track_caller]
pub fn tsmlq_in_place<E: ComplexField>(
    b1: MatMut<'_, E>,
    b2: MatMut<'_, E>,
    basis: MatRef<'_, E>,
    factor: MatRef<'_, E>,
    ib: usize,
    stack: PodStack<'_>,
) {
    let mut b1 = b1;
    let mut b2 = b2;
    let mut stack = stack;
    let m = b1.nrows();
    let k = b1.ncols();
    let n = b2.ncols();
    assert!(all(
        b2.nrows() == m,
        basis.nrows() == k,
        basis.ncols() == n,
        factor.ncols() == k,
        ib > 0,
        factor.nrows() >= Ord::min(ib, k),
    ));

    let mut i = 0;
    while i < k {
        let kb = Ord::min(ib, k - i);
        apply_coupled_block_householder_on_the_right(
            b1.rb_mut().submatrix_mut(0, i, m, kb),
            b2.rb_mut(),
            basis.submatrix(i, 0, kb, n),
            factor.submatrix(0, i, kb, kb),
            stack.rb_mut(),
        );
        i += kb;
    }
}

/// Applies the adjoint of the orthogonal factor of a coupled-tile LQ factorization from the
/// right to the coupled pair `[B1 B2]`, with `B1` of size `m×k` and `B2` of size `m×n`.
///
/// `v` holds the `k×n` reflectors and `t` the `ib×k` block reflector factors produced by
/// [`tslqt`](super::tslqt). `ib` is clipped to `k`. Returns without accessing any data when
/// `m`, `n`, `k` or `ib` is zero.
pub fn tsmlq<E: ComplexField>(
    m: usize,
    n: usize,
    k: usize,
    ib: usize,
    b1: &mut [E],
    ldb1: usize,
    b2: &mut [E],
    ldb2: usize,
    v: &[E],
    ldv: usize,
    t: &[E],
    ldt: usize,
    stack: PodStack<'_>,
) -> Result<(), TileError> {
    let ib = Ord::min(ib, k);
    check_ld(ldb1, m, "ldb1")?;
    check_ld(ldb2, m, "ldb2")?;
    check_ld(ldv, k, "ldv")?;
    check_ld(ldt, ib, "ldt")?;

    if m == 0 || n == 0 || k == 0 || ib == 0 {
        return Ok(());
    }

    check_len(b1.len(), m, k, ldb1, "b1")?;
    check_len(b2.len(), m, n, ldb2, "b2")?;
    check_len(v.len(), k, n, ldv, "v")?;
    check_len(t.len(), ib, k, ldt, "t")?;

    tsmlq_in_place(
        MatMut::from_column_major_slice_with_stride_mut(b1, m, k, ldb1),
        MatMut::from_column_major_slice_with_stride_mut(b2, m, n, ldb2),
        MatRef::from_column_major_slice_with_stride(v, k, n, ldv),
        MatRef::from_column_major_slice_with_stride(t, ib, k, ldt),
        ib,
        stack,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use crate::kernel::test_utils::*;
    use dyn_stack::GlobalPodBuffer;

    #[test]
    fn empty_sizes_are_noops() {
        let mut b1 = random_mat::<f64>(4, 4);
        let mut b2 = random_mat::<f64>(4, 3);
        let v = random_mat::<f64>(4, 3);
        let t = random_mat::<f64>(2, 4);
        let (b1_0, b2_0) = (b1.clone(), b2.clone());

        for (m, n, k, ib) in [(0, 3, 4, 2), (4, 0, 4, 2), (4, 3, 0, 2), (4, 3, 4, 0)] {
            tsmlq(
                m,
                n,
                k,
                ib,
                b1.as_slice_mut(),
                4,
                b2.as_slice_mut(),
                4,
                v.as_slice(),
                4,
                t.as_slice(),
                2,
                make_stack!(tsmlq_req::<f64>(4, 2)),
            )
            .unwrap();
            assert!(b1 == b1_0);
            assert!(b2 == b2_0);
        }
    }

    #[test]
    fn rejects_short_leading_dimensions() {
        let mut b1 = vec![0.0f64; 16];
        let mut b2 = vec![0.0f64; 16];
        let v = vec![0.0f64; 16];
        let t = vec![0.0f64; 16];
        let mut mem = GlobalPodBuffer::new(tsmlq_req::<f64>(4, 2).unwrap());

        let err = tsmlq(
            4,
            4,
            4,
            2,
            &mut b1,
            4,
            &mut b2,
            3,
            &v,
            4,
            &t,
            2,
            PodStack::new(&mut mem),
        );
        assert_eq!(err, Err(TileError::InvalidArgument { arg: "ldb2" }));

        let err = tsmlq(
            4,
            4,
            4,
            2,
            &mut b1,
            4,
            &mut b2,
            4,
            &v,
            4,
            &t,
            1,
            PodStack::new(&mut mem),
        );
        assert_eq!(err, Err(TileError::InvalidArgument { arg: "ldt" }));

        let err = tsmlq(
            4,
            5,
            4,
            2,
            &mut b1,
            4,
            &mut b2,
            4,
            &v,
            4,
            &t,
            2,
            PodStack::new(&mut mem),
        );
        assert_eq!(err, Err(TileError::InvalidArgument { arg: "b2" }));
    }
}
