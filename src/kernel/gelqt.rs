//! Blocked LQ factorization of a single tile.

use super::{check_len, check_ld};
use crate::{
    assert,
    linalg::{
        blas,
        householder::{
            apply_block_householder_on_the_right, apply_block_householder_on_the_right_req,
            make_householder_in_place,
        },
        temp_mat_req, temp_mat_uninit,
    },
    ComplexField, MatMut, TileError,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for factoring a tile with `m` rows,
/// with inner blocking size `ib`.
pub fn gelqt_req<E: ComplexField>(m: usize, ib: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        temp_mat_req::<E>(m, 1)?,
        apply_block_householder_on_the_right_req::<E>(m, Ord::min(ib, m))?,
    ])
}

/// Computes the LQ factorization of `a` in place.
///
/// With `k = min(m, n)`, `t` must have `k` columns and at least `min(ib, k)` rows. On exit, the
/// lower trapezoid of `a` holds `L`, the strictly upper part holds the reflector vectors, and
/// `t` holds the block reflector factors.
#[track_caller]
pub fn gelqt_in_place<E: ComplexField>(
    a: MatMut<'_, E>,
    t: MatMut<'_, E>,
    ib: usize,
    stack: PodStack<'_>,
) {
    let mut a = a;
    let mut t = t;
    let m = a.nrows();
    let n = a.ncols();
    let k = Ord::min(m, n);
    assert!(all(t.ncols() == k, ib > 0, t.nrows() >= Ord::min(ib, k)));

    let (mut work, mut stack) = temp_mat_uninit::<E>(m, 1, stack);

    let mut ii = 0;
    while ii < k {
        let sb = Ord::min(ib, k - ii);

        for i in 0..sb {
            let j = ii + i;
            let tail_len = n - j - 1;

            blas::conj_in_place(a.rb_mut().submatrix_mut(j, j + 1, 1, tail_len));
            let mut head = a.read(j, j).tsl_conj();
            let tau = make_householder_in_place(
                &mut head,
                a.rb_mut()
                    .submatrix_mut(j, j + 1, 1, tail_len)
                    .transpose_mut(),
            );
            a.write(j, j, head);
            let alpha = tau.tsl_neg();

            let rows = sb - i - 1;
            if rows > 0 {
                let (top, bot) = a.rb_mut().split_at_row_mut(j + 1);
                let v = top.into_const().submatrix(j, j + 1, 1, tail_len).transpose();
                let (bot_head, bot_tail) = bot.submatrix_mut(0, j, rows, n - j).split_at_col_mut(1);
                let mut w = work.rb_mut().submatrix_mut(0, 0, rows, 1);

                blas::copy(w.rb_mut(), bot_head.rb());
                blas::gemv(w.rb_mut(), bot_tail.rb(), v, Some(E::tsl_one()), E::tsl_one());
                blas::axpy(bot_head, w.rb(), alpha);
                blas::gerc(bot_tail, w.rb(), v, alpha);
            }

            // the previous rows of the block have an implicit zero before their own diagonal
            {
                let (t_left, t_right) = t.rb_mut().split_at_col_mut(j);
                let mut col = t_right.col_mut(0).submatrix_mut(0, 0, i, 1);
                blas::copy(col.rb_mut(), a.rb().submatrix(ii, j, i, 1));
                blas::gemv(
                    col.rb_mut(),
                    a.rb().submatrix(ii, j + 1, i, tail_len),
                    a.rb().submatrix(j, j + 1, 1, tail_len).transpose(),
                    Some(E::tsl_one()),
                    E::tsl_one(),
                );
                blas::scale(col.rb_mut(), alpha);
                blas::conj_in_place(a.rb_mut().submatrix_mut(j, j + 1, 1, tail_len));
                blas::trmv_upper(t_left.into_const().submatrix(0, ii, i, i), col);
            }
            t.write(i, j, tau);
        }

        if m > ii + sb {
            let rows = m - ii - sb;
            let (top, bot) = a.rb_mut().split_at_row_mut(ii + sb);
            apply_block_householder_on_the_right(
                bot.submatrix_mut(0, ii, rows, n - ii),
                top.into_const().submatrix(ii, ii, sb, n - ii),
                t.rb().submatrix(0, ii, sb, sb),
                stack.rb_mut(),
            );
        }

        ii += sb;
    }
}

/// Computes the LQ factorization of the `m×n` tile stored in `a`, with inner blocking size
/// `ib` clipped to `min(m, n)`.
///
/// `t` receives the `ib×min(m, n)` block reflector factors. Returns without accessing any data
/// when `m`, `n` or `ib` is zero.
pub fn gelqt<E: ComplexField>(
    m: usize,
    n: usize,
    ib: usize,
    a: &mut [E],
    lda: usize,
    t: &mut [E],
    ldt: usize,
    stack: PodStack<'_>,
) -> Result<(), TileError> {
    let k = Ord::min(m, n);
    check_ld(lda, m, "lda")?;
    let ib = Ord::min(ib, k);
    check_ld(ldt, ib, "ldt")?;

    if m == 0 || n == 0 || ib == 0 {
        return Ok(());
    }

    check_len(a.len(), m, n, lda, "a")?;
    check_len(t.len(), ib, k, ldt, "t")?;

    gelqt_in_place(
        MatMut::from_column_major_slice_with_stride_mut(a, m, n, lda),
        MatMut::from_column_major_slice_with_stride_mut(t, ib, k, ldt),
        ib,
        stack,
    );
    Ok(())
}
