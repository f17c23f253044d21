//! LQ factorization of a coupled pair of tiles.
//!
//! Given a lower triangular `m×m` tile $A_1$ and a full `m×n` tile $A_2$, [`tslqt`] computes
//! $[A_1\ A_2] = [L\ 0]\, Q$, where $L$ is lower triangular and $Q$ is unitary. $L$ overwrites
//! the lower triangle of $A_1$, and $Q$ is stored in compact form: the reflector vectors
//! overwrite $A_2$ row by row, and the upper triangular block reflector factors of each block
//! of `ib` reflectors are stored in `T`.

use super::{check_len, check_ld};
use crate::{
    assert,
    linalg::{
        blas,
        householder::{
            apply_block_householder_on_the_right_req,
            apply_coupled_block_householder_on_the_right, make_householder_in_place,
        },
        temp_mat_req, temp_mat_uninit,
    },
    ComplexField, MatMut, TileError,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for factoring a coupled pair of tiles
/// with `m` rows, with inner blocking size `ib`.
pub fn tslqt_req<E: ComplexField>(m: usize, ib: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        temp_mat_req::<E>(m, 1)?,
        apply_block_householder_on_the_right_req::<E>(m, Ord::min(ib, m))?,
    ])
}

/// Computes the LQ factorization of the coupled pair `[a1 a2]` in place.
///
/// `a1` is `m×m`, `a2` is `m×n`, and `t` must have `m` columns and at least `min(ib, m)` rows.
/// The strictly upper triangular part of `a1` is neither read nor written.
#[track_caller]
pub fn tslqt_in_place<E: ComplexField>(
    a1: MatMut<'_, E>,
    a2: MatMut<'_, E>,
    t: MatMut<'_, E>,
    ib: usize,
    stack: PodStack<'_>,
) {
    let mut a1 = a1;
    let mut a2 = a2;
    let mut t = t;
    let m = a1.nrows();
    let n = a2.ncols();
    assert!(all(
        a1.ncols() == m,
        a2.nrows() == m,
        t.ncols() == m,
        ib > 0,
        t.nrows() >= Ord::min(ib, m),
    ));

    let (mut work, mut stack) = temp_mat_uninit::<E>(m, 1, stack);

    let mut ii = 0;
    while ii < m {
        let sb = Ord::min(ib, m - ii);

        for i in 0..sb {
            let j = ii + i;

            // the reflector is generated from the conjugated row
            blas::conj_in_place(a2.rb_mut().row_mut(j));
            let mut head = a1.read(j, j).tsl_conj();
            let tau = make_householder_in_place(&mut head, a2.rb_mut().row_mut(j).transpose_mut());
            a1.write(j, j, head);
            let alpha = tau.tsl_neg();

            // apply H(j) to the remaining rows of the block
            let rows = sb - i - 1;
            if rows > 0 {
                let (top, bot) = a2.rb_mut().split_at_row_mut(j + 1);
                let v = top.into_const().row(j).transpose();
                let bot = bot.submatrix_mut(0, 0, rows, n);
                let mut w = work.rb_mut().submatrix_mut(0, 0, rows, 1);

                blas::copy(w.rb_mut(), a1.rb().submatrix(j + 1, j, rows, 1));
                blas::gemv(w.rb_mut(), bot.rb(), v, Some(E::tsl_one()), E::tsl_one());
                blas::axpy(a1.rb_mut().submatrix_mut(j + 1, j, rows, 1), w.rb(), alpha);
                blas::gerc(bot, w.rb(), v, alpha);
            }

            // T(0..i, j) = -tau * T(0..i, ii..j) * A2(ii..j, :) * v
            {
                let (t_left, t_right) = t.rb_mut().split_at_col_mut(j);
                let mut col = t_right.col_mut(0).submatrix_mut(0, 0, i, 1);
                blas::gemv(
                    col.rb_mut(),
                    a2.rb().submatrix(ii, 0, i, n),
                    a2.rb().row(j).transpose(),
                    None,
                    alpha,
                );
                blas::conj_in_place(a2.rb_mut().row_mut(j));
                blas::trmv_upper(t_left.into_const().submatrix(0, ii, i, i), col);
            }
            t.write(i, j, tau);
        }

        if m > ii + sb {
            let rows = m - ii - sb;
            let (top, bot) = a2.rb_mut().split_at_row_mut(ii + sb);
            apply_coupled_block_householder_on_the_right(
                a1.rb_mut().submatrix_mut(ii + sb, ii, rows, sb),
                bot,
                top.into_const().submatrix(ii, 0, sb, n),
                t.rb().submatrix(0, ii, sb, sb),
                stack.rb_mut(),
            );
        }

        ii += sb;
    }
}

/// Computes the LQ factorization of the coupled pair `[A1 A2]`, where `A1` is the `m×m` lower
/// triangular tile stored in `a1` and `A2` is the `m×n` tile stored in `a2`.
///
/// On exit, the lower triangle of `a1` holds `L`, `a2` holds the reflector vectors and the first
/// `ib` rows of `t` hold the block reflector factors, one `ib×ib` upper triangle per block of
/// `ib` columns. `ib` is clipped to `m`.
///
/// Arguments are validated in the following order: `lda1`, `lda2`, `ldt`, then the lengths of
/// `a1`, `a2` and `t`. When `m`, `n` or `ib` is zero, the call returns after validating the
/// leading dimensions, without accessing any data.
///
/// # Example
/// ```
/// use tessel::{dyn_stack::{GlobalPodBuffer, PodStack}, kernel::{tslqt, tslqt_req}};
///
/// let (m, n, ib) = (2, 3, 2);
/// let mut a1 = vec![3.0f64, 1.0, 0.0, 2.0];
/// let mut a2 = vec![1.0f64, 0.0, 0.0, 1.0, 1.0, 1.0];
/// let mut t = vec![0.0f64; ib * m];
///
/// let mut mem = GlobalPodBuffer::new(tslqt_req::<f64>(m, ib).unwrap());
/// tslqt(m, n, ib, &mut a1, m, &mut a2, m, &mut t, ib, PodStack::new(&mut mem)).unwrap();
///
/// // the first row of L has the norm of the first row of [A1 A2]
/// assert!((a1[0].abs() - 11.0f64.sqrt()).abs() < 1e-12);
/// ```
pub fn tslqt<E: ComplexField>(
    m: usize,
    n: usize,
    ib: usize,
    a1: &mut [E],
    lda1: usize,
    a2: &mut [E],
    lda2: usize,
    t: &mut [E],
    ldt: usize,
    stack: PodStack<'_>,
) -> Result<(), TileError> {
    check_ld(lda1, m, "lda1")?;
    check_ld(lda2, m, "lda2")?;
    let ib = Ord::min(ib, m);
    check_ld(ldt, ib, "ldt")?;

    if m == 0 || n == 0 || ib == 0 {
        return Ok(());
    }

    check_len(a1.len(), m, m, lda1, "a1")?;
    check_len(a2.len(), m, n, lda2, "a2")?;
    check_len(t.len(), ib, m, ldt, "t")?;

    tslqt_in_place(
        MatMut::from_column_major_slice_with_stride_mut(a1, m, m, lda1),
        MatMut::from_column_major_slice_with_stride_mut(a2, m, n, lda2),
        MatMut::from_column_major_slice_with_stride_mut(t, ib, m, ldt),
        ib,
        stack,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use crate::{
        c64,
        kernel::{test_utils::*, tsmlq, tsmlq_req},
        Mat, RealField,
    };
    use dyn_stack::GlobalPodBuffer;

    fn lower<E: ComplexField>(a: &Mat<E>) -> Mat<E> {
        Mat::from_fn(a.nrows(), a.ncols(), |i, j| {
            if i >= j {
                a.read(i, j)
            } else {
                E::tsl_zero()
            }
        })
    }

    fn hcat<E: ComplexField>(a: &Mat<E>, b: &Mat<E>) -> Mat<E> {
        Mat::from_fn(a.nrows(), a.ncols() + b.ncols(), |i, j| {
            if j < a.ncols() {
                a.read(i, j)
            } else {
                b.read(i, j - a.ncols())
            }
        })
    }

    fn adjoint<E: ComplexField>(a: &Mat<E>) -> Mat<E> {
        Mat::from_fn(a.ncols(), a.nrows(), |i, j| a.read(j, i).tsl_conj())
    }

    fn check_factorization<E: Random>(m: usize, n: usize, ib: usize) {
        let a1_orig = random_mat::<E>(m, m);
        let a2_orig = random_mat::<E>(m, n);
        let ib_eff = Ord::min(ib, m);

        let mut a1 = a1_orig.clone();
        let mut a2 = a2_orig.clone();
        let mut t = Mat::<E>::zeros(ib_eff, m);
        tslqt(
            m,
            n,
            ib,
            a1.as_slice_mut(),
            m,
            a2.as_slice_mut(),
            m,
            t.as_slice_mut(),
            ib_eff,
            make_stack!(tslqt_req::<E>(m, ib)),
        )
        .unwrap();

        for j in 0..m {
            assert!(a1.read(j, j).tsl_imag() == E::Real::tsl_zero());
            for i in 0..j {
                assert!(a1.read(i, j) == a1_orig.read(i, j));
            }
        }

        // explicit Q^H, by applying the reflectors to the identity
        let mut b1 = Mat::<E>::from_fn(m + n, m, |i, j| {
            if i == j {
                E::tsl_one()
            } else {
                E::tsl_zero()
            }
        });
        let mut b2 = Mat::<E>::from_fn(m + n, n, |i, j| {
            if i == j + m {
                E::tsl_one()
            } else {
                E::tsl_zero()
            }
        });
        tsmlq(
            m + n,
            n,
            m,
            ib,
            b1.as_slice_mut(),
            m + n,
            b2.as_slice_mut(),
            m + n,
            a2.as_slice(),
            m,
            t.as_slice(),
            ib_eff,
            make_stack!(tsmlq_req::<E>(m + n, ib)),
        )
        .unwrap();
        let qh = hcat(&b1, &b2);

        let eye = Mat::<E>::identity(m + n, m + n);
        assert!(max_abs_diff(adjoint_mul(qh.as_ref(), qh.as_ref()).as_ref(), eye.as_ref()) < 1e-10);

        let l_zero = hcat(&lower(&a1), &Mat::<E>::zeros(m, n));
        let orig = hcat(&lower(&a1_orig), &a2_orig);
        let recon = mul(l_zero.as_ref(), adjoint(&qh).as_ref());
        assert!(max_abs_diff(recon.as_ref(), orig.as_ref()) < 1e-10);

        // applying the reflectors to the original pair annihilates A2
        let mut c1 = lower(&a1_orig);
        let mut c2 = a2_orig.clone();
        tsmlq(
            m,
            n,
            m,
            ib,
            c1.as_slice_mut(),
            m,
            c2.as_slice_mut(),
            m,
            a2.as_slice(),
            m,
            t.as_slice(),
            ib_eff,
            make_stack!(tsmlq_req::<E>(m, ib)),
        )
        .unwrap();
        assert!(max_abs_diff(c1.as_ref(), lower(&a1).as_ref()) < 1e-10);
        assert!(max_abs_diff(c2.as_ref(), Mat::<E>::zeros(m, n).as_ref()) < 1e-10);
    }

    #[test]
    fn test_tslqt_f64() {
        for (m, n, ib) in [
            (1, 1, 1),
            (4, 3, 2),
            (6, 6, 4),
            (5, 8, 5),
            (7, 2, 3),
            (8, 5, 8),
            (3, 4, 10),
        ] {
            check_factorization::<f64>(m, n, ib);
        }
    }

    #[test]
    fn test_tslqt_c64() {
        for (m, n, ib) in [(1, 1, 1), (4, 3, 2), (6, 6, 4), (7, 2, 3), (9, 9, 4)] {
            check_factorization::<c64>(m, n, ib);
        }
    }

    #[test]
    fn empty_sizes_are_noops() {
        let mut a1 = random_mat::<f64>(4, 4);
        let mut a2 = random_mat::<f64>(4, 4);
        let mut t = random_mat::<f64>(4, 4);
        let (a1_0, a2_0, t_0) = (a1.clone(), a2.clone(), t.clone());

        for (m, n, ib) in [(0, 4, 2), (4, 0, 2), (4, 4, 0)] {
            tslqt(
                m,
                n,
                ib,
                a1.as_slice_mut(),
                4,
                a2.as_slice_mut(),
                4,
                t.as_slice_mut(),
                4,
                make_stack!(tslqt_req::<f64>(4, 2)),
            )
            .unwrap();
        }
        assert!(a1 == a1_0);
        assert!(a2 == a2_0);
        assert!(t == t_0);
    }

    #[test]
    fn rejects_invalid_arguments() {
        let mut a1 = vec![0.0f64; 16];
        let mut a2 = vec![0.0f64; 16];
        let mut t = vec![0.0f64; 16];
        let mut mem = GlobalPodBuffer::new(tslqt_req::<f64>(4, 4).unwrap());

        let mut call = |m, n, ib, lda1, lda2, ldt, t_len: usize| {
            tslqt(
                m,
                n,
                ib,
                &mut a1,
                lda1,
                &mut a2,
                lda2,
                &mut t[..t_len],
                ldt,
                PodStack::new(&mut mem),
            )
        };

        assert_eq!(
            call(4, 4, 2, 3, 4, 2, 16),
            Err(TileError::InvalidArgument { arg: "lda1" })
        );
        assert_eq!(
            call(4, 4, 2, 4, 3, 2, 16),
            Err(TileError::InvalidArgument { arg: "lda2" })
        );
        assert_eq!(
            call(4, 4, 2, 4, 4, 1, 16),
            Err(TileError::InvalidArgument { arg: "ldt" })
        );
        // leading dimensions are checked even for empty problems
        assert_eq!(
            call(0, 4, 2, 0, 1, 1, 16),
            Err(TileError::InvalidArgument { arg: "lda1" })
        );
        assert_eq!(
            call(4, 4, 2, 4, 4, 2, 7),
            Err(TileError::InvalidArgument { arg: "t" })
        );
        // ib larger than m is clipped
        assert_eq!(call(2, 4, 8, 4, 4, 2, 16), Ok(()));
    }
}
