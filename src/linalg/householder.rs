//! Elementary reflectors and block reflectors stored row-wise.
//!
//! An elementary reflector is a unitary matrix of the form $H = I - \tau v v^H$, where $v_0 = 1$.
//! The LQ kernels of this crate annihilate one row at a time, so the vectors $v$ are stored
//! row-wise, in the rows of the factored tiles.
//!
//! A block of $k$ consecutive reflectors $H_0 H_1 \dots H_{k-1}$ is represented in compact
//! form as $I - V^H T V$, where the rows of $V$ are the reflector vectors and $T$ is a
//! $k\times k$ upper triangular matrix that we call the block reflector factor.
//!
//! Two storage schemes for $V$ are used:
//! - for a single tile (`gelqt`), row $p$ of $V$ has zeros before column $p$, an implicit one at
//! column $p$, and stored values after it,
//! - for a coupled pair of tiles (`tslqt`), $V = [I\ V_2]$, where $V_2$ is fully stored in the
//! second tile.

use crate::{
    assert,
    linalg::{blas, temp_mat_req, temp_mat_uninit},
    ComplexField, Conj, MatMut, MatRef, RealField,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the elementary reflector $H$ such that $H^H [\alpha\ x]^T = [\beta\ 0]^T$, with
/// $\beta$ real, following the LAPACK `larfg` conventions.
///
/// On exit, `head` holds $\beta$ and `tail` holds the essential part of $v$. The returned value
/// is $\tau$. When `tail` is zero and `head` is real, $\tau = 0$ and $H$ is the identity.
pub fn make_householder_in_place<E: ComplexField>(head: &mut E, tail: MatMut<'_, E>) -> E {
    let alpha = *head;
    let tail_norm = blas::norm_l2(tail.rb());

    let zero = E::Real::tsl_zero();
    let alpha_re = alpha.tsl_real();
    let alpha_im = alpha.tsl_imag();

    if tail_norm == zero && alpha_im == zero {
        return E::tsl_zero();
    }

    let norm = hypot3(alpha_re, alpha_im, tail_norm);
    let beta = norm.tsl_copysign(alpha_re).tsl_neg();

    let tau = E::tsl_from_re_im(
        beta.tsl_sub(alpha_re).tsl_div(beta),
        alpha_im.tsl_neg().tsl_div(beta),
    );
    let scale = alpha.tsl_sub(E::tsl_from_real(beta)).tsl_inv();
    blas::scale(tail, scale);

    *head = E::tsl_from_real(beta);
    tau
}

fn hypot3<T: RealField>(a: T, b: T, c: T) -> T {
    let a = a.tsl_abs();
    let b = b.tsl_abs();
    let c = c.tsl_abs();
    let max = a.tsl_max(b).tsl_max(c);
    if max == T::tsl_zero() {
        return max;
    }
    let a = a.tsl_div(max);
    let b = b.tsl_div(max);
    let c = c.tsl_div(max);
    max.tsl_mul(a.tsl_mul(a).tsl_add(b.tsl_mul(b)).tsl_add(c.tsl_mul(c)).tsl_sqrt())
}

/// Computes the size and alignment of required workspace for applying a block reflector with
/// `blocksize` reflectors to `nrows` rows.
pub fn apply_block_householder_on_the_right_req<E: ComplexField>(
    nrows: usize,
    blocksize: usize,
) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        temp_mat_req::<E>(nrows, blocksize)?,
        temp_mat_req::<E>(nrows, blocksize)?,
        temp_mat_req::<E>(blocksize, blocksize)?,
        temp_mat_req::<E>(blocksize, blocksize)?,
    ])
}

// dst = triu(src), with ones on the diagonal if `unit_diag` is set
fn copy_upper<E: ComplexField>(dst: MatMut<'_, E>, src: MatRef<'_, E>, unit_diag: bool) {
    let mut dst = dst;
    let k = src.ncols();
    dst.fill_zero();
    for j in 0..k {
        for i in 0..j {
            dst.write(i, j, src.read(i, j));
        }
        let diag = if unit_diag {
            E::tsl_one()
        } else {
            src.read(j, j)
        };
        dst.write(j, j, diag);
    }
}

/// Computes the product of `[lhs_top lhs_bot]` by the adjoint of the coupled block reflector
/// $I - [I\ V]^H T [I\ V]$, and stores the result in place.
///
/// `lhs_top` has `k` columns and `basis` is `k×n`, where `n` is the number of columns of
/// `lhs_bot`. Only the upper triangular part of `factor` is accessed.
#[track_caller]
pub fn apply_coupled_block_householder_on_the_right<E: ComplexField>(
    lhs_top: MatMut<'_, E>,
    lhs_bot: MatMut<'_, E>,
    basis: MatRef<'_, E>,
    factor: MatRef<'_, E>,
    stack: PodStack<'_>,
) {
    let mut lhs_top = lhs_top;
    let mut lhs_bot = lhs_bot;
    let m = lhs_top.nrows();
    let k = lhs_top.ncols();
    let n = lhs_bot.ncols();
    assert!(all(
        lhs_bot.nrows() == m,
        basis.nrows() == k,
        basis.ncols() == n,
        factor.nrows() == k,
        factor.ncols() == k,
    ));
    if m == 0 || k == 0 {
        return;
    }

    let one = E::tsl_one();
    let (mut work, stack) = temp_mat_uninit::<E>(m, k, stack);
    let (mut work_t, stack) = temp_mat_uninit::<E>(m, k, stack);
    let (mut tri, _) = temp_mat_uninit::<E>(k, k, stack);
    copy_upper(tri.rb_mut(), factor, false);

    // W = B1 + B2 V^H
    blas::copy(work.rb_mut(), lhs_top.rb());
    blas::matmul(
        work.rb_mut(),
        lhs_bot.rb(),
        Conj::No,
        basis.transpose(),
        Conj::Yes,
        Some(one),
        one,
    );
    blas::matmul(work_t.rb_mut(), work.rb(), Conj::No, tri.rb(), Conj::No, None, one);

    // B1 -= W T
    // B2 -= W T V
    blas::axpy(lhs_top.rb_mut(), work_t.rb(), one.tsl_neg());
    blas::matmul(
        lhs_bot.rb_mut(),
        work_t.rb(),
        Conj::No,
        basis,
        Conj::No,
        Some(one),
        one.tsl_neg(),
    );
}

/// Computes the product of `lhs` by the adjoint of the block reflector $I - V^H T V$, and stores
/// the result in place.
///
/// `basis` is `k×n` where `n` is the number of columns of `lhs`. Row `p` of the basis is made of
/// zeros before column `p` and an implicit one at column `p`, only the entries after it are
/// accessed. Only the upper triangular part of `factor` is accessed.
#[track_caller]
pub fn apply_block_householder_on_the_right<E: ComplexField>(
    lhs: MatMut<'_, E>,
    basis: MatRef<'_, E>,
    factor: MatRef<'_, E>,
    stack: PodStack<'_>,
) {
    let m = lhs.nrows();
    let n = lhs.ncols();
    let k = basis.nrows();
    assert!(all(
        basis.ncols() == n,
        k <= n,
        factor.nrows() == k,
        factor.ncols() == k,
    ));
    if m == 0 || k == 0 {
        return;
    }

    let one = E::tsl_one();
    let (mut lhs_left, mut lhs_right) = lhs.split_at_col_mut(k);
    let (basis_left, basis_right) = basis.split_at_col(k);

    let (mut work, stack) = temp_mat_uninit::<E>(m, k, stack);
    let (mut work_t, stack) = temp_mat_uninit::<E>(m, k, stack);
    let (mut tri, stack) = temp_mat_uninit::<E>(k, k, stack);
    let (mut unit, _) = temp_mat_uninit::<E>(k, k, stack);
    copy_upper(tri.rb_mut(), factor, false);
    copy_upper(unit.rb_mut(), basis_left, true);

    // W = C1 V1^H + C2 V2^H, where V1 is unit upper triangular
    blas::matmul(
        work.rb_mut(),
        lhs_left.rb(),
        Conj::No,
        unit.rb().transpose(),
        Conj::Yes,
        None,
        one,
    );
    blas::matmul(
        work.rb_mut(),
        lhs_right.rb(),
        Conj::No,
        basis_right.transpose(),
        Conj::Yes,
        Some(one),
        one,
    );
    blas::matmul(work_t.rb_mut(), work.rb(), Conj::No, tri.rb(), Conj::No, None, one);

    // C -= W T V
    blas::matmul(
        lhs_left.rb_mut(),
        work_t.rb(),
        Conj::No,
        unit.rb(),
        Conj::No,
        Some(one),
        one.tsl_neg(),
    );
    blas::matmul(
        lhs_right.rb_mut(),
        work_t.rb(),
        Conj::No,
        basis_right,
        Conj::No,
        Some(one),
        one.tsl_neg(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use crate::{
        c64,
        kernel::test_utils::{max_abs_diff, mul, random_mat},
        Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::GlobalPodBuffer;

    fn adjoint(a: &Mat<c64>) -> Mat<c64> {
        Mat::from_fn(a.ncols(), a.nrows(), |i, j| a.read(j, i).conj())
    }

    // C - C V^H T V, with the upper triangle of T
    fn apply_explicit(c: &Mat<c64>, v: &Mat<c64>, t: &Mat<c64>) -> Mat<c64> {
        let k = t.nrows();
        let tri = Mat::from_fn(k, k, |i, j| {
            if i <= j {
                t.read(i, j)
            } else {
                c64::new(0.0, 0.0)
            }
        });
        let cvh = mul(c.as_ref(), adjoint(v).as_ref());
        let update = mul(mul(cvh.as_ref(), tri.as_ref()).as_ref(), v.as_ref());
        Mat::from_fn(c.nrows(), c.ncols(), |i, j| c.read(i, j) - update.read(i, j))
    }

    fn poison_lower(t: &mut Mat<c64>) {
        for j in 0..t.ncols() {
            for i in j + 1..t.nrows() {
                t.write(i, j, c64::new(f64::NAN, f64::NAN));
            }
        }
    }

    #[test]
    fn block_reflector_with_implicit_unit_rows() {
        let (m, n, k) = (5, 7, 3);
        let c = random_mat::<c64>(m, n);
        let mut basis = random_mat::<c64>(k, n);
        let mut t = random_mat::<c64>(k, k);
        poison_lower(&mut t);
        // entries on and before the diagonal of the basis hold unrelated data
        for p in 0..k {
            for j in 0..p + 1 {
                basis.write(p, j, c64::new(f64::NAN, 0.0));
            }
        }
        let v = Mat::from_fn(k, n, |p, j| match j.cmp(&p) {
            core::cmp::Ordering::Less => c64::new(0.0, 0.0),
            core::cmp::Ordering::Equal => c64::new(1.0, 0.0),
            core::cmp::Ordering::Greater => basis.read(p, j),
        });

        let mut out = c.clone();
        let mut mem = GlobalPodBuffer::new(
            apply_block_householder_on_the_right_req::<c64>(m, k).unwrap(),
        );
        apply_block_householder_on_the_right(
            out.as_mut(),
            basis.as_ref(),
            t.as_ref(),
            PodStack::new(&mut mem),
        );
        assert!(max_abs_diff(out.as_ref(), apply_explicit(&c, &v, &t).as_ref()) < 1e-12);
    }

    #[test]
    fn coupled_block_reflector() {
        let (m, n, k) = (4, 6, 3);
        let top = random_mat::<c64>(m, k);
        let bot = random_mat::<c64>(m, n);
        let basis = random_mat::<c64>(k, n);
        let mut t = random_mat::<c64>(k, k);
        poison_lower(&mut t);

        let c = Mat::from_fn(m, k + n, |i, j| {
            if j < k {
                top.read(i, j)
            } else {
                bot.read(i, j - k)
            }
        });
        let v = Mat::from_fn(k, k + n, |p, j| {
            if j < k {
                c64::new((p == j) as u8 as f64, 0.0)
            } else {
                basis.read(p, j - k)
            }
        });
        let expected = apply_explicit(&c, &v, &t);

        let (mut out_top, mut out_bot) = (top.clone(), bot.clone());
        let mut mem = GlobalPodBuffer::new(
            apply_block_householder_on_the_right_req::<c64>(m, k).unwrap(),
        );
        apply_coupled_block_householder_on_the_right(
            out_top.as_mut(),
            out_bot.as_mut(),
            basis.as_ref(),
            t.as_ref(),
            PodStack::new(&mut mem),
        );
        let out = Mat::from_fn(m, k + n, |i, j| {
            if j < k {
                out_top.read(i, j)
            } else {
                out_bot.read(i, j - k)
            }
        });
        assert!(max_abs_diff(out.as_ref(), expected.as_ref()) < 1e-12);
    }

    #[test]
    fn larfg_annihilates_tail() {
        let x0 = [c64::new(1.0, 2.0), c64::new(-0.5, 0.25), c64::new(3.0, 0.0)];
        let alpha0 = c64::new(0.5, -1.0);

        let mut alpha = alpha0;
        let mut tail = Mat::from_fn(3, 1, |i, _| x0[i]);
        let tau = make_householder_in_place(&mut alpha, tail.as_mut());
        assert!(alpha.im == 0.0);

        // H^H [alpha0; x0] with v = [1; tail]
        let v = |i: usize| if i == 0 { c64::new(1.0, 0.0) } else { tail.read(i - 1, 0) };
        let y = |i: usize| if i == 0 { alpha0 } else { x0[i - 1] };
        let mut vhy = c64::new(0.0, 0.0);
        for i in 0..4 {
            vhy += v(i).conj() * y(i);
        }
        for i in 0..4 {
            let out = y(i) - tau.conj() * v(i) * vhy;
            let expected = if i == 0 { alpha } else { c64::new(0.0, 0.0) };
            assert_approx_eq!(out.re, expected.re);
            assert_approx_eq!(out.im, expected.im);
        }
    }

    #[test]
    fn larfg_identity_on_real_zero_tail() {
        let mut alpha = 2.5f64;
        let mut tail = Mat::<f64>::zeros(4, 1);
        let tau = make_householder_in_place(&mut alpha, tail.as_mut());
        assert!(tau == 0.0);
        assert!(alpha == 2.5);
    }
}
