//! Task wrappers around the tile kernels.
//!
//! Each `insert_*` function declares the memory footprint of one kernel call and submits it to
//! a [`TaskGraph`]. The kernel runs later, when [`TaskGraph::run`] reaches it.
//!
//! Tiles written by a task are passed as [`Tile`] handles over a [`SharedMut`] buffer, since
//! several tasks may hold handles into the same buffer at the same time. The footprints
//! declared here are what makes the accesses performed through these handles race free.
//!
//! The factorization tasks (`tslqt`, `tsmlq`, `gelqt`, `unmlq`) allocate their workspace when
//! they start. Argument errors and allocation failures are reported on the diagnostic channel,
//! and the task then does nothing; the sequence is left untouched. The copy tasks report their
//! failures through the sequence instead, which cancels the rest of the operation.

use super::{
    check_ld,
    gelqt::{gelqt_in_place, gelqt_req},
    lacpy_band_to_tile, lacpy_tile_to_band,
    tslqt::{tslqt_in_place, tslqt_req},
    tsmlq::{tsmlq_in_place, tsmlq_req},
    unmlq::{unmlq_in_place, unmlq_req},
};
use crate::{
    desc::TileLoc,
    mat::column_major_span,
    report,
    sched::{Dep, Region, Request, Sequence, TaskGraph},
    ComplexField, MatMut, MatRef, TileError, Uplo,
};
use core::{marker::PhantomData, ops::Range};
use dyn_stack::{GlobalPodBuffer, PodStack, SizeOverflow, StackReq};

/// Mutable buffer shared by the tasks of a graph.
///
/// Only the tasks access the elements, each within the footprint it declared.
pub struct SharedMut<'a, E> {
    ptr: *mut E,
    len: usize,
    __marker: PhantomData<&'a mut [E]>,
}

impl<E> Copy for SharedMut<'_, E> {}
impl<E> Clone for SharedMut<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

unsafe impl<E: Send> Send for SharedMut<'_, E> {}
unsafe impl<E: Send + Sync> Sync for SharedMut<'_, E> {}

impl<E> core::fmt::Debug for SharedMut<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedMut")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

impl<'a, E> SharedMut<'a, E> {
    #[inline]
    pub fn new(data: &'a mut [E]) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            __marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Region covering the elements `range` of the buffer, clipped to its length.
    #[inline]
    pub fn region(&self, range: Range<usize>) -> Region {
        let end = Ord::min(range.end, self.len);
        let start = Ord::min(range.start, end);
        Region::of(self.ptr as *const E, start..end)
    }

    /// Handle over the tile at `loc`.
    pub fn tile(self, loc: TileLoc) -> Result<Tile<'a, E>, TileError> {
        if loc.span().end > self.len {
            return Err(TileError::InvalidArgument { arg: "data" });
        }
        Ok(Tile { data: self, loc })
    }

    /// # Safety
    /// `range` must be in bounds, and covered by a write footprint of the calling task.
    #[inline]
    unsafe fn slice_mut(&self, range: Range<usize>) -> &'a mut [E] {
        core::slice::from_raw_parts_mut(self.ptr.add(range.start), range.len())
    }
}

/// Handle over one tile of a [`SharedMut`] buffer.
pub struct Tile<'a, E> {
    data: SharedMut<'a, E>,
    loc: TileLoc,
}

impl<E> Copy for Tile<'_, E> {}
impl<E> Clone for Tile<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> core::fmt::Debug for Tile<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tile").field("loc", &self.loc).finish()
    }
}

impl<'a, E: Copy> Tile<'a, E> {
    #[inline]
    pub fn loc(&self) -> TileLoc {
        self.loc
    }

    /// Region of an `nrows×ncols` window starting at the tile origin, with the tile's leading
    /// dimension, and never smaller than the tile itself.
    pub fn footprint(&self, nrows: usize, ncols: usize) -> Region {
        let nrows = Ord::max(nrows, self.loc.nrows);
        let ncols = Ord::max(ncols, self.loc.ncols);
        let start = self.loc.offset;
        self.data
            .region(start..start + column_major_span(nrows, ncols, self.loc.ld))
    }

    fn check_shape(&self, nrows: usize, ncols: usize, arg: &'static str) -> Result<(), TileError> {
        if nrows > self.loc.nrows || ncols > self.loc.ncols {
            Err(TileError::InvalidArgument { arg })
        } else {
            Ok(())
        }
    }

    /// # Safety
    /// The tile must be covered by a write footprint of the calling task, and `nrows×ncols`
    /// must fit in the tile.
    #[inline]
    unsafe fn view_mut(&self, nrows: usize, ncols: usize) -> MatMut<'a, E> {
        MatMut::from_raw_parts_mut(
            self.data.ptr.add(self.loc.offset),
            nrows,
            ncols,
            1,
            self.loc.ld as isize,
        )
    }

    /// # Safety
    /// The tile must be covered by a footprint of the calling task, and `nrows×ncols` must fit
    /// in the tile.
    #[inline]
    unsafe fn view(&self, nrows: usize, ncols: usize) -> MatRef<'a, E> {
        MatRef::from_raw_parts(
            self.data.ptr.add(self.loc.offset) as *const E,
            nrows,
            ncols,
            1,
            self.loc.ld as isize,
        )
    }
}

fn alloc(req: Result<StackReq, SizeOverflow>) -> Result<GlobalPodBuffer, TileError> {
    let req = req.map_err(|_| TileError::OutOfMemory)?;
    GlobalPodBuffer::try_new(req).map_err(|_| TileError::OutOfMemory)
}

/// Submits the factorization of the coupled pair `[a1 a2]`, see [`tslqt`](super::tslqt).
///
/// Declares `a1` and `a2` as read-write `nb×nb` windows and `t` as a write-only `ib×nb` window.
pub fn insert_tslqt<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    sequence: &'a Sequence,
    m: usize,
    n: usize,
    ib: usize,
    nb: usize,
    a1: Tile<'a, E>,
    a2: Tile<'a, E>,
    t: Tile<'a, E>,
) {
    let deps = vec![
        Dep::read_write(a1.footprint(nb, nb)),
        Dep::read_write(a2.footprint(nb, nb)),
        Dep::write(t.footprint(ib, nb)),
    ];
    graph.submit(sequence, deps, move || {
        if let Err(err) = run_tslqt(m, n, ib, a1, a2, t) {
            report("tslqt", err);
        }
    });
}

fn run_tslqt<E: ComplexField>(
    m: usize,
    n: usize,
    ib: usize,
    a1: Tile<'_, E>,
    a2: Tile<'_, E>,
    t: Tile<'_, E>,
) -> Result<(), TileError> {
    check_ld(a1.loc.ld, m, "lda1")?;
    check_ld(a2.loc.ld, m, "lda2")?;
    let ib = Ord::min(ib, m);
    check_ld(t.loc.ld, ib, "ldt")?;
    if m == 0 || n == 0 || ib == 0 {
        return Ok(());
    }
    a1.check_shape(m, m, "a1")?;
    a2.check_shape(m, n, "a2")?;
    t.check_shape(ib, m, "t")?;

    let mut mem = alloc(tslqt_req::<E>(m, ib))?;
    // SAFETY: the three tiles are covered by the footprints declared in `insert_tslqt`
    unsafe {
        tslqt_in_place(
            a1.view_mut(m, m),
            a2.view_mut(m, n),
            t.view_mut(ib, m),
            ib,
            PodStack::new(&mut mem),
        );
    }
    Ok(())
}

/// Submits the application of the reflectors `v`, `t` produced by a coupled factorization to
/// the coupled pair `[b1 b2]`, see [`tsmlq`](super::tsmlq).
///
/// `b1` is `m×k`, `b2` is `m×n`, `v` is `k×n`.
pub fn insert_tsmlq<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    sequence: &'a Sequence,
    m: usize,
    n: usize,
    k: usize,
    ib: usize,
    nb: usize,
    b1: Tile<'a, E>,
    b2: Tile<'a, E>,
    v: Tile<'a, E>,
    t: Tile<'a, E>,
) {
    let deps = vec![
        Dep::read_write(b1.footprint(nb, nb)),
        Dep::read_write(b2.footprint(nb, nb)),
        Dep::read(v.footprint(nb, nb)),
        Dep::read(t.footprint(ib, nb)),
    ];
    graph.submit(sequence, deps, move || {
        if let Err(err) = run_tsmlq(m, n, k, ib, b1, b2, v, t) {
            report("tsmlq", err);
        }
    });
}

fn run_tsmlq<E: ComplexField>(
    m: usize,
    n: usize,
    k: usize,
    ib: usize,
    b1: Tile<'_, E>,
    b2: Tile<'_, E>,
    v: Tile<'_, E>,
    t: Tile<'_, E>,
) -> Result<(), TileError> {
    let ib = Ord::min(ib, k);
    check_ld(b1.loc.ld, m, "ldb1")?;
    check_ld(b2.loc.ld, m, "ldb2")?;
    check_ld(v.loc.ld, k, "ldv")?;
    check_ld(t.loc.ld, ib, "ldt")?;
    if m == 0 || n == 0 || k == 0 || ib == 0 {
        return Ok(());
    }
    b1.check_shape(m, k, "b1")?;
    b2.check_shape(m, n, "b2")?;
    v.check_shape(k, n, "v")?;
    t.check_shape(ib, k, "t")?;

    let mut mem = alloc(tsmlq_req::<E>(m, ib))?;
    // SAFETY: `b1` and `b2` are covered by write footprints, `v` and `t` by read footprints.
    // `v` may share its tile column with `b2`, but never its elements.
    unsafe {
        tsmlq_in_place(
            b1.view_mut(m, k),
            b2.view_mut(m, n),
            v.view(k, n),
            t.view(ib, k),
            ib,
            PodStack::new(&mut mem),
        );
    }
    Ok(())
}

/// Submits the LQ factorization of the `m×n` tile `a`, see [`gelqt`](super::gelqt).
pub fn insert_gelqt<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    sequence: &'a Sequence,
    m: usize,
    n: usize,
    ib: usize,
    nb: usize,
    a: Tile<'a, E>,
    t: Tile<'a, E>,
) {
    let deps = vec![
        Dep::read_write(a.footprint(nb, nb)),
        Dep::write(t.footprint(ib, nb)),
    ];
    graph.submit(sequence, deps, move || {
        if let Err(err) = run_gelqt(m, n, ib, a, t) {
            report("gelqt", err);
        }
    });
}

fn run_gelqt<E: ComplexField>(
    m: usize,
    n: usize,
    ib: usize,
    a: Tile<'_, E>,
    t: Tile<'_, E>,
) -> Result<(), TileError> {
    let k = Ord::min(m, n);
    check_ld(a.loc.ld, m, "lda")?;
    let ib = Ord::min(ib, k);
    check_ld(t.loc.ld, ib, "ldt")?;
    if m == 0 || n == 0 || ib == 0 {
        return Ok(());
    }
    a.check_shape(m, n, "a")?;
    t.check_shape(ib, k, "t")?;

    let mut mem = alloc(gelqt_req::<E>(m, ib))?;
    // SAFETY: both tiles are covered by the footprints declared in `insert_gelqt`
    unsafe {
        gelqt_in_place(
            a.view_mut(m, n),
            t.view_mut(ib, k),
            ib,
            PodStack::new(&mut mem),
        );
    }
    Ok(())
}

/// Submits the application of the reflectors `a`, `t` produced by [`gelqt`](super::gelqt) to
/// the `m×n` tile `c`, see [`unmlq`](super::unmlq).
pub fn insert_unmlq<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    sequence: &'a Sequence,
    m: usize,
    n: usize,
    k: usize,
    ib: usize,
    nb: usize,
    a: Tile<'a, E>,
    t: Tile<'a, E>,
    c: Tile<'a, E>,
) {
    let deps = vec![
        Dep::read(a.footprint(nb, nb)),
        Dep::read(t.footprint(ib, nb)),
        Dep::read_write(c.footprint(nb, nb)),
    ];
    graph.submit(sequence, deps, move || {
        if let Err(err) = run_unmlq(m, n, k, ib, a, t, c) {
            report("unmlq", err);
        }
    });
}

fn run_unmlq<E: ComplexField>(
    m: usize,
    n: usize,
    k: usize,
    ib: usize,
    a: Tile<'_, E>,
    t: Tile<'_, E>,
    c: Tile<'_, E>,
) -> Result<(), TileError> {
    if k > n {
        return Err(TileError::InvalidArgument { arg: "k" });
    }
    check_ld(a.loc.ld, k, "lda")?;
    let ib = Ord::min(ib, k);
    check_ld(t.loc.ld, ib, "ldt")?;
    check_ld(c.loc.ld, m, "ldc")?;
    if m == 0 || n == 0 || k == 0 || ib == 0 {
        return Ok(());
    }
    a.check_shape(k, n, "a")?;
    t.check_shape(ib, k, "t")?;
    c.check_shape(m, n, "c")?;

    let mut mem = alloc(unmlq_req::<E>(m, ib))?;
    // SAFETY: `c` is covered by a write footprint, `a` and `t` by read footprints
    unsafe {
        unmlq_in_place(
            c.view_mut(m, n),
            a.view(k, n),
            t.view(ib, k),
            ib,
            PodStack::new(&mut mem),
        );
    }
    Ok(())
}

/// Submits the copy of one tile out of LAPACK band storage, see
/// [`lacpy_band_to_tile`](super::lacpy_band_to_tile).
///
/// `band` starts at the storage position of the tile origin, the global element `(row0, col0)`.
/// A failure is recorded in `sequence` and `request`.
pub fn insert_lacpy_band_to_tile<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    sequence: &'a Sequence,
    request: &'a Request,
    uplo: Uplo,
    kl: usize,
    ku: usize,
    row0: usize,
    col0: usize,
    band: &'a [E],
    ldab: usize,
    tile: Tile<'a, E>,
) {
    let loc = tile.loc;
    let deps = vec![
        Dep::read(Region::of_slice(band)),
        Dep::write(tile.data.region(loc.span())),
    ];
    graph.submit(sequence, deps, move || {
        // SAFETY: the span of the tile is covered by a write footprint
        let dst = unsafe { tile.data.slice_mut(loc.span()) };
        let result = lacpy_band_to_tile(
            uplo, kl, ku, row0, col0, loc.nrows, loc.ncols, band, ldab, dst, loc.ld,
        );
        if let Err(err) = result {
            sequence.fail(request, err);
        }
    });
}

/// Submits the copy of one tile back into LAPACK band storage, see
/// [`lacpy_tile_to_band`](super::lacpy_tile_to_band).
///
/// `tile` holds the span of the tile described by `loc`, relative to `tile`. `window` is the range
/// of `band` that starts at the storage position of the tile origin and covers its in-band
/// elements. A failure is recorded in `sequence` and `request`.
pub fn insert_lacpy_tile_to_band<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    sequence: &'a Sequence,
    request: &'a Request,
    uplo: Uplo,
    kl: usize,
    ku: usize,
    row0: usize,
    col0: usize,
    tile: &'a [E],
    loc: TileLoc,
    band: SharedMut<'a, E>,
    window: Range<usize>,
    ldab: usize,
) {
    let deps = vec![
        Dep::read(Region::of_slice(tile)),
        Dep::write(band.region(window.clone())),
    ];
    graph.submit(sequence, deps, move || {
        if window.start > window.end || window.end > band.len() {
            sequence.fail(request, TileError::InvalidArgument { arg: "band" });
            return;
        }
        // SAFETY: `window` is in bounds and covered by a write footprint
        let dst = unsafe { band.slice_mut(window) };
        let result = lacpy_tile_to_band(
            uplo, kl, ku, row0, col0, loc.nrows, loc.ncols, tile, loc.ld, dst, ldab,
        );
        if let Err(err) = result {
            sequence.fail(request, err);
        }
    });
}
