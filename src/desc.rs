//! Tile descriptors.
//!
//! A [`TileDesc`] partitions an `m×n` matrix into a grid of `mb×nb` tiles and computes where
//! each tile lives in the backing buffer. The descriptor holds no data: it is built once per
//! operation, copied freely, and combined with a slice to produce tile views.
//!
//! Dense matrices can be stored in LAPACK column-major order or tile by tile. Band matrices can
//! be stored in LAPACK band storage, where element `(i, j)` lives at row `off + i - j` of column
//! `j` (see [`band_diagonal_row`]), or tile by tile, in which case only the tiles that intersect
//! the band are stored.

use crate::{
    mat::{column_major_span, MatMut, MatRef},
    utils::DivCeil,
    TileError, Uplo,
};
use core::ops::Range;

/// Storage scheme of the matrix described by a [`TileDesc`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Column-major storage with leading dimension `ld`. For band descriptors, this is LAPACK
    /// band storage and `ld` is the number of stored diagonals, at least.
    Lapack { ld: usize },
    /// Tile-major storage. Each tile occupies `mb * nb` contiguous elements, with leading
    /// dimension `mb`.
    Tile,
}

/// Returns true when the element `(i, j)` of a band matrix with `kl` sub-diagonals and `ku`
/// super-diagonals is stored, given the shape `uplo`.
#[inline]
pub fn band_contains(uplo: Uplo, kl: usize, ku: usize, i: usize, j: usize) -> bool {
    match uplo {
        Uplo::General => i + ku >= j && i <= j + kl,
        Uplo::Upper => i + ku >= j && i <= j,
        Uplo::Lower => i >= j && i <= j + kl,
    }
}

/// Row of the main diagonal in LAPACK band storage.
///
/// Upper band matrices keep the `ku` super-diagonals above the diagonal in each column. General
/// band matrices are addressed from the main diagonal of the first column: element `(i, j)`
/// lives at index `j * ld + i - j`, so a buffer in standard `gb` storage is passed starting at
/// row `ku` of its first column, and the super-diagonals of column `j` are found at the end of
/// column `j - 1`.
#[inline]
pub fn band_diagonal_row(uplo: Uplo, ku: usize) -> usize {
    match uplo {
        Uplo::Upper => ku,
        Uplo::General | Uplo::Lower => 0,
    }
}

/// Position and shape of a tile in the backing buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileLoc {
    /// Index of the first element of the tile.
    pub offset: usize,
    /// Number of rows, clipped at the bottom edge of the matrix.
    pub nrows: usize,
    /// Number of columns, clipped at the right edge of the matrix.
    pub ncols: usize,
    /// Distance between two consecutive columns of the tile.
    pub ld: usize,
}

impl TileLoc {
    /// Range of buffer indices spanned by the tile.
    #[inline]
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + column_major_span(self.nrows, self.ncols, self.ld)
    }
}

/// Partition of a matrix into tiles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileDesc {
    uplo: Uplo,
    band: bool,
    m: usize,
    n: usize,
    mb: usize,
    nb: usize,
    mt: usize,
    nt: usize,
    kl: usize,
    ku: usize,
    klt: usize,
    kut: usize,
    layout: Layout,
}

impl TileDesc {
    /// Describes a dense `m×n` matrix split into `mb×nb` tiles.
    pub fn general(
        m: usize,
        n: usize,
        mb: usize,
        nb: usize,
        layout: Layout,
    ) -> Result<Self, TileError> {
        if mb == 0 {
            return Err(TileError::InvalidArgument { arg: "mb" });
        }
        if nb == 0 {
            return Err(TileError::InvalidArgument { arg: "nb" });
        }
        if let Layout::Lapack { ld } = layout {
            if ld < Ord::max(1, m) {
                return Err(TileError::InvalidArgument { arg: "ld" });
            }
        }
        Ok(Self {
            uplo: Uplo::General,
            band: false,
            m,
            n,
            mb,
            nb,
            mt: m.msrv_div_ceil(mb),
            nt: n.msrv_div_ceil(nb),
            kl: m.saturating_sub(1),
            ku: n.saturating_sub(1),
            klt: 0,
            kut: 0,
            layout,
        })
    }

    /// Describes an `m×n` band matrix with `kl` sub-diagonals and `ku` super-diagonals, split
    /// into `mb×nb` tiles.
    ///
    /// For `Uplo::Upper` only the upper part of the band is stored and `kl` is ignored, for
    /// `Uplo::Lower` only the lower part is stored and `ku` is ignored. Band descriptors require
    /// square tiles.
    pub fn band(
        uplo: Uplo,
        m: usize,
        n: usize,
        mb: usize,
        nb: usize,
        kl: usize,
        ku: usize,
        layout: Layout,
    ) -> Result<Self, TileError> {
        if mb == 0 {
            return Err(TileError::InvalidArgument { arg: "mb" });
        }
        if nb != mb {
            return Err(TileError::InvalidArgument { arg: "nb" });
        }
        let (kl, ku) = match uplo {
            Uplo::General => (kl, ku),
            Uplo::Upper => (0, ku),
            Uplo::Lower => (kl, 0),
        };
        if let Layout::Lapack { ld } = layout {
            if ld < kl + ku + 1 {
                return Err(TileError::InvalidArgument { arg: "ld" });
            }
        }

        let (kut, klt) = match uplo {
            Uplo::General => ((ku + kl).msrv_div_ceil(nb) + 1, kl.msrv_div_ceil(nb) + 1),
            Uplo::Upper => (ku.msrv_div_ceil(nb) + 1, 1),
            Uplo::Lower => (1, kl.msrv_div_ceil(nb) + 1),
        };

        Ok(Self {
            uplo,
            band: true,
            m,
            n,
            mb,
            nb,
            mt: m.msrv_div_ceil(mb),
            nt: n.msrv_div_ceil(nb),
            kl,
            ku,
            klt,
            kut,
            layout,
        })
    }

    /// Returns the shape tag of the descriptor.
    #[inline]
    pub fn uplo(&self) -> Uplo {
        self.uplo
    }
    /// Returns true for band descriptors.
    #[inline]
    pub fn is_band(&self) -> bool {
        self.band
    }
    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.m
    }
    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.n
    }
    /// Returns the number of rows of a full tile.
    #[inline]
    pub fn mb(&self) -> usize {
        self.mb
    }
    /// Returns the number of columns of a full tile.
    #[inline]
    pub fn nb(&self) -> usize {
        self.nb
    }
    /// Returns the number of tile rows.
    #[inline]
    pub fn mt(&self) -> usize {
        self.mt
    }
    /// Returns the number of tile columns.
    #[inline]
    pub fn nt(&self) -> usize {
        self.nt
    }
    /// Returns the number of sub-diagonals.
    #[inline]
    pub fn kl(&self) -> usize {
        self.kl
    }
    /// Returns the number of super-diagonals.
    #[inline]
    pub fn ku(&self) -> usize {
        self.ku
    }
    /// Number of stored tile rows below and including the diagonal tile, for band descriptors.
    #[inline]
    pub fn klt(&self) -> usize {
        self.klt
    }
    /// Number of stored tile rows above and including the diagonal tile, for band descriptors.
    #[inline]
    pub fn kut(&self) -> usize {
        self.kut
    }
    /// Returns the storage scheme.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of rows of the tiles in tile row `m`.
    #[inline]
    pub fn tile_nrows(&self, m: usize) -> usize {
        Ord::min(self.mb, self.m.saturating_sub(m * self.mb))
    }

    /// Number of columns of the tiles in tile column `n`.
    #[inline]
    pub fn tile_ncols(&self, n: usize) -> usize {
        Ord::min(self.nb, self.n.saturating_sub(n * self.nb))
    }

    /// Range of tile rows of tile column `n` that intersect the band.
    ///
    /// Covers every tile row for dense descriptors. For general band matrices the range reaches
    /// `ku + kl` rows above the diagonal, leaving room for the fill-in of pivoting
    /// factorizations.
    pub fn band_tile_rows(&self, n: usize) -> Range<usize> {
        if !self.band {
            return 0..self.mt;
        }
        if self.m == 0 || n >= self.nt {
            return 0..0;
        }
        let nb = self.nb;
        let (start, end) = match self.uplo {
            Uplo::General => (
                (n * nb).saturating_sub(self.ku + self.kl) / nb,
                Ord::min(self.m - 1, (n + 1) * nb + self.kl - 1) / nb,
            ),
            Uplo::Upper => (
                (n * nb).saturating_sub(self.ku) / nb,
                Ord::min(self.m - 1, (n + 1) * nb - 1) / nb,
            ),
            Uplo::Lower => (n, Ord::min(self.m - 1, (n + 1) * nb + self.kl - 1) / nb),
        };
        start..end + 1
    }

    /// Number of addressable tiles.
    pub fn tile_count(&self) -> usize {
        (0..self.nt).map(|n| self.band_tile_rows(n).len()).sum()
    }

    #[inline]
    fn band_offset(&self) -> usize {
        band_diagonal_row(self.uplo, self.ku)
    }

    /// Computes the location of tile `(m, n)`.
    ///
    /// For band descriptors in LAPACK storage, `ld` is the distance between consecutive columns
    /// of the tile *along a matrix row*, that is, one less than the leading dimension of the band
    /// storage. Only the in-band elements of such a tile may be accessed.
    pub fn tile(&self, m: usize, n: usize) -> Result<TileLoc, TileError> {
        if m >= self.mt || n >= self.nt || !self.band_tile_rows(n).contains(&m) {
            return Err(TileError::InvalidIndex { m, n });
        }
        let nrows = self.tile_nrows(m);
        let ncols = self.tile_ncols(n);
        let (mb, nb) = (self.mb, self.nb);

        let (offset, ld) = match (self.band, self.layout) {
            (false, Layout::Lapack { ld }) => (nb * n * ld + mb * m, ld),
            (false, Layout::Tile) => ((m + n * self.mt) * mb * nb, mb),
            // ld * nb * n + off + mb * (m - n), with mb == nb
            (true, Layout::Lapack { ld }) => {
                (nb * n * (ld - 1) + self.band_offset() + mb * m, ld - 1)
            }
            (true, Layout::Tile) => {
                let slot = self.kut - 1 + m - n;
                ((n * self.band_slots() + slot) * mb * nb, mb)
            }
        };

        Ok(TileLoc {
            offset,
            nrows,
            ncols,
            ld,
        })
    }

    // stored tiles per tile column
    #[inline]
    fn band_slots(&self) -> usize {
        self.kut + self.klt - 1
    }

    /// Length of the buffer needed to hold the matrix with this layout.
    pub fn required_len(&self) -> usize {
        match (self.band, self.layout) {
            (false, Layout::Lapack { ld }) => column_major_span(self.m, self.n, ld),
            (false, Layout::Tile) => self.mt * self.nt * self.mb * self.nb,
            (true, Layout::Lapack { ld }) => match self.n {
                0 => 0,
                n => (n - 1) * ld + self.band_offset() + self.kl + 1,
            },
            (true, Layout::Tile) => self.nt * self.band_slots() * self.mb * self.nb,
        }
    }

    /// Returns true when the global element `(i, j)` lies in the stored band.
    #[inline]
    pub fn in_band(&self, i: usize, j: usize) -> bool {
        !self.band || band_contains(self.uplo, self.kl, self.ku, i, j)
    }

    fn check_view(&self, len: usize, loc: &TileLoc) -> Result<(), TileError> {
        if self.band && matches!(self.layout, Layout::Lapack { .. }) {
            return Err(TileError::InvalidArgument { arg: "layout" });
        }
        if loc.span().end > len {
            return Err(TileError::InvalidArgument { arg: "data" });
        }
        Ok(())
    }

    /// Returns a view over tile `(m, n)` of `data`.
    ///
    /// Fails for band descriptors in LAPACK storage, whose tiles are not rectangular arrays.
    pub fn tile_ref<'a, E: Copy>(
        &self,
        data: &'a [E],
        m: usize,
        n: usize,
    ) -> Result<MatRef<'a, E>, TileError> {
        let loc = self.tile(m, n)?;
        self.check_view(data.len(), &loc)?;
        Ok(MatRef::from_column_major_slice_with_stride(
            &data[loc.offset..loc.span().end],
            loc.nrows,
            loc.ncols,
            loc.ld,
        ))
    }

    /// Returns a mutable view over tile `(m, n)` of `data`.
    ///
    /// Fails for band descriptors in LAPACK storage, whose tiles are not rectangular arrays.
    pub fn tile_mut<'a, E: Copy>(
        &self,
        data: &'a mut [E],
        m: usize,
        n: usize,
    ) -> Result<MatMut<'a, E>, TileError> {
        let loc = self.tile(m, n)?;
        self.check_view(data.len(), &loc)?;
        let end = loc.span().end;
        Ok(MatMut::from_column_major_slice_with_stride_mut(
            &mut data[loc.offset..end],
            loc.nrows,
            loc.ncols,
            loc.ld,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // buffer indices of the in-band elements of every tile, checked for overlap and bounds
    fn check_injective(desc: TileDesc) {
        let mut seen = HashSet::new();
        let len = desc.required_len();
        let band_lapack = desc.is_band() && matches!(desc.layout(), Layout::Lapack { .. });
        for n in 0..desc.nt() {
            for m in desc.band_tile_rows(n) {
                let loc = desc.tile(m, n).unwrap();
                for j in 0..loc.ncols {
                    for i in 0..loc.nrows {
                        let (gi, gj) = (m * desc.mb() + i, n * desc.nb() + j);
                        if band_lapack && !desc.in_band(gi, gj) {
                            continue;
                        }
                        let idx = loc.offset + i + j * loc.ld;
                        assert!(idx < len);
                        assert!(seen.insert(idx), "tile ({m}, {n}) aliases element {idx}");
                        if band_lapack {
                            let Layout::Lapack { ld } = desc.layout() else {
                                unreachable!()
                            };
                            assert_eq!(idx + gj, gj * ld + desc.band_offset() + gi);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn dense_tiles_are_disjoint() {
        for (m, n, mb, nb) in [(10, 7, 3, 2), (8, 8, 4, 4), (1, 9, 5, 5), (0, 3, 2, 2)] {
            check_injective(TileDesc::general(m, n, mb, nb, Layout::Tile).unwrap());
            check_injective(TileDesc::general(m, n, mb, nb, Layout::Lapack { ld: m + 2 }).unwrap());
        }
    }

    #[test]
    fn band_tiles_are_disjoint() {
        for uplo in [Uplo::General, Uplo::Upper, Uplo::Lower] {
            for (n, nb, kl, ku) in [(10, 3, 2, 3), (9, 4, 0, 5), (12, 2, 3, 0), (7, 7, 1, 1)] {
                let ld = kl + ku + 1;
                check_injective(
                    TileDesc::band(uplo, n, n, nb, nb, kl, ku, Layout::Lapack { ld }).unwrap(),
                );
                check_injective(TileDesc::band(uplo, n, n, nb, nb, kl, ku, Layout::Tile).unwrap());
            }
        }
    }

    #[test]
    fn lapack_band_addressing() {
        let (n, kl, ku) = (6, 1, 2);
        let ld = kl + ku + 1;
        let layout = Layout::Lapack { ld };

        // general: column 0 starts at its diagonal
        let g = TileDesc::band(Uplo::General, n, n, 2, 2, kl, ku, layout).unwrap();
        let loc = g.tile(0, 0).unwrap();
        assert_eq!((loc.offset, loc.ld), (0, ld - 1));
        // (1, 0) right below the diagonal, (0, 1) at the end of column 0
        assert_eq!(loc.offset + 1, 1);
        assert_eq!(loc.offset + loc.ld, ld - 1);
        assert_eq!(g.tile(1, 1).unwrap().offset, 2 * ld);
        assert_eq!(g.required_len(), (n - 1) * ld + kl + 1);

        let u = TileDesc::band(Uplo::Upper, n, n, 2, 2, kl, ku, Layout::Lapack { ld: ku + 1 })
            .unwrap();
        assert_eq!(u.tile(0, 0).unwrap().offset, ku);
        assert_eq!(u.required_len(), n * (ku + 1));

        let l = TileDesc::band(Uplo::Lower, n, n, 2, 2, kl, ku, Layout::Lapack { ld: kl + 1 })
            .unwrap();
        assert_eq!(l.tile(1, 0).unwrap().offset, 2);
        assert_eq!(l.required_len(), n * (kl + 1));
    }

    #[test]
    fn band_tile_rows_follow_shape() {
        let g = TileDesc::band(Uplo::General, 20, 20, 4, 4, 3, 2, Layout::Tile).unwrap();
        assert_eq!(g.kut(), 3);
        assert_eq!(g.klt(), 2);
        assert_eq!(g.band_tile_rows(0), 0..2);
        assert_eq!(g.band_tile_rows(3), 1..5);
        assert_eq!(g.band_tile_rows(4), 2..5);

        let u = TileDesc::band(Uplo::Upper, 20, 20, 4, 4, 3, 5, Layout::Tile).unwrap();
        assert_eq!(u.band_tile_rows(3), 1..4);
        let l = TileDesc::band(Uplo::Lower, 20, 20, 4, 4, 5, 3, Layout::Tile).unwrap();
        assert_eq!(l.band_tile_rows(3), 3..5);
    }

    #[test]
    fn invalid_indices_and_arguments() {
        let d = TileDesc::band(Uplo::Lower, 8, 8, 2, 2, 1, 0, Layout::Tile).unwrap();
        assert_eq!(d.tile(0, 2), Err(TileError::InvalidIndex { m: 0, n: 2 }));
        assert_eq!(d.tile(4, 0), Err(TileError::InvalidIndex { m: 4, n: 0 }));
        assert!(d.tile(1, 0).is_ok());

        assert_eq!(
            TileDesc::band(Uplo::General, 8, 8, 2, 3, 1, 1, Layout::Tile),
            Err(TileError::InvalidArgument { arg: "nb" })
        );
        assert_eq!(
            TileDesc::band(Uplo::General, 8, 8, 2, 2, 1, 1, Layout::Lapack { ld: 2 }),
            Err(TileError::InvalidArgument { arg: "ld" })
        );
        assert_eq!(
            TileDesc::general(8, 8, 2, 2, Layout::Lapack { ld: 7 }),
            Err(TileError::InvalidArgument { arg: "ld" })
        );
    }

    #[test]
    fn clipped_edge_tiles() {
        let d = TileDesc::general(10, 7, 4, 3, Layout::Lapack { ld: 10 }).unwrap();
        let loc = d.tile(2, 2).unwrap();
        assert_eq!((loc.nrows, loc.ncols), (2, 1));
        assert_eq!(loc.offset, 3 * 2 * 10 + 4 * 2);

        let data: Vec<f64> = (0..d.required_len()).map(|x| x as f64).collect();
        let view = d.tile_ref(&data, 1, 1).unwrap();
        assert_eq!(view.read(0, 0), (3 * 10 + 4) as f64);
        assert_eq!(view.read(1, 2), (5 * 10 + 5) as f64);
    }
}
