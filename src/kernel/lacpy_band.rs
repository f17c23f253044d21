//! Copies between LAPACK band storage and dense tiles.
//!
//! In LAPACK band storage with leading dimension `ldab`, the element `(i, j)` of the matrix
//! lives at `j * ldab + d + i - j`, where `d` is the row of the main diagonal given by
//! [`band_diagonal_row`](crate::desc::band_diagonal_row). Moving one column to the right along a
//! matrix row moves `ldab - 1` elements forward, so the band elements of a tile are found at
//! `i + j * (ldab - 1)` from the storage position of the tile's first element. The kernels below
//! take the band buffer starting at that position.

use super::{check_len, check_ld};
use crate::{ComplexField, TileError, Uplo};
use core::ops::Range;

struct BandTile {
    kl: usize,
    ku: usize,
    row0: usize,
    col0: usize,
    // distance between two consecutive tile columns along a matrix row
    stride: usize,
}

impl BandTile {
    // local rows of column `j` that lie in the band
    #[inline]
    fn rows(&self, m: usize, j: usize) -> Range<usize> {
        let gj = self.col0 + j;
        let end = Ord::min(m, (gj + self.kl + 1).saturating_sub(self.row0));
        let start = gj.saturating_sub(self.ku).saturating_sub(self.row0);
        Ord::min(start, end)..end
    }

    // number of band elements spanned by the in-band part of an m×n tile
    fn window_len(&self, m: usize, n: usize) -> usize {
        (0..n)
            .filter_map(|j| {
                let rows = self.rows(m, j);
                (!rows.is_empty()).then_some(rows.end + j * self.stride)
            })
            .max()
            .unwrap_or(0)
    }
}

fn check_band<E>(
    uplo: Uplo,
    kl: usize,
    ku: usize,
    row0: usize,
    col0: usize,
    m: usize,
    n: usize,
    band: &[E],
    ldab: usize,
) -> Result<BandTile, TileError> {
    let (kl, ku) = match uplo {
        Uplo::General => (kl, ku),
        Uplo::Upper => (0, ku),
        Uplo::Lower => (kl, 0),
    };
    if ldab < kl + ku + 1 {
        return Err(TileError::InvalidArgument { arg: "ldab" });
    }
    let bt = BandTile {
        kl,
        ku,
        row0,
        col0,
        stride: ldab - 1,
    };
    if band.len() < bt.window_len(m, n) {
        return Err(TileError::InvalidArgument { arg: "band" });
    }
    Ok(bt)
}

/// Copies the `m×n` tile whose first element is the global element `(row0, col0)` out of LAPACK
/// band storage into the dense tile `tile`, with leading dimension `ldt`.
///
/// `band` starts at the storage position of element `(row0, col0)`, and must reach the last
/// in-band element of the tile. Elements of the tile outside the band are set to zero.
pub fn lacpy_band_to_tile<E: ComplexField>(
    uplo: Uplo,
    kl: usize,
    ku: usize,
    row0: usize,
    col0: usize,
    m: usize,
    n: usize,
    band: &[E],
    ldab: usize,
    tile: &mut [E],
    ldt: usize,
) -> Result<(), TileError> {
    check_ld(ldt, m, "ldt")?;
    let bt = check_band(uplo, kl, ku, row0, col0, m, n, band, ldab)?;
    check_len(tile.len(), m, n, ldt, "tile")?;

    for j in 0..n {
        let col = &mut tile[j * ldt..][..m];
        col.fill(E::tsl_zero());
        let rows = bt.rows(m, j);
        if rows.is_empty() {
            continue;
        }
        let src = &band[j * bt.stride..];
        col[rows.clone()].copy_from_slice(&src[rows]);
    }
    Ok(())
}

/// Copies the in-band elements of the dense `m×n` tile `tile` back into LAPACK band storage.
///
/// The tile's first element is the global element `(row0, col0)`, and `band` starts at its
/// storage position. Band storage elements outside the band are left untouched.
pub fn lacpy_tile_to_band<E: ComplexField>(
    uplo: Uplo,
    kl: usize,
    ku: usize,
    row0: usize,
    col0: usize,
    m: usize,
    n: usize,
    tile: &[E],
    ldt: usize,
    band: &mut [E],
    ldab: usize,
) -> Result<(), TileError> {
    check_ld(ldt, m, "ldt")?;
    let bt = check_band(uplo, kl, ku, row0, col0, m, n, band, ldab)?;
    check_len(tile.len(), m, n, ldt, "tile")?;

    for j in 0..n {
        let rows = bt.rows(m, j);
        if rows.is_empty() {
            continue;
        }
        let src = &tile[j * ldt..][..m];
        band[j * bt.stride..][rows.clone()].copy_from_slice(&src[rows]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{band_contains, band_diagonal_row};

    // dense matrix whose element (i, j) encodes its position
    fn value(i: usize, j: usize) -> f64 {
        (1 + i * 100 + j) as f64
    }

    fn pack(uplo: Uplo, n: usize, kl: usize, ku: usize, ldab: usize) -> Vec<f64> {
        let mut band = vec![-1.0; ldab * n];
        let diag = band_diagonal_row(uplo, ku);
        for j in 0..n {
            for i in 0..n {
                if band_contains(uplo, kl, ku, i, j) {
                    band[j * ldab + diag + i - j] = value(i, j);
                }
            }
        }
        band
    }

    // storage position of the global element (row0, col0)
    fn origin(uplo: Uplo, ku: usize, ldab: usize, row0: usize, col0: usize) -> usize {
        col0 * ldab + band_diagonal_row(uplo, ku) + row0 - col0
    }

    #[test]
    fn band_to_tile_zero_fills() {
        for uplo in [Uplo::General, Uplo::Upper, Uplo::Lower] {
            let (n, kl, ku, nb) = (9, 2, 1, 3);
            let ldab = kl + ku + 2;
            let band = pack(uplo, n, kl, ku, ldab);

            for (tm, tn) in [(0, 0), (1, 0), (0, 1), (2, 1), (1, 2), (2, 2)] {
                let (row0, col0) = (tm * nb, tn * nb);
                let mut tile = vec![f64::NAN; nb * nb];
                lacpy_band_to_tile(
                    uplo,
                    kl,
                    ku,
                    row0,
                    col0,
                    nb,
                    nb,
                    &band[origin(uplo, ku, ldab, row0, col0)..],
                    ldab,
                    &mut tile,
                    nb,
                )
                .unwrap();

                for j in 0..nb {
                    for i in 0..nb {
                        let (gi, gj) = (row0 + i, col0 + j);
                        let expected = if band_contains(uplo, kl, ku, gi, gj) {
                            value(gi, gj)
                        } else {
                            0.0
                        };
                        assert_eq!(tile[i + j * nb], expected);
                    }
                }
            }
        }
    }

    #[test]
    fn tile_to_band_leaves_padding() {
        let (n, kl, ku, nb) = (6, 1, 2, 3);
        let ldab = kl + ku + 3;
        let mut band = vec![-1.0; ldab * n];

        for tn in 0..2 {
            for tm in 0..2 {
                let (row0, col0) = (tm * nb, tn * nb);
                let tile: Vec<f64> = (0..nb * nb)
                    .map(|idx| value(row0 + idx % nb, col0 + idx / nb))
                    .collect();
                let start = origin(Uplo::General, ku, ldab, row0, col0);
                lacpy_tile_to_band(
                    Uplo::General,
                    kl,
                    ku,
                    row0,
                    col0,
                    nb,
                    nb,
                    &tile,
                    nb,
                    &mut band[start..],
                    ldab,
                )
                .unwrap();
            }
        }

        let expected = pack(Uplo::General, n, kl, ku, ldab);
        assert_eq!(band, expected);
    }

    #[test]
    fn general_band_starts_at_the_diagonal() {
        // 3×3 tridiagonal matrix, column 0 starts at its diagonal
        let ldab = 3;
        let band = [11.0, 21.0, 12.0, 22.0, 32.0, 23.0, 33.0];
        let mut tile = [f64::NAN; 9];
        lacpy_band_to_tile(Uplo::General, 1, 1, 0, 0, 3, 3, &band, ldab, &mut tile, 3).unwrap();
        assert_eq!(tile, [11.0, 21.0, 0.0, 12.0, 22.0, 32.0, 0.0, 23.0, 33.0]);
    }

    #[test]
    fn window_only_needs_the_band_elements() {
        let (kl, ku, ldab, nb) = (1, 1, 3, 2);
        // tile (1, 0) of a 4×4 tridiagonal matrix only holds the element (2, 1)
        let band = [7.0];
        let mut tile = [f64::NAN; 4];
        lacpy_band_to_tile(Uplo::General, kl, ku, nb, 0, nb, nb, &band, ldab, &mut tile, nb)
            .unwrap_err();
        let band = [0.0, 0.0, 7.0];
        lacpy_band_to_tile(Uplo::General, kl, ku, nb, 0, nb, nb, &band, ldab, &mut tile, nb)
            .unwrap();
        assert_eq!(tile, [0.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn rejects_invalid_arguments() {
        let band = vec![0.0f64; 12];
        let mut tile = vec![0.0f64; 9];
        assert_eq!(
            lacpy_band_to_tile(Uplo::General, 1, 1, 0, 0, 3, 3, &band, 2, &mut tile, 3),
            Err(TileError::InvalidArgument { arg: "ldab" })
        );
        // the upper shape ignores kl
        assert_eq!(
            lacpy_band_to_tile(Uplo::Upper, 5, 1, 0, 0, 3, 3, &band, 2, &mut tile, 3),
            Ok(())
        );
        assert_eq!(
            lacpy_band_to_tile(Uplo::General, 1, 1, 0, 0, 3, 3, &band, 3, &mut tile, 2),
            Err(TileError::InvalidArgument { arg: "ldt" })
        );
        // the last in-band element, (2, 2), lives at 2 + 2 * 4
        assert_eq!(
            lacpy_band_to_tile(Uplo::General, 1, 1, 0, 0, 3, 3, &band[..10], 5, &mut tile, 3),
            Err(TileError::InvalidArgument { arg: "band" })
        );
        assert_eq!(
            lacpy_band_to_tile(Uplo::General, 1, 1, 0, 0, 3, 3, &band[..11], 5, &mut tile, 3),
            Ok(())
        );
    }
}
