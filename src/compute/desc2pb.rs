use super::{check_band_pair, sequence_is_ok};
use crate::{
    desc::{Layout, TileDesc, TileLoc},
    kernel::task::{insert_lacpy_tile_to_band, SharedMut},
    sched::{Request, Sequence, TaskGraph},
    ComplexField, Config, TileError,
};

/// Submits the conversion of a band matrix from tile storage back to LAPACK band storage.
///
/// This is the inverse of [`pb2desc`](super::pb2desc): `tiles` is described by `src`, in
/// [`Layout::Tile`] storage, and `band` by `dst`, in [`Layout::Lapack`] storage. Only the
/// in-band elements of `band` are written.
pub fn desc2pb<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    tiles: &'a [E],
    src: TileDesc,
    band: SharedMut<'a, E>,
    dst: TileDesc,
    sequence: &'a Sequence,
    request: &'a Request,
) {
    if !sequence_is_ok(sequence, request) {
        return;
    }
    if let Err(err) = submit(graph, tiles, src, band, dst, sequence, request) {
        sequence.fail(request, err);
    }
}

fn submit<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    tiles: &'a [E],
    src: TileDesc,
    band: SharedMut<'a, E>,
    dst: TileDesc,
    sequence: &'a Sequence,
    request: &'a Request,
) -> Result<(), TileError> {
    check_band_pair(&dst, &src)?;
    let Layout::Lapack { ld } = dst.layout() else {
        return Err(TileError::InvalidArgument { arg: "dst" });
    };
    if tiles.len() < src.required_len() {
        return Err(TileError::InvalidArgument { arg: "tiles" });
    }
    if band.len() < dst.required_len() {
        return Err(TileError::InvalidArgument { arg: "band" });
    }

    for n in 0..dst.nt() {
        for m in dst.band_tile_rows(n) {
            let loc = src.tile(m, n)?;
            let span = loc.span();
            // the span of the bottom right tiles may run past the last in-band element
            let window = dst.tile(m, n)?.span();
            let end = Ord::min(window.end, band.len());
            let window = Ord::min(window.start, end)..end;
            insert_lacpy_tile_to_band(
                graph,
                sequence,
                request,
                dst.uplo(),
                dst.kl(),
                dst.ku(),
                m * dst.mb(),
                n * dst.nb(),
                &tiles[span],
                TileLoc { offset: 0, ..loc },
                band,
                window,
                ld,
            );
        }
    }
    Ok(())
}

/// Converts a band matrix from tile storage back to LAPACK band storage, see [`desc2pb`].
pub fn desc2pb_sync<E: ComplexField>(
    config: Config,
    tiles: &[E],
    src: TileDesc,
    band: &mut [E],
    dst: TileDesc,
) -> Result<(), TileError> {
    let sequence = Sequence::new();
    let request = Request::new();
    let mut graph = TaskGraph::new();
    desc2pb(
        &mut graph,
        tiles,
        src,
        SharedMut::new(band),
        dst,
        &sequence,
        &request,
    );
    graph.run(config.parallelism);
    sequence.status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{desc::band_diagonal_row, Parallelism, Uplo};

    #[test]
    fn one_task_per_tile_writes_the_band_only() {
        for uplo in [Uplo::General, Uplo::Upper, Uplo::Lower] {
            let (n, nb, kl, ku) = (7, 2, 2, 3);
            let ld = kl + ku + 1;
            let src = TileDesc::band(uplo, n, n, nb, nb, kl, ku, Layout::Tile).unwrap();
            let dst = TileDesc::band(uplo, n, n, nb, nb, kl, ku, Layout::Lapack { ld }).unwrap();
            let tiles = vec![1.0f64; src.required_len()];
            let mut band = vec![0.0f64; dst.required_len()];

            let sequence = Sequence::new();
            let request = Request::new();
            {
                let mut graph = TaskGraph::new();
                desc2pb(
                    &mut graph,
                    &tiles,
                    src,
                    SharedMut::new(&mut band),
                    dst,
                    &sequence,
                    &request,
                );
                assert_eq!(graph.len(), src.tile_count());
                graph.run(Parallelism::None);
            }
            assert!(sequence.is_ok());

            let diag = band_diagonal_row(uplo, dst.ku());
            let mut expected = vec![0.0f64; dst.required_len()];
            for j in 0..n {
                for i in 0..n {
                    if dst.in_band(i, j) {
                        expected[j * ld + diag + i - j] = 1.0;
                    }
                }
            }
            assert_eq!(band, expected);
        }
    }
}
