use super::{check_band_pair, sequence_is_ok};
use crate::{
    desc::{Layout, TileDesc},
    kernel::task::{insert_lacpy_band_to_tile, SharedMut},
    sched::{Request, Sequence, TaskGraph},
    ComplexField, Config, TileError,
};

/// Submits the conversion of a band matrix from LAPACK band storage to tile storage.
///
/// `band` is described by `src`, a band descriptor in [`Layout::Lapack`] storage, and `tiles`
/// by `dst`, the same band matrix in [`Layout::Tile`] storage. One copy task is submitted per
/// tile intersecting the band, see [`TileDesc::band_tile_rows`]. Elements of the tiles outside
/// the band are set to zero.
pub fn pb2desc<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    band: &'a [E],
    src: TileDesc,
    tiles: SharedMut<'a, E>,
    dst: TileDesc,
    sequence: &'a Sequence,
    request: &'a Request,
) {
    if !sequence_is_ok(sequence, request) {
        return;
    }
    if let Err(err) = submit(graph, band, src, tiles, dst, sequence, request) {
        sequence.fail(request, err);
    }
}

fn submit<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    band: &'a [E],
    src: TileDesc,
    tiles: SharedMut<'a, E>,
    dst: TileDesc,
    sequence: &'a Sequence,
    request: &'a Request,
) -> Result<(), TileError> {
    check_band_pair(&src, &dst)?;
    let Layout::Lapack { ld } = src.layout() else {
        return Err(TileError::InvalidArgument { arg: "src" });
    };
    if band.len() < src.required_len() {
        return Err(TileError::InvalidArgument { arg: "band" });
    }
    if tiles.len() < dst.required_len() {
        return Err(TileError::InvalidArgument { arg: "tiles" });
    }

    let before = graph.len();
    for n in 0..src.nt() {
        for m in src.band_tile_rows(n) {
            // the span of the bottom right tiles may run past the last in-band element
            let span = src.tile(m, n)?.span();
            let end = Ord::min(span.end, band.len());
            let window = &band[Ord::min(span.start, end)..end];
            let tile = tiles.tile(dst.tile(m, n)?)?;
            insert_lacpy_band_to_tile(
                graph,
                sequence,
                request,
                src.uplo(),
                src.kl(),
                src.ku(),
                m * src.mb(),
                n * src.nb(),
                window,
                ld,
                tile,
            );
        }
    }
    log::debug!(
        target: "tessel",
        "pb2desc: {} copy tasks for a {}x{} band matrix",
        graph.len() - before,
        src.nrows(),
        src.ncols(),
    );
    Ok(())
}

/// Converts a band matrix from LAPACK band storage to tile storage, see [`pb2desc`].
pub fn pb2desc_sync<E: ComplexField>(
    config: Config,
    band: &[E],
    src: TileDesc,
    tiles: &mut [E],
    dst: TileDesc,
) -> Result<(), TileError> {
    let sequence = Sequence::new();
    let request = Request::new();
    let mut graph = TaskGraph::new();
    pb2desc(
        &mut graph,
        band,
        src,
        SharedMut::new(tiles),
        dst,
        &sequence,
        &request,
    );
    graph.run(config.parallelism);
    sequence.status()
}
