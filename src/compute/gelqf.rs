use super::sequence_is_ok;
use crate::{
    desc::{Layout, TileDesc},
    kernel::task::{insert_gelqt, insert_tslqt, insert_tsmlq, insert_unmlq, SharedMut},
    sched::{Request, Sequence, TaskGraph},
    ComplexField, Config, TileError,
};

/// Descriptor of the block reflector factors of the tiled LQ factorization of a matrix
/// described by `desc`, with the inner blocking size picked by `config`.
///
/// Tile `(m, n)` of the returned descriptor holds the `ib×nb` factors of the reflectors
/// stored in tile `(m, n)` of the factored matrix. Every tile is `nb` columns wide, including
/// the last column of tiles when `nb` does not divide the number of columns.
pub fn lq_factor_desc(desc: &TileDesc, config: Config) -> Result<TileDesc, TileError> {
    let ib = config.inner_blocksize(desc.nb());
    if ib == 0 {
        return Err(TileError::InvalidArgument { arg: "ib" });
    }
    TileDesc::general(desc.mt() * ib, desc.nt() * desc.nb(), ib, desc.nb(), Layout::Tile)
}

/// Submits the tiled LQ factorization `A = L Q` of the dense matrix `a`, described by `desc`.
///
/// On completion, the lower trapezoid of `a` holds `L`, and `Q` is stored in compact form in the
/// rest of `a` and in `t`, described by `tdesc` (see [`lq_factor_desc`]). The tiles of `desc`
/// must be square.
pub fn gelqf<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    a: SharedMut<'a, E>,
    desc: TileDesc,
    t: SharedMut<'a, E>,
    tdesc: TileDesc,
    sequence: &'a Sequence,
    request: &'a Request,
) {
    if !sequence_is_ok(sequence, request) {
        return;
    }
    if let Err(err) = submit(graph, a, desc, t, tdesc, sequence) {
        sequence.fail(request, err);
    }
}

fn submit<'a, E: ComplexField>(
    graph: &mut TaskGraph<'a>,
    a: SharedMut<'a, E>,
    desc: TileDesc,
    t: SharedMut<'a, E>,
    tdesc: TileDesc,
    sequence: &'a Sequence,
) -> Result<(), TileError> {
    if desc.is_band() || desc.mb() != desc.nb() {
        return Err(TileError::InvalidArgument { arg: "desc" });
    }
    if tdesc.nb() != desc.nb()
        || tdesc.mt() < desc.mt()
        || tdesc.ncols() < desc.nt() * desc.nb()
    {
        return Err(TileError::InvalidArgument { arg: "tdesc" });
    }
    if a.len() < desc.required_len() {
        return Err(TileError::InvalidArgument { arg: "a" });
    }
    if t.len() < tdesc.required_len() {
        return Err(TileError::InvalidArgument { arg: "t" });
    }

    let nb = desc.nb();
    let ib = tdesc.mb();
    let (mt, nt) = (desc.mt(), desc.nt());
    let tile = |m: usize, n: usize| a.tile(desc.tile(m, n)?);
    let factor = |m: usize, n: usize| t.tile(tdesc.tile(m, n)?);

    for k in 0..Ord::min(mt, nt) {
        let mk = desc.tile_nrows(k);
        let nk = desc.tile_ncols(k);
        let akk = tile(k, k)?;
        let tkk = factor(k, k)?;

        insert_gelqt(graph, sequence, mk, nk, ib, nb, akk, tkk);
        for m in k + 1..mt {
            let mm = desc.tile_nrows(m);
            insert_unmlq(
                graph,
                sequence,
                mm,
                nk,
                Ord::min(mk, nk),
                ib,
                nb,
                akk,
                tkk,
                tile(m, k)?,
            );
        }

        for n in k + 1..nt {
            let nn = desc.tile_ncols(n);
            let akn = tile(k, n)?;
            let tkn = factor(k, n)?;
            insert_tslqt(graph, sequence, mk, nn, ib, nb, akk, akn, tkn);
            for m in k + 1..mt {
                let mm = desc.tile_nrows(m);
                insert_tsmlq(
                    graph,
                    sequence,
                    mm,
                    nn,
                    mk,
                    ib,
                    nb,
                    tile(m, k)?,
                    tile(m, n)?,
                    akn,
                    tkn,
                );
            }
        }
    }
    log::debug!(
        target: "tessel",
        "gelqf: {} tasks for a {}x{} matrix, nb = {nb}, ib = {ib}",
        graph.len(),
        desc.nrows(),
        desc.ncols(),
    );
    Ok(())
}

/// Computes the tiled LQ factorization of `a` in place, see [`gelqf`].
pub fn gelqf_sync<E: ComplexField>(
    config: Config,
    a: &mut [E],
    desc: TileDesc,
    t: &mut [E],
    tdesc: TileDesc,
) -> Result<(), TileError> {
    let sequence = Sequence::new();
    let request = Request::new();
    let mut graph = TaskGraph::new();
    gelqf(
        &mut graph,
        SharedMut::new(a),
        desc,
        SharedMut::new(t),
        tdesc,
        &sequence,
        &request,
    );
    graph.run(config.parallelism);
    sequence.status()
}
