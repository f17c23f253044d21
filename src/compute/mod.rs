//! Tiled drivers.
//!
//! Every driver comes in two flavors. The asynchronous one submits its tasks to a caller-owned
//! [`TaskGraph`](crate::sched::TaskGraph) under a [`Sequence`](crate::sched::Sequence) and a
//! [`Request`](crate::sched::Request), and returns immediately. The `*_sync` one builds the
//! graph, runs it with the parallelism of the given [`Config`](crate::Config), and returns the
//! status of the sequence.
//!
//! A driver called with a sequence that already failed fails its request with
//! [`TileError::Sequence`](crate::TileError::Sequence) and submits nothing.

use crate::{
    desc::{Layout, TileDesc},
    sched::{Request, Sequence},
    TileError,
};

mod desc2pb;
mod gelqf;
mod pb2desc;

pub use desc2pb::{desc2pb, desc2pb_sync};
pub use gelqf::{gelqf, gelqf_sync, lq_factor_desc};
pub use pb2desc::{pb2desc, pb2desc_sync};

/// Returns false, after failing `request`, if `sequence` already failed.
#[track_caller]
fn sequence_is_ok(sequence: &Sequence, request: &Request) -> bool {
    if sequence.is_ok() {
        true
    } else {
        sequence.fail(request, TileError::Sequence);
        false
    }
}

/// Checks that `lapack` and `tile` describe the same band matrix, in LAPACK band storage and
/// tile storage respectively.
fn check_band_pair(lapack: &TileDesc, tile: &TileDesc) -> Result<(), TileError> {
    if !lapack.is_band() || !matches!(lapack.layout(), Layout::Lapack { .. }) {
        return Err(TileError::InvalidArgument { arg: "lapack" });
    }
    if !tile.is_band() || tile.layout() != Layout::Tile {
        return Err(TileError::InvalidArgument { arg: "tile" });
    }
    let same = lapack.uplo() == tile.uplo()
        && lapack.nrows() == tile.nrows()
        && lapack.ncols() == tile.ncols()
        && lapack.nb() == tile.nb()
        && lapack.kl() == tile.kl()
        && lapack.ku() == tile.ku();
    if same {
        Ok(())
    } else {
        Err(TileError::InvalidArgument { arg: "tile" })
    }
}
