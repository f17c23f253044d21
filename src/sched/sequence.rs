use crate::TileError;
use core::panic::Location;
use std::sync::OnceLock;

/// First failure recorded by a [`Sequence`] or a [`Request`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub error: TileError,
    /// Source location of the code that reported the failure.
    pub location: &'static Location<'static>,
}

/// Status of one call into an asynchronous operation.
#[derive(Debug, Default)]
pub struct Request {
    failure: OnceLock<Failure>,
}

impl Request {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first failure reported through this request, if any.
    #[inline]
    pub fn failure(&self) -> Option<Failure> {
        self.failure.get().copied()
    }

    /// Returns `Ok(())` unless a failure was reported through this request.
    #[inline]
    pub fn status(&self) -> Result<(), TileError> {
        match self.failure.get() {
            Some(failure) => Err(failure.error),
            None => Ok(()),
        }
    }
}

/// Status shared by all the tasks of a logical operation.
///
/// The status starts out successful and records only the first failure. It is never reset:
/// once a sequence has failed, every task submitted under it is skipped.
#[derive(Debug, Default)]
pub struct Sequence {
    failure: OnceLock<Failure>,
}

impl Sequence {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first failure of the sequence, if any.
    #[inline]
    pub fn failure(&self) -> Option<Failure> {
        self.failure.get().copied()
    }

    /// Returns `Ok(())` while no task of the sequence has failed.
    #[inline]
    pub fn status(&self) -> Result<(), TileError> {
        match self.failure.get() {
            Some(failure) => Err(failure.error),
            None => Ok(()),
        }
    }

    /// Returns true while no task of the sequence has failed.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.failure.get().is_none()
    }

    /// Marks the sequence and `request` as failed with `error`, unless they already failed.
    ///
    /// The failure is reported on the diagnostic channel with the caller location.
    #[track_caller]
    pub fn fail(&self, request: &Request, error: TileError) {
        let failure = Failure {
            error,
            location: Location::caller(),
        };
        let _ = request.failure.set(failure);
        if self.failure.set(failure).is_ok() {
            log::error!(
                target: "tessel",
                "sequence failed: {error} ({}:{})",
                failure.location.file(),
                failure.location.line(),
            );
        }
    }
}
