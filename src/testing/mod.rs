//! Numerical validation against matrices with a known spectrum.

pub mod kahan;

pub use kahan::{kahan_matrix, run_stevx2, Kahan, StevxOutcome, StevxParams};
