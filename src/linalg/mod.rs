//! Structured linear solvers used by the estimators.

mod levdur;
mod lplp;
mod theq;

pub use levdur::{LinearPrediction, Stability, acorr, levdur, lpc2c};
pub use lplp::lplp;
pub use theq::theq;
