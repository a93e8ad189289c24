//! Cepstral analysis by Newton-Raphson refinement over a periodogram.
//!
//! Every estimator converts its input frame to a periodogram, derives an
//! initial estimate from the log periodogram, and refines it until the
//! relative change of a convergence quantity drops below the end threshold
//! or the iteration budget is spent. Running out of iterations is reported
//! through [`Status`], not as an error.
//!
//! Estimators own their FFT table and scratch buffers, so one instance is
//! meant to process a whole stream of same-sized frames.

use std::ops::Deref;

use crate::error::AnalysisError;

mod condition;
mod gcep;
mod mcep;
mod mgcep;
mod newton;
mod periodogram;
mod smcep;
mod uels;

pub use condition::Condition;
pub use gcep::GeneralizedCepstralAnalysis;
pub use mcep::MelCepstralAnalysis;
pub use mgcep::{MelGeneralizedCepstralAnalysis, OutputFormat};
pub use periodogram::{Floor, InputType};
pub use smcep::WarpedCepstralAnalysis;
pub use uels::UnbiasedLogSpectrumEstimation;

/// How the iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The end condition was met at the given iteration.
    Converged { iterations: usize },
    /// The iteration budget ran out; the estimate is still usable.
    MaxIterationsReached,
}

impl Status {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Result of analyzing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate<T> {
    pub cepstrum: T,
    pub status: Status,
    /// Convergence quantity measured at each iteration.
    pub history: Vec<f64>,
}

pub trait Analysis {
    type Output: Deref<Target = [f64]>;

    fn condition(&self) -> &Condition;

    /// Number of values [`Analysis::analyze`] expects per frame.
    fn input_length(&self) -> usize {
        self.condition().input_length()
    }

    /// Number of values of each estimate.
    fn output_length(&self) -> usize {
        self.condition().get_order() + 1
    }

    fn analyze(&mut self, frame: &[f64]) -> Result<Estimate<Self::Output>, AnalysisError>;
}

/// Zero `buffer` at length `len`, keeping its capacity.
fn prepare(buffer: &mut Vec<f64>, len: usize) {
    buffer.clear();
    buffer.resize(len, 0.0);
}

fn singular(iteration: usize) -> impl FnOnce(crate::error::SingularMatrix) -> AnalysisError {
    move |source| AnalysisError::SingularSystem { iteration, source }
}
