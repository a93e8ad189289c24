//! Iteration skeleton shared by the estimators.

use crate::error::AnalysisError;

use super::Status;

/// One estimator's Newton-Raphson refinement.
pub(crate) trait NewtonRaphson {
    /// Convergence quantity of the current estimate.
    fn measure(&mut self, iteration: usize) -> Result<f64, AnalysisError>;

    /// Correct the estimate; skipped once the iteration has converged.
    fn update(&mut self, _iteration: usize) -> Result<(), AnalysisError> {
        Ok(())
    }
}

/// When the reference of the relative-change test moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tracking {
    /// Only from the minimum iteration on; `|(v - ref) / v|`.
    AfterMinimum,
    /// Every iteration; `|(v - ref) / v|`.
    Always,
    /// Only before the minimum iteration, frozen afterwards; `|(v - ref) / ref|`.
    UntilMinimum,
}

#[derive(Debug, Clone)]
pub(crate) struct Convergence {
    tracking: Tracking,
    min_iterations: usize,
    threshold: f64,
    reference: f64,
}

impl Convergence {
    pub fn new(tracking: Tracking, min_iterations: usize, threshold: f64, reference: f64) -> Self {
        Self {
            tracking,
            min_iterations,
            threshold,
            reference,
        }
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    fn converged(&mut self, iteration: usize, value: f64) -> bool {
        let checked = iteration >= self.min_iterations;
        let change = match self.tracking {
            Tracking::UntilMinimum => (value - self.reference) / self.reference,
            _ => (value - self.reference) / value,
        };
        if checked && change.abs() < self.threshold {
            self.reference = value;
            return true;
        }
        match self.tracking {
            Tracking::AfterMinimum if checked => self.reference = value,
            Tracking::Always => self.reference = value,
            Tracking::UntilMinimum if !checked => self.reference = value,
            _ => (),
        }
        false
    }
}

/// Run at most `max_iterations` measure/update rounds.
///
/// Every measured value is appended to `history`.
pub(crate) fn iterate<N: NewtonRaphson>(
    solver: &mut N,
    convergence: &mut Convergence,
    max_iterations: usize,
    history: &mut Vec<f64>,
) -> Result<Status, AnalysisError> {
    for iteration in 1..=max_iterations {
        let value = solver.measure(iteration)?;
        history.push(value);
        tracing::trace!(iteration, value, "newton-raphson");
        if convergence.converged(iteration, value) {
            return Ok(Status::Converged {
                iterations: iteration,
            });
        }
        solver.update(iteration)?;
    }
    Ok(Status::MaxIterationsReached)
}
