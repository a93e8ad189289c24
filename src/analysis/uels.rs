use crate::{cepstrum::MelCepstrum, error::AnalysisError, fft::Fft, linalg::lplp};

use super::{
    Analysis, Condition, Estimate, prepare,
    newton::{Convergence, NewtonRaphson, Tracking, iterate},
    periodogram::periodogram,
};

/// Unbiased estimation of log spectrum.
///
/// Each step whitens the periodogram by the current estimate and removes
/// the residual's linear-prediction polynomial from the cepstrum. The gain
/// `c(0)` is recovered from the residual power after the loop; once the
/// minimum iteration is reached the power it is compared against no longer
/// moves.
#[derive(Debug, Clone, Default)]
pub struct UnbiasedLogSpectrumEstimation {
    condition: Condition,
    work: Workspace,
}

impl UnbiasedLogSpectrumEstimation {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            work: Workspace::default(),
        }
    }

    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Analysis for UnbiasedLogSpectrumEstimation {
    type Output = MelCepstrum;

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn analyze(&mut self, frame: &[f64]) -> Result<Estimate<MelCepstrum>, AnalysisError> {
        self.condition.validate()?;
        let work = &mut self.work;
        work.reset(&self.condition);
        periodogram(
            &mut work.fft,
            &self.condition,
            frame,
            &mut work.x,
            &mut work.y,
        )?;
        let power = work.initialize()?;

        let mut convergence = Convergence::new(
            Tracking::UntilMinimum,
            self.condition.get_min_iterations(),
            self.condition.get_end_threshold(),
            power,
        );
        let mut history = Vec::with_capacity(self.condition.get_max_iterations());
        let status = iterate(
            work,
            &mut convergence,
            self.condition.get_max_iterations(),
            &mut history,
        )?;
        tracing::debug!(?status, iterations = history.len(), "uels");

        work.c[0] = 0.5 * convergence.reference().ln();
        Ok(Estimate {
            cepstrum: MelCepstrum::new(&work.c[..], 0.0),
            status,
            history,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Workspace {
    fft: Fft,
    order: usize,
    /// log periodogram
    x: Vec<f64>,
    y: Vec<f64>,
    cr: Vec<f64>,
    r: Vec<f64>,
    c: Vec<f64>,
}

impl Workspace {
    fn reset(&mut self, condition: &Condition) {
        let flng = condition.get_frame_length();
        self.order = condition.get_order();
        for v in [&mut self.x, &mut self.y, &mut self.cr, &mut self.r] {
            prepare(v, flng);
        }
        prepare(&mut self.c, self.order + 1);
    }

    /// Cepstrum of the log periodogram as the initial estimate; returns the
    /// geometric mean of the periodogram.
    fn initialize(&mut self) -> Result<f64, AnalysisError> {
        for (x, cr) in self.x.iter_mut().zip(self.cr.iter_mut()) {
            *x = x.ln();
            *cr = *x;
        }
        self.fft.ifftr(&mut self.cr, &mut self.y)?;
        let m = self.order;
        self.c[1..].copy_from_slice(&self.cr[1..=m]);
        Ok(self.cr[0].exp())
    }
}

impl NewtonRaphson for Workspace {
    fn measure(&mut self, _: usize) -> Result<f64, AnalysisError> {
        let m = self.order;
        self.cr.fill(0.0);
        self.cr[1..=m].copy_from_slice(&self.c[1..]);
        self.fft.fftr(&mut self.cr, &mut self.y)?;
        for ((r, x), cr) in self.r.iter_mut().zip(&self.x).zip(&self.cr) {
            *r = (x - cr - cr).exp();
        }
        self.fft.ifftr(&mut self.r, &mut self.y)?;
        Ok(self.r[0])
    }

    fn update(&mut self, _: usize) -> Result<(), AnalysisError> {
        let a = lplp(&self.r, self.order);
        for (c, a) in self.c[1..].iter_mut().zip(&a[1..]) {
            *c -= a;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::UnbiasedLogSpectrumEstimation;
    use crate::{
        analysis::{
            Analysis, InputType, Status,
            testing::{condition, log_amplitude},
        },
        cepstrum::CepstrumT,
        error::AnalysisError,
    };

    #[test]
    fn zero_order_is_mean_power() {
        let frame: Vec<f64> = (0..=16).map(|i| 0.5 + (i as f64 * 0.4).sin().powi(2)).collect();
        let mut x: Vec<f64> = frame.iter().map(|v| v * v).collect();
        x.extend(frame[1..16].iter().rev().map(|v| v * v));
        let mean = x.iter().sum::<f64>() / 32.0;

        let mut analysis = UnbiasedLogSpectrumEstimation::new(condition(32, 0, InputType::Amplitude));
        let estimate = analysis.analyze(&frame).unwrap();
        assert_eq!(estimate.status, Status::Converged { iterations: 2 });
        assert_abs_diff_eq!(estimate.cepstrum[0], 0.5 * mean.ln(), epsilon = 1.0e-10);
    }

    #[test]
    fn recovers_minimum_phase_cepstrum() {
        let c = [0.5, 0.4, -0.2];
        let mut analysis = UnbiasedLogSpectrumEstimation::new(condition(256, 6, InputType::Log));
        let estimate = analysis.analyze(&log_amplitude(&c, 256)).unwrap();
        assert_eq!(estimate.status, Status::Converged { iterations: 2 });
        assert_eq!(estimate.cepstrum.alpha(), 0.0);
        for (i, v) in estimate.cepstrum.iter().enumerate() {
            assert_abs_diff_eq!(*v, c.get(i).copied().unwrap_or(0.0), epsilon = 1.0e-9);
        }
    }

    #[test]
    fn largest_order_fits() {
        let mut analysis = UnbiasedLogSpectrumEstimation::new(condition(16, 8, InputType::Log));
        assert_eq!(
            analysis.analyze(&[0.0; 9]),
            Err(AnalysisError::OrderTooLarge {
                order: 8,
                frame_length: 16
            })
        );
        // lplp reads lags up to 2m + 1
        analysis.condition_mut().set_order(7);
        assert!(analysis.analyze(&[0.0; 9]).is_ok());
    }
}
