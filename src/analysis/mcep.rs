use crate::{
    cepstrum::{MelCepstrum, freqt, frqtr},
    constants::ALPHA,
    error::AnalysisError,
    fft::Fft,
    linalg::theq,
};

use super::{
    Analysis, Condition, Estimate, Status, prepare,
    newton::{Convergence, NewtonRaphson, Tracking, iterate},
    periodogram::periodogram,
    singular,
};

/// Mel-cepstral analysis.
///
/// Fits `exp(2 sum mc(m) z~^-m)` with the first-order all-pass `z~^-1` of
/// [`alpha`](Self::get_alpha) to the periodogram of each frame.
#[derive(Debug, Clone)]
pub struct MelCepstralAnalysis {
    condition: Condition,
    alpha: f64,
    work: MelWorkspace<AllPass>,
}

impl Default for MelCepstralAnalysis {
    fn default() -> Self {
        Self::new(Condition::default(), ALPHA)
    }
}

impl MelCepstralAnalysis {
    pub fn new(condition: Condition, alpha: f64) -> Self {
        Self {
            condition,
            alpha,
            work: MelWorkspace::new(AllPass(alpha)),
        }
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }
    pub fn get_alpha(&self) -> f64 {
        self.alpha
    }

    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Analysis for MelCepstralAnalysis {
    type Output = MelCepstrum;

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn analyze(&mut self, frame: &[f64]) -> Result<Estimate<MelCepstrum>, AnalysisError> {
        self.condition.validate()?;
        self.work.reset(&self.condition, AllPass(self.alpha));
        let (status, history) = self.work.run(&self.condition, frame)?;
        tracing::debug!(?status, iterations = history.len(), alpha = self.alpha, "mcep");

        Ok(Estimate {
            cepstrum: MelCepstrum::new(self.work.cepstrum(), self.alpha),
            status,
            history,
        })
    }
}

/// Frequency warping of the cepstral axis.
pub(super) trait Warping {
    /// Warped image `al(0..=m)` of the unit impulse.
    fn impulse(&self, al: &mut [f64]);
    /// Cepstrum `c(0..=flng/2)` to warped cepstrum `mc(0..=m)`.
    fn warp(&self, c: &[f64], mc: &mut [f64]);
    /// Warped cepstrum back to cepstrum `c(0..=flng/2)`.
    fn unwarp(&self, mc: &[f64], c: &mut [f64]);
    /// Autocorrelation `r(0..=flng/2)` to warped lags `(0..=2m)`.
    fn lags(&self, r: &[f64], out: &mut [f64]);
}

/// First-order all-pass `(z^-1 - alpha) / (1 - alpha z^-1)`.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct AllPass(pub f64);

impl Warping for AllPass {
    fn impulse(&self, al: &mut [f64]) {
        al[0] = 1.0;
        for i in 1..al.len() {
            al[i] = -self.0 * al[i - 1];
        }
    }

    fn warp(&self, c: &[f64], mc: &mut [f64]) {
        freqt(c, mc, self.0);
    }

    fn unwarp(&self, mc: &[f64], c: &mut [f64]) {
        freqt(mc, c, -self.0);
    }

    fn lags(&self, r: &[f64], out: &mut [f64]) {
        frqtr(r, out, self.0);
    }
}

/// Newton-Raphson state of a warped log-spectral fit.
#[derive(Debug, Clone)]
pub(super) struct MelWorkspace<W> {
    warping: W,
    fft: Fft,
    order: usize,
    min_determinant: f64,
    /// periodogram
    x: Vec<f64>,
    y: Vec<f64>,
    c: Vec<f64>,
    /// warped autocorrelation of the residual, `0..=2m`
    r: Vec<f64>,
    h: Vec<f64>,
    b: Vec<f64>,
    al: Vec<f64>,
    mc: Vec<f64>,
}

impl<W: Warping> MelWorkspace<W> {
    pub fn new(warping: W) -> Self {
        Self {
            warping,
            fft: Fft::new(),
            order: 0,
            min_determinant: 0.0,
            x: Vec::new(),
            y: Vec::new(),
            c: Vec::new(),
            r: Vec::new(),
            h: Vec::new(),
            b: Vec::new(),
            al: Vec::new(),
            mc: Vec::new(),
        }
    }

    pub fn reset(&mut self, condition: &Condition, warping: W) {
        let flng = condition.get_frame_length();
        let m = condition.get_order();
        self.warping = warping;
        self.order = m;
        self.min_determinant = condition.get_min_determinant();
        for v in [&mut self.x, &mut self.y, &mut self.c] {
            prepare(v, flng);
        }
        for v in [&mut self.r, &mut self.h] {
            prepare(v, 2 * m + 1);
        }
        for v in [&mut self.b, &mut self.al, &mut self.mc] {
            prepare(v, m + 1);
        }
    }

    /// Fit the frame; the estimate is left in [`MelWorkspace::cepstrum`].
    pub fn run(
        &mut self,
        condition: &Condition,
        frame: &[f64],
    ) -> Result<(Status, Vec<f64>), AnalysisError> {
        periodogram(&mut self.fft, condition, frame, &mut self.x, &mut self.y)?;
        let reference = self.initialize()?;

        let mut convergence = Convergence::new(
            Tracking::AfterMinimum,
            condition.get_min_iterations(),
            condition.get_end_threshold(),
            reference,
        );
        let mut history = Vec::with_capacity(condition.get_max_iterations());
        let status = iterate(
            self,
            &mut convergence,
            condition.get_max_iterations(),
            &mut history,
        )?;
        Ok((status, history))
    }

    pub fn cepstrum(&self) -> &[f64] {
        &self.mc
    }

    /// Warped log periodogram as the initial estimate; returns its `c(0)`.
    fn initialize(&mut self) -> Result<f64, AnalysisError> {
        let f2 = self.c.len() / 2;
        for (c, x) in self.c.iter_mut().zip(&self.x) {
            *c = x.ln();
        }
        self.warping.impulse(&mut self.al);

        self.fft.ifftr(&mut self.c, &mut self.y)?;
        self.c[0] /= 2.0;
        self.c[f2] /= 2.0;
        self.warping.warp(&self.c[..=f2], &mut self.mc);
        Ok(self.c[0])
    }
}

impl<W: Warping> NewtonRaphson for MelWorkspace<W> {
    fn measure(&mut self, _: usize) -> Result<f64, AnalysisError> {
        let f2 = self.c.len() / 2;
        self.c.fill(0.0);
        self.warping.unwarp(&self.mc, &mut self.c[..=f2]);
        self.fft.fftr(&mut self.c, &mut self.y)?;
        for (c, x) in self.c.iter_mut().zip(&self.x) {
            *c = x / (*c + *c).exp();
        }
        self.fft.ifftr(&mut self.c, &mut self.y)?;
        self.warping.lags(&self.c[..=f2], &mut self.r);
        Ok(self.r[0])
    }

    fn update(&mut self, iteration: usize) -> Result<(), AnalysisError> {
        let m = self.order;
        let r = &mut self.r;
        for i in 0..=m {
            self.b[i] = r[i] - self.al[i];
        }
        for i in 0..=2 * m {
            self.h[i] = if i % 2 == 0 { r[i] - r[0] } else { r[i] };
        }
        for i in (2..=m).step_by(2) {
            r[i] += r[0];
        }
        r[0] += r[0];

        let d = theq(&r[..=m], &self.h, &self.b, self.min_determinant)
            .map_err(singular(iteration))?;
        for (mc, d) in self.mc.iter_mut().zip(d.iter()) {
            *mc += d;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::MelCepstralAnalysis;
    use crate::{
        analysis::{
            Analysis, Condition, InputType, Status,
            testing::{condition, log_amplitude},
        },
        cepstrum::{CepstrumT, freqt},
        error::AnalysisError,
    };

    #[test]
    fn flat_spectrum_is_exact() {
        let mut analysis = MelCepstralAnalysis::new(condition(64, 12, InputType::Amplitude), 0.35);
        let estimate = analysis.analyze(&[3.0; 33]).unwrap();
        assert_eq!(estimate.status, Status::Converged { iterations: 2 });
        assert_abs_diff_eq!(estimate.cepstrum[0], 3.0f64.ln(), epsilon = 1.0e-10);
        for v in &estimate.cepstrum[1..] {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1.0e-10);
        }
        assert_eq!(estimate.cepstrum.alpha(), 0.35);
    }

    #[test]
    fn zero_order_is_mean_power() {
        let frame: Vec<f64> = (0..=32).map(|i| 1.0 + (i as f64 * 0.3).sin().abs()).collect();
        let mut x: Vec<f64> = frame.iter().map(|v| v * v).collect();
        x.extend(frame[1..32].iter().rev().map(|v| v * v));
        let mean = x.iter().sum::<f64>() / 64.0;

        let mut analysis = MelCepstralAnalysis::new(condition(64, 0, InputType::Amplitude), 0.35);
        let estimate = analysis.analyze(&frame).unwrap();
        assert!(estimate.status.is_converged());
        assert_abs_diff_eq!(estimate.cepstrum[0], 0.5 * mean.ln(), epsilon = 1.0e-4);
    }

    #[test]
    fn recovers_minimum_phase_cepstrum() {
        let c = [0.5, 0.4, -0.2];
        let frame = log_amplitude(&c, 256);

        let mut analysis = MelCepstralAnalysis::new(condition(256, 4, InputType::Log), 0.0);
        let estimate = analysis.analyze(&frame).unwrap();
        assert_eq!(estimate.status, Status::Converged { iterations: 2 });
        for (i, v) in estimate.cepstrum.iter().enumerate() {
            assert_abs_diff_eq!(*v, c.get(i).copied().unwrap_or(0.0), epsilon = 1.0e-9);
        }

        let mut condition = condition(256, 20, InputType::Log);
        condition.set_end_threshold(1.0e-8);
        let mut analysis = MelCepstralAnalysis::new(condition, 0.35);
        let estimate = analysis.analyze(&frame).unwrap();
        let mut unwarped = [0.0; 8];
        freqt(&estimate.cepstrum, &mut unwarped, -0.35);
        for (i, v) in unwarped.iter().enumerate() {
            assert_abs_diff_eq!(*v, c.get(i).copied().unwrap_or(0.0), epsilon = 1.0e-3);
        }
        assert_eq!(estimate.cepstrum.order(), 20);
    }

    #[test]
    fn history_decreases_to_convergence() {
        let peak = |w: f64, center: f64, width: f64, height: f64| {
            height / (1.0 + ((w - center) / width).powi(2))
        };
        let frame: Vec<f64> = (0..=128)
            .map(|i| {
                let w = std::f64::consts::PI * i as f64 / 128.0;
                1.0 + peak(w, 0.6, 0.05, 50.0) + peak(w, 1.8, 0.08, 20.0)
            })
            .collect();

        let mut analysis =
            MelCepstralAnalysis::new(condition(256, 25, InputType::Periodogram), 0.35);
        let estimate = analysis.analyze(&frame).unwrap();
        assert!(estimate.status.is_converged());
        assert!(estimate.history.len() >= 2);
        for w in estimate.history.windows(2) {
            assert!(w[1] <= w[0] * (1.0 + 1.0e-6), "{:?}", estimate.history);
        }
    }

    #[test]
    fn stops_at_max_iterations() {
        let mut condition = condition(64, 4, InputType::Log);
        condition.set_max_iterations(1);
        let mut analysis = MelCepstralAnalysis::new(condition, 0.35);
        let estimate = analysis.analyze(&log_amplitude(&[0.3, 0.2, -0.1], 64)).unwrap();
        assert_eq!(estimate.status, Status::MaxIterationsReached);
        assert_eq!(estimate.history.len(), 1);
        assert_eq!(estimate.cepstrum.len(), 5);
        assert!(estimate.cepstrum.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn singular_system_names_iteration() {
        let mut condition = condition(64, 4, InputType::Log);
        condition.set_min_determinant(1.0e300);
        let mut analysis = MelCepstralAnalysis::new(condition, 0.35);
        let err = analysis
            .analyze(&log_amplitude(&[0.3, 0.2, -0.1], 64))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::SingularSystem { iteration: 1, .. }));
        assert!(err.is_numerical());
    }

    #[test]
    fn reused_across_sizes() {
        let mut analysis = MelCepstralAnalysis::new(condition(256, 20, InputType::Log), 0.35);
        let first = analysis.analyze(&log_amplitude(&[0.1, 0.3], 256)).unwrap();

        analysis.condition_mut().set_frame_length(64);
        analysis.condition_mut().set_order(4);
        analysis.analyze(&log_amplitude(&[0.2, -0.1], 64)).unwrap();

        analysis.condition_mut().set_frame_length(256);
        analysis.condition_mut().set_order(20);
        let again = analysis.analyze(&log_amplitude(&[0.1, 0.3], 256)).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn rejects_bad_frames() {
        let mut analysis = MelCepstralAnalysis::default();
        assert_eq!(
            analysis.analyze(&[0.0; 100]),
            Err(AnalysisError::InvalidFrameLength {
                expected: 256,
                actual: 100
            })
        );
        assert_eq!(
            analysis.analyze(&[0.0; 256]),
            Err(AnalysisError::NonPositivePeriodogram { index: 0 })
        );

        let mut condition = Condition::default();
        condition.set_order(128);
        let mut analysis = MelCepstralAnalysis::new(condition, 0.35);
        assert!(matches!(
            analysis.analyze(&[1.0; 256]),
            Err(AnalysisError::OrderTooLarge { .. })
        ));
    }
}
