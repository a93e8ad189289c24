use std::sync::Arc;

use crate::{
    cepstrum::{WarpCache, WarpTables, WarpedCepstrum},
    constants::{ALPHA, WARP_FFT_SIZE},
    error::AnalysisError,
    fft::Fft,
};

use super::{
    Analysis, Condition, Estimate,
    mcep::{MelWorkspace, Warping},
};

/// Mel-cepstral analysis under a second-order all-pass.
///
/// `theta` moves the frequency the warping emphasizes; the transformation
/// tables are sampled on `fft_size` points and cached per parameter set.
#[derive(Debug, Clone)]
pub struct WarpedCepstralAnalysis {
    condition: Condition,
    alpha: f64,
    theta: f64,
    fft_size: usize,
    fft: Fft,
    cache: WarpCache,
    work: Option<MelWorkspace<Arc<WarpTables>>>,
}

impl Default for WarpedCepstralAnalysis {
    fn default() -> Self {
        Self::new(Condition::default(), ALPHA, 0.0)
    }
}

impl WarpedCepstralAnalysis {
    pub fn new(condition: Condition, alpha: f64, theta: f64) -> Self {
        Self {
            condition,
            alpha,
            theta,
            fft_size: WARP_FFT_SIZE,
            fft: Fft::new(),
            cache: WarpCache::new(),
            work: None,
        }
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }
    pub fn get_alpha(&self) -> f64 {
        self.alpha
    }

    /// Set emphasized frequency in radians, `0 <= theta <= pi`
    pub fn set_theta(&mut self, theta: f64) {
        self.theta = theta;
    }
    pub fn get_theta(&self) -> f64 {
        self.theta
    }

    /// Set size of the grid the tables are sampled on; must exceed `flng / 2`
    pub fn set_fft_size(&mut self, fft_size: usize) {
        self.fft_size = fft_size;
    }
    pub fn get_fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }

    pub fn cache(&self) -> &WarpCache {
        &self.cache
    }
}

impl Analysis for WarpedCepstralAnalysis {
    type Output = WarpedCepstrum;

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn analyze(&mut self, frame: &[f64]) -> Result<Estimate<WarpedCepstrum>, AnalysisError> {
        self.condition.validate()?;
        let tables = self.cache.get(
            &mut self.fft,
            self.alpha,
            self.theta,
            self.fft_size,
            self.condition.get_order(),
            self.condition.get_frame_length(),
        )?;

        let work = self
            .work
            .get_or_insert_with(|| MelWorkspace::new(Arc::clone(&tables)));
        work.reset(&self.condition, tables);
        let (status, history) = work.run(&self.condition, frame)?;
        tracing::debug!(
            ?status,
            iterations = history.len(),
            alpha = self.alpha,
            theta = self.theta,
            "smcep"
        );

        Ok(Estimate {
            cepstrum: WarpedCepstrum::new(work.cepstrum(), self.alpha, self.theta),
            status,
            history,
        })
    }
}

impl Warping for Arc<WarpTables> {
    fn impulse(&self, al: &mut [f64]) {
        al.copy_from_slice(self.al());
    }

    fn warp(&self, c: &[f64], mc: &mut [f64]) {
        self.freqt(c, mc);
    }

    fn unwarp(&self, mc: &[f64], c: &mut [f64]) {
        self.ifreqt(mc, c);
    }

    fn lags(&self, r: &[f64], out: &mut [f64]) {
        self.frqtr(r, out);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::WarpedCepstralAnalysis;
    use crate::{
        analysis::{
            Analysis, InputType, MelCepstralAnalysis, Status,
            testing::{condition, log_amplitude},
        },
        error::AnalysisError,
    };

    #[test]
    fn flat_spectrum_is_exact() {
        let mut analysis =
            WarpedCepstralAnalysis::new(condition(64, 8, InputType::Amplitude), 0.4, 0.6);
        let estimate = analysis.analyze(&[2.0; 33]).unwrap();
        assert_eq!(estimate.status, Status::Converged { iterations: 2 });
        assert_abs_diff_eq!(estimate.cepstrum[0], 2.0f64.ln(), epsilon = 1.0e-8);
        for v in &estimate.cepstrum[1..] {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1.0e-8);
        }
        assert_eq!(estimate.cepstrum.theta(), 0.6);
    }

    #[test]
    fn zero_order_is_mean_power() {
        let frame: Vec<f64> = (0..=32).map(|i| 1.0 + (i as f64 * 0.3).sin().abs()).collect();
        let mut x: Vec<f64> = frame.iter().map(|v| v * v).collect();
        x.extend(frame[1..32].iter().rev().map(|v| v * v));
        let mean = x.iter().sum::<f64>() / 64.0;

        let mut analysis =
            WarpedCepstralAnalysis::new(condition(64, 0, InputType::Amplitude), 0.35, 0.5);
        let estimate = analysis.analyze(&frame).unwrap();
        assert!(estimate.status.is_converged());
        assert_eq!(estimate.cepstrum.len(), 1);
        assert_abs_diff_eq!(estimate.cepstrum[0], 0.5 * mean.ln(), epsilon = 1.0e-4);
    }

    #[test]
    fn zero_theta_matches_first_order() {
        let frame = log_amplitude(&[0.2, 0.5, -0.3, 0.1], 128);
        let mut condition = condition(128, 12, InputType::Log);
        condition.set_end_threshold(1.0e-10);

        let mut warped = WarpedCepstralAnalysis::new(condition.clone(), 0.35, 0.0);
        let mut mel = MelCepstralAnalysis::new(condition, 0.35);
        let a = warped.analyze(&frame).unwrap();
        let b = mel.analyze(&frame).unwrap();
        for (a, b) in a.cepstrum.iter().zip(b.cepstrum.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1.0e-6);
        }
    }

    #[test]
    fn tables_are_cached() {
        let frame = log_amplitude(&[0.0, 0.3], 64);
        let mut analysis =
            WarpedCepstralAnalysis::new(condition(64, 6, InputType::Log), 0.3, 1.0);
        analysis.analyze(&frame).unwrap();
        analysis.analyze(&frame).unwrap();
        assert_eq!(analysis.cache().len(), 1);

        analysis.set_theta(0.5);
        analysis.analyze(&frame).unwrap();
        assert_eq!(analysis.cache().len(), 2);
    }

    #[test]
    fn rejects_coarse_grid() {
        let mut analysis = WarpedCepstralAnalysis::default();
        analysis.set_fft_size(128);
        assert_eq!(
            analysis.analyze(&[1.0; 256]),
            Err(AnalysisError::InvalidFftLength(128))
        );
    }
}
