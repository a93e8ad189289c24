use crate::{
    cepstrum::{MelGeneralizedCepstrum, gc2gc, ignorm},
    constants::GAMMA,
    error::AnalysisError,
    fft::Fft,
    linalg::theq,
};

use super::{
    Analysis, Condition, Estimate, prepare,
    newton::{Convergence, NewtonRaphson, Tracking, iterate},
    periodogram::periodogram,
    singular,
};

/// Generalized cepstral analysis.
///
/// Fits `K^2 |1 + gamma sum c'(m) z^-m|^(2 / gamma)` to the periodogram.
/// The estimate is returned as `c`, or as the normalized `(K, c')` when
/// [`normalized`](Self::set_normalized) output is selected.
#[derive(Debug, Clone)]
pub struct GeneralizedCepstralAnalysis {
    condition: Condition,
    gamma: f64,
    normalized: bool,
    work: Workspace,
}

impl Default for GeneralizedCepstralAnalysis {
    fn default() -> Self {
        Self::new(Condition::default(), GAMMA)
    }
}

impl GeneralizedCepstralAnalysis {
    pub fn new(condition: Condition, gamma: f64) -> Self {
        Self {
            condition,
            gamma,
            normalized: false,
            work: Workspace::default(),
        }
    }

    pub fn set_gamma(&mut self, gamma: f64) {
        self.gamma = gamma;
    }
    pub fn get_gamma(&self) -> f64 {
        self.gamma
    }

    /// Output `(K, c')` instead of `c`
    pub fn set_normalized(&mut self, normalized: bool) {
        self.normalized = normalized;
    }
    pub fn get_normalized(&self) -> bool {
        self.normalized
    }

    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Analysis for GeneralizedCepstralAnalysis {
    type Output = MelGeneralizedCepstrum;

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn analyze(
        &mut self,
        frame: &[f64],
    ) -> Result<Estimate<MelGeneralizedCepstrum>, AnalysisError> {
        self.condition.validate()?;
        let work = &mut self.work;
        work.reset(&self.condition, self.gamma);
        periodogram(
            &mut work.fft,
            &self.condition,
            frame,
            &mut work.x,
            &mut work.y,
        )?;
        work.initialize()?;

        let mut convergence = Convergence::new(
            Tracking::AfterMinimum,
            self.condition.get_min_iterations(),
            self.condition.get_end_threshold(),
            0.0,
        );
        let mut history = Vec::with_capacity(self.condition.get_max_iterations());
        let status = iterate(
            work,
            &mut convergence,
            self.condition.get_max_iterations(),
            &mut history,
        )?;
        tracing::debug!(?status, iterations = history.len(), gamma = self.gamma, "gcep");

        let mut gc = Box::<[f64]>::from(&work.gc[..]);
        if !self.normalized {
            ignorm(&mut gc, self.gamma);
        }
        Ok(Estimate {
            cepstrum: MelGeneralizedCepstrum::new(gc, 0.0, self.gamma),
            status,
            history,
        })
    }
}

/// `|1 + r (x + jy)|^(2 / r)`, or `exp(2x)` when `r == 0`.
fn agexp(r: f64, x: f64, y: f64) -> f64 {
    if r == 0.0 {
        return (2.0 * x).exp();
    }
    let x = 1.0 + r * x;
    let y = r * y;
    let w = x * x + y * y;
    if r < 0.0 {
        (1.0 / w).powf(-1.0 / r)
    } else {
        w.powf(1.0 / r)
    }
}

#[derive(Debug, Clone, Default)]
struct Workspace {
    fft: Fft,
    gamma: f64,
    order: usize,
    min_determinant: f64,
    /// gain measured by the last iteration
    gain: f64,
    x: Vec<f64>,
    y: Vec<f64>,
    cr: Vec<f64>,
    ci: Vec<f64>,
    rr: Vec<f64>,
    hr: Vec<f64>,
    hi: Vec<f64>,
    er: Vec<f64>,
    ei: Vec<f64>,
    gc: Vec<f64>,
}

impl Workspace {
    fn reset(&mut self, condition: &Condition, gamma: f64) {
        let flng = condition.get_frame_length();
        self.gamma = gamma;
        self.order = condition.get_order();
        self.min_determinant = condition.get_min_determinant();
        self.gain = 0.0;
        for v in [
            &mut self.x,
            &mut self.y,
            &mut self.cr,
            &mut self.ci,
            &mut self.rr,
            &mut self.hr,
            &mut self.hi,
            &mut self.er,
            &mut self.ei,
        ] {
            prepare(v, flng);
        }
        prepare(&mut self.gc, self.order + 1);
    }

    /// Log periodogram converted to gamma as the initial estimate.
    fn initialize(&mut self) -> Result<(), AnalysisError> {
        for (c, x) in self.cr.iter_mut().zip(&self.x) {
            *c = x.ln();
        }
        self.fft.ifftr(&mut self.cr, &mut self.y)?;
        self.cr[0] = (self.cr[0] / 2.0).exp();
        gc2gc(&self.cr[..=self.order], 0.0, &mut self.gc, self.gamma);
        Ok(())
    }
}

impl NewtonRaphson for Workspace {
    fn measure(&mut self, _: usize) -> Result<f64, AnalysisError> {
        let (m, g) = (self.order, self.gamma);
        self.cr.fill(0.0);
        self.cr[1..=m].copy_from_slice(&self.gc[1..]);
        self.fft.fftr(&mut self.cr, &mut self.ci)?;

        for i in 0..self.x.len() {
            let t = self.x[i] / agexp(g, self.cr[i], self.ci[i]);
            let cr = 1.0 + g * self.cr[i];
            let ci = g * self.ci[i];
            let s = cr * cr + ci * ci;
            self.rr[i] = t / s;
            self.hr[i] = (cr * cr - ci * ci) * t / (s * s);
            self.hi[i] = 2.0 * cr * ci * t / (s * s);
            self.er[i] = cr * t / s;
            self.ei[i] = ci * t / s;
        }

        self.fft.ifftr(&mut self.rr, &mut self.y)?;
        self.fft.ifft(&mut self.hr, &mut self.hi)?;
        self.fft.ifft(&mut self.er, &mut self.ei)?;

        let t: f64 = (1..=m).map(|i| self.er[i] * self.gc[i]).sum();
        self.gain = (self.er[0] + g * t).abs().sqrt();
        Ok(self.gain)
    }

    fn update(&mut self, iteration: usize) -> Result<(), AnalysisError> {
        let m = self.order;
        if m > 0 {
            for h in &mut self.hr[2..=2 * m] {
                *h *= 1.0 + self.gamma;
            }
            let y = theq(
                &self.rr[..m],
                &self.hr[2..=2 * m],
                &self.er[1..=m],
                self.min_determinant,
            )
            .map_err(singular(iteration))?;
            for (gc, y) in self.gc[1..].iter_mut().zip(y.iter()) {
                *gc += y;
            }
        }
        self.gc[0] = self.gain;
        Ok(())
    }
}
