use crate::{
    cepstrum::{b2c, b2mc, gc2gc, gnorm, ignorm, mc2b},
    constants::{ALPHA, GAMMA},
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

/// Representation the estimate of [`MelGeneralizedCepstralAnalysis`] is
/// written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputFormat {
    /// `c~(0..=m)`
    #[default]
    MelGeneralizedCepstrum = 0,
    /// MGLSA filter coefficients `b(0..=m)`
    FilterCoefficients = 1,
    /// `(K~, c~'(1..=m))`
    NormalizedMelGeneralizedCepstrum = 2,
    /// `(K, b'(1..=m))`, the form the estimator works in
    NormalizedFilterCoefficients = 3,
    /// `(K~, gamma c~'(1..=m))`
    ScaledMelGeneralizedCepstrum = 4,
    /// `(K, gamma b'(1..=m))`
    ScaledFilterCoefficients = 5,
}

impl TryFrom<u8> for OutputFormat {
    type Error = AnalysisError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::MelGeneralizedCepstrum),
            1 => Ok(Self::FilterCoefficients),
            2 => Ok(Self::NormalizedMelGeneralizedCepstrum),
            3 => Ok(Self::NormalizedFilterCoefficients),
            4 => Ok(Self::ScaledMelGeneralizedCepstrum),
            5 => Ok(Self::ScaledFilterCoefficients),
            v => Err(AnalysisError::InvalidOutputFormat(v)),
        }
    }
}

impl OutputFormat {
    /// Convert normalized filter coefficients `(K, b')` in place.
    pub fn convert(self, b: &mut [f64], alpha: f64, gamma: f64) {
        use OutputFormat::*;

        if matches!(
            self,
            MelGeneralizedCepstrum
                | FilterCoefficients
                | NormalizedMelGeneralizedCepstrum
                | ScaledMelGeneralizedCepstrum
        ) {
            ignorm(b, gamma);
        }
        if alpha != 0.0
            && matches!(
                self,
                MelGeneralizedCepstrum
                    | NormalizedMelGeneralizedCepstrum
                    | ScaledMelGeneralizedCepstrum
            )
        {
            let br = b.to_vec();
            b2mc(&br, b, alpha);
        }
        if matches!(
            self,
            NormalizedMelGeneralizedCepstrum | ScaledMelGeneralizedCepstrum
        ) {
            gnorm(b, gamma);
        }
        if matches!(self, ScaledMelGeneralizedCepstrum | ScaledFilterCoefficients) {
            for v in &mut b[1..] {
                *v *= gamma;
            }
        }
    }
}

/// Mel-generalized cepstral analysis.
///
/// Fits `K^2 |1 + gamma sum b'(m) Phi_m(z)|^(2 / gamma)` over the MLSA
/// basis `Phi_m` of `alpha`. The estimate starts from the all-pole solution
/// (`gamma = -1`), is converted to the requested `gamma` and refined; with
/// `gamma == -1` the all-pole solution is final.
#[derive(Debug, Clone)]
pub struct MelGeneralizedCepstralAnalysis {
    condition: Condition,
    alpha: f64,
    gamma: f64,
    recursion_order: Option<usize>,
    output_format: OutputFormat,
    work: Workspace,
}

impl Default for MelGeneralizedCepstralAnalysis {
    fn default() -> Self {
        Self::new(Condition::default(), ALPHA, GAMMA)
    }
}

impl MelGeneralizedCepstralAnalysis {
    pub fn new(condition: Condition, alpha: f64, gamma: f64) -> Self {
        Self {
            condition,
            alpha,
            gamma,
            recursion_order: None,
            output_format: OutputFormat::default(),
            work: Workspace::default(),
        }
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }
    pub fn get_alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_gamma(&mut self, gamma: f64) {
        self.gamma = gamma;
    }
    pub fn get_gamma(&self) -> f64 {
        self.gamma
    }

    /// Set order of the recursion expanding the all-pass; `None` selects `flng - 1`
    pub fn set_recursion_order(&mut self, n: Option<usize>) {
        self.recursion_order = n;
    }
    pub fn get_recursion_order(&self) -> usize {
        self.recursion_order
            .unwrap_or(self.condition.get_frame_length().saturating_sub(1))
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.output_format = format;
    }
    pub fn get_output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Analysis for MelGeneralizedCepstralAnalysis {
    type Output = Box<[f64]>;

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn analyze(&mut self, frame: &[f64]) -> Result<Estimate<Box<[f64]>>, AnalysisError> {
        self.condition.validate()?;
        let (m, flng) = (
            self.condition.get_order(),
            self.condition.get_frame_length(),
        );
        let n = self.get_recursion_order();
        if n < 2 * m || n >= flng {
            return Err(AnalysisError::InvalidRecursionOrder {
                n,
                order: m,
                frame_length: flng,
            });
        }
        let (alpha, gamma) = (self.alpha, self.gamma);

        let work = &mut self.work;
        work.reset(&self.condition, alpha, n);
        periodogram(
            &mut work.fft,
            &self.condition,
            frame,
            &mut work.x,
            &mut work.ci,
        )?;

        work.gamma = -1.0;
        let ep = work.newton(0)?;
        let mut history = Vec::new();
        let status = if gamma == -1.0 {
            Status::Converged { iterations: 0 }
        } else {
            work.all_pole_to(gamma);
            work.gamma = gamma;
            let mut convergence = Convergence::new(
                Tracking::Always,
                self.condition.get_min_iterations(),
                self.condition.get_end_threshold(),
                ep,
            );
            history.reserve(self.condition.get_max_iterations());
            iterate(
                work,
                &mut convergence,
                self.condition.get_max_iterations(),
                &mut history,
            )?
        };
        tracing::debug!(?status, iterations = history.len(), alpha, gamma, "mgcep");

        let mut b = Box::<[f64]>::from(&work.b[..]);
        self.output_format.convert(&mut b, alpha, gamma);
        Ok(Estimate {
            cepstrum: b,
            status,
            history,
        })
    }
}

/// `epsilon`, the prediction error power of the normalized model.
fn gain(er: &[f64], c: &[f64], g: f64) -> f64 {
    if g != 0.0 {
        let t: f64 = er[1..].iter().zip(&c[1..]).map(|(e, c)| e * c).sum();
        er[0] + g * t
    } else {
        er[0]
    }
}

/// Warp the correlation `p(0..=m)` in place.
fn ptrans(p: &mut [f64], a: f64) {
    let m = p.len() - 1;
    if m == 0 {
        return;
    }
    let mut d = p[m];
    for k in (1..m).rev() {
        let o = p[k] + a * d;
        d = p[k];
        p[k] = o;
    }
    p[0] = (1.0 - a * a) * p[0] + 2.0 * a * d;
}

/// Warp the correlation `q(0..=2m)` in place; `q(0)` is left as is.
fn qtrans(q: &mut [f64], a: f64) {
    if q.len() < 2 {
        return;
    }
    let mut d = q[1];
    for v in &mut q[2..] {
        let o = *v + a * d;
        d = *v;
        *v = o;
    }
}

#[derive(Debug, Clone, Default)]
struct Workspace {
    fft: Fft,
    alpha: f64,
    /// gamma of the current Newton step
    gamma: f64,
    order: usize,
    recursion_order: usize,
    min_determinant: f64,
    x: Vec<f64>,
    cr: Vec<f64>,
    ci: Vec<f64>,
    pr: Vec<f64>,
    qr: Vec<f64>,
    qi: Vec<f64>,
    rr: Vec<f64>,
    ri: Vec<f64>,
    scratch: Vec<f64>,
    /// normalized filter coefficients `(K, b')`
    b: Vec<f64>,
}

impl Workspace {
    fn reset(&mut self, condition: &Condition, alpha: f64, n: usize) {
        let flng = condition.get_frame_length();
        self.alpha = alpha;
        self.order = condition.get_order();
        self.recursion_order = n;
        self.min_determinant = condition.get_min_determinant();
        for v in [
            &mut self.x,
            &mut self.cr,
            &mut self.ci,
            &mut self.pr,
            &mut self.qr,
            &mut self.qi,
            &mut self.rr,
            &mut self.ri,
        ] {
            prepare(v, flng);
        }
        prepare(&mut self.b, self.order + 1);
    }

    /// `b2c` of `v(0..=from)` into `v(0..=to)`.
    fn b2c_in_place(scratch: &mut Vec<f64>, v: &mut [f64], from: usize, to: usize, alpha: f64) {
        scratch.clear();
        scratch.extend_from_slice(&v[..=from]);
        b2c(scratch, &mut v[..=to], alpha);
    }

    /// One Newton-Raphson step at the current gamma; returns `log epsilon`.
    fn newton(&mut self, iteration: usize) -> Result<f64, AnalysisError> {
        let (m, n, a, g) = (self.order, self.recursion_order, self.alpha, self.gamma);

        self.cr.fill(0.0);
        self.cr[1..=m].copy_from_slice(&self.b[1..]);
        if a != 0.0 {
            Self::b2c_in_place(&mut self.scratch, &mut self.cr, m, n, -a);
        }
        self.fft.fftr(&mut self.cr, &mut self.ci)?;

        if g == -1.0 {
            self.pr.copy_from_slice(&self.x);
        } else if g == 0.0 {
            for ((p, x), c) in self.pr.iter_mut().zip(&self.x).zip(&self.cr) {
                *p = x / (c + c).exp();
            }
        } else {
            for i in 0..self.x.len() {
                let tr = 1.0 + g * self.cr[i];
                let ti = g * self.ci[i];
                let (trr, tii) = (tr * tr, ti * ti);
                let s = trr + tii;
                let t = self.x[i] * s.powf(-1.0 / g) / s;
                self.pr[i] = t;
                self.rr[i] = tr * t;
                self.ri[i] = ti * t;
                let t = t / s;
                self.qr[i] = (trr - tii) * t;
                self.qi[i] = 2.0 * tr * ti * t;
            }
        }

        self.fft.ifftr(&mut self.pr, &mut self.ci)?;
        if a != 0.0 {
            Self::b2c_in_place(&mut self.scratch, &mut self.pr, n, 2 * m, a);
        }

        if g == 0.0 || g == -1.0 {
            self.qr[..=2 * m].copy_from_slice(&self.pr[..=2 * m]);
            self.rr[..=m].copy_from_slice(&self.pr[..=m]);
        } else {
            self.fft.ifft(&mut self.qr, &mut self.qi)?;
            self.fft.ifft(&mut self.rr, &mut self.ri)?;
            if a != 0.0 {
                Self::b2c_in_place(&mut self.scratch, &mut self.qr, n, n, a);
                Self::b2c_in_place(&mut self.scratch, &mut self.rr, n, m, a);
            }
        }

        if a != 0.0 {
            ptrans(&mut self.pr[..=m], a);
            qtrans(&mut self.qr[..=2 * m], a);
        }

        let mut t = 0.0;
        if g != -1.0 {
            t = gain(&self.rr[..=m], &self.b, g);
            self.b[0] = t.sqrt();
        }

        if g == -1.0 {
            self.qr[..=2 * m].fill(0.0);
        } else if g != 0.0 {
            for q in self.qr.iter_mut().take(2 * m + 1).skip(2) {
                *q *= 1.0 + g;
            }
        }

        if m > 0 {
            let d = theq(
                &self.pr[..m],
                &self.qr[2..=2 * m],
                &self.rr[1..=m],
                self.min_determinant,
            )
            .map_err(singular(iteration))?;
            for (b, d) in self.b[1..].iter_mut().zip(d.iter()) {
                *b += d;
            }
        }

        if g == -1.0 {
            t = gain(&self.rr[..=m], &self.b, g);
            self.b[0] = t.sqrt();
        }

        Ok(t.ln())
    }

    /// Convert the all-pole `(K, b')` to the normalized coefficients of `gamma`.
    fn all_pole_to(&mut self, gamma: f64) {
        let a = self.alpha;
        let mut d = self.b.clone();
        if a != 0.0 {
            ignorm(&mut self.b, -1.0);
            b2mc(&self.b, &mut d, a);
            gnorm(&mut d, -1.0);
        }

        gc2gc(&d, -1.0, &mut self.b, gamma);

        if a != 0.0 {
            ignorm(&mut self.b, gamma);
            d.copy_from_slice(&self.b);
            mc2b(&d, &mut self.b, a);
            gnorm(&mut self.b, gamma);
        }
    }
}

impl NewtonRaphson for Workspace {
    fn measure(&mut self, iteration: usize) -> Result<f64, AnalysisError> {
        self.newton(iteration)
    }
}
