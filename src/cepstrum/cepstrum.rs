use super::{
    buffer::*,
    coefficients::{Coefficients, CoefficientsT, GeneralizedCoefficients},
    generalized::Generalized,
    transform,
};

/// Mel-cepstrum `c~(0..=m)` under the all-pass constant `alpha`.
///
/// `alpha == 0` is the plain cepstrum.
#[derive(Debug, Clone, PartialEq)]
pub struct MelCepstrum {
    pub(super) buffer: Box<[f64]>,
    pub(super) alpha: f64,
}

coefficient_buffer!(MelCepstrum);

impl MelCepstrum {
    pub fn new(c: impl Into<Box<[f64]>>, alpha: f64) -> Self {
        Self {
            buffer: c.into(),
            alpha,
        }
    }
}

impl CepstrumT for MelCepstrum {
    type Coef = Coefficients;

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn to_coef(&self) -> Self::Coef {
        Self::Coef::new(boxed_slice![0.0; self.len()])
    }

    fn clone_with_size(&self, size: usize, alpha: f64) -> Self {
        Self {
            buffer: boxed_slice![0.0; size],
            alpha,
        }
    }
}

/// Mel-generalized cepstrum under `alpha` and `gamma`.
///
/// Whether the buffer holds `c(0..=m)` or its gain-normalized form
/// `(K, c'(1..=m))` is up to the producer; [`Generalized`] converts.
#[derive(Debug, Clone, PartialEq)]
pub struct MelGeneralizedCepstrum {
    pub(super) buffer: Box<[f64]>,
    pub(super) alpha: f64,
    pub(super) gamma: f64,
}

coefficient_buffer!(MelGeneralizedCepstrum);

impl MelGeneralizedCepstrum {
    pub fn new(c: impl Into<Box<[f64]>>, alpha: f64, gamma: f64) -> Self {
        Self {
            buffer: c.into(),
            alpha,
            gamma,
        }
    }

    /// Normalized generalized cepstrum converted to another `gamma`.
    pub fn gc2gc(&self, m2: usize, gamma: f64) -> Self {
        let mut cepstrum = Self {
            buffer: boxed_slice![0.0; m2 + 1],
            alpha: self.alpha,
            gamma,
        };
        transform::gc2gc(self, self.gamma, &mut cepstrum, gamma);
        cepstrum
    }

    pub fn mgc2mgc(&self, m2: usize, alpha: f64, gamma: f64) -> Self {
        let mut cepstrum = Self {
            buffer: boxed_slice![0.0; m2 + 1],
            alpha,
            gamma,
        };
        transform::mgc2mgc(self, self.alpha, self.gamma, &mut cepstrum, alpha, gamma);
        cepstrum
    }
}

impl From<MelCepstrum> for MelGeneralizedCepstrum {
    fn from(value: MelCepstrum) -> Self {
        Self {
            buffer: value.buffer,
            alpha: value.alpha,
            gamma: 0.0,
        }
    }
}

impl CepstrumT for MelGeneralizedCepstrum {
    type Coef = GeneralizedCoefficients;

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn to_coef(&self) -> Self::Coef {
        Self::Coef::new(boxed_slice![0.0; self.len()], self.gamma)
    }

    fn clone_with_size(&self, size: usize, alpha: f64) -> Self {
        Self {
            buffer: boxed_slice![0.0; size],
            alpha,
            gamma: self.gamma,
        }
    }
}

impl Generalized for MelGeneralizedCepstrum {
    fn gamma(&self) -> f64 {
        self.gamma
    }
}

/// Cepstrum warped by the second-order all-pass `(alpha, theta)`.
///
/// `theta` is the emphasized frequency in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpedCepstrum {
    pub(super) buffer: Box<[f64]>,
    pub(super) alpha: f64,
    pub(super) theta: f64,
}

coefficient_buffer!(WarpedCepstrum);

impl WarpedCepstrum {
    pub fn new(c: impl Into<Box<[f64]>>, alpha: f64, theta: f64) -> Self {
        Self {
            buffer: c.into(),
            alpha,
            theta,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }
}

pub trait CepstrumT: Buffer + Sized {
    type Coef: CoefficientsT;

    fn alpha(&self) -> f64;

    fn to_coef(&self) -> Self::Coef;

    fn clone_with_size(&self, size: usize, alpha: f64) -> Self;

    fn order(&self) -> usize {
        self.len() - 1
    }

    fn mc2b(&self) -> Self::Coef {
        let mut coefficients = self.to_coef();
        transform::mc2b(self, &mut coefficients, self.alpha());
        coefficients
    }

    /// Apply the all-pass transform `alpha` and truncate to order `m2`.
    ///
    /// The result is expressed under the composed all-pass constant, so
    /// `freqt(m2, -self.alpha())` yields the plain cepstrum.
    fn freqt(&self, m2: usize, alpha: f64) -> Self {
        let composed = (alpha + self.alpha()) / (1.0 + alpha * self.alpha());
        let mut cepstrum = self.clone_with_size(m2 + 1, composed);
        transform::freqt(self, &mut cepstrum, alpha);
        cepstrum
    }

    /// Minimum-phase impulse response of length `len`.
    fn c2ir(&self, len: usize) -> Box<[f64]> {
        let mut ir = boxed_slice![0.0; len];
        transform::c2ir(self, &mut ir);
        ir
    }
}
