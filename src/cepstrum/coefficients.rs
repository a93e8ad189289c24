use super::{
    buffer::*,
    cepstrum::{CepstrumT, MelCepstrum, MelGeneralizedCepstrum},
    generalized::Generalized,
    transform,
};

/// MLSA filter coefficients `b(0..=m)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    buffer: Box<[f64]>,
}

coefficient_buffer!(Coefficients);

impl Coefficients {
    pub fn new(b: impl Into<Box<[f64]>>) -> Self {
        Self { buffer: b.into() }
    }
}

impl CoefficientsT for Coefficients {
    type Cep = MelCepstrum;

    fn to_cep(&self, alpha: f64) -> Self::Cep {
        Self::Cep {
            buffer: boxed_slice![0.0; self.len()],
            alpha,
        }
    }
}

/// MGLSA filter coefficients, normalized as `(K, b'(1..=m))` when produced by
/// the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedCoefficients {
    buffer: Box<[f64]>,
    gamma: f64,
}

coefficient_buffer!(GeneralizedCoefficients);

impl GeneralizedCoefficients {
    pub fn new(b: impl Into<Box<[f64]>>, gamma: f64) -> Self {
        Self {
            buffer: b.into(),
            gamma,
        }
    }
}

impl CoefficientsT for GeneralizedCoefficients {
    type Cep = MelGeneralizedCepstrum;

    fn to_cep(&self, alpha: f64) -> Self::Cep {
        Self::Cep {
            buffer: boxed_slice![0.0; self.len()],
            alpha,
            gamma: self.gamma,
        }
    }
}

impl Generalized for GeneralizedCoefficients {
    fn gamma(&self) -> f64 {
        self.gamma
    }
}

pub trait CoefficientsT: Buffer + Sized {
    type Cep: CepstrumT;

    fn to_cep(&self, alpha: f64) -> Self::Cep;

    fn b2mc(&self, alpha: f64) -> Self::Cep {
        let mut cepstrum = self.to_cep(alpha);
        transform::b2mc(self, &mut cepstrum, alpha);
        cepstrum
    }
}
