use crate::{error::AnalysisError, fft::Fft};

use super::condition::Condition;

/// Encoding of an input frame.
///
/// Every encoding but [`InputType::Windowed`] carries the bins `0..=flng/2`
/// of a spectrum; the remaining bins are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputType {
    /// Windowed sequence of `flng` samples: `|X(k)|^2 + eps`.
    Windowed = 0,
    /// Amplitude in dB: `(10^(x/20))^2 + eps`.
    Decibel = 1,
    /// Natural log amplitude: `(e^x)^2 + eps`.
    Log = 2,
    /// Amplitude: `x^2 + eps`.
    Amplitude = 3,
    /// Periodogram: `x + eps`.
    Periodogram = 4,
}

impl TryFrom<u8> for InputType {
    type Error = AnalysisError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Windowed),
            1 => Ok(Self::Decibel),
            2 => Ok(Self::Log),
            3 => Ok(Self::Amplitude),
            4 => Ok(Self::Periodogram),
            v => Err(AnalysisError::InvalidInputType(v)),
        }
    }
}

/// Flooring applied to the periodogram before taking its logarithm.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Floor {
    None,
    /// Value added to every bin, `e >= 0`.
    Absolute(f64),
    /// Floor `E < 0` dB relative to the peak amplitude.
    RelativeDb(f64),
}

impl Floor {
    pub(crate) fn validate(self) -> Result<(), AnalysisError> {
        match self {
            Self::Absolute(e) if e < 0.0 || e.is_nan() => Err(AnalysisError::InvalidFloor(self)),
            Self::RelativeDb(e) if e >= 0.0 || e.is_nan() => Err(AnalysisError::InvalidFloor(self)),
            _ => Ok(()),
        }
    }
}

/// Convert `frame` into the full periodogram `x(0..flng)`.
///
/// `y` is scratch of the same length. Every bin of the result is strictly
/// positive, or [`AnalysisError::NonPositivePeriodogram`] names the first
/// offending bin.
pub(crate) fn periodogram(
    fft: &mut Fft,
    condition: &Condition,
    frame: &[f64],
    x: &mut [f64],
    y: &mut [f64],
) -> Result<(), AnalysisError> {
    let flng = condition.get_frame_length();
    let expected = condition.input_length();
    if frame.len() != expected {
        return Err(AnalysisError::InvalidFrameLength {
            expected,
            actual: frame.len(),
        });
    }
    debug_assert!(x.len() == flng && y.len() == flng);

    let floor = condition.get_floor();
    let eps = match floor {
        Floor::Absolute(e) => e,
        _ => 0.0,
    };

    x.fill(0.0);
    x[..expected].copy_from_slice(frame);

    let half = flng / 2;
    match condition.get_input_type() {
        InputType::Windowed => {
            fft.fftr(x, y)?;
            for (x, y) in x.iter_mut().zip(y.iter()) {
                *x = *x * *x + *y * *y + eps;
            }
        }
        InputType::Decibel => {
            for v in x[..=half].iter_mut() {
                let a = ((*v / 20.0) * 10.0f64.ln()).exp();
                *v = a * a + eps;
            }
        }
        InputType::Log => {
            for v in x[..=half].iter_mut() {
                let a = v.exp();
                *v = a * a + eps;
            }
        }
        InputType::Amplitude => {
            for v in x[..=half].iter_mut() {
                *v = *v * *v + eps;
            }
        }
        InputType::Periodogram => {
            for v in x[..=half].iter_mut() {
                *v += eps;
            }
        }
    }
    if condition.get_input_type() != InputType::Windowed {
        for i in 1..half {
            x[flng - i] = x[i];
        }
    }

    if let Floor::RelativeDb(e) = floor {
        let max = x.iter().copied().fold(x[0], f64::max).sqrt();
        let min = max * 10.0f64.powf(e / 20.0);
        let min = min * min;
        for v in x.iter_mut() {
            if *v < min {
                *v = min;
            }
        }
    }

    match x.iter().position(|v| *v <= 0.0 || v.is_nan()) {
        Some(index) => Err(AnalysisError::NonPositivePeriodogram { index }),
        None => Ok(()),
    }
}
