use crate::{
    constants::{
        END_THRESHOLD, FRAME_LENGTH, MAX_ITERATIONS, MIN_DETERMINANT, MIN_ITERATIONS, ORDER,
    },
    error::AnalysisError,
    fft::Fft,
};

use super::periodogram::{Floor, InputType};

/// Parameters shared by every estimator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    /// Order of cepstrum
    order: usize,
    /// Frame length (FFT size)
    frame_length: usize,
    /// Encoding of the input frame
    input_type: InputType,
    /// Periodogram floor
    floor: Floor,
    /// Minimum number of iterations
    min_iterations: usize,
    /// Maximum number of iterations
    max_iterations: usize,
    /// End condition (relative change of the convergence quantity)
    end_threshold: f64,
    /// Minimum value of the determinant of the normal matrix
    min_determinant: f64,
}

impl Default for Condition {
    fn default() -> Self {
        Self {
            order: ORDER,
            frame_length: FRAME_LENGTH,
            input_type: InputType::Windowed,
            floor: Floor::None,
            min_iterations: MIN_ITERATIONS,
            max_iterations: MAX_ITERATIONS,
            end_threshold: END_THRESHOLD,
            min_determinant: MIN_DETERMINANT,
        }
    }
}

impl Condition {
    /// Set order of cepstrum
    pub fn set_order(&mut self, m: usize) {
        self.order = m;
    }
    /// Get order of cepstrum
    pub fn get_order(&self) -> usize {
        self.order
    }

    /// Set frame length; must be a power of two and at least 8
    pub fn set_frame_length(&mut self, l: usize) {
        self.frame_length = l;
    }
    /// Get frame length
    pub fn get_frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn set_input_type(&mut self, t: InputType) {
        self.input_type = t;
    }
    pub fn get_input_type(&self) -> InputType {
        self.input_type
    }

    pub fn set_floor(&mut self, floor: Floor) {
        self.floor = floor;
    }
    pub fn get_floor(&self) -> Floor {
        self.floor
    }

    /// Set minimum number of iterations, 1 <= i
    pub fn set_min_iterations(&mut self, i: usize) {
        self.min_iterations = i.max(1);
    }
    /// Get minimum number of iterations
    pub fn get_min_iterations(&self) -> usize {
        self.min_iterations
    }

    /// Set maximum number of iterations
    pub fn set_max_iterations(&mut self, i: usize) {
        self.max_iterations = i;
    }
    /// Get maximum number of iterations
    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Set end condition, 0.0 <= f
    pub fn set_end_threshold(&mut self, f: f64) {
        self.end_threshold = f.max(0.0);
    }
    /// Get end condition
    pub fn get_end_threshold(&self) -> f64 {
        self.end_threshold
    }

    /// Set minimum determinant of the normal matrix; negative selects 1e-6
    pub fn set_min_determinant(&mut self, f: f64) {
        self.min_determinant = f;
    }
    /// Get minimum determinant of the normal matrix
    pub fn get_min_determinant(&self) -> f64 {
        self.min_determinant
    }

    /// Number of values an input frame holds.
    pub fn input_length(&self) -> usize {
        match self.input_type {
            InputType::Windowed => self.frame_length,
            _ => self.frame_length / 2 + 1,
        }
    }

    /// Check the frame length and floor, and that the `2m` lags fit in the frame.
    pub(crate) fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_length < 8 {
            return Err(AnalysisError::InvalidFftLength(self.frame_length));
        }
        Fft::check(self.frame_length)?;
        self.floor.validate()?;
        if 2 * self.order >= self.frame_length {
            return Err(AnalysisError::OrderTooLarge {
                order: self.order,
                frame_length: self.frame_length,
            });
        }
        Ok(())
    }
}
