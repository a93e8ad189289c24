//! Radix-2 FFT with a grow-only sine table.
//!
//! The table belongs to an [`Fft`] instance instead of the process, so
//! every estimator (or thread) carries its own and reuses it across frames.

use std::f64::consts::PI;

use crate::error::AnalysisError;

/// Radix-2 complex/real FFT.
///
/// The sine table covers three quarters of a period of the largest length
/// requested so far (cosines are read a quarter period further on). It is
/// regenerated when a longer transform is requested and never shrinks.
#[derive(Debug, Clone, Default)]
pub struct Fft {
    sintbl: Vec<f64>,
    max_size: usize,
}

impl Fft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest transform length the sine table currently covers.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// `m` must be `4 * 2^k`.
    pub fn check(m: usize) -> Result<(), AnalysisError> {
        if m >= 4 && m.is_power_of_two() {
            Ok(())
        } else {
            Err(AnalysisError::InvalidFftLength(m))
        }
    }

    fn grow(&mut self, m: usize) {
        if !self.sintbl.is_empty() && self.max_size >= m {
            return;
        }
        let tblsize = m - m / 4 + 1;
        let arg = PI / m as f64 * 2.0;
        self.sintbl = (0..tblsize)
            .map(|j| if j == 0 { 0.0 } else { (arg * j as f64).sin() })
            .collect();
        self.sintbl[m / 2] = 0.0;
        self.max_size = m;
    }

    #[inline(always)]
    fn sin(&self, index: usize) -> f64 {
        self.sintbl[index]
    }

    #[inline(always)]
    fn cos(&self, index: usize) -> f64 {
        self.sintbl[self.max_size / 4 + index]
    }

    /// In-place complex FFT of `x + jy`; the length is `x.len()`.
    pub fn fft(&mut self, x: &mut [f64], y: &mut [f64]) -> Result<(), AnalysisError> {
        let m = x.len();
        debug_assert_eq!(m, y.len());
        Self::check(m)?;
        self.grow(m);

        let mut lf = self.max_size / m;
        let mut lmx = m;
        loop {
            let lix = lmx;
            lmx /= 2;
            if lmx <= 1 {
                break;
            }
            for j in 0..lmx {
                let (s, c) = (self.sin(j * lf), self.cos(j * lf));
                for p in (j..m).step_by(lix) {
                    let t1 = x[p] - x[p + lmx];
                    let t2 = y[p] - y[p + lmx];
                    x[p] += x[p + lmx];
                    y[p] += y[p + lmx];
                    x[p + lmx] = c * t1 + s * t2;
                    y[p + lmx] = c * t2 - s * t1;
                }
            }
            lf += lf;
        }

        for p in (0..m).step_by(2) {
            let t1 = x[p] - x[p + 1];
            let t2 = y[p] - y[p + 1];
            x[p] += x[p + 1];
            y[p] += y[p + 1];
            x[p + 1] = t1;
            y[p + 1] = t2;
        }

        // bit reversal
        let mv2 = m / 2;
        let mut j = 0;
        for lmx in 0..m - 1 {
            if lmx < j {
                x.swap(lmx, j);
                y.swap(lmx, j);
            }
            let mut li = mv2;
            while li <= j {
                j -= li;
                li /= 2;
            }
            j += li;
        }

        Ok(())
    }

    /// In-place inverse complex FFT, normalized by the length.
    pub fn ifft(&mut self, x: &mut [f64], y: &mut [f64]) -> Result<(), AnalysisError> {
        self.fft(y, x)?;
        let m = x.len() as f64;
        for (x, y) in x.iter_mut().zip(y.iter_mut()) {
            *x /= m;
            *y /= m;
        }
        Ok(())
    }

    /// FFT of the real sequence `x`; `y` is scratch on input and receives the
    /// imaginary part. Runs a half-length complex FFT, so `x.len() >= 8`.
    pub fn fftr(&mut self, x: &mut [f64], y: &mut [f64]) -> Result<(), AnalysisError> {
        let m = x.len();
        debug_assert_eq!(m, y.len());
        if m < 8 {
            return Err(AnalysisError::InvalidFftLength(m));
        }
        let mv2 = m / 2;

        // separate even and odd
        for i in 0..mv2 {
            x[i] = x[2 * i];
            y[i] = x[2 * i + 1];
        }

        self.fft(&mut x[..mv2], &mut y[..mv2])?;
        self.grow(m);

        let n = self.max_size / m;

        x[mv2] = x[0] - y[0];
        x[0] += y[0];
        y[mv2] = 0.0;
        y[0] = 0.0;

        for k in 1..mv2 {
            let (s, c) = (self.sin(k * n), self.cos(k * n));
            let q = mv2 - k;
            let yt = y[k] + y[q];
            let xt = x[k] - x[q];
            x[m - k] = (x[k] + x[q] + c * yt - s * xt) * 0.5;
            y[m - k] = (y[q] - y[k] + s * yt + c * xt) * 0.5;
        }

        for k in 1..mv2 {
            x[k] = x[m - k];
            y[k] = -y[m - k];
        }

        Ok(())
    }

    /// Inverse of [`Fft::fftr`] for sequences with a real, even spectrum.
    pub fn ifftr(&mut self, x: &mut [f64], y: &mut [f64]) -> Result<(), AnalysisError> {
        self.fftr(x, y)?;
        let l = x.len() as f64;
        for (x, y) in x.iter_mut().zip(y.iter_mut()) {
            *x /= l;
            *y /= -l;
        }
        Ok(())
    }
}
