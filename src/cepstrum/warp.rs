//! Second-order all-pass frequency warping.
//!
//! The all-pass
//! `(z^-1 - a e^{jt}) (z^-1 - a e^{-jt}) / ((1 - a e^{jt} z^-1) (1 - a e^{-jt} z^-1))`
//! has no closed-form recursion like [`freqt`](super::freqt), so its
//! transformation matrices are sampled on an `fftsz`-point grid and cached.

use std::{collections::HashMap, f64::consts::PI, sync::Arc};

use crate::{error::AnalysisError, fft::Fft};

/// Warped frequency of `w` under the all-pass `(a, t)`.
pub fn warp(w: f64, a: f64, t: f64) -> f64 {
    let x = w - t;
    let y = w + t;
    w + (a * x.sin()).atan2(1.0 - a * x.cos()) + (a * y.sin()).atan2(1.0 - a * y.cos())
}

/// Derivative of [`warp`] with respect to `w`.
pub fn derivw(w: f64, a: f64, t: f64) -> f64 {
    let x = w - t;
    let y = w + t;
    let a2 = a + a;
    let aa = a * a;
    1.0 + (a * x.cos() - aa) / (1.0 - a2 * x.cos() + aa)
        + (a * y.cos() - aa) / (1.0 - a2 * y.cos() + aa)
}

/// Row-major dense matrix.
#[derive(Debug, Clone)]
struct Matrix {
    data: Box<[f64]>,
    cols: usize,
}

impl Matrix {
    fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: boxed_slice![0.0; rows * cols],
            cols,
        }
    }

    fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// `y = M x`; `x` supplies at least `cols` elements, `y` one per row.
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        for (y, row) in y.iter_mut().zip(self.data.chunks_exact(self.cols)) {
            *y = row.iter().zip(x).map(|(m, x)| m * x).sum();
        }
    }
}

/// Transformation tables of one `(alpha, theta, fftsz, m, flng)` combination.
#[derive(Debug, Clone)]
pub struct WarpTables {
    order: usize,
    half: usize,
    al: Box<[f64]>,
    freqt: Matrix,
    ifreqt: Matrix,
    frqtr: Matrix,
}

struct Grid {
    fftsz: usize,
    ww: Box<[f64]>,
    re: Box<[f64]>,
    im: Box<[f64]>,
}

impl Grid {
    fn new(fftsz: usize, alpha: f64, theta: f64) -> Self {
        let b = 2.0 * PI / fftsz as f64;
        let mut w = 0.0;
        let ww = (0..fftsz)
            .map(|_| {
                let v = warp(w, alpha, theta);
                w += b;
                v
            })
            .collect();
        Self {
            fftsz,
            ww,
            re: boxed_slice![0.0; fftsz],
            im: boxed_slice![0.0; fftsz],
        }
    }

    /// Inverse FFT of `e^{-j i ww} dw`; the result stays in `self.re`.
    fn row(&mut self, fft: &mut Fft, i: isize, dw: Option<&[f64]>) -> Result<(), AnalysisError> {
        for j in 0..self.fftsz {
            let arg = self.ww[j] * i as f64;
            let scale = dw.map_or(1.0, |dw| dw[j]);
            self.re[j] = arg.cos() * scale;
            self.im[j] = -arg.sin() * scale;
        }
        fft.ifft(&mut self.re, &mut self.im)
    }

    /// Fold the negative lags onto the positive ones.
    fn fold(&mut self, n: usize) {
        for j in 1..=n {
            self.re[j] += self.re[self.fftsz - j];
        }
    }
}

impl WarpTables {
    fn build(
        fft: &mut Fft,
        alpha: f64,
        theta: f64,
        fftsz: usize,
        m: usize,
        flng: usize,
    ) -> Result<Self, AnalysisError> {
        let f2 = flng / 2;
        let mut grid = Grid::new(fftsz, alpha, theta);

        let mut w = 0.0;
        let b = 2.0 * PI / fftsz as f64;
        let dw: Box<[f64]> = (0..fftsz)
            .map(|_| {
                let v = derivw(w, alpha, theta);
                w += b;
                v
            })
            .collect();

        let mut al = boxed_slice![0.0; m + 1];
        for (i, al) in al.iter_mut().enumerate() {
            grid.row(fft, i as isize, None)?;
            *al = grid.re[0];
        }

        let mut freqt = Matrix::zeros(m + 1, f2 + 1);
        for i in 0..=m {
            grid.row(fft, i as isize, Some(&dw[..]))?;
            grid.fold(f2);
            freqt.row_mut(i).copy_from_slice(&grid.re[..=f2]);
        }
        for v in &mut freqt.row_mut(0)[1..] {
            *v *= 0.5;
        }
        for i in 1..=m {
            freqt.row_mut(i)[0] *= 2.0;
        }

        // lag rows -m..=m, row(k) += row(-k)
        let mut lags = Matrix::zeros(2 * m + 1, f2 + 1);
        for (r, i) in (-(m as isize)..=m as isize).enumerate() {
            grid.row(fft, i, None)?;
            lags.row_mut(r).copy_from_slice(&grid.re[..=f2]);
        }
        for k in 1..=m {
            let (negative, positive) = (m - k, m + k);
            for j in 0..=f2 {
                let v = lags.data[negative * lags.cols + j];
                lags.data[positive * lags.cols + j] += v;
            }
        }
        let mut ifreqt = Matrix::zeros(f2 + 1, m + 1);
        for i in 0..=f2 {
            for j in 0..=m {
                ifreqt.data[i * ifreqt.cols + j] = lags.data[(m + j) * lags.cols + i];
            }
        }
        for v in &mut ifreqt.row_mut(0)[1..] {
            *v *= 0.5;
        }
        for i in 1..=f2 {
            ifreqt.row_mut(i)[0] *= 2.0;
        }

        let mut frqtr = Matrix::zeros(2 * m + 1, f2 + 1);
        for i in 0..=2 * m {
            grid.row(fft, i as isize, None)?;
            grid.fold(f2);
            frqtr.row_mut(i).copy_from_slice(&grid.re[..=f2]);
        }

        Ok(Self {
            order: m,
            half: f2,
            al,
            freqt,
            ifreqt,
            frqtr,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Warped image of the unit impulse, `al(0..=m)`.
    pub fn al(&self) -> &[f64] {
        &self.al
    }

    /// Cepstrum `c(0..=flng/2)` to warped cepstrum `mc(0..=m)`.
    pub fn freqt(&self, c: &[f64], mc: &mut [f64]) {
        debug_assert!(c.len() > self.half && mc.len() > self.order);
        self.freqt.apply(c, &mut mc[..=self.order]);
    }

    /// Warped cepstrum `mc(0..=m)` back to cepstrum `c(0..=flng/2)`.
    pub fn ifreqt(&self, mc: &[f64], c: &mut [f64]) {
        debug_assert!(mc.len() > self.order && c.len() > self.half);
        self.ifreqt.apply(mc, &mut c[..=self.half]);
    }

    /// Correlation `r(0..=flng/2)` to warped lags `(0..=2m)`.
    pub fn frqtr(&self, r: &[f64], out: &mut [f64]) {
        debug_assert!(r.len() > self.half && out.len() > 2 * self.order);
        self.frqtr.apply(r, &mut out[..=2 * self.order]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct WarpKey {
    alpha: u64,
    theta: u64,
    fftsz: usize,
    order: usize,
    frame_length: usize,
}

/// Grow-only cache of [`WarpTables`].
///
/// Entries are never evicted; an estimator that keeps its parameters fixed
/// builds its tables once.
#[derive(Debug, Clone, Default)]
pub struct WarpCache {
    tables: HashMap<WarpKey, Arc<WarpTables>>,
}

impl WarpCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables for `(alpha, theta)` sampled on `fftsz` points, for order `m`
    /// and frame length `flng`.
    ///
    /// `fftsz` must be a power of two larger than `flng / 2`.
    pub fn get(
        &mut self,
        fft: &mut Fft,
        alpha: f64,
        theta: f64,
        fftsz: usize,
        m: usize,
        flng: usize,
    ) -> Result<Arc<WarpTables>, AnalysisError> {
        Fft::check(fftsz)?;
        if fftsz <= flng / 2 {
            return Err(AnalysisError::InvalidFftLength(fftsz));
        }

        let key = WarpKey {
            alpha: alpha.to_bits(),
            theta: theta.to_bits(),
            fftsz,
            order: m,
            frame_length: flng,
        };
        if let Some(tables) = self.tables.get(&key) {
            return Ok(Arc::clone(tables));
        }

        tracing::debug!(alpha, theta, fftsz, order = m, frame_length = flng, "building warp tables");
        let tables = Arc::new(WarpTables::build(fft, alpha, theta, fftsz, m, flng)?);
        self.tables.insert(key, Arc::clone(&tables));
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;

    use super::{WarpCache, derivw, warp};
    use crate::{cepstrum::freqt, fft::Fft};

    #[test]
    fn warp_fixes_band_edges() {
        for (a, t) in [(0.35, 0.0), (0.4, 0.3 * PI), (-0.2, 0.5 * PI)] {
            assert_abs_diff_eq!(warp(0.0, a, t), 0.0, epsilon = 1.0e-12);
            assert_abs_diff_eq!(warp(PI, a, t), PI, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn derivative_matches_difference() {
        let (a, t) = (0.35, 0.2 * PI);
        for w in [0.1, 0.7, 1.5, 2.9] {
            let h = 1.0e-6;
            let numeric = (warp(w + h, a, t) - warp(w - h, a, t)) / (2.0 * h);
            assert_abs_diff_eq!(derivw(w, a, t), numeric, epsilon = 1.0e-6);
        }
    }

    #[test]
    fn zero_theta_reduces_to_first_order() {
        let (alpha, m, flng) = (0.2, 6, 64);
        let mut fft = Fft::new();
        let mut cache = WarpCache::new();
        let tables = cache.get(&mut fft, alpha, 0.0, 1024, m, flng).unwrap();

        let mut c = vec![0.0; flng / 2 + 1];
        for (i, c) in c.iter_mut().enumerate().take(8) {
            *c = 0.5f64.powi(i as i32) / (i + 1) as f64;
        }
        let mut warped = vec![0.0; m + 1];
        tables.freqt(&c, &mut warped);

        let mut expected = vec![0.0; m + 1];
        freqt(&c, &mut expected, alpha);
        for i in 0..=m {
            assert_abs_diff_eq!(warped[i], expected[i], epsilon = 1.0e-9);
            assert_abs_diff_eq!(tables.al()[i], (-alpha).powi(i as i32), epsilon = 1.0e-9);
        }
    }

    #[test]
    fn inverse_undoes_forward() {
        let (alpha, theta, m, flng) = (0.3, 0.25 * PI, 8, 128);
        let mut fft = Fft::new();
        let mut cache = WarpCache::new();
        let tables = cache.get(&mut fft, alpha, theta, 1024, m, flng).unwrap();

        let mc = [0.4, -0.3, 0.2, 0.1, -0.05, 0.03, 0.0, 0.01, -0.01];
        let mut c = vec![0.0; flng / 2 + 1];
        tables.ifreqt(&mc, &mut c);
        let mut back = vec![0.0; m + 1];
        tables.freqt(&c, &mut back);
        for i in 0..=m {
            assert_abs_diff_eq!(back[i], mc[i], epsilon = 1.0e-9);
        }
    }

    #[test]
    fn cache_is_keyed_by_parameters() {
        let mut fft = Fft::new();
        let mut cache = WarpCache::new();
        let a = cache.get(&mut fft, 0.3, 0.0, 256, 4, 64).unwrap();
        let b = cache.get(&mut fft, 0.3, 0.0, 256, 4, 64).unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.get(&mut fft, 0.3, 0.1, 256, 4, 64).unwrap();
        cache.get(&mut fft, 0.3, 0.0, 256, 5, 64).unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(a.al().len(), 5);
        assert_abs_diff_eq!(a.al()[0], 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn rejects_coarse_grid() {
        let mut fft = Fft::new();
        let mut cache = WarpCache::new();
        assert!(cache.get(&mut fft, 0.3, 0.0, 32, 4, 64).is_err());
        assert!(cache.get(&mut fft, 0.3, 0.0, 100, 4, 64).is_err());
        assert!(cache.is_empty());
    }
}
