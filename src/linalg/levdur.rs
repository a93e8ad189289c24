use crate::{constants::LEVDUR_EPS, error::AnalysisError};

/// Whether every reflection coefficient stayed inside the unit circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Stable,
    /// Some reflection coefficient has magnitude `>= 1`; the predictor is
    /// not minimum phase but the coefficients are still returned.
    Unstable,
}

/// Linear prediction coefficients `a[0..=m]`, `a[0]` being the gain.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPrediction {
    pub coefficients: Box<[f64]>,
    pub stability: Stability,
}

impl LinearPrediction {
    /// Estimate an order-`m` predictor from the frame `x` (autocorrelation method).
    pub fn from_frame(x: &[f64], m: usize, eps: f64) -> Result<Self, AnalysisError> {
        levdur(&acorr(x, m), m, eps)
    }

    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn gain(&self) -> f64 {
        self.coefficients[0]
    }

    /// LPC cepstrum of order `m2`.
    pub fn to_cepstrum(&self, m2: usize) -> Box<[f64]> {
        lpc2c(&self.coefficients, m2)
    }
}

/// Solve the autocorrelation normal equations of order `m`.
///
/// `r` needs at least `m + 1` lags. The residual energy is checked before
/// the first order and after every order; a magnitude `<= eps` (or NaN) is
/// [`AnalysisError::ResidualTooSmall`]. A negative `eps` selects `1e-6`.
pub fn levdur(r: &[f64], m: usize, eps: f64) -> Result<LinearPrediction, AnalysisError> {
    debug_assert!(r.len() > m);
    let eps = if eps < 0.0 { LEVDUR_EPS } else { eps };

    let check = |order: usize, rmd: f64| {
        if rmd.abs() <= eps || rmd.is_nan() {
            Err(AnalysisError::ResidualTooSmall {
                order,
                residual: rmd,
            })
        } else {
            Ok(())
        }
    };

    let mut rmd = r[0];
    check(0, rmd)?;

    let mut a = vec![0.0; m + 1];
    let mut c = vec![0.0; m + 1];
    let mut stability = Stability::Stable;

    for l in 1..=m {
        let mut mue = -r[l];
        for k in 1..l {
            mue -= c[k] * r[l - k];
        }
        mue /= rmd;

        for k in 1..l {
            a[k] = c[k] + mue * c[l - k];
        }
        a[l] = mue;

        rmd *= 1.0 - mue * mue;
        check(l, rmd)?;
        if mue.abs() >= 1.0 {
            tracing::warn!(order = l, reflection = mue, "unstable reflection coefficient");
            stability = Stability::Unstable;
        }

        c[..=l].copy_from_slice(&a[..=l]);
    }
    // NaN when the residual went negative on an unstable predictor
    a[0] = rmd.sqrt();

    Ok(LinearPrediction {
        coefficients: a.into(),
        stability,
    })
}

/// Autocorrelation `r[0..=np]` of `x`.
pub fn acorr(x: &[f64], np: usize) -> Box<[f64]> {
    (0..=np)
        .map(|k| {
            x.iter()
                .zip(x.iter().skip(k))
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Cepstrum `c[0..=m2]` of the all-pole model `a[0..=m1]` (`a[0]` = gain).
pub fn lpc2c(a: &[f64], m2: usize) -> Box<[f64]> {
    let m1 = a.len() - 1;
    let mut c = vec![0.0; m2 + 1];
    c[0] = a[0].ln();
    if m2 == 0 {
        return c.into();
    }
    c[1] = if m1 >= 1 { -a[1] } else { 0.0 };
    for k in 2..=m2 {
        let lower = if k > m1 { k - m1 } else { 1 };
        let d: f64 = (lower..k).map(|i| i as f64 * c[i] * a[k - i]).sum();
        c[k] = -d / k as f64;
        if k <= m1 {
            c[k] -= a[k];
        }
    }
    c.into()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::{LinearPrediction, Stability, acorr, levdur, lpc2c};
    use crate::error::AnalysisError;

    #[test]
    fn recovers_ar2() {
        // x[n] = 0.9 x[n-1] - 0.5 x[n-2] + e[n], r normalized to r[0] = 1
        let r = [1.0, 0.6, 0.04];
        let lp = levdur(&r, 2, 1.0e-6).unwrap();
        assert_eq!(lp.stability, Stability::Stable);
        assert_abs_diff_eq!(lp.coefficients[1], -0.9, epsilon = 1.0e-12);
        assert_abs_diff_eq!(lp.coefficients[2], 0.5, epsilon = 1.0e-12);
        assert_abs_diff_eq!(lp.gain(), 0.48f64.sqrt(), epsilon = 1.0e-12);
    }

    #[test]
    fn vanishing_energy_fails() {
        assert_eq!(
            levdur(&[1.0e-9, 0.0], 1, 1.0e-6),
            Err(AnalysisError::ResidualTooSmall {
                order: 0,
                residual: 1.0e-9
            })
        );
        assert!(matches!(
            levdur(&[f64::NAN, 0.0], 1, -1.0),
            Err(AnalysisError::ResidualTooSmall { order: 0, .. })
        ));
    }

    #[test]
    fn perfectly_predictable_fails_at_order() {
        // |mue| = 1 drives the residual to zero
        assert!(matches!(
            levdur(&[1.0, 1.0], 1, 1.0e-6),
            Err(AnalysisError::ResidualTooSmall { order: 1, .. })
        ));
    }

    #[test]
    fn unstable_is_flagged_not_failed() {
        let lp = levdur(&[1.0, 2.0], 1, 1.0e-6).unwrap();
        assert_eq!(lp.stability, Stability::Unstable);
        assert_abs_diff_eq!(lp.coefficients[1], -2.0);
        assert!(lp.gain().is_nan());
    }

    #[test]
    fn autocorrelation() {
        let r = acorr(&[1.0, 2.0, 3.0], 3);
        assert_eq!(&*r, &[14.0, 8.0, 3.0, 0.0]);
    }

    #[test]
    fn cepstrum_of_one_pole() {
        // 1 / (1 - p z^-1): c[n] = p^n / n
        let p: f64 = 0.6;
        let c = lpc2c(&[2.0, -p], 6);
        assert_abs_diff_eq!(c[0], 2.0f64.ln(), epsilon = 1.0e-12);
        for n in 1..=6 {
            assert_abs_diff_eq!(c[n], p.powi(n as i32) / n as f64, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn predictor_from_frame() {
        let mut seed: u32 = 1;
        let x: Vec<f64> = (0..64)
            .map(|i| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                let noise = (seed >> 16) as f64 / 65536.0 - 0.5;
                (0.3 * i as f64).sin() + 0.1 * noise
            })
            .collect();
        let lp = LinearPrediction::from_frame(&x, 4, -1.0).unwrap();
        assert_eq!(lp.order(), 4);
        assert_eq!(lp.stability, Stability::Stable);
        assert!(lp.gain() > 0.0);
        assert_eq!(lp.to_cepstrum(10).len(), 11);
    }
}
