//! Slice-level recursions between cepstral representations.
//!
//! The order of every output is `output.len() - 1`; an empty output is left
//! untouched and an empty input reads as all zeros. Inputs and outputs are
//! distinct slices; callers that transform in place copy first.

/// All-pass frequency transformation of `c1` by `alpha` (`c1` minimum phase).
pub fn freqt(c1: &[f64], c2: &mut [f64], alpha: f64) {
    let aa = 1.0 - alpha * alpha;
    c2.fill(0.0);
    if c2.is_empty() {
        return;
    }
    for &c in c1.iter().rev() {
        let mut prev = c2[0];
        c2[0] = c + alpha * c2[0];
        if let Some(g1) = c2.get(1).copied() {
            c2[1] = aa * prev + alpha * g1;
            prev = g1;
        }
        for j in 2..c2.len() {
            let g = c2[j];
            c2[j] = prev + alpha * (g - c2[j - 1]);
            prev = g;
        }
    }
}

/// Transposed counterpart of [`freqt`], mapping correlations back to warped lags.
pub fn frqtr(c1: &[f64], c2: &mut [f64], alpha: f64) {
    c2.fill(0.0);
    if c2.is_empty() {
        return;
    }
    for &c in c1.iter().rev() {
        let mut prev = c2[0];
        c2[0] = c;
        for j in 1..c2.len() {
            let g = c2[j];
            c2[j] = prev + alpha * (g - c2[j - 1]);
            prev = g;
        }
    }
}

/// MLSA filter coefficients `b'` to cepstrum, through an all-pass of `alpha`.
pub fn b2c(b: &[f64], c: &mut [f64], alpha: f64) {
    let k = 1.0 - alpha * alpha;
    c.fill(0.0);
    if c.is_empty() {
        return;
    }
    for &v in b.iter().rev() {
        let mut prev = c[0];
        c[0] = v;
        if let Some(g1) = c.get(1).copied() {
            c[1] = k * prev + alpha * g1;
            prev = g1;
        }
        for j in 2..c.len() {
            let g = c[j];
            c[j] = prev + alpha * (g - c[j - 1]);
            prev = g;
        }
    }
}

/// MLSA filter coefficients to mel-cepstrum.
pub fn b2mc(b: &[f64], mc: &mut [f64], alpha: f64) {
    debug_assert_eq!(b.len(), mc.len());
    let Some(last) = b.len().checked_sub(1) else {
        return;
    };
    mc[last] = b[last];
    for i in (0..last).rev() {
        mc[i] = b[i] + alpha * b[i + 1];
    }
}

/// Mel-cepstrum to MLSA filter coefficients.
pub fn mc2b(mc: &[f64], b: &mut [f64], alpha: f64) {
    debug_assert_eq!(b.len(), mc.len());
    let Some(last) = mc.len().checked_sub(1) else {
        return;
    };
    b[last] = mc[last];
    for i in (0..last).rev() {
        b[i] = mc[i] - alpha * b[i + 1];
    }
}

/// Gain normalization, `c` to `(K, c')`, in place.
pub fn gnorm(c: &mut [f64], gamma: f64) {
    if c.is_empty() {
        return;
    }
    if gamma != 0.0 {
        let k = 1.0 + gamma * c[0];
        c[0] = k.powf(1.0 / gamma);
        for v in &mut c[1..] {
            *v /= k;
        }
    } else {
        c[0] = c[0].exp();
    }
}

/// Inverse of [`gnorm`], in place.
pub fn ignorm(c: &mut [f64], gamma: f64) {
    if c.is_empty() {
        return;
    }
    if gamma != 0.0 {
        let k = c[0].powf(gamma);
        c[0] = (k - 1.0) / gamma;
        for v in &mut c[1..] {
            *v *= k;
        }
    } else {
        c[0] = c[0].ln();
    }
}

/// Normalized generalized cepstrum of `g1` to that of `g2`.
pub fn gc2gc(c1: &[f64], g1: f64, c2: &mut [f64], g2: f64) {
    c2.fill(0.0);
    let (Some(m1), false) = (c1.len().checked_sub(1), c2.is_empty()) else {
        return;
    };
    c2[0] = c1[0];
    for i in 1..c2.len() {
        let mut ss1 = 0.0;
        let mut ss2 = 0.0;
        for k in 1..=m1.min(i - 1) {
            let mk = i - k;
            let cc = c1[k] * c2[mk];
            ss2 += k as f64 * cc;
            ss1 += mk as f64 * cc;
        }
        let d = (g2 * ss2 - g1 * ss1) / i as f64;
        c2[i] = if i <= m1 { c1[i] + d } else { d };
    }
}

/// Mel-generalized cepstrum `(a1, g1)` to `(a2, g2)`.
pub fn mgc2mgc(c1: &[f64], a1: f64, g1: f64, c2: &mut [f64], a2: f64, g2: f64) {
    if a1 == a2 {
        let mut n = Box::<[f64]>::from(c1);
        gnorm(&mut n, g1);
        gc2gc(&n, g1, c2, g2);
    } else {
        let a = (a2 - a1) / (1.0 - a1 * a2);
        let mut t = boxed_slice![0.0; c2.len()];
        freqt(c1, &mut t, a);
        gnorm(&mut t, g1);
        gc2gc(&t, g1, c2, g2);
    }
    ignorm(c2, g2);
}

/// Minimum-phase impulse response of cepstrum `c`.
pub fn c2ir(c: &[f64], h: &mut [f64]) {
    h.fill(0.0);
    if h.is_empty() || c.is_empty() {
        return;
    }
    h[0] = c[0].exp();
    for n in 1..h.len() {
        let mut d = 0.0;
        for k in 1..c.len().min(n + 1) {
            d += k as f64 * c[k] * h[n - k];
        }
        h[n] = d / n as f64;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const MC: [f64; 6] = [0.8, -0.4, 0.25, 0.1, -0.05, 0.02];

    #[test]
    fn freqt_identity_at_zero_alpha() {
        let mut c2 = [0.0; 8];
        freqt(&MC, &mut c2, 0.0);
        for i in 0..MC.len() {
            assert_abs_diff_eq!(c2[i], MC[i], epsilon = 1.0e-15);
        }
        assert_abs_diff_eq!(c2[6], 0.0);
        assert_abs_diff_eq!(c2[7], 0.0);
    }

    #[test]
    fn freqt_round_trip() {
        for alpha in [0.1, 0.35, 0.42, -0.3] {
            let mut warped = [0.0; 200];
            freqt(&MC, &mut warped, alpha);
            let mut back = [0.0; 6];
            freqt(&warped, &mut back, -alpha);
            for i in 0..MC.len() {
                assert_abs_diff_eq!(back[i], MC[i], epsilon = 1.0e-8);
            }
        }
    }

    #[test]
    fn freqt_composes() {
        let (a1, a2) = (0.2, 0.45);
        let mut once = [0.0; 300];
        freqt(&MC, &mut once, a1);
        let mut twice = [0.0; 16];
        freqt(&once, &mut twice, (a2 - a1) / (1.0 - a1 * a2));
        let mut direct = [0.0; 16];
        freqt(&MC, &mut direct, a2);
        for i in 0..16 {
            assert_abs_diff_eq!(twice[i], direct[i], epsilon = 1.0e-8);
        }
    }

    #[test]
    fn freqt_first_order_closed_form() {
        // single-lag input: g1 = (1 - a^2) c1, g0 = a c1
        let alpha = 0.4;
        let mut c2 = [0.0; 3];
        freqt(&[0.0, 1.0], &mut c2, alpha);
        assert_abs_diff_eq!(c2[0], alpha, epsilon = 1.0e-15);
        assert_abs_diff_eq!(c2[1], 1.0 - alpha * alpha, epsilon = 1.0e-15);
        assert_abs_diff_eq!(c2[2], -alpha * (1.0 - alpha * alpha), epsilon = 1.0e-15);
    }

    #[test]
    fn frqtr_shifts_at_zero_alpha() {
        let y = [0.3, 0.2, -0.1, 0.05, 0.0, 0.01];
        let mut t = [0.0; 4];
        frqtr(&y, &mut t, 0.0);
        assert_eq!(t, [0.3, 0.2, -0.1, 0.05]);
    }

    #[test]
    fn frqtr_first_order_closed_form() {
        let alpha = 0.4;
        let aa = 1.0 - alpha * alpha;
        let mut r = [0.0; 3];
        frqtr(&[0.0, 1.0], &mut r, alpha);
        assert_abs_diff_eq!(r[0], 0.0, epsilon = 1.0e-15);
        assert_abs_diff_eq!(r[1], aa, epsilon = 1.0e-15);
        assert_abs_diff_eq!(r[2], -2.0 * alpha * aa, epsilon = 1.0e-15);
    }

    #[test]
    fn b2c_matches_freqt_of_b2mc() {
        let alpha = 0.35;
        let mut b = MC;
        b[0] = 0.0;
        let mut direct = [0.0; 40];
        b2c(&b, &mut direct, -alpha);

        let mut mc = [0.0; 6];
        b2mc(&b, &mut mc, alpha);
        let mut via_mc = [0.0; 40];
        freqt(&mc, &mut via_mc, -alpha);
        for i in 0..40 {
            assert_abs_diff_eq!(direct[i], via_mc[i], epsilon = 1.0e-12);
        }
    }

    #[test]
    fn mc2b_inverts_b2mc() {
        let alpha = 0.42;
        let mut b = [0.0; 6];
        mc2b(&MC, &mut b, alpha);
        let mut mc = [0.0; 6];
        b2mc(&b, &mut mc, alpha);
        for i in 0..6 {
            assert_abs_diff_eq!(mc[i], MC[i], epsilon = 1.0e-15);
        }
        assert_abs_diff_eq!(b[5], MC[5]);
        assert_abs_diff_eq!(b[4], MC[4] - alpha * MC[5], epsilon = 1.0e-15);
    }

    #[test]
    fn ignorm_inverts_gnorm() {
        for gamma in [0.0, -1.0, -0.5, 0.3] {
            let mut c = MC;
            gnorm(&mut c, gamma);
            ignorm(&mut c, gamma);
            for i in 0..6 {
                assert_abs_diff_eq!(c[i], MC[i], epsilon = 1.0e-12);
            }
        }
        let mut c = MC;
        gnorm(&mut c, 0.0);
        assert_abs_diff_eq!(c[0], 0.8f64.exp());
        assert_abs_diff_eq!(c[1], MC[1]);
    }

    #[test]
    fn empty_slices_are_left_alone() {
        freqt(&MC, &mut [], 0.3);
        frqtr(&MC, &mut [], 0.3);
        b2c(&MC, &mut [], 0.3);
        b2mc(&[], &mut [], 0.3);
        mc2b(&[], &mut [], 0.3);
        gnorm(&mut [], -0.5);
        ignorm(&mut [], -0.5);
        gc2gc(&MC, 0.0, &mut [], -0.5);
        mgc2mgc(&MC, 0.35, 0.0, &mut [], 0.0, -0.5);
        c2ir(&MC, &mut []);

        let mut c2 = [1.0; 3];
        gc2gc(&[], 0.0, &mut c2, -0.5);
        assert_eq!(c2, [0.0; 3]);
        let mut h = [1.0; 3];
        c2ir(&[], &mut h);
        assert_eq!(h, [0.0; 3]);
    }

    #[test]
    fn gc2gc_same_gamma_is_identity() {
        let mut c2 = [0.0; 6];
        gc2gc(&MC, -0.5, &mut c2, -0.5);
        for i in 0..6 {
            assert_abs_diff_eq!(c2[i], MC[i], epsilon = 1.0e-15);
        }
    }

    #[test]
    fn gc2gc_round_trip() {
        let mut mid = [0.0; 60];
        gc2gc(&MC, 0.0, &mut mid, -0.5);
        let mut back = [0.0; 6];
        gc2gc(&mid, -0.5, &mut back, 0.0);
        for i in 0..6 {
            assert_abs_diff_eq!(back[i], MC[i], epsilon = 1.0e-9);
        }
    }

    #[test]
    fn mgc2mgc_round_trip() {
        let mut mid = [0.0; 80];
        mgc2mgc(&MC, 0.35, 0.0, &mut mid, 0.1, -0.25);
        let mut back = [0.0; 6];
        mgc2mgc(&mid, 0.1, -0.25, &mut back, 0.35, 0.0);
        for i in 0..6 {
            assert_abs_diff_eq!(back[i], MC[i], epsilon = 1.0e-6);
        }
    }

    #[test]
    fn impulse_response_of_one_pole() {
        // c[n] = p^n / n is the cepstrum of 1 / (1 - p z^-1)
        let p: f64 = 0.5;
        let c: Vec<f64> = (0..40)
            .map(|n| if n == 0 { 0.0 } else { p.powi(n) / n as f64 })
            .collect();
        let mut h = [0.0; 10];
        c2ir(&c, &mut h);
        for n in 0..10 {
            assert_abs_diff_eq!(h[n], p.powi(n as i32), epsilon = 1.0e-12);
        }
    }
}
