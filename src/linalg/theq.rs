//! Solver of `(T + H) a = b` with symmetric Toeplitz `T` and Hankel `H`.
//!
//! `T[i][j] = t[|i - j|]` and `H[i][j] = h[i + j]`. The recursion runs on
//! 2x2 blocks (one row of `T + H` together with its mirrored row), so the
//! cost is quadratic in the order instead of cubic.

use crate::error::SingularMatrix;

/// 2x2 matrix, row major.
type Mat2 = [f64; 4];
type Vec2 = [f64; 2];

const IDENTITY: Mat2 = [1.0, 0.0, 0.0, 1.0];

#[inline(always)]
fn mv_mul(x: &Mat2, y: &Vec2) -> Vec2 {
    [x[0] * y[0] + x[1] * y[1], x[2] * y[0] + x[3] * y[1]]
}

#[inline(always)]
fn mm_mul(x: &Mat2, y: &Mat2) -> Mat2 {
    [
        x[0] * y[0] + x[1] * y[2],
        x[0] * y[1] + x[1] * y[3],
        x[2] * y[0] + x[3] * y[2],
        x[2] * y[1] + x[3] * y[3],
    ]
}

/// Reverse both rows and columns.
#[inline(always)]
fn crstrns(y: &Mat2) -> Mat2 {
    [y[3], y[2], y[1], y[0]]
}

fn inverse(y: &Mat2, eps: f64) -> Result<Mat2, SingularMatrix> {
    let det = y[0] * y[3] - y[1] * y[2];
    if det.abs() < eps || det.is_nan() {
        return Err(SingularMatrix { determinant: det });
    }
    Ok([y[3] / det, -y[1] / det, -y[2] / det, y[0] / det])
}

/// Solve `(T + H) a = b` where `n = b.len()`.
///
/// `t` needs `n` elements, `h` needs `2n - 1` elements. Every pivot block
/// whose determinant is below `eps` in magnitude (or NaN) aborts the solve;
/// a negative `eps` selects `1e-6`.
pub fn theq(t: &[f64], h: &[f64], b: &[f64], eps: f64) -> Result<Box<[f64]>, SingularMatrix> {
    let n = b.len();
    if n == 0 {
        return Ok(Box::new([]));
    }
    debug_assert!(t.len() >= n);
    debug_assert!(h.len() > 2 * (n - 1));

    let eps = if eps < 0.0 { 1.0e-6 } else { eps };

    let r: Vec<Mat2> = (0..n)
        .map(|i| [t[i], h[n - 1 + i], h[n - 1 - i], t[i]])
        .collect();
    let mut x: Vec<Mat2> = vec![[0.0; 4]; n];
    let mut xx: Vec<Mat2> = vec![[0.0; 4]; n];
    let mut p: Vec<Vec2> = vec![[0.0; 2]; n];

    x[0] = IDENTITY;
    p[0] = mv_mul(&inverse(&r[0], eps)?, &[b[0], b[n - 1]]);
    let mut vx = r[0];

    for i in 1..n {
        let ex = (0..i).fold([0.0; 4], |s, j| add4(&s, &mm_mul(&r[i - j], &x[j])));
        let ep = (0..i).fold([0.0; 2], |s, j| add2(&s, &mv_mul(&r[i - j], &p[j])));

        let bx = mm_mul(&inverse(&crstrns(&vx), eps)?, &ex);

        for j in 1..i {
            let s = mm_mul(&crstrns(&xx[i - j]), &bx);
            x[j] = sub4(&x[j], &s);
        }
        xx[1..i].copy_from_slice(&x[1..i]);
        x[i] = bx.map(|v| -v);
        xx[i] = x[i];

        vx = sub4(&vx, &mm_mul(&crstrns(&ex), &bx));

        let rhs = [b[i] - ep[0], b[n - 1 - i] - ep[1]];
        let g = mv_mul(&inverse(&crstrns(&vx), eps)?, &rhs);

        for j in 0..i {
            let s = mv_mul(&crstrns(&x[i - j]), &g);
            p[j] = add2(&p[j], &s);
        }
        p[i] = g;
    }

    Ok(p.iter().map(|p| p[0]).collect())
}

#[inline(always)]
fn add4(x: &Mat2, y: &Mat2) -> Mat2 {
    [x[0] + y[0], x[1] + y[1], x[2] + y[2], x[3] + y[3]]
}

#[inline(always)]
fn sub4(x: &Mat2, y: &Mat2) -> Mat2 {
    [x[0] - y[0], x[1] - y[1], x[2] - y[2], x[3] - y[3]]
}

#[inline(always)]
fn add2(x: &Vec2, y: &Vec2) -> Vec2 {
    [x[0] + y[0], x[1] + y[1]]
}
