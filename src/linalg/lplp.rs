/// Fast linear prediction with linear phase.
///
/// Given the autocorrelation `r[0..=2m+1]` returns `c[0..=m]` where `c[0]`
/// is the gain and `c[1..]` are the coefficients normalized by it.
pub fn lplp(r: &[f64], m: usize) -> Box<[f64]> {
    debug_assert!(r.len() > 2 * m + 1);

    let mut c = vec![0.0; m + 1];
    let mut p = vec![0.0; m + 2];
    let mut pp = vec![0.0; m + 1];

    let mut tz = r[0] / 2.0;
    let mut rtz = 1.0 / tz;
    let mut to = r[1];
    let mut rttz = 0.0;
    let mut tto = 1.0;

    c[0] = 1.0 / r[0];
    p[0] = 1.0;

    for k in 1..=m {
        p[k + 1] = 0.0;
        pp[k] = 0.0;

        let beta = -tz * rttz;
        let alpha = tto * rttz - to * rtz;
        tto = to;
        rttz = rtz;

        let pn = p[1] + p[1] + alpha * p[0] + beta * pp[0];
        pp[0] = p[0];
        p[0] = pn;
        for n in 1..=k {
            let pn = p[n + 1] + pp[n - 1] + alpha * p[n] + beta * pp[n];
            pp[n] = p[n];
            p[n] = pn;
        }

        tz = p[0] * r[k] + (1..=k).map(|n| p[n] * (r[k - n] + r[k + n])).sum::<f64>();
        to = p[0] * r[k + 1]
            + (1..=k)
                .map(|n| p[n] * (r[k + 1 - n] + r[k + 1 + n]))
                .sum::<f64>();

        rtz = 1.0 / tz;
        let gamma = 0.5 * p[0] * rtz;
        for n in 0..k {
            c[n] += gamma * p[n];
        }
        c[k] = gamma * p[k];
    }

    c[0] = 1.0 / c[0];
    let gain = c[0];
    for v in &mut c[1..] {
        *v *= gain;
    }
    c.into()
}
