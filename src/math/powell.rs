//! Powell's direction set method for derivative free multivariate minimization.
//!
//! The routine follows the classic formulation: successive line minimizations along
//! a set of directions (initially the coordinate axes), with the direction of
//! largest decrease replaced by the net displacement of an iteration when that is
//! favourable. Line minimizations bracket the minimum with a golden section
//! expansion and refine it with Brent's parabolic interpolation.

use tracing::debug;

const GOLD: f64 = 1.618034;
const GLIMIT: f64 = 100.0;
const CGOLD: f64 = 0.381966;
const TINY: f64 = 1.0e-20;
const ZEPS: f64 = 1.0e-10;

// Fractional precision of each line minimization
const LINE_TOL: f64 = 1.0e-6;
const LINE_MAX_ITER: usize = 100;
const BRACKET_MAX_ITER: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct PowellResult {
    pub x: Vec<f64>,
    pub fmin: f64,
    pub iterations: usize,
    pub converged: bool, // false when the iteration cap was reached
}

/// Minimizes `f` starting from `start` with the coordinate axes as initial directions.
///
/// Terminates when the decrease of one full iteration falls below `ftol` relative to
/// the function value. Reaching `max_iter` iterations returns the best point found
/// with `converged` set to false.
pub fn powell<F>(f: F, start: &[f64], ftol: f64, max_iter: usize) -> PowellResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let directions: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    powell_with_directions(f, start, directions, ftol, max_iter)
}

pub fn powell_with_directions<F>(
    f: F,
    start: &[f64],
    mut xi: Vec<Vec<f64>>,
    ftol: f64,
    max_iter: usize,
) -> PowellResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let mut p = start.to_vec();
    let mut pt = p.clone();
    let mut fret = f(&p);

    let mut iterations = 0;
    loop {
        iterations += 1;
        let fp = fret;
        let mut ibig = 0;
        let mut del = 0.0;

        for (i, direction) in xi.iter_mut().enumerate() {
            let fptt = fret;
            fret = line_minimize(&f, &mut p, direction);
            if fptt - fret > del {
                del = fptt - fret;
                ibig = i;
            }
        }

        if 2.0 * (fp - fret) <= ftol * (fp.abs() + fret.abs()) + TINY {
            return PowellResult {
                x: p,
                fmin: fret,
                iterations,
                converged: true,
            };
        }
        if iterations >= max_iter {
            debug!("Powell minimization stopped after {} iterations", iterations);
            return PowellResult {
                x: p,
                fmin: fret,
                iterations,
                converged: false,
            };
        }

        let ptt: Vec<f64> = (0..n).map(|j| 2.0 * p[j] - pt[j]).collect();
        let mut xit: Vec<f64> = (0..n).map(|j| p[j] - pt[j]).collect();
        pt.clone_from(&p);

        let fptt = f(&ptt);
        if fptt < fp {
            let t = 2.0 * (fp - 2.0 * fret + fptt) * (fp - fret - del).powi(2)
                - del * (fp - fptt).powi(2);
            if t < 0.0 {
                fret = line_minimize(&f, &mut p, &mut xit);
                xi[ibig] = xi[n - 1].clone();
                xi[n - 1] = xit;
            }
        }
    }
}

// Moves `p` to the minimum of `f` along `direction` and rescales `direction` to the
// actual displacement. Returns the function value at the new point.
fn line_minimize<F>(f: &F, p: &mut [f64], direction: &mut [f64]) -> f64
where
    F: Fn(&[f64]) -> f64,
{
    let mut trial = vec![0.0; p.len()];
    let origin = p.to_vec();
    let mut along = |t: f64| {
        for j in 0..trial.len() {
            trial[j] = origin[j] + t * direction[j];
        }
        f(&trial)
    };

    let (ax, bx, cx) = bracket_minimum(&mut along, 0.0, 1.0);
    let (xmin, fmin) = brent_minimize(&mut along, ax, bx, cx, LINE_TOL);

    for j in 0..p.len() {
        direction[j] *= xmin;
        p[j] += direction[j];
    }
    fmin
}

fn sign(a: f64, b: f64) -> f64 {
    if b >= 0.0 { a.abs() } else { -a.abs() }
}

/// Expands `(a, b)` downhill until it brackets a minimum of `g`, returning `(a, b, c)`
/// with `g(b)` below both ends.
pub fn bracket_minimum<G: FnMut(f64) -> f64>(g: &mut G, a: f64, b: f64) -> (f64, f64, f64) {
    let (mut ax, mut bx) = (a, b);
    let mut fa = g(ax);
    let mut fb = g(bx);
    if fb > fa {
        std::mem::swap(&mut ax, &mut bx);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut cx = bx + GOLD * (bx - ax);
    let mut fc = g(cx);

    let mut iter = 0;
    while fb > fc && iter < BRACKET_MAX_ITER {
        iter += 1;
        let r = (bx - ax) * (fb - fc);
        let q = (bx - cx) * (fb - fa);
        let mut u = bx - ((bx - cx) * q - (bx - ax) * r) / (2.0 * sign((q - r).abs().max(TINY), q - r));
        let ulim = bx + GLIMIT * (cx - bx);
        let mut fu;

        if (bx - u) * (u - cx) > 0.0 {
            fu = g(u);
            if fu < fc {
                return (bx, u, cx);
            } else if fu > fb {
                return (ax, bx, u);
            }
            u = cx + GOLD * (cx - bx);
            fu = g(u);
        } else if (cx - u) * (u - ulim) > 0.0 {
            fu = g(u);
            if fu < fc {
                bx = cx;
                cx = u;
                u = cx + GOLD * (cx - bx);
                fb = fc;
                fc = fu;
                fu = g(u);
            }
        } else if (u - ulim) * (ulim - cx) >= 0.0 {
            u = ulim;
            fu = g(u);
        } else {
            u = cx + GOLD * (cx - bx);
            fu = g(u);
        }

        ax = bx;
        bx = cx;
        cx = u;
        fa = fb;
        fb = fc;
        fc = fu;
    }

    (ax, bx, cx)
}

/// Brent's one dimensional minimization inside the bracket `(ax, bx, cx)`.
pub fn brent_minimize<G: FnMut(f64) -> f64>(
    g: &mut G,
    ax: f64,
    bx: f64,
    cx: f64,
    tol: f64,
) -> (f64, f64) {
    let mut a = ax.min(cx);
    let mut b = ax.max(cx);
    let mut x = bx;
    let mut w = bx;
    let mut v = bx;
    let mut fx = g(x);
    let mut fw = fx;
    let mut fv = fx;
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for _ in 0..LINE_MAX_ITER {
        let xm = 0.5 * (a + b);
        let tol1 = tol * x.abs() + ZEPS;
        let tol2 = 2.0 * tol1;
        if (x - xm).abs() <= tol2 - 0.5 * (b - a) {
            return (x, fx);
        }

        if e.abs() > tol1 {
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let etemp = e;
            e = d;
            if p.abs() >= (0.5 * q * etemp).abs() || p <= q * (a - x) || p >= q * (b - x) {
                e = if x >= xm { a - x } else { b - x };
                d = CGOLD * e;
            } else {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = sign(tol1, xm - x);
                }
            }
        } else {
            e = if x >= xm { a - x } else { b - x };
            d = CGOLD * e;
        }

        let u = if d.abs() >= tol1 { x + d } else { x + sign(tol1, d) };
        let fu = g(u);

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            w = x;
            x = u;
            fv = fw;
            fw = fx;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                w = u;
                fv = fw;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    (x, fx)
}
