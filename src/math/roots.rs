//! Real polynomial roots for ray/surface intersection.

use nalgebra::DMatrix;

/// Coefficients smaller than this fraction of the largest one are treated as
/// zero when deciding a polynomial's effective degree.
const DEGREE_EPS: f64 = 1e-14;

/// Relative discriminant band inside which two quadratic roots collapse into
/// one tangent root.
const TANGENT_EPS: f64 = 1e-10;

/// Relative imaginary part below which a companion eigenvalue is real.
const IMAGINARY_EPS: f64 = 1e-6;

/// Roots closer than this are merged into a single (multiple) root.
const MERGE_EPS: f64 = 1e-9;

/// Solves `a*t^2 + b*t + c = 0`, returning the real roots in ascending order.
///
/// A discriminant within a relative band of zero yields a single tangent
/// root rather than two nearly equal ones. A vanishing `a` degrades to the
/// linear solution.
#[must_use]
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return Vec::new();
    }
    if a.abs() <= DEGREE_EPS * scale {
        return solve_linear(b, c, scale);
    }

    let disc = b * b - 4.0 * a * c;
    let band = TANGENT_EPS * (b * b + (4.0 * a * c).abs());
    if disc < -band {
        return Vec::new();
    }
    if disc <= band {
        return vec![-b / (2.0 * a)];
    }

    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let mut roots = if q == 0.0 {
        let r = (-c / a).sqrt();
        vec![-r, r]
    } else {
        vec![q / a, c / q]
    };
    roots.sort_by(f64::total_cmp);
    roots
}

fn solve_linear(b: f64, c: f64, scale: f64) -> Vec<f64> {
    if b.abs() <= DEGREE_EPS * scale {
        Vec::new()
    } else {
        vec![-c / b]
    }
}

/// Finds the real roots of a polynomial given highest-degree coefficient
/// first, in ascending order with multiple roots reported once.
///
/// Degrees above two use the eigenvalues of the companion matrix, polished
/// with a few Newton steps.
#[must_use]
pub fn solve_polynomial(coeffs: &[f64]) -> Vec<f64> {
    let scale = coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    if scale == 0.0 {
        return Vec::new();
    }
    let lead = coeffs
        .iter()
        .position(|c| c.abs() > DEGREE_EPS * scale)
        .unwrap_or(coeffs.len());
    let coeffs = &coeffs[lead..];

    match coeffs.len() {
        0 | 1 => Vec::new(),
        2 => solve_linear(coeffs[0], coeffs[1], scale),
        3 => solve_quadratic(coeffs[0], coeffs[1], coeffs[2]),
        _ => companion_roots(coeffs),
    }
}

fn companion_roots(coeffs: &[f64]) -> Vec<f64> {
    let n = coeffs.len() - 1;
    let lead = coeffs[0];
    let mut companion = DMatrix::<f64>::zeros(n, n);
    for i in 1..n {
        companion[(i, i - 1)] = 1.0;
    }
    for (i, c) in coeffs[1..].iter().rev().enumerate() {
        companion[(i, n - 1)] = -c / lead;
    }

    let mut roots: Vec<f64> = companion
        .complex_eigenvalues()
        .iter()
        .filter(|z| z.im.abs() <= IMAGINARY_EPS * (1.0 + z.re.abs()))
        .map(|z| polish(coeffs, z.re))
        .collect();
    roots.sort_by(f64::total_cmp);
    roots.dedup_by(|a, b| (*a - *b).abs() <= MERGE_EPS * (1.0 + b.abs()));
    roots
}

/// Evaluates the polynomial and its derivative with Horner's scheme.
fn horner(coeffs: &[f64], t: f64) -> (f64, f64) {
    coeffs.iter().fold((0.0, 0.0), |(p, dp), &c| (p * t + c, dp * t + p))
}

fn polish(coeffs: &[f64], mut t: f64) -> f64 {
    for _ in 0..4 {
        let (p, dp) = horner(coeffs, t);
        if dp.abs() < f64::EPSILON {
            break;
        }
        let step = p / dp;
        t -= step;
        if step.abs() <= f64::EPSILON * (1.0 + t.abs()) {
            break;
        }
    }
    t
}
