use scapem::math::powell;

fn main() {
    // f(x0, x1) = (x0 + 2 x1) exp(-x0^2 - x1^2), minimum near (-0.31623, -0.63246)
    let f = |x: &[f64]| (x[0] + 2.0 * x[1]) * (-x[0] * x[0] - x[1] * x[1]).exp();
    let result = powell(f, &[0.5, -0.25], 1.0e-4, 200);

    println!(
        "minimum {:.5} at ({:.5}, {:.5}) after {} iterations",
        result.fmin, result.x[0], result.x[1], result.iterations
    );
}
