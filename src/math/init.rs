use rand::Rng;
use std::f64::consts::PI;

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Uniforms on (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Truncated-normal initialization: N(0, std_dev²) with every draw beyond
/// two standard deviations rejected and redrawn.
pub fn truncated_normal<R: Rng + ?Sized>(len: usize, std_dev: f32, rng: &mut R) -> Vec<f32> {
    (0..len)
        .map(|_| loop {
            let z = sample_standard_normal(rng);
            if z.abs() <= 2.0 {
                break (z * std_dev as f64) as f32;
            }
        })
        .collect()
}
