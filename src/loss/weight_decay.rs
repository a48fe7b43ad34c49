/// L2 regularization term `coefficient * Σ x² / 2` over the given parameter slices.
pub fn l2_penalty(coefficient: f32, params: &[&[f32]]) -> f32 {
    let sum: f32 = params.iter().flat_map(|p| p.iter()).map(|x| x * x).sum();
    coefficient * sum / 2.0
}

/// Adds the penalty's gradient, `coefficient * x`, onto `grad`.
pub fn add_l2_gradient(coefficient: f32, params: &[f32], grad: &mut [f32]) {
    for (g, x) in grad.iter_mut().zip(params) {
        *g += coefficient * x;
    }
}
